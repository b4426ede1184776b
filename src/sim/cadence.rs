use std::time::Duration;

use serde::Deserialize;

/// How the wait between two loop iterations is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    /// Always wait the full interval; slow iterations accumulate drift.
    Fixed,
    /// Wait only what is left of the interval after the iteration ran.
    #[default]
    Corrected,
}

/// A wall-clock cadence that paces a background loop.
///
/// The `Cadence` counts iterations and tells the loop how long to wait
/// before the next one.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use fleet_sim::sim::cadence::{Cadence, Pacing};
///
/// let mut cadence = Cadence::new(Duration::from_secs(1), Pacing::Corrected);
/// assert_eq!(cadence.tick(), 0);
/// assert_eq!(
///     cadence.wait_after(Duration::from_millis(300)),
///     Duration::from_millis(700)
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Cadence {
    /// Target period between iteration starts
    interval: Duration,
    pacing: Pacing,
    /// Iterations started so far
    ticks: u64,
}

impl Cadence {
    /// Creates a cadence with the given period and pacing mode.
    ///
    /// # Arguments
    ///
    /// * `interval` - Target time between iteration starts
    /// * `pacing` - Whether to subtract iteration time from the wait
    pub fn new(interval: Duration, pacing: Pacing) -> Self {
        Self {
            interval,
            pacing,
            ticks: 0,
        }
    }

    /// Marks the start of an iteration.
    ///
    /// # Returns
    ///
    /// The zero-based index of the iteration being started.
    pub fn tick(&mut self) -> u64 {
        let n = self.ticks;
        self.ticks += 1;
        n
    }

    /// How long to wait after an iteration that took `elapsed`.
    ///
    /// Corrected pacing never returns a negative wait: an overrunning
    /// iteration is followed immediately by the next one.
    pub fn wait_after(&self, elapsed: Duration) -> Duration {
        match self.pacing {
            Pacing::Fixed => self.interval,
            Pacing::Corrected => self.interval.saturating_sub(elapsed),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
