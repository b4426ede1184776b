//! Background loop threads with a cooperative stop signal.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, TryRecvError};
use tracing::{error, info};

use crate::error::Result;

/// A named background thread running one loop.
///
/// The loop body runs to completion each iteration; the stop signal is only
/// observed between iterations, during the wait the body asked for.
/// Dropping the worker stops and joins it.
#[derive(Debug)]
pub struct Worker {
    name: &'static str,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns a thread that calls `iteration` until stopped.
    ///
    /// `iteration` returns how long to wait before the next call.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Spawn` if the OS refuses the thread.
    pub fn spawn<F>(name: &'static str, mut iteration: F) -> Result<Self>
    where
        F: FnMut() -> Duration + Send + 'static,
    {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                info!(worker = name, "worker started");
                loop {
                    if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                        break;
                    }
                    let wait = iteration();
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!(worker = name, "worker stopped");
            })?;

        Ok(Self {
            name,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the loop thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Signals the loop and waits for the current iteration to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // A full channel means a stop is already pending.
            let _ = tx.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(worker = self.name, "worker thread panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
