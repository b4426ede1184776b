use rand::{SeedableRng, rngs::StdRng};

use super::catalog::{ModelSpec, ParamSpec, ResolvedParams};
use super::types::{ControlVector, ModelOutputs, POWER_OUTPUT, PhysicalModel, gaussian_noise};
use crate::error::Result;

/// A refrigerator compressor with a start-up inrush.
///
/// After every cold start the compressor draws `inrush_factor` times its
/// running power for `inrush_seconds` of on-time, then settles to its
/// running power plus Gaussian noise. Readings never go negative.
#[derive(Debug, Clone)]
pub struct Fridge {
    /// Steady running power (W).
    pub compressor_w: f64,
    /// Start-up multiplier on running power.
    pub inrush_factor: f64,
    /// Inrush duration measured in on-time (s).
    pub inrush_seconds: f64,
    /// Noise standard deviation (W).
    pub noise_std_w: f64,
    seed: u64,
    rng: StdRng,
    on_time_s: f64,
}

impl Fridge {
    pub const SPEC: ModelSpec = ModelSpec {
        name: "Fridge",
        description: "Refrigerator compressor with cold-start inrush",
        params: &[
            ParamSpec {
                name: "compressor_w",
                default: 150.0,
                min: 10.0,
                max: 2000.0,
            },
            ParamSpec {
                name: "inrush_factor",
                default: 3.0,
                min: 1.0,
                max: 10.0,
            },
            ParamSpec {
                name: "inrush_seconds",
                default: 5.0,
                min: 0.0,
                max: 600.0,
            },
            ParamSpec {
                name: "noise_std_w",
                default: 2.0,
                min: 0.0,
                max: 100.0,
            },
            ParamSpec {
                name: "seed",
                default: 42.0,
                min: 0.0,
                max: 4_294_967_295.0,
            },
        ],
        build: Fridge::boxed,
    };

    pub fn new(
        compressor_w: f64,
        inrush_factor: f64,
        inrush_seconds: f64,
        noise_std_w: f64,
        seed: u64,
    ) -> Self {
        Self {
            compressor_w,
            inrush_factor,
            inrush_seconds,
            noise_std_w,
            seed,
            rng: StdRng::seed_from_u64(seed),
            on_time_s: 0.0,
        }
    }

    fn boxed(p: &ResolvedParams) -> Box<dyn PhysicalModel> {
        Box::new(Self::new(
            p.get("compressor_w"),
            p.get("inrush_factor"),
            p.get("inrush_seconds"),
            p.get("noise_std_w"),
            p.get("seed") as u64,
        ))
    }

    /// Whether the compressor is still inside its start-up window.
    pub fn in_inrush(&self) -> bool {
        self.on_time_s < self.inrush_seconds
    }
}

impl PhysicalModel for Fridge {
    fn model_name(&self) -> &'static str {
        Self::SPEC.name
    }

    fn reset(&mut self) {
        self.on_time_s = 0.0;
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    fn step(&mut self, _t: f64, dt: f64, control: &ControlVector) -> Result<ModelOutputs> {
        if !control.is_on() {
            return Ok(ModelOutputs::from([(POWER_OUTPUT, 0.0)]));
        }

        let factor = if self.in_inrush() {
            self.inrush_factor
        } else {
            1.0
        };
        let noise = gaussian_noise(&mut self.rng, self.noise_std_w);
        self.on_time_s += dt;

        let power_w = (self.compressor_w * factor + noise).max(0.0);
        Ok(ModelOutputs::from([(POWER_OUTPUT, power_w)]))
    }
}
