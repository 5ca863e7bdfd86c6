use anyhow::{Result, ensure};
use mixpool::MixingPoolConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Parameters {
    pub n_agents: usize,
    #[serde(default)]
    pub start: f64,
    pub stop: f64,
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default = "default_init_prevalence")]
    pub init_prevalence: f64,
    #[serde(default)]
    pub dur_inf: Duration,
    /// File key of an `age,value` table.
    #[serde(default)]
    pub age_data: Option<String>,
    #[serde(default)]
    pub location_rules: Vec<LocationRule>,
    #[serde(default)]
    pub flags: Vec<FlagRule>,
    pub pools: MixingPoolConfig,
    #[serde(default)]
    pub seed: u64,
}

/// Mean and standard deviation of a lognormal, in model time units.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Duration {
    pub mean: f64,
    pub std: f64,
}

impl Default for Duration {
    fn default() -> Self {
        Duration {
            mean: 6.0,
            std: 1.0,
        }
    }
}

/// Location weights for everyone younger than `max_age`; `None` catches the rest.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationRule {
    #[serde(default)]
    pub max_age: Option<f64>,
    pub weights: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlagRule {
    pub name: String,
    pub probability: f64,
}

fn default_dt() -> f64 {
    1.0
}

fn default_init_prevalence() -> f64 {
    0.01
}

impl Parameters {
    pub fn n_steps(&self) -> usize {
        ((self.stop - self.start) / self.dt).round() as usize
    }

    pub fn time(&self, step: usize) -> f64 {
        self.start + step as f64 * self.dt
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.n_agents > 0, "n_agents must be positive");
        ensure!(self.dt > 0.0, "dt must be positive, got {}", self.dt);
        ensure!(
            self.stop > self.start,
            "stop ({}) must be after start ({})",
            self.stop,
            self.start
        );
        ensure!(
            (0.0..=1.0).contains(&self.init_prevalence),
            "init_prevalence must be in [0, 1]"
        );
        ensure!(
            self.dur_inf.mean > 0.0 && self.dur_inf.std >= 0.0,
            "dur_inf needs a positive mean and non-negative std"
        );
        for flag in &self.flags {
            ensure!(
                (0.0..=1.0).contains(&flag.probability),
                "flag '{}' probability must be in [0, 1]",
                flag.name
            );
        }
        for rule in &self.location_rules {
            ensure!(
                rule.weights.iter().all(|w| *w >= 0.0) && rule.weights.iter().sum::<f64>() > 0.0,
                "location weights must be non-negative with a positive sum"
            );
        }
        Ok(())
    }
}
