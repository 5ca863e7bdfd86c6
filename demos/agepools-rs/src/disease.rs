use anyhow::{Context, Result};
use mixpool::{DiseaseModel, Error, Exposure, TransmissionHook, infection_probability};
use rand::rngs::StdRng;
use rand::{Rng, distr::Distribution};
use rand_distr::LogNormal;

use crate::parameters::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Susceptible,
    Infected,
    Recovered,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
}

/// SIR or SIS disease driven by mixing-pool exposure.
///
/// Infection durations are lognormal and rounded up to whole steps.
pub struct Disease {
    model: DiseaseModel,
    dt: f64,
    status: Vec<Status>,
    infectious: Vec<bool>,
    recover_at: Vec<usize>,
    step: usize,
    new_infections: usize,
    duration: LogNormal<f64>,
    rng: StdRng,
}

impl Disease {
    pub fn new(
        model: DiseaseModel,
        n_agents: usize,
        dt: f64,
        dur_inf: Duration,
        rng: StdRng,
    ) -> Result<Self> {
        // Lognormal parameterised by its own mean and standard deviation.
        let sigma2 = (1.0 + (dur_inf.std / dur_inf.mean).powi(2)).ln();
        let mu = dur_inf.mean.ln() - sigma2 / 2.0;
        let duration = LogNormal::new(mu, sigma2.sqrt()).context("invalid dur_inf")?;
        Ok(Disease {
            model,
            dt,
            status: vec![Status::Susceptible; n_agents],
            infectious: vec![false; n_agents],
            recover_at: vec![0; n_agents],
            step: 0,
            new_infections: 0,
            duration,
            rng,
        })
    }

    pub fn status(&self) -> &[Status] {
        &self.status
    }

    pub fn seed_infections(&mut self, prevalence: f64) -> usize {
        let seeded: Vec<usize> = (0..self.status.len())
            .filter(|_| self.rng.random_bool(prevalence))
            .collect();
        for person in &seeded {
            self.infect(*person);
        }
        seeded.len()
    }

    fn infect(&mut self, person: usize) {
        let steps = (self.duration.sample(&mut self.rng) / self.dt).ceil().max(1.0) as usize;
        self.status[person] = Status::Infected;
        self.infectious[person] = true;
        self.recover_at[person] = self.step + steps;
    }

    /// Moves the clock forward one step and ends infections that are due.
    pub fn progress(&mut self) {
        self.step += 1;
        self.new_infections = 0;
        let after = match self.model {
            DiseaseModel::Sir => Status::Recovered,
            DiseaseModel::Sis => Status::Susceptible,
        };
        for person in 0..self.status.len() {
            if self.status[person] == Status::Infected && self.recover_at[person] <= self.step {
                self.status[person] = after;
                self.infectious[person] = false;
            }
        }
    }

    pub fn new_infections(&self) -> usize {
        self.new_infections
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for status in &self.status {
            match status {
                Status::Susceptible => counts.susceptible += 1,
                Status::Infected => counts.infected += 1,
                Status::Recovered => counts.recovered += 1,
            }
        }
        counts
    }
}

impl TransmissionHook for Disease {
    fn infectious(&self) -> &[bool] {
        &self.infectious
    }

    fn transmit(&mut self, exposure: &Exposure, beta: f64) -> Result<(), Error> {
        if exposure.len() != self.status.len() {
            return Err(Error::Transmission(format!(
                "exposure covers {} people, disease tracks {}",
                exposure.len(),
                self.status.len()
            )));
        }
        for person in 0..self.status.len() {
            let e = exposure.values[person];
            if self.status[person] != Status::Susceptible || e == 0.0 {
                continue;
            }
            if self.rng.random::<f64>() < infection_probability(e, beta, self.dt) {
                self.infect(person);
                self.new_infections += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn disease(model: DiseaseModel, n: usize) -> Disease {
        let dur = Duration { mean: 2.5, std: 0.0 };
        Disease::new(model, n, 1.0, dur, StdRng::seed_from_u64(11)).unwrap()
    }

    fn exposure(values: Vec<f64>) -> Exposure {
        Exposure {
            values,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_heavy_exposure_infects_every_susceptible() {
        let mut d = disease(DiseaseModel::Sir, 4);
        d.transmit(&exposure(vec![1e3; 4]), 1.0).unwrap();
        assert_eq!(d.counts().infected, 4);
        assert_eq!(d.new_infections(), 4);
        assert!(d.infectious().iter().all(|i| *i));
    }

    #[test]
    fn test_zero_exposure_infects_nobody() {
        let mut d = disease(DiseaseModel::Sir, 4);
        d.transmit(&exposure(vec![0.0; 4]), 5.0).unwrap();
        assert_eq!(d.counts().susceptible, 4);
    }

    #[test]
    fn test_sir_recovers_after_duration() {
        let mut d = disease(DiseaseModel::Sir, 2);
        d.transmit(&exposure(vec![1e3, 0.0]), 1.0).unwrap();
        d.progress();
        d.progress();
        assert_eq!(d.status()[0], Status::Infected);
        d.progress();
        assert_eq!(d.status()[0], Status::Recovered);
        assert!(!d.infectious()[0]);
        // Recovered people are not reinfected.
        d.transmit(&exposure(vec![1e3, 0.0]), 1.0).unwrap();
        assert_eq!(d.status()[0], Status::Recovered);
    }

    #[test]
    fn test_sis_returns_to_susceptible() {
        let mut d = disease(DiseaseModel::Sis, 1);
        d.transmit(&exposure(vec![1e3]), 1.0).unwrap();
        for _ in 0..3 {
            d.progress();
        }
        assert_eq!(d.status()[0], Status::Susceptible);
        assert_eq!(d.counts().recovered, 0);
    }

    #[test]
    fn test_seed_infections() {
        let mut d = disease(DiseaseModel::Sir, 100);
        assert_eq!(d.seed_infections(1.0), 100);
        let mut d = disease(DiseaseModel::Sir, 100);
        assert_eq!(d.seed_infections(0.0), 0);
    }

    #[test]
    fn test_length_mismatch() {
        let mut d = disease(DiseaseModel::Sir, 3);
        assert!(matches!(
            d.transmit(&exposure(vec![1.0]), 1.0),
            Err(Error::Transmission(_))
        ));
    }
}
