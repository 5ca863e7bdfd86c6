use anyhow::Result;
use log::{debug, info};
use mixpool::{MixingPool, Population, TransmissionHook};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::disease::Disease;
use crate::output::SimOutput;
use crate::parameters::Parameters;
use crate::population::{AgeTable, assign_locations, build_population};

pub struct Simulation {
    parameters: Parameters,
    pool: MixingPool,
    population: Population,
    disease: Disease,
}

impl Simulation {
    pub fn new(parameters: &Parameters, ages: &AgeTable, pool: MixingPool) -> Result<Self> {
        parameters.validate()?;
        let mut rng = StdRng::seed_from_u64(parameters.seed);
        let mut population =
            build_population(parameters.n_agents, ages, &parameters.flags, &mut rng)?;
        if !parameters.location_rules.is_empty() {
            assign_locations(&mut population, &parameters.location_rules, &mut rng)?;
        }
        let mut disease = Disease::new(
            pool.disease(),
            parameters.n_agents,
            parameters.dt,
            parameters.dur_inf,
            rng,
        )?;
        let seeded = disease.seed_infections(parameters.init_prevalence);
        info!("seeded {seeded} initial infections ({})", pool.disease());
        Ok(Simulation {
            parameters: parameters.clone(),
            pool,
            population,
            disease,
        })
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    fn infected_by_group(&self) -> Result<Vec<usize>> {
        let infectious = self.disease.infectious();
        let mut counts = Vec::with_capacity(self.pool.destination_groups().len());
        for group in self.pool.destination_groups() {
            let members = group.members(&self.population)?;
            counts.push(members.iter().filter(|id| infectious[id.index()]).count());
        }
        Ok(counts)
    }

    pub fn run(mut self) -> Result<SimOutput> {
        let n_steps = self.parameters.n_steps();
        let names = self
            .pool
            .destination_groups()
            .iter()
            .map(|g| g.name().to_string())
            .collect();
        let mut output = SimOutput::new(names, n_steps);
        for step in 0..n_steps {
            self.disease.progress();
            let exposure = self.pool.advance(&self.population, &mut self.disease)?;
            debug!(
                "step {step}: total exposure {:.3}, {} new infections",
                exposure.total(),
                self.disease.new_infections()
            );
            output.record(
                self.parameters.time(step),
                self.infected_by_group()?,
                self.disease.counts(),
                self.disease.new_infections(),
            );
        }
        Ok(output)
    }
}
