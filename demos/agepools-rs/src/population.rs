use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use log::info;
use mixpool::Population;
use mixpool::group::AGE;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::Deserialize;

use crate::parameters::{FlagRule, LocationRule};

pub const LOCATION: &str = "location";

#[derive(Debug, Deserialize)]
struct AgeRow {
    age: f64,
    value: f64,
}

/// Age distribution as bin lower edges with relative weights.
///
/// Ages are drawn uniformly within a bin; the last bin is as wide as the one
/// before it (one year if there is only one).
#[derive(Debug, Clone)]
pub struct AgeTable {
    edges: Vec<f64>,
    weights: Vec<f64>,
}

impl AgeTable {
    pub fn new(edges: Vec<f64>, weights: Vec<f64>) -> Result<Self> {
        ensure!(!edges.is_empty(), "age table is empty");
        ensure!(edges.len() == weights.len(), "age table columns differ in length");
        ensure!(
            edges.windows(2).all(|w| w[0] < w[1]),
            "age bins must be strictly increasing"
        );
        ensure!(
            weights.iter().all(|w| *w >= 0.0) && weights.iter().sum::<f64>() > 0.0,
            "age weights must be non-negative with a positive sum"
        );
        Ok(AgeTable { edges, weights })
    }

    pub fn uniform(min: f64, max: f64) -> Self {
        AgeTable {
            edges: vec![min, max],
            weights: vec![1.0, 0.0],
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut edges = Vec::new();
        let mut weights = Vec::new();
        for row in rdr.deserialize::<AgeRow>() {
            let row = row?;
            edges.push(row.age);
            weights.push(row.value);
        }
        Self::new(edges, weights)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open age table {}", path.display()))?;
        Self::from_reader(file)
    }

    fn upper(&self, bin: usize) -> f64 {
        match self.edges.get(bin + 1) {
            Some(next) => *next,
            None if bin > 0 => self.edges[bin] + (self.edges[bin] - self.edges[bin - 1]),
            None => self.edges[bin] + 1.0,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>> {
        let bins = WeightedIndex::new(&self.weights)?;
        Ok((0..n)
            .map(|_| {
                let bin = bins.sample(&mut *rng);
                rng.random_range(self.edges[bin]..self.upper(bin))
            })
            .collect())
    }
}

/// People with sampled ages and boolean flags. Locations are assigned
/// afterwards with [`assign_locations`], as they depend on age.
pub fn build_population<R: Rng + ?Sized>(
    n_agents: usize,
    ages: &AgeTable,
    flags: &[FlagRule],
    rng: &mut R,
) -> Result<Population> {
    let ages = ages.sample(n_agents, rng)?;
    let mut population = Population::new(n_agents).with_attribute(AGE, ages)?;
    for flag in flags {
        let values: Vec<bool> = (0..n_agents)
            .map(|_| rng.random_bool(flag.probability))
            .collect();
        population.set_attribute(flag.name.clone(), values)?;
    }
    info!("created {n_agents} people");
    Ok(population)
}

/// Draws a location code for everyone from the first rule covering their age.
/// People no rule covers keep location -1.
pub fn assign_locations<R: Rng + ?Sized>(
    population: &mut Population,
    rules: &[LocationRule],
    rng: &mut R,
) -> Result<()> {
    let pickers = rules
        .iter()
        .map(|rule| WeightedIndex::new(&rule.weights))
        .collect::<Result<Vec<_>, _>>()?;
    let locations: Vec<i64> = population
        .float(AGE)?
        .iter()
        .map(|age| {
            rules
                .iter()
                .zip(&pickers)
                .find(|(rule, _)| rule.max_age.is_none_or(|max| *age < max))
                .map(|(_, picker)| picker.sample(&mut *rng) as i64)
                .unwrap_or(-1)
        })
        .collect();
    population.set_attribute(LOCATION, locations)?;
    Ok(())
}
