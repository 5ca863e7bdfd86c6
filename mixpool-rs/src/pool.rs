//! The mixing-pool contact model.
//!
//! Each step, every source group `i` contributes
//! `contacts[i][j] * infectious_i / |S_i|` to each member of destination
//! group `j`. Contributions from all source groups, and from every
//! destination group a person belongs to, add up.

use std::collections::HashSet;
use std::fmt;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Error, StepError};
use crate::group::Group;
use crate::matrix::ContactMatrix;
use crate::population::{PersonId, Population};
use crate::transmission::TransmissionHook;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiseaseModel {
    #[default]
    Sir,
    Sis,
}

impl fmt::Display for DiseaseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiseaseModel::Sir => write!(f, "sir"),
            DiseaseModel::Sis => write!(f, "sis"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepWarning {
    /// Source group had no members this step and contributed nothing.
    EmptySourceGroup { group: String },
}

/// Per-person exposure for one step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Exposure {
    pub values: Vec<f64>,
    pub warnings: Vec<StepWarning>,
}

impl Exposure {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, id: PersonId) -> f64 {
        self.values[id.index()]
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

#[derive(Debug)]
pub struct MixingPool {
    src: Vec<Group>,
    dst: Vec<Group>,
    contacts: ContactMatrix,
    beta: f64,
    disease: DiseaseModel,
}

impl MixingPool {
    pub fn new(
        src: Vec<Group>,
        dst: Vec<Group>,
        contacts: ContactMatrix,
        beta: f64,
    ) -> Result<Self, ConfigurationError> {
        if src.len() != contacts.rows() {
            return Err(ConfigurationError::DimensionMismatch {
                axis: "source",
                groups: src.len(),
                matrix: contacts.rows(),
            });
        }
        if dst.len() != contacts.cols() {
            return Err(ConfigurationError::DimensionMismatch {
                axis: "destination",
                groups: dst.len(),
                matrix: contacts.cols(),
            });
        }
        unique_names("source", &src)?;
        unique_names("destination", &dst)?;
        if !beta.is_finite() || beta < 0.0 {
            return Err(ConfigurationError::InvalidBeta(beta));
        }
        info!(
            "configured mixing pool: {} source x {} destination groups, beta {beta}",
            src.len(),
            dst.len()
        );
        Ok(MixingPool {
            src,
            dst,
            contacts,
            beta,
            disease: DiseaseModel::default(),
        })
    }

    pub fn with_disease(mut self, disease: DiseaseModel) -> Self {
        self.disease = disease;
        self
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn disease(&self) -> DiseaseModel {
        self.disease
    }

    pub fn contacts(&self) -> &ContactMatrix {
        &self.contacts
    }

    pub fn source_groups(&self) -> &[Group] {
        &self.src
    }

    pub fn destination_groups(&self) -> &[Group] {
        &self.dst
    }

    /// Exposure of every person to the currently infectious.
    pub fn step(&self, population: &Population, infected: &[bool]) -> Result<Exposure, StepError> {
        if infected.len() != population.len() {
            return Err(StepError::LengthMismatch {
                expected: population.len(),
                got: infected.len(),
            });
        }

        // Per-member contribution of each source group; 0 when the group is empty.
        let mut warnings = Vec::new();
        let mut pressure = Vec::with_capacity(self.src.len());
        for group in &self.src {
            let members = group.members(population)?;
            let infectious = members.iter().filter(|id| infected[id.index()]).count();
            debug!(
                "source '{}': {} members, {infectious} infectious",
                group.name(),
                members.len()
            );
            if members.is_empty() {
                warn!("source group '{}' is empty this step", group.name());
                warnings.push(StepWarning::EmptySourceGroup {
                    group: group.name().to_string(),
                });
                pressure.push(0.0);
            } else {
                pressure.push(infectious as f64 / members.len() as f64);
            }
        }

        let mut values = vec![0.0; population.len()];
        for (j, group) in self.dst.iter().enumerate() {
            let contacts: f64 = pressure
                .iter()
                .enumerate()
                .map(|(i, p)| self.contacts.get(i, j) * p)
                .sum();
            for id in group.members(population)? {
                values[id.index()] += contacts;
            }
        }

        if let Some(person) = values.iter().position(|v| !v.is_finite()) {
            return Err(StepError::NonFiniteExposure { person });
        }
        Ok(Exposure { values, warnings })
    }

    /// One tick: compute exposure from the hook's infectious set and hand it back with beta.
    pub fn advance<H: TransmissionHook + ?Sized>(
        &self,
        population: &Population,
        hook: &mut H,
    ) -> Result<Exposure, Error> {
        let exposure = self.step(population, hook.infectious())?;
        hook.transmit(&exposure, self.beta)?;
        Ok(exposure)
    }
}

fn unique_names(axis: &'static str, groups: &[Group]) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for group in groups {
        if !seen.insert(group.name()) {
            return Err(ConfigurationError::DuplicateGroup {
                axis,
                name: group.name().to_string(),
            });
        }
    }
    Ok(())
}
