//! Age and location stratified mixing pools.
//!
//! A [`MixingPool`] pairs named source and destination [`Group`]s with a
//! [`ContactMatrix`] and turns the current infectious set into a per-person
//! [`Exposure`] every step.

pub mod config;
pub mod error;
pub mod group;
pub mod matrix;
pub mod pool;
pub mod population;
pub mod run;
pub mod transmission;

pub use config::{GroupSpec, MixingPoolConfig, Strata};
pub use error::{ConfigurationError, Error, PopulationError, Result, RunError, StepError};
pub use group::{AgeGroup, AttributeFilter, Clause, Group, GroupSelector};
pub use matrix::ContactMatrix;
pub use pool::{DiseaseModel, Exposure, MixingPool, StepWarning};
pub use population::{Column, PersonId, Population};
pub use run::RunContext;
pub use transmission::{TransmissionHook, infection_probability};
