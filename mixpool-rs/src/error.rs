//! Error types for mixing pools and model runs.

use thiserror::Error;

/// Problems found while assembling a mixing pool. Fatal to setup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("{axis} groups: {groups} defined but contact matrix has {matrix}")]
    DimensionMismatch {
        axis: &'static str,
        groups: usize,
        matrix: usize,
    },

    #[error("contact matrix entry ({row}, {col}) is negative: {value}")]
    NegativeContact { row: usize, col: usize, value: f64 },

    #[error("contact matrix entry ({row}, {col}) is not finite")]
    NonFiniteContact { row: usize, col: usize },

    #[error("duplicate {axis} group name '{name}'")]
    DuplicateGroup { axis: &'static str, name: String },

    #[error("beta must be finite and non-negative, got {0}")]
    InvalidBeta(f64),

    #[error("malformed contact matrix: {0}")]
    MalformedMatrix(String),

    #[error("no file registered under '{0}'")]
    UnknownFile(String),

    #[error("mixing pool config is missing {0}")]
    Missing(&'static str),

    #[error("mixing pool config gives both {0}")]
    Ambiguous(&'static str),

    #[error("invalid strata: {0}")]
    InvalidStrata(String),
}

/// Failures while evaluating a step against the current population.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StepError {
    #[error("infection status has {got} entries, population has {expected}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("population has no attribute '{0}'")]
    UnknownAttribute(String),

    #[error("attribute '{attribute}' is {actual}, expected {expected}")]
    AttributeType {
        attribute: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("attribute '{attribute}' is not finite for person {person}")]
    NonFiniteAttribute { attribute: String, person: usize },

    #[error("group '{group}' selected person {person} outside population of {len}")]
    MemberOutOfRange {
        group: String,
        person: usize,
        len: usize,
    },

    #[error("exposure for person {person} is not finite")]
    NonFiniteExposure { person: usize },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PopulationError {
    #[error("attribute '{attribute}' has {got} values, population has {expected}")]
    LengthMismatch {
        attribute: String,
        expected: usize,
        got: usize,
    },
}

/// Failures reading a run envelope or writing its outputs.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no input on stdin")]
    EmptyInput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Population(#[from] PopulationError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("transmission failed: {0}")]
    Transmission(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
