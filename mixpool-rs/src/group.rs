//! Group selectors: named, dynamic views over the population.
//!
//! A selector is evaluated against the current attribute columns every step,
//! so a person moves between groups as soon as their attributes change.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StepError;
use crate::population::{Column, PersonId, Population};

pub const AGE: &str = "age";

pub trait GroupSelector: Send + Sync {
    fn members(&self, population: &Population) -> Result<Vec<PersonId>, StepError>;
}

impl<F> GroupSelector for F
where
    F: Fn(&Population) -> Vec<PersonId> + Send + Sync,
{
    fn members(&self, population: &Population) -> Result<Vec<PersonId>, StepError> {
        Ok(self(population))
    }
}

/// Half-open age band `[min, max)`; `max: None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeGroup {
    pub min: f64,
    pub max: Option<f64>,
}

impl AgeGroup {
    pub fn new(min: f64, max: Option<f64>) -> Self {
        AgeGroup { min, max }
    }
}

impl GroupSelector for AgeGroup {
    fn members(&self, population: &Population) -> Result<Vec<PersonId>, StepError> {
        select_range(population, AGE, Some(self.min), self.max)
    }
}

/// One declarative test against a single attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    Range {
        attribute: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Equals {
        attribute: String,
        value: i64,
    },
    Flag {
        attribute: String,
        value: bool,
    },
}

impl Clause {
    pub fn range(attribute: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Clause::Range {
            attribute: attribute.into(),
            min,
            max,
        }
    }

    pub fn equals(attribute: impl Into<String>, value: i64) -> Self {
        Clause::Equals {
            attribute: attribute.into(),
            value,
        }
    }

    pub fn flag(attribute: impl Into<String>, value: bool) -> Self {
        Clause::Flag {
            attribute: attribute.into(),
            value,
        }
    }

    fn mask(&self, population: &Population) -> Result<Vec<bool>, StepError> {
        match self {
            Clause::Range {
                attribute,
                min,
                max,
            } => {
                let values = finite_floats(population, attribute)?;
                Ok(values
                    .iter()
                    .map(|v| in_range(*v, *min, *max))
                    .collect())
            }
            Clause::Equals { attribute, value } => match population.attribute(attribute)? {
                Column::Int(values) => Ok(values.iter().map(|v| v == value).collect()),
                // Locations are sometimes carried as float codes.
                Column::Float(_) => {
                    let values = finite_floats(population, attribute)?;
                    Ok(values.iter().map(|v| *v == *value as f64).collect())
                }
                Column::Bool(_) => Err(StepError::AttributeType {
                    attribute: attribute.clone(),
                    expected: "int",
                    actual: "bool",
                }),
            },
            Clause::Flag { attribute, value } => Ok(population
                .flag(attribute)?
                .iter()
                .map(|v| v == value)
                .collect()),
        }
    }
}

/// Conjunction of clauses. An empty filter selects everyone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeFilter {
    pub clauses: Vec<Clause>,
}

impl AttributeFilter {
    pub fn new(clauses: Vec<Clause>) -> Self {
        AttributeFilter { clauses }
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }
}

impl GroupSelector for AttributeFilter {
    fn members(&self, population: &Population) -> Result<Vec<PersonId>, StepError> {
        let mut keep = vec![true; population.len()];
        for clause in &self.clauses {
            for (k, m) in keep.iter_mut().zip(clause.mask(population)?) {
                *k &= m;
            }
        }
        Ok(population.select(|id| keep[id.index()]))
    }
}

pub struct Group {
    name: String,
    selector: Box<dyn GroupSelector>,
}

impl Group {
    pub fn new(name: impl Into<String>, selector: impl GroupSelector + 'static) -> Self {
        Group {
            name: name.into(),
            selector: Box::new(selector),
        }
    }

    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Population) -> Vec<PersonId> + Send + Sync + 'static,
    {
        Group::new(name, f)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current members, sorted and deduplicated, checked against the population size.
    pub fn members(&self, population: &Population) -> Result<Vec<PersonId>, StepError> {
        let mut members = self.selector.members(population)?;
        members.sort_unstable();
        members.dedup();
        if let Some(last) = members.last()
            && last.index() >= population.len()
        {
            return Err(StepError::MemberOutOfRange {
                group: self.name.clone(),
                person: last.index(),
                len: population.len(),
            });
        }
        Ok(members)
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group").field("name", &self.name).finish()
    }
}

fn in_range(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    min.is_none_or(|lo| value >= lo) && max.is_none_or(|hi| value < hi)
}

fn finite_floats<'a>(population: &'a Population, attribute: &str) -> Result<&'a [f64], StepError> {
    let values = population.float(attribute)?;
    if let Some(person) = values.iter().position(|v| !v.is_finite()) {
        return Err(StepError::NonFiniteAttribute {
            attribute: attribute.to_string(),
            person,
        });
    }
    Ok(values)
}

fn select_range(
    population: &Population,
    attribute: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Vec<PersonId>, StepError> {
    let values = finite_floats(population, attribute)?;
    Ok(population.select(|id| in_range(values[id.index()], min, max)))
}
