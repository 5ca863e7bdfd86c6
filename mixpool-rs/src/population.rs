use std::collections::BTreeMap;

use crate::error::{PopulationError, StepError};

/// Stable identifier of an individual: its index into every attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PersonId(pub usize);

impl PersonId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Bool(Vec<bool>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Int(v) => v.len(),
            Column::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Column::Float(_) => "float",
            Column::Int(_) => "int",
            Column::Bool(_) => "bool",
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Column::Float(values)
    }
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Column::Int(values)
    }
}

impl From<Vec<bool>> for Column {
    fn from(values: Vec<bool>) -> Self {
        Column::Bool(values)
    }
}

/// Columnar population state. Attributes are only changed through
/// [`Population::set_attribute`], before the pool is stepped.
#[derive(Debug, Clone, Default)]
pub struct Population {
    len: usize,
    columns: BTreeMap<String, Column>,
}

impl Population {
    pub fn new(len: usize) -> Self {
        Population {
            len,
            columns: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = PersonId> + '_ {
        (0..self.len).map(PersonId)
    }

    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        values: impl Into<Column>,
    ) -> Result<(), PopulationError> {
        let name = name.into();
        let values = values.into();
        if values.len() != self.len {
            return Err(PopulationError::LengthMismatch {
                attribute: name,
                expected: self.len,
                got: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        values: impl Into<Column>,
    ) -> Result<Self, PopulationError> {
        self.set_attribute(name, values)?;
        Ok(self)
    }

    pub fn attribute(&self, name: &str) -> Result<&Column, StepError> {
        self.columns
            .get(name)
            .ok_or_else(|| StepError::UnknownAttribute(name.to_string()))
    }

    pub fn float(&self, name: &str) -> Result<&[f64], StepError> {
        match self.attribute(name)? {
            Column::Float(v) => Ok(v),
            other => Err(type_error(name, "float", other)),
        }
    }

    pub fn int(&self, name: &str) -> Result<&[i64], StepError> {
        match self.attribute(name)? {
            Column::Int(v) => Ok(v),
            other => Err(type_error(name, "int", other)),
        }
    }

    pub fn flag(&self, name: &str) -> Result<&[bool], StepError> {
        match self.attribute(name)? {
            Column::Bool(v) => Ok(v),
            other => Err(type_error(name, "bool", other)),
        }
    }

    /// Identifiers of everyone satisfying `keep`, in identifier order.
    pub fn select(&self, mut keep: impl FnMut(PersonId) -> bool) -> Vec<PersonId> {
        self.ids().filter(|id| keep(*id)).collect()
    }
}

fn type_error(attribute: &str, expected: &'static str, actual: &Column) -> StepError {
    StepError::AttributeType {
        attribute: attribute.to_string(),
        expected,
        actual: actual.kind(),
    }
}
