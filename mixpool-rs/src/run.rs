//! Run envelope for a single model run.
//!
//! A run receives `{"input": {...}, "model": {"files": {...}}, "output": {...}}`.
//! `seed` and `replicate` are lifted out of `input`; the rest is the model's
//! parameters.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{ConfigurationError, RunError};

pub struct RunContext<I = ()> {
    input_json: serde_json::Map<String, Value>,
    pub input: Option<I>,
    pub seed: u64,
    pub replicate: u64,
    pub files: HashMap<String, PathBuf>,
    output: Value,
}

impl RunContext {
    pub fn from_json(data: Value) -> Self {
        let mut input_json = data
            .get("input")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let seed = input_json
            .remove("seed")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let replicate = input_json
            .remove("replicate")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let files = data
            .get("model")
            .and_then(|m| m.get("files"))
            .and_then(|f| f.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), PathBuf::from(s))))
                    .collect()
            })
            .unwrap_or_default();

        let output = data.get("output").cloned().unwrap_or(Value::Null);

        Self {
            input_json,
            input: None,
            seed,
            replicate,
            files,
            output,
        }
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, RunError> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        if raw.trim().is_empty() {
            return Err(RunError::EmptyInput);
        }
        let data: Value = serde_json::from_str(&raw)?;
        Ok(Self::from_json(data))
    }

    pub fn from_stdin() -> Result<Self, RunError> {
        Self::from_reader(io::stdin().lock())
    }

    /// Same envelope, written as TOML tables.
    pub fn from_toml_str(raw: &str) -> Result<Self, RunError> {
        let data: Value = toml::from_str(raw)?;
        Ok(Self::from_json(data))
    }

    pub fn with_input_type<I: DeserializeOwned>(self) -> Result<RunContext<I>, RunError> {
        let input_value = Value::Object(self.input_json.clone());
        let input = serde_json::from_value(input_value)?;
        Ok(RunContext {
            input_json: self.input_json,
            input: Some(input),
            seed: self.seed,
            replicate: self.replicate,
            files: self.files,
            output: self.output,
        })
    }
}

impl<I: DeserializeOwned> RunContext<I> {
    pub fn load() -> Result<Self, RunError> {
        RunContext::from_stdin()?.with_input_type::<I>()
    }
}

impl<I> RunContext<I> {
    pub fn input_json(&self) -> &serde_json::Map<String, Value> {
        &self.input_json
    }

    pub fn file(&self, name: &str) -> Result<&Path, ConfigurationError> {
        self.files
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| ConfigurationError::UnknownFile(name.to_string()))
    }

    /// Hex SHA-256 of the input parameters, excluding seed and replicate, so
    /// every replicate of one parameter set shares a digest.
    pub fn input_digest(&self) -> String {
        // Map keys serialize in sorted order, so this is canonical.
        let canonical = Value::Object(self.input_json.clone()).to_string();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        filesystem_dir(&self.output).or_else(|| {
            let profiles = self.output.get("profile")?.as_object()?;
            let selected = profiles
                .get("default")
                .or_else(|| profiles.values().next())?;
            filesystem_dir(selected)
        })
    }

    pub fn write(&self, filename: &str, data: &[u8]) -> Result<(), RunError> {
        match self.output_dir() {
            Some(dir) => {
                fs::create_dir_all(&dir)?;
                debug!("writing {}", dir.join(filename).display());
                fs::write(dir.join(filename), data)?;
            }
            None => io::stdout().write_all(data)?,
        }
        Ok(())
    }

    pub fn write_json<T: Serialize>(&self, filename: &str, value: &T) -> Result<(), RunError> {
        let mut data = serde_json::to_vec_pretty(value)?;
        data.push(b'\n');
        self.write(filename, &data)
    }

    pub fn write_csv(
        &self,
        filename: &str,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> Result<(), RunError> {
        match self.output_dir() {
            Some(dir) => {
                fs::create_dir_all(&dir)?;
                let file = fs::File::create(dir.join(filename))?;
                write_records(csv::Writer::from_writer(file), headers, rows)
            }
            None => write_records(csv::Writer::from_writer(io::stdout()), headers, rows),
        }
    }
}

fn filesystem_dir(output: &Value) -> Option<PathBuf> {
    if output.get("spec").and_then(|v| v.as_str()) != Some("filesystem") {
        return None;
    }
    output
        .get("dir")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
}

fn write_records<W: Write>(
    mut wtr: csv::Writer<W>,
    headers: &[&str],
    rows: &[Vec<String>],
) -> Result<(), RunError> {
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
