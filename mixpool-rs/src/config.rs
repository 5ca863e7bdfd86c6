use std::collections::HashMap;
use std::path::PathBuf;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result, RunError};
use crate::group::{AGE, AttributeFilter, Clause, Group};
use crate::matrix::ContactMatrix;
use crate::pool::{DiseaseModel, MixingPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    #[serde(default, rename = "where")]
    pub filter: AttributeFilter,
}

impl GroupSpec {
    fn to_group(&self) -> Group {
        Group::new(self.name.clone(), self.filter.clone())
    }
}

/// Age bands crossed with location codes, location-major.
///
/// Location `k` in `locations` matches an attribute value of `k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strata {
    pub age_breaks: Vec<f64>,
    pub locations: Vec<String>,
    #[serde(default = "default_location_attribute")]
    pub location_attribute: String,
}

fn default_location_attribute() -> String {
    "location".to_string()
}

impl Strata {
    /// Group specs for every age band at every location.
    ///
    /// Breaks must be finite and strictly increasing, with at least one band
    /// and one location.
    pub fn groups(&self) -> Result<Vec<GroupSpec>, ConfigurationError> {
        if self.age_breaks.len() < 2 {
            return Err(ConfigurationError::InvalidStrata(format!(
                "need at least two age breaks, got {}",
                self.age_breaks.len()
            )));
        }
        if let Some(bad) = self.age_breaks.iter().find(|b| !b.is_finite()) {
            return Err(ConfigurationError::InvalidStrata(format!(
                "age break {bad} is not finite"
            )));
        }
        if let Some(band) = self.age_breaks.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ConfigurationError::InvalidStrata(format!(
                "age breaks must be strictly increasing, got {} then {}",
                band[0], band[1]
            )));
        }
        if self.locations.is_empty() {
            return Err(ConfigurationError::InvalidStrata("no locations".to_string()));
        }

        let mut groups = Vec::new();
        for (code, location) in self.locations.iter().enumerate() {
            for band in self.age_breaks.windows(2) {
                let (min, max) = (band[0], band[1]);
                groups.push(GroupSpec {
                    name: format!("{min}-{max} - {location}"),
                    filter: AttributeFilter::new(vec![
                        Clause::range(AGE, Some(min), Some(max)),
                        Clause::equals(self.location_attribute.clone(), code as i64),
                    ]),
                });
            }
        }
        Ok(groups)
    }
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixingPoolConfig {
    #[serde(default)]
    pub disease: DiseaseModel,
    pub beta: f64,
    #[serde(default = "default_scale")]
    pub contact_scale: f64,
    #[serde(default)]
    pub n_contacts: Option<Vec<Vec<f64>>>,
    /// Key into the run's file table; a headerless CSV.
    #[serde(default)]
    pub contact_matrix_file: Option<String>,
    #[serde(default)]
    pub src: Option<Vec<GroupSpec>>,
    #[serde(default)]
    pub dst: Option<Vec<GroupSpec>>,
    #[serde(default)]
    pub strata: Option<Strata>,
}

impl MixingPoolConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw).map_err(RunError::from)?)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value).map_err(RunError::from)?)
    }

    pub fn source_specs(&self) -> Result<Vec<GroupSpec>, ConfigurationError> {
        self.resolve(
            self.src.as_ref(),
            "source groups (src or strata)",
            "src and strata",
        )
    }

    pub fn destination_specs(&self) -> Result<Vec<GroupSpec>, ConfigurationError> {
        self.resolve(
            self.dst.as_ref(),
            "destination groups (dst or strata)",
            "dst and strata",
        )
    }

    fn resolve(
        &self,
        explicit: Option<&Vec<GroupSpec>>,
        missing: &'static str,
        ambiguous: &'static str,
    ) -> Result<Vec<GroupSpec>, ConfigurationError> {
        match (explicit, &self.strata) {
            (Some(_), Some(_)) => Err(ConfigurationError::Ambiguous(ambiguous)),
            (Some(groups), None) => Ok(groups.clone()),
            (None, Some(strata)) => strata.groups(),
            (None, None) => Err(ConfigurationError::Missing(missing)),
        }
    }

    pub fn contact_matrix(&self, files: &HashMap<String, PathBuf>) -> Result<ContactMatrix> {
        let raw = match (&self.n_contacts, &self.contact_matrix_file) {
            (Some(_), Some(_)) => {
                return Err(
                    ConfigurationError::Ambiguous("n_contacts and contact_matrix_file").into(),
                );
            }
            (Some(rows), None) => ContactMatrix::new(rows.clone())?,
            (None, Some(key)) => {
                let path = files
                    .get(key)
                    .ok_or_else(|| ConfigurationError::UnknownFile(key.clone()))?;
                info!("loading contact matrix from {}", path.display());
                ContactMatrix::from_csv_path(path)?
            }
            (None, None) => {
                return Err(
                    ConfigurationError::Missing("n_contacts or contact_matrix_file").into(),
                );
            }
        };
        Ok(raw.scaled(self.contact_scale)?)
    }

    pub fn build(&self, files: &HashMap<String, PathBuf>) -> Result<MixingPool> {
        let src = self.source_specs()?.iter().map(GroupSpec::to_group).collect();
        let dst = self
            .destination_specs()?
            .iter()
            .map(GroupSpec::to_group)
            .collect();
        let contacts = self.contact_matrix(files)?;
        let pool = MixingPool::new(src, dst, contacts, self.beta)?.with_disease(self.disease);
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::population::{PersonId, Population};
    use serde_json::json;
    use std::io::Write;

    fn strata() -> Strata {
        Strata {
            age_breaks: vec![0.0, 20.0, 100.0],
            locations: vec![
                "HOUSEHOLD".to_string(),
                "SCHOOL".to_string(),
                "COMMUNITY".to_string(),
            ],
            location_attribute: "location".to_string(),
        }
    }

    #[test]
    fn test_strata_names_location_major() {
        let names: Vec<String> = strata().groups().unwrap().into_iter().map(|g| g.name).collect();
        assert_eq!(
            names,
            vec![
                "0-20 - HOUSEHOLD",
                "20-100 - HOUSEHOLD",
                "0-20 - SCHOOL",
                "20-100 - SCHOOL",
                "0-20 - COMMUNITY",
                "20-100 - COMMUNITY",
            ]
        );
    }

    #[test]
    fn test_strata_filters_match_codes() {
        let population = Population::new(4)
            .with_attribute(AGE, vec![5.0, 30.0, 12.0, 70.0])
            .unwrap()
            .with_attribute("location", vec![0_i64, 2, 1, 2])
            .unwrap();
        let groups: Vec<Group> = strata().groups().unwrap().iter().map(GroupSpec::to_group).collect();
        let members: Vec<Vec<PersonId>> = groups
            .iter()
            .map(|g| g.members(&population).unwrap())
            .collect();
        assert_eq!(members[0], vec![PersonId(0)]);
        assert!(members[1].is_empty());
        assert_eq!(members[2], vec![PersonId(2)]);
        assert_eq!(members[5], vec![PersonId(1), PersonId(3)]);
    }

    #[test]
    fn test_build_from_json_with_strata() {
        let config = MixingPoolConfig::from_json_value(json!({
            "disease": "sir",
            "beta": 1.2,
            "contact_scale": 10.0,
            "n_contacts": vec![vec![1.0; 6]; 6],
            "strata": {
                "age_breaks": [0, 20, 100],
                "locations": ["HOUSEHOLD", "SCHOOL", "COMMUNITY"]
            }
        }))
        .unwrap();
        let pool = config.build(&HashMap::new()).unwrap();
        assert_eq!(pool.source_groups().len(), 6);
        assert_eq!(pool.destination_groups().len(), 6);
        assert_eq!(pool.contacts().get(3, 4), 10.0);
        assert_eq!(pool.beta(), 1.2);
        assert_eq!(pool.disease(), DiseaseModel::Sir);
    }

    #[test]
    fn test_build_from_toml_with_explicit_groups() {
        let raw = r#"
            disease = "sis"
            beta = 0.1
            n_contacts = [[1.0, 1.0], [1.0, 1.0]]

            [[src]]
            name = "0-20"
            where = [{ range = { attribute = "age", min = 0.0, max = 20.0 } }]

            [[src]]
            name = "20+"
            where = [{ range = { attribute = "age", min = 20.0 } }]

            [[dst]]
            name = "urban"
            where = [{ flag = { attribute = "urban", value = true } }]

            [[dst]]
            name = "rural"
            where = [{ flag = { attribute = "urban", value = false } }]
        "#;
        let config = MixingPoolConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.contact_scale, 1.0);
        let pool = config.build(&HashMap::new()).unwrap();
        assert_eq!(pool.disease(), DiseaseModel::Sis);
        assert_eq!(pool.destination_groups()[1].name(), "rural");
    }

    #[test]
    fn test_matrix_from_file_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1,0").unwrap();
        writeln!(file, "0,1").unwrap();
        let files = HashMap::from([("contacts".to_string(), file.path().to_path_buf())]);
        let config = MixingPoolConfig::from_json_value(json!({
            "beta": 1.0,
            "contact_scale": 10,
            "contact_matrix_file": "contacts",
            "src": [{"name": "a"}, {"name": "b"}],
            "dst": [{"name": "a"}, {"name": "b"}]
        }))
        .unwrap();
        let matrix = config.contact_matrix(&files).unwrap();
        assert_eq!(matrix.get(0, 0), 10.0);
        assert_eq!(matrix.get(0, 1), 0.0);

        let err = config.contact_matrix(&HashMap::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::UnknownFile(_))
        ));
    }

    #[test]
    fn test_missing_pieces() {
        let config = MixingPoolConfig::from_json_value(json!({
            "beta": 1.0,
            "n_contacts": [[1.0]]
        }))
        .unwrap();
        assert!(matches!(
            config.build(&HashMap::new()),
            Err(Error::Configuration(ConfigurationError::Missing(_)))
        ));
        let config = MixingPoolConfig::from_json_value(json!({
            "beta": 1.0,
            "src": [{"name": "all"}],
            "dst": [{"name": "all"}]
        }))
        .unwrap();
        assert!(matches!(
            config.build(&HashMap::new()),
            Err(Error::Configuration(ConfigurationError::Missing(_)))
        ));
    }

    #[test]
    fn test_build_rejects_shape_mismatch() {
        let config = MixingPoolConfig::from_json_value(json!({
            "beta": 1.0,
            "n_contacts": [[1.0, 1.0]],
            "src": [{"name": "all"}],
            "dst": [{"name": "all"}]
        }))
        .unwrap();
        assert!(matches!(
            config.build(&HashMap::new()),
            Err(Error::Configuration(
                ConfigurationError::DimensionMismatch { .. }
            ))
        ));
    }

    #[test]
    fn test_strata_rejects_bad_breaks() {
        let with = |age_breaks: Vec<f64>, locations: Vec<&str>| Strata {
            age_breaks,
            locations: locations.into_iter().map(String::from).collect(),
            location_attribute: "location".to_string(),
        };
        for strata in [
            with(vec![20.0, 0.0, 100.0], vec!["HOME"]),
            with(vec![50.0, 50.0], vec!["HOME"]),
            with(vec![0.0, f64::INFINITY], vec!["HOME"]),
            with(vec![0.0, f64::NAN, 100.0], vec!["HOME"]),
            with(vec![0.0], vec!["HOME"]),
            with(vec![0.0, 100.0], vec![]),
        ] {
            assert!(matches!(
                strata.groups(),
                Err(ConfigurationError::InvalidStrata(_))
            ));
        }

        let config = MixingPoolConfig::from_json_value(json!({
            "beta": 1.0,
            "n_contacts": vec![vec![1.0; 2]; 2],
            "strata": {"age_breaks": [20, 0, 100], "locations": ["HOME"]}
        }))
        .unwrap();
        assert!(matches!(
            config.build(&HashMap::new()),
            Err(Error::Configuration(ConfigurationError::InvalidStrata(_)))
        ));
    }

    #[test]
    fn test_conflicting_sources_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1").unwrap();
        let files = HashMap::from([("contacts".to_string(), file.path().to_path_buf())]);
        let config = MixingPoolConfig::from_json_value(json!({
            "beta": 1.0,
            "n_contacts": [[1.0]],
            "contact_matrix_file": "contacts",
            "src": [{"name": "all"}],
            "dst": [{"name": "all"}]
        }))
        .unwrap();
        assert!(matches!(
            config.build(&files),
            Err(Error::Configuration(ConfigurationError::Ambiguous(_)))
        ));

        let config = MixingPoolConfig::from_json_value(json!({
            "beta": 1.0,
            "n_contacts": vec![vec![1.0; 2]; 2],
            "src": [{"name": "a"}, {"name": "b"}],
            "strata": {"age_breaks": [0, 20, 100], "locations": ["HOME"]}
        }))
        .unwrap();
        assert_eq!(
            config.source_specs(),
            Err(ConfigurationError::Ambiguous("src and strata"))
        );
        assert_eq!(config.destination_specs().unwrap().len(), 2);
    }
}
