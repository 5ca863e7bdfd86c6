use std::io::Read;
use std::path::Path;

use nalgebra::DMatrix;

use crate::error::{ConfigurationError, Result, RunError};

/// Contact rates between source groups (rows) and destination groups (columns).
///
/// Entry `(i, j)` is the expected number of contacts a member of source group
/// `i` has with destination group `j` per unit time.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactMatrix {
    inner: DMatrix<f64>,
}

impl ContactMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, ConfigurationError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        if n_rows == 0 || n_cols == 0 {
            return Err(ConfigurationError::MalformedMatrix(
                "contact matrix is empty".to_string(),
            ));
        }
        if let Some(row) = rows.iter().position(|r| r.len() != n_cols) {
            return Err(ConfigurationError::MalformedMatrix(format!(
                "row {row} has {} entries, expected {n_cols}",
                rows[row].len()
            )));
        }
        let inner = DMatrix::from_fn(n_rows, n_cols, |i, j| rows[i][j]);
        Self::from_matrix(inner)
    }

    pub fn from_matrix(inner: DMatrix<f64>) -> Result<Self, ConfigurationError> {
        for ((row, col), value) in indexed(&inner) {
            if !value.is_finite() {
                return Err(ConfigurationError::NonFiniteContact { row, col });
            }
            if value < 0.0 {
                return Err(ConfigurationError::NegativeContact { row, col, value });
            }
        }
        Ok(ContactMatrix { inner })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        ContactMatrix {
            inner: DMatrix::zeros(rows, cols),
        }
    }

    /// Headerless numeric CSV, one matrix row per line.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.map_err(RunError::from)?;
            let row = record
                .iter()
                .map(|field| field.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| {
                    ConfigurationError::MalformedMatrix(format!("line {}: {e}", line + 1))
                })?;
            rows.push(row);
        }
        Ok(Self::new(rows)?)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(RunError::from)?;
        Self::from_csv_reader(file)
    }

    pub fn scaled(&self, factor: f64) -> Result<Self, ConfigurationError> {
        Self::from_matrix(&self.inner * factor)
    }

    pub fn rows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn cols(&self) -> usize {
        self.inner.ncols()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.inner[(row, col)]
    }
}

fn indexed(m: &DMatrix<f64>) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
    (0..m.nrows()).flat_map(move |i| (0..m.ncols()).map(move |j| ((i, j), m[(i, j)])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_new_rejects_negative() {
        let err = ContactMatrix::new(vec![vec![1.0, -0.5], vec![0.0, 1.0]]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::NegativeContact {
                row: 0,
                col: 1,
                value: -0.5
            }
        );
    }

    #[test]
    fn test_new_rejects_nan_and_ragged() {
        assert_eq!(
            ContactMatrix::new(vec![vec![1.0], vec![f64::NAN]]).unwrap_err(),
            ConfigurationError::NonFiniteContact { row: 1, col: 0 }
        );
        assert!(matches!(
            ContactMatrix::new(vec![vec![1.0, 1.0], vec![1.0]]),
            Err(ConfigurationError::MalformedMatrix(_))
        ));
        assert!(matches!(
            ContactMatrix::new(vec![]),
            Err(ConfigurationError::MalformedMatrix(_))
        ));
    }

    #[test]
    fn test_rectangular_shape() {
        let m = ContactMatrix::new(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!((m.rows(), m.cols()), (2, 3));
        assert_eq!(m.get(1, 2), 6.0);
        assert_eq!(m.get(0, 1), 2.0);
    }

    #[test]
    fn test_scaled() {
        let m = ContactMatrix::new(vec![vec![1.0, 10.0], vec![0.0, 1.0]])
            .unwrap()
            .scaled(10.0)
            .unwrap();
        assert_eq!(m.get(0, 1), 100.0);
        assert_eq!(m.get(1, 1), 10.0);
        assert!(m.scaled(-1.0).is_err());
    }

    #[test]
    fn test_from_csv_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1.0, 1.0, 0.5").unwrap();
        writeln!(file, "0,2,1").unwrap();
        let m = ContactMatrix::from_csv_path(file.path()).unwrap();
        assert_eq!((m.rows(), m.cols()), (2, 3));
        assert_eq!(m.get(0, 2), 0.5);
        assert_eq!(m.get(1, 1), 2.0);
    }

    #[test]
    fn test_from_csv_rejects_text() {
        let data = "1,2\nx,4\n";
        let err = ContactMatrix::from_csv_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Configuration(ConfigurationError::MalformedMatrix(_))
        ));
        let ragged = "1,2\n3\n";
        assert!(ContactMatrix::from_csv_reader(ragged.as_bytes()).is_err());
    }
}
