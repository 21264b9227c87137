use crate::core::gmm::{DataGmm, GaussianComponent};
use nalgebra::{Matrix3, Point3};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum GmmLoadError {
    #[error("GMM data file not found: '{path}'")]
    FileNotFound { path: String },
    #[error("Malformed record in GMM data file '{path}': {source}")]
    MalformedRecord { path: String, source: csv::Error },
}

/// One data-GMM component record. The covariance is given row-major; it is
/// not required to be symmetric on disk and is symmetrized on load.
#[derive(Debug, Deserialize)]
struct GmmRecord {
    #[serde(rename = "Id")]
    id: i64,
    #[serde(rename = "Weight")]
    weight: f64,
    #[serde(rename = "Mean_0")]
    mean_0: f64,
    #[serde(rename = "Mean_1")]
    mean_1: f64,
    #[serde(rename = "Mean_2")]
    mean_2: f64,
    #[serde(rename = "Cov_00")]
    cov_00: f64,
    #[serde(rename = "Cov_01")]
    cov_01: f64,
    #[serde(rename = "Cov_02")]
    cov_02: f64,
    #[serde(rename = "Cov_10")]
    cov_10: f64,
    #[serde(rename = "Cov_11")]
    cov_11: f64,
    #[serde(rename = "Cov_12")]
    cov_12: f64,
    #[serde(rename = "Cov_20")]
    cov_20: f64,
    #[serde(rename = "Cov_21")]
    cov_21: f64,
    #[serde(rename = "Cov_22")]
    cov_22: f64,
}

/// Reads a data GMM from a CSV file with header
/// `Id,Weight,Mean_0,Mean_1,Mean_2,Cov_00,...,Cov_22`. Record order is
/// preserved: the position in the file is the component index used
/// everywhere downstream.
pub fn load_gmm(path: &Path) -> Result<DataGmm, GmmLoadError> {
    if !path.exists() {
        return Err(GmmLoadError::FileNotFound {
            path: path.to_string_lossy().to_string(),
        });
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| GmmLoadError::MalformedRecord {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    let mut components = Vec::new();
    for result in reader.deserialize::<GmmRecord>() {
        let record = result.map_err(|e| GmmLoadError::MalformedRecord {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let cov = Matrix3::new(
            record.cov_00,
            record.cov_01,
            record.cov_02,
            record.cov_10,
            record.cov_11,
            record.cov_12,
            record.cov_20,
            record.cov_21,
            record.cov_22,
        );
        trace!(id = record.id, weight = record.weight, "read GMM component");

        components.push(GaussianComponent {
            weight: record.weight,
            mean: Point3::new(record.mean_0, record.mean_1, record.mean_2),
            covariance: 0.5 * (cov + cov.transpose()),
        });
    }

    Ok(DataGmm { components })
}
