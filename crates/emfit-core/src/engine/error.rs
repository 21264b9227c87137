use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::gmm_file::GmmLoadError;
use crate::core::math::MathError;
use crate::core::model::ModelBuildError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Failed to load GMM data: {source}")]
    GmmLoad {
        #[from]
        source: GmmLoadError,
    },

    #[error("Failed to build model GMM: {source}")]
    ModelBuild {
        #[from]
        source: ModelBuildError,
    },

    #[error("Covariance algebra failed: {source}")]
    Math {
        #[from]
        source: MathError,
    },

    #[error("GMM data file contains no components")]
    EmptyDataGmm,

    #[error("Expected {expected} atom positions, got {actual}")]
    PositionCountMismatch { expected: usize, actual: usize },

    #[error("Total energy is zero: no data component overlaps the model")]
    DegenerateEnergy,
}
