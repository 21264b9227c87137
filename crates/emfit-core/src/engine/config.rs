use crate::core::model::Atom;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}

/// Neighbor-list settings; both fields are required and validated whenever
/// neighbor listing is requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborConfig {
    /// Minimum pairwise overlap for a pair to be retained.
    pub cutoff: f64,
    /// Rebuild every this many steps.
    pub stride: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    /// Ordered atom list; the position slice passed at evaluation time is
    /// indexed the same way.
    pub atoms: Vec<Atom>,
    /// Path to the data-GMM parameter file.
    pub gmm_path: PathBuf,
    /// Thermal energy scale kT, in the caller's energy units.
    pub kbt: f64,
    /// Evaluate on a single worker regardless of the thread pool.
    pub serial: bool,
    /// `None` keeps the full data x model pair list for the whole run.
    pub neighbor: Option<NeighborConfig>,
}

#[derive(Default)]
pub struct FitConfigBuilder {
    atoms: Option<Vec<Atom>>,
    gmm_path: Option<PathBuf>,
    kbt: Option<f64>,
    serial: bool,
    neighbor_list: bool,
    neighbor_cutoff: Option<f64>,
    neighbor_stride: Option<u64>,
}

impl FitConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atoms(mut self, atoms: Vec<Atom>) -> Self {
        self.atoms = Some(atoms);
        self
    }
    pub fn gmm_path(mut self, path: PathBuf) -> Self {
        self.gmm_path = Some(path);
        self
    }
    pub fn kbt(mut self, kbt: f64) -> Self {
        self.kbt = Some(kbt);
        self
    }
    pub fn serial(mut self, serial: bool) -> Self {
        self.serial = serial;
        self
    }
    pub fn neighbor_list(mut self, enabled: bool) -> Self {
        self.neighbor_list = enabled;
        self
    }
    pub fn neighbor_cutoff(mut self, cutoff: f64) -> Self {
        self.neighbor_cutoff = Some(cutoff);
        self
    }
    pub fn neighbor_stride(mut self, stride: u64) -> Self {
        self.neighbor_stride = Some(stride);
        self
    }

    pub fn build(self) -> Result<FitConfig, ConfigError> {
        let atoms = self.atoms.ok_or(ConfigError::MissingParameter("atoms"))?;
        if atoms.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "atoms",
                reason: "atom list must not be empty",
            });
        }

        let kbt = self.kbt.ok_or(ConfigError::MissingParameter("kbt"))?;
        if !kbt.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "kbt",
                reason: "must be a finite value",
            });
        }

        let neighbor = if self.neighbor_list {
            let cutoff = self
                .neighbor_cutoff
                .ok_or(ConfigError::MissingParameter("neighbor_cutoff"))?;
            if !(cutoff > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "neighbor_cutoff",
                    reason: "must be positive",
                });
            }
            let stride = self
                .neighbor_stride
                .ok_or(ConfigError::MissingParameter("neighbor_stride"))?;
            if stride == 0 {
                return Err(ConfigError::InvalidParameter {
                    name: "neighbor_stride",
                    reason: "must be positive",
                });
            }
            Some(NeighborConfig { cutoff, stride })
        } else {
            None
        };

        Ok(FitConfig {
            atoms,
            gmm_path: self
                .gmm_path
                .ok_or(ConfigError::MissingParameter("gmm_path"))?,
            kbt,
            serial: self.serial,
            neighbor,
        })
    }
}
