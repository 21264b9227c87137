use super::scattering::{element_symbol, scattering_factor};
use nalgebra::Matrix3;
use std::f64::consts::PI;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelBuildError {
    #[error("Cannot resolve an element from atom name '{name}'")]
    UnresolvableAtomName { name: String },
    #[error("Unsupported atom type '{element}' from atom name '{name}'")]
    UnknownAtomType { element: char, name: String },
}

/// An atom of the simulated model, identified by its serial number and name.
/// Positions are not stored here: they live with the driver and are borrowed
/// at each evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub serial: usize,
    pub name: String,
}

impl Atom {
    pub fn new(serial: usize, name: &str) -> Self {
        Self {
            serial,
            name: name.to_string(),
        }
    }
}

/// The model mixture: one isotropic Gaussian per atom. Weights and
/// covariances are fixed for the run; the component means are the live atom
/// positions and are therefore not part of this struct.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGmm {
    pub weights: Vec<f64>,
    pub covariances: Vec<Matrix3<f64>>,
}

impl ModelGmm {
    /// Builds one component per atom from the tabulated scattering factors.
    ///
    /// The density-space Gaussian is the Fourier transform of the scattering
    /// factor `f(s) = A * exp(-B * s^2)`:
    /// `f(r) = A * (pi/B)^1.5 * exp(-pi^2/B * r^2)`, which gives a spherical
    /// width `s = sqrt(0.5 * B) / pi`, converted from Angstrom to nm.
    pub fn from_atoms(atoms: &[Atom]) -> Result<Self, ModelBuildError> {
        let mut weights = Vec::with_capacity(atoms.len());
        let mut covariances = Vec::with_capacity(atoms.len());

        for atom in atoms {
            let element =
                element_symbol(&atom.name).ok_or_else(|| ModelBuildError::UnresolvableAtomName {
                    name: atom.name.clone(),
                })?;
            let factor =
                scattering_factor(element).ok_or_else(|| ModelBuildError::UnknownAtomType {
                    element,
                    name: atom.name.clone(),
                })?;

            let s = (0.5 * factor.b).sqrt() / PI * 0.1;
            weights.push(factor.a);
            covariances.push(Matrix3::from_diagonal_element(s * s));
        }

        Ok(Self {
            weights,
            covariances,
        })
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Rescales the weights to sum to one, mirroring
    /// [`DataGmm::normalize_weights`](super::gmm::DataGmm::normalize_weights).
    pub fn normalize_weights(&mut self) {
        let total: f64 = self.weights.iter().sum();
        for weight in &mut self.weights {
            *weight /= total;
        }
    }
}
