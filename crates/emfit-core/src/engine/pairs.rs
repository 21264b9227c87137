use crate::core::gmm::{DataGmm, GaussianComponent};
use crate::core::math::{MathError, invert, log_determinant};
use crate::core::model::ModelGmm;
use nalgebra::Matrix3;
use std::f64::consts::PI;

/// Per-pair constants for the overlap integral between data component `i`
/// and model component `j`, cached for the whole run: model covariances
/// never change, only the model means move with the atoms.
///
/// Entries are stored flat, row-major over data components:
/// `k = i * n_model + j`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairTable {
    n_model: usize,
    prefactor: Vec<f64>,
    inv_combined: Vec<Matrix3<f64>>,
}

impl PairTable {
    /// Computes `prefactor = (2 pi)^(-3/2) * exp(-0.5 * logdet(S)) * w_i * w_j`
    /// and `inv_combined = S^-1` with `S = dataCov_i + modelCov_j`, for every
    /// pair. O(n_data * n_model) in time and space.
    pub fn build(data: &DataGmm, model: &ModelGmm) -> Result<Self, MathError> {
        let cfact = 1.0 / (2.0 * PI).powf(1.5);
        let n_model = model.len();
        let mut prefactor = Vec::with_capacity(data.len() * n_model);
        let mut inv_combined = Vec::with_capacity(data.len() * n_model);

        for component in &data.components {
            for j in 0..n_model {
                let sum = component.covariance + model.covariances[j];
                let log_det = log_determinant(&sum)?;
                prefactor.push(
                    cfact * (-0.5 * log_det).exp() * component.weight * model.weights[j],
                );
                inv_combined.push(invert(&sum)?);
            }
        }

        Ok(Self {
            n_model,
            prefactor,
            inv_combined,
        })
    }

    #[inline]
    pub fn index(&self, data_index: usize, model_index: usize) -> usize {
        data_index * self.n_model + model_index
    }

    #[inline]
    pub fn prefactor(&self, pair_index: usize) -> f64 {
        self.prefactor[pair_index]
    }

    #[inline]
    pub fn inv_combined(&self, pair_index: usize) -> &Matrix3<f64> {
        &self.inv_combined[pair_index]
    }

    pub fn n_model(&self) -> usize {
        self.n_model
    }
}

/// Overlap a data component would have with an identical copy of itself:
/// the pair formula with `S = 2 * cov` and weight product `w^2`. Used as the
/// normalization denominator for cross overlaps; strictly positive for any
/// component with nonzero weight.
pub fn self_overlap(component: &GaussianComponent) -> Result<f64, MathError> {
    let cfact = 1.0 / (2.0 * PI).powf(1.5);
    let log_det = log_determinant(&(2.0 * component.covariance))?;
    Ok(cfact * (-0.5 * log_det).exp() * component.weight * component.weight)
}
