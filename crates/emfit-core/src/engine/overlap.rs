use crate::core::math::quadratic_form;
use nalgebra::{Matrix3, Point3, Vector3};

/// Analytic overlap integral between a model component centered at the live
/// atom position and a data component, together with its gradient with
/// respect to the model mean:
///
/// ```text
/// delta   = m - d
/// overlap = prefactor * exp(-0.5 * delta^T * S^-1 * delta)
/// grad_m  = -overlap * (S^-1 * delta)
/// ```
///
/// Only the model-side gradient exists: data means are fixed, atom positions
/// are the dynamical variables.
#[inline]
pub fn pair_overlap(
    model_mean: &Point3<f64>,
    data_mean: &Point3<f64>,
    prefactor: f64,
    inv_combined: &Matrix3<f64>,
) -> (f64, Vector3<f64>) {
    let delta = model_mean - data_mean;
    let contracted = inv_combined * delta;
    let overlap = prefactor * (-0.5 * contracted.dot(&delta)).exp();
    (overlap, -overlap * contracted)
}

/// Overlap only, for neighbor-list screening where the gradient is unused.
#[inline]
pub fn pair_overlap_value(
    model_mean: &Point3<f64>,
    data_mean: &Point3<f64>,
    prefactor: f64,
    inv_combined: &Matrix3<f64>,
) -> f64 {
    let delta = model_mean - data_mean;
    prefactor * (-0.5 * quadratic_form(inv_combined, &delta)).exp()
}
