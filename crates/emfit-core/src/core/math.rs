use nalgebra::{Cholesky, Matrix3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("Covariance matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("Covariance matrix is singular and cannot be inverted")]
    Singular,
}

/// Log-determinant of a symmetric positive-definite 3x3 matrix, via a
/// Cholesky factorization. Covariance magnitudes span roughly 1e-4 to 1e2
/// nm^2 (atomic widths versus map voxels), so the determinant itself is kept
/// in log space throughout.
pub fn log_determinant(m: &Matrix3<f64>) -> Result<f64, MathError> {
    let chol = Cholesky::new(*m).ok_or(MathError::NotPositiveDefinite)?;
    let log_det: f64 = chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum();
    Ok(2.0 * log_det)
}

pub fn invert(m: &Matrix3<f64>) -> Result<Matrix3<f64>, MathError> {
    m.try_inverse().ok_or(MathError::Singular)
}

/// The contraction `v^T * m * v`.
#[inline]
pub fn quadratic_form(m: &Matrix3<f64>, v: &Vector3<f64>) -> f64 {
    (m * v).dot(v)
}
