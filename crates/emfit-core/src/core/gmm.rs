use nalgebra::{Matrix3, Point3};

/// One weighted 3-D Gaussian component of a mixture.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianComponent {
    pub weight: f64,
    pub mean: Point3<f64>,
    /// Symmetric positive-definite covariance, in nm^2.
    pub covariance: Matrix3<f64>,
}

/// The reference (data) mixture loaded from a parameter file. Component
/// order is preserved from the file; indices are the stable identifiers used
/// by the pair tables and the neighbor list.
#[derive(Debug, Clone, PartialEq)]
pub struct DataGmm {
    pub components: Vec<GaussianComponent>,
}

impl DataGmm {
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Rescales the weights to sum to one. Each component is individually
    /// normalized, so dividing by the weight sum is all that is needed.
    pub fn normalize_weights(&mut self) {
        let total: f64 = self.components.iter().map(|c| c.weight).sum();
        for component in &mut self.components {
            component.weight /= total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(weight: f64) -> GaussianComponent {
        GaussianComponent {
            weight,
            mean: Point3::origin(),
            covariance: Matrix3::identity(),
        }
    }

    #[test]
    fn normalize_weights_sums_to_one() {
        let mut gmm = DataGmm {
            components: vec![component(2.0), component(3.0), component(5.0)],
        };
        gmm.normalize_weights();

        let total: f64 = gmm.components.iter().map(|c| c.weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((gmm.components[0].weight - 0.2).abs() < 1e-12);
    }

    #[test]
    fn normalize_weights_preserves_relative_magnitudes() {
        let mut gmm = DataGmm {
            components: vec![component(1.0), component(4.0)],
        };
        gmm.normalize_weights();
        assert!((gmm.components[1].weight / gmm.components[0].weight - 4.0).abs() < 1e-12);
    }
}
