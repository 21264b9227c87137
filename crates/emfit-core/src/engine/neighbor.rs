use super::config::NeighborConfig;
use super::overlap::pair_overlap_value;
use super::pairs::PairTable;
use crate::core::gmm::DataGmm;
use nalgebra::Point3;
use tracing::trace;

/// The active (data, model) pair list.
///
/// Starts as the full Cartesian product. With a [`NeighborConfig`] the list
/// is rebuilt every `stride` steps, keeping only pairs whose overlap at the
/// current positions reaches the cutoff; without one the full list is kept
/// for the whole run.
#[derive(Debug, Clone)]
pub struct NeighborList {
    pairs: Vec<(usize, usize)>,
    config: Option<NeighborConfig>,
}

impl NeighborList {
    pub fn new(n_data: usize, n_model: usize, config: Option<NeighborConfig>) -> Self {
        let mut pairs = Vec::with_capacity(n_data * n_model);
        for i in 0..n_data {
            for j in 0..n_model {
                pairs.push((i, j));
            }
        }
        Self { pairs, config }
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Whether the stride gate fires at this step. Always false when
    /// neighbor listing is disabled.
    pub fn due(&self, step: u64) -> bool {
        match &self.config {
            Some(config) => step % config.stride == 0,
            None => false,
        }
    }

    /// Re-screens every (data, model) pair at the current positions and
    /// keeps those with overlap at or above the cutoff. A data component for
    /// which nothing passes keeps its single best pair instead, so every
    /// data index always contributes at least one term downstream.
    pub fn rebuild(&mut self, data: &DataGmm, table: &PairTable, positions: &[Point3<f64>]) {
        let Some(config) = self.config else {
            return;
        };

        self.pairs.clear();
        for (i, component) in data.components.iter().enumerate() {
            let mut retained = 0usize;
            let mut best_overlap = 0.0f64;
            let mut best_j = 0usize;

            for (j, position) in positions.iter().enumerate() {
                let k = table.index(i, j);
                let overlap = pair_overlap_value(
                    position,
                    &component.mean,
                    table.prefactor(k),
                    table.inv_combined(k),
                );
                if overlap >= config.cutoff {
                    self.pairs.push((i, j));
                    retained += 1;
                }
                if overlap >= best_overlap {
                    best_overlap = overlap;
                    best_j = j;
                }
            }

            if retained == 0 {
                self.pairs.push((i, best_j));
                trace!(
                    data_index = i,
                    best_overlap,
                    "all overlaps below cutoff, keeping best pair"
                );
            }
        }
    }
}
