use super::config::FitConfig;
use super::error::EngineError;
use super::neighbor::NeighborList;
use super::overlap::pair_overlap;
use super::pairs::{PairTable, self_overlap};
use super::partition::{ShardPlan, map_shards};
use crate::core::gmm::DataGmm;
use crate::core::io::gmm_file::load_gmm;
use crate::core::model::ModelGmm;
use nalgebra::{Point3, Vector3};
use tracing::{debug, info};

/// The per-step result handed back to the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The fit score, `kT * K/2 * ln(E)` with
    /// `E = sum_i ln^2(ovmd_i / ovdd_i)` over data components with positive
    /// overlap and `K` their count.
    pub score: f64,
    /// Score gradient with respect to each atom position, indexed like the
    /// configured atom list.
    pub atom_gradient: Vec<Vector3<f64>>,
    /// Diagnostic: accumulated model overlap per data component (`ovmd`).
    pub model_overlap: Vec<f64>,
    /// Diagnostic: self-overlap of each data component (`ovdd`), the
    /// normalization denominator of the log ratios. Constant for the run.
    pub self_overlap: Vec<f64>,
}

/// Scores an atomic model against a reference density map, both as GMMs.
///
/// All combinatorial precomputation happens in [`MapScorer::new`]; after
/// that, [`evaluate`](MapScorer::evaluate) is a bounded synchronous pass
/// over the active pair list. The scorer never owns atom positions: the
/// driver lends them as a slice each step, and the model component means
/// are exactly the entries of that slice.
pub struct MapScorer {
    data: DataGmm,
    model: ModelGmm,
    table: PairTable,
    self_overlaps: Vec<f64>,
    neighbors: NeighborList,
    kbt: f64,
    workers: usize,
}

impl MapScorer {
    /// Loads the data GMM, builds the model GMM, normalizes both weight
    /// populations, and caches the pair tables and self-overlaps.
    /// Every configuration or input-data fault surfaces here, before the
    /// first evaluation.
    pub fn new(config: FitConfig) -> Result<Self, EngineError> {
        let FitConfig {
            atoms,
            gmm_path,
            kbt,
            serial,
            neighbor,
        } = config;

        let mut model = ModelGmm::from_atoms(&atoms)?;
        let mut data = load_gmm(&gmm_path)?;
        if data.is_empty() {
            return Err(EngineError::EmptyDataGmm);
        }

        info!(
            atoms = atoms.len(),
            components = data.len(),
            path = %gmm_path.display(),
            "building density-fit scorer"
        );
        if serial {
            info!("serial evaluation requested");
        }
        if let Some(neighbor) = &neighbor {
            info!(
                cutoff = neighbor.cutoff,
                stride = neighbor.stride,
                "neighbor list enabled"
            );
        }

        model.normalize_weights();
        data.normalize_weights();

        let table = PairTable::build(&data, &model)?;
        let self_overlaps = data
            .components
            .iter()
            .map(self_overlap)
            .collect::<Result<Vec<_>, _>>()?;
        let neighbors = NeighborList::new(data.len(), model.len(), neighbor);
        let workers = if serial { 1 } else { default_workers() };

        Ok(Self {
            data,
            model,
            table,
            self_overlaps,
            neighbors,
            kbt,
            workers,
        })
    }

    /// Diagnostic: the self-overlap of each data component (`ovdd`),
    /// constant for the run.
    pub fn self_overlaps(&self) -> &[f64] {
        &self.self_overlaps
    }

    pub fn neighbor_pairs(&self) -> &[(usize, usize)] {
        self.neighbors.pairs()
    }

    /// One scoring step at the given atom positions.
    ///
    /// Rebuilds the neighbor list when its stride fires, accumulates the
    /// pairwise overlaps and their gradients over the active pair list, and
    /// assembles the log-ratio energy and the per-atom gradient. Fails with
    /// [`EngineError::DegenerateEnergy`] when no data component has positive
    /// overlap with the model, or when every log-ratio is exactly zero.
    pub fn evaluate(
        &mut self,
        positions: &[Point3<f64>],
        step: u64,
    ) -> Result<Evaluation, EngineError> {
        if positions.len() != self.model.len() {
            return Err(EngineError::PositionCountMismatch {
                expected: self.model.len(),
                actual: positions.len(),
            });
        }

        if self.neighbors.due(step) {
            self.neighbors.rebuild(&self.data, &self.table, positions);
            debug!(step, pairs = self.neighbors.len(), "neighbor list rebuilt");
        }

        let (model_overlap, pair_gradients) = self.accumulate_overlaps(positions);

        let mut terms = vec![0.0f64; model_overlap.len()];
        let mut energy = 0.0f64;
        let mut active = 0usize;
        for (i, &overlap) in model_overlap.iter().enumerate() {
            if overlap > 0.0 {
                let term = (overlap / self.self_overlaps[i]).ln();
                terms[i] = term;
                energy += term * term;
                active += 1;
            }
        }
        if energy == 0.0 {
            return Err(EngineError::DegenerateEnergy);
        }

        let excluded = model_overlap.len() - active;
        if excluded > 0 {
            debug!(
                step,
                excluded, "data components with zero overlap excluded from the energy"
            );
        }

        let fact = self.kbt * 0.5 * active as f64;
        let atom_gradient =
            self.assemble_gradient(&model_overlap, &terms, energy, fact, &pair_gradients);

        Ok(Evaluation {
            score: fact * energy.ln(),
            atom_gradient,
            model_overlap,
            self_overlap: self.self_overlaps.clone(),
        })
    }

    /// Sums pairwise overlaps into a per-data-component vector and records
    /// the per-pair gradients, with the pair list partitioned across
    /// workers. Each pair is owned by exactly one shard, so the gradient
    /// buffer merge is a disjoint union and the overlap merge is an ordered
    /// sum, reproducing the single-worker result for any worker count.
    fn accumulate_overlaps(&self, positions: &[Point3<f64>]) -> (Vec<f64>, Vec<Vector3<f64>>) {
        let pairs = self.neighbors.pairs();
        let plan = ShardPlan::new(pairs.len(), self.workers);

        let locals = map_shards(plan, |shard| {
            let mut overlap_acc = vec![0.0f64; self.data.len()];
            let mut gradients = Vec::new();
            for k in plan.shard(shard) {
                let (i, j) = pairs[k];
                let pair_index = self.table.index(i, j);
                let (overlap, gradient) = pair_overlap(
                    &positions[j],
                    &self.data.components[i].mean,
                    self.table.prefactor(pair_index),
                    self.table.inv_combined(pair_index),
                );
                overlap_acc[i] += overlap;
                gradients.push((k, gradient));
            }
            (overlap_acc, gradients)
        });

        let mut model_overlap = vec![0.0f64; self.data.len()];
        let mut pair_gradients = vec![Vector3::zeros(); pairs.len()];
        for (local_overlap, local_gradients) in locals {
            for (acc, local) in model_overlap.iter_mut().zip(&local_overlap) {
                *acc += local;
            }
            for (k, gradient) in local_gradients {
                pair_gradients[k] = gradient;
            }
        }
        (model_overlap, pair_gradients)
    }

    /// Back-propagates the energy terms through the pair gradients into
    /// per-atom vectors: `kT * K * term_i / (E * ovmd_i) * grad_pair`.
    /// Components with zero overlap were excluded from the energy and are
    /// skipped here too.
    fn assemble_gradient(
        &self,
        model_overlap: &[f64],
        terms: &[f64],
        energy: f64,
        fact: f64,
        pair_gradients: &[Vector3<f64>],
    ) -> Vec<Vector3<f64>> {
        let pairs = self.neighbors.pairs();
        let plan = ShardPlan::new(pairs.len(), self.workers);

        let locals = map_shards(plan, |shard| {
            let mut local = vec![Vector3::zeros(); self.model.len()];
            for k in plan.shard(shard) {
                let (i, j) = pairs[k];
                if model_overlap[i] > 0.0 {
                    let scale = 2.0 * fact / energy * terms[i] / model_overlap[i];
                    local[j] += scale * pair_gradients[k];
                }
            }
            local
        });

        let mut atom_gradient = vec![Vector3::zeros(); self.model.len()];
        for local in locals {
            for (acc, shard_value) in atom_gradient.iter_mut().zip(&local) {
                *acc += shard_value;
            }
        }
        atom_gradient
    }
}

fn default_workers() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Atom;
    use crate::engine::config::FitConfigBuilder;
    use std::f64::consts::PI;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const HEADER: &str =
        "Id,Weight,Mean_0,Mean_1,Mean_2,Cov_00,Cov_01,Cov_02,Cov_10,Cov_11,Cov_12,Cov_20,Cov_21,Cov_22";

    /// Spherical model covariance for carbon, in nm^2.
    fn carbon_variance() -> f64 {
        let s = (0.5 * 14.8957682987f64).sqrt() / PI * 0.1;
        s * s
    }

    fn write_gmm(records: &[(f64, [f64; 3], f64)]) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.gmm");
        let mut body = format!("{HEADER}\n");
        for (id, (weight, mean, variance)) in records.iter().enumerate() {
            body.push_str(&format!(
                "{id},{weight},{},{},{},{variance},0.0,0.0,0.0,{variance},0.0,0.0,0.0,{variance}\n",
                mean[0], mean[1], mean[2]
            ));
        }
        fs::write(&path, body).unwrap();
        (dir, path)
    }

    fn carbon_scorer(data_mean: [f64; 3]) -> (TempDir, MapScorer) {
        let (dir, path) = write_gmm(&[(1.0, data_mean, carbon_variance())]);
        let config = FitConfigBuilder::new()
            .atoms(vec![Atom::new(1, "C")])
            .gmm_path(path)
            .kbt(2.49)
            .build()
            .unwrap();
        (dir, MapScorer::new(config).unwrap())
    }

    #[test]
    fn perfectly_matched_single_component_is_degenerate() {
        // One carbon atom sitting exactly on an identical data component:
        // ovmd == ovdd, the log ratio is exactly zero, and the energy
        // accumulator stays at zero.
        let (_dir, mut scorer) = carbon_scorer([0.0, 0.0, 0.0]);
        let result = scorer.evaluate(&[Point3::origin()], 0);
        assert!(matches!(result, Err(EngineError::DegenerateEnergy)));
    }

    #[test]
    fn far_displaced_component_is_degenerate() {
        // 10 nm away the overlap underflows to zero, the only data
        // component is excluded, and nothing is left in the energy.
        let (_dir, mut scorer) = carbon_scorer([10.0, 10.0, 10.0]);
        let result = scorer.evaluate(&[Point3::origin()], 0);
        assert!(matches!(result, Err(EngineError::DegenerateEnergy)));
    }

    #[test]
    fn displaced_atom_gives_finite_score_and_restoring_gradient() {
        let (_dir, mut scorer) = carbon_scorer([0.0, 0.0, 0.0]);
        let positions = vec![Point3::new(0.05, 0.0, 0.0)];
        let evaluation = scorer.evaluate(&positions, 0).unwrap();

        assert!(evaluation.score.is_finite());
        assert_eq!(evaluation.atom_gradient.len(), 1);
        assert_eq!(evaluation.model_overlap.len(), 1);
        assert!(evaluation.model_overlap[0] > 0.0);
        assert!(evaluation.model_overlap[0] < scorer.self_overlaps()[0]);
        assert_eq!(evaluation.self_overlap, scorer.self_overlaps());
        // The gradient must have a component along the displacement axis.
        assert!(evaluation.atom_gradient[0].x != 0.0);
    }

    #[test]
    fn matched_overlap_equals_self_overlap() {
        let (_dir, mut scorer) = carbon_scorer([0.0, 0.0, 0.0]);
        // A second probe position keeps the energy away from zero so that
        // evaluate succeeds while we inspect ovmd against ovdd.
        let evaluation = scorer.evaluate(&[Point3::new(0.03, 0.0, 0.0)], 0).unwrap();
        assert!(evaluation.model_overlap[0] < scorer.self_overlaps()[0]);

        let matched = scorer.evaluate(&[Point3::origin()], 0);
        // At the matched position the ratio is exactly one.
        assert!(matches!(matched, Err(EngineError::DegenerateEnergy)));
    }

    #[test]
    fn self_overlaps_are_positive() {
        let (_dir, scorer) = carbon_scorer([0.0, 0.0, 0.0]);
        assert!(scorer.self_overlaps().iter().all(|&ov| ov > 0.0));
    }

    #[test]
    fn position_count_mismatch_is_rejected() {
        let (_dir, mut scorer) = carbon_scorer([0.0, 0.0, 0.0]);
        let result = scorer.evaluate(&[], 0);
        assert!(matches!(
            result,
            Err(EngineError::PositionCountMismatch {
                expected: 1,
                actual: 0
            })
        ));
    }

    #[test]
    fn missing_gmm_file_fails_at_setup() {
        let dir = TempDir::new().unwrap();
        let config = FitConfigBuilder::new()
            .atoms(vec![Atom::new(1, "C")])
            .gmm_path(dir.path().join("absent.gmm"))
            .kbt(1.0)
            .build()
            .unwrap();
        assert!(matches!(
            MapScorer::new(config),
            Err(EngineError::GmmLoad { .. })
        ));
    }

    #[test]
    fn empty_gmm_file_fails_at_setup() {
        let (_dir, path) = write_gmm(&[]);
        let config = FitConfigBuilder::new()
            .atoms(vec![Atom::new(1, "C")])
            .gmm_path(path)
            .kbt(1.0)
            .build()
            .unwrap();
        assert!(matches!(
            MapScorer::new(config),
            Err(EngineError::EmptyDataGmm)
        ));
    }

    fn multi_component_scorer() -> (TempDir, MapScorer, Vec<Point3<f64>>) {
        let v = carbon_variance();
        let (dir, path) = write_gmm(&[
            (0.4, [0.0, 0.0, 0.0], v),
            (0.3, [0.3, 0.1, 0.0], 2.0 * v),
            (0.3, [-0.2, 0.2, 0.1], 1.5 * v),
        ]);
        let config = FitConfigBuilder::new()
            .atoms(vec![Atom::new(1, "CA"), Atom::new(2, "N"), Atom::new(3, "O")])
            .gmm_path(path)
            .kbt(2.49)
            .build()
            .unwrap();
        let scorer = MapScorer::new(config).unwrap();
        let positions = vec![
            Point3::new(0.02, 0.01, 0.0),
            Point3::new(0.28, 0.12, -0.01),
            Point3::new(-0.22, 0.18, 0.11),
        ];
        (dir, scorer, positions)
    }

    #[test]
    fn evaluation_carries_both_overlap_diagnostics() {
        let (_dir, mut scorer, positions) = multi_component_scorer();
        let evaluation = scorer.evaluate(&positions, 0).unwrap();

        // ovmd and ovdd come back side by side, one entry per data
        // component, with ovdd matching the cached run constants.
        assert_eq!(evaluation.model_overlap.len(), evaluation.self_overlap.len());
        assert_eq!(evaluation.self_overlap, scorer.self_overlaps());
        assert!(evaluation.self_overlap.iter().all(|&ov| ov > 0.0));
    }

    #[test]
    fn result_is_invariant_to_worker_count() {
        let (_dir, mut scorer, positions) = multi_component_scorer();

        scorer.workers = 1;
        let single = scorer.evaluate(&positions, 0).unwrap();

        scorer.workers = 4;
        let sharded = scorer.evaluate(&positions, 0).unwrap();

        assert!((single.score - sharded.score).abs() < 1e-12);
        for (a, b) in single.model_overlap.iter().zip(&sharded.model_overlap) {
            assert!((a - b).abs() < 1e-12);
        }
        for (a, b) in single.atom_gradient.iter().zip(&sharded.atom_gradient) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn gradient_matches_finite_difference_of_score() {
        let (_dir, mut scorer, positions) = multi_component_scorer();
        let evaluation = scorer.evaluate(&positions, 0).unwrap();

        let h = 1e-7;
        for atom in 0..positions.len() {
            for axis in 0..3 {
                let mut plus = positions.clone();
                let mut minus = positions.clone();
                plus[atom][axis] += h;
                minus[atom][axis] -= h;
                let numeric = (scorer.evaluate(&plus, 0).unwrap().score
                    - scorer.evaluate(&minus, 0).unwrap().score)
                    / (2.0 * h);
                let analytic = evaluation.atom_gradient[atom][axis];
                assert!(
                    (analytic - numeric).abs() < 1e-4 * analytic.abs().max(1.0),
                    "atom {atom} axis {axis}: analytic {analytic} vs numeric {numeric}"
                );
            }
        }
    }

    #[test]
    fn neighbor_list_prunes_but_keeps_every_data_component() {
        let v = carbon_variance();
        let (_dir, path) = write_gmm(&[
            (0.5, [0.0, 0.0, 0.0], v),
            (0.5, [5.0, 0.0, 0.0], v),
        ]);
        let config = FitConfigBuilder::new()
            .atoms(vec![Atom::new(1, "C"), Atom::new(2, "C")])
            .gmm_path(path)
            .kbt(2.49)
            .neighbor_list(true)
            .neighbor_cutoff(1e-3)
            .neighbor_stride(1)
            .build()
            .unwrap();
        let mut scorer = MapScorer::new(config).unwrap();

        // Both atoms near the first component; the second component falls
        // back to its best pair.
        let positions = vec![Point3::new(0.01, 0.0, 0.0), Point3::new(-0.01, 0.0, 0.0)];
        let _ = scorer.evaluate(&positions, 0);

        let pairs = scorer.neighbor_pairs();
        assert!(pairs.len() < 4, "cutoff should prune the full product");
        for i in 0..2 {
            assert!(pairs.iter().any(|&(d, _)| d == i));
        }
    }

    #[test]
    fn neighbor_list_rebuild_respects_the_stride() {
        let v = carbon_variance();
        let (_dir, path) = write_gmm(&[(1.0, [0.0, 0.0, 0.0], v)]);
        let config = FitConfigBuilder::new()
            .atoms(vec![Atom::new(1, "C"), Atom::new(2, "C")])
            .gmm_path(path)
            .kbt(2.49)
            .neighbor_list(true)
            .neighbor_cutoff(1e-3)
            .neighbor_stride(10)
            .build()
            .unwrap();
        let mut scorer = MapScorer::new(config).unwrap();

        let near = vec![Point3::new(0.01, 0.0, 0.0), Point3::new(-0.01, 0.0, 0.0)];
        let _ = scorer.evaluate(&near, 0);
        assert_eq!(scorer.neighbor_pairs().len(), 2);

        // Step 5 is off-stride: moving an atom away must not shrink the list.
        let moved = vec![Point3::new(0.01, 0.0, 0.0), Point3::new(8.0, 0.0, 0.0)];
        let _ = scorer.evaluate(&moved, 5);
        assert_eq!(scorer.neighbor_pairs().len(), 2);

        // Step 10 hits the stride and drops the far pair.
        let _ = scorer.evaluate(&moved, 10);
        assert_eq!(scorer.neighbor_pairs().len(), 1);
    }

    #[test]
    fn serial_configuration_uses_one_worker() {
        let v = carbon_variance();
        let (_dir, path) = write_gmm(&[(1.0, [0.0, 0.0, 0.0], v)]);
        let config = FitConfigBuilder::new()
            .atoms(vec![Atom::new(1, "C")])
            .gmm_path(path)
            .kbt(1.0)
            .serial(true)
            .build()
            .unwrap();
        let scorer = MapScorer::new(config).unwrap();
        assert_eq!(scorer.workers, 1);
    }
}
