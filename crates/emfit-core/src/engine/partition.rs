#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Round-robin partition of an index space across a fixed number of workers.
///
/// Shards are disjoint and cover every index, so a buffer indexed by item
/// can be merged across shards by plain assignment with no double counting,
/// and per-shard scalar accumulators can be summed in shard order. The
/// reduced result is invariant to the shard count up to floating-point
/// summation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardPlan {
    n_items: usize,
    n_shards: usize,
}

impl ShardPlan {
    pub fn new(n_items: usize, n_shards: usize) -> Self {
        Self {
            n_items,
            n_shards: n_shards.max(1),
        }
    }

    pub fn n_shards(&self) -> usize {
        self.n_shards
    }

    /// The item indices owned by one shard.
    pub fn shard(&self, shard: usize) -> impl Iterator<Item = usize> + use<> {
        (shard..self.n_items).step_by(self.n_shards)
    }
}

/// Runs one closure per shard and returns the shard-local results in shard
/// order, in parallel when the `parallel` feature is enabled.
pub fn map_shards<T, F>(plan: ShardPlan, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..plan.n_shards()).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..plan.n_shards()).map(f).collect()
    }
}
