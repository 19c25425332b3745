//! Cross-rank reduction of per-bundle statistics. Single-process runs use
//! [`LocalReducer`] (identity); multi-rank runs enable the `mpi` feature
//! and use [`MpiReducer`], which sums element-wise across ranks via a
//! real collective all-reduce.

/// Element-wise sum reduction across whatever ranks participate in a run.
pub trait CollectiveReducer {
    fn reduce_sum_f64(&self, local: &[f64]) -> Vec<f64>;

    /// Number of ranks participating, for averaging a summed reduction.
    fn world_size(&self) -> usize;
}

/// Single-process reducer: every value is already the global value.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalReducer;

impl CollectiveReducer for LocalReducer {
    fn reduce_sum_f64(&self, local: &[f64]) -> Vec<f64> {
        local.to_vec()
    }

    fn world_size(&self) -> usize {
        1
    }
}

#[cfg(feature = "mpi")]
pub struct MpiReducer<'a> {
    world: &'a mpi::topology::SimpleCommunicator,
}

#[cfg(feature = "mpi")]
impl<'a> MpiReducer<'a> {
    pub fn new(world: &'a mpi::topology::SimpleCommunicator) -> Self {
        MpiReducer { world }
    }
}

#[cfg(feature = "mpi")]
impl<'a> CollectiveReducer for MpiReducer<'a> {
    fn reduce_sum_f64(&self, local: &[f64]) -> Vec<f64> {
        use mpi::collective::SystemOperation;
        use mpi::traits::*;

        let mut global = vec![0.0f64; local.len()];
        self.world.all_reduce_into(local, &mut global, SystemOperation::sum());
        global
    }

    fn world_size(&self) -> usize {
        self.world.size() as usize
    }
}
