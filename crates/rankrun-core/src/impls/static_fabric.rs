//! StaticFabric - rank / world size を明示的に与える
//!
//! ランチャーを使わない単独実行や、手元での再実行に使います。

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{FabricContext, RankrunError};
use crate::ports::Fabric;

#[derive(Debug, Default)]
pub struct StaticFabric {
    rank: u32,
    world_size: u32,
    leaves: AtomicUsize,
}

impl StaticFabric {
    pub fn new(rank: u32, world_size: u32) -> Self {
        Self {
            rank,
            world_size,
            leaves: AtomicUsize::new(0),
        }
    }

    /// leave が呼ばれた回数
    pub fn leave_count(&self) -> usize {
        self.leaves.load(Ordering::Relaxed)
    }
}

impl Fabric for StaticFabric {
    fn join(&self) -> Result<FabricContext, RankrunError> {
        FabricContext::new(self.rank, self.world_size)
    }

    fn leave(&self, ctx: &FabricContext) {
        self.leaves.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(rank = ctx.rank(), "Left fabric");
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
