//! FabricContext - 並列実行基盤から受け取る rank と world size
//!
//! 基盤（MPI ランチャーや Slurm）のグローバル状態を直接読まず、
//! join 時に一度だけ値として受け取り、以降は引数で引き回します。

use serde::{Deserialize, Serialize};

use super::errors::RankrunError;

/// This worker's place in its group. Immutable after join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricContext {
    rank: u32,
    world_size: u32,
}

impl FabricContext {
    /// `world_size >= 1` かつ `rank < world_size` を検証
    pub fn new(rank: u32, world_size: u32) -> Result<Self, RankrunError> {
        if world_size == 0 {
            return Err(RankrunError::FabricUnavailable(
                "world size must be at least 1".to_string(),
            ));
        }
        if rank >= world_size {
            return Err(RankrunError::FabricUnavailable(format!(
                "rank {rank} is outside a world of size {world_size}"
            )));
        }
        Ok(Self { rank, world_size })
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn world_size(&self) -> u32 {
        self.world_size
    }
}
