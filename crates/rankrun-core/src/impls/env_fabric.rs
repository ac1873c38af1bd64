//! EnvFabric - 並列ランチャーが設定する環境変数から rank / world size を読む
//!
//! 上から順に探し、最初に rank 変数が見つかった組を使います。
//!
//! | ランチャー    | rank                   | world size             |
//! |---------------|------------------------|------------------------|
//! | Open MPI      | `OMPI_COMM_WORLD_RANK` | `OMPI_COMM_WORLD_SIZE` |
//! | MPICH / Hydra | `PMI_RANK`             | `PMI_SIZE`             |
//! | Slurm         | `SLURM_PROCID`         | `SLURM_NTASKS`         |

use crate::domain::{FabricContext, RankrunError};
use crate::ports::Fabric;

pub const LAUNCHER_VARS: &[(&str, &str)] = &[
    ("OMPI_COMM_WORLD_RANK", "OMPI_COMM_WORLD_SIZE"),
    ("PMI_RANK", "PMI_SIZE"),
    ("SLURM_PROCID", "SLURM_NTASKS"),
];

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct EnvFabric {
    lookup: Lookup,
}

impl EnvFabric {
    /// プロセスの環境変数を読む
    pub fn from_env() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の lookup 関数で読む（テストでは HashMap を渡す）
    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn parse(&self, key: &str, value: &str) -> Result<u32, RankrunError> {
        value.trim().parse().map_err(|e| {
            RankrunError::FabricUnavailable(format!("{key}={value:?} is not a valid number: {e}"))
        })
    }
}

impl Fabric for EnvFabric {
    fn join(&self) -> Result<FabricContext, RankrunError> {
        for &(rank_key, size_key) in LAUNCHER_VARS {
            let Some(rank) = (self.lookup)(rank_key) else {
                continue;
            };
            let rank = self.parse(rank_key, &rank)?;
            let size = (self.lookup)(size_key).ok_or_else(|| {
                RankrunError::FabricUnavailable(format!("{rank_key} is set but {size_key} is not"))
            })?;
            let world_size = self.parse(size_key, &size)?;

            let ctx = FabricContext::new(rank, world_size)?;
            tracing::debug!(rank_key, rank, world_size, "Joined fabric from environment");
            return Ok(ctx);
        }

        let searched: Vec<&str> = LAUNCHER_VARS.iter().map(|(rank, _)| *rank).collect();
        Err(RankrunError::FabricUnavailable(format!(
            "no launcher rank variable found (looked for {})",
            searched.join(", ")
        )))
    }

    fn leave(&self, ctx: &FabricContext) {
        // グループの後始末はランチャー側が行う
        tracing::debug!(rank = ctx.rank(), "Left fabric");
    }

    fn name(&self) -> &'static str {
        "env"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fabric(vars: &[(&str, &str)]) -> EnvFabric {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvFabric::with_lookup(move |key| map.get(key).cloned())
    }

    #[test]
    fn reads_open_mpi_variables() {
        let ctx = fabric(&[("OMPI_COMM_WORLD_RANK", "3"), ("OMPI_COMM_WORLD_SIZE", "8")])
            .join()
            .unwrap();
        assert_eq!((ctx.rank(), ctx.world_size()), (3, 8));
    }

    #[test]
    fn reads_slurm_variables() {
        let ctx = fabric(&[("SLURM_PROCID", "0"), ("SLURM_NTASKS", "2")])
            .join()
            .unwrap();
        assert_eq!((ctx.rank(), ctx.world_size()), (0, 2));
    }

    #[test]
    fn open_mpi_wins_over_slurm() {
        let ctx = fabric(&[
            ("SLURM_PROCID", "5"),
            ("SLURM_NTASKS", "6"),
            ("OMPI_COMM_WORLD_RANK", "1"),
            ("OMPI_COMM_WORLD_SIZE", "2"),
        ])
        .join()
        .unwrap();
        assert_eq!(ctx.rank(), 1);
    }

    #[test]
    fn missing_variables_are_fabric_unavailable() {
        let err = fabric(&[]).join().unwrap_err();
        assert!(matches!(err, RankrunError::FabricUnavailable(_)));
        assert!(err.to_string().contains("OMPI_COMM_WORLD_RANK"));
    }

    #[test]
    fn rank_without_size_is_fabric_unavailable() {
        let err = fabric(&[("PMI_RANK", "0")]).join().unwrap_err();
        assert!(err.to_string().contains("PMI_SIZE"));
    }

    #[test]
    fn garbage_rank_is_fabric_unavailable() {
        let err = fabric(&[("PMI_RANK", "-1"), ("PMI_SIZE", "4")]).join().unwrap_err();
        assert!(matches!(err, RankrunError::FabricUnavailable(_)));
    }

    #[test]
    fn rank_outside_world_is_rejected() {
        let err = fabric(&[("PMI_RANK", "4"), ("PMI_SIZE", "4")]).join().unwrap_err();
        assert!(matches!(err, RankrunError::FabricUnavailable(_)));
    }
}
