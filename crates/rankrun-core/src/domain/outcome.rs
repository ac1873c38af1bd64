//! Outcome model: how one run cycle ended.
//!
//! 状態遷移は 1 本だけです。
//! - `Idle → Dispatched`（descriptor が見つかり、起動した）
//! - `Idle → Skipped`（M が manifest の行数以上）
//! - `Idle → Planned`（dry run: 起動コマンドを組み立てただけ）
//!
//! 失敗は RankrunError として返り、レポート上は `Failed` になります。

use serde::{Deserialize, Serialize};

/// Terminal state of a successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// `exit_code` is the job's own status; `None` when it was killed by a signal.
    Dispatched { exit_code: Option<i32> },
    Skipped,
    Planned,
}

impl RunOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Dispatched { .. } => OutcomeKind::Dispatched,
            Self::Skipped => OutcomeKind::Skipped,
            Self::Planned => OutcomeKind::Planned,
        }
    }
}

/// Serialized as snake_case in the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Dispatched,
    Skipped,
    Planned,
    Failed,
}
