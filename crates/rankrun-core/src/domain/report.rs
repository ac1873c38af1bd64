//! RunReport - 1 回の実行結果のまとめ
//!
//! CLI の `--report json` で 1 行の JSON として出力されます。
//! 途中で失敗した場合、そこまでに分かった項目だけが埋まります。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::RankrunError;
use super::fabric::FabricContext;
use super::ids::RunId;
use super::outcome::{OutcomeKind, RunOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,

    /// Name of the fabric the run joined (`env`, `static`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fabric: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_index: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_index: Option<u64>,

    pub outcome: OutcomeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation: Option<String>,

    /// Exit status of the launched job, if it ran to completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_exit_code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,

    /// Status this process should exit with.
    pub exit_status: u8,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// まだ何も決まっていないレポート（finish / fail で確定させる）
    pub fn started(run_id: RunId, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            fabric: None,
            rank: None,
            world_size: None,
            batch_index: None,
            line_index: None,
            outcome: OutcomeKind::Failed,
            invocation: None,
            job_exit_code: None,
            error: None,
            exit_status: 1,
            started_at,
            finished_at: started_at,
        }
    }

    pub fn record_context(&mut self, ctx: &FabricContext) {
        self.rank = Some(ctx.rank());
        self.world_size = Some(ctx.world_size());
    }

    pub fn finish(&mut self, outcome: RunOutcome, finished_at: DateTime<Utc>) {
        self.outcome = outcome.kind();
        if let RunOutcome::Dispatched { exit_code } = outcome {
            self.job_exit_code = exit_code;
        }
        self.exit_status = 0;
        self.finished_at = finished_at;
    }

    pub fn fail(&mut self, err: &RankrunError, finished_at: DateTime<Utc>) {
        self.outcome = OutcomeKind::Failed;
        if let RankrunError::JobFailed { code, .. } = err {
            self.job_exit_code = *code;
        }
        self.error = Some(ErrorReport {
            kind: err.kind().to_string(),
            message: err.to_string(),
        });
        self.exit_status = err.exit_code();
        self.finished_at = finished_at;
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
