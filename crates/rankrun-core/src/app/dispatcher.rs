//! Dispatcher - descriptor と rank から起動コマンドを作って実行する
//!
//! 起動自体の失敗（shell が無い、権限が無い）は LaunchFailed。
//! ジョブの終了コードの扱いは StatusPolicy で決めます。既定は Discard（記録だけして成功扱い）。

use serde::{Deserialize, Serialize};

use crate::domain::{Invocation, RankrunError, TaskDescriptor};
use crate::ports::{LaunchOptions, LaunchStatus, ProcessLauncher};

/// ジョブが非ゼロで終わったときの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// 警告ログだけ出して成功扱い
    #[default]
    Discard,
    /// JobFailed にしてジョブの終了コードで終了する
    Propagate,
}

pub struct Dispatcher<L> {
    launcher: L,
    runner: String,
    status_policy: StatusPolicy,
    options: LaunchOptions,
}

impl<L: ProcessLauncher> Dispatcher<L> {
    pub fn new(launcher: L, runner: impl Into<String>) -> Self {
        Self {
            launcher,
            runner: runner.into(),
            status_policy: StatusPolicy::default(),
            options: LaunchOptions::default(),
        }
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn with_options(mut self, options: LaunchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn options(&self) -> &LaunchOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut LaunchOptions {
        &mut self.options
    }

    /// `<runner> <descriptor> <rank>`
    pub fn invocation(&self, descriptor: TaskDescriptor, rank: u32) -> Invocation {
        Invocation::new(self.runner.clone(), descriptor, rank)
    }

    /// Build the invocation and run it.
    pub async fn dispatch(
        &self,
        descriptor: TaskDescriptor,
        rank: u32,
    ) -> Result<Option<i32>, RankrunError> {
        let invocation = self.invocation(descriptor, rank);
        self.execute(&invocation).await
    }

    /// 組み立て済みの invocation を実行し、ジョブの終了コードを返す
    pub async fn execute(&self, invocation: &Invocation) -> Result<Option<i32>, RankrunError> {
        let command_line = invocation.command_line();
        tracing::info!(invocation = %command_line, "Dispatching job");

        let result = self.launcher.launch(invocation, &self.options).await;
        match result.status {
            LaunchStatus::NotStarted => Err(RankrunError::LaunchFailed {
                invocation: command_line,
                reason: result
                    .launch_error
                    .unwrap_or_else(|| "unknown launch error".to_string()),
            }),
            LaunchStatus::WaitFailed => Err(RankrunError::LaunchFailed {
                invocation: command_line,
                reason: format!(
                    "job started but was lost after {}ms: {}",
                    result.elapsed_ms,
                    result.launch_error.unwrap_or_default()
                ),
            }),
            LaunchStatus::TimedOut => Err(RankrunError::LaunchTimedOut {
                invocation: command_line,
                elapsed_ms: result.elapsed_ms,
            }),
            LaunchStatus::Cancelled => Err(RankrunError::LaunchCancelled {
                invocation: command_line,
            }),
            LaunchStatus::Exited | LaunchStatus::Signalled => {
                if result.success() {
                    tracing::info!(elapsed_ms = result.elapsed_ms, "Job finished");
                    return Ok(result.exit_code);
                }
                match self.status_policy {
                    StatusPolicy::Discard => {
                        tracing::warn!(
                            exit_code = ?result.exit_code,
                            elapsed_ms = result.elapsed_ms,
                            "Job exited unsuccessfully, status discarded"
                        );
                        Ok(result.exit_code)
                    }
                    StatusPolicy::Propagate => Err(RankrunError::JobFailed {
                        invocation: command_line,
                        code: result.exit_code,
                    }),
                }
            }
        }
    }
}
