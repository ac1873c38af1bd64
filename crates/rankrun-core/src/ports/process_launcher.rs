//! ProcessLauncher port - コマンド文字列を子プロセスとして実行する
//!
//! launch() は失敗も含めて LaunchResult を返し、Result にはしません。
//! 終了コードを捨てるか伝えるかは Dispatcher の StatusPolicy が決めます。

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::Invocation;

/// How the child ended (or why it never started).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStatus {
    Exited,
    /// 終了コードなしで終わった（Unix のシグナル）
    Signalled,
    TimedOut,
    Cancelled,
    NotStarted,
    /// 起動はしたが終了を待てなかった（ジョブは止めてある）
    WaitFailed,
}

/// Structured result of one launch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchResult {
    pub status: LaunchStatus,
    pub exit_code: Option<i32>,
    pub launch_error: Option<String>,
    pub elapsed_ms: u64,
}

impl LaunchResult {
    pub fn exited(exit_code: Option<i32>, elapsed_ms: u64) -> Self {
        Self {
            status: if exit_code.is_some() {
                LaunchStatus::Exited
            } else {
                LaunchStatus::Signalled
            },
            exit_code,
            launch_error: None,
            elapsed_ms,
        }
    }

    pub fn not_started(error: impl Into<String>) -> Self {
        Self {
            status: LaunchStatus::NotStarted,
            exit_code: None,
            launch_error: Some(error.into()),
            elapsed_ms: 0,
        }
    }

    pub fn wait_failed(error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            status: LaunchStatus::WaitFailed,
            exit_code: None,
            launch_error: Some(error.into()),
            elapsed_ms,
        }
    }

    pub fn timed_out(elapsed_ms: u64) -> Self {
        Self {
            status: LaunchStatus::TimedOut,
            exit_code: None,
            launch_error: None,
            elapsed_ms,
        }
    }

    pub fn cancelled(elapsed_ms: u64) -> Self {
        Self {
            status: LaunchStatus::Cancelled,
            exit_code: None,
            launch_error: None,
            elapsed_ms,
        }
    }

    pub fn success(&self) -> bool {
        self.status == LaunchStatus::Exited && self.exit_code == Some(0)
    }
}

/// Per-launch limits.
///
/// - `timeout`: 経過したら子プロセスを kill して TimedOut
/// - `cancel`: `true` が送られたら子プロセスを kill して Cancelled
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<watch::Receiver<bool>>,
}

impl LaunchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// 子プロセスを起動し、終わるまで待つ
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, invocation: &Invocation, options: &LaunchOptions) -> LaunchResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exited_without_code_is_signalled() {
        let r = LaunchResult::exited(None, 5);
        assert_eq!(r.status, LaunchStatus::Signalled);
        assert!(!r.success());
    }

    #[test]
    fn only_zero_exit_is_success() {
        assert!(LaunchResult::exited(Some(0), 1).success());
        assert!(!LaunchResult::exited(Some(1), 1).success());
        assert!(!LaunchResult::not_started("missing").success());
        assert!(!LaunchResult::timed_out(10).success());
        assert!(!LaunchResult::wait_failed("wait failed", 10).success());
    }

    #[test]
    fn wait_failure_keeps_elapsed_time() {
        let r = LaunchResult::wait_failed("sh: wait failed: interrupted", 420);
        assert_eq!(r.status, LaunchStatus::WaitFailed);
        assert_eq!(r.elapsed_ms, 420);
        assert_eq!(r.launch_error.as_deref(), Some("sh: wait failed: interrupted"));
    }
}
