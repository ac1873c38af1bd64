//! RecordingLauncher - 起動せずに記録だけする launcher（テスト用）
//!
//! 渡されたコマンド文字列を順に記録し、あらかじめ決めた LaunchResult を返します。

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::Invocation;
use crate::ports::{LaunchOptions, LaunchResult, ProcessLauncher};

pub struct RecordingLauncher {
    calls: Mutex<Vec<String>>,
    result: LaunchResult,
}

impl RecordingLauncher {
    pub fn new(result: LaunchResult) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            result,
        }
    }

    /// 終了コード 0 を返す
    pub fn succeeding() -> Self {
        Self::new(LaunchResult::exited(Some(0), 0))
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ProcessLauncher for RecordingLauncher {
    async fn launch(&self, invocation: &Invocation, _options: &LaunchOptions) -> LaunchResult {
        self.calls.lock().await.push(invocation.command_line());
        self.result.clone()
    }
}
