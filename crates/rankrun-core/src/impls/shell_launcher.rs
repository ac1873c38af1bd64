//! ShellLauncher - `sh -c <invocation>` で起動して終了を待つ
//!
//! stdin / stdout / stderr は親から引き継ぎます（ジョブの出力はそのまま端末やログに出ます）。
//!
//! Unix ではジョブを専用のプロセスグループで起動します。タイムアウトとキャンセルのときは
//! `sh` だけでなくグループ全体に SIGKILL を送り、子プロセスを回収してから返します。
//! 端末の Ctrl-C はジョブに直接届かず、rankrun 経由のキャンセルで止まります。
//! フォアグラウンドのグループではないので、端末から読もうとするジョブは SIGTTIN で停止します。

use std::future::pending;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::watch;

use crate::domain::Invocation;
use crate::ports::{LaunchOptions, LaunchResult, ProcessLauncher};

#[derive(Debug, Clone)]
pub struct ShellLauncher {
    program: String,
    args: Vec<String>,
}

impl ShellLauncher {
    /// `program args... <command line>` で起動する
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new("sh", vec!["-c".to_string()])
    }
}

enum Waited {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(d) => tokio::time::sleep(d).await,
        None => pending().await,
    }
}

async fn cancelled(cancel: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = cancel else {
        return pending().await;
    };
    loop {
        let requested = *rx.borrow_and_update();
        if requested {
            return;
        }
        // sender が drop されたらキャンセルは二度と来ない
        if rx.changed().await.is_err() {
            return pending().await;
        }
    }
}

/// pgid = pid の新しいプロセスグループで起動する
#[cfg(unix)]
fn isolate(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_cmd: &mut Command) {}

#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        tracing::warn!(pgid = pid, error = %e, "Failed to kill job process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

/// ジョブ全体を止めて、`sh` を回収する
async fn terminate(child: &mut Child, why: &'static str) {
    kill_group(child);
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, why, "Failed to kill job");
    }
}

#[async_trait]
impl ProcessLauncher for ShellLauncher {
    async fn launch(&self, invocation: &Invocation, options: &LaunchOptions) -> LaunchResult {
        let command_line = invocation.command_line();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&command_line)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        isolate(&mut cmd);

        let start = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(program = %self.program, error = %e, "Failed to spawn shell");
                return LaunchResult::not_started(format!("{}: {e}", self.program));
            }
        };
        tracing::debug!(pid = ?child.id(), command_line = %command_line, "Spawned job");

        let waited = tokio::select! {
            status = child.wait() => Waited::Exited(status),
            _ = deadline(options.timeout) => Waited::TimedOut,
            _ = cancelled(options.cancel.clone()) => Waited::Cancelled,
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match waited {
            Waited::Exited(Ok(status)) => LaunchResult::exited(status.code(), elapsed_ms),
            Waited::Exited(Err(e)) => {
                terminate(&mut child, "wait failed").await;
                LaunchResult::wait_failed(format!("{}: wait failed: {e}", self.program), elapsed_ms)
            }
            Waited::TimedOut => {
                terminate(&mut child, "timed out").await;
                LaunchResult::timed_out(elapsed_ms)
            }
            Waited::Cancelled => {
                terminate(&mut child, "cancelled").await;
                LaunchResult::cancelled(elapsed_ms)
            }
        }
    }
}
