//! Runner - 1 プロセス 1 回の選択と起動
//!
//! 流れ: join → batch index の解釈 → 行番号の計算 → Selector → Dispatcher → leave
//!
//! - manifest は Selector の中で開いて閉じます。Dispatcher が動くときにはもう閉じています。
//! - join が成功していれば、途中で失敗しても leave は必ず 1 回呼びます。
//! - 結果は RankrunError を含めて RunReport にまとめて返します。

use tokio::sync::watch;
use tracing::Instrument;

use super::dispatcher::Dispatcher;
use super::selector::{Selection, Selector};
use crate::config::RunConfig;
use crate::domain::{
    BatchIndex, FabricContext, IndexMode, RankrunError, RunId, RunOutcome, RunReport,
};
use crate::impls::{FileManifest, ShellLauncher};
use crate::ports::{Clock, Fabric, LaunchOptions, ManifestSource, ProcessLauncher, SystemClock};

pub struct Runner<S, L, C> {
    selector: Selector<S>,
    dispatcher: Dispatcher<L>,
    index_mode: IndexMode,
    dry_run: bool,
    clock: C,
}

impl Runner<FileManifest, ShellLauncher, SystemClock> {
    /// 設定から本番用の Runner を組み立てる
    pub fn from_config(config: &RunConfig) -> Self {
        let selector = Selector::new(
            FileManifest::new(&config.manifest_path),
            config.length_policy,
        );

        let mut options = LaunchOptions::default();
        if let Some(timeout) = config.timeout() {
            options = options.with_timeout(timeout);
        }
        let launcher = ShellLauncher::new(&config.shell.program, config.shell.args.clone());
        let dispatcher = Dispatcher::new(launcher, &config.runner)
            .with_status_policy(config.status_policy)
            .with_options(options);

        Runner::new(selector, dispatcher, SystemClock)
            .with_index_mode(config.index_mode)
            .with_dry_run(config.dry_run)
    }
}

impl<S, L, C> Runner<S, L, C>
where
    S: ManifestSource,
    L: ProcessLauncher,
    C: Clock,
{
    pub fn new(selector: Selector<S>, dispatcher: Dispatcher<L>, clock: C) -> Self {
        Self {
            selector,
            dispatcher,
            index_mode: IndexMode::default(),
            dry_run: false,
            clock,
        }
    }

    pub fn with_index_mode(mut self, mode: IndexMode) -> Self {
        self.index_mode = mode;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// SIGINT / SIGTERM などで `true` が送られたら実行中のジョブを止める
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.dispatcher.options_mut().cancel = Some(cancel);
        self
    }

    pub fn selector(&self) -> &Selector<S> {
        &self.selector
    }

    pub fn dispatcher(&self) -> &Dispatcher<L> {
        &self.dispatcher
    }

    /// 1 回分を実行する。`batch` はコマンドラインの文字列そのまま。
    pub async fn run(&self, fabric: &dyn Fabric, batch: &str) -> RunReport {
        let run_id = RunId::generate(&self.clock);
        let mut report = RunReport::started(run_id, self.clock.now());
        let fabric_name = fabric.name();
        report.fabric = Some(fabric_name.to_string());

        let ctx = match fabric.join() {
            Ok(ctx) => ctx,
            Err(err) => {
                tracing::info_span!("join", fabric = fabric_name).in_scope(|| log_failure(&err));
                report.fail(&err, self.clock.now());
                return report;
            }
        };
        report.record_context(&ctx);

        let span = tracing::info_span!(
            "run",
            run_id = %run_id,
            fabric = fabric_name,
            rank = ctx.rank(),
            world_size = ctx.world_size()
        );
        let result = self.cycle(&ctx, batch, &mut report).instrument(span).await;

        fabric.leave(&ctx);

        match result {
            Ok(outcome) => report.finish(outcome, self.clock.now()),
            Err(err) => {
                log_failure(&err);
                report.fail(&err, self.clock.now());
            }
        }
        report
    }

    async fn cycle(
        &self,
        ctx: &FabricContext,
        batch: &str,
        report: &mut RunReport,
    ) -> Result<RunOutcome, RankrunError> {
        let batch: BatchIndex = batch.parse()?;
        report.batch_index = Some(batch.get());

        let line_index = self.index_mode.line_index(batch, ctx)?;
        report.line_index = Some(line_index);

        let descriptor = match self.selector.select(line_index)? {
            Selection::Found { descriptor, .. } => descriptor,
            Selection::NotFound { lines_seen, .. } => {
                tracing::info!(line_index, lines_seen, "No task for this worker, skipping");
                return Ok(RunOutcome::Skipped);
            }
        };

        let invocation = self.dispatcher.invocation(descriptor, ctx.rank());
        report.invocation = Some(invocation.command_line());

        if self.dry_run {
            tracing::info!(line_index, invocation = %invocation, "Dry run, not launching");
            return Ok(RunOutcome::Planned);
        }

        let exit_code = self.dispatcher.execute(&invocation).await?;
        Ok(RunOutcome::Dispatched { exit_code })
    }
}

fn log_failure(err: &RankrunError) {
    let kind = err.kind();
    match err {
        RankrunError::ManifestUnavailable { path, .. } => {
            tracing::error!(kind, manifest = %path, error = %err, "Manifest unavailable");
        }
        RankrunError::InvalidIndex { input, .. } => {
            tracing::error!(kind, input = %input, error = %err, "Invalid batch index");
        }
        RankrunError::DescriptorTooLong { line_index, len, max } => {
            tracing::error!(kind, line_index, len, max, "Descriptor too long");
        }
        RankrunError::LaunchFailed { invocation, .. } => {
            tracing::error!(kind, invocation = %invocation, error = %err, "Launch failed");
        }
        RankrunError::LaunchTimedOut { invocation, elapsed_ms } => {
            tracing::error!(kind, invocation = %invocation, elapsed_ms, "Job timed out");
        }
        RankrunError::LaunchCancelled { invocation } => {
            tracing::warn!(kind, invocation = %invocation, "Job cancelled");
        }
        RankrunError::JobFailed { invocation, code } => {
            tracing::error!(kind, invocation = %invocation, exit_code = ?code, "Job failed");
        }
        RankrunError::FabricUnavailable(reason) => {
            tracing::error!(kind, reason = %reason, "Could not join fabric");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::StatusPolicy;
    use crate::domain::{LengthPolicy, OutcomeKind};
    use crate::impls::{InMemoryManifest, RecordingLauncher, StaticFabric};
    use crate::ports::{FixedClock, LaunchResult};
    use chrono::{TimeZone, Utc};

    type TestRunner = Runner<InMemoryManifest, RecordingLauncher, FixedClock>;

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    fn runner_with(manifest: InMemoryManifest, launcher: RecordingLauncher) -> TestRunner {
        Runner::new(
            Selector::new(manifest, LengthPolicy::default()),
            Dispatcher::new(launcher, "python"),
            clock(),
        )
    }

    fn jobs_runner() -> TestRunner {
        runner_with(
            InMemoryManifest::from_lines(["jobA.py", "jobB.py", "jobC.py"]),
            RecordingLauncher::succeeding(),
        )
    }

    #[tokio::test]
    async fn dispatches_selected_line_with_rank() {
        let runner = jobs_runner();
        let fabric = StaticFabric::new(3, 4);

        let report = runner.run(&fabric, "1").await;

        assert_eq!(report.outcome, OutcomeKind::Dispatched);
        assert_eq!(report.invocation.as_deref(), Some("python jobB.py 3"));
        assert_eq!(report.job_exit_code, Some(0));
        assert_eq!(report.exit_status, 0);
        assert_eq!((report.rank, report.world_size), (Some(3), Some(4)));
        assert_eq!((report.batch_index, report.line_index), (Some(1), Some(1)));
        assert_eq!(
            runner.dispatcher().launcher().calls().await,
            vec!["python jobB.py 3"]
        );
        assert_eq!(runner.selector().source().open_count(), 1);
        assert_eq!(fabric.leave_count(), 1);
        assert_eq!(report.fabric.as_deref(), Some("static"));
    }

    #[tokio::test]
    async fn short_manifest_skips_without_launching() {
        let runner = runner_with(
            InMemoryManifest::from_lines(["a.py", "b.py"]),
            RecordingLauncher::succeeding(),
        );
        let fabric = StaticFabric::new(0, 1);

        let report = runner.run(&fabric, "5").await;

        assert_eq!(report.outcome, OutcomeKind::Skipped);
        assert_eq!(report.exit_status, 0);
        assert!(report.invocation.is_none());
        assert!(runner.dispatcher().launcher().calls().await.is_empty());
        assert_eq!(fabric.leave_count(), 1);
    }

    #[tokio::test]
    async fn negative_index_fails_without_reading_manifest() {
        let runner = jobs_runner();
        let fabric = StaticFabric::new(0, 1);

        let report = runner.run(&fabric, "-1").await;

        assert_eq!(report.outcome, OutcomeKind::Failed);
        assert_eq!(report.exit_status, 64);
        assert_eq!(report.error.as_ref().unwrap().kind, "invalid_index");
        assert_eq!(runner.selector().source().open_count(), 0);
        assert!(runner.dispatcher().launcher().calls().await.is_empty());
        assert_eq!(fabric.leave_count(), 1);
    }

    #[tokio::test]
    async fn fabric_failure_never_leaves() {
        let runner = jobs_runner();
        let fabric = StaticFabric::new(5, 2);

        let report = runner.run(&fabric, "0").await;

        assert_eq!(report.exit_status, 69);
        assert_eq!(report.fabric.as_deref(), Some("static"));
        assert!(report.rank.is_none());
        assert_eq!(fabric.leave_count(), 0);
        assert_eq!(runner.selector().source().open_count(), 0);
    }

    #[tokio::test]
    async fn launch_failure_exits_non_zero() {
        let runner = runner_with(
            InMemoryManifest::from_lines(["jobA.py"]),
            RecordingLauncher::new(LaunchResult::not_started("python: not found")),
        );
        let fabric = StaticFabric::new(0, 1);

        let report = runner.run(&fabric, "0").await;

        assert_eq!(report.outcome, OutcomeKind::Failed);
        assert_eq!(report.exit_status, 69);
        assert_eq!(report.invocation.as_deref(), Some("python jobA.py 0"));
        assert_eq!(fabric.leave_count(), 1);
    }

    #[tokio::test]
    async fn job_status_is_discarded_unless_propagated() {
        let manifest = || InMemoryManifest::from_lines(["jobA.py"]);
        let failing = || RecordingLauncher::new(LaunchResult::exited(Some(2), 1));
        let fabric = StaticFabric::new(0, 1);

        let report = runner_with(manifest(), failing()).run(&fabric, "0").await;
        assert_eq!(report.outcome, OutcomeKind::Dispatched);
        assert_eq!(report.job_exit_code, Some(2));
        assert_eq!(report.exit_status, 0);

        let runner = Runner::new(
            Selector::new(manifest(), LengthPolicy::default()),
            Dispatcher::new(failing(), "python").with_status_policy(StatusPolicy::Propagate),
            clock(),
        );
        let report = runner.run(&fabric, "0").await;
        assert_eq!(report.outcome, OutcomeKind::Failed);
        assert_eq!(report.job_exit_code, Some(2));
        assert_eq!(report.exit_status, 2);
    }

    #[tokio::test]
    async fn strided_mode_spreads_ranks_over_lines() {
        let runner = jobs_runner().with_index_mode(IndexMode::Strided);

        let report = runner.run(&StaticFabric::new(1, 2), "1").await;
        assert_eq!(report.line_index, Some(3));
        assert_eq!(report.outcome, OutcomeKind::Skipped);

        let report = runner.run(&StaticFabric::new(0, 2), "1").await;
        assert_eq!(report.invocation.as_deref(), Some("python jobC.py 0"));
    }

    #[tokio::test]
    async fn dry_run_plans_but_does_not_launch() {
        let runner = jobs_runner().with_dry_run(true);

        let report = runner.run(&StaticFabric::new(2, 3), "0").await;

        assert_eq!(report.outcome, OutcomeKind::Planned);
        assert_eq!(report.invocation.as_deref(), Some("python jobA.py 2"));
        assert_eq!(report.exit_status, 0);
        assert!(runner.dispatcher().launcher().calls().await.is_empty());
    }

    #[tokio::test]
    async fn too_long_descriptor_fails_consistently() {
        let long = "z".repeat(1500);
        let runner = runner_with(
            InMemoryManifest::from_lines([long.as_str()]),
            RecordingLauncher::succeeding(),
        );
        let fabric = StaticFabric::new(0, 1);

        let first = runner.run(&fabric, "0").await;
        let second = runner.run(&fabric, "0").await;

        assert_eq!(first.exit_status, 65);
        assert_eq!(first.error, second.error);
        assert!(runner.dispatcher().launcher().calls().await.is_empty());
    }

    #[tokio::test]
    async fn report_uses_clock() {
        let runner = jobs_runner();
        let report = runner.run(&StaticFabric::new(0, 1), "0").await;
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(report.started_at, at);
        assert_eq!(report.finished_at, at);
        assert_eq!(report.run_id.as_ulid().timestamp_ms(), at.timestamp_millis() as u64);
    }

    #[test]
    fn from_config_wires_settings() {
        let cfg = RunConfig::new("manifest.txt", "python3")
            .with_index_mode(IndexMode::Strided)
            .with_timeout_ms(250);
        let runner = Runner::from_config(&cfg);

        assert_eq!(runner.selector().source().path(), std::path::Path::new("manifest.txt"));
        assert_eq!(runner.selector().policy(), LengthPolicy::default());
        assert_eq!(runner.index_mode, IndexMode::Strided);
        assert_eq!(
            runner.dispatcher().options().timeout,
            Some(std::time::Duration::from_millis(250))
        );
        assert_eq!(runner.dispatcher().launcher().program(), "sh");
    }
}
