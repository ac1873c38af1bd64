//! Errors - エラー型と終了コードの対応
//!
//! 1 プロセス 1 回の実行なので、どのエラーも「このワーカーの終了」を意味します。
//! リトライはしません。兄弟ワーカーへの伝播もありません。
//!
//! # 終了コード
//! sysexits.h の値に寄せています。
//! - `64` InvalidIndex（EX_USAGE）
//! - `65` DescriptorTooLong（EX_DATAERR）
//! - `66` ManifestUnavailable（EX_NOINPUT）
//! - `69` LaunchFailed / FabricUnavailable（EX_UNAVAILABLE）
//! - `124` LaunchTimedOut（`timeout(1)` と同じ）
//! - `130` LaunchCancelled（SIGINT 相当）
//! - JobFailed はジョブ自身の終了コード

use thiserror::Error;

/// RankrunError は選択・起動のどこかで発生した失敗
#[derive(Debug, Error)]
pub enum RankrunError {
    #[error("manifest {path} is unavailable: {source}")]
    ManifestUnavailable {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid batch index {input:?}: {reason}")]
    InvalidIndex { input: String, reason: String },

    #[error("descriptor on line {line_index} is {len} bytes, the limit is {max}")]
    DescriptorTooLong {
        line_index: u64,
        len: usize,
        max: usize,
    },

    #[error("failed to launch `{invocation}`: {reason}")]
    LaunchFailed { invocation: String, reason: String },

    #[error("`{invocation}` timed out after {elapsed_ms}ms")]
    LaunchTimedOut { invocation: String, elapsed_ms: u64 },

    #[error("`{invocation}` was cancelled")]
    LaunchCancelled { invocation: String },

    #[error("`{invocation}` exited with status {code:?}")]
    JobFailed {
        invocation: String,
        code: Option<i32>,
    },

    #[error("fabric unavailable: {0}")]
    FabricUnavailable(String),
}

impl RankrunError {
    pub fn invalid_index(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIndex {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// ログとレポートで使う短い分類名
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ManifestUnavailable { .. } => "manifest_unavailable",
            Self::InvalidIndex { .. } => "invalid_index",
            Self::DescriptorTooLong { .. } => "descriptor_too_long",
            Self::LaunchFailed { .. } => "launch_failed",
            Self::LaunchTimedOut { .. } => "launch_timed_out",
            Self::LaunchCancelled { .. } => "launch_cancelled",
            Self::JobFailed { .. } => "job_failed",
            Self::FabricUnavailable(_) => "fabric_unavailable",
        }
    }

    /// プロセスの終了コード（常に非ゼロ）
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidIndex { .. } => 64,
            Self::DescriptorTooLong { .. } => 65,
            Self::ManifestUnavailable { .. } => 66,
            Self::LaunchFailed { .. } | Self::FabricUnavailable(_) => 69,
            Self::LaunchTimedOut { .. } => 124,
            Self::LaunchCancelled { .. } => 130,
            Self::JobFailed { code, .. } => match code {
                Some(c) if (1..=255).contains(c) => *c as u8,
                // killed by a signal, or a code the OS would wrap to 0
                _ => 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn io_not_found() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no such file")
    }

    #[rstest]
    #[case::manifest(
        RankrunError::ManifestUnavailable { path: "list".into(), source: io_not_found() },
        66
    )]
    #[case::index(RankrunError::invalid_index("-1", "negative"), 64)]
    #[case::too_long(
        RankrunError::DescriptorTooLong { line_index: 0, len: 2000, max: 1023 },
        65
    )]
    #[case::launch(
        RankrunError::LaunchFailed { invocation: "python a.py 0".into(), reason: "denied".into() },
        69
    )]
    #[case::fabric(RankrunError::FabricUnavailable("no rank".into()), 69)]
    #[case::timeout(
        RankrunError::LaunchTimedOut { invocation: "python a.py 0".into(), elapsed_ms: 10 },
        124
    )]
    #[case::cancel(RankrunError::LaunchCancelled { invocation: "python a.py 0".into() }, 130)]
    #[case::job(RankrunError::JobFailed { invocation: "python a.py 0".into(), code: Some(3) }, 3)]
    #[case::job_signalled(RankrunError::JobFailed { invocation: "python a.py 0".into(), code: None }, 1)]
    #[case::job_wrapping(RankrunError::JobFailed { invocation: "python a.py 0".into(), code: Some(256) }, 1)]
    fn exit_codes_are_non_zero_and_stable(#[case] err: RankrunError, #[case] expected: u8) {
        assert_eq!(err.exit_code(), expected);
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn manifest_error_keeps_io_source() {
        let err = RankrunError::ManifestUnavailable {
            path: "list".into(),
            source: io_not_found(),
        };
        let source = std::error::Error::source(&err).expect("io source");
        assert!(source.to_string().contains("no such file"));
        assert!(err.to_string().contains("list"));
        assert_eq!(err.kind(), "manifest_unavailable");
    }
}
