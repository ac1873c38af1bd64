use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::app::StatusPolicy;
use crate::domain::{IndexMode, LengthPolicy};

/// How the job is started: `<program> <args...> "<invocation>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: "sh".to_string(),
            args: vec!["-c".to_string()],
        }
    }
}

/// Everything one run needs besides the batch index and the fabric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Manifest path, relative to the working directory.
    pub manifest_path: PathBuf,
    /// Prefix placed before the descriptor (e.g. "python").
    pub runner: String,
    pub length_policy: LengthPolicy,
    pub index_mode: IndexMode,
    pub status_policy: StatusPolicy,
    /// Kill the job after this many milliseconds. None waits forever.
    pub timeout_ms: Option<u64>,
    pub shell: ShellConfig,
    /// Select and build the invocation, but do not launch it.
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("list"),
            runner: "python".to_string(),
            length_policy: LengthPolicy::default(),
            index_mode: IndexMode::default(),
            status_policy: StatusPolicy::default(),
            timeout_ms: None,
            shell: ShellConfig::default(),
            dry_run: false,
        }
    }
}

impl RunConfig {
    pub fn new(manifest_path: impl Into<PathBuf>, runner: impl Into<String>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            runner: runner.into(),
            ..Default::default()
        }
    }

    pub fn with_length_policy(mut self, policy: LengthPolicy) -> Self {
        self.length_policy = policy;
        self
    }

    pub fn with_index_mode(mut self, mode: IndexMode) -> Self {
        self.index_mode = mode;
        self
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_shell(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.shell = ShellConfig {
            program: program.into(),
            args,
        };
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
