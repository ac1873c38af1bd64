//! Invocation - 起動するコマンド文字列
//!
//! `<runner> <descriptor> <rank>` を半角スペース 1 つで連結します。
//! runner が空なら `<descriptor> <rank>` になります。

use std::fmt;

use super::descriptor::TaskDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    runner: String,
    descriptor: TaskDescriptor,
    rank: u32,
}

impl Invocation {
    pub fn new(runner: impl Into<String>, descriptor: TaskDescriptor, rank: u32) -> Self {
        Self {
            runner: runner.into(),
            descriptor,
            rank,
        }
    }

    pub fn runner(&self) -> &str {
        &self.runner
    }

    pub fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// shell に渡す文字列
    pub fn command_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.runner.is_empty() {
            write!(f, "{} {}", self.descriptor, self.rank)
        } else {
            write!(f, "{} {} {}", self.runner, self.descriptor, self.rank)
        }
    }
}
