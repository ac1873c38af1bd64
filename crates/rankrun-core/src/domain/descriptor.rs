//! TaskDescriptor / LengthPolicy - manifest の 1 行と長さ制限
//!
//! descriptor の中身は解釈しません（ジョブ側のパスと引数）。
//! ここでやるのは行末の除去と長さ制限の適用だけです。
//!
//! # 長さ制限
//! `capacity` は終端文字込みのバッファサイズとして扱い、受け付ける長さは `capacity - 1` バイトまで。
//! 超えた場合の扱いは LengthPolicy で選びます（既定は Reject）。

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::RankrunError;

/// 既定の容量（終端分を含む）。受け付ける最大長は 1023 バイト。
pub const DEFAULT_DESCRIPTOR_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LengthPolicy {
    /// `capacity - 1` バイトを超えたら DescriptorTooLong
    Reject { capacity: usize },
    /// 先頭 `capacity - 1` バイト（UTF-8 の文字境界まで戻す）に切り詰め、警告を出す
    Truncate { capacity: usize },
    Unbounded,
}

impl LengthPolicy {
    /// 受け付ける最大バイト数。Unbounded は None。
    pub fn max_len(&self) -> Option<usize> {
        match self {
            Self::Reject { capacity } | Self::Truncate { capacity } => {
                Some(capacity.saturating_sub(1))
            }
            Self::Unbounded => None,
        }
    }
}

impl Default for LengthPolicy {
    fn default() -> Self {
        Self::Reject {
            capacity: DEFAULT_DESCRIPTOR_CAPACITY,
        }
    }
}

/// One manifest line, terminator stripped, length policy applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskDescriptor(String);

impl TaskDescriptor {
    /// 生の行から descriptor を作る
    ///
    /// `\n` と `\r\n` の行末を 1 つだけ取り除き、その後で長さを判定します。
    pub fn from_line(
        mut line: String,
        line_index: u64,
        policy: LengthPolicy,
    ) -> Result<Self, RankrunError> {
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        let Some(max) = policy.max_len() else {
            return Ok(Self(line));
        };
        if line.len() <= max {
            return Ok(Self(line));
        }

        match policy {
            LengthPolicy::Truncate { .. } => {
                let original_len = line.len();
                let mut cut = max;
                while !line.is_char_boundary(cut) {
                    cut -= 1;
                }
                line.truncate(cut);
                tracing::warn!(
                    line_index,
                    original_len,
                    kept_len = line.len(),
                    max,
                    "Descriptor truncated"
                );
                Ok(Self(line))
            }
            _ => Err(RankrunError::DescriptorTooLong {
                line_index,
                len: line.len(),
                max,
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
