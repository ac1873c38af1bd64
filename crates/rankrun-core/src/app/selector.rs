//! Selector - manifest から担当行を 1 件選ぶ
//!
//! 先頭から 0 始まりで行を数え、目的の行に着いたらそこで読むのをやめます。
//! 目的の行以外はバイト列のまま読み飛ばすので、UTF-8 として検査するのは選んだ行だけです。
//! 長さ制限がある場合、選んだ行も制限を少し超えた所までしかメモリに載せません。

use std::io::{self, BufRead, Read};

use crate::domain::{LengthPolicy, RankrunError, TaskDescriptor};
use crate::ports::ManifestSource;

/// Result of one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Found {
        line_index: u64,
        descriptor: TaskDescriptor,
    },
    /// manifest の行数が `line_index` 以下だった
    NotFound { line_index: u64, lines_seen: u64 },
}

impl Selection {
    pub fn descriptor(&self) -> Option<&TaskDescriptor> {
        match self {
            Self::Found { descriptor, .. } => Some(descriptor),
            Self::NotFound { .. } => None,
        }
    }
}

pub struct Selector<S> {
    source: S,
    policy: LengthPolicy,
}

impl<S: ManifestSource> Selector<S> {
    pub fn new(source: S, policy: LengthPolicy) -> Self {
        Self { source, policy }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> LengthPolicy {
        self.policy
    }

    /// manifest を開き、`line_index` 行目を返す
    ///
    /// reader はこの関数を抜けるときに必ず閉じられます。
    pub fn select(&self, line_index: u64) -> Result<Selection, RankrunError> {
        let name = self.source.name();
        let reader = self.source.open()?;
        let selection = select_from(reader, line_index, self.policy, &name)?;

        match &selection {
            Selection::Found { descriptor, .. } => {
                tracing::debug!(manifest = %name, line_index, descriptor = %descriptor, "Selected descriptor");
            }
            Selection::NotFound { lines_seen, .. } => {
                tracing::debug!(manifest = %name, line_index, lines_seen, "Manifest too short");
            }
        }
        Ok(selection)
    }
}

/// 任意の reader から `line_index` 行目を探す
///
/// 行はバッファに溜めずに読み捨てます。選んだ行も長さ制限があれば
/// `max + 4` バイトまでしか読みません。
pub fn select_from<R: BufRead>(
    mut reader: R,
    line_index: u64,
    policy: LengthPolicy,
    source_name: &str,
) -> Result<Selection, RankrunError> {
    let unavailable = |source: io::Error| RankrunError::ManifestUnavailable {
        path: source_name.to_string(),
        source,
    };

    let mut current: u64 = 0;
    while current < line_index {
        let tail = skip_line(&mut reader).map_err(unavailable)?;
        if tail.len == 0 && !tail.terminated {
            return Ok(Selection::NotFound {
                line_index,
                lines_seen: current,
            });
        }
        current += 1;
    }

    // 行末（\r\n）と、末尾で切れた UTF-8 文字（最大 3 バイト）の分だけ余分に読む
    let limit = policy.max_len().map(|max| (max as u64).saturating_add(4));
    let mut head = Vec::new();
    let read = match limit {
        Some(limit) => (&mut reader).take(limit).read_until(b'\n', &mut head),
        None => reader.read_until(b'\n', &mut head),
    };
    read.map_err(unavailable)?;

    if head.is_empty() {
        return Ok(Selection::NotFound {
            line_index,
            lines_seen: current,
        });
    }

    let overflowed =
        limit.is_some_and(|limit| head.len() as u64 == limit && !head.ends_with(b"\n"));
    if overflowed {
        if let LengthPolicy::Truncate { .. } = policy {
            let valid = match std::str::from_utf8(&head) {
                Ok(_) => head.len(),
                Err(e) if e.error_len().is_none() => e.valid_up_to(),
                Err(e) => return Err(unavailable(invalid_utf8(line_index, e))),
            };
            head.truncate(valid);
            tracing::debug!(line_index, read = head.len(), "Selected line exceeds the read limit, rest not read");
        } else {
            let tail = skip_line(&mut reader).map_err(unavailable)?;
            let mut len = head.len() + tail.len;
            let last = tail.last.or(head.last().copied());
            if tail.terminated && last == Some(b'\r') {
                len -= 1;
            }
            return Err(RankrunError::DescriptorTooLong {
                line_index,
                len,
                max: policy.max_len().unwrap_or(len),
            });
        }
    }

    let line = String::from_utf8(head)
        .map_err(|e| unavailable(invalid_utf8(line_index, e.utf8_error())))?;
    let descriptor = TaskDescriptor::from_line(line, line_index, policy)?;
    Ok(Selection::Found {
        line_index,
        descriptor,
    })
}

fn invalid_utf8(line_index: u64, e: std::str::Utf8Error) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("line {line_index} is not valid UTF-8: {e}"),
    )
}

/// Rest of a line consumed by `skip_line`.
struct LineTail {
    /// `\n` を除いたバイト数
    len: usize,
    /// `\n` の直前のバイト（行末まで読んだ場合は最後のバイト）
    last: Option<u8>,
    terminated: bool,
}

/// 次の `\n` まで読み捨てる
fn skip_line<R: BufRead>(reader: &mut R) -> io::Result<LineTail> {
    let mut tail = LineTail {
        len: 0,
        last: None,
        terminated: false,
    };
    loop {
        let available = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(tail);
        }
        let newline = available.iter().position(|&b| b == b'\n');
        let used = newline.unwrap_or(available.len());
        if used > 0 {
            tail.last = Some(available[used - 1]);
        }
        tail.len += used;

        match newline {
            Some(_) => {
                reader.consume(used + 1);
                tail.terminated = true;
                return Ok(tail);
            }
            None => reader.consume(used),
        }
    }
}
