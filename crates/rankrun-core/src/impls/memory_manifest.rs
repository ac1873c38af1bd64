//! InMemoryManifest - テスト用の manifest
//!
//! open された回数を数えるので、「1 回の実行で 1 回だけ読む」ことを確認できます。

use std::io::BufRead;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::RankrunError;
use crate::ports::ManifestSource;

#[derive(Debug, Default)]
pub struct InMemoryManifest {
    content: Vec<u8>,
    opens: AtomicUsize,
}

impl InMemoryManifest {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            opens: AtomicUsize::new(0),
        }
    }

    /// 各行の後ろに `\n` を付けて連結する
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut content = String::new();
        for line in lines {
            content.push_str(line.as_ref());
            content.push('\n');
        }
        Self::new(content)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }
}

impl ManifestSource for InMemoryManifest {
    fn open(&self) -> Result<Box<dyn BufRead + '_>, RankrunError> {
        self.opens.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(self.content.as_slice()))
    }

    fn name(&self) -> String {
        "<memory>".to_string()
    }
}
