//! FileManifest - ファイルから manifest を読む
//!
//! 同じファイルを兄弟ランクがそれぞれ独立に開いて読みます。書き込みもロックもしません。

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::domain::RankrunError;
use crate::ports::ManifestSource;

#[derive(Debug, Clone)]
pub struct FileManifest {
    path: PathBuf,
}

impl FileManifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ManifestSource for FileManifest {
    fn open(&self) -> Result<Box<dyn BufRead + '_>, RankrunError> {
        let file = File::open(&self.path).map_err(|source| RankrunError::ManifestUnavailable {
            path: self.name(),
            source,
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}
