//! ManifestSource port - manifest の読み出し元
//!
//! open() は毎回新しい reader を返します。Selector は 1 回の select ごとに 1 回だけ open し、
//! 読み終わった時点（見つかった・見つからなかった・エラーのどれでも）で reader を drop します。

use std::io::BufRead;

use crate::domain::RankrunError;

/// Read-only, line-oriented source of task descriptors.
///
/// # 実装
/// - **FileManifest**: ファイル（本番用）
/// - **InMemoryManifest**: バイト列（テスト用）
pub trait ManifestSource: Send + Sync {
    /// 先頭から読む reader を開く。開けなければ ManifestUnavailable。
    fn open(&self) -> Result<Box<dyn BufRead + '_>, RankrunError>;

    /// ログとエラーメッセージに出す名前（ファイルならパス）
    fn name(&self) -> String;
}
