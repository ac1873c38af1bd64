//! Fabric port - 並列実行基盤への参加と離脱
//!
//! 基盤そのもの（グループ形成、メッセージ、同期終了）は外部のものです。
//! ここで必要なのは rank と world size の取得と、実行全体を囲む join / leave だけです。

use crate::domain::{FabricContext, RankrunError};

pub trait Fabric: Send + Sync {
    /// グループに参加して rank / world size を得る
    fn join(&self) -> Result<FabricContext, RankrunError>;

    /// join が成功した場合にだけ、実行の最後に 1 回呼ばれる
    fn leave(&self, ctx: &FabricContext);

    fn name(&self) -> &'static str;
}
