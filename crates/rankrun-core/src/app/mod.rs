//! App - アプリケーション層
//!
//! ports を組み合わせて、1 回分の選択と起動を実装します。
//!
//! # 主要コンポーネント
//! - **Selector**: manifest から担当行を選ぶ
//! - **Dispatcher**: 起動コマンドを組み立てて launcher に渡す
//! - **Runner**: join / leave を含む 1 回分の流れ

pub mod dispatcher;
pub mod runner;
pub mod selector;

pub use self::dispatcher::{Dispatcher, StatusPolicy};
pub use self::runner::Runner;
pub use self::selector::{Selection, Selector, select_from};
