//! rankrun-core
//!
//! 並列実行の各ワーカーが、manifest から自分の担当行を 1 件選び、
//! rank を最後の引数にしてジョブとして起動するためのコアです。
//!
//! # モジュール構成
//! - **domain**: 値とエラー（FabricContext, BatchIndex, TaskDescriptor, Invocation, RunReport, RankrunError）
//! - **ports**: 外部との境界（ManifestSource, ProcessLauncher, Fabric, Clock）
//! - **impls**: ports の実装（FileManifest, ShellLauncher, EnvFabric など）
//! - **app**: Selector, Dispatcher, Runner
//! - **config**: RunConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use self::app::{Dispatcher, Runner, Selection, Selector, StatusPolicy};
pub use self::config::{RunConfig, ShellConfig};
pub use self::domain::{RankrunError, RunReport};
