//! Ports - 抽象化レイヤー
//!
//! 外部との境界を trait として定義します。
//! - manifest の読み出し（ファイル）
//! - プロセスの起動（shell）
//! - 並列実行基盤（rank / world size）
//! - 時刻

pub mod clock;
pub mod fabric;
pub mod manifest_source;
pub mod process_launcher;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::fabric::Fabric;
pub use self::manifest_source::ManifestSource;
pub use self::process_launcher::{LaunchOptions, LaunchResult, LaunchStatus, ProcessLauncher};
