//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **FileManifest**: ファイルの manifest
//! - **InMemoryManifest**: テスト用の manifest
//! - **ShellLauncher**: `sh -c` でジョブを起動
//! - **RecordingLauncher**: テスト用の launcher（記録のみ）
//! - **EnvFabric**: MPI / Slurm の環境変数から rank を得る
//! - **StaticFabric**: rank を明示的に与える

pub mod env_fabric;
pub mod file_manifest;
pub mod memory_manifest;
pub mod recording_launcher;
pub mod shell_launcher;
pub mod static_fabric;

pub use self::env_fabric::EnvFabric;
pub use self::file_manifest::FileManifest;
pub use self::memory_manifest::InMemoryManifest;
pub use self::recording_launcher::RecordingLauncher;
pub use self::shell_launcher::ShellLauncher;
pub use self::static_fabric::StaticFabric;
