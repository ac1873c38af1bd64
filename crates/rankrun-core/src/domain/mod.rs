//! Domain model (context, index, descriptor, invocation, outcome, report, errors).
//!
//! ここには I/O を持ち込みません。manifest の読み込みやプロセス起動は ports / impls 側です。

pub mod descriptor;
pub mod errors;
pub mod fabric;
pub mod ids;
pub mod index;
pub mod invocation;
pub mod outcome;
pub mod report;

pub use self::descriptor::{DEFAULT_DESCRIPTOR_CAPACITY, LengthPolicy, TaskDescriptor};
pub use self::errors::RankrunError;
pub use self::fabric::FabricContext;
pub use self::ids::RunId;
pub use self::index::{BatchIndex, IndexMode};
pub use self::invocation::Invocation;
pub use self::outcome::{OutcomeKind, RunOutcome};
pub use self::report::{ErrorReport, RunReport};
