//! Sync module
//!
//! Pattern filtering, key mapping, content identity, planning and execution
//! for push, pull and bidirectional runs.

pub mod conflict;
pub mod engine;
pub mod executor;
pub mod hash;
pub mod identity;
pub mod namespace;
pub mod patterns;
pub mod plan;

pub use conflict::{Conflict, ConflictResolution};
pub use engine::{RemoteListing, RunOptions, SyncContext, SyncEngine, SyncMode, SyncReport};
pub use executor::{ExecutionStats, Executor};
pub use hash::{hash_bytes, hash_file, HashType};
pub use identity::are_different;
pub use namespace::{Namespace, PathRole};
pub use patterns::{Classification, PatternSet};
pub use plan::{ActionSet, ActionSummary};
