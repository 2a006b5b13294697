pub mod backend;
pub mod local;
pub mod memory;
pub mod s3;
pub mod types;

pub use backend::{BackendType, ObjectStore};
pub use local::LocalFs;
pub use memory::MemoryStore;
pub use s3::S3Store;
pub use types::*;
