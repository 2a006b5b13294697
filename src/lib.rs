// Library module for zensync
// Re-exports modules for use in integration tests and the binary

pub mod config;
pub mod error;
pub mod fs;
pub mod profiles;
pub mod sync;

pub use error::{Result, SyncError};
