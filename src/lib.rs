pub mod config;
pub mod error;
pub mod locks;
pub mod logging;
pub mod workloads;

pub use error::{Result, SyncError};
