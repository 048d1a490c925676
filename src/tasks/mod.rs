//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry Sweeper: evicts cache entries past the retention ceiling

mod sweeper;

pub use sweeper::spawn_sweep_task;
