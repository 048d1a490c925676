//! Stats Card - GitHub statistics cards behind a stale-tolerant cache
//!
//! Resolves a user's statistics through a single-flight coordinator over an
//! in-memory store, falling back to the last known value when GitHub is
//! unavailable, and renders them as an SVG card.

pub mod api;
pub mod cache;
pub mod card;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod github;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use coordinator::{Coordinator, Resolved, Served};
pub use tasks::spawn_sweep_task;
