//! Request and Response models for the stats card API
//!
//! The card query string and the JSON bodies of the auxiliary endpoints.
//! `GET /stats` serializes [`CacheStats`](crate::cache::CacheStats) directly.

pub mod requests;
pub mod responses;

pub use requests::CardQuery;
pub use responses::HealthResponse;
