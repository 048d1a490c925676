//! API Module
//!
//! HTTP handlers and routing for the stats card service.
//!
//! # Endpoints
//! - `GET /api` - Render a user's stats card as SVG
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
