//! API Module
//!
//! HTTP handlers and routing exposing one configured cache over REST.
//!
//! # Endpoints
//! - `PUT /cache/*key` - Store a JSON value
//! - `GET /cache/*key` - Retrieve a value
//! - `DELETE /cache/*key` - Delete a key
//! - `DELETE /cache` - Flush the cache
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
