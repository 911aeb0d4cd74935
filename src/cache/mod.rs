//! Offline cache gateway.
//!
//! This module provides a cache-first request gateway that:
//! - Seeds a versioned cache generation at install time (all-or-nothing)
//! - Evicts every older generation when a new version activates
//! - Serves cached responses without touching the network
//! - Writes successful same-origin misses back in the background

mod gateway;
mod secure;
mod storage;
mod traits;
mod transport;

pub use gateway::Gateway;
pub use secure::ensure_secure_origin;
pub use storage::{CacheStorage, SqliteStorage};
pub use traits::CacheRequest;
pub use transport::HttpTransport;
