//! Worker threads of the daemon.
//!
//! Two threads around the shared cache:
//! - `IngestThread`: consumes listing batches, updates the cache, requests
//!   fetches for stale submaps
//! - `GridThread`: periodically composites the cache into an occupancy
//!   grid and publishes it

mod grid_thread;
mod ingest_thread;

pub use grid_thread::{GridThread, GridThreadConfig};
pub use ingest_thread::IngestThread;
