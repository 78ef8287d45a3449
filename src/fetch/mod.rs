//! Asynchronous texture fetching.
//!
//! [`TextureQuery`] is the RPC seam to the map service; [`FetchScheduler`]
//! owns the worker pool that calls it. Admission goes through the cache
//! (stale + idle + rate limit, checked atomically), so no interleaving of
//! metadata updates can put two fetches for one submap in flight.
//!
//! ```text
//! maybe_fetch(id) ──admit──▶ job queue ──▶ fetch-N worker
//!                                             │ fetch_textures(id)
//!                                             │ decode textures[0]
//!                                             ▼
//!                                       cache.apply_texture
//!                                             │
//!                                             ▼
//!                                       FetchOutcome channel
//! ```

mod client;
mod scheduler;

pub use client::{FetchError, FetchResult, TextureQuery};
pub use scheduler::{FetchHandle, FetchOutcome, FetchScheduler, FetchSchedulerConfig};
