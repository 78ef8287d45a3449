//! External interfaces: listing messages, the grid sink, and a simulated
//! map builder for backend-free runs.

pub mod messages;
pub mod mock_service;
pub mod sink;

pub use messages::{SubmapEntry, SubmapList};
pub use mock_service::{MockMapService, MockServiceConfig, MockServiceThread};
pub use sink::{GridSink, LatestGridSink};
