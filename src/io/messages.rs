//! Message types for the metadata subscription.

use crate::core::{Rigid3, SubmapId};

/// One listed submap: its id, current global pose, and metadata version.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubmapEntry {
    pub id: SubmapId,
    pub pose: Rigid3,
    pub version: i32,
}

/// One metadata batch from the map builder.
///
/// A batch lists every submap the builder currently considers live; ids
/// absent from the batch have been trimmed and should be dropped. Batches
/// apply atomically.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubmapList {
    pub stamp_us: u64,
    pub frame_id: String,
    pub entries: Vec<SubmapEntry>,
}

impl SubmapList {
    /// Ids listed in this batch, in listing order.
    pub fn ids(&self) -> Vec<SubmapId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }
}
