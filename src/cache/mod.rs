//! Submap record cache.
//!
//! The one piece of shared mutable state in the pipeline. Every record
//! tracks the latest pose/version metadata for a submap plus the most
//! recently decoded texture and the bookkeeping the fetch scheduler needs
//! (in-flight flag, last fetch time).
//!
//! All cross-thread access funnels through the methods here; a single
//! mutex serializes them, every critical section is O(entries) or better,
//! and [`SubmapCache::snapshot`] copies out so painting never holds the
//! lock. Textures are shared via `Arc`, so snapshots cost one pointer
//! clone per record, not a pixel copy.
//!
//! Version rules:
//! - a record is *stale* while `pixel_version != metadata_version`;
//! - metadata always wins immediately (pose and version update on every
//!   observation, pixels lag until a fetch lands);
//! - a completed fetch older than the current metadata version is
//!   discarded, never applied;
//! - `metadata_version` may decrease after the producer restarts; that is
//!   a new baseline, not an error, and the same staleness rule converges
//!   on it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::core::{Rigid3, SubmapId};
use crate::io::messages::SubmapList;
use crate::texture::SubmapTexture;

/// Fetch lifecycle of one record. At most one fetch is in flight per
/// submap at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    InFlight,
}

/// Outcome of the atomic fetch admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchGate {
    /// Admitted; the record is now InFlight.
    Started,
    /// Pixels already match the metadata version.
    NotStale,
    /// A fetch for this id is already in flight.
    Busy,
    /// The minimum inter-fetch delay has not elapsed yet.
    RateLimited,
    /// No record for this id.
    Unknown,
}

/// Outcome of applying a completed fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureOutcome {
    Applied,
    /// The fetched version was superseded while in flight; discarded.
    StaleCompletion,
    /// The record was removed while the fetch was in flight; discarded.
    Unknown,
}

#[derive(Debug)]
struct SubmapRecord {
    pose: Rigid3,
    metadata_version: i32,
    pixel_version: Option<i32>,
    texture: Option<Arc<SubmapTexture>>,
    fetch_state: FetchState,
    last_fetch_time: Option<Instant>,
}

impl SubmapRecord {
    fn new(pose: Rigid3, metadata_version: i32) -> Self {
        Self {
            pose,
            metadata_version,
            pixel_version: None,
            texture: None,
            fetch_state: FetchState::Idle,
            last_fetch_time: None,
        }
    }

    #[inline]
    fn is_stale(&self) -> bool {
        self.pixel_version != Some(self.metadata_version)
    }
}

/// Point-in-time copy of the cache, ordered by ascending submap id.
#[derive(Clone, Debug, Default)]
pub struct SubmapSnapshot {
    /// Stamp of the newest applied metadata batch, microseconds.
    pub stamp_us: u64,
    /// Frame the submap poses are expressed in.
    pub frame_id: String,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Clone, Debug)]
pub struct SnapshotEntry {
    pub id: SubmapId,
    pub pose: Rigid3,
    pub metadata_version: i32,
    pub pixel_version: Option<i32>,
    pub texture: Option<Arc<SubmapTexture>>,
}

#[derive(Default)]
struct CacheInner {
    records: BTreeMap<SubmapId, SubmapRecord>,
    stamp_us: u64,
    frame_id: String,
}

/// Shared submap record store. Cheap to clone behind an `Arc`.
pub struct SubmapCache {
    inner: Mutex<CacheInner>,
}

impl SubmapCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Apply one metadata observation. Inserts the record on first sight;
    /// afterwards pose and metadata version update unconditionally.
    /// Returns whether the record is now stale (pixels lag the metadata).
    pub fn apply_metadata(&self, id: SubmapId, pose: Rigid3, version: i32) -> bool {
        let mut inner = self.inner.lock();
        let record = inner
            .records
            .entry(id)
            .or_insert_with(|| SubmapRecord::new(pose, version));
        record.pose = pose;
        record.metadata_version = version;
        record.is_stale()
    }

    /// Apply a whole subscription batch atomically (header plus every
    /// entry under one lock acquisition). Returns the ids left stale, in
    /// batch order.
    pub fn apply_list(&self, list: &SubmapList) -> Vec<SubmapId> {
        let mut inner = self.inner.lock();
        inner.stamp_us = list.stamp_us;
        inner.frame_id.clone_from(&list.frame_id);

        let mut stale = Vec::new();
        for entry in &list.entries {
            let record = inner
                .records
                .entry(entry.id)
                .or_insert_with(|| SubmapRecord::new(entry.pose, entry.version));
            record.pose = entry.pose;
            record.metadata_version = entry.version;
            if record.is_stale() {
                stale.push(entry.id);
            }
        }
        stale
    }

    /// Apply a completed fetch. The record returns to Idle in every case;
    /// pixels are stored only if `version` has not been superseded by a
    /// newer metadata observation while the fetch was in flight.
    pub fn apply_texture(
        &self,
        id: SubmapId,
        version: i32,
        texture: SubmapTexture,
    ) -> TextureOutcome {
        let mut inner = self.inner.lock();
        match inner.records.get_mut(&id) {
            None => TextureOutcome::Unknown,
            Some(record) => {
                record.fetch_state = FetchState::Idle;
                if version < record.metadata_version {
                    TextureOutcome::StaleCompletion
                } else {
                    record.texture = Some(Arc::new(texture));
                    record.pixel_version = Some(version);
                    TextureOutcome::Applied
                }
            }
        }
    }

    /// Atomic fetch admission: stale AND idle AND past the minimum
    /// inter-fetch delay. On success the record is InFlight and the fetch
    /// clock restarts, so a concurrent caller can never admit a second
    /// fetch for the same id.
    pub fn try_begin_fetch(&self, id: SubmapId, min_interval: Duration) -> FetchGate {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match inner.records.get_mut(&id) {
            None => FetchGate::Unknown,
            Some(record) => {
                if !record.is_stale() {
                    FetchGate::NotStale
                } else if record.fetch_state == FetchState::InFlight {
                    FetchGate::Busy
                } else if record
                    .last_fetch_time
                    .map_or(false, |last| now.duration_since(last) < min_interval)
                {
                    FetchGate::RateLimited
                } else {
                    record.fetch_state = FetchState::InFlight;
                    record.last_fetch_time = Some(now);
                    FetchGate::Started
                }
            }
        }
    }

    /// Reset a record to Idle after a failed fetch. The record stays
    /// stale, so the next metadata observation retries.
    pub fn finish_fetch_failed(&self, id: SubmapId) {
        let mut inner = self.inner.lock();
        if let Some(record) = inner.records.get_mut(&id) {
            record.fetch_state = FetchState::Idle;
        }
    }

    /// Copy the current state out from under the lock. Compositing works
    /// against the copy, so it never blocks fetch completions.
    pub fn snapshot(&self) -> SubmapSnapshot {
        let inner = self.inner.lock();
        SubmapSnapshot {
            stamp_us: inner.stamp_us,
            frame_id: inner.frame_id.clone(),
            entries: inner
                .records
                .iter()
                .map(|(&id, record)| SnapshotEntry {
                    id,
                    pose: record.pose,
                    metadata_version: record.metadata_version,
                    pixel_version: record.pixel_version,
                    texture: record.texture.clone(),
                })
                .collect(),
        }
    }

    /// Drop records whose id is absent from `current`. Records with a
    /// fetch in flight are kept for now; a later listing removes them once
    /// the fetch has settled. Returns the number removed.
    pub fn remove_unlisted(&self, current: &[SubmapId]) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.records.len();
        inner
            .records
            .retain(|id, record| current.contains(id) || record.fetch_state == FetchState::InFlight);
        before - inner.records.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }
}

impl Default for SubmapCache {
    fn default() -> Self {
        Self::new()
    }
}
