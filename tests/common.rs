//! Test utilities for the compositing pipeline tests.
//!
//! Fake texture query implementations and wire-format builders shared by
//! the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use darpan_map::cache::SubmapCache;
use darpan_map::core::{Rigid3, SubmapId};
use darpan_map::fetch::{
    FetchError, FetchOutcome, FetchResult, FetchScheduler, FetchSchedulerConfig, TextureQuery,
};
use darpan_map::texture::{codec, EncodedTexture, TextureResponse};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Build a single-texture response with the given channel bytes.
pub fn response(version: i32, intensity: &[u8], alpha: &[u8], width: u32) -> TextureResponse {
    TextureResponse {
        submap_version: version,
        textures: vec![EncodedTexture {
            width,
            height: intensity.len() as u32 / width,
            resolution: 0.05,
            slice_pose: Rigid3::identity(),
            cells: codec::encode_cells(intensity, alpha).unwrap(),
        }],
    }
}

/// Scheduler over the given query, reporting on the returned channel.
pub fn scheduler_with(
    query: Arc<dyn TextureQuery>,
    cache: Arc<SubmapCache>,
    workers: usize,
    min_fetch_interval_ms: u64,
) -> (FetchScheduler, Receiver<FetchOutcome>) {
    let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();
    let config = FetchSchedulerConfig {
        workers,
        min_fetch_interval_ms,
    };
    (
        FetchScheduler::new(query, cache, outcome_tx, &config),
        outcome_rx,
    )
}

/// Map-backed query: fetches succeed for inserted ids and fail with a
/// transport error otherwise.
pub struct ScriptedQuery {
    responses: Mutex<HashMap<SubmapId, TextureResponse>>,
}

impl ScriptedQuery {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, id: SubmapId, response: TextureResponse) {
        self.responses.lock().insert(id, response);
    }
}

impl TextureQuery for ScriptedQuery {
    fn fetch_textures(&self, id: SubmapId) -> FetchResult<TextureResponse> {
        self.responses
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| FetchError::Transport("no route to map service".to_string()))
    }
}

/// Query that parks every fetch until the test sends a response, keeping
/// the record in flight for as long as the test needs.
pub struct GatedQuery {
    pub started_tx: Sender<SubmapId>,
    pub release_rx: Receiver<TextureResponse>,
}

impl TextureQuery for GatedQuery {
    fn fetch_textures(&self, id: SubmapId) -> FetchResult<TextureResponse> {
        let _ = self.started_tx.send(id);
        self.release_rx
            .recv()
            .map_err(|_| FetchError::Transport("release channel closed".to_string()))
    }
}
