//! Worker-pool fetch scheduler.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::cache::{FetchGate, SubmapCache, TextureOutcome};
use crate::core::SubmapId;
use crate::texture::SubmapTexture;

use super::client::{FetchError, FetchResult, TextureQuery};

#[derive(Clone, Debug)]
pub struct FetchSchedulerConfig {
    /// Worker threads servicing the fetch queue.
    pub workers: usize,
    /// Minimum delay between fetches of the same submap. Metadata can
    /// arrive far more often than re-requesting imagery is useful.
    pub min_fetch_interval_ms: u64,
}

impl Default for FetchSchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            min_fetch_interval_ms: 250,
        }
    }
}

/// One report per admitted fetch, delivered after the cache update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// New pixels stored.
    Applied { id: SubmapId, version: i32 },
    /// Completed but discarded (superseded version or removed record).
    Stale { id: SubmapId, version: i32 },
    /// Transport, empty-response, or decode failure; record left stale.
    Failed { id: SubmapId },
}

struct FetchJob {
    id: SubmapId,
}

/// Clonable admission front of the scheduler, handed to whichever thread
/// ingests metadata. All handles must be dropped before
/// [`FetchScheduler::drain`] can finish.
#[derive(Clone)]
pub struct FetchHandle {
    job_tx: Sender<FetchJob>,
    cache: Arc<SubmapCache>,
    min_interval: Duration,
}

impl FetchHandle {
    /// Start a fetch for `id` if it is stale, idle, and past the
    /// inter-fetch delay. Returns whether a fetch was admitted.
    pub fn maybe_fetch(&self, id: SubmapId) -> bool {
        match self.cache.try_begin_fetch(id, self.min_interval) {
            FetchGate::Started => {
                if self.job_tx.send(FetchJob { id }).is_err() {
                    // Queue closed mid-shutdown: release the in-flight
                    // slot so the record cannot wedge.
                    self.cache.finish_fetch_failed(id);
                    return false;
                }
                log::debug!("queued texture fetch for submap {}", id);
                true
            }
            _ => false,
        }
    }
}

/// Owns the fetch worker threads. Completions land in the cache and are
/// reported on the outcome channel, exactly one report per admitted fetch.
pub struct FetchScheduler {
    handle: FetchHandle,
    workers: Vec<JoinHandle<()>>,
}

impl FetchScheduler {
    pub fn new(
        client: Arc<dyn TextureQuery>,
        cache: Arc<SubmapCache>,
        outcome_tx: Sender<FetchOutcome>,
        config: &FetchSchedulerConfig,
    ) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<FetchJob>();

        let workers = (0..config.workers.max(1))
            .map(|index| {
                let job_rx = job_rx.clone();
                let client = Arc::clone(&client);
                let cache = Arc::clone(&cache);
                let outcome_tx = outcome_tx.clone();
                thread::Builder::new()
                    .name(format!("fetch-{}", index))
                    .spawn(move || worker_loop(job_rx, client, cache, outcome_tx))
                    .expect("Failed to spawn fetch worker thread")
            })
            .collect();

        Self {
            handle: FetchHandle {
                job_tx,
                cache,
                min_interval: Duration::from_millis(config.min_fetch_interval_ms),
            },
            workers,
        }
    }

    pub fn handle(&self) -> FetchHandle {
        self.handle.clone()
    }

    /// Blocking teardown: close the queue and join every worker. Jobs
    /// already queued are still executed (each holds its record's
    /// in-flight slot, so dropping them would wedge those records), which
    /// means no fetch is outstanding once this returns. Callers must drop
    /// their [`FetchHandle`] clones first or the workers never see the
    /// queue close.
    pub fn drain(self) -> thread::Result<()> {
        drop(self.handle);
        for worker in self.workers {
            worker.join()?;
        }
        Ok(())
    }
}

fn worker_loop(
    job_rx: Receiver<FetchJob>,
    client: Arc<dyn TextureQuery>,
    cache: Arc<SubmapCache>,
    outcome_tx: Sender<FetchOutcome>,
) {
    while let Ok(job) = job_rx.recv() {
        let outcome = run_fetch(client.as_ref(), &cache, job.id);
        // The consumer may already be gone during teardown.
        let _ = outcome_tx.send(outcome);
    }
}

fn run_fetch(client: &dyn TextureQuery, cache: &SubmapCache, id: SubmapId) -> FetchOutcome {
    match fetch_and_decode(client, id) {
        Ok((version, texture)) => match cache.apply_texture(id, version, texture) {
            TextureOutcome::Applied => {
                log::debug!("applied texture for submap {} (v{})", id, version);
                FetchOutcome::Applied { id, version }
            }
            TextureOutcome::StaleCompletion => {
                log::debug!("discarding superseded texture for submap {} (v{})", id, version);
                FetchOutcome::Stale { id, version }
            }
            TextureOutcome::Unknown => {
                log::debug!("discarding texture for removed submap {}", id);
                FetchOutcome::Stale { id, version }
            }
        },
        Err(error) => {
            log::warn!("texture fetch for submap {} failed: {}", id, error);
            cache.finish_fetch_failed(id);
            FetchOutcome::Failed { id }
        }
    }
}

fn fetch_and_decode(
    client: &dyn TextureQuery,
    id: SubmapId,
) -> FetchResult<(i32, SubmapTexture)> {
    let response = client.fetch_textures(id)?;
    // First texture is the highest-resolution one; the rest are unused.
    let encoded = response.textures.first().ok_or(FetchError::EmptyResponse)?;
    let texture = SubmapTexture::decode(encoded)?;
    Ok((response.submap_version, texture))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rigid3;
    use crate::texture::{codec, EncodedTexture, TextureResponse};
    use parking_lot::Mutex;
    use std::collections::HashMap;

    struct FakeQuery {
        responses: Mutex<HashMap<SubmapId, TextureResponse>>,
    }

    impl FakeQuery {
        fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
            }
        }

        fn insert(&self, id: SubmapId, response: TextureResponse) {
            self.responses.lock().insert(id, response);
        }
    }

    impl TextureQuery for FakeQuery {
        fn fetch_textures(&self, id: SubmapId) -> FetchResult<TextureResponse> {
            self.responses
                .lock()
                .get(&id)
                .cloned()
                .ok_or_else(|| FetchError::Transport("no route to map service".to_string()))
        }
    }

    fn response(version: i32, intensity: &[u8], alpha: &[u8], width: u32) -> TextureResponse {
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

    fn scheduler_with(
        client: Arc<dyn TextureQuery>,
        cache: Arc<SubmapCache>,
    ) -> (FetchScheduler, Receiver<FetchOutcome>) {
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();
        let config = FetchSchedulerConfig {
            workers: 1,
            min_fetch_interval_ms: 0,
        };
        (
            FetchScheduler::new(client, cache, outcome_tx, &config),
            outcome_rx,
        )
    }

    #[test]
    fn test_fetch_applies_texture_and_reports() {
        let id = SubmapId::new(0, 3);
        let query = Arc::new(FakeQuery::new());
        query.insert(id, response(5, &[10, 200], &[255, 0], 2));

        let cache = Arc::new(SubmapCache::new());
        cache.apply_metadata(id, Rigid3::identity(), 5);

        let (scheduler, outcome_rx) = scheduler_with(query, cache.clone());
        assert!(scheduler.handle().maybe_fetch(id));

        let outcome = outcome_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, FetchOutcome::Applied { id, version: 5 });
        assert_eq!(cache.snapshot().entries[0].pixel_version, Some(5));

        scheduler.drain().unwrap();
    }

    #[test]
    fn test_transport_failure_reports_and_record_stays_stale() {
        let id = SubmapId::new(0, 0);
        let query = Arc::new(FakeQuery::new());

        let cache = Arc::new(SubmapCache::new());
        cache.apply_metadata(id, Rigid3::identity(), 1);

        let (scheduler, outcome_rx) = scheduler_with(query, cache.clone());
        assert!(scheduler.handle().maybe_fetch(id));

        let outcome = outcome_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, FetchOutcome::Failed { id });

        // Still stale and idle: the next metadata update may retry.
        assert!(cache.apply_metadata(id, Rigid3::identity(), 1));
        assert!(scheduler.handle().maybe_fetch(id));
        outcome_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        scheduler.drain().unwrap();
    }

    #[test]
    fn test_empty_texture_list_is_failure() {
        let id = SubmapId::new(1, 2);
        let query = Arc::new(FakeQuery::new());
        query.insert(
            id,
            TextureResponse {
                submap_version: 3,
                textures: Vec::new(),
            },
        );

        let cache = Arc::new(SubmapCache::new());
        cache.apply_metadata(id, Rigid3::identity(), 3);

        let (scheduler, outcome_rx) = scheduler_with(query, cache.clone());
        assert!(scheduler.handle().maybe_fetch(id));
        assert_eq!(
            outcome_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            FetchOutcome::Failed { id }
        );

        scheduler.drain().unwrap();
    }

    #[test]
    fn test_drain_completes_queued_jobs() {
        let query = Arc::new(FakeQuery::new());
        let cache = Arc::new(SubmapCache::new());

        let ids: Vec<SubmapId> = (0..4).map(|i| SubmapId::new(0, i)).collect();
        for (index, &id) in ids.iter().enumerate() {
            query.insert(id, response(1, &[index as u8], &[255], 1));
            cache.apply_metadata(id, Rigid3::identity(), 1);
        }

        let (scheduler, outcome_rx) = scheduler_with(query, cache.clone());
        let handle = scheduler.handle();
        for &id in &ids {
            assert!(handle.maybe_fetch(id));
        }

        drop(handle);
        scheduler.drain().unwrap();

        // Every admitted fetch settled before drain returned.
        assert_eq!(outcome_rx.try_iter().count(), ids.len());
        for entry in cache.snapshot().entries {
            assert_eq!(entry.pixel_version, Some(1));
        }
    }
}
