//! Ingest Thread - metadata subscription consumer.
//!
//! Drains the listing channel and drives the cache: every batch is applied
//! atomically, records for unlisted submaps are dropped, and a fetch is
//! requested for every submap the batch left stale. Admission (staleness,
//! one in-flight per id, rate limit) happens inside the cache, so this
//! thread just offers every stale id to the scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Receiver};

use crate::cache::SubmapCache;
use crate::fetch::FetchHandle;
use crate::io::messages::SubmapList;

/// Ingest thread handle.
pub struct IngestThread {
    handle: JoinHandle<()>,
}

impl IngestThread {
    /// Spawn the ingest thread.
    ///
    /// The fetch handle moves into the thread and is dropped when the loop
    /// exits, which is what lets the scheduler drain afterwards.
    pub fn spawn(
        cache: Arc<SubmapCache>,
        fetcher: FetchHandle,
        list_rx: Receiver<SubmapList>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("list-ingest".into())
            .spawn(move || {
                run_ingest_loop(cache, fetcher, list_rx, running);
            })
            .expect("Failed to spawn ingest thread");

        Self { handle }
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_ingest_loop(
    cache: Arc<SubmapCache>,
    fetcher: FetchHandle,
    list_rx: Receiver<SubmapList>,
    running: Arc<AtomicBool>,
) {
    log::info!("Ingest thread starting");

    while running.load(Ordering::Relaxed) {
        select! {
            recv(list_rx) -> result => {
                match result {
                    Ok(list) => ingest_list(&cache, &fetcher, &list),
                    Err(_) => {
                        log::info!("Listing channel closed");
                        break;
                    }
                }
            }
            // Timeout to allow checking the running flag
            default(Duration::from_millis(100)) => {}
        }
    }

    log::info!("Ingest thread shutting down");
}

fn ingest_list(cache: &SubmapCache, fetcher: &FetchHandle, list: &SubmapList) {
    let stale = cache.apply_list(list);

    let removed = cache.remove_unlisted(&list.ids());
    if removed > 0 {
        log::info!("Dropped {} submap records no longer listed", removed);
    }

    let mut queued = 0;
    for id in &stale {
        if fetcher.maybe_fetch(*id) {
            queued += 1;
        }
    }

    log::debug!(
        "Listing batch: {} entries, {} stale, {} fetches queued",
        list.entries.len(),
        stale.len(),
        queued
    );
}
