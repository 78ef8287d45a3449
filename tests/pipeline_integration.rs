//! End-to-end pipeline tests: listing ingest, texture fetching, cache
//! versioning, compositing, and occupancy encoding working together.
//!
//! - Fetched pixels flow through paint and encode into occupancy values
//! - Completions superseded while in flight are discarded and retried
//! - A version decrease (producer restart) re-baselines and converges
//! - The threaded daemon publishes grids without any real backend
//!
//! Run with: `cargo test --test pipeline_integration`

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use approx::assert_relative_eq;

use common::{response, scheduler_with, GatedQuery, ScriptedQuery, TIMEOUT};
use darpan_map::cache::SubmapCache;
use darpan_map::compose::paint_slices;
use darpan_map::core::{Rigid3, SubmapId};
use darpan_map::fetch::{FetchOutcome, FetchScheduler, FetchSchedulerConfig};
use darpan_map::grid;
use darpan_map::io::{
    LatestGridSink, MockMapService, MockServiceConfig, MockServiceThread, SubmapEntry, SubmapList,
};
use darpan_map::threads::{GridThread, GridThreadConfig, IngestThread};

#[test]
fn test_listing_to_occupancy_grid() {
    let id = SubmapId::new(0, 3);
    let query = Arc::new(ScriptedQuery::new());
    query.insert(id, response(5, &[10, 200], &[255, 0], 2));

    let cache = Arc::new(SubmapCache::new());
    let list = SubmapList {
        stamp_us: 1_500_000,
        frame_id: "map".to_string(),
        entries: vec![SubmapEntry {
            id,
            pose: Rigid3::identity(),
            version: 5,
        }],
    };

    let (scheduler, outcome_rx) = scheduler_with(query, cache.clone(), 2, 0);
    for stale_id in cache.apply_list(&list) {
        assert!(scheduler.handle().maybe_fetch(stale_id));
    }
    assert_eq!(
        outcome_rx.recv_timeout(TIMEOUT).unwrap(),
        FetchOutcome::Applied { id, version: 5 }
    );

    let snapshot = cache.snapshot();
    let canvas = paint_slices(&snapshot, 0.05);
    assert_eq!((canvas.width(), canvas.height()), (2, 1));

    let raster = grid::encode(&canvas, 0.05, snapshot.stamp_us, &snapshot.frame_id);
    assert_eq!(raster.stamp_us, 1_500_000);
    assert_eq!(raster.frame_id, "map");
    // Intensity 10 reads as 96% occupied; the alpha-0 pixel stays unknown.
    assert_eq!(raster.data, vec![96, -1]);
    assert_relative_eq!(raster.origin_x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(raster.origin_y, 0.0, epsilon = 1e-9);

    scheduler.drain().unwrap();
}

#[test]
fn test_superseded_completion_discarded_then_retried() {
    let id = SubmapId::new(0, 7);
    let (started_tx, started_rx) = crossbeam_channel::unbounded();
    let (release_tx, release_rx) = crossbeam_channel::unbounded();
    let query = Arc::new(GatedQuery {
        started_tx,
        release_rx,
    });

    let cache = Arc::new(SubmapCache::new());
    cache.apply_metadata(id, Rigid3::identity(), 4);

    let (scheduler, outcome_rx) = scheduler_with(query, cache.clone(), 1, 0);
    let handle = scheduler.handle();

    assert!(handle.maybe_fetch(id));
    started_rx.recv_timeout(TIMEOUT).unwrap();

    // Metadata advances while the fetch is still in flight; the v4
    // completion must not satisfy the v6 requirement.
    cache.apply_metadata(id, Rigid3::identity(), 6);
    release_tx.send(response(4, &[50], &[255], 1)).unwrap();
    assert_eq!(
        outcome_rx.recv_timeout(TIMEOUT).unwrap(),
        FetchOutcome::Stale { id, version: 4 }
    );

    let entry = &cache.snapshot().entries[0];
    assert_eq!(entry.pixel_version, None);
    assert!(entry.texture.is_none());

    // The discard settled the in-flight slot; the retry converges.
    assert!(handle.maybe_fetch(id));
    started_rx.recv_timeout(TIMEOUT).unwrap();
    release_tx.send(response(6, &[50], &[255], 1)).unwrap();
    assert_eq!(
        outcome_rx.recv_timeout(TIMEOUT).unwrap(),
        FetchOutcome::Applied { id, version: 6 }
    );

    drop(handle);
    scheduler.drain().unwrap();
}

#[test]
fn test_version_decrease_rebaselines_through_fetch() {
    let id = SubmapId::new(1, 0);
    let query = Arc::new(ScriptedQuery::new());
    query.insert(id, response(5, &[100], &[255], 1));

    let cache = Arc::new(SubmapCache::new());
    cache.apply_metadata(id, Rigid3::identity(), 5);

    let (scheduler, outcome_rx) = scheduler_with(query.clone(), cache.clone(), 1, 0);
    assert!(scheduler.handle().maybe_fetch(id));
    assert_eq!(
        outcome_rx.recv_timeout(TIMEOUT).unwrap(),
        FetchOutcome::Applied { id, version: 5 }
    );

    // The producer restarted: versions start over at 2.
    assert!(cache.apply_metadata(id, Rigid3::identity(), 2));
    query.insert(id, response(2, &[40], &[255], 1));
    assert!(scheduler.handle().maybe_fetch(id));
    assert_eq!(
        outcome_rx.recv_timeout(TIMEOUT).unwrap(),
        FetchOutcome::Applied { id, version: 2 }
    );

    let entry = &cache.snapshot().entries[0];
    assert_eq!(entry.pixel_version, Some(2));
    assert_eq!(entry.texture.as_ref().unwrap().intensity, vec![40]);

    scheduler.drain().unwrap();
}

#[test]
fn test_mock_service_world_converges() {
    let service = Arc::new(MockMapService::new(MockServiceConfig {
        versions_per_submap: 2,
        max_submaps: 3,
        texture_size: 16,
        restart_after_ticks: 5,
        random_seed: 7,
        ..Default::default()
    }));
    let cache = Arc::new(SubmapCache::new());

    let (scheduler, outcome_rx) = scheduler_with(service.clone(), cache.clone(), 2, 0);
    let handle = scheduler.handle();

    for _ in 0..12 {
        let list = service.tick();
        for id in cache.apply_list(&list) {
            handle.maybe_fetch(id);
        }
        cache.remove_unlisted(&list.ids());
    }

    drop(handle);
    scheduler.drain().unwrap();

    let snapshot = cache.snapshot();
    assert_eq!(snapshot.entries.len(), 3);
    assert_eq!(snapshot.stamp_us, 12 * 500 * 1000);
    for entry in &snapshot.entries {
        assert_eq!(entry.pixel_version, Some(entry.metadata_version));
        assert!(entry.texture.is_some());
    }
    // Versions after the restart at tick 5: the oldest submap never
    // advances again, the later two reach the cap.
    let versions: Vec<i32> = snapshot
        .entries
        .iter()
        .map(|entry| entry.metadata_version)
        .collect();
    assert_eq!(versions, vec![1, 2, 2]);

    let applied = outcome_rx
        .try_iter()
        .filter(|outcome| matches!(outcome, FetchOutcome::Applied { .. }))
        .count();
    assert!(applied >= 3);

    let canvas = paint_slices(&snapshot, 0.05);
    assert!(!canvas.is_empty());
    let raster = grid::encode(&canvas, 0.05, snapshot.stamp_us, &snapshot.frame_id);
    assert_eq!(raster.data.len(), (raster.width * raster.height) as usize);
    let known = raster.known_ratio();
    assert!(known > 0.0 && known < 1.0, "known ratio {}", known);
}

#[test]
fn test_threaded_daemon_publishes_grids() {
    let service = Arc::new(MockMapService::new(MockServiceConfig {
        tick_period_ms: 20,
        versions_per_submap: 2,
        max_submaps: 2,
        texture_size: 12,
        random_seed: 3,
        ..Default::default()
    }));
    let cache = Arc::new(SubmapCache::new());
    let sink = Arc::new(LatestGridSink::new());
    let running = Arc::new(AtomicBool::new(true));

    let (list_tx, list_rx) = crossbeam_channel::unbounded();
    let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();
    let scheduler = FetchScheduler::new(
        service.clone(),
        cache.clone(),
        outcome_tx,
        &FetchSchedulerConfig {
            workers: 2,
            min_fetch_interval_ms: 0,
        },
    );

    let service_thread = MockServiceThread::spawn(service.clone(), list_tx, running.clone());
    let ingest_thread =
        IngestThread::spawn(cache.clone(), scheduler.handle(), list_rx, running.clone());
    let grid_thread = GridThread::spawn(
        GridThreadConfig {
            publish_period_ms: 40,
            resolution: 0.05,
        },
        cache.clone(),
        sink.clone(),
        outcome_rx,
        running.clone(),
    );

    // Give the world time to grow, fetch, and publish a few grids.
    thread::sleep(Duration::from_millis(800));
    running.store(false, Ordering::Relaxed);

    service_thread.join().unwrap();
    ingest_thread.join().unwrap();
    scheduler.drain().unwrap();
    grid_thread.join().unwrap();

    assert_eq!(cache.len(), 2);
    assert!(sink.publish_count() > 0);

    let raster = sink.latest().expect("no grid published");
    assert!(raster.width > 0 && raster.height > 0);
    assert!(raster.known_ratio() > 0.0);
    assert_eq!(raster.frame_id, "map");
}
