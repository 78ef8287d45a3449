//! Grid Thread - periodic compositing and publishing.
//!
//! Owns the 2D output path: on a fixed cadence it snapshots the cache,
//! paints every textured submap into one canvas, encodes the occupancy
//! raster, and hands it to the sink. Painting always starts from a fresh
//! snapshot, so pose-only metadata updates are picked up without any
//! signalling.
//!
//! Between publishes the thread drains the fetch outcome channel. The
//! outcomes are already logged where they happen; here they only feed the
//! per-publish update counter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver};

use crate::cache::SubmapCache;
use crate::compose::paint_slices;
use crate::fetch::FetchOutcome;
use crate::grid;
use crate::io::sink::GridSink;

/// Configuration for the grid thread.
#[derive(Debug, Clone)]
pub struct GridThreadConfig {
    /// Publish cadence.
    pub publish_period_ms: u64,
    /// Output raster resolution in meters per cell.
    pub resolution: f64,
}

impl Default for GridThreadConfig {
    fn default() -> Self {
        Self {
            publish_period_ms: 1000,
            resolution: 0.05,
        }
    }
}

/// Grid thread handle.
pub struct GridThread {
    handle: JoinHandle<()>,
}

impl GridThread {
    /// Spawn the grid thread.
    pub fn spawn(
        config: GridThreadConfig,
        cache: Arc<SubmapCache>,
        sink: Arc<dyn GridSink>,
        outcome_rx: Receiver<FetchOutcome>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("grid-publish".into())
            .spawn(move || {
                run_grid_loop(config, cache, sink, outcome_rx, running);
            })
            .expect("Failed to spawn grid thread");

        Self { handle }
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_grid_loop(
    config: GridThreadConfig,
    cache: Arc<SubmapCache>,
    sink: Arc<dyn GridSink>,
    outcome_rx: Receiver<FetchOutcome>,
    running: Arc<AtomicBool>,
) {
    let publish_period = Duration::from_millis(config.publish_period_ms);
    log::info!(
        "Grid thread starting: period {:?}, resolution {} m/cell",
        publish_period,
        config.resolution
    );

    let mut last_publish: Option<Instant> = None;
    let mut updates_since_publish: u64 = 0;

    while running.load(Ordering::Relaxed) {
        select! {
            recv(outcome_rx) -> result => {
                match result {
                    Ok(FetchOutcome::Applied { .. }) => updates_since_publish += 1,
                    Ok(_) => {}
                    Err(_) => {
                        log::info!("Fetch outcome channel closed");
                        break;
                    }
                }
            }
            // Timeout to allow the publish cadence and flag checks
            default(Duration::from_millis(50)) => {}
        }

        if last_publish.map_or(true, |t| t.elapsed() >= publish_period) {
            last_publish = Some(Instant::now());
            publish_grid(
                &cache,
                sink.as_ref(),
                config.resolution,
                updates_since_publish,
            );
            updates_since_publish = 0;
        }
    }

    log::info!("Grid thread shutting down");
}

fn publish_grid(cache: &SubmapCache, sink: &dyn GridSink, resolution: f64, updates: u64) {
    if !sink.is_active() {
        return;
    }

    let snapshot = cache.snapshot();
    let canvas = paint_slices(&snapshot, resolution);
    if canvas.is_empty() {
        log::debug!("No textured submaps to paint yet");
        return;
    }

    let grid = grid::encode(&canvas, resolution, snapshot.stamp_us, &snapshot.frame_id);
    log::info!(
        "Published {}x{} occupancy grid, {:.0}% known, {} texture updates since last",
        grid.width,
        grid.height,
        grid.known_ratio() * 100.0,
        updates
    );
    sink.publish(&grid);
}
