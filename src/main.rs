//! DarpanMap - Submap texture cache and occupancy grid compositor
//!
//! Production-style compositing daemon:
//! - **Cache**: Versioned posed submap textures behind a single lock
//! - **Fetch**: Worker pool re-requesting stale imagery over a query seam
//! - **Compose**: Alpha-over painter blending every tile into one canvas
//! - **Output**: Bottom-up occupancy raster handed to a pluggable sink
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      main                           │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   threads/                          │  ← Daemon loops
//! │              (ingest, grid publish)                 │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │              cache/  fetch/  io/                    │  ← State + transport
//! │      (versioned cache, worker pool, service)        │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │              compose/  grid/  texture/              │  ← Pixel pipeline
//! │         (painter, raster encode, codec)             │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │               (ids, transforms)                     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! # With default config
//! cargo run --release
//!
//! # With custom config file
//! cargo run --release -- --config darpan-map.toml
//! ```

// Layer 1: Core foundation (no internal deps)
mod core;

// Layer 2: Texture payloads and codec (depends on core)
mod texture;

// Layer 3: Shared state (depends on core, texture)
mod cache;

// Layer 4: Pixel pipeline (depends on core, cache)
mod compose;
mod grid;

// Layer 5: Transport and I/O (depends on all lower layers)
mod fetch;
mod io;

// Layer 6: Thread infrastructure
mod threads;

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::SubmapCache;
use crate::fetch::{FetchScheduler, FetchSchedulerConfig};
use crate::io::{LatestGridSink, MockMapService, MockServiceConfig, MockServiceThread, SubmapList};
use crate::threads::{GridThread, GridThreadConfig, IngestThread};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct Config {
    #[serde(default)]
    fetch: FetchConfig,
    #[serde(default)]
    grid: GridConfig,
    #[serde(default)]
    service: MockServiceConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FetchConfig {
    /// Worker threads servicing the fetch queue.
    workers: usize,
    /// Minimum delay between fetches of the same submap (ms).
    min_fetch_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            min_fetch_interval_ms: 250,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GridConfig {
    /// Occupancy grid publish period (ms).
    publish_period_ms: u64,
    /// Output raster resolution (m/cell).
    resolution: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            publish_period_ms: 1000,
            resolution: 0.05,
        }
    }
}

// ============================================================================
// CLI Arguments
// ============================================================================

struct Args {
    config_path: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args { config_path: None };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("darpan-map - submap texture cache and occupancy grid compositor");
    println!();
    println!("USAGE:");
    println!("    darpan-map [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>     Configuration file (default: darpan-map.toml)");
    println!("    -h, --help              Print help information");
    println!();
    println!("CONFIGURATION:");
    println!("    All settings are configured via the TOML config file:");
    println!("    - [fetch] workers, min_fetch_interval_ms: Texture fetch pool");
    println!("    - [grid] resolution, publish_period_ms: Occupancy grid output");
    println!("    - [service] tick_period_ms, max_submaps: Simulated map builder");
    println!();
    println!("THREADS:");
    println!("    The daemon runs with 3 fixed threads plus the fetch pool:");
    println!("    - Map Service Thread: Advances the simulated world, publishes listings");
    println!("    - Ingest Thread: Applies listings to the cache, queues fetches");
    println!("    - Grid Thread: Paints the cache and publishes occupancy grids");
}

fn load_config(args: &Args) -> Config {
    match &args.config_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => match basic_toml::from_str(&contents) {
                Ok(cfg) => {
                    log::info!("Loaded config from {}", path);
                    cfg
                }
                Err(e) => {
                    log::warn!("Failed to parse config {}: {}", path, e);
                    Config::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read config {}: {}", path, e);
                Config::default()
            }
        },
        None => {
            // Try default paths
            for path in &["darpan-map.toml", "/etc/darpan-map.toml"] {
                if let Ok(contents) = fs::read_to_string(path) {
                    if let Ok(cfg) = basic_toml::from_str(&contents) {
                        log::info!("Loaded config from {}", path);
                        return cfg;
                    }
                }
            }
            Config::default()
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = parse_args();
    let config = load_config(&args);

    log::info!("darpan-map starting");
    log::info!(
        "  Fetch: {} workers, {}ms min interval",
        config.fetch.workers,
        config.fetch.min_fetch_interval_ms
    );
    log::info!(
        "  Grid: {}m/cell, publish every {}ms",
        config.grid.resolution,
        config.grid.publish_period_ms
    );
    log::info!(
        "  Service: up to {} submaps, {} versions each, {}ms tick",
        config.service.max_submaps,
        config.service.versions_per_submap,
        config.service.tick_period_ms
    );

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    run_daemon(&config, running);

    log::info!("darpan-map shutdown complete");
}

// ============================================================================
// Multi-Threaded Daemon
// ============================================================================

fn run_daemon(config: &Config, running: Arc<AtomicBool>) {
    log::info!("Initializing map compositor daemon...");

    // 1. Create the shared cache
    let cache = Arc::new(SubmapCache::new());
    log::info!("  Submap cache initialized");

    // 2. Create channels: listings flow service -> ingest, fetch outcomes
    // flow workers -> grid
    let (list_tx, list_rx) = crossbeam_channel::unbounded::<SubmapList>();
    let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();

    // 3. Create the simulated map builder
    let service = Arc::new(MockMapService::new(config.service.clone()));

    // 4. Start the fetch worker pool
    let scheduler_config = FetchSchedulerConfig {
        workers: config.fetch.workers,
        min_fetch_interval_ms: config.fetch.min_fetch_interval_ms,
    };
    let scheduler = FetchScheduler::new(
        service.clone(),
        cache.clone(),
        outcome_tx,
        &scheduler_config,
    );
    log::info!("  Fetch pool started ({} workers)", scheduler_config.workers);

    // 5. Spawn threads
    log::info!("Spawning threads...");

    let service_thread = MockServiceThread::spawn(service.clone(), list_tx, running.clone());
    log::info!(
        "  Map service thread started ({}ms tick)",
        config.service.tick_period_ms
    );

    let ingest_thread = IngestThread::spawn(
        cache.clone(),
        scheduler.handle(),
        list_rx,
        running.clone(),
    );
    log::info!("  Ingest thread started");

    let sink = Arc::new(LatestGridSink::new());
    let grid_config = GridThreadConfig {
        publish_period_ms: config.grid.publish_period_ms,
        resolution: config.grid.resolution,
    };
    let grid_thread = GridThread::spawn(
        grid_config,
        cache.clone(),
        sink.clone(),
        outcome_rx,
        running.clone(),
    );
    log::info!(
        "  Grid thread started ({}ms publish period)",
        config.grid.publish_period_ms
    );

    log::info!("Map compositor daemon running");

    // 6. Wait for shutdown signal (main thread just monitors)
    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }

    log::info!("Shutdown signal received, waiting for threads...");

    // 7. Join threads. Order matters: the service stops feeding listings,
    // the ingest thread drops its fetch handle, drain settles every queued
    // fetch and closes the outcome channel, then the grid thread exits.
    if let Err(e) = service_thread.join() {
        log::error!("Map service thread panicked: {:?}", e);
    }
    if let Err(e) = ingest_thread.join() {
        log::error!("Ingest thread panicked: {:?}", e);
    }
    if let Err(e) = scheduler.drain() {
        log::error!("Fetch worker panicked: {:?}", e);
    }
    if let Err(e) = grid_thread.join() {
        log::error!("Grid thread panicked: {:?}", e);
    }

    log::info!("All threads stopped");
    log::info!("  Published {} occupancy grids", sink.publish_count());
    if let Some(grid) = sink.latest() {
        log::info!(
            "  Final grid: {}x{} cells, {:.0}% known",
            grid.width,
            grid.height,
            grid.known_ratio() * 100.0
        );
    }
}
