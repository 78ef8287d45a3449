//! Simulated map builder for running the daemon without a live backend.
//!
//! The mock maintains a world of synthetic submaps laid out along an arc,
//! as if a robot were mapping while driving a gentle curve. Every tick the
//! active submap absorbs one more "scan" (its version increments); once it
//! has absorbed enough it is finished and the next submap begins. Each tick
//! also publishes a full `SubmapList` batch, exactly like the real metadata
//! subscription.
//!
//! Textures are generated on demand: a room-like tile with a free interior,
//! an occupied border, and unobserved corners. The observed disc grows with
//! the submap version, so refetches after a version bump visibly reveal
//! more of the room.
//!
//! Two scenario knobs exercise edge cases end to end:
//! - `restart_after_ticks` resets every version to 1 once, simulating a map
//!   builder restart (metadata versions go backwards).
//! - `list_window` lists only the most recent N submaps, driving removal of
//!   unlisted cache records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::core::{Quat, Rigid3, SubmapId, Vec3};
use crate::fetch::{FetchError, FetchResult, TextureQuery};
use crate::io::messages::{SubmapEntry, SubmapList};
use crate::texture::codec::encode_cells;
use crate::texture::{EncodedTexture, TextureResponse};

/// Radius of the driven arc, in meters.
const ARC_RADIUS: f64 = 5.0;
/// Wall thickness of the generated room texture, in pixels.
const WALL_THICKNESS: u32 = 2;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MockServiceConfig {
    /// World advance and listing period.
    pub tick_period_ms: u64,
    /// Scans a submap absorbs before it is finished.
    pub versions_per_submap: i32,
    /// World stops growing after this many submaps.
    pub max_submaps: usize,
    /// Generated textures are square with this side length, in pixels.
    pub texture_size: u32,
    /// Meters per texture pixel.
    pub texture_resolution: f64,
    /// Distance between consecutive submap origins along the arc.
    pub submap_spacing: f64,
    /// Artificial delay before every fetch response.
    pub fetch_latency_ms: u64,
    /// Probability in [0, 1] that a fetch fails with a transport error.
    pub failure_rate: f64,
    /// Seed for failure injection; 0 draws fresh entropy each run.
    pub random_seed: u64,
    /// Reset all versions to 1 once this tick count is reached; 0 disables.
    pub restart_after_ticks: u64,
    /// List only the most recent N submaps; 0 lists everything.
    pub list_window: usize,
}

impl Default for MockServiceConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 500,
            versions_per_submap: 4,
            max_submaps: 8,
            texture_size: 40,
            texture_resolution: 0.05,
            submap_spacing: 1.2,
            fetch_latency_ms: 0,
            failure_rate: 0.0,
            random_seed: 0,
            restart_after_ticks: 0,
            list_window: 0,
        }
    }
}

struct MockSubmap {
    id: SubmapId,
    pose: Rigid3,
    version: i32,
}

struct MockWorld {
    submaps: Vec<MockSubmap>,
    tick_count: u64,
    restarted: bool,
}

/// Simulated map builder: advances a synthetic world and serves textures.
pub struct MockMapService {
    config: MockServiceConfig,
    world: Mutex<MockWorld>,
    rng: Mutex<SmallRng>,
}

impl MockMapService {
    pub fn new(config: MockServiceConfig) -> Self {
        let rng = if config.random_seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(config.random_seed)
        };

        Self {
            config,
            world: Mutex::new(MockWorld {
                submaps: Vec::new(),
                tick_count: 0,
                restarted: false,
            }),
            rng: Mutex::new(rng),
        }
    }

    /// Advance the world one step and return the resulting listing batch.
    pub fn tick(&self) -> SubmapList {
        let mut world = self.world.lock();
        world.tick_count += 1;

        let restart_due = self.config.restart_after_ticks > 0
            && !world.restarted
            && world.tick_count >= self.config.restart_after_ticks;

        if restart_due {
            world.restarted = true;
            for submap in &mut world.submaps {
                submap.version = 1;
            }
            log::warn!("Simulating map builder restart: all versions reset to 1");
        } else {
            let submap_count = world.submaps.len();
            let start_next = match world.submaps.last_mut() {
                None => true,
                Some(active) => {
                    if active.version < self.config.versions_per_submap {
                        active.version += 1;
                        false
                    } else {
                        true
                    }
                }
            };
            if start_next && submap_count < self.config.max_submaps {
                let submap = self.new_submap(submap_count);
                log::info!("Mock map builder started submap {}", submap.id);
                world.submaps.push(submap);
            }
        }

        let skip = if self.config.list_window > 0 {
            world.submaps.len().saturating_sub(self.config.list_window)
        } else {
            0
        };

        SubmapList {
            stamp_us: world.tick_count * self.config.tick_period_ms * 1000,
            frame_id: "map".to_string(),
            entries: world.submaps[skip..]
                .iter()
                .map(|submap| SubmapEntry {
                    id: submap.id,
                    pose: submap.pose,
                    version: submap.version,
                })
                .collect(),
        }
    }

    fn new_submap(&self, index: usize) -> MockSubmap {
        let theta = index as f64 * self.config.submap_spacing / ARC_RADIUS;
        let translation = Vec3::new(
            ARC_RADIUS * theta.sin(),
            ARC_RADIUS * (1.0 - theta.cos()),
            0.0,
        );

        MockSubmap {
            id: SubmapId::new(0, index as i32),
            pose: Rigid3 {
                translation,
                rotation: Quat::from_yaw(theta),
            },
            version: 1,
        }
    }
}

impl TextureQuery for MockMapService {
    fn fetch_textures(&self, id: SubmapId) -> FetchResult<TextureResponse> {
        if self.config.fetch_latency_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.fetch_latency_ms));
        }

        if self.config.failure_rate > 0.0 && self.rng.lock().gen::<f64>() < self.config.failure_rate
        {
            return Err(FetchError::Transport(
                "injected transport failure".to_string(),
            ));
        }

        let version = {
            let world = self.world.lock();
            world
                .submaps
                .iter()
                .find(|submap| submap.id == id)
                .map(|submap| submap.version)
                .ok_or_else(|| FetchError::Transport(format!("no such submap {}", id)))?
        };

        let size = self.config.texture_size;
        let (intensity, alpha) = room_cells(size, version, self.config.versions_per_submap);
        let cells =
            encode_cells(&intensity, &alpha).map_err(|e| FetchError::Transport(e.to_string()))?;

        // Center the tile on the submap origin.
        let extent = size as f64 * self.config.texture_resolution;
        let slice_pose = Rigid3::from_translation(Vec3::new(-extent / 2.0, -extent / 2.0, 0.0));

        Ok(TextureResponse {
            submap_version: version,
            textures: vec![EncodedTexture {
                width: size,
                height: size,
                resolution: self.config.texture_resolution,
                slice_pose,
                cells,
            }],
        })
    }
}

/// Generate a room tile: occupied border, free interior, and an observed
/// disc that grows with the version. Corners stay unobserved even at full
/// reveal.
fn room_cells(size: u32, version: i32, versions_per_submap: i32) -> (Vec<u8>, Vec<u8>) {
    let pixel_count = (size * size) as usize;
    let mut intensity = Vec::with_capacity(pixel_count);
    let mut alpha = Vec::with_capacity(pixel_count);

    let progress = (version as f64 / versions_per_submap.max(1) as f64).min(1.0);
    let half = size as f64 / 2.0;
    let reveal_radius = half * (0.7 + 0.3 * progress);

    for v in 0..size {
        for u in 0..size {
            let du = u as f64 + 0.5 - half;
            let dv = v as f64 + 0.5 - half;
            let observed = (du * du + dv * dv).sqrt() <= reveal_radius;

            let wall = u < WALL_THICKNESS
                || v < WALL_THICKNESS
                || u >= size.saturating_sub(WALL_THICKNESS)
                || v >= size.saturating_sub(WALL_THICKNESS);

            intensity.push(if wall { 0 } else { 255 });
            alpha.push(if observed { 255 } else { 0 });
        }
    }

    (intensity, alpha)
}

/// Handle for the listing publisher thread.
pub struct MockServiceThread {
    handle: JoinHandle<()>,
}

impl MockServiceThread {
    /// Spawn the thread that advances the world and publishes listings.
    pub fn spawn(
        service: Arc<MockMapService>,
        list_tx: Sender<SubmapList>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("map-service".into())
            .spawn(move || {
                run_service_loop(service, list_tx, running);
            })
            .expect("Failed to spawn map service thread");

        Self { handle }
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_service_loop(
    service: Arc<MockMapService>,
    list_tx: Sender<SubmapList>,
    running: Arc<AtomicBool>,
) {
    let tick_period = Duration::from_millis(service.config.tick_period_ms);
    log::info!("Map service thread starting: tick period {:?}", tick_period);

    let mut last_tick: Option<Instant> = None;

    while running.load(Ordering::Relaxed) {
        if last_tick.map_or(true, |t| t.elapsed() >= tick_period) {
            last_tick = Some(Instant::now());

            let list = service.tick();
            if list_tx.send(list).is_err() {
                log::warn!("Listing receiver dropped, stopping map service");
                break;
            }
        }

        thread::sleep(Duration::from_millis(10));
    }

    log::info!("Map service thread shutting down");
}
