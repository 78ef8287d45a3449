//! Distance-based fade values for 3D display.
//!
//! The 3D output path hands each textured submap to an external renderer as
//! `(pose, alpha, texture)`. Alpha comes from the viewer's height offset:
//! tiles near the viewer's z stay opaque, tiles far above or below fade out.
//! The committed alpha is hysteretic so small viewer movements do not cause
//! redraw churn, while fully opaque and fully transparent are always reached
//! exactly.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::cache::SubmapSnapshot;
use crate::core::{Rigid3, SubmapId};
use crate::texture::SubmapTexture;

/// Height offset at which fading begins, in meters.
const FADE_START_DISTANCE: f64 = 1.0;
/// Height span over which alpha falls from 1 to 0, in meters.
const FADE_SPAN: f64 = 2.0;
/// Minimum alpha change worth committing.
const ALPHA_UPDATE_THRESHOLD: f64 = 0.2;

/// Hysteretic per-tile opacity from viewer height offset.
///
/// Starts fully transparent so a freshly fetched tile fades in on the first
/// update instead of popping.
#[derive(Clone, Debug)]
pub struct DistanceFader {
    current_alpha: f64,
}

impl DistanceFader {
    pub fn new() -> Self {
        Self { current_alpha: 0.0 }
    }

    /// Recompute the target alpha and commit it if it moved past the
    /// hysteresis threshold or reached exactly 0 or 1.
    pub fn update(&mut self, tile_z: f64, viewer_z: f64) -> f64 {
        let distance = (tile_z - viewer_z).abs();
        let fade = (distance - FADE_START_DISTANCE).max(0.0);
        let target = (1.0 - fade / FADE_SPAN).clamp(0.0, 1.0);

        if (target - self.current_alpha).abs() > ALPHA_UPDATE_THRESHOLD
            || target == 0.0
            || target == 1.0
        {
            self.current_alpha = target;
        }
        self.current_alpha
    }

    pub fn alpha(&self) -> f64 {
        self.current_alpha
    }
}

impl Default for DistanceFader {
    fn default() -> Self {
        Self::new()
    }
}

/// One renderable submap for the external scene renderer.
#[derive(Clone, Debug)]
pub struct SubmapOverlay {
    pub id: SubmapId,
    pub pose: Rigid3,
    pub alpha: f64,
    pub texture: Arc<SubmapTexture>,
}

/// Per-submap faders for every textured tile in the cache.
///
/// Faders are keyed by submap id and dropped once the id disappears from
/// the snapshot, so the set never grows past the live submap count.
pub struct OverlaySet {
    faders: HashMap<SubmapId, DistanceFader>,
}

impl OverlaySet {
    pub fn new() -> Self {
        Self {
            faders: HashMap::new(),
        }
    }

    /// Produce the 3D output values for one snapshot, in ascending id order.
    ///
    /// Entries without pixel data are skipped; they have nothing to render
    /// yet. Faders for ids no longer present are pruned.
    pub fn update(&mut self, snapshot: &SubmapSnapshot, viewer_z: f64) -> Vec<SubmapOverlay> {
        let mut overlays = Vec::with_capacity(snapshot.entries.len());
        let mut live = HashSet::with_capacity(snapshot.entries.len());

        for entry in &snapshot.entries {
            let Some(texture) = &entry.texture else {
                continue;
            };
            live.insert(entry.id);

            let fader = self.faders.entry(entry.id).or_default();
            let alpha = fader.update(entry.pose.translation.z, viewer_z);
            overlays.push(SubmapOverlay {
                id: entry.id,
                pose: entry.pose,
                alpha,
                texture: Arc::clone(texture),
            });
        }

        self.faders.retain(|id, _| live.contains(id));
        overlays
    }

    pub fn len(&self) -> usize {
        self.faders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faders.is_empty()
    }
}

impl Default for OverlaySet {
    fn default() -> Self {
        Self::new()
    }
}
