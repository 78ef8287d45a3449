//! Destination for published occupancy grids.

use parking_lot::Mutex;

use crate::grid::OccupancyGrid;

/// Where finished occupancy grids go.
///
/// `is_active` lets the grid thread skip painting entirely while nothing
/// is listening on the other side.
pub trait GridSink: Send + Sync {
    fn is_active(&self) -> bool {
        true
    }

    fn publish(&self, grid: &OccupancyGrid);
}

/// Sink that retains the most recent grid.
///
/// The daemon reads it for final stats; tests read it to assert on the
/// published raster.
#[derive(Default)]
pub struct LatestGridSink {
    latest: Mutex<Option<OccupancyGrid>>,
    publish_count: Mutex<u64>,
}

impl LatestGridSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<OccupancyGrid> {
        self.latest.lock().clone()
    }

    pub fn publish_count(&self) -> u64 {
        *self.publish_count.lock()
    }
}

impl GridSink for LatestGridSink {
    fn publish(&self, grid: &OccupancyGrid) {
        *self.latest.lock() = Some(grid.clone());
        *self.publish_count.lock() += 1;
    }
}
