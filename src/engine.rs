//! Boundary to the drawing engine.
//!
//! The window core never rasterizes anything itself. It tells the engine
//! which screen regions to fill, blit or flush from the back buffer, and
//! brackets multi-step paints with `suspend_auto_sync`/`sync`.
//!
//! Clipping and the copy-to-front switch are per engine instance. Every
//! window draws through its own instance from
//! [`DrawingEngine::create_window_engine`], so one window's update cannot
//! change how another one draws.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::region::Region;

/// Operations the window core needs from the drawing engine
pub trait DrawingEngine: Send + Sync {
    /// Restrict subsequent drawing to `region` (`None` lifts the restriction).
    fn constrain_clipping_region(&self, region: Option<&Region>);

    fn fill_region(&self, region: &Region, color: u32);

    /// Blit the pixels of `region` by (`dx`, `dy`).
    fn copy_region(&self, region: &Region, dx: i32, dy: i32);

    fn copy_to_front_enabled(&self) -> bool;

    /// Toggle the automatic back-to-front copy after each drawing command.
    fn set_copy_to_front_enabled(&self, enabled: bool);

    /// Flush `region` from the back buffer to the front buffer.
    fn copy_to_front(&self, region: &Region);

    fn suspend_auto_sync(&self);

    fn sync(&self);

    /// A new engine on the same frame buffer, with its own clipping and
    /// copy-to-front state.
    fn create_window_engine(&self) -> Arc<dyn DrawingEngine>;
}

#[derive(Debug, Default)]
struct EngineCounters {
    filled_rects: AtomicU64,
    copied_rects: AtomicU64,
    flushed_rects: AtomicU64,
}

/// Engine without a frame buffer; counts the work it was asked to do
#[derive(Debug)]
pub struct HeadlessEngine {
    copy_to_front: AtomicBool,
    clipping: Mutex<Option<Region>>,
    // shared by every engine of the same frame buffer
    counters: Arc<EngineCounters>,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::with_counters(Arc::new(EngineCounters::default()))
    }
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_counters(counters: Arc<EngineCounters>) -> Self {
        Self {
            copy_to_front: AtomicBool::new(true),
            clipping: Mutex::new(None),
            counters,
        }
    }

    /// (filled, copied, flushed) rectangle counts so far, over all engines
    /// of this frame buffer
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.counters.filled_rects.load(Ordering::Relaxed),
            self.counters.copied_rects.load(Ordering::Relaxed),
            self.counters.flushed_rects.load(Ordering::Relaxed),
        )
    }

    fn clipped_count(&self, region: &Region) -> u64 {
        let clipping = self.clipping.lock().unwrap_or_else(PoisonError::into_inner);
        match clipping.as_ref() {
            Some(clip) => {
                let mut clipped = region.clone();
                clipped.intersect_with(clip);
                clipped.count_rects() as u64
            }
            None => region.count_rects() as u64,
        }
    }
}

impl DrawingEngine for HeadlessEngine {
    fn constrain_clipping_region(&self, region: Option<&Region>) {
        *self.clipping.lock().unwrap_or_else(PoisonError::into_inner) = region.cloned();
    }

    fn fill_region(&self, region: &Region, color: u32) {
        let count = self.clipped_count(region);
        trace!("fill {} rects with {:#08x}", count, color);
        self.counters.filled_rects.fetch_add(count, Ordering::Relaxed);
    }

    fn copy_region(&self, region: &Region, dx: i32, dy: i32) {
        trace!("copy {} rects by ({}, {})", region.count_rects(), dx, dy);
        self.counters
            .copied_rects
            .fetch_add(region.count_rects() as u64, Ordering::Relaxed);
    }

    fn copy_to_front_enabled(&self) -> bool {
        self.copy_to_front.load(Ordering::Relaxed)
    }

    fn set_copy_to_front_enabled(&self, enabled: bool) {
        self.copy_to_front.store(enabled, Ordering::Relaxed);
    }

    fn copy_to_front(&self, region: &Region) {
        self.counters
            .flushed_rects
            .fetch_add(region.count_rects() as u64, Ordering::Relaxed);
    }

    fn suspend_auto_sync(&self) {}

    fn sync(&self) {}

    fn create_window_engine(&self) -> Arc<dyn DrawingEngine> {
        Arc::new(Self::with_counters(Arc::clone(&self.counters)))
    }
}
