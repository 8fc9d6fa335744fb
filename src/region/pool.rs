//! Per-window pool of scratch regions.
//!
//! Redraw and clipping computations need short-lived regions on every
//! pass. The pool keeps emptied regions around so their band storage is
//! reused, and hands them out as [`PooledRegion`] guards that go back to
//! the pool when dropped, on every exit path.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use super::Region;
use crate::errors::{ServerError, ServerResult};

#[derive(Debug)]
struct PoolInner {
    available: Vec<Region>,
    outstanding: usize,
    limit: usize,
}

/// Reuse pool for scratch regions
#[derive(Debug, Clone)]
pub struct RegionPool {
    inner: Arc<Mutex<PoolInner>>,
}

impl RegionPool {
    /// Create a pool that allows at most `limit` regions out at once.
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PoolInner {
                available: Vec::new(),
                outstanding: 0,
                limit,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take an empty region from the pool.
    pub fn get(&self) -> ServerResult<PooledRegion> {
        let mut inner = self.lock();
        if inner.outstanding >= inner.limit {
            warn!("Region pool exhausted ({} outstanding)", inner.outstanding);
            return Err(ServerError::RegionPoolExhausted { limit: inner.limit });
        }
        inner.outstanding += 1;
        let region = inner.available.pop().unwrap_or_default();
        Ok(PooledRegion {
            region,
            pool: Arc::clone(&self.inner),
        })
    }

    /// Take a region from the pool initialized to a copy of `source`.
    pub fn get_copy(&self, source: &Region) -> ServerResult<PooledRegion> {
        let mut region = self.get()?;
        region.clone_from(source);
        Ok(region)
    }

    /// Regions currently handed out.
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    /// Emptied regions waiting for reuse.
    pub fn available(&self) -> usize {
        self.lock().available.len()
    }
}

/// A region borrowed from a [`RegionPool`], recycled on drop
#[derive(Debug)]
pub struct PooledRegion {
    region: Region,
    pool: Arc<Mutex<PoolInner>>,
}

impl Deref for PooledRegion {
    type Target = Region;

    fn deref(&self) -> &Region {
        &self.region
    }
}

impl DerefMut for PooledRegion {
    fn deref_mut(&mut self) -> &mut Region {
        &mut self.region
    }
}

impl Drop for PooledRegion {
    fn drop(&mut self) {
        let mut region = std::mem::take(&mut self.region);
        region.make_empty();
        let mut inner = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        inner.outstanding = inner.outstanding.saturating_sub(1);
        inner.available.push(region);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Rect;

    #[test]
    fn test_regions_return_on_drop() {
        let pool = RegionPool::new(4);
        {
            let mut a = pool.get().unwrap();
            a.include_rect(Rect::new(0, 0, 10, 10));
            let _b = pool.get_copy(&a).unwrap();
            assert_eq!(pool.outstanding(), 2);
        }
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.available(), 2);

        // recycled regions come back empty
        let reused = pool.get().unwrap();
        assert!(reused.is_empty());
    }

    #[test]
    fn test_limit_yields_retryable_error() {
        let pool = RegionPool::new(1);
        let held = pool.get().unwrap();
        assert!(matches!(
            pool.get(),
            Err(ServerError::RegionPoolExhausted { limit: 1 })
        ));
        drop(held);
        assert!(pool.get().is_ok());
    }

    #[test]
    fn test_early_return_paths_recycle() {
        fn bail(pool: &RegionPool) -> ServerResult<()> {
            let _scratch = pool.get()?;
            Err(ServerError::RegionPoolExhausted { limit: 0 })
        }

        let pool = RegionPool::new(2);
        assert!(bail(&pool).is_err());
        assert_eq!(pool.outstanding(), 0);
    }
}
