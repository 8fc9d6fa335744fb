//! Locking primitives for the clipping state.

pub mod multi_locker;

pub use multi_locker::{MultiLocker, ReadLockGuard, WriteLockGuard};
