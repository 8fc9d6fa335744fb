//! Multiple-reader / single-writer lock guarding the clipping state.
//!
//! The desktop thread takes the write lock whenever it changes stacking,
//! geometry or visibility. Window threads take the read lock while they
//! redraw or run an update session against their own window. Rules:
//!
//! - any number of readers, or exactly one writer;
//! - the writer is reentrant (nesting is counted per owning thread);
//! - the writer may take nested read locks;
//! - readers are NOT reentrant, and a reader may not upgrade to writer.
//!   Both are debug-asserted.
//! - a waiting writer blocks new readers, so the desktop thread cannot be
//!   starved by a stream of window threads.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tracing::trace;

#[derive(Debug, Default)]
struct LockState {
    readers: usize,
    writer: Option<ThreadId>,
    write_nesting: u32,
    /// read locks taken by the writer thread while it owns the lock
    writer_reads: u32,
    waiting_writers: usize,
    #[cfg(debug_assertions)]
    reader_threads: Vec<ThreadId>,
}

/// The clipping lock shared by the desktop and all window threads
#[derive(Debug, Default)]
pub struct MultiLocker {
    state: Mutex<LockState>,
    changed: Condvar,
}

impl MultiLocker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, LockState>) -> MutexGuard<'a, LockState> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire shared access. Must not be nested on a thread that already
    /// holds a read lock (unless that thread is the writer).
    pub fn read_lock(&self) -> ReadLockGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state();

        if state.writer == Some(me) {
            state.writer_reads += 1;
            return ReadLockGuard { locker: self };
        }

        #[cfg(debug_assertions)]
        debug_assert!(
            !state.reader_threads.contains(&me),
            "MultiLocker: nested read lock on the same thread"
        );

        while state.writer.is_some() || state.waiting_writers > 0 {
            state = self.wait(state);
        }
        state.readers += 1;
        #[cfg(debug_assertions)]
        state.reader_threads.push(me);

        ReadLockGuard { locker: self }
    }

    fn read_unlock(&self) {
        let me = thread::current().id();
        let mut state = self.state();

        if state.writer == Some(me) && state.writer_reads > 0 {
            state.writer_reads -= 1;
            return;
        }

        state.readers = state.readers.saturating_sub(1);
        #[cfg(debug_assertions)]
        {
            if let Some(pos) = state.reader_threads.iter().position(|t| *t == me) {
                state.reader_threads.swap_remove(pos);
            }
        }
        if state.readers == 0 {
            self.changed.notify_all();
        }
    }

    /// Acquire exclusive access. Reentrant on the owning thread.
    pub fn write_lock(&self) -> WriteLockGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state();

        if state.writer == Some(me) {
            state.write_nesting += 1;
            return WriteLockGuard { locker: self };
        }

        #[cfg(debug_assertions)]
        debug_assert!(
            !state.reader_threads.contains(&me),
            "MultiLocker: a reader cannot upgrade to the write lock"
        );

        state.waiting_writers += 1;
        while state.writer.is_some() || state.readers > 0 {
            state = self.wait(state);
        }
        state.waiting_writers -= 1;
        state.writer = Some(me);
        state.write_nesting = 1;
        trace!("clipping write lock acquired");

        WriteLockGuard { locker: self }
    }

    fn write_unlock(&self) {
        let mut state = self.state();
        debug_assert_eq!(
            state.writer,
            Some(thread::current().id()),
            "MultiLocker: write unlock from a thread that does not own it"
        );

        state.write_nesting = state.write_nesting.saturating_sub(1);
        if state.write_nesting == 0 {
            debug_assert_eq!(state.writer_reads, 0, "write lock released with nested reads");
            state.writer = None;
            state.writer_reads = 0;
            trace!("clipping write lock released");
            self.changed.notify_all();
        }
    }

    /// Does the calling thread hold the write lock?
    pub fn is_write_locked(&self) -> bool {
        self.state().writer == Some(thread::current().id())
    }

    /// Does anyone hold a read lock (the writer's nested reads count)?
    pub fn is_read_locked(&self) -> bool {
        let state = self.state();
        state.readers > 0 || state.writer_reads > 0
    }
}

/// Shared access, released on drop
#[must_use = "the read lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ReadLockGuard<'a> {
    locker: &'a MultiLocker,
}

impl Drop for ReadLockGuard<'_> {
    fn drop(&mut self) {
        self.locker.read_unlock();
    }
}

/// Exclusive access, released on drop
#[must_use = "the write lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct WriteLockGuard<'a> {
    locker: &'a MultiLocker,
}

impl Drop for WriteLockGuard<'_> {
    fn drop(&mut self) {
        self.locker.write_unlock();
    }
}
