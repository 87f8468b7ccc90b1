//! Scratch allocation: fresh boxes or a bounded reusable pool.
//!
//! All of a verification run's mutable storage — the parse scratch buffer
//! and the signature slots — lives in one [`VerifierScratch`] block of fixed
//! size. Callers with a heap allocate a fresh block per document; callers
//! that must not allocate after startup draw blocks from a [`ScratchPool`]
//! sized at initialization. Pool exhaustion is a legal outcome, surfaced as
//! `None` and conventionally mapped to [`TargetsError::NoMemory`].
//!
//! [`TargetsError::NoMemory`]: crate::error::TargetsError::NoMemory

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;
use tracing::trace;

use crate::pipeline::SigSlot;
use crate::{BUF_SIZE, MAX_SIGS};

/// The bounded mutable state of one verification run.
///
/// Steady-state memory is exactly this block: `MAX_SIGS` signature slots
/// (signature bytes plus an optional hash context each) and one parse
/// scratch buffer. There is no dynamic growth.
#[derive(Debug, Clone)]
pub struct VerifierScratch {
    pub(crate) buf: [u8; BUF_SIZE],
    pub(crate) slots: [SigSlot; MAX_SIGS],
}

impl VerifierScratch {
    /// Fresh scratch on the stack; prefer [`boxed`] unless the block is
    /// being embedded in caller-managed storage.
    ///
    /// [`boxed`]: VerifierScratch::boxed
    pub fn new() -> Self {
        VerifierScratch {
            buf: [0u8; BUF_SIZE],
            slots: std::array::from_fn(|_| SigSlot::new()),
        }
    }

    /// Fresh heap-allocated scratch (heap mode).
    pub fn boxed() -> Box<Self> {
        Box::new(Self::new())
    }

    /// Disarms every slot so a reused block cannot leak prior state.
    pub(crate) fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
    }
}

impl Default for VerifierScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed pool of scratch blocks for allocation-free steady state.
///
/// The whole pool is allocated up front; acquire and release only move
/// blocks across the internal free list, so concurrent verifications need
/// no external locking.
#[derive(Debug)]
pub struct ScratchPool {
    free: Mutex<Vec<Box<VerifierScratch>>>,
    capacity: usize,
}

impl ScratchPool {
    /// Preallocates `capacity` scratch blocks.
    pub fn new(capacity: usize) -> Self {
        ScratchPool {
            free: Mutex::new((0..capacity).map(|_| VerifierScratch::boxed()).collect()),
            capacity,
        }
    }

    /// Takes a block from the pool, or `None` when every block is in use.
    pub fn acquire(&self) -> Option<PooledScratch<'_>> {
        let block = self.free.lock().pop();
        match block {
            Some(scratch) => {
                trace!(available = self.available(), "scratch block acquired");
                Some(PooledScratch {
                    pool: self,
                    scratch: Some(scratch),
                })
            }
            None => {
                trace!(capacity = self.capacity, "scratch pool exhausted");
                None
            }
        }
    }

    /// Blocks currently available for acquisition.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    /// Total blocks the pool was built with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self, scratch: Box<VerifierScratch>) {
        self.free.lock().push(scratch);
    }
}

/// RAII handle on a pooled scratch block; the block returns to its pool on
/// drop.
#[derive(Debug)]
pub struct PooledScratch<'a> {
    pool: &'a ScratchPool,
    scratch: Option<Box<VerifierScratch>>,
}

impl Deref for PooledScratch<'_> {
    type Target = VerifierScratch;

    fn deref(&self) -> &VerifierScratch {
        self.scratch.as_ref().expect("present until drop")
    }
}

impl DerefMut for PooledScratch<'_> {
    fn deref_mut(&mut self) -> &mut VerifierScratch {
        self.scratch.as_mut().expect("present until drop")
    }
}

impl Drop for PooledScratch<'_> {
    fn drop(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            self.pool.release(scratch);
        }
    }
}
