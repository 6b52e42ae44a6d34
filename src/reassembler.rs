//! Ordering reassembler: turns an arbitrarily ordered stream of position-tagged results
//! back into strictly increasing position order.
//!
//! The reassembler owns a cursor (`next_expected`) and a pending buffer holding only
//! results that arrived ahead of the cursor. Every arrival is inserted, then the buffer
//! is drained for as long as it contains the cursor position. The buffer therefore holds
//! at most as many entries as the out-of-order skew between workers, independent of the
//! total row count.
//!
//! A `Reassembler` is owned by exactly one task; workers never touch it.

use crate::error::InvariantViolation;
use std::collections::HashMap;

#[derive(Debug)]
pub struct Reassembler<T> {
    next_expected: u64,
    pending: HashMap<u64, T>,
    peak_pending: usize,
}

impl<T> Default for Reassembler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Reassembler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_expected: 0,
            pending: HashMap::new(),
            peak_pending: 0,
        }
    }

    /// Accept the result for `position`, then hand every result that is now in order
    /// to `emit`.
    ///
    /// # Errors
    /// Returns [`InvariantViolation`] if `position` was already emitted or is already
    /// pending.
    pub fn push(
        &mut self,
        position: u64,
        item: T,
        mut emit: impl FnMut(T),
    ) -> Result<(), InvariantViolation> {
        if position < self.next_expected {
            return Err(InvariantViolation::Stale {
                position,
                next_expected: self.next_expected,
            });
        }
        if position == self.next_expected {
            // Fast path: no need to go through the buffer.
            emit(item);
            self.next_expected += 1;
        } else {
            if self.pending.insert(position, item).is_some() {
                return Err(InvariantViolation::Duplicate(position));
            }
            self.peak_pending = self.peak_pending.max(self.pending.len());
        }
        while let Some(ready) = self.pending.remove(&self.next_expected) {
            emit(ready);
            self.next_expected += 1;
        }
        Ok(())
    }

    /// The next position the reassembler will emit.
    #[must_use]
    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    /// Number of results currently held out of order.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Largest pending-buffer size observed so far.
    #[must_use]
    pub fn peak_pending(&self) -> usize {
        self.peak_pending
    }

    /// Close the stream once no more results can arrive.
    ///
    /// `produced` is the number of positions the decoder assigned. Succeeds only if
    /// every one of them was emitted exactly once and nothing is left pending.
    ///
    /// # Errors
    /// Returns [`InvariantViolation`] describing the first inconsistency found.
    pub fn finish(self, produced: u64) -> Result<u64, InvariantViolation> {
        if !self.pending.is_empty() {
            return Err(InvariantViolation::PendingNotEmpty {
                pending: self.pending.len(),
                next_expected: self.next_expected,
            });
        }
        if self.next_expected != produced {
            return Err(InvariantViolation::CountMismatch {
                emitted: self.next_expected,
                produced,
            });
        }
        Ok(self.next_expected)
    }
}
