use std::collections::TryReserveError;

use super::Command;

/// Recycled backing storage for recorded commands.
///
/// An encoder takes the storage on `reset` and hands its previous buffer
/// back. The allocator owns the memory across list lifetimes; dropping it
/// before the encoder that borrowed from it is the caller's bug to avoid,
/// enforced by the usual ownership rules.
#[derive(Debug, Default)]
pub struct CommandAllocator {
    storage: Vec<Command>,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandAllocError {
    /// The backing allocation could not be made. There is no sensible
    /// recovery; callers treat this as fatal.
    #[error("failed to reserve command storage: {0}")]
    Storage(#[from] TryReserveError),
}

impl CommandAllocator {
    /// Creates an allocator with room for `capacity` commands.
    pub fn new(capacity: usize) -> Result<Self, CommandAllocError> {
        let mut storage = Vec::new();
        storage.try_reserve_exact(capacity)?;
        Ok(Self { storage })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Takes the recycled storage, leaving the allocator empty until a
    /// buffer is handed back via [`Self::reclaim`].
    pub(crate) fn obtain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.storage)
    }

    /// Accepts a command buffer for reuse; its contents are discarded.
    pub(crate) fn reclaim(&mut self, mut storage: Vec<Command>) {
        storage.clear();
        self.storage = storage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_round_trips_through_reset() {
        let mut allocator = CommandAllocator::new(64).unwrap();
        assert!(allocator.capacity() >= 64);

        let mut storage = allocator.obtain();
        storage.push(Command::SetStencilRef { reference: 1 });
        assert_eq!(allocator.capacity(), 0);

        allocator.reclaim(storage);
        assert!(allocator.capacity() >= 64);

        // Reclaimed storage comes back empty.
        assert!(allocator.obtain().is_empty());
    }
}
