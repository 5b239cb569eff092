//! Entity identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names an entity for as long as it lives in its world.
///
/// Components that reach a sibling (a particle emitter reading its owner's
/// transform) keep an `EntityId` and resolve it through the world on every
/// use; once the entity is despawned the id resolves to nothing.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out increasing ids starting at 1, never reusing one
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far
    pub fn allocated(&self) -> u64 {
        self.next - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_is_sequential() {
        let mut ids = IdAllocator::new();
        let first = ids.allocate();
        let second = ids.allocate();
        assert_eq!(first.raw(), 1);
        assert_eq!(second.raw(), 2);
        assert!(second > first);
        assert_eq!(ids.allocated(), 2);
    }

    #[test]
    fn test_allocators_are_independent() {
        let mut a = IdAllocator::new();
        let mut b = IdAllocator::new();
        a.allocate();
        assert_eq!(b.allocate(), EntityId::from_raw(1));
    }

    #[test]
    fn test_formatting() {
        let id = EntityId::from_raw(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "EntityId(42)");
    }
}
