use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for every actor in the world.
///
/// Ids are assigned by the world when an actor is spawned and are never
/// reused within one world, so a stale id simply fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The raw integer value.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allocates monotonically increasing entity ids.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    /// Create an allocator whose first id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next unused id.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        id
    }
}

/// Kind of damage carried by an attack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    /// Plain physical damage.
    #[default]
    Physical,
    /// Fire damage.
    Fire,
    /// Cold damage.
    Cold,
    /// Shock damage.
    Shock,
}

impl DamageType {
    /// Wire tag used by the event stream.
    pub fn tag(self) -> u8 {
        match self {
            Self::Physical => 0,
            Self::Fire => 1,
            Self::Cold => 2,
            Self::Shock => 3,
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physical => write!(f, "physical"),
            Self::Fire => write!(f, "fire"),
            Self::Cold => write!(f, "cold"),
            Self::Shock => write!(f, "shock"),
        }
    }
}
