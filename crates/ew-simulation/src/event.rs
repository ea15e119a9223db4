use ew_core::EntityId;

use crate::spawner::SpawnerId;

/// What kind of world event occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEventKind {
    // Lifecycle
    /// An actor entered the world.
    Spawned {
        /// The new actor.
        entity: EntityId,
        /// Its blueprint name.
        blueprint: String,
    },
    /// An actor was removed from the world.
    Destroyed {
        /// The removed actor.
        entity: EntityId,
    },
    /// A spawner produced an actor.
    SpawnerSpawned {
        /// The producing spawner.
        spawner: SpawnerId,
        /// The new actor.
        entity: EntityId,
    },

    // Combat
    /// An actor took damage.
    Damaged {
        /// The damaged actor.
        target: EntityId,
        /// The instigator, if any.
        source: Option<EntityId>,
        /// Damage applied after adjustment.
        amount: i32,
    },
    /// An actor's health reached zero.
    Killed {
        /// The killed actor.
        entity: EntityId,
        /// The killer, if any.
        killer: Option<EntityId>,
    },
    /// A dead player came back.
    Respawned {
        /// The player.
        entity: EntityId,
    },

    // Zones
    /// A zone gained its first player.
    ZoneActivated {
        /// Zone name.
        zone: String,
    },
    /// A zone lost its last player.
    ZoneDeactivated {
        /// Zone name.
        zone: String,
    },

    // Sessions
    /// A player started talking to an NPC.
    ConversationStarted {
        /// The player.
        player: EntityId,
        /// The NPC.
        npc: EntityId,
    },
    /// A conversation ended.
    ConversationEnded {
        /// The player.
        player: EntityId,
        /// The NPC.
        npc: EntityId,
    },
    /// A player started a region transition.
    RegionChangeRequested {
        /// The player.
        player: EntityId,
        /// Target region.
        destination: String,
    },
    /// A player said something.
    Chat {
        /// The speaker.
        player: EntityId,
        /// The message.
        text: String,
    },
}

impl WorldEventKind {
    /// Check whether a given entity is involved in this event.
    pub fn involves(&self, id: EntityId) -> bool {
        match self {
            Self::Spawned { entity, .. }
            | Self::Destroyed { entity }
            | Self::SpawnerSpawned { entity, .. }
            | Self::Respawned { entity } => *entity == id,
            Self::Damaged { target, source, .. } => *target == id || *source == Some(id),
            Self::Killed { entity, killer } => *entity == id || *killer == Some(id),
            Self::ConversationStarted { player, npc } | Self::ConversationEnded { player, npc } => {
                *player == id || *npc == id
            }
            Self::RegionChangeRequested { player, .. } | Self::Chat { player, .. } => *player == id,
            Self::ZoneActivated { .. } | Self::ZoneDeactivated { .. } => false,
        }
    }
}

/// A record of something that happened in the world.
#[derive(Debug, Clone)]
pub struct WorldEvent {
    /// The world tick when this event occurred.
    pub tick: u64,
    /// The specific kind of event that occurred.
    pub kind: WorldEventKind,
    /// A human-readable description of the event.
    pub description: String,
}

impl WorldEvent {
    /// Create a new world event.
    pub fn new(tick: u64, kind: WorldEventKind, description: impl Into<String>) -> Self {
        Self {
            tick,
            kind,
            description: description.into(),
        }
    }
}

/// Accumulates events while the world runs.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<WorldEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: WorldEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Return a slice of all recorded events.
    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    /// Return all events that occurred at the given tick.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&WorldEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Return all events involving the given entity.
    pub fn events_for_entity(&self, id: EntityId) -> Vec<&WorldEvent> {
        self.events.iter().filter(|e| e.kind.involves(id)).collect()
    }

    /// Count events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&WorldEventKind) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(&e.kind)).count()
    }

    /// Return the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Return `true` if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
