//! Error taxonomy for the simulation.
//!
//! A [`Rejection`] means the request was invalid and nothing changed; callers
//! recover locally. A [`ContentError`] means the content graph itself is
//! broken (a dialogue edge pointing nowhere, an unknown quest state); these
//! are logged when raised and are never folded into rejections.

use ew_core::EntityId;
use tracing::error;

use crate::spawner::SpawnerId;

/// Alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

/// A command that was refused without mutating any state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Equipment slot index outside `0..EQUIP_SLOTS`.
    #[error("equipment slot {0} is out of range")]
    InvalidSlot(usize),

    /// The player holds fewer items than required.
    #[error("not enough {item}: have {have}, need {need}")]
    InsufficientItems {
        /// Item name.
        item: String,
        /// Count held.
        have: u32,
        /// Count required.
        need: u32,
    },

    /// The player does not own the item.
    #[error("item \"{0}\" is not owned")]
    ItemNotOwned(String),

    /// The item cannot go into an equipment slot.
    #[error("item \"{0}\" cannot be equipped")]
    NotEquippable(String),

    /// Adding the items would exceed the stack limit.
    #[error("cannot hold {count} more {item}")]
    InventoryFull {
        /// Item name.
        item: String,
        /// Count that did not fit.
        count: u32,
    },

    /// The item is cooling down.
    #[error("item \"{0}\" is on cooldown")]
    OnCooldown(String),

    /// Reload preconditions are not met.
    #[error("cannot reload")]
    CannotReload,

    /// The quest is not in progress.
    #[error("quest \"{0}\" is not in progress")]
    QuestNotInProgress(String),

    /// The player is not in a conversation.
    #[error("not in a conversation")]
    NoConversation,

    /// No transition with this label leaves the current dialogue state.
    #[error("no transition labelled \"{0}\" in the current dialogue state")]
    UnknownTransition(String),

    /// The NPC cannot be talked to right now.
    #[error("npc {0} is not available")]
    NpcUnavailable(EntityId),

    /// Trading requires an open shop with this NPC.
    #[error("no shop is open with {0}")]
    ShopNotOpen(EntityId),

    /// The NPC does not trade this item.
    #[error("\"{0}\" is not traded here")]
    NotTraded(String),

    /// Chat message refused.
    #[error("chat rejected: {0}")]
    ChatRejected(&'static str),

    /// A region change is already in flight.
    #[error("a region change is already in progress")]
    RegionChangeInProgress,

    /// The player is already in the requested region.
    #[error("already in region \"{0}\"")]
    AlreadyInRegion(String),

    /// Teleport or fast-travel destination unknown or locked.
    #[error("unknown destination \"{0}\"")]
    UnknownDestination(String),

    /// DLC key unknown or already redeemed.
    #[error("invalid or already redeemed key")]
    InvalidKey,

    /// No actor with this id.
    #[error("actor {0} not found")]
    ActorNotFound(EntityId),

    /// The actor exists but is not a player.
    #[error("actor {0} is not a player")]
    NotAPlayer(EntityId),

    /// The actor exists but is not an NPC.
    #[error("actor {0} is not an npc")]
    NotAnNpc(EntityId),

    /// The actor is dead.
    #[error("actor {0} is dead")]
    Dead(EntityId),

    /// The actor is still alive.
    #[error("actor {0} is alive")]
    NotDead(EntityId),

    /// The target refuses damage from this instigator.
    #[error("{0} cannot be damaged by this instigator")]
    DamageNotAllowed(EntityId),

    /// No spawner with this id.
    #[error("spawner {0} not found")]
    SpawnerNotFound(SpawnerId),
}

/// Broken content: the data the simulation runs on is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// A dialogue transition targets a state the NPC does not define.
    #[error("npc \"{npc}\": transition \"{label}\" in state \"{from}\" targets missing state \"{target}\"")]
    DanglingTransition {
        /// NPC name.
        npc: String,
        /// State the transition leaves.
        from: String,
        /// Transition label.
        label: String,
        /// Missing target.
        target: String,
    },

    /// The initial-state hook named a state the NPC does not define.
    #[error("npc \"{npc}\": initial state \"{state}\" does not exist")]
    UnknownInitialState {
        /// NPC name.
        npc: String,
        /// Returned state name.
        state: String,
    },

    /// A conversation points at a state the NPC does not define.
    #[error("npc \"{npc}\": dialogue state \"{state}\" does not exist")]
    UnknownDialogueState {
        /// NPC name.
        npc: String,
        /// Missing state name.
        state: String,
    },

    /// A dialogue state was defined twice.
    #[error("npc \"{npc}\": dialogue state \"{state}\" defined twice")]
    DuplicateDialogueState {
        /// NPC name.
        npc: String,
        /// Duplicated state name.
        state: String,
    },

    /// An NPC registered without any dialogue states.
    #[error("npc \"{0}\" has no dialogue states")]
    EmptyDialogue(String),

    /// A quest was moved to a state it does not define.
    #[error("quest \"{quest}\" has no state \"{state}\"")]
    UnknownQuestState {
        /// Quest name.
        quest: String,
        /// Missing state name.
        state: String,
    },

    /// Configuration names content that is not registered.
    #[error("unknown content \"{0}\"")]
    UnknownContent(String),
}

impl ContentError {
    /// Log the defect and convert it for propagation.
    pub fn report(self) -> SimError {
        error!(error = %self, "content defect");
        SimError::Content(self)
    }
}

/// Any failure raised by a simulation operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// The request was invalid; nothing changed.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The content graph is broken.
    #[error(transparent)]
    Content(#[from] ContentError),
}

impl SimError {
    /// Whether this error signals broken content rather than a bad request.
    pub fn is_content_defect(&self) -> bool {
        matches!(self, Self::Content(_))
    }

    /// The rejection, if this is one.
    pub fn as_rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            Self::Content(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_defects_are_distinguished() {
        let rejected: SimError = Rejection::NoConversation.into();
        let broken = ContentError::EmptyDialogue("Bob".into()).report();
        assert!(!rejected.is_content_defect());
        assert!(broken.is_content_defect());
        assert_eq!(rejected.as_rejection(), Some(&Rejection::NoConversation));
        assert_eq!(broken.as_rejection(), None);
    }

    #[test]
    fn messages_render() {
        let err = Rejection::InsufficientItems {
            item: "HealthPotion".into(),
            have: 3,
            need: 5,
        };
        assert_eq!(err.to_string(), "not enough HealthPotion: have 3, need 5");
    }
}
