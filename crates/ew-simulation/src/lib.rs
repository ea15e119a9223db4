//! Server-authoritative simulation for Emberwild.
//!
//! A [`World`] owns actors (generic creatures, player sessions and NPCs),
//! AI zones and the spawners gated by them. Everything runs on one thread:
//! [`World::tick`] advances each actor, then each spawner, processes removals
//! and finally flushes every player's outbound events as one batch.
//!
//! Failures are split in two. A [`Rejection`] is a refused command that
//! changed nothing; a [`ContentError`] is broken content and is logged when
//! raised.

/// Actors: shared entity state and variant dispatch.
pub mod actor;
/// World tunables.
pub mod config;
/// Error types for the simulation crate.
pub mod error;
/// World events and the event log.
pub mod event;
/// NPC dialogue graphs and behaviors.
pub mod npc;
/// Player session state.
pub mod player;
/// Zone-gated spawners.
pub mod spawner;
/// The world driver.
pub mod world;
/// AI zones and their listeners.
pub mod zone;

/// Re-exports of actor types.
pub use actor::{Actor, ActorCore, ActorKind, Brain, DamageOutcome, GenericActor, Wanderer};
/// Re-exports of configuration types.
pub use config::{FastTravelDestination, Placement, WorldConfig};
/// Re-exports of [`error::SimError`], [`error::SimResult`] and the two error kinds.
pub use error::{ContentError, Rejection, SimError, SimResult};
/// Re-exports of [`event::EventLog`], [`event::WorldEvent`], and [`event::WorldEventKind`].
pub use event::{EventLog, WorldEvent, WorldEventKind};
/// Re-exports of NPC types.
pub use npc::{
    DialogueEffect, DialogueGraph, DialogueState, DialogueTransition, Greeting, Npc, NpcBehavior,
    QuestCondition, ScriptedBehavior, TransitionKind,
};
/// Re-exports of player types.
pub use player::{Conversation, Player, PlayerIdentity, QuestProgress, SessionEvent};
/// Re-exports of spawner types.
pub use spawner::{ActorFactory, BlueprintFactory, Spawner, SpawnerId};
/// Re-export of [`world::World`].
pub use world::World;
/// Re-exports of zone types.
pub use zone::{AIZone, AIZoneListener, ZoneSignal};
