//! Core types for Emberwild: entity ids, math, content handles, timers,
//! spatial state and the outbound event stream.
//!
//! This crate has no notion of a world. The simulation crate builds actors,
//! sessions and zones out of these pieces.

/// Content definitions (items, quests, achievements) and their handles.
pub mod content;
/// Entity identifiers and damage types.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// Vector and rotation math.
pub mod math;
/// The world-side presentation seam.
pub mod presentation;
/// Position, rotation, velocity and remote interpolation.
pub mod spatial;
/// Append-only outbound byte stream and transports.
pub mod stream;
/// Named one-shot and recurring timers.
pub mod timer;

/// Re-export content types.
pub use content::{
    AchievementDef, AchievementHandle, Catalog, ItemDef, ItemHandle, ItemRarity, QuestDef,
    QuestHandle, QuestStateDef,
};
/// Re-export entity types.
pub use entity::{DamageType, EntityId, IdAllocator};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export math types.
pub use math::{Rotation, Vector3};
/// Re-export the presentation seam.
pub use presentation::{Presentation, RecordingPresentation};
/// Re-export spatial state.
pub use spatial::SpatialState;
/// Re-export stream types.
pub use stream::{MemoryTransport, NullTransport, Transport, WriteStream};
/// Re-export the timer scheduler.
pub use timer::TimerScheduler;
