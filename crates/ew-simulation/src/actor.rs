//! Actors: the common entity data and the variant dispatch over generic
//! creatures, players and NPCs.
//!
//! [`ActorCore`] holds what every actor has (identity, health, state flags,
//! owner link, spatial state, timers, presentation binding). [`ActorKind`]
//! carries the variant-specific state, and [`Actor`] dispatches the lifecycle
//! hooks on it.

use std::collections::BTreeMap;
use std::mem;

use ew_core::{
    DamageType, EntityId, ItemHandle, Presentation, Rotation, SpatialState, TimerScheduler,
    Vector3,
};
use tracing::{debug, info};

use crate::config::Placement;
use crate::error::Rejection;
use crate::npc::Npc;
use crate::player::Player;
use crate::spawner::SpawnerId;

/// What a call to [`Actor::damage`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// The actor was already dead; nothing changed.
    Ignored,
    /// Health dropped and the actor is still alive.
    Damaged {
        /// Health after the hit.
        health: i32,
    },
    /// This hit took health to zero.
    Killed,
}

/// State every actor carries, whatever its kind.
#[derive(Debug)]
pub struct ActorCore {
    id: EntityId,
    blueprint: String,
    display_name: String,
    elite: bool,
    health: i32,
    max_health: i32,
    states: BTreeMap<String, bool>,
    owner: Option<EntityId>,
    spawner: Option<SpawnerId>,
    spatial: SpatialState,
    presentation: Option<Box<dyn Presentation>>,
    removal_requested: bool,
    timers: TimerScheduler<Actor>,
}

impl ActorCore {
    /// A full-health core with no id yet.
    pub fn new(blueprint: impl Into<String>, max_health: i32) -> Self {
        let blueprint = blueprint.into();
        let max_health = max_health.max(1);
        Self {
            id: EntityId(0),
            display_name: blueprint.clone(),
            blueprint,
            elite: false,
            health: max_health,
            max_health,
            states: BTreeMap::new(),
            owner: None,
            spawner: None,
            spatial: SpatialState::default(),
            presentation: None,
            removal_requested: false,
            timers: TimerScheduler::new(),
        }
    }

    /// World-assigned id; `#0` until spawned.
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    /// Content blueprint this actor was built from.
    pub fn blueprint_name(&self) -> &str {
        &self.blueprint
    }

    /// Name shown to players.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Rename for display.
    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    /// Whether this is an elite variant.
    pub fn is_elite(&self) -> bool {
        self.elite
    }

    /// Mark as elite.
    pub fn set_elite(&mut self, elite: bool) {
        self.elite = elite;
    }

    /// Current health.
    pub fn health(&self) -> i32 {
        self.health
    }

    /// Maximum health.
    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    /// Whether health is above zero.
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Overwrite health, clamped to `0..=max`. Does not run kill hooks.
    pub fn set_health(&mut self, health: i32) {
        self.health = health.clamp(0, self.max_health);
    }

    /// Change the maximum, clamping current health to it.
    pub fn set_max_health(&mut self, max: i32) {
        self.max_health = max.max(1);
        self.health = self.health.min(self.max_health);
    }

    /// Restore up to `amount` health on a living actor. Returns the amount
    /// actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if !self.is_alive() || amount <= 0 {
            return 0;
        }
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        self.health - before
    }

    fn apply_damage(&mut self, amount: i32) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount.max(0)).max(0);
        if self.health == 0 {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Damaged {
                health: self.health,
            }
        }
    }

    /// Value of a named flag; unset flags read `false`.
    pub fn get_state(&self, name: &str) -> bool {
        self.states.get(name).copied().unwrap_or(false)
    }

    /// Every flag that has been set, in name order.
    pub fn states(&self) -> impl Iterator<Item = (&str, bool)> {
        self.states.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Set a named flag. Only an actual change is reported to the
    /// presentation; returns whether the value changed.
    pub fn update_state(&mut self, name: &str, value: bool) -> bool {
        let old = self.get_state(name);
        self.states.insert(name.to_string(), value);
        if old == value {
            return false;
        }
        if let Some(p) = self.presentation.as_mut() {
            p.on_update_state(name, value);
        }
        true
    }

    /// Owning actor, for projectiles and pets.
    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    /// Set or clear the owner link.
    pub fn set_owner(&mut self, owner: Option<EntityId>) {
        self.owner = owner;
    }

    /// Spawner tracking this actor.
    pub fn spawner(&self) -> Option<SpawnerId> {
        self.spawner
    }

    pub(crate) fn set_spawner(&mut self, spawner: Option<SpawnerId>) {
        self.spawner = spawner;
    }

    /// Spatial state.
    pub fn spatial(&self) -> &SpatialState {
        &self.spatial
    }

    /// Current position.
    pub fn position(&self) -> Vector3 {
        self.spatial.position
    }

    /// Current rotation.
    pub fn rotation(&self) -> Rotation {
        self.spatial.rotation
    }

    /// Current velocity.
    pub fn velocity(&self) -> Vector3 {
        self.spatial.velocity
    }

    /// Move to `position` and mirror it to the presentation.
    pub fn set_position(&mut self, position: Vector3) {
        self.spatial.position = position;
        if let Some(p) = self.presentation.as_mut() {
            p.set_position(position);
        }
    }

    /// Face `rotation` and mirror it to the presentation.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.spatial.rotation = rotation;
        if let Some(p) = self.presentation.as_mut() {
            p.set_rotation(rotation);
        }
    }

    /// Set velocity and mirror it to the presentation.
    pub fn set_velocity(&mut self, velocity: Vector3) {
        self.spatial.velocity = velocity;
        if let Some(p) = self.presentation.as_mut() {
            p.set_velocity(velocity);
        }
    }

    /// Record forward/strafe movement input.
    pub fn set_forward_and_strafe_movement(&mut self, forward: f32, strafe: f32) {
        self.spatial.set_movement(forward, strafe);
    }

    /// Accept a remote sample to blend toward.
    pub fn set_remote_position_and_rotation(
        &mut self,
        position: Vector3,
        rotation: Rotation,
        velocity: Vector3,
    ) {
        self.spatial.set_remote(position, rotation, velocity);
    }

    /// Snap to a placement with no motion.
    pub fn local_respawn(&mut self, position: Vector3, rotation: Rotation) {
        self.spatial.respawn(position, rotation);
        if let Some(p) = self.presentation.as_mut() {
            p.set_position(position);
            p.set_rotation(rotation);
            p.set_velocity(Vector3::ZERO);
        }
    }

    /// Bind the world-side representation.
    pub fn bind_presentation(&mut self, presentation: Box<dyn Presentation>) {
        self.presentation = Some(presentation);
    }

    /// Whether a presentation is bound.
    pub fn has_presentation(&self) -> bool {
        self.presentation.is_some()
    }

    pub(crate) fn release_presentation(&mut self) {
        if let Some(mut p) = self.presentation.take() {
            p.remove_from_world();
        }
    }

    /// Ask the presentation to walk to `target`.
    pub fn move_to_location(&mut self, target: Vector3) -> bool {
        self.presentation
            .as_mut()
            .is_some_and(|p| p.move_to_location(target))
    }

    /// Ask the presentation to walk toward another actor at `position`.
    pub fn move_to_actor(&mut self, target: EntityId, position: Vector3) -> bool {
        self.presentation
            .as_mut()
            .is_some_and(|p| p.move_to_actor(target, position))
    }

    /// Ask the presentation to walk somewhere within `radius`.
    pub fn move_to_random_location_in_radius(&mut self, radius: f32) -> bool {
        self.presentation
            .as_mut()
            .is_some_and(|p| p.move_to_random_location_in_radius(radius))
    }

    /// First actor on the line of sight to `target`.
    pub fn line_trace_to(&self, target: Vector3) -> Option<EntityId> {
        self.presentation.as_ref()?.line_trace_to(target)
    }

    /// Ask the world to remove this actor at the next opportunity.
    pub fn remove_from_world(&mut self) {
        self.removal_requested = true;
    }

    /// Whether removal has been requested.
    pub fn is_removal_requested(&self) -> bool {
        self.removal_requested
    }

    /// Pending timers.
    pub fn timers(&self) -> &TimerScheduler<Actor> {
        &self.timers
    }

    /// Pending timers, mutably.
    pub fn timers_mut(&mut self) -> &mut TimerScheduler<Actor> {
        &mut self.timers
    }
}

/// AI policy for a generic actor.
///
/// Every hook has a no-op default. Hooks receive the actor's core so they can
/// issue move requests, flip state flags or schedule timers.
pub trait Brain: std::fmt::Debug {
    /// Called once per tick while alive, after timers and interpolation.
    fn on_tick(&mut self, _core: &mut ActorCore, _dt: f32) {}

    /// A move request finished.
    fn on_move_complete(&mut self, _core: &mut ActorCore) {}

    /// Took a hit that did not kill.
    fn on_hit(&mut self, _core: &mut ActorCore, _source: Option<EntityId>, _amount: i32) {}

    /// Health reached zero.
    fn on_killed(&mut self, _core: &mut ActorCore, _killer: Option<EntityId>) {}

    /// This actor killed `target`.
    fn on_target_killed(&mut self, _core: &mut ActorCore, _target: EntityId) {}

    /// Adjust incoming damage, e.g. for resistances.
    fn adjust_damage(&self, amount: i32, _damage_type: DamageType) -> i32 {
        amount
    }

    /// Whether `instigator` may damage this actor.
    fn can_be_damaged(&self, _instigator: Option<&Actor>) -> bool {
        true
    }
}

/// Brain that roams around its spawn point and resists some damage types.
#[derive(Debug, Clone)]
pub struct Wanderer {
    radius: f32,
    pause: f32,
    waiting: f32,
    moving: bool,
    resistances: Vec<(DamageType, f32)>,
}

impl Wanderer {
    /// Roam within `radius`, resting `pause` seconds between moves.
    pub fn new(radius: f32, pause: f32) -> Self {
        Self {
            radius,
            pause,
            waiting: pause,
            moving: false,
            resistances: Vec::new(),
        }
    }

    /// Ignore `fraction` (0.0..=1.0) of damage of one type.
    pub fn with_resistance(mut self, damage_type: DamageType, fraction: f32) -> Self {
        self.resistances
            .push((damage_type, fraction.clamp(0.0, 1.0)));
        self
    }

    /// Whether a move request is outstanding.
    pub fn is_moving(&self) -> bool {
        self.moving
    }
}

impl Brain for Wanderer {
    fn on_tick(&mut self, core: &mut ActorCore, dt: f32) {
        if self.moving {
            return;
        }
        self.waiting -= dt;
        if self.waiting <= 0.0 {
            self.waiting = self.pause;
            self.moving = core.move_to_random_location_in_radius(self.radius);
        }
    }

    fn on_move_complete(&mut self, _core: &mut ActorCore) {
        self.moving = false;
    }

    fn on_killed(&mut self, _core: &mut ActorCore, _killer: Option<EntityId>) {
        self.moving = false;
    }

    fn adjust_damage(&self, amount: i32, damage_type: DamageType) -> i32 {
        let resisted = self
            .resistances
            .iter()
            .filter(|(t, _)| *t == damage_type)
            .map(|(_, f)| *f)
            .fold(0.0f32, f32::max);
        (amount as f32 * (1.0 - resisted)).round() as i32
    }
}

/// A creature or object driven by an optional [`Brain`].
#[derive(Debug, Default)]
pub struct GenericActor {
    brain: Option<Box<dyn Brain>>,
    corpse_time: Option<f32>,
}

impl GenericActor {
    /// The brain, if any.
    pub fn brain(&self) -> Option<&dyn Brain> {
        self.brain.as_deref()
    }

    /// Seconds a corpse stays before asking to be removed.
    pub fn corpse_time(&self) -> Option<f32> {
        self.corpse_time
    }
}

/// Variant-specific actor state.
#[derive(Debug)]
pub enum ActorKind {
    /// A creature or object.
    Generic(GenericActor),
    /// A connected player session.
    Player(Box<Player>),
    /// A conversational NPC.
    Npc(Box<Npc>),
}

/// One actor in the world.
#[derive(Debug)]
pub struct Actor {
    core: ActorCore,
    kind: ActorKind,
}

impl Actor {
    /// A generic actor with no brain.
    pub fn generic(blueprint: impl Into<String>, max_health: i32) -> Self {
        Self {
            core: ActorCore::new(blueprint, max_health),
            kind: ActorKind::Generic(GenericActor::default()),
        }
    }

    /// A generic actor driven by `brain`.
    pub fn with_brain(
        blueprint: impl Into<String>,
        max_health: i32,
        brain: impl Brain + 'static,
    ) -> Self {
        Self {
            core: ActorCore::new(blueprint, max_health),
            kind: ActorKind::Generic(GenericActor {
                brain: Some(Box::new(brain)),
                corpse_time: None,
            }),
        }
    }

    /// Wrap a player session.
    pub fn player(player: Player) -> Self {
        let mut core = ActorCore::new("Player", player.config().player_max_health);
        core.set_display_name(player.name());
        Self {
            core,
            kind: ActorKind::Player(Box::new(player)),
        }
    }

    /// Wrap an NPC. The NPC's name becomes the blueprint and display name.
    pub fn npc(npc: Npc, max_health: i32) -> Self {
        Self {
            core: ActorCore::new(npc.name(), max_health),
            kind: ActorKind::Npc(Box::new(npc)),
        }
    }

    /// Start at `placement`.
    pub fn at(mut self, placement: Placement) -> Self {
        self.core.spatial = SpatialState::at(placement.position, placement.rotation);
        self
    }

    /// Start with an owner link.
    pub fn owned_by(mut self, owner: EntityId) -> Self {
        self.core.owner = Some(owner);
        self
    }

    /// Mark as elite.
    pub fn elite(mut self) -> Self {
        self.core.elite = true;
        self
    }

    /// Ask for removal `seconds` after being killed. Generic actors only.
    pub fn with_corpse_time(mut self, seconds: f32) -> Self {
        if let ActorKind::Generic(g) = &mut self.kind {
            g.corpse_time = Some(seconds);
        }
        self
    }

    /// World-assigned id.
    pub fn id(&self) -> EntityId {
        self.core.id
    }

    /// Common state.
    pub fn core(&self) -> &ActorCore {
        &self.core
    }

    /// Common state, mutably.
    pub fn core_mut(&mut self) -> &mut ActorCore {
        &mut self.core
    }

    /// Variant state.
    pub fn kind(&self) -> &ActorKind {
        &self.kind
    }

    /// Whether this is a player.
    pub fn is_player(&self) -> bool {
        matches!(self.kind, ActorKind::Player(_))
    }

    /// Whether this is an NPC.
    pub fn is_npc(&self) -> bool {
        matches!(self.kind, ActorKind::Npc(_))
    }

    /// The player session, if this is a player.
    pub fn as_player(&self) -> Option<&Player> {
        match &self.kind {
            ActorKind::Player(p) => Some(p),
            _ => None,
        }
    }

    /// The player session, mutably.
    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match &mut self.kind {
            ActorKind::Player(p) => Some(p),
            _ => None,
        }
    }

    /// The NPC, if this is one.
    pub fn as_npc(&self) -> Option<&Npc> {
        match &self.kind {
            ActorKind::Npc(n) => Some(n),
            _ => None,
        }
    }

    /// The NPC, mutably.
    pub fn as_npc_mut(&mut self) -> Option<&mut Npc> {
        match &mut self.kind {
            ActorKind::Npc(n) => Some(n),
            _ => None,
        }
    }

    /// Whether `instigator` may damage this actor. Dead actors refuse all
    /// damage; two different players need PvP enabled on both sides.
    pub fn can_be_damaged(&self, instigator: Option<&Actor>) -> bool {
        if !self.core.is_alive() {
            return false;
        }
        match &self.kind {
            ActorKind::Generic(g) => g
                .brain
                .as_ref()
                .is_none_or(|b| b.can_be_damaged(instigator)),
            ActorKind::Npc(n) => n.behavior().can_be_damaged(),
            ActorKind::Player(p) => match instigator {
                Some(other) if other.id() != self.id() => match other.as_player() {
                    Some(attacker) => p.is_pvp_enabled() && attacker.is_pvp_enabled(),
                    None => true,
                },
                _ => true,
            },
        }
    }

    /// Apply a hit. Health is clamped at zero; the hit that reaches zero runs
    /// the kill hooks once, and later hits are ignored.
    pub fn damage(
        &mut self,
        source: Option<EntityId>,
        item: Option<&ItemHandle>,
        amount: i32,
        damage_type: DamageType,
    ) -> DamageOutcome {
        let amount = match &self.kind {
            ActorKind::Generic(GenericActor {
                brain: Some(brain), ..
            }) => brain.adjust_damage(amount, damage_type),
            _ => amount,
        };
        let outcome = self.core.apply_damage(amount);
        if outcome == DamageOutcome::Ignored {
            return outcome;
        }
        debug!(entity = %self.core.id, amount, %damage_type, "damaged");
        if let ActorKind::Player(p) = &mut self.kind {
            p.on_damaged(&self.core, item);
        }
        match outcome {
            DamageOutcome::Killed => self.on_killed(source),
            DamageOutcome::Damaged { .. } => {
                if let ActorKind::Generic(GenericActor {
                    brain: Some(brain), ..
                }) = &mut self.kind
                {
                    brain.on_hit(&mut self.core, source, amount);
                }
            }
            DamageOutcome::Ignored => {}
        }
        outcome
    }

    fn on_killed(&mut self, killer: Option<EntityId>) {
        info!(entity = %self.core.id, killer = ?killer, "killed");
        match &mut self.kind {
            ActorKind::Generic(g) => {
                if let Some(brain) = g.brain.as_mut() {
                    brain.on_killed(&mut self.core, killer);
                }
                if let Some(seconds) = g.corpse_time {
                    self.core.timers.add_with_context("despawn", seconds, |actor: &mut Actor| {
                        actor.core.remove_from_world();
                    });
                }
            }
            ActorKind::Player(p) => p.on_killed(killer),
            ActorKind::Npc(_) => {}
        }
        if let Some(p) = self.core.presentation.as_mut() {
            p.on_trigger_event("Killed", killer);
        }
    }

    /// This actor killed `target`.
    pub fn on_target_killed(&mut self, target: EntityId) {
        if let ActorKind::Generic(GenericActor {
            brain: Some(brain), ..
        }) = &mut self.kind
        {
            brain.on_target_killed(&mut self.core, target);
        }
    }

    /// Advance one tick: timers, then variant state, then interpolation, then
    /// the AI hook.
    pub fn tick(&mut self, dt: f32) {
        // Callbacks see a fresh scheduler; their changes are merged back.
        let mut timers = mem::take(&mut self.core.timers);
        timers.tick_detached(self, dt, stand_in_timers);
        let pending = mem::replace(&mut self.core.timers, timers);
        self.core.timers.merge(pending);

        if let ActorKind::Player(p) = &mut self.kind {
            p.tick(&mut self.core, dt);
        }

        self.core.spatial.interpolate(dt);

        if !self.core.is_alive() {
            return;
        }
        match &mut self.kind {
            ActorKind::Generic(GenericActor {
                brain: Some(brain), ..
            }) => brain.on_tick(&mut self.core, dt),
            ActorKind::Npc(n) => n.behavior_mut().on_tick(&mut self.core, dt),
            _ => {}
        }
    }

    /// The presentation finished a move request.
    pub fn on_ai_move_complete(&mut self) {
        match &mut self.kind {
            ActorKind::Generic(GenericActor {
                brain: Some(brain), ..
            }) => brain.on_move_complete(&mut self.core),
            ActorKind::Npc(n) => n.behavior_mut().on_move_complete(&mut self.core),
            _ => {}
        }
    }

    /// Set a named flag. Changes reach the presentation and, for players,
    /// the outbound stream.
    pub fn update_state(&mut self, name: &str, value: bool) -> bool {
        let changed = self.core.update_state(name, value);
        if changed && let ActorKind::Player(p) = &mut self.kind {
            p.queue_state_change(name, value);
        }
        changed
    }

    /// Fire a one-off named event.
    pub fn trigger_event(&mut self, name: &str, source: Option<EntityId>) {
        if let Some(p) = self.core.presentation.as_mut() {
            p.on_trigger_event(name, source);
        }
        if let ActorKind::Player(p) = &mut self.kind {
            p.queue_trigger(name, source);
        }
    }

    /// Whether `user` can interact with this actor.
    pub fn can_use(&self, user: &Actor) -> bool {
        match &self.kind {
            ActorKind::Npc(n) => {
                self.core.is_alive()
                    && !n.dialogue().is_empty()
                    && user.is_player()
                    && user.core.is_alive()
            }
            _ => false,
        }
    }

    /// Schedule a one-shot callback.
    pub fn add_timer(&mut self, name: &str, seconds: f32, callback: impl FnMut() + 'static) {
        self.core.timers.add(name, seconds, callback);
    }

    /// Schedule a one-shot callback that receives this actor.
    pub fn add_timer_with_context(
        &mut self,
        name: &str,
        seconds: f32,
        callback: impl FnMut(&mut Actor) + 'static,
    ) {
        self.core.timers.add_with_context(name, seconds, callback);
    }

    /// Schedule a recurring callback.
    pub fn add_recurring_timer(
        &mut self,
        name: &str,
        seconds: f32,
        callback: impl FnMut() + 'static,
    ) {
        self.core.timers.add_recurring(name, seconds, callback);
    }

    /// Schedule a recurring callback that receives this actor.
    pub fn add_recurring_timer_with_context(
        &mut self,
        name: &str,
        seconds: f32,
        callback: impl FnMut(&mut Actor) + 'static,
    ) {
        self.core
            .timers
            .add_recurring_with_context(name, seconds, callback);
    }

    /// Cancel a timer by name.
    pub fn cancel_timer(&mut self, name: &str) -> bool {
        self.core.timers.cancel(name)
    }

    /// Cancel every timer.
    pub fn clear_timers(&mut self) {
        self.core.timers.clear();
    }

    fn player_mut_or_reject(&mut self) -> Result<&mut Player, Rejection> {
        let id = self.core.id;
        self.as_player_mut().ok_or(Rejection::NotAPlayer(id))
    }

    /// Start reloading the current weapon. Ammo moves into the clip when the
    /// `"reload"` timer fires. Returns the reload duration.
    pub fn request_reload(&mut self) -> Result<f32, Rejection> {
        let id = self.core.id;
        if !self.core.is_alive() {
            return Err(Rejection::Dead(id));
        }
        let (weapon, seconds) = self.player_mut_or_reject()?.begin_reload()?;
        self.core
            .timers
            .add_with_context("reload", seconds, move |actor: &mut Actor| {
                if let Some(p) = actor.as_player_mut() {
                    p.finish_reload(&weapon);
                }
            });
        Ok(seconds)
    }

    /// Bring a dead player back at `placement` with full health.
    pub fn respawn(&mut self, placement: Placement) -> Result<(), Rejection> {
        let id = self.core.id;
        if self.core.is_alive() {
            return Err(Rejection::NotDead(id));
        }
        self.player_mut_or_reject()?.on_respawned(placement);
        self.core.health = self.core.max_health;
        self.core
            .local_respawn(placement.position, placement.rotation);
        Ok(())
    }

    /// Move a player to a named destination.
    pub fn teleport(&mut self, destination: &str) -> Result<Placement, Rejection> {
        let placement = self.player_mut_or_reject()?.teleport_to(destination)?;
        self.core
            .local_respawn(placement.position, placement.rotation);
        Ok(placement)
    }
}

/// The scheduler standing in for a detached one during [`Actor::tick`].
fn stand_in_timers(actor: &mut Actor) -> &mut TimerScheduler<Actor> {
    &mut actor.core.timers
}

#[cfg(test)]
mod tests {
    use super::*;
    use ew_core::RecordingPresentation;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorded(actor: &mut Actor) -> Rc<RefCell<RecordingPresentation>> {
        let rec = Rc::new(RefCell::new(RecordingPresentation::default()));
        actor.core_mut().bind_presentation(Box::new(rec.clone()));
        rec
    }

    #[test]
    fn damage_clamps_and_kills_once() {
        let mut rat = Actor::generic("Rat", 10);
        assert_eq!(
            rat.damage(None, None, 4, DamageType::Physical),
            DamageOutcome::Damaged { health: 6 }
        );
        assert_eq!(
            rat.damage(None, None, 50, DamageType::Physical),
            DamageOutcome::Killed
        );
        assert_eq!(rat.core().health(), 0);
        assert_eq!(
            rat.damage(None, None, 5, DamageType::Physical),
            DamageOutcome::Ignored
        );
    }

    #[test]
    fn negative_damage_does_not_heal() {
        let mut rat = Actor::generic("Rat", 10);
        rat.damage(None, None, -5, DamageType::Physical);
        assert_eq!(rat.core().health(), 10);
    }

    #[test]
    fn kill_trigger_reaches_presentation_once() {
        let mut rat = Actor::generic("Rat", 1);
        let rec = recorded(&mut rat);
        rat.damage(Some(EntityId(9)), None, 1, DamageType::Fire);
        rat.damage(Some(EntityId(9)), None, 1, DamageType::Fire);
        assert_eq!(rec.borrow().triggers, vec!["Killed".to_string()]);
    }

    #[test]
    fn state_changes_are_edge_triggered() {
        let mut rat = Actor::generic("Rat", 10);
        let rec = recorded(&mut rat);
        assert!(!rat.update_state("stunned", false));
        assert!(rat.update_state("stunned", true));
        assert!(!rat.update_state("stunned", true));
        assert!(rat.update_state("stunned", false));
        assert!(rat.update_state("any key at all", true));
        assert_eq!(
            rec.borrow().state_changes,
            vec![
                ("stunned".to_string(), true),
                ("stunned".to_string(), false),
                ("any key at all".to_string(), true),
            ]
        );
    }

    #[test]
    fn move_requests_need_a_presentation() {
        let mut rat = Actor::generic("Rat", 10);
        assert!(!rat.core_mut().move_to_location(Vector3::ZERO));
        assert_eq!(rat.core().line_trace_to(Vector3::ZERO), None);
        let rec = recorded(&mut rat);
        assert!(rat.core_mut().move_to_location(Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(rec.borrow().last_move, Some(Vector3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn wanderer_waits_for_move_completion() {
        let mut rat = Actor::with_brain("Rat", 10, Wanderer::new(5.0, 1.0));
        let rec = recorded(&mut rat);
        rat.tick(0.5);
        assert_eq!(rec.borrow().move_requests, 0);
        rat.tick(0.5);
        assert_eq!(rec.borrow().move_requests, 1);
        rat.tick(5.0);
        assert_eq!(rec.borrow().move_requests, 1);
        rat.on_ai_move_complete();
        rat.tick(1.0);
        assert_eq!(rec.borrow().move_requests, 2);
    }

    #[test]
    fn dead_actor_skips_ai() {
        let mut rat = Actor::with_brain("Rat", 1, Wanderer::new(5.0, 0.0));
        let rec = recorded(&mut rat);
        rat.damage(None, None, 1, DamageType::Physical);
        rat.tick(1.0);
        assert_eq!(rec.borrow().move_requests, 0);
    }

    #[test]
    fn resistance_reduces_damage() {
        let brain = Wanderer::new(1.0, 1.0).with_resistance(DamageType::Fire, 0.5);
        let mut golem = Actor::with_brain("Golem", 100, brain);
        golem.damage(None, None, 20, DamageType::Fire);
        assert_eq!(golem.core().health(), 90);
        golem.damage(None, None, 20, DamageType::Cold);
        assert_eq!(golem.core().health(), 70);
    }

    #[test]
    fn corpse_requests_removal_after_delay() {
        let mut rat = Actor::generic("Rat", 1).with_corpse_time(2.0);
        rat.damage(None, None, 1, DamageType::Physical);
        rat.tick(1.0);
        assert!(!rat.core().is_removal_requested());
        rat.tick(1.0);
        assert!(rat.core().is_removal_requested());
    }

    #[test]
    fn timer_callbacks_can_schedule_more_timers() {
        let mut rat = Actor::generic("Rat", 10);
        rat.add_timer_with_context("first", 1.0, |actor: &mut Actor| {
            actor.add_timer_with_context("second", 1.0, |actor: &mut Actor| {
                actor.update_state("done", true);
            });
        });
        rat.tick(1.0);
        assert!(rat.core().timers().contains("second"));
        assert!(!rat.core().timers().contains("first"));
        rat.tick(1.0);
        assert!(rat.core().get_state("done"));
    }

    #[test]
    fn timer_callback_can_cancel_sibling() {
        let mut rat = Actor::generic("Rat", 10);
        rat.add_timer_with_context("a", 1.0, |actor: &mut Actor| {
            actor.cancel_timer("z");
        });
        rat.add_timer_with_context("z", 2.0, |actor: &mut Actor| {
            actor.update_state("late", true);
        });
        rat.tick(1.0);
        rat.tick(5.0);
        assert!(!rat.core().get_state("late"));
    }

    #[test]
    fn timer_callback_cancels_sibling_expiring_same_tick() {
        let mut rat = Actor::generic("Rat", 10);
        rat.add_timer_with_context("a", 1.0, |actor: &mut Actor| {
            actor.cancel_timer("z");
        });
        rat.add_timer_with_context("z", 1.0, |actor: &mut Actor| {
            actor.update_state("late", true);
        });
        rat.tick(1.0);
        rat.tick(5.0);
        assert!(!rat.core().get_state("late"));
        assert!(rat.core().timers().is_empty());
    }

    #[test]
    fn timer_callback_replaces_sibling_expiring_same_tick() {
        let mut rat = Actor::generic("Rat", 10);
        rat.add_timer_with_context("a", 1.0, |actor: &mut Actor| {
            actor.add_timer_with_context("z", 3.0, |actor: &mut Actor| {
                actor.update_state("new", true);
            });
        });
        rat.add_timer_with_context("z", 1.0, |actor: &mut Actor| {
            actor.update_state("old", true);
        });
        rat.tick(1.0);
        assert!(!rat.core().get_state("old"));
        assert_eq!(rat.core().timers().remaining("z"), Some(3.0));
        rat.tick(3.0);
        assert!(!rat.core().get_state("old"));
        assert!(rat.core().get_state("new"));
    }

    #[test]
    fn npc_is_not_damageable_by_default() {
        let npc = Npc::new("Merchant");
        let merchant = Actor::npc(npc, 100);
        assert!(!merchant.can_be_damaged(None));
    }

    #[test]
    fn owner_link_is_plain_id() {
        let bolt = Actor::generic("Bolt", 1).owned_by(EntityId(3));
        assert_eq!(bolt.core().owner(), Some(EntityId(3)));
    }
}
