//! Zone-gated spawners with a population cap.

use std::fmt;

use ew_core::{EntityId, Vector3};
use rand::Rng;
use rand::rngs::StdRng;
use serde::Deserialize;
use tracing::debug;

use crate::actor::{Actor, Wanderer};
use crate::config::Placement;
use crate::zone::AIZoneListener;

/// Index of a spawner in the world, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpawnerId(pub usize);

impl fmt::Display for SpawnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spawner#{}", self.0)
    }
}

/// Builds the actors a spawner produces.
pub trait ActorFactory: fmt::Debug {
    /// Create an actor at `placement`.
    fn create(&mut self, placement: Placement, rng: &mut StdRng) -> Actor;
}

/// Factory for roaming creatures of one blueprint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlueprintFactory {
    /// Blueprint name.
    pub blueprint: String,
    /// Starting and maximum health.
    pub max_health: i32,
    /// Roaming radius around the spawn point.
    pub wander_radius: f32,
    /// Rest between moves, in seconds.
    pub wander_pause: f32,
    /// Seconds a corpse lingers before removal.
    pub corpse_time: Option<f32>,
    /// Chance in `0.0..=1.0` that a spawn is elite.
    pub elite_chance: f64,
}

impl Default for BlueprintFactory {
    fn default() -> Self {
        Self {
            blueprint: "Creature".to_string(),
            max_health: 50,
            wander_radius: 500.0,
            wander_pause: 3.0,
            corpse_time: Some(10.0),
            elite_chance: 0.0,
        }
    }
}

impl BlueprintFactory {
    /// Creatures of `blueprint` with `max_health`.
    pub fn new(blueprint: impl Into<String>, max_health: i32) -> Self {
        Self {
            blueprint: blueprint.into(),
            max_health,
            ..Self::default()
        }
    }
}

impl ActorFactory for BlueprintFactory {
    fn create(&mut self, placement: Placement, rng: &mut StdRng) -> Actor {
        let brain = Wanderer::new(self.wander_radius, self.wander_pause);
        let mut actor = Actor::with_brain(self.blueprint.clone(), self.max_health, brain).at(placement);
        if let Some(seconds) = self.corpse_time {
            actor = actor.with_corpse_time(seconds);
        }
        if self.elite_chance > 0.0 && rng.random_bool(self.elite_chance.clamp(0.0, 1.0)) {
            actor = actor.elite();
        }
        actor
    }
}

/// Spawns actors near a point while its zone is active, up to a cap.
///
/// The spawn timer counts down only while the zone is active. Deactivation
/// freezes it where it is; activation resumes from the frozen value. At the
/// cap the timer holds at zero and a spawn happens on the first tick after
/// a slot frees.
#[derive(Debug)]
pub struct Spawner {
    zone: String,
    placement: Placement,
    max_actors: usize,
    interval: f32,
    spawn_radius: f32,
    timer: f32,
    zone_active: bool,
    actors: Vec<EntityId>,
    factory: Box<dyn ActorFactory>,
}

impl Spawner {
    /// A spawner listening on `zone`.
    pub fn new(
        zone: impl Into<String>,
        placement: Placement,
        max_actors: usize,
        interval: f32,
        factory: impl ActorFactory + 'static,
    ) -> Self {
        Self {
            zone: zone.into(),
            placement,
            max_actors,
            interval: interval.max(0.0),
            spawn_radius: 0.0,
            timer: interval.max(0.0),
            zone_active: false,
            actors: Vec::new(),
            factory: Box::new(factory),
        }
    }

    /// Scatter spawns up to `radius` away from the spawn point.
    pub fn with_spawn_radius(mut self, radius: f32) -> Self {
        self.spawn_radius = radius.max(0.0);
        self
    }

    /// Zone this spawner listens on.
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Spawn point.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Population cap.
    pub fn max_actors(&self) -> usize {
        self.max_actors
    }

    /// Seconds between spawns.
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Seconds until the next spawn.
    pub fn timer(&self) -> f32 {
        self.timer
    }

    /// Tracked actors, oldest first.
    pub fn actors(&self) -> &[EntityId] {
        &self.actors
    }

    /// Number of tracked actors.
    pub fn population(&self) -> usize {
        self.actors.len()
    }

    /// Whether the population is at the cap.
    pub fn is_full(&self) -> bool {
        self.actors.len() >= self.max_actors
    }

    /// Advance the spawn timer. Returns whether a spawn is due now.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.zone_active {
            return false;
        }
        self.timer = (self.timer - dt).max(0.0);
        self.timer <= 0.0 && !self.is_full()
    }

    /// Build the next actor and restart the timer. The caller adds it to the
    /// world and then [`track`](Self::track)s its id.
    pub fn spawn(&mut self, rng: &mut StdRng) -> Actor {
        self.timer = self.interval;
        let mut placement = self.placement;
        if self.spawn_radius > 0.0 {
            let dx = rng.random_range(-self.spawn_radius..=self.spawn_radius);
            let dy = rng.random_range(-self.spawn_radius..=self.spawn_radius);
            placement.position += Vector3::new(dx, dy, 0.0);
        }
        self.factory.create(placement, rng)
    }

    /// Record a spawned actor.
    pub fn track(&mut self, actor: EntityId) {
        if !self.actors.contains(&actor) {
            self.actors.push(actor);
        }
    }

    /// Stop tracking an actor, freeing a slot. The actor itself is untouched.
    pub fn remove_actor(&mut self, actor: EntityId) -> bool {
        let before = self.actors.len();
        self.actors.retain(|&a| a != actor);
        let removed = self.actors.len() != before;
        if removed {
            debug!(zone = %self.zone, entity = %actor, "spawner slot freed");
        }
        removed
    }
}

impl AIZoneListener for Spawner {
    fn on_ai_zone_activated(&mut self) {
        self.zone_active = true;
    }

    fn on_ai_zone_deactivated(&mut self) {
        self.zone_active = false;
    }

    fn is_ai_zone_active(&self) -> bool {
        self.zone_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn spawner(cap: usize, interval: f32) -> Spawner {
        Spawner::new(
            "Cave",
            Placement::default(),
            cap,
            interval,
            BlueprintFactory::new("Rat", 10),
        )
    }

    #[test]
    fn inactive_timer_is_frozen() {
        let mut s = spawner(2, 5.0);
        for _ in 0..10 {
            assert!(!s.tick(1.0));
        }
        assert_eq!(s.timer(), 5.0);

        s.on_ai_zone_activated();
        assert!(!s.tick(3.0));
        s.on_ai_zone_deactivated();
        assert!(!s.tick(100.0));
        assert_eq!(s.timer(), 2.0);

        s.on_ai_zone_activated();
        assert!(s.tick(2.0));
    }

    #[test]
    fn spawn_resets_timer() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = spawner(2, 5.0);
        s.on_ai_zone_activated();
        assert!(s.tick(5.0));
        let actor = s.spawn(&mut rng);
        assert_eq!(actor.core().blueprint_name(), "Rat");
        assert_eq!(s.timer(), 5.0);
    }

    #[test]
    fn cap_holds_timer_at_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = spawner(1, 1.0);
        s.on_ai_zone_activated();
        assert!(s.tick(1.0));
        s.spawn(&mut rng);
        s.track(EntityId(9));
        assert!(!s.tick(5.0));
        assert_eq!(s.timer(), 0.0);

        assert!(s.remove_actor(EntityId(9)));
        assert!(!s.remove_actor(EntityId(9)));
        assert!(s.tick(0.0));
    }

    #[test]
    fn spawn_radius_scatters_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut s = spawner(10, 0.0).with_spawn_radius(100.0);
        for _ in 0..20 {
            let actor = s.spawn(&mut rng);
            let p = actor.core().position();
            assert!(p.x.abs() <= 100.0 && p.y.abs() <= 100.0);
            assert_eq!(p.z, 0.0);
        }
    }

    #[test]
    fn elite_chance_one_always_elite() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut factory = BlueprintFactory {
            elite_chance: 1.0,
            ..BlueprintFactory::new("Boss", 500)
        };
        let actor = factory.create(Placement::default(), &mut rng);
        assert!(actor.core().is_elite());
        assert_eq!(actor.core().max_health(), 500);
    }
}
