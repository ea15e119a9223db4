//! AI zones: named regions whose activity follows player occupancy.

use tracing::{info, warn};

use crate::spawner::SpawnerId;

/// Something that reacts to a zone waking up or going idle.
pub trait AIZoneListener {
    /// The first player entered.
    fn on_ai_zone_activated(&mut self);
    /// The last player left.
    fn on_ai_zone_deactivated(&mut self);
    /// Whether the listener currently considers its zone active.
    fn is_ai_zone_active(&self) -> bool;
}

/// An occupancy edge that listeners must hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSignal {
    /// Occupancy went from zero to one.
    Activated,
    /// Occupancy went from one to zero.
    Deactivated,
}

impl ZoneSignal {
    /// Deliver the signal to one listener.
    pub fn deliver(self, listener: &mut dyn AIZoneListener) {
        match self {
            Self::Activated => listener.on_ai_zone_activated(),
            Self::Deactivated => listener.on_ai_zone_deactivated(),
        }
    }
}

/// A named zone with a player presence counter and an ordered listener list.
///
/// The zone only tracks who to notify; the world owns the spawners and
/// delivers each [`ZoneSignal`] to them in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AIZone {
    name: String,
    player_count: u32,
    listeners: Vec<SpawnerId>,
}

impl AIZone {
    /// An empty, inactive zone.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            player_count: 0,
            listeners: Vec::new(),
        }
    }

    /// Zone name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Players currently inside.
    pub fn player_count(&self) -> u32 {
        self.player_count
    }

    /// Whether at least one player is inside.
    pub fn is_active(&self) -> bool {
        self.player_count > 0
    }

    /// A player entered. Returns [`ZoneSignal::Activated`] on 0 → 1.
    pub fn on_player_entered(&mut self) -> Option<ZoneSignal> {
        self.player_count += 1;
        if self.player_count == 1 {
            info!(zone = %self.name, "zone activated");
            Some(ZoneSignal::Activated)
        } else {
            None
        }
    }

    /// A player left. Returns [`ZoneSignal::Deactivated`] on 1 → 0. Leaving
    /// an empty zone is ignored.
    pub fn on_player_left(&mut self) -> Option<ZoneSignal> {
        if self.player_count == 0 {
            warn!(zone = %self.name, "player left an empty zone");
            return None;
        }
        self.player_count -= 1;
        if self.player_count == 0 {
            info!(zone = %self.name, "zone deactivated");
            Some(ZoneSignal::Deactivated)
        } else {
            None
        }
    }

    /// Register a listener. Registering twice has no effect.
    pub fn add_listener(&mut self, spawner: SpawnerId) {
        if !self.listeners.contains(&spawner) {
            self.listeners.push(spawner);
        }
    }

    /// Unregister a listener.
    pub fn remove_listener(&mut self, spawner: SpawnerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|&s| s != spawner);
        self.listeners.len() != before
    }

    /// Listeners in registration order.
    pub fn listeners(&self) -> &[SpawnerId] {
        &self.listeners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        active: bool,
        activations: u32,
    }

    impl AIZoneListener for Counter {
        fn on_ai_zone_activated(&mut self) {
            self.active = true;
            self.activations += 1;
        }

        fn on_ai_zone_deactivated(&mut self) {
            self.active = false;
        }

        fn is_ai_zone_active(&self) -> bool {
            self.active
        }
    }

    #[test]
    fn only_zero_crossings_signal() {
        let mut zone = AIZone::new("Cave");
        assert_eq!(zone.on_player_entered(), Some(ZoneSignal::Activated));
        assert_eq!(zone.on_player_entered(), None);
        assert_eq!(zone.on_player_left(), None);
        assert_eq!(zone.on_player_left(), Some(ZoneSignal::Deactivated));
        assert!(!zone.is_active());
    }

    #[test]
    fn count_never_goes_negative() {
        let mut zone = AIZone::new("Cave");
        assert_eq!(zone.on_player_left(), None);
        assert_eq!(zone.player_count(), 0);
        assert_eq!(zone.on_player_entered(), Some(ZoneSignal::Activated));
    }

    #[test]
    fn signals_drive_listeners() {
        let mut zone = AIZone::new("Cave");
        let mut counter = Counter::default();
        for _ in 0..3 {
            if let Some(signal) = zone.on_player_entered() {
                signal.deliver(&mut counter);
            }
            if let Some(signal) = zone.on_player_left() {
                signal.deliver(&mut counter);
            }
        }
        assert_eq!(counter.activations, 3);
        assert!(!counter.is_ai_zone_active());
    }

    #[test]
    fn listeners_keep_registration_order() {
        let mut zone = AIZone::new("Cave");
        zone.add_listener(SpawnerId(2));
        zone.add_listener(SpawnerId(0));
        zone.add_listener(SpawnerId(2));
        assert_eq!(zone.listeners(), &[SpawnerId(2), SpawnerId(0)]);
        assert!(zone.remove_listener(SpawnerId(2)));
        assert!(!zone.remove_listener(SpawnerId(2)));
    }
}
