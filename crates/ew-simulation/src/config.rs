use std::collections::BTreeMap;

use ew_core::{Rotation, Vector3};
use serde::{Deserialize, Serialize};

/// A position and facing in the world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// World position.
    pub position: Vector3,
    /// Facing.
    #[serde(default)]
    pub rotation: Rotation,
}

impl Placement {
    /// Create a placement.
    pub fn new(position: Vector3, rotation: Rotation) -> Self {
        Self { position, rotation }
    }
}

/// A region reachable by fast travel once its unlock flag has been picked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastTravelDestination {
    /// Region name.
    pub region: String,
    /// Name shown to players.
    #[serde(default)]
    pub display_name: String,
    /// Pickup flag that unlocks this destination.
    pub unlock_flag: String,
}

impl FastTravelDestination {
    /// Create a destination unlocked by `flag`.
    pub fn new(region: impl Into<String>, flag: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            display_name: region.clone(),
            region,
            unlock_flag: flag.into(),
        }
    }
}

/// Tunables shared by every player session and the world driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// RNG seed for spawn placement jitter.
    pub seed: u64,
    /// Maximum world event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
    /// Maximum health of a freshly created player.
    pub player_max_health: i32,
    /// Mana ceiling.
    pub max_mana: i32,
    /// Seconds per regenerated mana point.
    pub mana_regen_interval: f32,
    /// Seconds after taking damage before health starts regenerating.
    pub health_regen_delay: f32,
    /// Seconds per regenerated health point.
    pub health_regen_interval: f32,
    /// Seconds between a PvP request and the change taking effect.
    pub pvp_change_delay: f32,
    /// Seconds between an inventory change and the full inventory snapshot.
    pub item_sync_interval: f32,
    /// Chat messages allowed in a burst.
    pub chat_flood_limit: u32,
    /// Seconds for the flood counter to drop by one.
    pub chat_flood_decay: f32,
    /// Maximum chat message length in bytes.
    pub max_chat_length: usize,
    /// Seconds the last damaging item is remembered.
    pub last_hit_item_duration: f32,
    /// Minimum seconds between circuit input syncs.
    pub circuit_sync_cooldown: f32,
    /// Item used as shop currency.
    pub currency_item: String,
    /// Where players respawn.
    pub spawn_point: Placement,
    /// Named teleport destinations.
    pub teleport_destinations: BTreeMap<String, Placement>,
    /// Fast-travel destinations in display order.
    pub fast_travel: Vec<FastTravelDestination>,
    /// Redeemable keys mapped to the item they grant.
    pub dlc_keys: BTreeMap<String, String>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_events: 0,
            player_max_health: 100,
            max_mana: 100,
            mana_regen_interval: 0.1,
            health_regen_delay: 5.0,
            health_regen_interval: 0.5,
            pvp_change_delay: 30.0,
            item_sync_interval: 1.0,
            chat_flood_limit: 5,
            chat_flood_decay: 1.0,
            max_chat_length: 256,
            last_hit_item_duration: 5.0,
            circuit_sync_cooldown: 0.25,
            currency_item: "Coin".to_string(),
            spawn_point: Placement::default(),
            teleport_destinations: BTreeMap::new(),
            fast_travel: Vec::new(),
            dlc_keys: BTreeMap::new(),
        }
    }
}

impl WorldConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Set the delay before a PvP request takes effect.
    pub fn with_pvp_change_delay(mut self, seconds: f32) -> Self {
        self.pvp_change_delay = seconds;
        self
    }

    /// Set the health regeneration delay and interval.
    pub fn with_health_regen(mut self, delay: f32, interval: f32) -> Self {
        self.health_regen_delay = delay;
        self.health_regen_interval = interval;
        self
    }

    /// Set the mana ceiling and regeneration interval.
    pub fn with_mana(mut self, max: i32, interval: f32) -> Self {
        self.max_mana = max;
        self.mana_regen_interval = interval;
        self
    }

    /// Set the chat flood limit and decay time.
    pub fn with_chat_flood(mut self, limit: u32, decay: f32) -> Self {
        self.chat_flood_limit = limit;
        self.chat_flood_decay = decay;
        self
    }

    /// Set the shop currency item.
    pub fn with_currency(mut self, item: impl Into<String>) -> Self {
        self.currency_item = item.into();
        self
    }

    /// Set the respawn point.
    pub fn with_spawn_point(mut self, placement: Placement) -> Self {
        self.spawn_point = placement;
        self
    }

    /// Add a named teleport destination.
    pub fn with_teleport(mut self, name: impl Into<String>, placement: Placement) -> Self {
        self.teleport_destinations.insert(name.into(), placement);
        self
    }

    /// Add a fast-travel destination.
    pub fn with_fast_travel(mut self, destination: FastTravelDestination) -> Self {
        self.fast_travel.push(destination);
        self
    }

    /// Add a redeemable key granting `item`.
    pub fn with_dlc_key(mut self, key: impl Into<String>, item: impl Into<String>) -> Self {
        self.dlc_keys.insert(key.into(), item.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = WorldConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_events, 0);
        assert_eq!(config.max_mana, 100);
        assert_eq!(config.chat_flood_limit, 5);
        assert_eq!(config.currency_item, "Coin");
        assert!((config.pvp_change_delay - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn config_builder_chain() {
        let config = WorldConfig::default()
            .with_seed(7)
            .with_max_events(10)
            .with_pvp_change_delay(2.0)
            .with_teleport("Town", Placement::default())
            .with_dlc_key("ABCD", "GoldenPistol");
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_events, 10);
        assert!((config.pvp_change_delay - 2.0).abs() < f32::EPSILON);
        assert!(config.teleport_destinations.contains_key("Town"));
        assert_eq!(config.dlc_keys.get("ABCD").map(String::as_str), Some("GoldenPistol"));
    }

    #[test]
    fn config_json_fills_defaults() {
        let config: WorldConfig = serde_json::from_str(
            r#"{ "max_mana": 50, "fast_travel": [{ "region": "Town", "unlock_flag": "TownFT" }] }"#,
        )
        .unwrap();
        assert_eq!(config.max_mana, 50);
        assert_eq!(config.player_max_health, 100);
        assert_eq!(config.fast_travel[0].region, "Town");
    }
}
