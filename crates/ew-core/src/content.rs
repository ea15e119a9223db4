//! Content definitions and the opaque handles the simulation stores.
//!
//! The simulation never enumerates content. It only keeps handles and reads
//! the rules it needs (stack limits, clip sizes, quest states) through them.
//! Handles compare, order and hash by name, so two handles built from the
//! same definition name are the same identity.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::DamageType;
use crate::error::{CoreError, CoreResult};

/// Rarity tier of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRarity {
    /// Crafting resources and currency.
    Resource,
    /// Ordinary gear.
    #[default]
    Normal,
    /// Rare gear.
    Rare,
    /// Legendary gear.
    Legendary,
    /// One-of-a-kind gear.
    Leet,
}

fn one() -> u32 {
    1
}

/// Static rules for one kind of item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    /// Unique identity of the item.
    pub name: String,
    /// Name shown to players.
    #[serde(default)]
    pub display_name: String,
    /// Free-form type label ("Weapon", "Consumable", ...).
    #[serde(default)]
    pub type_name: String,
    /// Description text.
    #[serde(default)]
    pub description: String,
    /// Rarity tier.
    #[serde(default)]
    pub rarity: ItemRarity,
    /// Whether the item may be placed in an equipment slot.
    #[serde(default)]
    pub can_equip: bool,
    /// Maximum stack count held by one player.
    #[serde(default = "one")]
    pub max_count: u32,
    /// Cooldown applied after use, in seconds.
    #[serde(default)]
    pub cooldown: f32,
    /// Seconds a full reload takes.
    #[serde(default)]
    pub reload_time: f32,
    /// Name of the item consumed as ammunition, if any.
    #[serde(default)]
    pub ammo_type: Option<String>,
    /// Rounds that fit in the clip.
    #[serde(default)]
    pub clip_size: u32,
    /// Damage per hit.
    #[serde(default)]
    pub damage: i32,
    /// Damage type of hits.
    #[serde(default)]
    pub damage_type: DamageType,
    /// Mana consumed per use.
    #[serde(default)]
    pub mana_cost: i32,
    /// Base value used by shops.
    #[serde(default)]
    pub trade_value: i32,
}

impl ItemDef {
    /// Create a definition with defaults: stack of one, not equippable.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            type_name: String::new(),
            description: String::new(),
            rarity: ItemRarity::Normal,
            can_equip: false,
            max_count: 1,
            cooldown: 0.0,
            reload_time: 0.0,
            ammo_type: None,
            clip_size: 0,
            damage: 0,
            damage_type: DamageType::Physical,
            mana_cost: 0,
            trade_value: 0,
        }
    }

    /// Set the maximum stack count.
    pub fn with_max_count(mut self, max: u32) -> Self {
        self.max_count = max;
        self
    }

    /// Allow the item to be equipped.
    pub fn equippable(mut self) -> Self {
        self.can_equip = true;
        self
    }

    /// Make the item use `ammo` with the given clip size.
    pub fn with_ammo(mut self, ammo: impl Into<String>, clip_size: u32) -> Self {
        self.ammo_type = Some(ammo.into());
        self.clip_size = clip_size;
        self
    }

    /// Set the reload time in seconds.
    pub fn with_reload_time(mut self, seconds: f32) -> Self {
        self.reload_time = seconds;
        self
    }

    /// Set the use cooldown in seconds.
    pub fn with_cooldown(mut self, seconds: f32) -> Self {
        self.cooldown = seconds;
        self
    }

    /// Set the shop trade value.
    pub fn with_trade_value(mut self, value: i32) -> Self {
        self.trade_value = value;
        self
    }

    /// Set damage and damage type.
    pub fn with_damage(mut self, damage: i32, damage_type: DamageType) -> Self {
        self.damage = damage;
        self.damage_type = damage_type;
        self
    }

    /// Set the rarity tier.
    pub fn with_rarity(mut self, rarity: ItemRarity) -> Self {
        self.rarity = rarity;
        self
    }

    /// Wrap into a shareable handle.
    pub fn into_handle(self) -> ItemHandle {
        ItemHandle(Arc::new(self))
    }
}

macro_rules! named_handle {
    ($(#[$meta:meta])* $handle:ident, $def:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $handle(Arc<$def>);

        impl $handle {
            /// Identity name of the underlying definition.
            pub fn name(&self) -> &str {
                &self.0.name
            }
        }

        impl Deref for $handle {
            type Target = $def;
            fn deref(&self) -> &$def {
                &self.0
            }
        }

        impl PartialEq for $handle {
            fn eq(&self, other: &Self) -> bool {
                self.0.name == other.0.name
            }
        }

        impl Eq for $handle {}

        impl PartialOrd for $handle {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $handle {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.name.cmp(&other.0.name)
            }
        }

        impl Hash for $handle {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.name.hash(state);
            }
        }

        impl Borrow<str> for $handle {
            fn borrow(&self) -> &str {
                &self.0.name
            }
        }

        impl fmt::Display for $handle {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.name)
            }
        }
    };
}

named_handle!(
    /// Shared, name-keyed reference to an [`ItemDef`].
    ItemHandle,
    ItemDef
);

/// One named step of a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestStateDef {
    /// State name, unique within the quest.
    pub name: String,
    /// Objective text.
    #[serde(default)]
    pub description: String,
}

/// A quest and its ordered states. The first state is the starting state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDef {
    /// Unique identity of the quest.
    pub name: String,
    /// Description text.
    #[serde(default)]
    pub description: String,
    /// Ordered states.
    pub states: Vec<QuestStateDef>,
}

impl QuestDef {
    /// Create a quest from a name and its state names.
    pub fn new<S: Into<String>>(name: impl Into<String>, states: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            states: states
                .into_iter()
                .map(|s| QuestStateDef {
                    name: s.into(),
                    description: String::new(),
                })
                .collect(),
        }
    }

    /// The state a freshly started quest enters.
    pub fn starting_state(&self) -> Option<&QuestStateDef> {
        self.states.first()
    }

    /// Look up a state by name.
    pub fn state(&self, name: &str) -> Option<&QuestStateDef> {
        self.states.iter().find(|s| s.name == name)
    }

    /// Wrap into a shareable handle.
    pub fn into_handle(self) -> QuestHandle {
        QuestHandle(Arc::new(self))
    }
}

named_handle!(
    /// Shared, name-keyed reference to a [`QuestDef`].
    QuestHandle,
    QuestDef
);

/// An achievement a player can earn once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDef {
    /// Unique identity.
    pub name: String,
    /// Name shown to players.
    #[serde(default)]
    pub display_name: String,
    /// Description text.
    #[serde(default)]
    pub description: String,
}

impl AchievementDef {
    /// Create an achievement definition.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: String::new(),
        }
    }

    /// Wrap into a shareable handle.
    pub fn into_handle(self) -> AchievementHandle {
        AchievementHandle(Arc::new(self))
    }
}

named_handle!(
    /// Shared, name-keyed reference to an [`AchievementDef`].
    AchievementHandle,
    AchievementDef
);

/// Name-indexed content lookups used when loading scenarios and saved state.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: BTreeMap<String, ItemHandle>,
    quests: BTreeMap<String, QuestHandle>,
    achievements: BTreeMap<String, AchievementHandle>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item definition.
    pub fn add_item(&mut self, def: ItemDef) -> CoreResult<ItemHandle> {
        if self.items.contains_key(&def.name) {
            return Err(CoreError::Duplicate {
                kind: "item",
                name: def.name,
            });
        }
        let handle = def.into_handle();
        self.items.insert(handle.name().to_string(), handle.clone());
        Ok(handle)
    }

    /// Register a quest definition. Quests must have at least one state.
    pub fn add_quest(&mut self, def: QuestDef) -> CoreResult<QuestHandle> {
        if def.states.is_empty() {
            return Err(CoreError::InvalidDefinition {
                name: def.name,
                reason: "quest has no states".into(),
            });
        }
        if self.quests.contains_key(&def.name) {
            return Err(CoreError::Duplicate {
                kind: "quest",
                name: def.name,
            });
        }
        let handle = def.into_handle();
        self.quests.insert(handle.name().to_string(), handle.clone());
        Ok(handle)
    }

    /// Register an achievement definition.
    pub fn add_achievement(&mut self, def: AchievementDef) -> CoreResult<AchievementHandle> {
        if self.achievements.contains_key(&def.name) {
            return Err(CoreError::Duplicate {
                kind: "achievement",
                name: def.name,
            });
        }
        let handle = def.into_handle();
        self.achievements
            .insert(handle.name().to_string(), handle.clone());
        Ok(handle)
    }

    /// Resolve an item by name.
    pub fn item(&self, name: &str) -> CoreResult<ItemHandle> {
        self.items
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownItem(name.to_string()))
    }

    /// Resolve a quest by name.
    pub fn quest(&self, name: &str) -> CoreResult<QuestHandle> {
        self.quests
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownQuest(name.to_string()))
    }

    /// Resolve an achievement by name.
    pub fn achievement(&self, name: &str) -> CoreResult<AchievementHandle> {
        self.achievements
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownAchievement(name.to_string()))
    }

    /// Number of registered items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of registered quests.
    pub fn quest_count(&self) -> usize {
        self.quests.len()
    }

    /// Check cross-references: every `ammo_type` must name a registered item.
    pub fn validate(&self) -> CoreResult<()> {
        for item in self.items.values() {
            if let Some(ammo) = &item.ammo_type
                && !self.items.contains_key(ammo)
            {
                return Err(CoreError::InvalidDefinition {
                    name: item.name.clone(),
                    reason: format!("ammo type \"{ammo}\" is not a registered item"),
                });
            }
        }
        Ok(())
    }
}
