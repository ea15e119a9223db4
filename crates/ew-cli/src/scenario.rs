//! JSON scenario files: content, world layout and starting players.

use std::collections::BTreeMap;
use std::path::Path;

use ew_core::{AchievementDef, Catalog, EntityId, ItemDef, QuestDef, Rotation, Vector3};
use ew_simulation::{
    Actor, BlueprintFactory, DialogueEffect, Greeting, Npc, Placement, QuestCondition,
    QuestProgress, ScriptedBehavior, Spawner, World, WorldConfig,
};
use serde::Deserialize;

/// Top-level scenario document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub config: WorldConfig,
    #[serde(default)]
    pub items: Vec<ItemDef>,
    #[serde(default)]
    pub quests: Vec<QuestDef>,
    #[serde(default)]
    pub achievements: Vec<AchievementDef>,
    #[serde(default)]
    pub npcs: Vec<NpcSpec>,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub spawners: Vec<SpawnerSpec>,
    #[serde(default)]
    pub players: Vec<PlayerSpec>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PlacementSpec {
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw: f32,
}

impl From<PlacementSpec> for Placement {
    fn from(spec: PlacementSpec) -> Self {
        let [x, y, z] = spec.position;
        Placement::new(Vector3::new(x, y, z), Rotation::new(0.0, spec.yaw, 0.0))
    }
}

#[derive(Debug, Deserialize)]
pub struct NpcSpec {
    pub name: String,
    #[serde(default = "default_npc_health")]
    pub health: i32,
    #[serde(flatten)]
    pub placement: PlacementSpec,
    pub states: Vec<StateSpec>,
    #[serde(default)]
    pub shop: Vec<String>,
    #[serde(default)]
    pub sell_ratio: Option<f32>,
    #[serde(default)]
    pub greetings: Vec<GreetingSpec>,
    #[serde(default)]
    pub effects: Vec<EffectSpec>,
}

fn default_npc_health() -> i32 {
    100
}

#[derive(Debug, Deserialize)]
pub struct StateSpec {
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionSpec {
    Continue { text: String, target: String },
    End { text: String },
    Shop { text: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSpec {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Deserialize)]
pub struct GreetingSpec {
    pub quest: String,
    pub condition: ConditionSpec,
    #[serde(default)]
    pub quest_state: Option<String>,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct EffectSpec {
    pub state: String,
    #[serde(flatten)]
    pub effect: EffectKind,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectKind {
    GiveItem {
        item: String,
        #[serde(default = "one")]
        count: u32,
    },
    TakeItem {
        item: String,
        #[serde(default = "one")]
        count: u32,
    },
    StartQuest { quest: String },
    AdvanceQuest { quest: String, to: String },
    CompleteQuest { quest: String },
    SetPickup { flag: String },
    Achieve { achievement: String },
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SpawnerSpec {
    pub zone: String,
    #[serde(flatten)]
    pub placement: PlacementSpec,
    pub max_actors: usize,
    pub interval: f32,
    #[serde(default)]
    pub spawn_radius: f32,
    #[serde(default)]
    pub creature: BlueprintFactory,
}

#[derive(Debug, Deserialize)]
pub struct PlayerSpec {
    #[serde(flatten)]
    pub identity: ew_simulation::PlayerIdentity,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub pvp: bool,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub items: Vec<StackSpec>,
    #[serde(default)]
    pub equipped: BTreeMap<usize, String>,
    #[serde(default)]
    pub current_slot: usize,
    #[serde(default)]
    pub quests: BTreeMap<String, QuestSpec>,
    #[serde(default)]
    pub pickups: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StackSpec {
    pub item: String,
    #[serde(default = "one")]
    pub count: u32,
    #[serde(default)]
    pub loaded: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuestSpec {
    NotStarted,
    InProgress {
        state: String,
        #[serde(default)]
        count: u32,
    },
    Completed,
}

/// A scenario turned into a running world.
#[derive(Debug)]
pub struct Loaded {
    pub name: String,
    pub world: World,
    pub npcs: BTreeMap<String, EntityId>,
    pub players: BTreeMap<String, EntityId>,
}

impl Loaded {
    pub fn npc(&self, name: &str) -> Result<EntityId, String> {
        self.npcs
            .get(name)
            .copied()
            .ok_or_else(|| format!("no npc named '{name}'"))
    }

    pub fn player(&self, name: Option<&str>) -> Result<EntityId, String> {
        match name {
            Some(name) => self
                .players
                .get(name)
                .copied()
                .ok_or_else(|| format!("no player named '{name}'")),
            None => self
                .players
                .values()
                .next()
                .copied()
                .ok_or_else(|| "scenario has no players".to_string()),
        }
    }
}

/// Read and parse a scenario file.
pub fn read(path: &Path) -> Result<Scenario, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
}

/// Read a scenario and build its world.
pub fn load(path: &Path) -> Result<Loaded, String> {
    build(read(path)?)
}

/// Build a world from a parsed scenario.
pub fn build(scenario: Scenario) -> Result<Loaded, String> {
    let mut catalog = Catalog::new();
    for item in scenario.items {
        catalog.add_item(item).map_err(|e| e.to_string())?;
    }
    for quest in scenario.quests {
        catalog.add_quest(quest).map_err(|e| e.to_string())?;
    }
    for achievement in scenario.achievements {
        catalog.add_achievement(achievement).map_err(|e| e.to_string())?;
    }
    catalog.validate().map_err(|e| e.to_string())?;
    let currency = &scenario.config.currency_item;
    if !currency.is_empty() && catalog.item(currency).is_err() {
        tracing::warn!(item = %currency, "currency item is not in the catalog");
    }

    let npc_defs = scenario
        .npcs
        .into_iter()
        .map(|spec| build_npc(spec, &catalog))
        .collect::<Result<Vec<_>, String>>()?;

    let mut world = World::new(scenario.config, catalog);
    let mut npcs = BTreeMap::new();
    for (npc, health, placement) in npc_defs {
        let name = npc.name().to_string();
        let id = world
            .spawn(Actor::npc(npc, health).at(placement))
            .map_err(|e| e.to_string())?;
        npcs.insert(name, id);
    }

    for zone in &scenario.zones {
        world.add_zone(zone);
    }
    for spec in scenario.spawners {
        let spawner = Spawner::new(
            spec.zone,
            spec.placement.into(),
            spec.max_actors,
            spec.interval,
            spec.creature,
        )
        .with_spawn_radius(spec.spawn_radius);
        world.add_spawner(spawner);
    }

    let mut players = BTreeMap::new();
    for spec in scenario.players {
        let (name, id) = spawn_player(&mut world, spec)?;
        players.insert(name, id);
    }

    Ok(Loaded {
        name: scenario.name,
        world,
        npcs,
        players,
    })
}

fn build_npc(spec: NpcSpec, catalog: &Catalog) -> Result<(Npc, i32, Placement), String> {
    let mut behavior = ScriptedBehavior::new();
    if let Some(ratio) = spec.sell_ratio {
        behavior = behavior.with_sell_ratio(ratio);
    }
    for item in &spec.shop {
        let item = catalog
            .item(item)
            .map_err(|e| format!("npc '{}': {e}", spec.name))?;
        behavior = behavior.selling(item);
    }
    for greeting in spec.greetings {
        let condition = match greeting.condition {
            ConditionSpec::NotStarted => QuestCondition::NotStarted,
            ConditionSpec::InProgress => QuestCondition::InProgress(greeting.quest_state),
            ConditionSpec::Completed => QuestCondition::Completed,
        };
        behavior = behavior.with_greeting(Greeting {
            quest: greeting.quest,
            condition,
            state: greeting.state,
        });
    }
    for effect in spec.effects {
        let resolved = resolve_effect(effect.effect, catalog)
            .map_err(|e| format!("npc '{}': {e}", spec.name))?;
        behavior = behavior.with_effect(effect.state, resolved);
    }

    let mut npc = Npc::new(spec.name).with_behavior(behavior);
    for state in &spec.states {
        npc.add_state(state.name.clone(), state.text.clone())
            .map_err(|e| e.to_string())?;
    }
    for state in spec.states {
        for transition in state.transitions {
            let added = match transition {
                TransitionSpec::Continue { text, target } => {
                    npc.add_transition(&state.name, text, target)
                }
                TransitionSpec::End { text } => npc.add_end_transition(&state.name, text),
                TransitionSpec::Shop { text } => npc.add_shop_transition(&state.name, text),
            };
            added.map_err(|e| e.to_string())?;
        }
    }
    Ok((npc, spec.health, spec.placement.into()))
}

fn resolve_effect(kind: EffectKind, catalog: &Catalog) -> Result<DialogueEffect, String> {
    let effect = match kind {
        EffectKind::GiveItem { item, count } => {
            DialogueEffect::GiveItem(catalog.item(&item).map_err(|e| e.to_string())?, count)
        }
        EffectKind::TakeItem { item, count } => {
            DialogueEffect::TakeItem(catalog.item(&item).map_err(|e| e.to_string())?, count)
        }
        EffectKind::StartQuest { quest } => {
            DialogueEffect::StartQuest(catalog.quest(&quest).map_err(|e| e.to_string())?)
        }
        EffectKind::AdvanceQuest { quest, to } => {
            let handle = catalog.quest(&quest).map_err(|e| e.to_string())?;
            if handle.state(&to).is_none() {
                return Err(format!("quest '{quest}' has no state '{to}'"));
            }
            DialogueEffect::AdvanceQuest(handle, to)
        }
        EffectKind::CompleteQuest { quest } => {
            DialogueEffect::CompleteQuest(catalog.quest(&quest).map_err(|e| e.to_string())?)
        }
        EffectKind::SetPickup { flag } => DialogueEffect::SetPickup(flag),
        EffectKind::Achieve { achievement } => DialogueEffect::Achieve(
            catalog
                .achievement(&achievement)
                .map_err(|e| e.to_string())?,
        ),
    };
    Ok(effect)
}

fn spawn_player(world: &mut World, spec: PlayerSpec) -> Result<(String, EntityId), String> {
    let name = spec.identity.name.clone();
    let catalog = world.catalog();

    let mut items = Vec::new();
    for stack in &spec.items {
        let item = catalog.item(&stack.item).map_err(|e| format!("player '{name}': {e}"))?;
        items.push((item, stack.count, stack.loaded));
    }
    let mut equipped = Vec::new();
    for (slot, item) in &spec.equipped {
        let item = catalog.item(item).map_err(|e| format!("player '{name}': {e}"))?;
        equipped.push((*slot, item));
    }
    let mut quests = Vec::new();
    for (quest, progress) in spec.quests {
        let handle = catalog.quest(&quest).map_err(|e| format!("player '{name}': {e}"))?;
        let progress = match progress {
            QuestSpec::NotStarted => QuestProgress::NotStarted,
            QuestSpec::InProgress { state, count } => QuestProgress::InProgress { state, count },
            QuestSpec::Completed => QuestProgress::Completed,
        };
        quests.push((handle, progress));
    }

    let mut player = world
        .new_player(spec.identity)
        .in_region(spec.region)
        .with_pvp(spec.pvp);
    player
        .set_initial_item_state(&items, &equipped, spec.current_slot)
        .map_err(|e| format!("player '{name}': {e}"))?;
    player
        .set_initial_quest_states(&quests, None)
        .map_err(|e| format!("player '{name}': {e}"))?;
    player.set_initial_pickup_state(spec.pickups);
    player.drain_events();

    let id = world
        .spawn(Actor::player(player))
        .map_err(|e| e.to_string())?;
    for zone in &spec.zones {
        world.enter_ai_zone(id, zone).map_err(|e| e.to_string())?;
    }
    Ok((name, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "name": "Hollow",
        "items": [
            { "name": "Coin", "max_count": 1000 },
            { "name": "Potion", "max_count": 10, "trade_value": 10 }
        ],
        "quests": [
            { "name": "Rats", "states": [{ "name": "Kill" }, { "name": "Return" }] }
        ],
        "npcs": [{
            "name": "Merchant",
            "shop": ["Potion"],
            "states": [
                { "name": "Greeting", "text": "Welcome!", "transitions": [
                    { "kind": "shop", "text": "Shop" },
                    { "kind": "continue", "text": "Work?", "target": "Job" },
                    { "kind": "end", "text": "Bye" }
                ]},
                { "name": "Job", "text": "Kill rats.", "transitions": [
                    { "kind": "end", "text": "Ok" }
                ]}
            ],
            "effects": [{ "state": "Job", "effect": "start_quest", "quest": "Rats" }]
        }],
        "spawners": [{ "zone": "Cellar", "max_actors": 2, "interval": 5.0,
                       "creature": { "blueprint": "Rat", "max_health": 10 } }],
        "players": [{ "name": "Ada", "items": [{ "item": "Coin", "count": 30 }],
                      "quests": { "Rats": { "status": "not_started" } } }]
    }"#;

    #[test]
    fn builds_world_from_json() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        let loaded = build(scenario).unwrap();
        assert_eq!(loaded.name, "Hollow");
        let ada = loaded.player(None).unwrap();
        assert_eq!(loaded.world.player(ada).unwrap().item_count("Coin"), 30);
        assert!(loaded.npc("Merchant").is_ok());
        assert!(loaded.world.zone("Cellar").is_some());
        assert_eq!(loaded.world.spawners().len(), 1);
    }

    #[test]
    fn dangling_dialogue_is_reported() {
        let json = SCENARIO.replace(r#""target": "Job""#, r#""target": "Nowhere""#);
        let scenario: Scenario = serde_json::from_str(&json).unwrap();
        let err = build(scenario).unwrap_err();
        assert!(err.contains("Nowhere"), "{err}");
    }

    #[test]
    fn unknown_shop_item_is_reported() {
        let json = SCENARIO.replace(r#""shop": ["Potion"]"#, r#""shop": ["Sword"]"#);
        let scenario: Scenario = serde_json::from_str(&json).unwrap();
        assert!(build(scenario).unwrap_err().contains("Merchant"));
    }
}
