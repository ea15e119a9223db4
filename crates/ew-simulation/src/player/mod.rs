//! Player session state.
//!
//! A [`Player`] composes inventory, quests, dialogue, PvP, region, chat and
//! circuit state, and queues every observable change as a [`SessionEvent`].
//! The queue is flushed to a transport as one batch per tick.

/// Circuit inputs and outputs.
pub mod circuit;
/// Outbound session events.
pub mod events;
/// Items, equipment and cooldowns.
pub mod inventory;
/// PvP flag reconciliation.
pub mod pvp;
/// Quest progression.
pub mod quest;

use std::collections::BTreeSet;
use std::sync::Arc;

use ew_core::{
    AchievementHandle, Catalog, EntityId, ItemHandle, QuestHandle, Transport, WriteStream,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::actor::ActorCore;
use crate::config::{FastTravelDestination, Placement, WorldConfig};
use crate::error::{ContentError, Rejection, SimResult};

pub use circuit::CircuitState;
pub use events::SessionEvent;
pub use inventory::{Cooldown, EQUIP_SLOTS, Inventory, ItemStack};
pub use pvp::{PvpSignal, PvpState};
pub use quest::{QuestLog, QuestProgress};

/// Who the player is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerIdentity {
    /// Persistent character id.
    pub character_id: u32,
    /// Character name.
    pub name: String,
    /// Team name; empty for no team.
    pub team: String,
    /// Avatar model index.
    pub avatar_index: u8,
    /// Avatar colours.
    pub colors: [u32; 4],
    /// Whether the player has admin rights.
    pub admin: bool,
}

impl PlayerIdentity {
    /// An identity with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the team.
    pub fn on_team(mut self, team: impl Into<String>) -> Self {
        self.team = team.into();
        self
    }
}

/// The NPC a player is talking to and where the conversation stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// The NPC.
    pub npc: EntityId,
    /// Current dialogue state, never empty.
    pub state: String,
    /// Whether the NPC's shop was opened in this conversation.
    pub shop_open: bool,
}

/// Session state of one connected player.
#[derive(Debug)]
pub struct Player {
    config: Arc<WorldConfig>,
    identity: PlayerIdentity,
    inventory: Inventory,
    quests: QuestLog,
    pickups: BTreeSet<String>,
    achievements: BTreeSet<String>,
    conversation: Option<Conversation>,
    pvp: PvpState,
    current_region: String,
    region_destination: Option<String>,
    ai_zones: BTreeSet<String>,
    circuits: CircuitState,
    mana: i32,
    mana_regen_timer: f32,
    health_regen_cooldown: f32,
    health_regen_timer: f32,
    last_hit: Option<(ItemHandle, f32)>,
    countdown: Option<i32>,
    items_dirty: bool,
    item_sync_timer: f32,
    chat_counter: u32,
    chat_decay_timer: f32,
    outbox: Vec<SessionEvent>,
}

impl Player {
    /// A fresh session with full mana.
    pub fn new(identity: PlayerIdentity, config: Arc<WorldConfig>) -> Self {
        Self {
            mana: config.max_mana,
            config,
            identity,
            inventory: Inventory::new(),
            quests: QuestLog::new(),
            pickups: BTreeSet::new(),
            achievements: BTreeSet::new(),
            conversation: None,
            pvp: PvpState::default(),
            current_region: String::new(),
            region_destination: None,
            ai_zones: BTreeSet::new(),
            circuits: CircuitState::default(),
            mana_regen_timer: 0.0,
            health_regen_cooldown: 0.0,
            health_regen_timer: 0.0,
            last_hit: None,
            countdown: None,
            items_dirty: false,
            item_sync_timer: 0.0,
            chat_counter: 0,
            chat_decay_timer: 0.0,
            outbox: Vec::new(),
        }
    }

    /// Start in `region`.
    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.current_region = region.into();
        self
    }

    /// Start with PvP already on or off.
    pub fn with_pvp(mut self, enabled: bool) -> Self {
        self.pvp.force(enabled);
        self
    }

    // -- identity --

    /// Shared tunables.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Identity record.
    pub fn identity(&self) -> &PlayerIdentity {
        &self.identity
    }

    /// Character name.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Team name.
    pub fn team(&self) -> &str {
        &self.identity.team
    }

    /// Whether the player has admin rights.
    pub fn is_admin(&self) -> bool {
        self.identity.admin
    }

    // -- outbound events --

    pub(crate) fn queue(&mut self, event: SessionEvent) {
        self.outbox.push(event);
    }

    /// Events queued since the last flush, oldest first.
    pub fn pending_events(&self) -> &[SessionEvent] {
        &self.outbox
    }

    /// Take every queued event without sending it.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Encode every queued event, in order, into one stream and hand it to
    /// `transport` as a single batch. Returns the number of events sent.
    pub fn flush(&mut self, transport: &mut dyn Transport) -> usize {
        if self.outbox.is_empty() {
            return 0;
        }
        let mut stream = WriteStream::new();
        for event in &self.outbox {
            event.encode(&mut stream);
        }
        stream.flush(transport);
        let sent = self.outbox.len();
        self.outbox.clear();
        sent
    }

    pub(crate) fn queue_state_change(&mut self, name: &str, value: bool) {
        self.queue(SessionEvent::StateChanged {
            name: name.to_string(),
            value,
        });
    }

    pub(crate) fn queue_trigger(&mut self, name: &str, source: Option<EntityId>) {
        self.queue(SessionEvent::Trigger {
            name: name.to_string(),
            source,
        });
    }

    // -- per tick --

    pub(crate) fn tick(&mut self, core: &mut ActorCore, dt: f32) {
        self.inventory.tick_cooldowns(dt);
        self.regenerate_mana(dt);
        self.regenerate_health(core, dt);

        if let Some((_, remaining)) = self.last_hit.as_mut() {
            *remaining -= dt;
        }
        if self.last_hit.as_ref().is_some_and(|(_, r)| *r <= 0.0) {
            self.last_hit = None;
        }

        for signal in self.pvp.tick(dt) {
            self.queue_pvp(signal);
        }
        self.decay_chat(dt);
        self.sync_items(dt);

        let window = self.config.circuit_sync_cooldown;
        for (key, bits) in self.circuits.tick(dt, window) {
            self.queue(SessionEvent::CircuitInputs { key, bits });
        }
    }

    fn regenerate_mana(&mut self, dt: f32) {
        let max = self.config.max_mana;
        let interval = self.config.mana_regen_interval;
        if self.mana >= max {
            self.mana_regen_timer = 0.0;
            return;
        }
        let before = self.mana;
        if interval <= 0.0 {
            self.mana = max;
        } else {
            self.mana_regen_timer += dt;
            while self.mana_regen_timer >= interval && self.mana < max {
                self.mana += 1;
                self.mana_regen_timer -= interval;
            }
        }
        if self.mana >= max {
            self.mana_regen_timer = 0.0;
        }
        if self.mana != before {
            self.queue(SessionEvent::Mana { mana: self.mana });
        }
    }

    fn regenerate_health(&mut self, core: &mut ActorCore, dt: f32) {
        if !core.is_alive() || core.health() >= core.max_health() {
            self.health_regen_timer = 0.0;
            return;
        }
        if self.health_regen_cooldown > 0.0 {
            self.health_regen_cooldown = (self.health_regen_cooldown - dt).max(0.0);
            return;
        }
        let interval = self.config.health_regen_interval;
        let mut restored = 0;
        if interval <= 0.0 {
            restored = core.heal(core.max_health());
        } else {
            self.health_regen_timer += dt;
            while self.health_regen_timer >= interval && core.health() < core.max_health() {
                restored += core.heal(1);
                self.health_regen_timer -= interval;
            }
        }
        if restored > 0 {
            self.queue(SessionEvent::Health {
                health: core.health(),
                max: core.max_health(),
            });
        }
    }

    fn decay_chat(&mut self, dt: f32) {
        if self.chat_counter == 0 {
            self.chat_decay_timer = 0.0;
            return;
        }
        let decay = self.config.chat_flood_decay;
        if decay <= 0.0 {
            self.chat_counter = 0;
            return;
        }
        self.chat_decay_timer += dt;
        while self.chat_decay_timer >= decay && self.chat_counter > 0 {
            self.chat_counter -= 1;
            self.chat_decay_timer -= decay;
        }
    }

    fn sync_items(&mut self, dt: f32) {
        if !self.items_dirty {
            return;
        }
        self.item_sync_timer += dt;
        if self.item_sync_timer < self.config.item_sync_interval {
            return;
        }
        self.item_sync_timer = 0.0;
        self.items_dirty = false;
        let items = self
            .inventory
            .iter()
            .map(|s| (s.item.name().to_string(), s.count, s.loaded_ammo))
            .collect();
        self.queue(SessionEvent::InventorySnapshot { items });
    }

    fn mark_items_dirty(&mut self) {
        if !self.items_dirty {
            self.items_dirty = true;
            self.item_sync_timer = 0.0;
        }
    }

    // -- health, death --

    pub(crate) fn on_damaged(&mut self, core: &ActorCore, item: Option<&ItemHandle>) {
        self.health_regen_cooldown = self.config.health_regen_delay;
        self.health_regen_timer = 0.0;
        if let Some(item) = item {
            self.last_hit = Some((item.clone(), self.config.last_hit_item_duration));
        }
        self.queue(SessionEvent::Health {
            health: core.health(),
            max: core.max_health(),
        });
    }

    pub(crate) fn on_killed(&mut self, killer: Option<EntityId>) {
        self.end_conversation();
        let item = self.last_hit_item().map(|i| i.name().to_string());
        self.queue(SessionEvent::Death { killer, item });
    }

    pub(crate) fn on_respawned(&mut self, placement: Placement) {
        self.health_regen_cooldown = 0.0;
        self.health_regen_timer = 0.0;
        self.last_hit = None;
        self.queue(SessionEvent::Respawn {
            position: placement.position,
            rotation: placement.rotation,
        });
    }

    /// Item that landed the most recent hit, while remembered.
    pub fn last_hit_item(&self) -> Option<&ItemHandle> {
        self.last_hit.as_ref().map(|(item, _)| item)
    }

    // -- mana --

    /// Current mana.
    pub fn mana(&self) -> i32 {
        self.mana
    }

    /// Spend mana. Returns `false` without spending if there is not enough.
    pub fn use_mana(&mut self, amount: i32) -> bool {
        if amount < 0 || self.mana < amount {
            return false;
        }
        self.mana -= amount;
        self.queue(SessionEvent::Mana { mana: self.mana });
        true
    }

    // -- inventory --

    /// The inventory.
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Owned stacks in item-name order.
    pub fn items(&self) -> impl Iterator<Item = &ItemStack> {
        self.inventory.iter()
    }

    /// Stack count of an item.
    pub fn item_count(&self, item: &str) -> u32 {
        self.inventory.count(item)
    }

    /// Rounds loaded in an item.
    pub fn loaded_ammo(&self, item: &str) -> u32 {
        self.inventory.loaded_ammo(item)
    }

    /// Add up to `count` items, capped at the stack limit. Returns whether
    /// anything was added. With `notify`, the arrival is announced.
    pub fn add_item(&mut self, item: &ItemHandle, count: u32, notify: bool) -> bool {
        let added = self.inventory.add(item, count);
        if added == 0 {
            debug!(player = %self.identity.name, item = %item, count, "add_item had no effect");
            return false;
        }
        self.queue(SessionEvent::ItemCount {
            item: item.name().to_string(),
            count: self.inventory.count(item.name()),
        });
        if notify {
            self.queue(SessionEvent::NewItem {
                item: item.name().to_string(),
                count: added,
            });
        }
        self.mark_items_dirty();
        true
    }

    /// Remove exactly `count` items. Fails without change if fewer are held.
    pub fn remove_item(&mut self, item: &ItemHandle, count: u32) -> bool {
        match self.inventory.remove(item, count) {
            Ok(cleared) => {
                if count == 0 {
                    return true;
                }
                self.queue(SessionEvent::ItemCount {
                    item: item.name().to_string(),
                    count: self.inventory.count(item.name()),
                });
                for slot in cleared {
                    self.queue(SessionEvent::Equip {
                        slot: slot as u8,
                        item: None,
                    });
                }
                self.mark_items_dirty();
                true
            }
            Err(rejection) => {
                debug!(player = %self.identity.name, %rejection, "remove_item rejected");
                false
            }
        }
    }

    /// Load rounds of `ammo` into `weapon`, bounded by its clip size.
    pub fn add_loaded_ammo(&mut self, weapon: &ItemHandle, ammo: &ItemHandle, count: u32) -> bool {
        if !self.inventory.add_loaded_ammo(weapon, ammo, count) {
            return false;
        }
        self.queue_loaded_ammo(weapon);
        true
    }

    /// Take rounds out of `weapon`'s clip.
    pub fn remove_loaded_ammo(&mut self, weapon: &ItemHandle, count: u32) -> bool {
        if !self.inventory.remove_loaded_ammo(weapon, count) {
            return false;
        }
        self.queue_loaded_ammo(weapon);
        true
    }

    fn queue_loaded_ammo(&mut self, weapon: &ItemHandle) {
        self.queue(SessionEvent::LoadedAmmo {
            item: weapon.name().to_string(),
            loaded: self.inventory.loaded_ammo(weapon.name()),
        });
        self.mark_items_dirty();
    }

    /// Put `item` into `slot`, or clear it with `None`.
    pub fn equip_item(&mut self, slot: usize, item: Option<&ItemHandle>) -> Result<(), Rejection> {
        self.inventory.equip(slot, item)?;
        self.queue(SessionEvent::Equip {
            slot: slot as u8,
            item: item.map(|i| i.name().to_string()),
        });
        Ok(())
    }

    /// Item in `slot`.
    pub fn item_for_slot(&self, slot: usize) -> Option<&ItemHandle> {
        self.inventory.item_for_slot(slot)
    }

    /// Select the active slot.
    pub fn set_current_slot(&mut self, slot: usize) -> Result<(), Rejection> {
        self.inventory.set_current_slot(slot)?;
        self.queue(SessionEvent::CurrentSlot { slot: slot as u8 });
        Ok(())
    }

    /// Active slot.
    pub fn current_slot(&self) -> usize {
        self.inventory.current_slot()
    }

    /// Item in the active slot.
    pub fn current_item(&self) -> Option<&ItemHandle> {
        self.inventory.current_item()
    }

    /// Start or overwrite a cooldown.
    pub fn set_item_cooldown(&mut self, item: &ItemHandle, seconds: f32, reload: bool) {
        self.inventory.set_cooldown(item.name(), seconds, reload);
        self.queue(SessionEvent::Cooldown {
            item: item.name().to_string(),
            seconds,
            reload,
        });
    }

    /// Whether an item is cooling down.
    pub fn is_item_on_cooldown(&self, item: &str) -> bool {
        self.inventory.is_on_cooldown(item)
    }

    /// Seconds of cooldown left.
    pub fn item_cooldown(&self, item: &str) -> f32 {
        self.inventory.cooldown(item)
    }

    // -- reload --

    fn reload_target(&self) -> Result<ItemHandle, Rejection> {
        let weapon = self.current_item().ok_or(Rejection::CannotReload)?;
        let ammo = weapon.ammo_type.as_deref().ok_or(Rejection::CannotReload)?;
        if self.inventory.loaded_ammo(weapon.name()) >= weapon.clip_size
            || self.inventory.count(ammo) == 0
        {
            return Err(Rejection::CannotReload);
        }
        if self.inventory.is_on_cooldown(weapon.name()) {
            return Err(Rejection::OnCooldown(weapon.name().to_string()));
        }
        Ok(weapon.clone())
    }

    /// Whether the current weapon can be reloaded now.
    pub fn can_reload(&self) -> bool {
        self.reload_target().is_ok()
    }

    pub(crate) fn begin_reload(&mut self) -> Result<(ItemHandle, f32), Rejection> {
        let weapon = self.reload_target()?;
        let seconds = weapon.reload_time.max(0.0);
        self.set_item_cooldown(&weapon, seconds, true);
        Ok((weapon, seconds))
    }

    /// Move as much ammo as fits from stock into `weapon`'s clip. Returns the
    /// number of rounds loaded.
    pub fn finish_reload(&mut self, weapon: &ItemHandle) -> u32 {
        if self.inventory.count(weapon.name()) == 0 {
            return 0;
        }
        let Some(ammo) = weapon
            .ammo_type
            .as_deref()
            .and_then(|name| self.inventory.stack(name))
            .map(|s| s.item.clone())
        else {
            return 0;
        };
        let room = weapon
            .clip_size
            .saturating_sub(self.inventory.loaded_ammo(weapon.name()));
        let rounds = room.min(self.inventory.count(ammo.name()));
        if rounds == 0 {
            return 0;
        }
        self.remove_item(&ammo, rounds);
        self.add_loaded_ammo(weapon, &ammo, rounds);
        rounds
    }

    // -- pickups, achievements --

    /// Whether a pickup flag is set.
    pub fn has_picked_up(&self, name: &str) -> bool {
        self.pickups.contains(name)
    }

    /// Set a pickup flag. Returns `false` if it was already set.
    pub fn mark_as_picked_up(&mut self, name: &str) -> bool {
        if !self.pickups.insert(name.to_string()) {
            return false;
        }
        self.queue(SessionEvent::PickedUp {
            name: name.to_string(),
        });
        true
    }

    /// Every pickup flag, sorted.
    pub fn pickups(&self) -> impl Iterator<Item = &str> {
        self.pickups.iter().map(String::as_str)
    }

    /// Award an achievement. Returns `false` if already earned.
    pub fn mark_as_achieved(&mut self, achievement: &AchievementHandle) -> bool {
        if !self.achievements.insert(achievement.name().to_string()) {
            return false;
        }
        info!(player = %self.identity.name, achievement = %achievement, "achievement earned");
        self.queue(SessionEvent::Achievement {
            name: achievement.name().to_string(),
        });
        true
    }

    /// Whether an achievement was earned.
    pub fn has_achieved(&self, name: &str) -> bool {
        self.achievements.contains(name)
    }

    // -- quests --

    /// Quest progress.
    pub fn quests(&self) -> &QuestLog {
        &self.quests
    }

    /// Progress of one quest.
    pub fn quest_progress(&self, quest: &str) -> QuestProgress {
        self.quests.progress(quest)
    }

    /// Whether a quest was started.
    pub fn is_quest_started(&self, quest: &str) -> bool {
        self.quests.is_started(quest)
    }

    /// Whether a quest was completed.
    pub fn is_quest_completed(&self, quest: &str) -> bool {
        self.quests.is_completed(quest)
    }

    /// Start a quest. Returns `false` if already started or completed.
    pub fn start_quest(&mut self, quest: &QuestHandle) -> bool {
        if !self.quests.start(quest) {
            return false;
        }
        let state = self
            .quests
            .progress(quest.name())
            .state()
            .unwrap_or_default()
            .to_string();
        self.queue(SessionEvent::QuestStarted {
            quest: quest.name().to_string(),
            state,
        });
        true
    }

    /// Move an in-progress quest to another state.
    pub fn advance_quest_to_state(&mut self, quest: &QuestHandle, state: &str) -> SimResult<()> {
        self.quests.advance(quest, state)?;
        self.queue(SessionEvent::QuestProgress {
            quest: quest.name().to_string(),
            state: state.to_string(),
            count: 0,
        });
        Ok(())
    }

    /// Overwrite the state-local counter of an in-progress quest.
    pub fn set_quest_count(&mut self, quest: &QuestHandle, count: u32) -> Result<(), Rejection> {
        self.quests.set_count(quest, count)?;
        let state = self
            .quests
            .progress(quest.name())
            .state()
            .unwrap_or_default()
            .to_string();
        self.queue(SessionEvent::QuestProgress {
            quest: quest.name().to_string(),
            state,
            count,
        });
        Ok(())
    }

    /// Complete an in-progress quest. Completing twice is a no-op.
    pub fn complete_quest(&mut self, quest: &QuestHandle) -> Result<bool, Rejection> {
        let completed = self.quests.complete(quest)?;
        if completed {
            info!(player = %self.identity.name, quest = %quest, "quest completed");
            self.queue(SessionEvent::QuestCompleted {
                quest: quest.name().to_string(),
            });
        }
        Ok(completed)
    }

    /// Change the tracked quest.
    pub fn set_current_quest(&mut self, quest: Option<&QuestHandle>) {
        self.quests.set_current(quest.cloned());
        self.queue(SessionEvent::CurrentQuest {
            quest: quest.map(|q| q.name().to_string()),
        });
    }

    /// The tracked quest.
    pub fn current_quest(&self) -> Option<&QuestHandle> {
        self.quests.current()
    }

    // -- dialogue --

    /// The current conversation.
    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// NPC being talked to.
    pub fn current_npc(&self) -> Option<EntityId> {
        self.conversation.as_ref().map(|c| c.npc)
    }

    /// Current dialogue state name.
    pub fn current_npc_state(&self) -> Option<&str> {
        self.conversation.as_ref().map(|c| c.state.as_str())
    }

    pub(crate) fn begin_conversation(&mut self, npc: EntityId, state: String) {
        self.conversation = Some(Conversation {
            npc,
            state,
            shop_open: false,
        });
    }

    pub(crate) fn set_dialogue_state(&mut self, state: String) {
        if let Some(conversation) = self.conversation.as_mut() {
            conversation.state = state;
        }
    }

    pub(crate) fn open_shop(&mut self) {
        if let Some(conversation) = self.conversation.as_mut() {
            conversation.shop_open = true;
            let npc = conversation.npc;
            self.queue(SessionEvent::ShopOpened { npc });
        }
    }

    /// End the conversation, returning the NPC that was being talked to.
    pub fn end_conversation(&mut self) -> Option<EntityId> {
        let conversation = self.conversation.take()?;
        self.queue(SessionEvent::DialogueEnded);
        Some(conversation.npc)
    }

    // -- shop --

    fn check_shop(&self, npc: EntityId) -> Result<(), Rejection> {
        match &self.conversation {
            Some(c) if c.npc == npc && c.shop_open => Ok(()),
            _ => Err(Rejection::ShopNotOpen(npc)),
        }
    }

    /// Buy `count` of `item` at `unit_price` each, paid in `currency`.
    /// All or nothing.
    pub(crate) fn buy(
        &mut self,
        npc: EntityId,
        item: &ItemHandle,
        count: u32,
        unit_price: u32,
        currency: &ItemHandle,
    ) -> Result<u32, Rejection> {
        self.check_shop(npc)?;
        let cost = unit_price.saturating_mul(count);
        let funds = self.inventory.count(currency.name());
        if funds < cost {
            return Err(Rejection::InsufficientItems {
                item: currency.name().to_string(),
                have: funds,
                need: cost,
            });
        }
        let room = item.max_count.saturating_sub(self.inventory.count(item.name()));
        if room < count {
            return Err(Rejection::InventoryFull {
                item: item.name().to_string(),
                count: count - room,
            });
        }
        if cost > 0 {
            self.remove_item(currency, cost);
        }
        self.add_item(item, count, true);
        Ok(cost)
    }

    /// Sell `count` of `item` at `unit_price` each, paid in `currency`.
    /// All or nothing.
    pub(crate) fn sell(
        &mut self,
        npc: EntityId,
        item: &ItemHandle,
        count: u32,
        unit_price: u32,
        currency: &ItemHandle,
    ) -> Result<u32, Rejection> {
        self.check_shop(npc)?;
        let have = self.inventory.count(item.name());
        if have < count {
            return Err(Rejection::InsufficientItems {
                item: item.name().to_string(),
                have,
                need: count,
            });
        }
        let proceeds = unit_price.saturating_mul(count);
        let room = currency
            .max_count
            .saturating_sub(self.inventory.count(currency.name()));
        if room < proceeds {
            return Err(Rejection::InventoryFull {
                item: currency.name().to_string(),
                count: proceeds - room,
            });
        }
        self.remove_item(item, count);
        if proceeds > 0 {
            self.add_item(currency, proceeds, false);
        }
        Ok(proceeds)
    }

    // -- zones --

    /// Record entering an AI zone. Returns `false` if already inside.
    pub fn enter_ai_zone(&mut self, zone: &str) -> bool {
        self.ai_zones.insert(zone.to_string())
    }

    /// Record leaving an AI zone. Returns `false` if not inside.
    pub fn exit_ai_zone(&mut self, zone: &str) -> bool {
        self.ai_zones.remove(zone)
    }

    /// Whether the player is inside a zone.
    pub fn is_in_ai_zone(&self, zone: &str) -> bool {
        self.ai_zones.contains(zone)
    }

    /// Zones the player is inside, sorted.
    pub fn ai_zones(&self) -> impl Iterator<Item = &str> {
        self.ai_zones.iter().map(String::as_str)
    }

    // -- countdown --

    /// Show a countdown.
    pub fn update_countdown(&mut self, seconds: i32) {
        self.countdown = Some(seconds);
        self.queue(SessionEvent::Countdown {
            seconds: Some(seconds),
        });
    }

    /// Hide the countdown.
    pub fn hide_countdown(&mut self) {
        self.countdown = None;
        self.queue(SessionEvent::Countdown { seconds: None });
    }

    /// Countdown shown, if any.
    pub fn countdown(&self) -> Option<i32> {
        self.countdown
    }

    // -- pvp --

    /// Whether PvP is in effect.
    pub fn is_pvp_enabled(&self) -> bool {
        self.pvp.is_enabled()
    }

    /// What the player asked for.
    pub fn is_pvp_desired(&self) -> bool {
        self.pvp.is_desired()
    }

    /// Seconds until a pending PvP change takes effect.
    pub fn pvp_change_remaining(&self) -> f32 {
        self.pvp.remaining()
    }

    /// Ask for PvP on or off. The change takes effect after the configured
    /// delay. Returns `false` when it matches the current request.
    pub fn set_pvp_desired(&mut self, desired: bool) -> bool {
        let delay = self.config.pvp_change_delay;
        let Some(signal) = self.pvp.request(desired, delay) else {
            return false;
        };
        self.queue_pvp(signal);
        true
    }

    fn queue_pvp(&mut self, signal: PvpSignal) {
        let event = match signal {
            PvpSignal::Countdown { active, seconds } => SessionEvent::PvpCountdown { active, seconds },
            PvpSignal::Enabled(enabled) => {
                info!(player = %self.identity.name, enabled, "pvp changed");
                SessionEvent::PvpEnabled { enabled }
            }
        };
        self.queue(event);
    }

    // -- regions, travel --

    /// Region the player is in.
    pub fn current_region(&self) -> &str {
        &self.current_region
    }

    /// Whether a region transition is in flight.
    pub fn is_changing_region(&self) -> bool {
        self.region_destination.is_some()
    }

    /// Target of the in-flight transition.
    pub fn region_destination(&self) -> Option<&str> {
        self.region_destination.as_deref()
    }

    /// Start a transition to `region`.
    pub fn enter_region(&mut self, region: &str) -> Result<(), Rejection> {
        if self.region_destination.is_some() {
            return Err(Rejection::RegionChangeInProgress);
        }
        if region == self.current_region {
            return Err(Rejection::AlreadyInRegion(region.to_string()));
        }
        info!(player = %self.identity.name, region, "region change started");
        self.region_destination = Some(region.to_string());
        self.queue(SessionEvent::RegionChange {
            destination: region.to_string(),
        });
        Ok(())
    }

    /// Finish a transition: the player is now in `region`.
    pub fn on_travel_complete(&mut self, region: &str) {
        self.current_region = region.to_string();
        self.region_destination = None;
    }

    /// Fast-travel destinations unlocked by pickup flags, excluding `origin`.
    pub fn fast_travel_destinations(&self, origin: &str) -> Vec<&FastTravelDestination> {
        self.config
            .fast_travel
            .iter()
            .filter(|d| d.region != origin && self.has_picked_up(&d.unlock_flag))
            .collect()
    }

    /// Travel from `origin` to an unlocked destination region.
    pub fn fast_travel(&mut self, origin: &str, destination: &str) -> Result<(), Rejection> {
        let unlocked = self
            .fast_travel_destinations(origin)
            .iter()
            .any(|d| d.region == destination);
        if !unlocked {
            return Err(Rejection::UnknownDestination(destination.to_string()));
        }
        self.enter_region(destination)
    }

    pub(crate) fn teleport_to(&mut self, destination: &str) -> Result<Placement, Rejection> {
        let placement = *self
            .config
            .teleport_destinations
            .get(destination)
            .ok_or_else(|| Rejection::UnknownDestination(destination.to_string()))?;
        self.queue(SessionEvent::Teleported {
            position: placement.position,
            rotation: placement.rotation,
        });
        Ok(placement)
    }

    // -- chat --

    /// Validate an outgoing chat message against length and flood limits.
    /// Returns the trimmed text to broadcast.
    pub fn chat(&mut self, text: &str) -> Result<String, Rejection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Rejection::ChatRejected("empty message"));
        }
        if text.len() > self.config.max_chat_length {
            return Err(Rejection::ChatRejected("message too long"));
        }
        if self.chat_counter >= self.config.chat_flood_limit {
            return Err(Rejection::ChatRejected("sending too fast"));
        }
        self.chat_counter += 1;
        Ok(text.to_string())
    }

    /// Queue a chat line from another player.
    pub fn receive_chat(&mut self, sender: &str, sender_team: &str, text: &str) {
        let same_team = !sender_team.is_empty() && sender_team == self.identity.team;
        self.queue(SessionEvent::Chat {
            sender: sender.to_string(),
            same_team,
            text: text.to_string(),
        });
    }

    /// Queue a kill notice.
    pub fn receive_kill_message(&mut self, killer: &str, victim: &str, item: Option<&ItemHandle>) {
        self.queue(SessionEvent::PlayerKill {
            killer: killer.to_string(),
            victim: victim.to_string(),
            item: item.map(|i| i.name().to_string()),
        });
    }

    // -- dlc --

    /// Redeem a key for its configured item. Each key works once.
    pub fn submit_dlc_key(&mut self, key: &str, catalog: &Catalog) -> SimResult<ItemHandle> {
        let flag = format!("dlc:{key}");
        if self.has_picked_up(&flag) {
            return Err(Rejection::InvalidKey.into());
        }
        let Some(item_name) = self.config.dlc_keys.get(key).cloned() else {
            return Err(Rejection::InvalidKey.into());
        };
        let item = catalog
            .item(&item_name)
            .map_err(|_| ContentError::UnknownContent(item_name).report())?;
        self.add_item(&item, 1, true);
        self.mark_as_picked_up(&flag);
        Ok(item)
    }

    // -- circuits --

    /// Input bits for a circuit key.
    pub fn circuit_inputs(&self, key: &str) -> u32 {
        self.circuits.inputs(key)
    }

    /// Store input bits; changes are synced after the cooldown window.
    pub fn set_circuit_inputs(&mut self, key: &str, bits: u32) -> bool {
        self.circuits.set_inputs(key, bits)
    }

    /// Output values for a key, padded or truncated to `count`.
    pub fn circuit_outputs(&self, key: &str, count: usize) -> Vec<bool> {
        self.circuits.outputs(key, count)
    }

    /// Store output values and sync them immediately when they change.
    pub fn set_circuit_outputs(&mut self, key: &str, values: Vec<bool>) -> bool {
        if !self.circuits.set_outputs(key, values.clone()) {
            return false;
        }
        self.queue(SessionEvent::CircuitOutputs {
            key: key.to_string(),
            values,
        });
        true
    }

    // -- loading --

    /// Replace the inventory with saved stacks `(item, count, loaded)`,
    /// equipment `(slot, item)` and the active slot.
    pub fn set_initial_item_state(
        &mut self,
        items: &[(ItemHandle, u32, u32)],
        equipped: &[(usize, ItemHandle)],
        current_slot: usize,
    ) -> Result<(), Rejection> {
        let mut inventory = Inventory::new();
        for (item, count, loaded) in items {
            inventory.add(item, *count);
            inventory.set_loaded_ammo(item.name(), *loaded);
        }
        for (slot, item) in equipped {
            inventory.equip(*slot, Some(item))?;
        }
        inventory.set_current_slot(current_slot)?;
        self.inventory = inventory;
        self.mark_items_dirty();
        Ok(())
    }

    /// Replace quest progress with saved states. In-progress states must be
    /// defined by their quest.
    pub fn set_initial_quest_states(
        &mut self,
        quests: &[(QuestHandle, QuestProgress)],
        current: Option<&QuestHandle>,
    ) -> SimResult<()> {
        for (quest, progress) in quests {
            if let Some(state) = progress.state()
                && quest.state(state).is_none()
            {
                return Err(ContentError::UnknownQuestState {
                    quest: quest.name().to_string(),
                    state: state.to_string(),
                }
                .report());
            }
        }
        let mut log = QuestLog::new();
        for (quest, progress) in quests {
            log.restore(quest, progress.clone());
        }
        log.set_current(current.cloned());
        self.quests = log;
        Ok(())
    }

    /// Replace the pickup flags.
    pub fn set_initial_pickup_state<I, S>(&mut self, flags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pickups = flags.into_iter().map(Into::into).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ew_core::{ItemDef, MemoryTransport, QuestDef};

    fn config() -> WorldConfig {
        WorldConfig::default()
    }

    fn player_with(config: WorldConfig) -> Player {
        Player::new(PlayerIdentity::named("Ada").on_team("Red"), Arc::new(config))
    }

    fn player() -> Player {
        player_with(config())
    }

    fn core() -> ActorCore {
        ActorCore::new("Player", 100)
    }

    fn potion() -> ItemHandle {
        ItemDef::new("HealthPotion").with_max_count(10).into_handle()
    }

    fn pistol() -> ItemHandle {
        ItemDef::new("Pistol")
            .equippable()
            .with_ammo("PistolAmmo", 6)
            .with_reload_time(1.0)
            .into_handle()
    }

    fn ammo() -> ItemHandle {
        ItemDef::new("PistolAmmo").with_max_count(100).into_handle()
    }

    #[test]
    fn potion_scenario() {
        let mut ada = player();
        assert!(ada.add_item(&potion(), 3, true));
        assert_eq!(ada.item_count("HealthPotion"), 3);
        assert!(!ada.remove_item(&potion(), 5));
        assert_eq!(ada.item_count("HealthPotion"), 3);
        assert_eq!(
            ada.pending_events(),
            &[
                SessionEvent::ItemCount {
                    item: "HealthPotion".into(),
                    count: 3
                },
                SessionEvent::NewItem {
                    item: "HealthPotion".into(),
                    count: 3
                },
            ]
        );
    }

    #[test]
    fn add_at_cap_returns_false() {
        let mut ada = player();
        assert!(ada.add_item(&potion(), 10, false));
        assert!(!ada.add_item(&potion(), 1, false));
    }

    #[test]
    fn remove_last_queues_unequip() {
        let mut ada = player();
        ada.add_item(&pistol(), 1, false);
        ada.equip_item(0, Some(&pistol())).unwrap();
        ada.drain_events();
        assert!(ada.remove_item(&pistol(), 1));
        assert!(ada.pending_events().contains(&SessionEvent::Equip { slot: 0, item: None }));
    }

    #[test]
    fn flush_sends_one_batch_in_order() {
        let mut ada = player();
        ada.add_item(&potion(), 1, false);
        ada.update_countdown(3);
        let mut transport = MemoryTransport::new();
        assert_eq!(ada.flush(&mut transport), 2);
        assert_eq!(transport.batches.len(), 1);
        let batch = &transport.batches[0];
        assert_eq!(&batch[..2], b"ic");
        assert_eq!(ada.flush(&mut transport), 0);
        assert_eq!(transport.batches.len(), 1);
    }

    #[test]
    fn mana_spend_and_regen() {
        let mut ada = player_with(config().with_mana(10, 0.5));
        let mut core = core();
        assert!(ada.use_mana(4));
        assert!(!ada.use_mana(7));
        assert_eq!(ada.mana(), 6);
        ada.tick(&mut core, 1.0);
        assert_eq!(ada.mana(), 8);
        ada.tick(&mut core, 5.0);
        assert_eq!(ada.mana(), 10);
    }

    #[test]
    fn health_regen_waits_after_damage() {
        let mut ada = player_with(config().with_health_regen(2.0, 0.5));
        let mut core = core();
        core.set_health(90);
        ada.on_damaged(&core, Some(&pistol()));
        assert_eq!(ada.last_hit_item().map(ItemHandle::name), Some("Pistol"));

        ada.tick(&mut core, 1.0);
        ada.tick(&mut core, 1.0);
        assert_eq!(core.health(), 90);
        ada.tick(&mut core, 1.0);
        assert_eq!(core.health(), 92);
    }

    #[test]
    fn last_hit_item_expires() {
        let mut ada = player();
        let mut core = core();
        ada.on_damaged(&core, Some(&pistol()));
        ada.tick(&mut core, 4.0);
        assert!(ada.last_hit_item().is_some());
        ada.tick(&mut core, 1.0);
        assert!(ada.last_hit_item().is_none());
    }

    #[test]
    fn reload_moves_ammo_into_clip() {
        let mut ada = player();
        ada.add_item(&pistol(), 1, false);
        ada.add_item(&ammo(), 4, false);
        ada.equip_item(0, Some(&pistol())).unwrap();
        ada.set_current_slot(0).unwrap();
        assert!(ada.can_reload());

        let (weapon, seconds) = ada.begin_reload().unwrap();
        assert_eq!(seconds, 1.0);
        assert!(ada.is_item_on_cooldown("Pistol"));
        assert!(!ada.can_reload());

        assert_eq!(ada.finish_reload(&weapon), 4);
        assert_eq!(ada.loaded_ammo("Pistol"), 4);
        assert_eq!(ada.item_count("PistolAmmo"), 0);
    }

    #[test]
    fn reload_needs_weapon_and_stock() {
        let mut ada = player();
        assert!(!ada.can_reload());
        ada.add_item(&pistol(), 1, false);
        ada.equip_item(0, Some(&pistol())).unwrap();
        assert_eq!(ada.begin_reload().unwrap_err(), Rejection::CannotReload);
    }

    #[test]
    fn inventory_snapshot_after_sync_interval() {
        let mut ada = player();
        let mut core = core();
        ada.add_item(&potion(), 2, false);
        ada.drain_events();
        ada.tick(&mut core, 0.5);
        assert!(ada.pending_events().is_empty());
        ada.tick(&mut core, 0.5);
        assert_eq!(
            ada.drain_events(),
            vec![SessionEvent::InventorySnapshot {
                items: vec![("HealthPotion".into(), 2, 0)]
            }]
        );
        ada.tick(&mut core, 5.0);
        assert!(ada.pending_events().is_empty());
    }

    #[test]
    fn quest_events_follow_progress() {
        let quest = QuestDef::new("Rats", ["Kill", "Return"]).into_handle();
        let mut ada = player();
        assert!(ada.advance_quest_to_state(&quest, "Return").is_err());
        assert!(ada.start_quest(&quest));
        ada.set_quest_count(&quest, 3).unwrap();
        ada.advance_quest_to_state(&quest, "Return").unwrap();
        assert_eq!(ada.complete_quest(&quest), Ok(true));
        assert_eq!(ada.complete_quest(&quest), Ok(false));
        let events = ada.drain_events();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], SessionEvent::QuestStarted { .. }));
        assert!(matches!(events[3], SessionEvent::QuestCompleted { .. }));
    }

    #[test]
    fn pvp_change_is_delayed() {
        let mut ada = player_with(config().with_pvp_change_delay(2.0));
        let mut core = core();
        assert!(ada.set_pvp_desired(true));
        assert!(!ada.set_pvp_desired(true));
        ada.tick(&mut core, 1.0);
        assert!(!ada.is_pvp_enabled());
        ada.tick(&mut core, 1.0);
        assert!(ada.is_pvp_enabled());
        assert!(ada.pending_events().contains(&SessionEvent::PvpEnabled { enabled: true }));
    }

    #[test]
    fn region_change_is_exclusive() {
        let mut ada = player().in_region("Town");
        assert_eq!(
            ada.enter_region("Town"),
            Err(Rejection::AlreadyInRegion("Town".into()))
        );
        ada.enter_region("Cave").unwrap();
        assert_eq!(ada.enter_region("Forest"), Err(Rejection::RegionChangeInProgress));
        ada.on_travel_complete("Cave");
        assert_eq!(ada.current_region(), "Cave");
        assert!(!ada.is_changing_region());
    }

    #[test]
    fn fast_travel_requires_unlock() {
        let config = config()
            .with_fast_travel(FastTravelDestination::new("Town", "FT_Town"))
            .with_fast_travel(FastTravelDestination::new("Cave", "FT_Cave"));
        let mut ada = player_with(config).in_region("Town");
        assert!(ada.fast_travel_destinations("Town").is_empty());
        assert!(ada.fast_travel("Town", "Cave").is_err());

        ada.mark_as_picked_up("FT_Town");
        ada.mark_as_picked_up("FT_Cave");
        let regions: Vec<_> = ada
            .fast_travel_destinations("Town")
            .iter()
            .map(|d| d.region.as_str())
            .collect();
        assert_eq!(regions, vec!["Cave"]);
        ada.fast_travel("Town", "Cave").unwrap();
        assert_eq!(ada.region_destination(), Some("Cave"));
    }

    #[test]
    fn chat_flood_control() {
        let mut ada = player_with(config().with_chat_flood(2, 1.0));
        let mut core = core();
        assert_eq!(ada.chat("  hi  "), Ok("hi".to_string()));
        assert!(ada.chat("again").is_ok());
        assert!(ada.chat("third").is_err());
        assert!(ada.chat("   ").is_err());
        ada.tick(&mut core, 1.0);
        assert!(ada.chat("ok now").is_ok());
        assert!(ada.chat(&"x".repeat(300)).is_err());
    }

    #[test]
    fn chat_team_flag() {
        let mut ada = player();
        ada.receive_chat("Bob", "Red", "hello");
        ada.receive_chat("Eve", "", "hello");
        let events = ada.drain_events();
        assert!(matches!(events[0], SessionEvent::Chat { same_team: true, .. }));
        assert!(matches!(events[1], SessionEvent::Chat { same_team: false, .. }));
    }

    #[test]
    fn dlc_key_redeems_once() {
        let mut catalog = Catalog::new();
        catalog.add_item(ItemDef::new("GoldenPistol")).unwrap();
        let mut ada = player_with(config().with_dlc_key("KEY-1", "GoldenPistol").with_dlc_key("KEY-2", "Missing"));
        assert_eq!(ada.submit_dlc_key("KEY-1", &catalog).unwrap().name(), "GoldenPistol");
        assert_eq!(ada.item_count("GoldenPistol"), 1);
        assert!(ada.submit_dlc_key("KEY-1", &catalog).is_err());
        assert!(ada.submit_dlc_key("NOPE", &catalog).is_err());
        assert!(ada.submit_dlc_key("KEY-2", &catalog).unwrap_err().is_content_defect());
    }

    #[test]
    fn achievements_fire_once() {
        let achievement = ew_core::AchievementDef::new("FirstBlood").into_handle();
        let mut ada = player();
        assert!(ada.mark_as_achieved(&achievement));
        assert!(!ada.mark_as_achieved(&achievement));
        assert!(ada.has_achieved("FirstBlood"));
        assert_eq!(ada.drain_events().len(), 1);
    }

    #[test]
    fn circuit_inputs_sync_through_tick() {
        let mut ada = player();
        let mut core = core();
        ada.set_circuit_inputs("door", 5);
        ada.tick(&mut core, 0.0);
        assert!(ada.pending_events().contains(&SessionEvent::CircuitInputs {
            key: "door".into(),
            bits: 5
        }));
        assert!(ada.set_circuit_outputs("door", vec![true]));
        assert!(!ada.set_circuit_outputs("door", vec![true]));
        assert_eq!(ada.circuit_outputs("door", 2), vec![true, false]);
    }

    #[test]
    fn initial_state_loaders() {
        let quest = QuestDef::new("Rats", ["Kill", "Return"]).into_handle();
        let mut ada = player();
        ada.set_initial_item_state(&[(pistol(), 1, 3), (ammo(), 10, 0)], &[(2, pistol())], 2)
            .unwrap();
        assert_eq!(ada.loaded_ammo("Pistol"), 3);
        assert_eq!(ada.current_item().map(ItemHandle::name), Some("Pistol"));

        let bad = [(
            quest.clone(),
            QuestProgress::InProgress {
                state: "Nowhere".into(),
                count: 0,
            },
        )];
        assert!(ada.set_initial_quest_states(&bad, None).unwrap_err().is_content_defect());
        let good = [(
            quest.clone(),
            QuestProgress::InProgress {
                state: "Return".into(),
                count: 2,
            },
        )];
        ada.set_initial_quest_states(&good, Some(&quest)).unwrap();
        assert_eq!(ada.quest_progress("Rats").state(), Some("Return"));
        assert_eq!(ada.current_quest().map(QuestHandle::name), Some("Rats"));

        ada.set_initial_pickup_state(["a", "b"]);
        assert_eq!(ada.pickups().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn shop_requires_open_shop() {
        let coin = ItemDef::new("Coin").with_max_count(1000).into_handle();
        let mut ada = player();
        ada.add_item(&coin, 50, false);
        let npc = EntityId(7);
        assert_eq!(
            ada.buy(npc, &potion(), 1, 10, &coin),
            Err(Rejection::ShopNotOpen(npc))
        );
        ada.begin_conversation(npc, "Greeting".into());
        ada.open_shop();
        assert_eq!(ada.buy(npc, &potion(), 3, 10, &coin), Ok(30));
        assert_eq!(ada.item_count("Coin"), 20);
        assert!(ada.buy(npc, &potion(), 3, 10, &coin).is_err());
        assert_eq!(ada.item_count("HealthPotion"), 3);
        assert_eq!(ada.sell(npc, &potion(), 2, 5, &coin), Ok(10));
        assert_eq!(ada.item_count("Coin"), 30);
        assert_eq!(ada.item_count("HealthPotion"), 1);
    }
}
