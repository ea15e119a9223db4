use std::collections::BTreeMap;
use std::sync::Arc;

use ew_core::{
    Catalog, DamageType, EntityId, IdAllocator, ItemHandle, Presentation, Transport,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::actor::{Actor, DamageOutcome};
use crate::config::{Placement, WorldConfig};
use crate::error::{ContentError, Rejection, SimResult};
use crate::event::{EventLog, WorldEvent, WorldEventKind};
use crate::npc::TransitionKind;
use crate::player::{Player, PlayerIdentity, SessionEvent};
use crate::spawner::{Spawner, SpawnerId};
use crate::zone::{AIZone, ZoneSignal};

/// The authoritative world.
///
/// Owns every actor, zone and spawner plus the event log and RNG. There is
/// no global registry: every operation names the actors it touches by id,
/// and links between actors are plain ids that are cleared when the target
/// is destroyed.
pub struct World {
    config: Arc<WorldConfig>,
    catalog: Catalog,
    ids: IdAllocator,
    actors: BTreeMap<EntityId, Actor>,
    zones: BTreeMap<String, AIZone>,
    spawners: Vec<Spawner>,
    transports: BTreeMap<EntityId, Box<dyn Transport>>,
    events: EventLog,
    rng: StdRng,
    pending_destroy: Vec<EntityId>,
    tick: u64,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick)
            .field("actors", &self.actors.len())
            .field("zones", &self.zones.len())
            .field("spawners", &self.spawners.len())
            .field("events", &self.events.len())
            .finish()
    }
}

impl World {
    /// Create an empty world.
    pub fn new(config: WorldConfig, catalog: Catalog) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let events = EventLog::new(config.max_events);
        Self {
            config: Arc::new(config),
            catalog,
            ids: IdAllocator::new(),
            actors: BTreeMap::new(),
            zones: BTreeMap::new(),
            spawners: Vec::new(),
            transports: BTreeMap::new(),
            events,
            rng,
            pending_destroy: Vec::new(),
            tick: 0,
        }
    }

    // -- accessors --

    /// Shared tunables.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Content lookups.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// A player session that shares this world's config.
    pub fn new_player(&self, identity: PlayerIdentity) -> Player {
        Player::new(identity, Arc::clone(&self.config))
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Recorded world events.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Look up an actor.
    pub fn actor(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Look up an actor mutably.
    pub fn actor_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    /// Every actor in id order.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    /// Number of live actors.
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Look up a player session.
    pub fn player(&self, id: EntityId) -> Option<&Player> {
        self.actors.get(&id).and_then(Actor::as_player)
    }

    /// Look up a player session mutably.
    pub fn player_mut(&mut self, id: EntityId) -> Option<&mut Player> {
        self.actors.get_mut(&id).and_then(Actor::as_player_mut)
    }

    /// A zone by name.
    pub fn zone(&self, name: &str) -> Option<&AIZone> {
        self.zones.get(name)
    }

    /// Every zone, sorted by name.
    pub fn zones(&self) -> impl Iterator<Item = &AIZone> {
        self.zones.values()
    }

    /// A spawner by id.
    pub fn spawner(&self, id: SpawnerId) -> Option<&Spawner> {
        self.spawners.get(id.0)
    }

    /// Every spawner in registration order.
    pub fn spawners(&self) -> &[Spawner] {
        &self.spawners
    }

    fn record(&mut self, kind: WorldEventKind, description: impl Into<String>) {
        self.events.push(WorldEvent::new(self.tick, kind, description));
    }

    fn actor_or_reject(&self, id: EntityId) -> Result<&Actor, Rejection> {
        self.actors.get(&id).ok_or(Rejection::ActorNotFound(id))
    }

    fn player_or_reject(&mut self, id: EntityId) -> Result<&mut Player, Rejection> {
        let actor = self
            .actors
            .get_mut(&id)
            .ok_or(Rejection::ActorNotFound(id))?;
        actor.as_player_mut().ok_or(Rejection::NotAPlayer(id))
    }

    // -- lifecycle --

    /// Add an actor and assign its id. NPC dialogue graphs are validated
    /// first.
    pub fn spawn(&mut self, mut actor: Actor) -> SimResult<EntityId> {
        if let Some(npc) = actor.as_npc() {
            npc.validate().map_err(ContentError::report)?;
        }
        let id = self.ids.allocate();
        actor.core_mut().set_id(id);
        let blueprint = actor.core().blueprint_name().to_string();
        info!(entity = %id, blueprint = %blueprint, "spawned");
        self.record(
            WorldEventKind::Spawned {
                entity: id,
                blueprint: blueprint.clone(),
            },
            format!("{blueprint} spawned as {id}"),
        );
        self.actors.insert(id, actor);
        Ok(id)
    }

    /// Bind a presentation and add the actor.
    pub fn spawn_with_presentation(
        &mut self,
        mut actor: Actor,
        presentation: Box<dyn Presentation>,
    ) -> SimResult<EntityId> {
        actor.core_mut().bind_presentation(presentation);
        self.spawn(actor)
    }

    /// Route a player's outbound events to `transport` at the end of each tick.
    pub fn attach_transport(
        &mut self,
        player: EntityId,
        transport: Box<dyn Transport>,
    ) -> Result<(), Rejection> {
        self.player_or_reject(player)?;
        self.transports.insert(player, transport);
        Ok(())
    }

    /// Destroy an actor at the end of the current or next tick.
    pub fn queue_destroy(&mut self, id: EntityId) {
        if !self.pending_destroy.contains(&id) {
            self.pending_destroy.push(id);
        }
    }

    /// Remove an actor now and invalidate every link to it.
    pub fn destroy(&mut self, id: EntityId) -> Result<(), Rejection> {
        let mut actor = self
            .actors
            .remove(&id)
            .ok_or(Rejection::ActorNotFound(id))?;

        if let Some(player) = actor.as_player_mut() {
            if let Some(transport) = self.transports.get_mut(&id) {
                player.flush(transport.as_mut());
            }
            let zones: Vec<String> = player.ai_zones().map(str::to_string).collect();
            for zone in zones {
                player.exit_ai_zone(&zone);
                self.leave_zone(&zone);
            }
        }
        self.transports.remove(&id);

        for other in self.actors.values_mut() {
            if other.core().owner() == Some(id) {
                other.core_mut().set_owner(None);
            }
        }
        self.end_conversations_with(id);

        if let Some(spawner) = actor.core().spawner()
            && let Some(s) = self.spawners.get_mut(spawner.0)
        {
            s.remove_actor(id);
        }
        actor.core_mut().release_presentation();

        info!(entity = %id, "destroyed");
        self.record(
            WorldEventKind::Destroyed { entity: id },
            format!("{} {id} destroyed", actor.core().blueprint_name()),
        );
        Ok(())
    }

    // -- tick --

    /// Advance the world by `dt` seconds.
    ///
    /// Actors tick in id order, then spawners in registration order. Actors
    /// that asked to be removed and queued destroys are processed next.
    /// Finally every player with a transport flushes its events as one batch.
    pub fn tick(&mut self, dt: f32) {
        self.tick += 1;

        let ids: Vec<EntityId> = self.actors.keys().copied().collect();
        for id in ids {
            if let Some(actor) = self.actors.get_mut(&id) {
                actor.tick(dt);
            }
        }

        for index in 0..self.spawners.len() {
            if !self.spawners[index].tick(dt) {
                continue;
            }
            let spawner = SpawnerId(index);
            let mut actor = self.spawners[index].spawn(&mut self.rng);
            actor.core_mut().set_spawner(Some(spawner));
            match self.spawn(actor) {
                Ok(entity) => {
                    self.spawners[index].track(entity);
                    self.record(
                        WorldEventKind::SpawnerSpawned { spawner, entity },
                        format!("{spawner} produced {entity}"),
                    );
                }
                Err(err) => warn!(%spawner, error = %err, "spawn failed"),
            }
        }

        for actor in self.actors.values() {
            if actor.core().is_removal_requested() && !self.pending_destroy.contains(&actor.id()) {
                self.pending_destroy.push(actor.id());
            }
        }
        for id in std::mem::take(&mut self.pending_destroy) {
            if let Err(rejection) = self.destroy(id) {
                debug!(%rejection, "deferred destroy skipped");
            }
        }

        for (id, transport) in &mut self.transports {
            if let Some(player) = self.actors.get_mut(id).and_then(Actor::as_player_mut) {
                player.flush(transport.as_mut());
            }
        }
    }

    // -- combat --

    /// Apply damage from `source` to `target`.
    pub fn damage(
        &mut self,
        target: EntityId,
        source: Option<EntityId>,
        item: Option<&ItemHandle>,
        amount: i32,
        damage_type: DamageType,
    ) -> Result<DamageOutcome, Rejection> {
        let victim = self.actor_or_reject(target)?;
        let instigator = source.and_then(|s| self.actors.get(&s));
        if !victim.can_be_damaged(instigator) {
            debug!(entity = %target, source = ?source, "damage refused");
            return Err(Rejection::DamageNotAllowed(target));
        }
        let health_before = victim.core().health();
        let conversation = victim.as_player().and_then(Player::current_npc);

        let Some(victim) = self.actors.get_mut(&target) else {
            return Err(Rejection::ActorNotFound(target));
        };
        let outcome = victim.damage(source, item, amount, damage_type);
        let applied = health_before - victim.core().health();
        if outcome == DamageOutcome::Ignored {
            return Ok(outcome);
        }

        self.record(
            WorldEventKind::Damaged {
                target,
                source,
                amount: applied,
            },
            format!("{target} took {applied} {damage_type} damage"),
        );
        if outcome == DamageOutcome::Killed {
            self.on_kill(target, source, item, conversation);
        }
        Ok(outcome)
    }

    fn on_kill(
        &mut self,
        target: EntityId,
        killer: Option<EntityId>,
        item: Option<&ItemHandle>,
        conversation: Option<EntityId>,
    ) {
        self.record(
            WorldEventKind::Killed {
                entity: target,
                killer,
            },
            format!("{target} was killed"),
        );
        if let Some(npc) = conversation {
            self.record(
                WorldEventKind::ConversationEnded {
                    player: target,
                    npc,
                },
                format!("{target} stopped talking to {npc}"),
            );
        }
        if self.actors.get(&target).is_some_and(Actor::is_npc) {
            self.end_conversations_with(target);
        }
        let Some(killer) = killer.filter(|&k| k != target) else {
            return;
        };
        let Some(attacker) = self.actors.get_mut(&killer) else {
            return;
        };
        attacker.on_target_killed(target);

        let killer_name = self.player(killer).map(|p| p.name().to_string());
        let victim_name = self.player(target).map(|p| p.name().to_string());
        if let (Some(killer_name), Some(victim_name)) = (killer_name, victim_name) {
            for p in self.actors.values_mut().filter_map(Actor::as_player_mut) {
                p.receive_kill_message(&killer_name, &victim_name, item);
            }
        }
    }

    /// End every conversation held with `npc`.
    fn end_conversations_with(&mut self, npc: EntityId) {
        let mut ended = Vec::new();
        for actor in self.actors.values_mut() {
            let id = actor.id();
            if let Some(p) = actor.as_player_mut()
                && p.current_npc() == Some(npc)
            {
                p.end_conversation();
                ended.push(id);
            }
        }
        for player in ended {
            self.record(
                WorldEventKind::ConversationEnded { player, npc },
                format!("{player} stopped talking to {npc}"),
            );
        }
    }

    /// Bring a dead player back at the configured spawn point.
    pub fn respawn(&mut self, player: EntityId) -> Result<(), Rejection> {
        let placement = self.config.spawn_point;
        let actor = self
            .actors
            .get_mut(&player)
            .ok_or(Rejection::ActorNotFound(player))?;
        actor.respawn(placement)?;
        self.record(
            WorldEventKind::Respawned { entity: player },
            format!("{player} respawned"),
        );
        Ok(())
    }

    // -- zones, spawners --

    /// Register a spawner on its zone. The zone is created if needed, and an
    /// already active zone activates the spawner at once.
    pub fn add_spawner(&mut self, mut spawner: Spawner) -> SpawnerId {
        use crate::zone::AIZoneListener;

        let id = SpawnerId(self.spawners.len());
        let zone = self
            .zones
            .entry(spawner.zone().to_string())
            .or_insert_with(|| AIZone::new(spawner.zone()));
        zone.add_listener(id);
        if zone.is_active() {
            spawner.on_ai_zone_activated();
        }
        self.spawners.push(spawner);
        id
    }

    /// Create an empty zone.
    pub fn add_zone(&mut self, name: &str) {
        self.zones
            .entry(name.to_string())
            .or_insert_with(|| AIZone::new(name));
    }

    /// A player entered a zone. Returns `false` if it was already inside.
    pub fn enter_ai_zone(&mut self, player: EntityId, zone: &str) -> Result<bool, Rejection> {
        if !self.player_or_reject(player)?.enter_ai_zone(zone) {
            return Ok(false);
        }
        let signal = self
            .zones
            .entry(zone.to_string())
            .or_insert_with(|| AIZone::new(zone))
            .on_player_entered();
        if let Some(signal) = signal {
            self.dispatch_zone_signal(zone, signal);
        }
        Ok(true)
    }

    /// A player left a zone. Returns `false` if it was not inside.
    pub fn exit_ai_zone(&mut self, player: EntityId, zone: &str) -> Result<bool, Rejection> {
        if !self.player_or_reject(player)?.exit_ai_zone(zone) {
            return Ok(false);
        }
        self.leave_zone(zone);
        Ok(true)
    }

    fn leave_zone(&mut self, zone: &str) {
        let signal = self.zones.get_mut(zone).and_then(AIZone::on_player_left);
        if let Some(signal) = signal {
            self.dispatch_zone_signal(zone, signal);
        }
    }

    fn dispatch_zone_signal(&mut self, zone: &str, signal: ZoneSignal) {
        let listeners = self
            .zones
            .get(zone)
            .map(|z| z.listeners().to_vec())
            .unwrap_or_default();
        for id in listeners {
            if let Some(spawner) = self.spawners.get_mut(id.0) {
                signal.deliver(spawner);
            }
        }
        let kind = match signal {
            ZoneSignal::Activated => WorldEventKind::ZoneActivated {
                zone: zone.to_string(),
            },
            ZoneSignal::Deactivated => WorldEventKind::ZoneDeactivated {
                zone: zone.to_string(),
            },
        };
        self.record(kind, format!("zone {zone} {signal:?}"));
    }

    // -- dialogue --

    /// Start a conversation between a player and an NPC. Any previous
    /// conversation of the player ends first. Returns the opening state.
    pub fn start_conversation(&mut self, player: EntityId, npc: EntityId) -> SimResult<String> {
        let user = self.actor_or_reject(player)?;
        let Some(session) = user.as_player() else {
            return Err(Rejection::NotAPlayer(player).into());
        };
        let target = self.actor_or_reject(npc)?;
        let Some(character) = target.as_npc() else {
            return Err(Rejection::NotAnNpc(npc).into());
        };
        if !target.can_use(user) {
            return Err(Rejection::NpcUnavailable(npc).into());
        }

        let dialogue = character.dialogue();
        let state = character.behavior().initial_state(dialogue, session);
        let Some(node) = dialogue.state(&state) else {
            return Err(ContentError::UnknownInitialState {
                npc: character.name().to_string(),
                state,
            }
            .report());
        };
        let opening = SessionEvent::DialogueState {
            npc,
            state: state.clone(),
            text: node.text.clone(),
            choices: node.labels(),
        };

        let previous = self.end_conversation(player)?;
        let session = self.player_or_reject(player)?;
        session.begin_conversation(npc, state.clone());
        session.queue(opening);
        if let Some(previous) = previous {
            debug!(entity = %player, npc = %previous, "previous conversation replaced");
        }
        self.record(
            WorldEventKind::ConversationStarted { player, npc },
            format!("{player} started talking to {npc} at {state}"),
        );
        Ok(state)
    }

    /// A user interacts with another actor. Using an NPC starts a
    /// conversation.
    pub fn use_actor(&mut self, user: EntityId, target: EntityId) -> SimResult<String> {
        self.start_conversation(user, target)
    }

    /// End a player's conversation. Returns the NPC it was with.
    pub fn end_conversation(&mut self, player: EntityId) -> Result<Option<EntityId>, Rejection> {
        let ended = self.player_or_reject(player)?.end_conversation();
        if let Some(npc) = ended {
            self.record(
                WorldEventKind::ConversationEnded { player, npc },
                format!("{player} stopped talking to {npc}"),
            );
        }
        Ok(ended)
    }

    /// Take the transition labelled `label` out of the player's current
    /// dialogue state.
    pub fn transition_to_npc_state(
        &mut self,
        player: EntityId,
        label: &str,
    ) -> SimResult<TransitionKind> {
        // The player leaves the map so it can be borrowed next to its NPC.
        let mut actor = self
            .actors
            .remove(&player)
            .ok_or(Rejection::ActorNotFound(player))?;
        let result = self.take_transition(&mut actor, player, label);
        self.actors.insert(player, actor);
        let (kind, ended) = result?;
        if let Some(npc) = ended {
            self.record(
                WorldEventKind::ConversationEnded { player, npc },
                format!("{player} stopped talking to {npc}"),
            );
        }
        Ok(kind)
    }

    fn take_transition(
        &mut self,
        actor: &mut Actor,
        player: EntityId,
        label: &str,
    ) -> SimResult<(TransitionKind, Option<EntityId>)> {
        let session = actor.as_player_mut().ok_or(Rejection::NotAPlayer(player))?;
        let conversation = session.conversation().cloned().ok_or(Rejection::NoConversation)?;
        let npc_id = conversation.npc;
        let Some(npc) = self.actors.get_mut(&npc_id).and_then(Actor::as_npc_mut) else {
            session.end_conversation();
            return Err(Rejection::NpcUnavailable(npc_id).into());
        };

        let Some(state) = npc.dialogue().state(&conversation.state) else {
            return Err(ContentError::UnknownDialogueState {
                npc: npc.name().to_string(),
                state: conversation.state,
            }
            .report());
        };
        let transition = state
            .transition(label)
            .cloned()
            .ok_or_else(|| Rejection::UnknownTransition(label.to_string()))?;

        let mut ended = None;
        match &transition.kind {
            TransitionKind::End => {
                ended = session.end_conversation();
            }
            TransitionKind::Continue(target) => {
                let Some(next) = npc.dialogue().state(target) else {
                    return Err(ContentError::DanglingTransition {
                        npc: npc.name().to_string(),
                        from: conversation.state,
                        label: label.to_string(),
                        target: target.clone(),
                    }
                    .report());
                };
                let event = SessionEvent::DialogueState {
                    npc: npc_id,
                    state: target.clone(),
                    text: next.text.clone(),
                    choices: next.labels(),
                };
                session.set_dialogue_state(target.clone());
                session.queue(event);
            }
            TransitionKind::Shop => session.open_shop(),
        }
        npc.behavior_mut()
            .on_transition_taken(session, &conversation.state, &transition);
        Ok((transition.kind, ended))
    }

    // -- shop --

    fn trade_items(&self, item: &str) -> SimResult<(ItemHandle, ItemHandle)> {
        let item = self
            .catalog
            .item(item)
            .map_err(|_| Rejection::NotTraded(item.to_string()))?;
        let currency = self.catalog.item(&self.config.currency_item).map_err(|_| {
            ContentError::UnknownContent(self.config.currency_item.clone()).report()
        })?;
        Ok((item, currency))
    }

    /// Buy from the NPC whose shop the player has open. Returns the price paid.
    pub fn buy_item(
        &mut self,
        player: EntityId,
        npc: EntityId,
        item: &str,
        count: u32,
    ) -> SimResult<u32> {
        let (item, currency) = self.trade_items(item)?;
        let seller = self.actor_or_reject(npc)?;
        let price = seller
            .as_npc()
            .ok_or(Rejection::NotAnNpc(npc))?
            .behavior()
            .buy_price(&item)
            .ok_or_else(|| Rejection::NotTraded(item.name().to_string()))?;
        let paid = self
            .player_or_reject(player)?
            .buy(npc, &item, count, price, &currency)?;
        debug!(entity = %player, item = %item, count, paid, "bought");
        Ok(paid)
    }

    /// Sell to the NPC whose shop the player has open. Returns the proceeds.
    pub fn sell_item(
        &mut self,
        player: EntityId,
        npc: EntityId,
        item: &str,
        count: u32,
    ) -> SimResult<u32> {
        let (item, currency) = self.trade_items(item)?;
        let buyer = self.actor_or_reject(npc)?;
        let price = buyer
            .as_npc()
            .ok_or(Rejection::NotAnNpc(npc))?
            .behavior()
            .sell_price(&item)
            .ok_or_else(|| Rejection::NotTraded(item.name().to_string()))?;
        let proceeds = self
            .player_or_reject(player)?
            .sell(npc, &item, count, price, &currency)?;
        debug!(entity = %player, item = %item, count, proceeds, "sold");
        Ok(proceeds)
    }

    // -- player commands --

    /// Validate a chat line and broadcast it to every player.
    pub fn chat(&mut self, player: EntityId, text: &str) -> Result<(), Rejection> {
        let session = self.player_or_reject(player)?;
        let text = session.chat(text)?;
        let sender = session.name().to_string();
        let team = session.team().to_string();
        for p in self.actors.values_mut().filter_map(Actor::as_player_mut) {
            p.receive_chat(&sender, &team, &text);
        }
        self.record(
            WorldEventKind::Chat {
                player,
                text: text.clone(),
            },
            format!("{sender}: {text}"),
        );
        Ok(())
    }

    /// Move a player to a named teleport destination.
    pub fn teleport(&mut self, player: EntityId, destination: &str) -> Result<Placement, Rejection> {
        self.actors
            .get_mut(&player)
            .ok_or(Rejection::ActorNotFound(player))?
            .teleport(destination)
    }

    /// Start a region transition.
    pub fn enter_region(&mut self, player: EntityId, region: &str) -> Result<(), Rejection> {
        self.player_or_reject(player)?.enter_region(region)?;
        self.record_region_change(player, region);
        Ok(())
    }

    /// Fast-travel between regions.
    pub fn fast_travel(
        &mut self,
        player: EntityId,
        origin: &str,
        destination: &str,
    ) -> Result<(), Rejection> {
        self.player_or_reject(player)?
            .fast_travel(origin, destination)?;
        self.record_region_change(player, destination);
        Ok(())
    }

    fn record_region_change(&mut self, player: EntityId, destination: &str) {
        self.record(
            WorldEventKind::RegionChangeRequested {
                player,
                destination: destination.to_string(),
            },
            format!("{player} heading to {destination}"),
        );
    }

    /// Finish a player's region transition.
    pub fn complete_travel(&mut self, player: EntityId, region: &str) -> Result<(), Rejection> {
        self.player_or_reject(player)?.on_travel_complete(region);
        Ok(())
    }

    /// Redeem a DLC key for a player.
    pub fn submit_dlc_key(&mut self, player: EntityId, key: &str) -> SimResult<ItemHandle> {
        let actor = self
            .actors
            .get_mut(&player)
            .ok_or(Rejection::ActorNotFound(player))?;
        let session = actor.as_player_mut().ok_or(Rejection::NotAPlayer(player))?;
        session.submit_dlc_key(key, &self.catalog)
    }

    /// Start reloading a player's current weapon.
    pub fn request_reload(&mut self, player: EntityId) -> Result<f32, Rejection> {
        self.actors
            .get_mut(&player)
            .ok_or(Rejection::ActorNotFound(player))?
            .request_reload()
    }

    // -- movement --

    /// Ask the presentation to move `actor` toward `target`.
    pub fn move_to_actor(&mut self, actor: EntityId, target: EntityId) -> Result<bool, Rejection> {
        let position = self.actor_or_reject(target)?.core().position();
        let mover = self
            .actors
            .get_mut(&actor)
            .ok_or(Rejection::ActorNotFound(actor))?;
        Ok(mover.core_mut().move_to_actor(target, position))
    }

    /// The presentation finished a move for `actor`.
    pub fn on_ai_move_complete(&mut self, actor: EntityId) -> Result<(), Rejection> {
        self.actors
            .get_mut(&actor)
            .ok_or(Rejection::ActorNotFound(actor))?
            .on_ai_move_complete();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npc::Npc;
    use crate::spawner::BlueprintFactory;
    use ew_core::{ItemDef, MemoryTransport, RecordingPresentation};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn world() -> World {
        World::new(WorldConfig::default(), Catalog::new())
    }

    fn add_player(world: &mut World, name: &str) -> EntityId {
        let player = world.new_player(PlayerIdentity::named(name));
        world.spawn(Actor::player(player)).unwrap()
    }

    fn merchant() -> Npc {
        let mut npc = Npc::new("Merchant");
        npc.add_state("Greeting", "Welcome!").unwrap();
        npc.add_shop_transition("Greeting", "Shop").unwrap();
        npc.add_end_transition("Greeting", "Bye").unwrap();
        npc
    }

    #[test]
    fn ids_are_assigned_in_order() {
        let mut w = world();
        let a = w.spawn(Actor::generic("Rock", 1)).unwrap();
        let b = w.spawn(Actor::generic("Rock", 1)).unwrap();
        assert!(a < b);
        assert_eq!(w.actor(a).map(Actor::id), Some(a));
        assert_eq!(w.events().len(), 2);
    }

    #[test]
    fn npc_with_dangling_edge_is_not_spawned() {
        let mut w = world();
        let mut npc = Npc::new("Broken");
        npc.add_state("Start", "Hi").unwrap();
        npc.add_transition("Start", "Go", "Nowhere").unwrap();
        let err = w.spawn(Actor::npc(npc, 100)).unwrap_err();
        assert!(err.is_content_defect());
        assert_eq!(w.actor_count(), 0);
    }

    #[test]
    fn destroy_clears_owner_links_and_conversations() {
        let mut w = world();
        let npc = w.spawn(Actor::npc(merchant(), 100)).unwrap();
        let ada = add_player(&mut w, "Ada");
        let arrow = w.spawn(Actor::generic("Arrow", 1).owned_by(npc)).unwrap();
        w.start_conversation(ada, npc).unwrap();

        w.destroy(npc).unwrap();
        assert_eq!(w.actor(arrow).and_then(|a| a.core().owner()), None);
        assert_eq!(w.player(ada).and_then(Player::current_npc), None);
        assert_eq!(w.destroy(npc), Err(Rejection::ActorNotFound(npc)));
    }

    #[test]
    fn destroy_releases_presentation() {
        let mut w = world();
        let view = Rc::new(RefCell::new(RecordingPresentation::default()));
        let id = w
            .spawn_with_presentation(Actor::generic("Crate", 5), Box::new(Rc::clone(&view)))
            .unwrap();
        w.destroy(id).unwrap();
        assert!(view.borrow().removed);
    }

    #[test]
    fn corpse_is_removed_after_delay() {
        let mut w = world();
        let id = w
            .spawn(Actor::generic("Rat", 5).with_corpse_time(1.0))
            .unwrap();
        assert_eq!(
            w.damage(id, None, None, 10, DamageType::Physical),
            Ok(DamageOutcome::Killed)
        );
        w.tick(0.5);
        assert!(w.actor(id).is_some());
        w.tick(0.5);
        assert!(w.actor(id).is_none());
    }

    #[test]
    fn npcs_refuse_damage() {
        let mut w = world();
        let npc = w.spawn(Actor::npc(merchant(), 100)).unwrap();
        assert_eq!(
            w.damage(npc, None, None, 10, DamageType::Fire),
            Err(Rejection::DamageNotAllowed(npc))
        );
    }

    #[test]
    fn pvp_kill_is_broadcast() {
        let mut w = world();
        let ada = w.new_player(PlayerIdentity::named("Ada")).with_pvp(true);
        let bob = w.new_player(PlayerIdentity::named("Bob")).with_pvp(true);
        let ada = w.spawn(Actor::player(ada)).unwrap();
        let bob = w.spawn(Actor::player(bob)).unwrap();
        let outcome = w.damage(bob, Some(ada), None, 1000, DamageType::Physical);
        assert_eq!(outcome, Ok(DamageOutcome::Killed));
        let notice = SessionEvent::PlayerKill {
            killer: "Ada".into(),
            victim: "Bob".into(),
            item: None,
        };
        assert!(w.player(ada).unwrap().pending_events().contains(&notice));
        assert!(w.player(bob).unwrap().pending_events().contains(&notice));

        w.respawn(bob).unwrap();
        assert_eq!(w.actor(bob).unwrap().core().health(), 100);
        assert_eq!(w.respawn(bob), Err(Rejection::NotDead(bob)));
    }

    #[test]
    fn players_without_pvp_cannot_hurt_each_other() {
        let mut w = world();
        let ada = add_player(&mut w, "Ada");
        let bob = add_player(&mut w, "Bob");
        assert!(w.damage(bob, Some(ada), None, 5, DamageType::Physical).is_err());
        assert!(w.damage(bob, None, None, 5, DamageType::Physical).is_ok());
    }

    #[test]
    fn tick_flushes_each_player_once() {
        let mut w = world();
        let ada = add_player(&mut w, "Ada");
        let wire = Rc::new(RefCell::new(MemoryTransport::new()));
        w.attach_transport(ada, Box::new(Rc::clone(&wire))).unwrap();
        w.player_mut(ada).unwrap().update_countdown(3);
        w.player_mut(ada).unwrap().update_countdown(2);
        w.tick(0.1);
        w.tick(0.1);
        assert_eq!(wire.borrow().batches.len(), 1);
        assert!(w.player(ada).unwrap().pending_events().is_empty());
    }

    #[test]
    fn spawner_added_to_active_zone_starts_active() {
        let mut w = world();
        let ada = add_player(&mut w, "Ada");
        w.enter_ai_zone(ada, "Cave").unwrap();
        let spawner = w.add_spawner(Spawner::new(
            "Cave",
            Placement::default(),
            1,
            1.0,
            BlueprintFactory::new("Rat", 10),
        ));
        w.tick(1.0);
        assert_eq!(w.spawner(spawner).map(Spawner::population), Some(1));
    }

    #[test]
    fn shop_trades_through_catalog() {
        let mut catalog = Catalog::new();
        catalog.add_item(ItemDef::new("Coin").with_max_count(1000)).unwrap();
        let potion = catalog
            .add_item(ItemDef::new("Potion").with_max_count(10).with_trade_value(10))
            .unwrap();
        let mut w = World::new(WorldConfig::default(), catalog);
        let npc = w
            .spawn(Actor::npc(
                merchant().with_behavior(crate::npc::ScriptedBehavior::new().selling(potion)),
                100,
            ))
            .unwrap();
        let ada = add_player(&mut w, "Ada");
        let coin = w.catalog().item("Coin").unwrap();
        w.player_mut(ada).unwrap().add_item(&coin, 25, false);

        assert!(w.buy_item(ada, npc, "Potion", 1).is_err());
        w.start_conversation(ada, npc).unwrap();
        w.transition_to_npc_state(ada, "Shop").unwrap();
        assert_eq!(w.buy_item(ada, npc, "Potion", 2), Ok(20));
        assert!(w.buy_item(ada, npc, "Potion", 1).is_err());
        assert_eq!(w.sell_item(ada, npc, "Potion", 2), Ok(10));
        assert_eq!(w.player(ada).unwrap().item_count("Coin"), 15);
        assert!(w.buy_item(ada, npc, "Sword", 1).is_err());
    }

    #[test]
    fn chat_reaches_everyone() {
        let mut w = world();
        let ada = add_player(&mut w, "Ada");
        let bob = add_player(&mut w, "Bob");
        w.chat(ada, "hello").unwrap();
        assert_eq!(w.player(bob).unwrap().pending_events().len(), 1);
        assert_eq!(w.player(ada).unwrap().pending_events().len(), 1);
        assert!(w.chat(ada, "").is_err());
    }
}
