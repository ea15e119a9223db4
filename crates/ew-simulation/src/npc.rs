//! NPC dialogue graphs and the content hooks around them.
//!
//! A dialogue graph maps state names to text and an ordered list of
//! labelled transitions. Graphs may contain cycles. Targets may be declared
//! before the states they point at; [`Npc::validate`] checks that every
//! target exists once the graph is complete.

use std::collections::BTreeMap;
use std::fmt;

use ew_core::{AchievementHandle, ItemHandle, QuestHandle};
use tracing::{debug, warn};

use crate::actor::ActorCore;
use crate::error::ContentError;
use crate::player::{Player, QuestProgress};

/// Where a transition leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionKind {
    /// End the conversation.
    End,
    /// Move to another named state.
    Continue(String),
    /// Open the NPC's shop and stay in the current state.
    Shop,
}

/// One labelled choice out of a dialogue state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueTransition {
    /// Label the player picks.
    pub text: String,
    /// What picking it does.
    pub kind: TransitionKind,
}

/// One node of a dialogue graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueState {
    /// What the NPC says.
    pub text: String,
    /// Choices in display order.
    pub transitions: Vec<DialogueTransition>,
}

impl DialogueState {
    /// Find a choice by its label.
    pub fn transition(&self, label: &str) -> Option<&DialogueTransition> {
        self.transitions.iter().find(|t| t.text == label)
    }

    /// Labels of every choice, in order.
    pub fn labels(&self) -> Vec<String> {
        self.transitions.iter().map(|t| t.text.clone()).collect()
    }
}

/// Named dialogue states. The first state added is the default entry.
#[derive(Debug, Clone, Default)]
pub struct DialogueGraph {
    states: BTreeMap<String, DialogueState>,
    first: Option<String>,
}

impl DialogueGraph {
    /// Look up a state.
    pub fn state(&self, name: &str) -> Option<&DialogueState> {
        self.states.get(name)
    }

    /// Whether a state exists.
    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// The first state added.
    pub fn initial_state(&self) -> Option<&str> {
        self.first.as_deref()
    }

    /// Text of a state, if it exists.
    pub fn text_for_state(&self, name: &str) -> Option<&str> {
        self.states.get(name).map(|s| s.text.as_str())
    }

    /// Choices out of a state; empty if it does not exist.
    pub fn transitions_for_state(&self, name: &str) -> &[DialogueTransition] {
        self.states
            .get(name)
            .map_or(&[], |s| s.transitions.as_slice())
    }

    /// State names in order.
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no states exist.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Content hooks an NPC may override.
pub trait NpcBehavior: fmt::Debug {
    /// Which state a conversation with `player` starts in.
    fn initial_state(&self, dialogue: &DialogueGraph, _player: &Player) -> String {
        dialogue.initial_state().unwrap_or_default().to_string()
    }

    /// Called once after a transition has been applied.
    fn on_transition_taken(
        &mut self,
        _player: &mut Player,
        _from: &str,
        _transition: &DialogueTransition,
    ) {
    }

    /// Items offered in the shop.
    fn shop_items(&self) -> &[ItemHandle] {
        &[]
    }

    /// Price per unit the player pays, `None` if not sold here.
    fn buy_price(&self, item: &ItemHandle) -> Option<u32> {
        self.shop_items()
            .contains(item)
            .then_some(item.trade_value.max(0) as u32)
    }

    /// Price per unit the player receives, `None` if not bought here.
    fn sell_price(&self, item: &ItemHandle) -> Option<u32> {
        (item.trade_value > 0).then_some((item.trade_value / 2) as u32)
    }

    /// Whether the NPC can be hurt.
    fn can_be_damaged(&self) -> bool {
        false
    }

    /// Per-tick AI hook while alive.
    fn on_tick(&mut self, _core: &mut ActorCore, _dt: f32) {}

    /// A move request finished.
    fn on_move_complete(&mut self, _core: &mut ActorCore) {}
}

/// Quest condition checked when choosing a greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestCondition {
    /// Quest never started.
    NotStarted,
    /// Quest in progress, optionally at a specific state.
    InProgress(Option<String>),
    /// Quest completed.
    Completed,
}

impl QuestCondition {
    fn matches(&self, progress: &QuestProgress) -> bool {
        match (self, progress) {
            (Self::NotStarted, QuestProgress::NotStarted)
            | (Self::Completed, QuestProgress::Completed) => true,
            (Self::InProgress(None), QuestProgress::InProgress { .. }) => true,
            (Self::InProgress(Some(want)), QuestProgress::InProgress { state, .. }) => want == state,
            _ => false,
        }
    }
}

/// Start in `state` when `quest` matches `condition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// Quest to check.
    pub quest: String,
    /// Required progress.
    pub condition: QuestCondition,
    /// Dialogue state to start in.
    pub state: String,
}

/// Side effect applied to the player on entering a dialogue state.
#[derive(Debug, Clone)]
pub enum DialogueEffect {
    /// Give items.
    GiveItem(ItemHandle, u32),
    /// Take items.
    TakeItem(ItemHandle, u32),
    /// Start a quest.
    StartQuest(QuestHandle),
    /// Move a quest to a state.
    AdvanceQuest(QuestHandle, String),
    /// Complete a quest.
    CompleteQuest(QuestHandle),
    /// Set a pickup flag.
    SetPickup(String),
    /// Award an achievement.
    Achieve(AchievementHandle),
}

impl DialogueEffect {
    fn apply(&self, player: &mut Player) {
        match self {
            Self::GiveItem(item, count) => {
                player.add_item(item, *count, true);
            }
            Self::TakeItem(item, count) => {
                player.remove_item(item, *count);
            }
            Self::StartQuest(quest) => {
                player.start_quest(quest);
            }
            Self::AdvanceQuest(quest, state) => {
                if let Err(err) = player.advance_quest_to_state(quest, state) {
                    warn!(quest = %quest, %state, error = %err, "dialogue effect failed");
                }
            }
            Self::CompleteQuest(quest) => {
                if let Err(err) = player.complete_quest(quest) {
                    debug!(quest = %quest, error = %err, "dialogue effect skipped");
                }
            }
            Self::SetPickup(flag) => {
                player.mark_as_picked_up(flag);
            }
            Self::Achieve(achievement) => {
                player.mark_as_achieved(achievement);
            }
        }
    }
}

/// Data-driven behavior: quest-gated greetings, effects on entering states,
/// and a fixed shop list.
#[derive(Debug, Clone)]
pub struct ScriptedBehavior {
    greetings: Vec<Greeting>,
    effects: BTreeMap<String, Vec<DialogueEffect>>,
    shop: Vec<ItemHandle>,
    sell_ratio: f32,
}

impl Default for ScriptedBehavior {
    fn default() -> Self {
        Self {
            greetings: Vec::new(),
            effects: BTreeMap::new(),
            shop: Vec::new(),
            sell_ratio: 0.5,
        }
    }
}

impl ScriptedBehavior {
    /// Create a behavior with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a greeting rule. Rules are checked in insertion order.
    pub fn with_greeting(mut self, greeting: Greeting) -> Self {
        self.greetings.push(greeting);
        self
    }

    /// Apply `effect` whenever a conversation enters `state`.
    pub fn with_effect(mut self, state: impl Into<String>, effect: DialogueEffect) -> Self {
        self.effects.entry(state.into()).or_default().push(effect);
        self
    }

    /// Offer `item` in the shop.
    pub fn selling(mut self, item: ItemHandle) -> Self {
        self.shop.push(item);
        self
    }

    /// Fraction of trade value paid when buying from players.
    pub fn with_sell_ratio(mut self, ratio: f32) -> Self {
        self.sell_ratio = ratio.max(0.0);
        self
    }
}

impl NpcBehavior for ScriptedBehavior {
    fn initial_state(&self, dialogue: &DialogueGraph, player: &Player) -> String {
        self.greetings
            .iter()
            .find(|g| g.condition.matches(&player.quest_progress(&g.quest)))
            .map(|g| g.state.clone())
            .unwrap_or_else(|| dialogue.initial_state().unwrap_or_default().to_string())
    }

    fn on_transition_taken(
        &mut self,
        player: &mut Player,
        _from: &str,
        transition: &DialogueTransition,
    ) {
        let TransitionKind::Continue(target) = &transition.kind else {
            return;
        };
        for effect in self.effects.get(target).into_iter().flatten() {
            effect.apply(player);
        }
    }

    fn shop_items(&self) -> &[ItemHandle] {
        &self.shop
    }

    fn sell_price(&self, item: &ItemHandle) -> Option<u32> {
        (item.trade_value > 0).then_some((item.trade_value as f32 * self.sell_ratio) as u32)
    }
}

/// A conversational non-player character.
#[derive(Debug)]
pub struct Npc {
    name: String,
    dialogue: DialogueGraph,
    behavior: Box<dyn NpcBehavior>,
}

impl Npc {
    /// An NPC with an empty graph and default behavior.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dialogue: DialogueGraph::default(),
            behavior: Box::new(ScriptedBehavior::default()),
        }
    }

    /// Replace the behavior.
    pub fn with_behavior(mut self, behavior: impl NpcBehavior + 'static) -> Self {
        self.behavior = Box::new(behavior);
        self
    }

    /// NPC name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dialogue graph.
    pub fn dialogue(&self) -> &DialogueGraph {
        &self.dialogue
    }

    /// Content hooks.
    pub fn behavior(&self) -> &dyn NpcBehavior {
        self.behavior.as_ref()
    }

    /// Content hooks, mutably.
    pub fn behavior_mut(&mut self) -> &mut dyn NpcBehavior {
        self.behavior.as_mut()
    }

    /// Add a state. Names must be non-empty and unique.
    pub fn add_state(
        &mut self,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), ContentError> {
        let name = name.into();
        if name.is_empty() || self.dialogue.contains(&name) {
            return Err(ContentError::DuplicateDialogueState {
                npc: self.name.clone(),
                state: name,
            });
        }
        if self.dialogue.first.is_none() {
            self.dialogue.first = Some(name.clone());
        }
        self.dialogue.states.insert(
            name,
            DialogueState {
                text: text.into(),
                transitions: Vec::new(),
            },
        );
        Ok(())
    }

    fn push_transition(
        &mut self,
        state: &str,
        text: String,
        kind: TransitionKind,
    ) -> Result<(), ContentError> {
        let Some(node) = self.dialogue.states.get_mut(state) else {
            return Err(ContentError::UnknownDialogueState {
                npc: self.name.clone(),
                state: state.to_string(),
            });
        };
        node.transitions.push(DialogueTransition { text, kind });
        Ok(())
    }

    /// Add a choice from `state` to `target`.
    pub fn add_transition(
        &mut self,
        state: &str,
        text: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<(), ContentError> {
        self.push_transition(state, text.into(), TransitionKind::Continue(target.into()))
    }

    /// Add a choice from `state` that ends the conversation.
    pub fn add_end_transition(
        &mut self,
        state: &str,
        text: impl Into<String>,
    ) -> Result<(), ContentError> {
        self.push_transition(state, text.into(), TransitionKind::End)
    }

    /// Add a choice from `state` that opens the shop.
    pub fn add_shop_transition(
        &mut self,
        state: &str,
        text: impl Into<String>,
    ) -> Result<(), ContentError> {
        self.push_transition(state, text.into(), TransitionKind::Shop)
    }

    /// Check that the graph is non-empty and every target exists.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.dialogue.is_empty() {
            return Err(ContentError::EmptyDialogue(self.name.clone()));
        }
        for (from, state) in &self.dialogue.states {
            for transition in &state.transitions {
                if let TransitionKind::Continue(target) = &transition.kind
                    && !self.dialogue.contains(target)
                {
                    return Err(ContentError::DanglingTransition {
                        npc: self.name.clone(),
                        from: from.clone(),
                        label: transition.text.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::player::PlayerIdentity;
    use ew_core::{ItemDef, QuestDef};
    use std::sync::Arc;

    fn merchant() -> Npc {
        let mut npc = Npc::new("Merchant");
        npc.add_state("Greeting", "Welcome!").unwrap();
        npc.add_shop_transition("Greeting", "Shop").unwrap();
        npc.add_end_transition("Greeting", "Bye").unwrap();
        npc
    }

    fn player() -> Player {
        Player::new(PlayerIdentity::named("Ada"), Arc::new(WorldConfig::default()))
    }

    #[test]
    fn first_state_is_default_entry() {
        let npc = merchant();
        assert_eq!(npc.dialogue().initial_state(), Some("Greeting"));
        assert_eq!(npc.behavior().initial_state(npc.dialogue(), &player()), "Greeting");
        assert_eq!(
            npc.dialogue().state("Greeting").unwrap().labels(),
            vec!["Shop".to_string(), "Bye".to_string()]
        );
    }

    #[test]
    fn duplicate_state_is_rejected() {
        let mut npc = merchant();
        assert!(matches!(
            npc.add_state("Greeting", "again"),
            Err(ContentError::DuplicateDialogueState { .. })
        ));
        assert!(npc.add_state("", "empty").is_err());
    }

    #[test]
    fn transitions_need_existing_source() {
        let mut npc = merchant();
        assert!(matches!(
            npc.add_end_transition("Nowhere", "Bye"),
            Err(ContentError::UnknownDialogueState { .. })
        ));
    }

    #[test]
    fn validate_catches_dangling_targets_and_allows_cycles() {
        let mut npc = merchant();
        npc.add_transition("Greeting", "Rumors?", "Rumors").unwrap();
        assert!(matches!(
            npc.validate(),
            Err(ContentError::DanglingTransition { target, .. }) if target == "Rumors"
        ));
        npc.add_state("Rumors", "They say...").unwrap();
        npc.add_transition("Rumors", "Back", "Greeting").unwrap();
        assert!(npc.validate().is_ok());
        assert!(matches!(
            Npc::new("Mute").validate(),
            Err(ContentError::EmptyDialogue(_))
        ));
    }

    #[test]
    fn greeting_depends_on_quest_progress() {
        let quest = QuestDef::new("Rats", ["KillRats", "Return"]).into_handle();
        let mut npc = merchant().with_behavior(ScriptedBehavior::new().with_greeting(Greeting {
            quest: "Rats".into(),
            condition: QuestCondition::InProgress(Some("Return".into())),
            state: "Thanks".into(),
        }));
        npc.add_state("Thanks", "You did it!").unwrap();

        let mut ada = player();
        assert_eq!(npc.behavior().initial_state(npc.dialogue(), &ada), "Greeting");
        ada.start_quest(&quest);
        ada.advance_quest_to_state(&quest, "Return").unwrap();
        assert_eq!(npc.behavior().initial_state(npc.dialogue(), &ada), "Thanks");
    }

    #[test]
    fn effects_fire_on_continue_only() {
        let gem = ItemDef::new("Gem").with_max_count(5).into_handle();
        let mut behavior = ScriptedBehavior::new().with_effect("Reward", DialogueEffect::GiveItem(gem, 1));
        let mut ada = player();

        let to_reward = DialogueTransition {
            text: "Thanks".into(),
            kind: TransitionKind::Continue("Reward".into()),
        };
        let bye = DialogueTransition {
            text: "Bye".into(),
            kind: TransitionKind::End,
        };
        behavior.on_transition_taken(&mut ada, "Greeting", &bye);
        assert_eq!(ada.item_count("Gem"), 0);
        behavior.on_transition_taken(&mut ada, "Greeting", &to_reward);
        assert_eq!(ada.item_count("Gem"), 1);
    }

    #[test]
    fn shop_prices() {
        let potion = ItemDef::new("HealthPotion").with_trade_value(10).into_handle();
        let rock = ItemDef::new("Rock").into_handle();
        let behavior = ScriptedBehavior::new().selling(potion.clone());
        assert_eq!(behavior.buy_price(&potion), Some(10));
        assert_eq!(behavior.buy_price(&rock), None);
        assert_eq!(behavior.sell_price(&potion), Some(5));
        assert_eq!(behavior.sell_price(&rock), None);
    }
}
