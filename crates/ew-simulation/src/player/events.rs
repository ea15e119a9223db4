//! Observable session changes and their wire encoding.
//!
//! Every variant starts with a two-byte opcode made of two ASCII letters,
//! followed by its fields in declaration order.

use ew_core::{EntityId, Rotation, Vector3, WriteStream};

const fn opcode(tag: &[u8; 2]) -> u16 {
    u16::from_le_bytes(*tag)
}

/// One change a remote observer of this player needs to see.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Absolute stack count after a change.
    ItemCount {
        /// Item name.
        item: String,
        /// New count.
        count: u32,
    },
    /// Items arrived and should be announced.
    NewItem {
        /// Item name.
        item: String,
        /// Amount added.
        count: u32,
    },
    /// Clip contents changed.
    LoadedAmmo {
        /// Weapon name.
        item: String,
        /// Rounds loaded.
        loaded: u32,
    },
    /// An equipment slot changed.
    Equip {
        /// Slot index.
        slot: u8,
        /// Item now in the slot.
        item: Option<String>,
    },
    /// The active slot changed.
    CurrentSlot {
        /// Slot index.
        slot: u8,
    },
    /// A cooldown started.
    Cooldown {
        /// Item name.
        item: String,
        /// Seconds.
        seconds: f32,
        /// Whether it is a reload.
        reload: bool,
    },
    /// Full inventory resync.
    InventorySnapshot {
        /// `(item, count, loaded_ammo)` in item-name order.
        items: Vec<(String, u32, u32)>,
    },
    /// Mana changed.
    Mana {
        /// Current mana.
        mana: i32,
    },
    /// Health changed.
    Health {
        /// Current health.
        health: i32,
        /// Maximum health.
        max: i32,
    },
    /// A named state flag changed.
    StateChanged {
        /// Flag name.
        name: String,
        /// New value.
        value: bool,
    },
    /// A one-off named event.
    Trigger {
        /// Event name.
        name: String,
        /// Actor that caused it.
        source: Option<EntityId>,
    },
    /// A quest started.
    QuestStarted {
        /// Quest name.
        quest: String,
        /// Starting state.
        state: String,
    },
    /// A quest moved to another state or its counter changed.
    QuestProgress {
        /// Quest name.
        quest: String,
        /// Current state.
        state: String,
        /// State-local counter.
        count: u32,
    },
    /// A quest finished.
    QuestCompleted {
        /// Quest name.
        quest: String,
    },
    /// The tracked quest changed.
    CurrentQuest {
        /// Quest name, if any.
        quest: Option<String>,
    },
    /// A one-time pickup flag was set.
    PickedUp {
        /// Flag name.
        name: String,
    },
    /// A conversation moved to a state.
    DialogueState {
        /// The NPC.
        npc: EntityId,
        /// State name.
        state: String,
        /// Text of the state.
        text: String,
        /// Labels of the available choices.
        choices: Vec<String>,
    },
    /// The conversation ended.
    DialogueEnded,
    /// The NPC opened its shop.
    ShopOpened {
        /// The NPC.
        npc: EntityId,
    },
    /// PvP countdown shown or hidden.
    PvpCountdown {
        /// Whether the countdown is running.
        active: bool,
        /// Whole seconds left.
        seconds: i32,
    },
    /// PvP flag took effect.
    PvpEnabled {
        /// New value.
        enabled: bool,
    },
    /// Generic on-screen countdown; `None` hides it.
    Countdown {
        /// Seconds shown.
        seconds: Option<i32>,
    },
    /// A region transition started.
    RegionChange {
        /// Target region.
        destination: String,
    },
    /// The player was moved.
    Teleported {
        /// New position.
        position: Vector3,
        /// New rotation.
        rotation: Rotation,
    },
    /// Someone said something.
    Chat {
        /// Speaker name.
        sender: String,
        /// Whether the speaker is on the receiver's team.
        same_team: bool,
        /// The message.
        text: String,
    },
    /// An achievement was earned.
    Achievement {
        /// Achievement name.
        name: String,
    },
    /// A player killed a player.
    PlayerKill {
        /// Killer name.
        killer: String,
        /// Victim name.
        victim: String,
        /// Weapon used.
        item: Option<String>,
    },
    /// This player died.
    Death {
        /// Killer, if any.
        killer: Option<EntityId>,
        /// Weapon that landed the last hit.
        item: Option<String>,
    },
    /// This player came back.
    Respawn {
        /// Respawn position.
        position: Vector3,
        /// Respawn rotation.
        rotation: Rotation,
    },
    /// Circuit inputs to mirror.
    CircuitInputs {
        /// Circuit key.
        key: String,
        /// Input bits.
        bits: u32,
    },
    /// Circuit outputs to mirror.
    CircuitOutputs {
        /// Circuit key.
        key: String,
        /// Output values.
        values: Vec<bool>,
    },
}

impl SessionEvent {
    /// The two-byte opcode of this event.
    pub fn opcode(&self) -> u16 {
        let tag = match self {
            Self::ItemCount { .. } => b"ic",
            Self::NewItem { .. } => b"ni",
            Self::LoadedAmmo { .. } => b"la",
            Self::Equip { .. } => b"eq",
            Self::CurrentSlot { .. } => b"sl",
            Self::Cooldown { .. } => b"cd",
            Self::InventorySnapshot { .. } => b"iv",
            Self::Mana { .. } => b"mn",
            Self::Health { .. } => b"hp",
            Self::StateChanged { .. } => b"st",
            Self::Trigger { .. } => b"tr",
            Self::QuestStarted { .. } => b"qs",
            Self::QuestProgress { .. } => b"qp",
            Self::QuestCompleted { .. } => b"qc",
            Self::CurrentQuest { .. } => b"qt",
            Self::PickedUp { .. } => b"pu",
            Self::DialogueState { .. } => b"ds",
            Self::DialogueEnded => b"de",
            Self::ShopOpened { .. } => b"sh",
            Self::PvpCountdown { .. } => b"pc",
            Self::PvpEnabled { .. } => b"pv",
            Self::Countdown { .. } => b"ct",
            Self::RegionChange { .. } => b"rc",
            Self::Teleported { .. } => b"tp",
            Self::Chat { .. } => b"#*",
            Self::Achievement { .. } => b"ac",
            Self::PlayerKill { .. } => b"kl",
            Self::Death { .. } => b"dd",
            Self::Respawn { .. } => b"rs",
            Self::CircuitInputs { .. } => b"ci",
            Self::CircuitOutputs { .. } => b"co",
        };
        opcode(tag)
    }

    /// Append opcode and fields to `stream`.
    pub fn encode(&self, stream: &mut WriteStream) {
        stream.write_u16(self.opcode());
        match self {
            Self::ItemCount { item, count } | Self::NewItem { item, count } => {
                stream.write_string(item);
                stream.write_u32(*count);
            }
            Self::LoadedAmmo { item, loaded } => {
                stream.write_string(item);
                stream.write_u32(*loaded);
            }
            Self::Equip { slot, item } => {
                stream.write_u8(*slot);
                write_optional_string(stream, item.as_deref());
            }
            Self::CurrentSlot { slot } => stream.write_u8(*slot),
            Self::Cooldown {
                item,
                seconds,
                reload,
            } => {
                stream.write_string(item);
                stream.write_f32(*seconds);
                stream.write_bool(*reload);
            }
            Self::InventorySnapshot { items } => {
                stream.write_u16(items.len().min(u16::MAX as usize) as u16);
                for (item, count, loaded) in items.iter().take(u16::MAX as usize) {
                    stream.write_string(item);
                    stream.write_u32(*count);
                    stream.write_u32(*loaded);
                }
            }
            Self::Mana { mana } => stream.write_i32(*mana),
            Self::Health { health, max } => {
                stream.write_i32(*health);
                stream.write_i32(*max);
            }
            Self::StateChanged { name, value } => {
                stream.write_string(name);
                stream.write_bool(*value);
            }
            Self::Trigger { name, source } => {
                stream.write_string(name);
                write_optional_id(stream, *source);
            }
            Self::QuestStarted { quest, state } => {
                stream.write_string(quest);
                stream.write_string(state);
            }
            Self::QuestProgress {
                quest,
                state,
                count,
            } => {
                stream.write_string(quest);
                stream.write_string(state);
                stream.write_u32(*count);
            }
            Self::QuestCompleted { quest } => stream.write_string(quest),
            Self::CurrentQuest { quest } => write_optional_string(stream, quest.as_deref()),
            Self::PickedUp { name } | Self::Achievement { name } => stream.write_string(name),
            Self::DialogueState {
                npc,
                state,
                text,
                choices,
            } => {
                stream.write_u32(npc.get());
                stream.write_string(state);
                stream.write_string(text);
                stream.write_u16(choices.len().min(u16::MAX as usize) as u16);
                for choice in choices.iter().take(u16::MAX as usize) {
                    stream.write_string(choice);
                }
            }
            Self::DialogueEnded => {}
            Self::ShopOpened { npc } => stream.write_u32(npc.get()),
            Self::PvpCountdown { active, seconds } => {
                stream.write_bool(*active);
                stream.write_i32(*seconds);
            }
            Self::PvpEnabled { enabled } => stream.write_bool(*enabled),
            Self::Countdown { seconds } => match seconds {
                Some(s) => {
                    stream.write_bool(true);
                    stream.write_i32(*s);
                }
                None => stream.write_bool(false),
            },
            Self::RegionChange { destination } => stream.write_string(destination),
            Self::Teleported { position, rotation } | Self::Respawn { position, rotation } => {
                stream.write_vector(position);
                stream.write_rotation(rotation);
            }
            Self::Chat {
                sender,
                same_team,
                text,
            } => {
                stream.write_string(sender);
                stream.write_bool(*same_team);
                stream.write_string(text);
            }
            Self::PlayerKill {
                killer,
                victim,
                item,
            } => {
                stream.write_string(killer);
                stream.write_string(victim);
                write_optional_string(stream, item.as_deref());
            }
            Self::Death { killer, item } => {
                write_optional_id(stream, *killer);
                write_optional_string(stream, item.as_deref());
            }
            Self::CircuitInputs { key, bits } => {
                stream.write_string(key);
                stream.write_u32(*bits);
            }
            Self::CircuitOutputs { key, values } => {
                stream.write_string(key);
                stream.write_u16(values.len().min(u16::MAX as usize) as u16);
                for value in values.iter().take(u16::MAX as usize) {
                    stream.write_bool(*value);
                }
            }
        }
    }
}

fn write_optional_string(stream: &mut WriteStream, value: Option<&str>) {
    match value {
        Some(s) => {
            stream.write_bool(true);
            stream.write_string(s);
        }
        None => stream.write_bool(false),
    }
}

fn write_optional_id(stream: &mut WriteStream, value: Option<EntityId>) {
    stream.write_u32(value.map_or(0, EntityId::get));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_is_two_ascii_bytes() {
        let event = SessionEvent::Mana { mana: 7 };
        let mut stream = WriteStream::new();
        event.encode(&mut stream);
        assert_eq!(&stream.as_bytes()[..2], b"mn");
        assert_eq!(&stream.as_bytes()[2..], &7i32.to_le_bytes());
    }

    #[test]
    fn optional_fields_carry_presence_byte() {
        let mut stream = WriteStream::new();
        SessionEvent::Equip { slot: 3, item: None }.encode(&mut stream);
        assert_eq!(stream.as_bytes(), &[b'e', b'q', 3, 0]);

        let mut stream = WriteStream::new();
        SessionEvent::Equip {
            slot: 1,
            item: Some("Axe".into()),
        }
        .encode(&mut stream);
        assert_eq!(stream.as_bytes(), &[b'e', b'q', 1, 1, 3, 0, b'A', b'x', b'e']);
    }

    #[test]
    fn dialogue_state_lists_choices() {
        let mut stream = WriteStream::new();
        SessionEvent::DialogueState {
            npc: EntityId(2),
            state: "Hi".into(),
            text: "".into(),
            choices: vec!["Bye".into()],
        }
        .encode(&mut stream);
        let bytes = stream.as_bytes();
        assert_eq!(&bytes[..2], b"ds");
        assert_eq!(&bytes[2..6], &2u32.to_le_bytes());
        // state(2+2) text(2) count(2) choice(2+3)
        assert_eq!(bytes.len(), 6 + 4 + 2 + 2 + 5);
    }

    #[test]
    fn opcodes_are_unique() {
        let events = [
            SessionEvent::DialogueEnded,
            SessionEvent::Mana { mana: 0 },
            SessionEvent::Health { health: 0, max: 0 },
            SessionEvent::Countdown { seconds: None },
            SessionEvent::PvpEnabled { enabled: true },
            SessionEvent::CurrentSlot { slot: 0 },
        ];
        let mut codes: Vec<u16> = events.iter().map(SessionEvent::opcode).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), events.len());
    }
}
