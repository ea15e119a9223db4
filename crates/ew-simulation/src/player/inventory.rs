//! Item stacks, loaded ammunition, equipment slots and cooldowns.

use std::collections::BTreeMap;

use ew_core::ItemHandle;

use crate::error::Rejection;

/// Number of equipment slots.
pub const EQUIP_SLOTS: usize = 10;

/// One owned item and its counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    /// The item.
    pub item: ItemHandle,
    /// Stack count, never above the item's `max_count`.
    pub count: u32,
    /// Rounds in the clip, never above the item's `clip_size`.
    pub loaded_ammo: u32,
}

/// A running cooldown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cooldown {
    /// Seconds left.
    pub remaining: f32,
    /// Whether the cooldown is a reload.
    pub reload: bool,
}

/// Everything a player carries.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    stacks: BTreeMap<String, ItemStack>,
    cooldowns: BTreeMap<String, Cooldown>,
    equipped: [Option<ItemHandle>; EQUIP_SLOTS],
    current_slot: usize,
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack count for an item name, 0 when absent.
    pub fn count(&self, item: &str) -> u32 {
        self.stacks.get(item).map_or(0, |s| s.count)
    }

    /// Rounds loaded in an item, 0 when absent.
    pub fn loaded_ammo(&self, item: &str) -> u32 {
        self.stacks.get(item).map_or(0, |s| s.loaded_ammo)
    }

    /// The stack for an item, if owned.
    pub fn stack(&self, item: &str) -> Option<&ItemStack> {
        self.stacks.get(item)
    }

    /// Owned stacks in item-name order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemStack> {
        self.stacks.values()
    }

    /// Number of distinct items owned.
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    /// Whether nothing is owned.
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Add up to `count` of `item`, capped at its stack limit.
    /// Returns how many were actually added.
    pub fn add(&mut self, item: &ItemHandle, count: u32) -> u32 {
        let have = self.count(item.name());
        let added = count.min(item.max_count.saturating_sub(have));
        if added == 0 {
            return 0;
        }
        let stack = self
            .stacks
            .entry(item.name().to_string())
            .or_insert_with(|| ItemStack {
                item: item.clone(),
                count: 0,
                loaded_ammo: 0,
            });
        stack.count += added;
        added
    }

    /// Remove exactly `count` of `item`.
    ///
    /// When the stack empties, the item is dropped and cleared from every
    /// slot holding it; the cleared slots are returned.
    pub fn remove(&mut self, item: &ItemHandle, count: u32) -> Result<Vec<usize>, Rejection> {
        let have = self.count(item.name());
        if have < count {
            return Err(Rejection::InsufficientItems {
                item: item.name().to_string(),
                have,
                need: count,
            });
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        let Some(stack) = self.stacks.get_mut(item.name()) else {
            return Ok(Vec::new());
        };
        stack.count -= count;
        if stack.count > 0 {
            return Ok(Vec::new());
        }
        self.stacks.remove(item.name());
        let slots = self.slots_holding(item.name());
        for &slot in &slots {
            self.equipped[slot] = None;
        }
        Ok(slots)
    }

    /// Load `count` rounds of `ammo` into `weapon`, bounded by the clip size.
    pub fn add_loaded_ammo(&mut self, weapon: &ItemHandle, ammo: &ItemHandle, count: u32) -> bool {
        let Some(stack) = self.stacks.get_mut(weapon.name()) else {
            return false;
        };
        if stack.item.ammo_type.as_deref() != Some(ammo.name()) {
            return false;
        }
        match stack.loaded_ammo.checked_add(count) {
            Some(total) if total <= stack.item.clip_size => {
                stack.loaded_ammo = total;
                true
            }
            _ => false,
        }
    }

    /// Take `count` rounds out of `weapon`'s clip.
    pub fn remove_loaded_ammo(&mut self, weapon: &ItemHandle, count: u32) -> bool {
        match self.stacks.get_mut(weapon.name()) {
            Some(stack) if stack.loaded_ammo >= count => {
                stack.loaded_ammo -= count;
                true
            }
            _ => false,
        }
    }

    /// Overwrite the clip counter, clamped to the clip size.
    pub fn set_loaded_ammo(&mut self, item: &str, loaded: u32) {
        if let Some(stack) = self.stacks.get_mut(item) {
            stack.loaded_ammo = loaded.min(stack.item.clip_size);
        }
    }

    /// Put `item` into `slot`, or clear the slot with `None`.
    pub fn equip(&mut self, slot: usize, item: Option<&ItemHandle>) -> Result<(), Rejection> {
        if slot >= EQUIP_SLOTS {
            return Err(Rejection::InvalidSlot(slot));
        }
        if let Some(item) = item {
            if self.count(item.name()) == 0 {
                return Err(Rejection::ItemNotOwned(item.name().to_string()));
            }
            if !item.can_equip {
                return Err(Rejection::NotEquippable(item.name().to_string()));
            }
        }
        self.equipped[slot] = item.cloned();
        Ok(())
    }

    /// Item held in `slot`.
    pub fn item_for_slot(&self, slot: usize) -> Option<&ItemHandle> {
        self.equipped.get(slot).and_then(Option::as_ref)
    }

    /// Slots currently holding `item`, ascending.
    pub fn slots_holding(&self, item: &str) -> Vec<usize> {
        self.equipped
            .iter()
            .enumerate()
            .filter(|(_, held)| held.as_ref().is_some_and(|h| h.name() == item))
            .map(|(slot, _)| slot)
            .collect()
    }

    /// Select the active slot.
    pub fn set_current_slot(&mut self, slot: usize) -> Result<(), Rejection> {
        if slot >= EQUIP_SLOTS {
            return Err(Rejection::InvalidSlot(slot));
        }
        self.current_slot = slot;
        Ok(())
    }

    /// The active slot.
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// The item in the active slot.
    pub fn current_item(&self) -> Option<&ItemHandle> {
        self.item_for_slot(self.current_slot)
    }

    /// Start or overwrite a cooldown. Non-positive durations clear it.
    pub fn set_cooldown(&mut self, item: &str, seconds: f32, reload: bool) {
        if seconds <= 0.0 {
            self.cooldowns.remove(item);
        } else {
            self.cooldowns.insert(
                item.to_string(),
                Cooldown {
                    remaining: seconds,
                    reload,
                },
            );
        }
    }

    /// The running cooldown for an item.
    pub fn cooldown_entry(&self, item: &str) -> Option<Cooldown> {
        self.cooldowns.get(item).copied()
    }

    /// Seconds of cooldown left, 0 when none.
    pub fn cooldown(&self, item: &str) -> f32 {
        self.cooldowns.get(item).map_or(0.0, |c| c.remaining)
    }

    /// Whether an item is cooling down.
    pub fn is_on_cooldown(&self, item: &str) -> bool {
        self.cooldowns.contains_key(item)
    }

    /// Count every cooldown down by `dt`, dropping the finished ones.
    pub fn tick_cooldowns(&mut self, dt: f32) {
        self.cooldowns.retain(|_, c| {
            c.remaining -= dt;
            c.remaining > 0.0
        });
    }
}
