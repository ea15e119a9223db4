use std::collections::{BTreeMap, BTreeSet};

/// String-keyed puzzle state: input bitfields and output bit sequences.
///
/// Any key is legal. Input changes are coalesced and handed out at most
/// once per sync window.
#[derive(Debug, Clone, Default)]
pub struct CircuitState {
    inputs: BTreeMap<String, u32>,
    outputs: BTreeMap<String, Vec<bool>>,
    dirty: BTreeSet<String>,
    cooldown: f32,
}

impl CircuitState {
    /// Input bits for `key`, 0 when never set.
    pub fn inputs(&self, key: &str) -> u32 {
        self.inputs.get(key).copied().unwrap_or(0)
    }

    /// Store input bits. Returns whether the value changed.
    pub fn set_inputs(&mut self, key: &str, bits: u32) -> bool {
        if self.inputs(key) == bits && self.inputs.contains_key(key) {
            return false;
        }
        self.inputs.insert(key.to_string(), bits);
        self.dirty.insert(key.to_string());
        true
    }

    /// Output values for `key`, padded with `false` or truncated to `count`.
    pub fn outputs(&self, key: &str, count: usize) -> Vec<bool> {
        let mut values = self.outputs.get(key).cloned().unwrap_or_default();
        values.resize(count, false);
        values
    }

    /// Store output values. Returns whether they changed.
    pub fn set_outputs(&mut self, key: &str, values: Vec<bool>) -> bool {
        if self.outputs.get(key) == Some(&values) {
            return false;
        }
        self.outputs.insert(key.to_string(), values);
        true
    }

    /// Keys with unsynced input changes.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Advance the sync window. When it is open and inputs changed, returns
    /// every changed key with its current bits and starts a new window of
    /// `window` seconds.
    pub fn tick(&mut self, dt: f32, window: f32) -> Vec<(String, u32)> {
        if self.cooldown > 0.0 {
            self.cooldown -= dt;
            if self.cooldown > 0.0 {
                return Vec::new();
            }
        }
        if self.dirty.is_empty() {
            self.cooldown = 0.0;
            return Vec::new();
        }
        self.cooldown = window;
        std::mem::take(&mut self.dirty)
            .into_iter()
            .map(|key| {
                let bits = self.inputs(&key);
                (key, bits)
            })
            .collect()
    }
}
