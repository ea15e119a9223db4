//! Per-entity named timers.
//!
//! A [`TimerScheduler`] holds one-shot and recurring callbacks keyed by name.
//! Callbacks either take no arguments or receive a mutable context (normally
//! the owning actor) when they fire. Timers are kept in a `BTreeMap`, so
//! timers that expire in the same tick fire in ascending name order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::mem;

use tracing::trace;

/// Remaining time at or below this value counts as expired. Absorbs the
/// rounding left behind by summing many small deltas.
pub const FIRE_EPSILON: f32 = 1e-5;

enum TimerCallback<C> {
    Plain(Box<dyn FnMut()>),
    WithContext(Box<dyn FnMut(&mut C)>),
}

struct TimerEvent<C> {
    interval: f32,
    remaining: f32,
    recurring: bool,
    callback: TimerCallback<C>,
}

/// Named one-shot and recurring timers for a single owner.
///
/// Registering a name that already exists replaces the previous timer.
/// Cancelling removes a timer without firing it.
pub struct TimerScheduler<C> {
    timers: BTreeMap<String, TimerEvent<C>>,
    cancelled: Vec<String>,
    cleared: bool,
}

impl<C> Default for TimerScheduler<C> {
    fn default() -> Self {
        Self {
            timers: BTreeMap::new(),
            cancelled: Vec::new(),
            cleared: false,
        }
    }
}

impl<C> fmt::Debug for TimerScheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, event) in &self.timers {
            map.entry(name, &(event.remaining, event.recurring));
        }
        map.finish()
    }
}

impl<C> TimerScheduler<C> {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, name: &str, seconds: f32, recurring: bool, callback: TimerCallback<C>) {
        self.timers.insert(
            name.to_string(),
            TimerEvent {
                interval: seconds,
                remaining: seconds,
                recurring,
                callback,
            },
        );
    }

    /// Fire `callback` once after `seconds`.
    pub fn add(&mut self, name: &str, seconds: f32, callback: impl FnMut() + 'static) {
        self.insert(name, seconds, false, TimerCallback::Plain(Box::new(callback)));
    }

    /// Fire `callback` once after `seconds`, passing the tick context.
    pub fn add_with_context(
        &mut self,
        name: &str,
        seconds: f32,
        callback: impl FnMut(&mut C) + 'static,
    ) {
        self.insert(
            name,
            seconds,
            false,
            TimerCallback::WithContext(Box::new(callback)),
        );
    }

    /// Fire `callback` every `seconds`.
    pub fn add_recurring(&mut self, name: &str, seconds: f32, callback: impl FnMut() + 'static) {
        self.insert(name, seconds, true, TimerCallback::Plain(Box::new(callback)));
    }

    /// Fire `callback` every `seconds`, passing the tick context.
    pub fn add_recurring_with_context(
        &mut self,
        name: &str,
        seconds: f32,
        callback: impl FnMut(&mut C) + 'static,
    ) {
        self.insert(
            name,
            seconds,
            true,
            TimerCallback::WithContext(Box::new(callback)),
        );
    }

    /// Remove a timer without firing it. Returns whether it existed.
    pub fn cancel(&mut self, name: &str) -> bool {
        self.cancelled.push(name.to_string());
        self.timers.remove(name).is_some()
    }

    /// Remove every timer.
    pub fn clear(&mut self) {
        self.timers.clear();
        self.cancelled.clear();
        self.cleared = true;
    }

    /// Whether a timer with this name is pending.
    pub fn contains(&self, name: &str) -> bool {
        self.timers.contains_key(name)
    }

    /// Seconds until the named timer next fires.
    pub fn remaining(&self, name: &str) -> Option<f32> {
        self.timers.get(name).map(|t| t.remaining)
    }

    /// Names of pending timers, in firing-priority order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.timers.keys().map(String::as_str)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Whether no timers are pending.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Advance every timer by `dt` and fire the expired ones.
    ///
    /// One-shot timers are removed after firing. Recurring timers are reset
    /// to their full interval; overshoot past zero is discarded.
    pub fn tick(&mut self, ctx: &mut C, dt: f32) {
        self.advance(ctx, dt, None);
    }

    /// Like [`tick`](Self::tick), for a scheduler detached from its owner.
    ///
    /// `stand_in` reaches the scheduler that replaced this one inside `ctx`.
    /// Changes callbacks make there are merged back after every fire, so a
    /// timer cancelled or re-registered by an earlier callback in the same
    /// pass does not fire.
    pub fn tick_detached(
        &mut self,
        ctx: &mut C,
        dt: f32,
        stand_in: fn(&mut C) -> &mut TimerScheduler<C>,
    ) {
        self.advance(ctx, dt, Some(stand_in));
    }

    fn advance(
        &mut self,
        ctx: &mut C,
        dt: f32,
        stand_in: Option<fn(&mut C) -> &mut TimerScheduler<C>>,
    ) {
        self.cancelled.clear();
        self.cleared = false;

        let mut expired = Vec::new();
        for (name, event) in self.timers.iter_mut() {
            event.remaining -= dt;
            if event.remaining <= FIRE_EPSILON {
                expired.push(name.clone());
            }
        }

        // Registered during this pass; they wait for the next tick.
        let mut fresh = BTreeSet::new();
        for name in expired {
            if fresh.contains(&name) {
                continue;
            }
            let Some(event) = self.timers.get_mut(&name) else {
                continue;
            };
            trace!(timer = %name, recurring = event.recurring, "timer fired");
            match &mut event.callback {
                TimerCallback::Plain(f) => f(),
                TimerCallback::WithContext(f) => f(ctx),
            }
            if event.recurring {
                event.remaining = event.interval;
            } else {
                self.timers.remove(&name);
            }

            if let Some(stand_in) = stand_in {
                let pending = mem::take(stand_in(ctx));
                fresh.extend(pending.timers.keys().cloned());
                self.merge(pending);
            }
        }
    }

    /// Apply registrations and cancellations collected in `pending`.
    ///
    /// While an owner ticks its scheduler, the scheduler is detached and a
    /// fresh one stands in for it; callbacks that add or cancel timers touch
    /// the stand-in. Merging replays those changes onto the detached one.
    pub fn merge(&mut self, pending: TimerScheduler<C>) {
        if pending.cleared {
            self.timers.clear();
        }
        for name in &pending.cancelled {
            self.timers.remove(name);
        }
        self.timers.extend(pending.timers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move || c.set(c.get() + 1))
    }

    #[test]
    fn one_shot_fires_once() {
        let mut timers = TimerScheduler::<()>::new();
        let (count, cb) = counter();
        timers.add("boom", 1.0, cb);

        timers.tick(&mut (), 0.5);
        assert_eq!(count.get(), 0);
        timers.tick(&mut (), 0.5);
        assert_eq!(count.get(), 1);
        assert!(timers.is_empty());
        timers.tick(&mut (), 5.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn recurring_resets_without_carrying_overshoot() {
        let mut timers = TimerScheduler::<()>::new();
        let (count, cb) = counter();
        timers.add_recurring("pulse", 1.0, cb);

        timers.tick(&mut (), 1.75);
        assert_eq!(count.get(), 1);
        assert_eq!(timers.remaining("pulse"), Some(1.0));
    }

    #[test]
    fn cancel_prevents_firing() {
        let mut timers = TimerScheduler::<()>::new();
        let (count, cb) = counter();
        timers.add("boom", 1.0, cb);
        assert!(timers.cancel("boom"));
        timers.tick(&mut (), 10.0);
        assert_eq!(count.get(), 0);
        assert!(!timers.cancel("boom"));
    }

    #[test]
    fn re_registering_replaces() {
        let mut timers = TimerScheduler::<()>::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();
        timers.add("t", 1.0, cb1);
        timers.add("t", 3.0, cb2);
        assert_eq!(timers.len(), 1);

        timers.tick(&mut (), 1.0);
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 0);
        timers.tick(&mut (), 2.0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn context_callback_receives_context() {
        let mut timers = TimerScheduler::<Vec<&'static str>>::new();
        timers.add_with_context("log", 0.5, |log| log.push("fired"));
        let mut log = Vec::new();
        timers.tick(&mut log, 0.5);
        assert_eq!(log, vec!["fired"]);
    }

    #[test]
    fn same_tick_expiry_fires_in_name_order() {
        let mut timers = TimerScheduler::<Vec<&'static str>>::new();
        timers.add_with_context("b", 1.0, |log| log.push("b"));
        timers.add_with_context("c", 1.0, |log| log.push("c"));
        timers.add_with_context("a", 1.0, |log| log.push("a"));
        let mut log = Vec::new();
        timers.tick(&mut log, 1.0);
        assert_eq!(log, vec!["a", "b", "c"]);
    }

    #[test]
    fn merge_replays_adds_and_cancels() {
        let mut detached = TimerScheduler::<()>::new();
        let (kept, cb1) = counter();
        let (dropped, cb2) = counter();
        detached.add("keep", 1.0, cb1);
        detached.add("drop", 1.0, cb2);

        let mut pending = TimerScheduler::<()>::new();
        pending.cancel("drop");
        let (added, cb3) = counter();
        pending.add("new", 1.0, cb3);

        detached.merge(pending);
        detached.tick(&mut (), 1.0);
        assert_eq!(kept.get(), 1);
        assert_eq!(dropped.get(), 0);
        assert_eq!(added.get(), 1);
    }

    #[derive(Default)]
    struct Owner {
        timers: TimerScheduler<Owner>,
        fired: Vec<&'static str>,
    }

    fn owner_timers(owner: &mut Owner) -> &mut TimerScheduler<Owner> {
        &mut owner.timers
    }

    /// Tick the way an owner does: detach, tick against a stand-in, merge.
    fn tick_owner(owner: &mut Owner, dt: f32) {
        let mut timers = mem::take(&mut owner.timers);
        timers.tick_detached(owner, dt, owner_timers);
        let pending = mem::replace(&mut owner.timers, timers);
        owner.timers.merge(pending);
    }

    #[test]
    fn detached_cancel_of_same_tick_sibling_suppresses_it() {
        let mut owner = Owner::default();
        owner.timers.add_with_context("a", 1.0, |o: &mut Owner| {
            o.fired.push("a");
            o.timers.cancel("z");
        });
        owner
            .timers
            .add_with_context("z", 1.0, |o: &mut Owner| o.fired.push("z"));
        tick_owner(&mut owner, 1.0);
        tick_owner(&mut owner, 5.0);
        assert_eq!(owner.fired, vec!["a"]);
        assert!(owner.timers.is_empty());
    }

    #[test]
    fn detached_reregistration_replaces_same_tick_sibling() {
        let mut owner = Owner::default();
        owner.timers.add_with_context("a", 1.0, |o: &mut Owner| {
            o.fired.push("a");
            o.timers
                .add_with_context("z", 2.0, |o: &mut Owner| o.fired.push("new z"));
        });
        owner
            .timers
            .add_with_context("z", 1.0, |o: &mut Owner| o.fired.push("old z"));
        tick_owner(&mut owner, 1.0);
        assert_eq!(owner.fired, vec!["a"]);
        assert_eq!(owner.timers.remaining("z"), Some(2.0));
        tick_owner(&mut owner, 2.0);
        assert_eq!(owner.fired, vec!["a", "new z"]);
    }

    #[test]
    fn detached_recurring_timer_can_cancel_itself() {
        let mut owner = Owner::default();
        owner.timers.add_recurring_with_context("pulse", 1.0, |o: &mut Owner| {
            o.fired.push("pulse");
            o.timers.cancel("pulse");
        });
        tick_owner(&mut owner, 1.0);
        tick_owner(&mut owner, 1.0);
        assert_eq!(owner.fired, vec!["pulse"]);
        assert!(!owner.timers.contains("pulse"));
    }

    #[test]
    fn merge_after_clear_drops_everything_old() {
        let mut detached = TimerScheduler::<()>::new();
        let (old, cb) = counter();
        detached.add("old", 1.0, cb);

        let mut pending = TimerScheduler::<()>::new();
        pending.clear();
        detached.merge(pending);
        detached.tick(&mut (), 1.0);
        assert_eq!(old.get(), 0);
        assert!(detached.is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn add_then_cancel_never_fires(
                name in "[a-z]{1,8}",
                delay in 0.0f32..10.0,
                ticks in proptest::collection::vec(0.0f32..5.0, 0..20),
            ) {
                let mut timers = TimerScheduler::<()>::new();
                let (count, cb) = counter();
                timers.add(&name, delay, cb);
                timers.cancel(&name);
                for dt in ticks {
                    timers.tick(&mut (), dt);
                }
                prop_assert_eq!(count.get(), 0);
            }

            #[test]
            fn recurring_fires_once_per_interval(
                interval_exp in 0u32..4,
                steps_exp in 0u32..4,
                k in 1u32..20,
            ) {
                // Powers of two keep the accumulated deltas exact.
                let interval = (1u32 << interval_exp) as f32 * 0.5;
                let steps = 1u32 << steps_exp;
                let dt = interval / steps as f32;

                let mut timers = TimerScheduler::<()>::new();
                let (count, cb) = counter();
                timers.add_recurring("r", interval, cb);
                for _ in 0..(k * steps) {
                    timers.tick(&mut (), dt);
                    let remaining = timers.remaining("r").unwrap();
                    prop_assert!(remaining > 0.0);
                    prop_assert!(remaining <= interval);
                }
                prop_assert_eq!(count.get(), k);
                prop_assert_eq!(timers.remaining("r"), Some(interval));
            }
        }
    }
}
