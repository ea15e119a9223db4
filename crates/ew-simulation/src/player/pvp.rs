/// Something the PvP countdown wants the client to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PvpSignal {
    /// Countdown shown (`active`) or hidden, with whole seconds left.
    Countdown {
        /// Whether a change is pending.
        active: bool,
        /// Whole seconds until the change.
        seconds: i32,
    },
    /// The effective flag changed.
    Enabled(bool),
}

/// Effective PvP flag, the flag the player asked for, and the delay that
/// reconciles the two.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PvpState {
    enabled: bool,
    desired: bool,
    timer: f32,
    reported: Option<i32>,
}

impl PvpState {
    /// Whether PvP is in effect.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// What the player asked for.
    pub fn is_desired(&self) -> bool {
        self.desired
    }

    /// Seconds until a pending change takes effect, 0 when none is pending.
    pub fn remaining(&self) -> f32 {
        if self.enabled == self.desired {
            0.0
        } else {
            self.timer
        }
    }

    /// Set both flags immediately.
    pub fn force(&mut self, enabled: bool) {
        *self = Self {
            enabled,
            desired: enabled,
            ..Self::default()
        };
    }

    /// Ask for a new value. Returns `None` when nothing changes.
    pub fn request(&mut self, desired: bool, delay: f32) -> Option<PvpSignal> {
        if desired == self.desired {
            return None;
        }
        self.desired = desired;
        if desired == self.enabled {
            self.timer = 0.0;
            self.reported = None;
            return Some(PvpSignal::Countdown {
                active: false,
                seconds: 0,
            });
        }
        self.timer = delay.max(0.0);
        let seconds = self.timer.ceil() as i32;
        self.reported = Some(seconds);
        Some(PvpSignal::Countdown {
            active: true,
            seconds,
        })
    }

    /// Advance a pending change.
    pub fn tick(&mut self, dt: f32) -> Vec<PvpSignal> {
        if self.enabled == self.desired {
            return Vec::new();
        }
        self.timer -= dt;
        if self.timer <= 0.0 {
            self.enabled = self.desired;
            self.timer = 0.0;
            self.reported = None;
            return vec![
                PvpSignal::Countdown {
                    active: false,
                    seconds: 0,
                },
                PvpSignal::Enabled(self.enabled),
            ];
        }
        let seconds = self.timer.ceil() as i32;
        if self.reported == Some(seconds) {
            return Vec::new();
        }
        self.reported = Some(seconds);
        vec![PvpSignal::Countdown {
            active: true,
            seconds,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_waits_for_delay() {
        let mut pvp = PvpState::default();
        assert_eq!(
            pvp.request(true, 2.0),
            Some(PvpSignal::Countdown {
                active: true,
                seconds: 2
            })
        );
        assert!(!pvp.is_enabled());
        assert!(pvp.is_desired());

        assert_eq!(
            pvp.tick(1.0),
            vec![PvpSignal::Countdown {
                active: true,
                seconds: 1
            }]
        );
        assert!(pvp.tick(0.25).is_empty());
        let signals = pvp.tick(0.75);
        assert_eq!(signals.last(), Some(&PvpSignal::Enabled(true)));
        assert!(pvp.is_enabled());
        assert!(pvp.tick(1.0).is_empty());
    }

    #[test]
    fn repeated_request_is_noop() {
        let mut pvp = PvpState::default();
        assert!(pvp.request(false, 2.0).is_none());
        pvp.request(true, 2.0);
        assert!(pvp.request(true, 2.0).is_none());
    }

    #[test]
    fn reverting_cancels_pending_change() {
        let mut pvp = PvpState::default();
        pvp.request(true, 5.0);
        assert_eq!(
            pvp.request(false, 5.0),
            Some(PvpSignal::Countdown {
                active: false,
                seconds: 0
            })
        );
        assert!(pvp.tick(10.0).is_empty());
        assert!(!pvp.is_enabled());
        assert_eq!(pvp.remaining(), 0.0);
    }

    #[test]
    fn force_sets_both_flags() {
        let mut pvp = PvpState::default();
        pvp.force(true);
        assert!(pvp.is_enabled() && pvp.is_desired());
    }
}
