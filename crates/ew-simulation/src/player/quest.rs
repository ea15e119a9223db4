//! Per-player quest progression.
//!
//! Each quest is independently not started, in progress at a named state
//! with a state-local counter, or completed. The tracked ("current") quest
//! is a separate pointer and never changes progression.

use std::collections::BTreeMap;

use ew_core::QuestHandle;

use crate::error::{ContentError, Rejection, SimResult};

/// Progress of one quest for one player.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QuestProgress {
    /// Never started.
    #[default]
    NotStarted,
    /// Started and not yet completed.
    InProgress {
        /// Current state name.
        state: String,
        /// Progress within the state.
        count: u32,
    },
    /// Finished.
    Completed,
}

impl QuestProgress {
    /// The current state name while in progress.
    pub fn state(&self) -> Option<&str> {
        match self {
            Self::InProgress { state, .. } => Some(state),
            _ => None,
        }
    }
}

/// All quest progress held by a player.
#[derive(Debug, Clone, Default)]
pub struct QuestLog {
    quests: BTreeMap<String, (QuestHandle, QuestProgress)>,
    current: Option<QuestHandle>,
}

impl QuestLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress for a quest name.
    pub fn progress(&self, quest: &str) -> QuestProgress {
        self.quests
            .get(quest)
            .map(|(_, p)| p.clone())
            .unwrap_or_default()
    }

    /// Whether the quest has been started (in progress or completed).
    pub fn is_started(&self, quest: &str) -> bool {
        self.quests.contains_key(quest)
    }

    /// Whether the quest has been completed.
    pub fn is_completed(&self, quest: &str) -> bool {
        matches!(self.quests.get(quest), Some((_, QuestProgress::Completed)))
    }

    /// Start a quest at its first state. Returns `false` if it was already
    /// started or completed.
    pub fn start(&mut self, quest: &QuestHandle) -> bool {
        if self.is_started(quest.name()) {
            return false;
        }
        let Some(first) = quest.starting_state() else {
            return false;
        };
        let progress = QuestProgress::InProgress {
            state: first.name.clone(),
            count: 0,
        };
        self.quests
            .insert(quest.name().to_string(), (quest.clone(), progress));
        true
    }

    /// Move an in-progress quest to `state` and reset its counter.
    pub fn advance(&mut self, quest: &QuestHandle, state: &str) -> SimResult<()> {
        let Some((_, QuestProgress::InProgress { state: current, count })) =
            self.quests.get_mut(quest.name())
        else {
            return Err(Rejection::QuestNotInProgress(quest.name().to_string()).into());
        };
        if quest.state(state).is_none() {
            return Err(ContentError::UnknownQuestState {
                quest: quest.name().to_string(),
                state: state.to_string(),
            }
            .report());
        }
        *current = state.to_string();
        *count = 0;
        Ok(())
    }

    /// Overwrite the state-local counter of an in-progress quest.
    pub fn set_count(&mut self, quest: &QuestHandle, value: u32) -> Result<(), Rejection> {
        match self.quests.get_mut(quest.name()) {
            Some((_, QuestProgress::InProgress { count, .. })) => {
                *count = value;
                Ok(())
            }
            _ => Err(Rejection::QuestNotInProgress(quest.name().to_string())),
        }
    }

    /// Complete an in-progress quest. Completing a completed quest is a
    /// successful no-op and returns `Ok(false)`.
    pub fn complete(&mut self, quest: &QuestHandle) -> Result<bool, Rejection> {
        match self.quests.get_mut(quest.name()) {
            Some((_, progress @ QuestProgress::InProgress { .. })) => {
                *progress = QuestProgress::Completed;
                Ok(true)
            }
            Some((_, QuestProgress::Completed)) => Ok(false),
            _ => Err(Rejection::QuestNotInProgress(quest.name().to_string())),
        }
    }

    /// Overwrite progress wholesale; used when loading saved state.
    pub fn restore(&mut self, quest: &QuestHandle, progress: QuestProgress) {
        if progress == QuestProgress::NotStarted {
            self.quests.remove(quest.name());
        } else {
            self.quests
                .insert(quest.name().to_string(), (quest.clone(), progress));
        }
    }

    /// Change the tracked quest.
    pub fn set_current(&mut self, quest: Option<QuestHandle>) {
        self.current = quest;
    }

    /// The tracked quest.
    pub fn current(&self) -> Option<&QuestHandle> {
        self.current.as_ref()
    }

    /// Every started quest with its progress, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&QuestHandle, &QuestProgress)> {
        self.quests.values().map(|(q, p)| (q, p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ew_core::QuestDef;

    fn rats() -> QuestHandle {
        QuestDef::new("Rats", ["KillRats", "ReturnToTown"]).into_handle()
    }

    #[test]
    fn start_enters_first_state() {
        let mut log = QuestLog::new();
        assert!(log.start(&rats()));
        assert_eq!(
            log.progress("Rats"),
            QuestProgress::InProgress {
                state: "KillRats".into(),
                count: 0
            }
        );
        assert!(!log.start(&rats()));
    }

    #[test]
    fn advance_requires_in_progress() {
        let mut log = QuestLog::new();
        let err = log.advance(&rats(), "ReturnToTown").unwrap_err();
        assert!(!err.is_content_defect());
        assert_eq!(log.progress("Rats"), QuestProgress::NotStarted);
    }

    #[test]
    fn advance_resets_count() {
        let mut log = QuestLog::new();
        log.start(&rats());
        log.set_count(&rats(), 3).unwrap();
        log.advance(&rats(), "ReturnToTown").unwrap();
        assert_eq!(
            log.progress("Rats"),
            QuestProgress::InProgress {
                state: "ReturnToTown".into(),
                count: 0
            }
        );
    }

    #[test]
    fn advance_to_undefined_state_is_content_defect() {
        let mut log = QuestLog::new();
        log.start(&rats());
        let err = log.advance(&rats(), "Nowhere").unwrap_err();
        assert!(err.is_content_defect());
        assert_eq!(log.progress("Rats").state(), Some("KillRats"));
    }

    #[test]
    fn complete_twice_is_noop() {
        let mut log = QuestLog::new();
        assert!(log.complete(&rats()).is_err());
        log.start(&rats());
        assert_eq!(log.complete(&rats()), Ok(true));
        assert_eq!(log.complete(&rats()), Ok(false));
        assert!(log.is_completed("Rats"));
        assert!(!log.start(&rats()));
        assert!(log.set_count(&rats(), 1).is_err());
    }

    #[test]
    fn current_quest_is_orthogonal() {
        let mut log = QuestLog::new();
        log.set_current(Some(rats()));
        assert_eq!(log.progress("Rats"), QuestProgress::NotStarted);
        log.start(&rats());
        log.complete(&rats()).unwrap();
        assert_eq!(log.current().map(QuestHandle::name), Some("Rats"));
    }
}
