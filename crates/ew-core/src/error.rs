/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while building or querying content catalogues.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No item with this name is registered.
    #[error("unknown item: \"{0}\"")]
    UnknownItem(String),

    /// No quest with this name is registered.
    #[error("unknown quest: \"{0}\"")]
    UnknownQuest(String),

    /// No achievement with this name is registered.
    #[error("unknown achievement: \"{0}\"")]
    UnknownAchievement(String),

    /// A definition with the same name was already registered.
    #[error("duplicate {kind} definition: \"{name}\"")]
    Duplicate {
        /// What was being registered (item, quest, achievement).
        kind: &'static str,
        /// The clashing name.
        name: String,
    },

    /// A definition is internally inconsistent.
    #[error("invalid definition for \"{name}\": {reason}")]
    InvalidDefinition {
        /// The definition's name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}
