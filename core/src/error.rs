use thiserror::Error;

/// Every failure an action can surface to the edge layer.
///
/// Precondition variants carry a stable code string (see [`GameError::code`])
/// and are raised before any mutation, so a rollback always leaves the game
/// untouched. Infrastructure failures map to `INTERNAL_ERROR`.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Game '{0}' not found")]
    GameNotFound(String),

    #[error("{count} pending card(s) must be resolved before the day can advance")]
    PendingCards { count: usize },

    #[error("Card '{0}' not found or already resolved")]
    CardNotFound(String),

    #[error("Option '{option_id}' is not valid for card '{card_id}'")]
    InvalidOption { card_id: String, option_id: String },

    #[error("Insufficient funds: need {needed} cents, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },

    #[error("Account '{0}' not found")]
    AccountNotFound(String),

    #[error("Account '{0}' carries an outstanding balance and cannot be closed")]
    OutstandingBalance(String),

    #[error("An active '{0}' policy already exists")]
    AlreadyInsured(String),

    #[error("No active '{0}' policy to claim against")]
    NoPolicy(String),

    #[error("Game has no liquid account for postings")]
    NoChecking,

    #[error("Version conflict on game '{game_id}': expected {expected}")]
    VersionConflict { game_id: String, expected: i64 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GameError {
    /// Stable error code for the edge layer. Never reworded once shipped.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_)            => "VALIDATION_ERROR",
            Self::GameNotFound(_)          => "GAME_NOT_FOUND",
            Self::PendingCards { .. }      => "PENDING_CARDS",
            Self::CardNotFound(_)          => "CARD_NOT_FOUND",
            Self::InvalidOption { .. }     => "INVALID_OPTION",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::AccountNotFound(_)       => "ACCOUNT_NOT_FOUND",
            Self::OutstandingBalance(_)    => "OUTSTANDING_BALANCE",
            Self::AlreadyInsured(_)        => "ALREADY_INSURED",
            Self::NoPolicy(_)              => "NO_POLICY",
            Self::NoChecking               => "NO_CHECKING",
            // Not a player-facing precondition; retryable (see below).
            Self::VersionConflict { .. }   => "INTERNAL_ERROR",
            Self::Database(_) | Self::Serialization(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Version conflicts are safe to retry verbatim; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

pub type GameResult<T> = Result<T, GameError>;
