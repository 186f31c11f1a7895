//! Shared primitive types used across the entire game core.

/// All monetary amounts are integer minor-currency units (cents).
/// Never floating point.
pub type Cents = i64;

/// A stable, unique identifier for any entity in a game.
pub type EntityId = String;

/// The canonical game (aggregate root) identifier.
pub type GameId = String;

/// Cumulative experience points.
pub type Xp = i64;

/// Soft in-game currency.
pub type Coins = i64;
