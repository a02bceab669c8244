pub mod assemble;
pub mod game;

pub use assemble::{assemble, Lineup, LineupPossession};
pub use game::{derive_game, DeriveStats, GameDerivation};
