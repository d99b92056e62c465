//! Player and lineup data model

pub mod lineup;
pub mod player;

pub use lineup::{Lineup, LineupPlayer, LineupPosition};
pub use player::{GameClock, GameInfo, Player};
