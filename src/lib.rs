pub mod advisory;
pub mod config;
pub mod game;
pub mod ledger;
pub mod outcome;
pub mod palette;
pub mod resolver;

pub mod test_helpers;

pub use game::{
    Command,
    Effect,
    Game,
    GamePhase,
    GameView,
    Rejection,
    RoundPhase,
};
pub use ledger::Coins;
pub use palette::{
    Champion,
    ColorCategory,
    Faction,
};
