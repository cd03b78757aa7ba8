pub mod card;
pub mod error;
pub mod evaluator;
pub mod hand;
pub mod pot;
pub mod tournament;

pub use card::{Card, Deck, Rank, Suit};
pub use error::GameError;
pub use evaluator::{evaluate_hand, HandEvaluation, HandRank};
pub use hand::{ActionKind, HandEngine, HandEvent, LegalActions, SeatHand, Street};
pub use pot::{build_pots, distribute, Contribution, Pot, PotSnapshot};
pub use tournament::{blinds_for_hand, Player, TournamentManager, STARTING_STACK};
