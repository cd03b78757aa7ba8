use crate::card::Deck;
use crate::error::GameError;
use crate::hand::HandEngine;

pub const STARTING_STACK: u64 = 10_000;

/// Hand-number thresholds at which the blinds step up, paired with the level's (small, big).
/// The schedule is flat beyond the last entry.
const BLIND_SCHEDULE: [(u64, u64, u64); 6] = [
    (1, 50, 100),
    (10, 100, 200),
    (20, 200, 400),
    (30, 400, 800),
    (40, 800, 1600),
    (50, 1600, 3200),
];

/// The small and big blind in effect for `hand_number` (1-indexed).
pub fn blinds_for_hand(hand_number: u64) -> (u64, u64) {
    BLIND_SCHEDULE
        .iter()
        .rev()
        .find(|(threshold, _, _)| hand_number >= *threshold)
        .map(|(_, sb, bb)| (*sb, *bb))
        .unwrap_or((BLIND_SCHEDULE[0].1, BLIND_SCHEDULE[0].2))
}

/// A permanent seat in the tournament roster. Seats never move once assigned; a player keeps
/// their seat number and display name for the life of the tournament, win or lose.
#[derive(Debug, Clone)]
pub struct Player {
    pub seat: usize,
    pub name: String,
    pub stack: u64,
    pub eliminated: bool,
}

/// Owns the persistent roster across hands: seating, stacks, blind level, and dealer rotation.
/// Delegates the actual betting state machine to a fresh [`HandEngine`] per hand.
pub struct TournamentManager {
    pub players: Vec<Player>,
    pub hand_number: u64,
    pub dealer_seat: usize,
    starting_stack: u64,
    started: bool,
}

impl TournamentManager {
    /// `starting_stack` is the chip count every seat is dealt in; callers thread through whatever
    /// value they've configured (or [`STARTING_STACK`]) so a broadcast stack and an actual stack
    /// can never diverge.
    pub fn new(starting_stack: u64) -> Self {
        TournamentManager {
            players: Vec::new(),
            hand_number: 0,
            dealer_seat: 0,
            starting_stack,
            started: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn seat_count(&self) -> usize {
        self.players.len()
    }

    pub fn name_taken(&self, name: &str) -> bool {
        self.players.iter().any(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Seats a new player at the next free seat number. Fails if the tournament has already
    /// started or the name collides (case-insensitively) with a seated player.
    pub fn seat_player(&mut self, name: String) -> Result<usize, GameError> {
        if self.started {
            return Err(GameError::InvariantViolation("tournament already started"));
        }
        if self.name_taken(&name) {
            return Err(GameError::InvariantViolation("name already taken"));
        }
        let seat = self.players.len();
        self.players.push(Player { seat, name, stack: self.starting_stack, eliminated: false });
        Ok(seat)
    }

    pub fn active_players(&self) -> Vec<&Player> {
        self.players.iter().filter(|p| !p.eliminated).collect()
    }

    /// Seats still in the tournament, as `(seat, stack)` pairs for handing to [`HandEngine`].
    fn active_participants(&self) -> Vec<(usize, u64)> {
        self.players
            .iter()
            .filter(|p| !p.eliminated)
            .map(|p| (p.seat, p.stack))
            .collect()
    }

    /// True once only one player remains un-eliminated: the tournament is over.
    pub fn is_finished(&self) -> bool {
        self.started && self.active_players().len() <= 1
    }

    pub fn winner(&self) -> Option<&Player> {
        if self.is_finished() {
            self.active_players().into_iter().next()
        } else {
            None
        }
    }

    /// Begins a fresh hand: advances the hand counter, rotates the dealer, reads off the blind
    /// level for this hand number, and builds a new [`HandEngine`] seeded from `deck`.
    pub fn start_hand(&mut self, deck: Deck) -> HandEngine {
        self.started = true;
        self.hand_number += 1;
        if self.hand_number > 1 {
            self.dealer_seat = self.next_active_seat_clockwise(self.dealer_seat);
        } else {
            self.dealer_seat = self
                .active_players()
                .first()
                .map(|p| p.seat)
                .unwrap_or(0);
        }

        let (sb_amount, bb_amount) = blinds_for_hand(self.hand_number);
        HandEngine::start(
            self.hand_number,
            self.dealer_seat,
            self.active_participants(),
            self.players.len(),
            sb_amount,
            bb_amount,
            deck,
        )
    }

    fn next_active_seat_clockwise(&self, from: usize) -> usize {
        let n = self.players.len();
        for step in 1..=n {
            let candidate = (from + step) % n;
            if !self.players[candidate].eliminated {
                return candidate;
            }
        }
        from
    }

    /// Folds a concluded hand's final stacks back into the persistent roster and marks any
    /// busted player eliminated.
    pub fn apply_hand_result(&mut self, final_stacks: &[(usize, u64)]) {
        for &(seat, stack) in final_stacks {
            let player = &mut self.players[seat];
            player.stack = stack;
            if player.stack == 0 {
                player.eliminated = true;
            }
        }
    }
}

impl Default for TournamentManager {
    fn default() -> Self {
        Self::new(STARTING_STACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blind_schedule_steps_up_at_each_threshold() {
        assert_eq!(blinds_for_hand(1), (50, 100));
        assert_eq!(blinds_for_hand(9), (50, 100));
        assert_eq!(blinds_for_hand(10), (100, 200));
        assert_eq!(blinds_for_hand(29), (100, 200));
        assert_eq!(blinds_for_hand(30), (400, 800));
        assert_eq!(blinds_for_hand(50), (1600, 3200));
        assert_eq!(blinds_for_hand(500), (1600, 3200));
    }

    #[test]
    fn seating_rejects_duplicate_names_case_insensitively() {
        let mut t = TournamentManager::new(STARTING_STACK);
        t.seat_player("Alice".into()).unwrap();
        assert!(t.seat_player("alice".into()).is_err());
    }

    #[test]
    fn seating_is_locked_once_the_tournament_starts() {
        let mut t = TournamentManager::new(STARTING_STACK);
        t.seat_player("Alice".into()).unwrap();
        t.seat_player("Bob".into()).unwrap();
        let _hand = t.start_hand(Deck::new());
        assert!(t.seat_player("Carol".into()).is_err());
    }

    #[test]
    fn dealer_rotates_to_the_next_active_seat_and_skips_eliminated_players() {
        let mut t = TournamentManager::new(STARTING_STACK);
        t.seat_player("A".into()).unwrap();
        t.seat_player("B".into()).unwrap();
        t.seat_player("C".into()).unwrap();
        let _ = t.start_hand(Deck::new());
        assert_eq!(t.dealer_seat, 0);
        t.players[1].eliminated = true;
        let _ = t.start_hand(Deck::new());
        assert_eq!(t.dealer_seat, 2); // seat 1 is eliminated, skip straight to seat 2
    }

    #[test]
    fn tournament_finishes_when_one_player_remains() {
        let mut t = TournamentManager::new(STARTING_STACK);
        t.seat_player("A".into()).unwrap();
        t.seat_player("B".into()).unwrap();
        let _ = t.start_hand(Deck::new());
        t.apply_hand_result(&[(0, 20_000), (1, 0)]);
        assert!(t.is_finished());
        assert_eq!(t.winner().unwrap().seat, 0);
    }
}
