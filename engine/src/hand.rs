use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::card::{Card, Deck};
use crate::error::GameError;
use crate::evaluator::{evaluate_hand, HandEvaluation};
use crate::pot::{build_pots, distribute, Contribution};

/// A betting round. `Showdown` is terminal for betting purposes — once reached the hand resolves
/// through `run_showdown` rather than further actor turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

/// An actor's decision. `Raise` carries the requested new total bet for the street (not a
/// delta) — the engine clamps it into the legal `[min_amount, max_amount]` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Raise { amount: u64 },
}

/// The legal moves available to the current actor, computed fresh before every decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalActions {
    pub fold: bool,
    pub check: bool,
    pub call_amount: Option<u64>,
    /// `(min_amount, max_amount)`, both expressed as the new total `current_bet` after raising.
    pub raise: Option<(u64, u64)>,
}

/// One seat's private and public state for the hand in progress.
#[derive(Debug, Clone)]
pub struct SeatHand {
    pub seat: usize,
    pub hole_cards: [Card; 2],
    pub stack: u64,
    pub is_active: bool,
    pub is_all_in: bool,
    /// Chips wagered so far *this street*; reset to zero at every street boundary.
    pub current_bet: u64,
    /// Chips committed across the whole hand so far, including `current_bet`.
    pub total_committed: u64,
    pub acted_since_aggression: bool,
    /// Cleared by a short all-in raise for seats that had already matched the prior bet —
    /// they may still call the extra but may not reopen the betting.
    pub raise_rights: bool,
}

/// A domain-level event the session coordinator drains and projects into wire messages.
#[derive(Debug, Clone)]
pub enum HandEvent {
    HandStarted {
        hand_number: u64,
        dealer_seat: usize,
        sb_seat: usize,
        bb_seat: usize,
        sb_amount: u64,
        bb_amount: u64,
    },
    ActionRequested {
        actor_seat: usize,
        legal_actions: LegalActions,
    },
    ActionApplied {
        seat: usize,
        action: ActionKind,
        pot_total: u64,
        timed_out: bool,
        invalid: bool,
    },
    StreetDealt {
        street: Street,
        community_cards: Vec<Card>,
    },
    HandEnded {
        winners: Vec<(usize, u64)>,
        hole_cards_revealed: Vec<(usize, [Card; 2])>,
        pot_total: u64,
    },
}

/// A single hand's state machine: preflop through showdown. Owns the deck, the betting state for
/// every seat still in the tournament, and the event log the coordinator relays to clients.
pub struct HandEngine {
    pub hand_number: u64,
    pub num_seats: usize,
    pub dealer_seat: usize,
    pub sb_seat: usize,
    pub bb_seat: usize,
    pub sb_amount: u64,
    pub bb_amount: u64,
    pub community_cards: Vec<Card>,
    pub street: Street,
    /// Every seat still in the tournament, sorted ascending by seat number.
    pub seats: Vec<SeatHand>,
    pub actor_seat: Option<usize>,
    pub min_raise_increment: u64,
    pub last_aggressor_seat: Option<usize>,
    deck: Deck,
    events: Vec<HandEvent>,
    concluded: bool,
}

impl HandEngine {
    /// Starts a new hand: deals hole cards, posts blinds, and requests the first action (or, for
    /// a pathologically short-stacked blind post, runs the street out immediately).
    pub fn start(
        hand_number: u64,
        dealer_seat: usize,
        participants: Vec<(usize, u64)>,
        num_seats: usize,
        sb_amount: u64,
        bb_amount: u64,
        mut deck: Deck,
    ) -> HandEngine {
        let mut roster = participants;
        roster.sort_by_key(|(seat, _)| *seat);

        let mut seats: Vec<SeatHand> = roster
            .into_iter()
            .map(|(seat, stack)| SeatHand {
                seat,
                hole_cards: [Card::new(crate::card::Rank::Two, crate::card::Suit::Clubs); 2],
                stack,
                is_active: true,
                is_all_in: false,
                current_bet: 0,
                total_committed: 0,
                acted_since_aggression: false,
                raise_rights: true,
            })
            .collect();

        for seat in seats.iter_mut() {
            seat.hole_cards = [
                deck.deal().expect("deck has enough cards for hole cards"),
                deck.deal().expect("deck has enough cards for hole cards"),
            ];
        }

        let n = seats.len();
        let dealer_idx = seats
            .iter()
            .position(|s| s.seat == dealer_seat)
            .expect("dealer seat is a hand participant");

        let (sb_seat, bb_seat) = if n == 2 {
            (dealer_seat, seats[(dealer_idx + 1) % n].seat)
        } else {
            (seats[(dealer_idx + 1) % n].seat, seats[(dealer_idx + 2) % n].seat)
        };

        let mut engine = HandEngine {
            hand_number,
            num_seats,
            dealer_seat,
            sb_seat,
            bb_seat,
            sb_amount,
            bb_amount,
            community_cards: Vec::new(),
            street: Street::Preflop,
            seats,
            actor_seat: None,
            min_raise_increment: bb_amount,
            last_aggressor_seat: Some(bb_seat),
            deck,
            events: Vec::new(),
            concluded: false,
        };

        engine.post_blind(sb_seat, sb_amount);
        engine.post_blind(bb_seat, bb_amount);

        engine.events.push(HandEvent::HandStarted {
            hand_number,
            dealer_seat,
            sb_seat,
            bb_seat,
            sb_amount,
            bb_amount,
        });

        let first_candidate = if n == 2 {
            dealer_seat
        } else {
            engine.seat_after(bb_seat)
        };
        engine.actor_seat = engine.first_needing_action_from(first_candidate);
        engine.request_action_or_progress();
        engine
    }

    fn post_blind(&mut self, seat: usize, amount: u64) {
        let s = self.seat_mut(seat);
        let paid = amount.min(s.stack);
        s.stack -= paid;
        s.current_bet += paid;
        s.total_committed += paid;
        if s.stack == 0 {
            s.is_all_in = true;
        }
    }

    /// Drains every event produced since the last drain, in emission order.
    pub fn drain_events(&mut self) -> Vec<HandEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_concluded(&self) -> bool {
        self.concluded
    }

    pub fn pot_total(&self) -> u64 {
        self.seats.iter().map(|s| s.total_committed).sum()
    }

    fn seat(&self, seat: usize) -> &SeatHand {
        self.seats.iter().find(|s| s.seat == seat).expect("seat is a hand participant")
    }

    fn seat_mut(&mut self, seat: usize) -> &mut SeatHand {
        self.seats
            .iter_mut()
            .find(|s| s.seat == seat)
            .expect("seat is a hand participant")
    }

    fn seat_index(&self, seat: usize) -> usize {
        self.seats.iter().position(|s| s.seat == seat).expect("seat is a hand participant")
    }

    fn seat_after(&self, seat: usize) -> usize {
        let i = self.seat_index(seat);
        self.seats[(i + 1) % self.seats.len()].seat
    }

    fn max_current_bet(&self) -> u64 {
        self.seats.iter().map(|s| s.current_bet).max().unwrap_or(0)
    }

    /// The first seat, starting at `start` inclusive and walking clockwise, that still needs to
    /// act this street. `None` means the street's betting is complete.
    fn first_needing_action_from(&self, start: usize) -> Option<usize> {
        let n = self.seats.len();
        let start_idx = self.seat_index(start);
        let max_bet = self.max_current_bet();
        for step in 0..n {
            let idx = (start_idx + step) % n;
            let s = &self.seats[idx];
            if s.is_active && !s.is_all_in && (s.current_bet != max_bet || !s.acted_since_aggression) {
                return Some(s.seat);
            }
        }
        None
    }

    /// The legal moves for `seat`, or an empty-option set if `seat` isn't the current actor.
    pub fn legal_actions_for(&self, seat: usize) -> LegalActions {
        let s = self.seat(seat);
        let max_bet = self.max_current_bet();
        let check = s.current_bet == max_bet;
        let call_cost = max_bet.saturating_sub(s.current_bet).min(s.stack);
        let raise = if s.raise_rights && s.stack > call_cost {
            let max_total = s.current_bet + s.stack;
            let min_total = (s.current_bet + call_cost + self.min_raise_increment).min(max_total);
            Some((min_total, max_total))
        } else {
            None
        };
        LegalActions {
            fold: true,
            check,
            call_amount: if check { None } else { Some(call_cost) },
            raise,
        }
    }

    fn pay(&mut self, seat: usize, amount: u64) {
        let s = self.seat_mut(seat);
        s.stack -= amount;
        s.current_bet += amount;
        s.total_committed += amount;
        if s.stack == 0 {
            s.is_all_in = true;
        }
    }

    /// Applies `seat`'s decision. Fails if `seat` isn't the current actor or the action isn't in
    /// its legal set.
    pub fn apply_action(&mut self, seat: usize, action: ActionKind) -> Result<(), GameError> {
        if self.concluded || self.street == Street::Showdown {
            return Err(GameError::NoHandInProgress);
        }
        if self.actor_seat != Some(seat) {
            return Err(GameError::WrongActor);
        }

        let legal = self.legal_actions_for(seat);
        match action {
            ActionKind::Fold => {
                if !legal.fold {
                    return Err(GameError::InvalidAction);
                }
                self.seat_mut(seat).is_active = false;
                self.mark_acted(seat);
            }
            ActionKind::Check => {
                if !legal.check {
                    return Err(GameError::InvalidAction);
                }
                self.mark_acted(seat);
            }
            ActionKind::Call => {
                let amount = legal.call_amount.ok_or(GameError::InvalidAction)?;
                self.pay(seat, amount);
                self.mark_acted(seat);
            }
            ActionKind::Raise { amount } => {
                let (min_amount, max_amount) = legal.raise.ok_or(GameError::InvalidAction)?;
                let target = amount.clamp(min_amount, max_amount);
                let old_max = self.max_current_bet();
                let increment = target - old_max;
                let pay_amount = target - self.seat(seat).current_bet;
                self.pay(seat, pay_amount);

                if increment >= self.min_raise_increment {
                    self.min_raise_increment = increment;
                    self.last_aggressor_seat = Some(seat);
                    for s in self.seats.iter_mut() {
                        if s.seat != seat && s.is_active && !s.is_all_in {
                            s.acted_since_aggression = false;
                            s.raise_rights = true;
                        }
                    }
                } else {
                    // Short all-in raise: doesn't reopen raising for seats that had already
                    // matched the prior bet, but they still owe the extra call.
                    for s in self.seats.iter_mut() {
                        if s.seat != seat && s.is_active && !s.is_all_in && s.current_bet == old_max {
                            s.raise_rights = false;
                            s.acted_since_aggression = false;
                        }
                    }
                }
                self.mark_acted(seat);
            }
        }

        self.events.push(HandEvent::ActionApplied {
            seat,
            action,
            pot_total: self.pot_total(),
            timed_out: false,
            invalid: false,
        });
        self.advance();
        Ok(())
    }

    /// Forces a fold for the seat currently on the clock — used by the coordinator on timeout,
    /// disconnect, or a rejected action. Always legal: a seat in hand may always fold.
    pub fn force_fold(&mut self, seat: usize, timed_out: bool, invalid: bool) {
        if self.concluded || self.actor_seat != Some(seat) {
            return;
        }
        self.seat_mut(seat).is_active = false;
        self.mark_acted(seat);
        self.events.push(HandEvent::ActionApplied {
            seat,
            action: ActionKind::Fold,
            pot_total: self.pot_total(),
            timed_out,
            invalid,
        });
        self.advance();
    }

    fn mark_acted(&mut self, seat: usize) {
        self.seat_mut(seat).acted_since_aggression = true;
    }

    fn betting_complete(&self) -> bool {
        let max_bet = self.max_current_bet();
        !self
            .seats
            .iter()
            .any(|s| s.is_active && !s.is_all_in && (s.current_bet != max_bet || !s.acted_since_aggression))
    }

    fn advance(&mut self) {
        let active_count = self.seats.iter().filter(|s| s.is_active).count();
        if active_count <= 1 {
            self.finish_hand_uncontested();
            return;
        }
        if self.betting_complete() {
            self.end_street();
            return;
        }
        let current = self.actor_seat.expect("an action was just applied by the current actor");
        self.actor_seat = self.first_needing_action_from(self.seat_after(current));
        self.request_action_or_progress();
    }

    fn request_action_or_progress(&mut self) {
        match self.actor_seat {
            Some(seat) => {
                let legal_actions = self.legal_actions_for(seat);
                self.events.push(HandEvent::ActionRequested { actor_seat: seat, legal_actions });
            }
            None => self.end_street(),
        }
    }

    fn end_street(&mut self) {
        for s in self.seats.iter_mut() {
            s.current_bet = 0;
            s.acted_since_aggression = false;
            s.raise_rights = true;
        }
        self.min_raise_increment = self.bb_amount;
        self.last_aggressor_seat = None;

        let active_total = self.seats.iter().filter(|s| s.is_active).count();
        if active_total <= 1 {
            self.finish_hand_uncontested();
            return;
        }

        if self.street == Street::River {
            self.street = Street::Showdown;
            self.run_showdown();
            return;
        }

        let dealt = match self.street {
            Street::Preflop => {
                self.street = Street::Flop;
                self.deck.deal_n(3)
            }
            Street::Flop => {
                self.street = Street::Turn;
                self.deck.deal_n(1)
            }
            Street::Turn => {
                self.street = Street::River;
                self.deck.deal_n(1)
            }
            Street::River | Street::Showdown => unreachable!("handled above"),
        };
        self.community_cards.extend(dealt);
        self.events.push(HandEvent::StreetDealt {
            street: self.street,
            community_cards: self.community_cards.clone(),
        });

        let active_non_allin = self.seats.iter().filter(|s| s.is_active && !s.is_all_in).count();
        if active_non_allin <= 1 {
            // Nobody left who can still bet: run the remaining streets out untouched.
            self.end_street();
            return;
        }

        self.actor_seat = self.first_needing_action_from(self.seat_after(self.dealer_seat));
        self.request_action_or_progress();
    }

    /// Every player but one has folded: the survivor takes every pot without a showdown or a
    /// card reveal.
    fn finish_hand_uncontested(&mut self) {
        let contributions = self.contributions();
        let pots = build_pots(&contributions);
        let winnings = distribute(&pots, &HashMap::new(), self.dealer_seat, self.num_seats);
        self.settle(winnings, Vec::new());
    }

    fn run_showdown(&mut self) {
        let evaluations: HashMap<usize, HandEvaluation> = self
            .seats
            .iter()
            .filter(|s| s.is_active)
            .map(|s| (s.seat, evaluate_hand(&s.hole_cards, &self.community_cards)))
            .collect();
        let contributions = self.contributions();
        let pots = build_pots(&contributions);
        let winnings = distribute(&pots, &evaluations, self.dealer_seat, self.num_seats);
        let revealed: Vec<(usize, [Card; 2])> = self
            .seats
            .iter()
            .filter(|s| s.is_active)
            .map(|s| (s.seat, s.hole_cards))
            .collect();
        self.settle(winnings, revealed);
    }

    fn contributions(&self) -> Vec<Contribution> {
        self.seats
            .iter()
            .map(|s| Contribution {
                seat: s.seat,
                total_committed: s.total_committed,
                still_in: s.is_active,
            })
            .collect()
    }

    fn settle(&mut self, winnings: HashMap<usize, u64>, hole_cards_revealed: Vec<(usize, [Card; 2])>) {
        let pot_total = self.pot_total();
        let mut winners: Vec<(usize, u64)> = Vec::new();
        for seat_hand in self.seats.iter_mut() {
            if let Some(&gross) = winnings.get(&seat_hand.seat) {
                seat_hand.stack += gross;
                let net = gross as i64 - seat_hand.total_committed as i64;
                winners.push((seat_hand.seat, net.max(0) as u64));
            }
        }
        winners.sort_by_key(|(seat, _)| *seat);
        self.actor_seat = None;
        self.concluded = true;
        self.events.push(HandEvent::HandEnded { winners, hole_cards_revealed, pot_total });
    }

    /// Final stacks for every seat that was dealt into this hand, for the tournament manager to
    /// fold back into its persistent roster.
    pub fn final_stacks(&self) -> Vec<(usize, u64)> {
        self.seats.iter().map(|s| (s.seat, s.stack)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heads_up_engine() -> HandEngine {
        let deck = Deck::new();
        HandEngine::start(1, 0, vec![(0, 1000), (1, 1000)], 2, 50, 100, deck)
    }

    #[test]
    fn heads_up_dealer_posts_small_blind_and_acts_first() {
        let engine = heads_up_engine();
        assert_eq!(engine.sb_seat, 0);
        assert_eq!(engine.bb_seat, 1);
        assert_eq!(engine.actor_seat, Some(0));
        assert_eq!(engine.seat(0).current_bet, 50);
        assert_eq!(engine.seat(1).current_bet, 100);
    }

    #[test]
    fn fold_to_one_player_awards_the_pot_without_showdown() {
        let mut engine = heads_up_engine();
        engine.apply_action(0, ActionKind::Fold).unwrap();
        assert!(engine.is_concluded());
        let events = engine.drain_events();
        let ended = events.iter().find_map(|e| match e {
            HandEvent::HandEnded { winners, hole_cards_revealed, .. } => Some((winners.clone(), hole_cards_revealed.clone())),
            _ => None,
        }).unwrap();
        assert_eq!(ended.0, vec![(1, 50)]);
        assert!(ended.1.is_empty());
    }

    #[test]
    fn big_blind_gets_the_option_when_nobody_raises() {
        let mut engine = heads_up_engine();
        engine.apply_action(0, ActionKind::Call).unwrap();
        // Preflop action is square (both at 100), but BB hasn't acted yet -> still BB's turn.
        assert_eq!(engine.actor_seat, Some(1));
        assert_eq!(engine.street, Street::Preflop);
        engine.apply_action(1, ActionKind::Check).unwrap();
        assert_eq!(engine.street, Street::Flop);
    }

    #[test]
    fn min_raise_increment_tracks_the_last_full_raise() {
        let mut engine = heads_up_engine();
        // SB (seat 0) raises to 300: a full raise of 200 over the BB's 100.
        engine.apply_action(0, ActionKind::Raise { amount: 300 }).unwrap();
        assert_eq!(engine.min_raise_increment, 200);
        let legal = engine.legal_actions_for(1);
        assert_eq!(legal.raise, Some((500, 1000)));
    }

    #[test]
    fn raise_amount_clamps_into_the_legal_window() {
        let mut engine = heads_up_engine();
        // Requesting far more than the legal min still clamps to stack-based max, not an error.
        engine.apply_action(0, ActionKind::Raise { amount: 50_000 }).unwrap();
        assert_eq!(engine.seat(0).current_bet, 1000);
        assert!(engine.seat(0).is_all_in);
    }

    #[test]
    fn short_all_in_raise_does_not_reopen_action_for_seats_already_matched() {
        // Three-handed: seat 2 (dealer) raises big, seat 0 calls, seat 1 (SB) goes all-in short
        // of a full raise; seat 2 should only be able to call/fold, not re-raise.
        let deck = Deck::new();
        let mut engine = HandEngine::start(1, 2, vec![(0, 5000), (1, 120), (2, 5000)], 3, 50, 100, deck);
        // sb=0, bb=1, first actor preflop (3-handed) = seat after bb = seat 2.
        assert_eq!(engine.sb_seat, 0);
        assert_eq!(engine.bb_seat, 1);
        assert_eq!(engine.actor_seat, Some(2));
        engine.apply_action(2, ActionKind::Raise { amount: 500 }).unwrap();
        assert_eq!(engine.actor_seat, Some(0));
        engine.apply_action(0, ActionKind::Call).unwrap();
        assert_eq!(engine.actor_seat, Some(1));
        // seat 1 only has 120 total (70 more than its 50 SB) -> short all-in.
        engine.apply_action(1, ActionKind::Raise { amount: 120 }).unwrap();
        assert_eq!(engine.min_raise_increment, 400); // unchanged: short raise doesn't update it
        assert_eq!(engine.actor_seat, Some(2));
        let legal = engine.legal_actions_for(2);
        assert!(legal.raise.is_none());
        assert!(legal.call_amount.is_some());
    }

    #[test]
    fn all_in_runout_deals_every_remaining_street_without_requesting_action() {
        let deck = Deck::new();
        let mut engine = HandEngine::start(1, 0, vec![(0, 100), (1, 100)], 2, 50, 100, deck);
        engine.apply_action(0, ActionKind::Raise { amount: 100 }).unwrap();
        engine.apply_action(1, ActionKind::Call).unwrap();
        assert!(engine.is_concluded());
        assert_eq!(engine.community_cards.len(), 5);
        let events = engine.drain_events();
        let street_events = events.iter().filter(|e| matches!(e, HandEvent::StreetDealt { .. })).count();
        assert_eq!(street_events, 3); // flop, turn, river all dealt with no action requests between
    }

    #[test]
    fn final_stacks_conserve_total_chips() {
        let deck = Deck::new();
        let mut engine = HandEngine::start(1, 0, vec![(0, 1000), (1, 1000)], 2, 50, 100, deck);
        engine.apply_action(0, ActionKind::Call).unwrap();
        engine.apply_action(1, ActionKind::Check).unwrap();
        while !engine.is_concluded() {
            let actor = engine.actor_seat.unwrap();
            engine.apply_action(actor, ActionKind::Check).unwrap();
        }
        let total: u64 = engine.final_stacks().iter().map(|(_, s)| s).sum();
        assert_eq!(total, 2000);
    }
}
