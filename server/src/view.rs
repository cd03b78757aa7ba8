use holdem_engine::{HandEngine, Player};

use crate::protocol::{GameStateView, HoleCardsView, SeatView};

const HIDDEN: &str = "??";

/// Builds the masked `game_state` snapshot a single `recipient_seat` is allowed to see: its own
/// hole cards in the clear, every other seat's as `"??"`. Built fresh per recipient rather than
/// mutating one shared structure, per the no-shared-mutable-projection design.
pub fn project(hand: &HandEngine, players: &[Player], recipient_seat: usize) -> GameStateView {
    let seats = hand
        .seats
        .iter()
        .map(|seat_hand| {
            let name = players
                .iter()
                .find(|p| p.seat == seat_hand.seat)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            let known = seat_hand.seat == recipient_seat;
            let cards = if known {
                [seat_hand.hole_cards[0].to_string(), seat_hand.hole_cards[1].to_string()]
            } else {
                [HIDDEN.to_string(), HIDDEN.to_string()]
            };
            SeatView {
                seat: seat_hand.seat,
                name,
                stack: seat_hand.stack,
                is_active: seat_hand.is_active,
                is_all_in: seat_hand.is_all_in,
                current_bet: seat_hand.current_bet,
                hole_cards: HoleCardsView { cards, hole_cards_known: known },
            }
        })
        .collect();

    GameStateView {
        hand_number: hand.hand_number,
        dealer_seat: hand.dealer_seat,
        street: hand.street,
        community_cards: hand.community_cards.iter().map(|c| c.to_string()).collect(),
        pot_total: hand.pot_total(),
        seats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdem_engine::{Deck, TournamentManager, STARTING_STACK};

    #[test]
    fn only_the_recipients_own_hole_cards_are_revealed() {
        let mut t = TournamentManager::new(STARTING_STACK);
        t.seat_player("Alice".into()).unwrap();
        t.seat_player("Bob".into()).unwrap();
        let hand = t.start_hand(Deck::new());

        let view = project(&hand, &t.players, 0);
        let mine = view.seats.iter().find(|s| s.seat == 0).unwrap();
        let theirs = view.seats.iter().find(|s| s.seat == 1).unwrap();
        assert!(mine.hole_cards.hole_cards_known);
        assert!(!theirs.hole_cards.hole_cards_known);
        assert_eq!(theirs.hole_cards.cards, ["??".to_string(), "??".to_string()]);
    }
}
