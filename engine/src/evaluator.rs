use std::cmp::Ordering;
use std::collections::HashMap;

use itertools::Itertools;

use crate::card::{Card, Rank, Suit};

/// The category of a 5-card hand. Variant declaration order is the ranking order — Rust derives
/// `Ord` from it, so `HandRank::Flush > HandRank::Straight` falls out for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandRank {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

/// A fully comparable hand strength: category plus descending kickers. `Ord` compares rank first,
/// then kickers lexicographically — exactly the poker tie-break rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandEvaluation {
    pub rank: HandRank,
    pub kickers: Vec<Rank>,
}

impl PartialOrd for HandEvaluation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandEvaluation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.kickers.cmp(&other.kickers))
    }
}

/// Evaluates the best 5-card hand obtainable from 2 hole cards plus 3-5 community cards.
pub fn evaluate_hand(hole: &[Card; 2], community: &[Card]) -> HandEvaluation {
    let mut all_cards = Vec::with_capacity(2 + community.len());
    all_cards.extend_from_slice(hole);
    all_cards.extend_from_slice(community);
    best_of(&all_cards)
}

/// Picks the best 5-card evaluation out of any pool of 5-7 cards.
fn best_of(cards: &[Card]) -> HandEvaluation {
    if cards.len() <= 5 {
        return evaluate_five(cards);
    }
    cards
        .iter()
        .copied()
        .combinations(5)
        .map(|five| evaluate_five(&five))
        .max()
        .expect("at least one 5-card combination exists")
}

fn evaluate_five(cards: &[Card]) -> HandEvaluation {
    debug_assert_eq!(cards.len(), 5);

    let mut rank_counts: HashMap<Rank, u8> = HashMap::new();
    for card in cards {
        *rank_counts.entry(card.rank).or_insert(0) += 1;
    }
    let mut suit_counts: HashMap<Suit, u8> = HashMap::new();
    for card in cards {
        *suit_counts.entry(card.suit).or_insert(0) += 1;
    }

    let is_flush = suit_counts.values().any(|&count| count == 5);
    let (is_straight, straight_high) = check_straight(cards);

    if is_flush && is_straight {
        return HandEvaluation {
            rank: HandRank::StraightFlush,
            kickers: vec![straight_high],
        };
    }

    if let Some(quad_rank) = rank_counts
        .iter()
        .find(|(_, &count)| count == 4)
        .map(|(&r, _)| r)
    {
        let kicker = rank_counts
            .keys()
            .copied()
            .filter(|&r| r != quad_rank)
            .max()
            .expect("a 5-card hand with quads has exactly one other card");
        return HandEvaluation {
            rank: HandRank::FourOfAKind,
            kickers: vec![quad_rank, kicker],
        };
    }

    if let Some(three_rank) = rank_counts
        .iter()
        .find(|(_, &count)| count == 3)
        .map(|(&r, _)| r)
    {
        if let Some(pair_rank) = rank_counts
            .iter()
            .filter(|(&r, _)| r != three_rank)
            .find(|(_, &count)| count >= 2)
            .map(|(&r, _)| r)
        {
            return HandEvaluation {
                rank: HandRank::FullHouse,
                kickers: vec![three_rank, pair_rank],
            };
        }
    }

    if is_flush {
        return HandEvaluation {
            rank: HandRank::Flush,
            kickers: descending_ranks(cards),
        };
    }

    if is_straight {
        return HandEvaluation {
            rank: HandRank::Straight,
            kickers: vec![straight_high],
        };
    }

    if let Some(three_rank) = rank_counts
        .iter()
        .find(|(_, &count)| count == 3)
        .map(|(&r, _)| r)
    {
        let mut kickers: Vec<Rank> = rank_counts
            .keys()
            .copied()
            .filter(|&r| r != three_rank)
            .collect();
        kickers.sort_by(|a, b| b.cmp(a));
        kickers.truncate(2);
        return HandEvaluation {
            rank: HandRank::ThreeOfAKind,
            kickers: std::iter::once(three_rank).chain(kickers).collect(),
        };
    }

    let mut pairs: Vec<Rank> = rank_counts
        .iter()
        .filter(|(_, &count)| count == 2)
        .map(|(&r, _)| r)
        .collect();
    if pairs.len() >= 2 {
        pairs.sort_by(|a, b| b.cmp(a));
        let (high_pair, low_pair) = (pairs[0], pairs[1]);
        let kicker = rank_counts
            .keys()
            .copied()
            .filter(|&r| r != high_pair && r != low_pair)
            .max()
            .expect("a 5-card two-pair hand has exactly one other card");
        return HandEvaluation {
            rank: HandRank::TwoPair,
            kickers: vec![high_pair, low_pair, kicker],
        };
    }

    if let Some(pair_rank) = pairs.first().copied() {
        let mut kickers: Vec<Rank> = rank_counts
            .keys()
            .copied()
            .filter(|&r| r != pair_rank)
            .collect();
        kickers.sort_by(|a, b| b.cmp(a));
        kickers.truncate(3);
        return HandEvaluation {
            rank: HandRank::OnePair,
            kickers: std::iter::once(pair_rank).chain(kickers).collect(),
        };
    }

    HandEvaluation {
        rank: HandRank::HighCard,
        kickers: descending_ranks(cards),
    }
}

fn descending_ranks(cards: &[Card]) -> Vec<Rank> {
    let mut ranks: Vec<Rank> = cards.iter().map(|c| c.rank).collect();
    ranks.sort_by(|a, b| b.cmp(a));
    ranks
}

/// Checks for a straight, treating the wheel (A-2-3-4-5) as 5-high. Returns the straight's
/// high card when found.
fn check_straight(cards: &[Card]) -> (bool, Rank) {
    let mut values: Vec<u8> = cards.iter().map(|c| c.rank.value()).unique().collect();
    if values.contains(&14) {
        values.push(1); // ace also plays low for the wheel
    }
    values.sort_unstable();

    let mut consecutive = 1;
    let mut best_high: Option<u8> = None;
    for i in 1..values.len() {
        if values[i] == values[i - 1] + 1 {
            consecutive += 1;
            if consecutive >= 5 {
                best_high = Some(values[i]);
            }
        } else if values[i] != values[i - 1] {
            consecutive = 1;
        }
    }

    match best_high {
        // The wheel's internal high value is 5 (ace counted low); every other straight's high
        // value is just a normal rank value.
        Some(v) => (true, Rank::ALL_BY_VALUE[(v - 2) as usize]),
        None => (false, Rank::Two),
    }
}

impl Rank {
    const ALL_BY_VALUE: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn hand(cards: &[&str]) -> Vec<Card> {
        cards.iter().map(|s| Card::parse(s).unwrap()).collect()
    }

    fn eval(hole: [&str; 2], board: &[&str]) -> HandEvaluation {
        let hole_cards = [Card::parse(hole[0]).unwrap(), Card::parse(hole[1]).unwrap()];
        let board_cards = hand(board);
        evaluate_hand(&hole_cards, &board_cards)
    }

    #[test]
    fn royal_flush_beats_everything() {
        let e = eval(["As", "Ks"], &["Qs", "Js", "Ts", "2d", "3c"]);
        assert_eq!(e.rank, HandRank::StraightFlush);
        assert_eq!(e.kickers, vec![Rank::Ace]);
    }

    #[test]
    fn straight_flush_reports_its_high_card() {
        let e = eval(["9s", "8s"], &["7s", "6s", "5s", "Kd", "Qc"]);
        assert_eq!(e.rank, HandRank::StraightFlush);
        assert_eq!(e.kickers, vec![Rank::Nine]);
    }

    #[test]
    fn wheel_straight_is_five_high() {
        let e = eval(["As", "2d"], &["3c", "4h", "5s", "Kd", "Qc"]);
        assert_eq!(e.rank, HandRank::Straight);
        assert_eq!(e.kickers, vec![Rank::Five]);
    }

    #[test]
    fn four_of_a_kind_kicker_is_the_best_remaining_card() {
        let e = eval(["Ah", "Ad"], &["Ac", "As", "2d", "Kd", "Qc"]);
        assert_eq!(e.rank, HandRank::FourOfAKind);
        assert_eq!(e.kickers, vec![Rank::Ace, Rank::King]);
    }

    #[test]
    fn full_house_beats_flush() {
        let e = eval(["Kh", "Kd"], &["Kc", "7d", "7s", "2d", "3d"]);
        assert_eq!(e.rank, HandRank::FullHouse);
        assert_eq!(e.kickers, vec![Rank::King, Rank::Seven]);
    }

    #[test]
    fn two_pair_kicker_breaks_otherwise_tied_hands() {
        let a = eval(["Ah", "Ad"], &["Kc", "Kd", "7s", "2d", "3d"]);
        let b = eval(["Qs", "Qh"], &["Kc", "Kd", "7s", "2d", "3d"]);
        assert_eq!(a.rank, HandRank::TwoPair);
        assert!(a > b);
    }

    #[test]
    fn best_of_seven_ignores_dead_cards() {
        // Board makes a flush draw irrelevant; best hand is trip aces, not the low pair.
        let e = eval(["Ah", "Ad"], &["Ac", "2d", "3d", "4d", "7d"]);
        assert_eq!(e.rank, HandRank::ThreeOfAKind);
    }

    #[rstest]
    #[case(HandRank::HighCard, ["7h", "2d"], ["Jc", "9s", "4h", "Kd", "3c"])]
    #[case(HandRank::OnePair, ["7h", "7d"], ["Jc", "9s", "4h", "Kd", "3c"])]
    #[case(HandRank::TwoPair, ["7h", "7d"], ["9c", "9s", "4h", "Kd", "3c"])]
    #[case(HandRank::ThreeOfAKind, ["7h", "7d"], ["7c", "9s", "4h", "Kd", "3c"])]
    #[case(HandRank::Straight, ["7h", "6d"], ["5c", "4s", "3h", "Kd", "9c"])]
    #[case(HandRank::Flush, ["7h", "2h"], ["9h", "4h", "Kh", "Ad", "3c"])]
    #[case(HandRank::FullHouse, ["7h", "7d"], ["7c", "9s", "9h", "Kd", "3c"])]
    #[case(HandRank::FourOfAKind, ["7h", "7d"], ["7c", "7s", "9h", "Kd", "3c"])]
    #[case(HandRank::StraightFlush, ["7h", "6h"], ["5h", "4h", "3h", "Kd", "9c"])]
    fn evaluate_hand_reports_the_expected_category(
        #[case] expected: HandRank,
        #[case] hole: [&str; 2],
        #[case] board: [&str; 5],
    ) {
        let e = eval(hole, &board);
        assert_eq!(e.rank, expected);
    }

    #[rstest]
    #[case(HandRank::StraightFlush, HandRank::FourOfAKind)]
    #[case(HandRank::FourOfAKind, HandRank::FullHouse)]
    #[case(HandRank::FullHouse, HandRank::Flush)]
    #[case(HandRank::Flush, HandRank::Straight)]
    #[case(HandRank::Straight, HandRank::ThreeOfAKind)]
    #[case(HandRank::ThreeOfAKind, HandRank::TwoPair)]
    #[case(HandRank::TwoPair, HandRank::OnePair)]
    #[case(HandRank::OnePair, HandRank::HighCard)]
    fn hand_rank_category_ordering_is_total(#[case] stronger: HandRank, #[case] weaker: HandRank) {
        assert!(stronger > weaker);
    }
}
