use std::collections::HashMap;

use crate::evaluator::HandEvaluation;

/// One seat's contribution to the current hand, as tracked by the hand engine.
#[derive(Debug, Clone, Copy)]
pub struct Contribution {
    pub seat: usize,
    pub total_committed: u64,
    /// `false` once the seat has folded — folded seats still paid into the pot but are not
    /// eligible to win it back.
    pub still_in: bool,
}

/// A single pot (main or side), with the seats allowed to win it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pot {
    pub amount: u64,
    pub eligible_seats: Vec<usize>,
}

/// A published snapshot of all chips not currently in a player's stack.
#[derive(Debug, Clone)]
pub struct PotSnapshot {
    pub total: u64,
    pub pots: Vec<Pot>,
}

/// Splits all committed chips into a main pot and side pots, per the commitment-level algorithm:
/// sort distinct positive commitment levels, and for each level take the slice of every
/// contributor's stake that falls in that level. A pot whose eligible set is empty (every
/// contributor at that level has folded) collapses into the next level up.
pub fn build_pots(contributions: &[Contribution]) -> Vec<Pot> {
    let mut levels: Vec<u64> = contributions
        .iter()
        .map(|c| c.total_committed)
        .filter(|&amount| amount > 0)
        .collect();
    levels.sort_unstable();
    levels.dedup();

    let mut pots: Vec<Pot> = Vec::new();
    let mut previous_level = 0u64;
    let mut carry = 0u64; // chips from levels whose eligible set was empty, pending a home
    for &level in &levels {
        let amount: u64 = contributions
            .iter()
            .map(|c| c.total_committed.min(level).saturating_sub(c.total_committed.min(previous_level)))
            .sum();
        let eligible_seats: Vec<usize> = contributions
            .iter()
            .filter(|c| c.still_in && c.total_committed >= level)
            .map(|c| c.seat)
            .collect();

        if eligible_seats.is_empty() {
            carry += amount;
        } else {
            pots.push(Pot {
                amount: amount + carry,
                eligible_seats,
            });
            carry = 0;
        }
        previous_level = level;
    }
    // Every contributor at the remaining levels folded: the last real pot absorbs the leftover.
    if carry > 0 {
        if let Some(last) = pots.last_mut() {
            last.amount += carry;
        }
    }

    pots.retain(|p| p.amount > 0);
    pots
}

/// Distributes every pot to its winners, in ascending (main-pot-first) order. Within a pot the
/// eligible seats with the best `HandEvaluation` split it via integer-floor division; any
/// remainder is handed out one chip at a time starting with the eligible winner seated closest
/// clockwise from `dealer_seat + 1`.
///
/// Returns each winning seat's *gross* winnings (their own contribution plus any profit) — the
/// caller subtracts `total_committed` to report the net `amount_won` required by the wire
/// protocol.
pub fn distribute(
    pots: &[Pot],
    evaluations: &HashMap<usize, HandEvaluation>,
    dealer_seat: usize,
    num_seats: usize,
) -> HashMap<usize, u64> {
    let mut winnings: HashMap<usize, u64> = HashMap::new();

    for pot in pots {
        if pot.amount == 0 || pot.eligible_seats.is_empty() {
            continue;
        }
        if pot.eligible_seats.len() == 1 {
            // Sole eligible seat: no showdown needed, e.g. everyone else folded.
            *winnings.entry(pot.eligible_seats[0]).or_insert(0) += pot.amount;
            continue;
        }

        let best = pot
            .eligible_seats
            .iter()
            .filter_map(|seat| evaluations.get(seat))
            .max()
            .expect("every eligible seat reached showdown with an evaluation");

        let mut winners: Vec<usize> = pot
            .eligible_seats
            .iter()
            .copied()
            .filter(|seat| evaluations.get(seat) == Some(best))
            .collect();
        clockwise_sort(&mut winners, dealer_seat + 1, num_seats);

        let share = pot.amount / winners.len() as u64;
        let remainder = pot.amount % winners.len() as u64;
        for &seat in &winners {
            *winnings.entry(seat).or_insert(0) += share;
        }
        for &seat in winners.iter().take(remainder as usize) {
            *winnings.entry(seat).or_insert(0) += 1;
        }
    }

    winnings
}

/// Sorts seats by clockwise distance from `start` (mod `num_seats`), ascending.
fn clockwise_sort(seats: &mut [usize], start: usize, num_seats: usize) {
    seats.sort_by_key(|&seat| (seat + num_seats - start % num_seats) % num_seats);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{HandEvaluation, HandRank};
    use crate::card::Rank;

    fn eval(rank: HandRank, kickers: &[Rank]) -> HandEvaluation {
        HandEvaluation {
            rank,
            kickers: kickers.to_vec(),
        }
    }

    #[test]
    fn single_pot_when_everyone_matches() {
        let contributions = [
            Contribution { seat: 0, total_committed: 100, still_in: true },
            Contribution { seat: 1, total_committed: 100, still_in: true },
        ];
        let pots = build_pots(&contributions);
        assert_eq!(pots.len(), 1);
        assert_eq!(pots[0].amount, 200);
        assert_eq!(pots[0].eligible_seats, vec![0, 1]);
    }

    #[test]
    fn three_way_allin_produces_main_and_two_side_pots() {
        // stacks [300, 1000, 2000], all in for their full stack preflop.
        let contributions = [
            Contribution { seat: 0, total_committed: 300, still_in: true },
            Contribution { seat: 1, total_committed: 1000, still_in: true },
            Contribution { seat: 2, total_committed: 2000, still_in: true },
        ];
        let pots = build_pots(&contributions);
        assert_eq!(pots.len(), 3);
        assert_eq!(pots[0], Pot { amount: 900, eligible_seats: vec![0, 1, 2] });
        assert_eq!(pots[1], Pot { amount: 1400, eligible_seats: vec![1, 2] });
        assert_eq!(pots[2], Pot { amount: 1000, eligible_seats: vec![2] });
    }

    #[test]
    fn folded_contributor_still_pays_in_but_is_not_eligible() {
        let contributions = [
            Contribution { seat: 0, total_committed: 500, still_in: false },
            Contribution { seat: 1, total_committed: 500, still_in: true },
        ];
        let pots = build_pots(&contributions);
        assert_eq!(pots.len(), 1);
        assert_eq!(pots[0].amount, 1000);
        assert_eq!(pots[0].eligible_seats, vec![1]);
    }

    #[test]
    fn odd_chip_goes_clockwise_from_dealer_plus_one() {
        let mut evals = HashMap::new();
        evals.insert(0, eval(HandRank::OnePair, &[Rank::Ace]));
        evals.insert(1, eval(HandRank::OnePair, &[Rank::Ace]));
        evals.insert(2, eval(HandRank::OnePair, &[Rank::Ace]));
        let pots = vec![Pot { amount: 100, eligible_seats: vec![0, 1, 2] }];

        // dealer = 2, so clockwise from dealer+1=0: order is 0,1,2 -> seat 0 gets the odd chip.
        let winnings = distribute(&pots, &evals, 2, 3);
        assert_eq!(winnings[&0], 34);
        assert_eq!(winnings[&1], 33);
        assert_eq!(winnings[&2], 33);

        // dealer = 0, clockwise from dealer+1=1: order is 1,2,0 -> seat 1 gets the odd chip.
        let winnings = distribute(&pots, &evals, 0, 3);
        assert_eq!(winnings[&1], 34);
        assert_eq!(winnings[&2], 33);
        assert_eq!(winnings[&0], 33);
    }

    #[test]
    fn uncontested_side_pot_returns_to_its_sole_eligible_seat() {
        let mut evals = HashMap::new();
        evals.insert(0, eval(HandRank::OnePair, &[Rank::Two]));
        evals.insert(1, eval(HandRank::TwoPair, &[Rank::King, Rank::Queen, Rank::Jack]));
        evals.insert(2, eval(HandRank::ThreeOfAKind, &[Rank::Eight, Rank::King, Rank::Queen]));
        let contributions = [
            Contribution { seat: 0, total_committed: 300, still_in: true },
            Contribution { seat: 1, total_committed: 1000, still_in: true },
            Contribution { seat: 2, total_committed: 2000, still_in: true },
        ];
        let pots = build_pots(&contributions);
        let winnings = distribute(&pots, &evals, 0, 3);
        // seat 2 has the best hand everywhere it's eligible: all of main + both side pots.
        assert_eq!(winnings[&2], 900 + 1400 + 1000);
        assert!(!winnings.contains_key(&0));
        assert!(!winnings.contains_key(&1));
    }
}
