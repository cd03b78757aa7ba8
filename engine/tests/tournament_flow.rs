use holdem_engine::{ActionKind, Deck, TournamentManager, STARTING_STACK};

/// Plays every outstanding action_request in the current hand with `check` whenever legal,
/// otherwise `call`, until the hand concludes. Mirrors how a passive bot would behave and is
/// enough to drive a hand from deal to showdown without ever raising.
fn play_hand_passively(tournament: &mut TournamentManager) {
    let mut hand = tournament.start_hand(Deck::new());
    while !hand.is_concluded() {
        let actor = hand.actor_seat.expect("hand not concluded but no actor on the clock");
        let legal = hand.legal_actions_for(actor);
        let action = if legal.check {
            ActionKind::Check
        } else if legal.call_amount.is_some() {
            ActionKind::Call
        } else {
            ActionKind::Fold
        };
        hand.apply_action(actor, action).unwrap();
    }
    let final_stacks = hand.final_stacks();
    tournament.apply_hand_result(&final_stacks);
}

#[test]
fn heads_up_hand_conserves_total_chips_through_showdown() {
    let mut t = TournamentManager::new(STARTING_STACK);
    t.seat_player("Alice".into()).unwrap();
    t.seat_player("Bob".into()).unwrap();

    play_hand_passively(&mut t);

    let total: u64 = t.players.iter().map(|p| p.stack).sum();
    assert_eq!(total, 20_000);
}

#[test]
fn a_heads_up_tournament_played_out_eventually_produces_one_winner() {
    let mut t = TournamentManager::new(STARTING_STACK);
    t.seat_player("Alice".into()).unwrap();
    t.seat_player("Bob".into()).unwrap();

    let mut hands_played = 0;
    while !t.is_finished() {
        play_hand_passively(&mut t);
        hands_played += 1;
        assert!(hands_played < 10_000, "tournament failed to converge");
    }

    let total: u64 = t.players.iter().map(|p| p.stack).sum();
    assert_eq!(total, 20_000);
    assert_eq!(t.active_players().len(), 1);
    assert!(t.winner().is_some());
}

#[test]
fn blinds_step_up_as_the_tournament_progresses() {
    let mut t = TournamentManager::new(STARTING_STACK);
    t.seat_player("A".into()).unwrap();
    t.seat_player("B".into()).unwrap();

    for _ in 0..9 {
        play_hand_passively(&mut t);
    }
    assert_eq!(t.hand_number, 9);

    let hand = t.start_hand(Deck::new());
    assert_eq!(hand.sb_amount, 100);
    assert_eq!(hand.bb_amount, 200);
}
