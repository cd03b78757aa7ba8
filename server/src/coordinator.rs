use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};

use holdem_engine::{ActionKind, Deck, GameError, HandEngine, HandEvent, TournamentManager};

use crate::config::TournamentConfig;
use crate::protocol::{
    self, GameStateView, InboundMessage, ProtocolError, RevealedWire, SeatSummary, ServerMessage,
    WinnerWire,
};
use crate::view;

pub type ConnId = u64;

/// A message a connection's reader/writer tasks hand to the coordinator. Kept deliberately thin —
/// the coordinator is the single authority over game state, per the one-task-owns-the-state model.
pub enum CoordinatorEvent {
    Connected { conn_id: ConnId, outbound: mpsc::Sender<ServerMessage> },
    Inbound { conn_id: ConnId, text: String },
    Disconnected { conn_id: ConnId },
}

/// Handle the WebSocket layer uses to talk to the coordinator task. Cheap to clone, one per
/// connection.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    pub async fn connected(&self, conn_id: ConnId, outbound: mpsc::Sender<ServerMessage>) {
        let _ = self.tx.send(CoordinatorEvent::Connected { conn_id, outbound }).await;
    }

    pub async fn inbound(&self, conn_id: ConnId, text: String) {
        let _ = self.tx.send(CoordinatorEvent::Inbound { conn_id, text }).await;
    }

    pub async fn disconnected(&self, conn_id: ConnId) {
        let _ = self.tx.send(CoordinatorEvent::Disconnected { conn_id }).await;
    }
}

/// Spawns the coordinator task and returns a handle new connections register with.
pub fn spawn(config: TournamentConfig) -> CoordinatorHandle {
    let (tx, rx) = mpsc::channel(256);
    let coordinator = Coordinator::new(config);
    tokio::spawn(coordinator.run(rx));
    CoordinatorHandle { tx }
}

struct Connection {
    outbound: mpsc::Sender<ServerMessage>,
    seat: Option<usize>,
    seen_first_frame: bool,
}

#[derive(Clone)]
struct PendingAction {
    seat: usize,
    request_id: String,
    deadline: Instant,
}

struct Coordinator {
    config: TournamentConfig,
    connections: HashMap<ConnId, Connection>,
    seat_to_conn: HashMap<usize, ConnId>,
    tournament: TournamentManager,
    hand: Option<HandEngine>,
    pending_action: Option<PendingAction>,
    lobby_deadline: Option<Instant>,
    next_request_id: u64,
}

impl Coordinator {
    fn new(config: TournamentConfig) -> Self {
        let tournament = TournamentManager::new(config.starting_stack);
        Coordinator {
            config,
            connections: HashMap::new(),
            seat_to_conn: HashMap::new(),
            tournament,
            hand: None,
            pending_action: None,
            lobby_deadline: None,
            next_request_id: 0,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<CoordinatorEvent>) {
        loop {
            let wake_at = self.next_wake();
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(wake_at) => {
                    self.handle_deadline_elapsed().await;
                }
            }
            if self.tournament.is_finished() {
                break;
            }
        }
        info!("tournament coordinator shutting down");
    }

    fn next_wake(&self) -> Instant {
        if let Some(pending) = &self.pending_action {
            pending.deadline
        } else if let Some(deadline) = self.lobby_deadline {
            deadline
        } else {
            Instant::now() + Duration::from_secs(3600)
        }
    }

    async fn handle_event(&mut self, event: CoordinatorEvent) {
        match event {
            CoordinatorEvent::Connected { conn_id, outbound } => {
                self.connections.insert(
                    conn_id,
                    Connection { outbound, seat: None, seen_first_frame: false },
                );
            }
            CoordinatorEvent::Disconnected { conn_id } => self.remove_connection(conn_id).await,
            CoordinatorEvent::Inbound { conn_id, text } => self.handle_inbound(conn_id, text).await,
        }
    }

    async fn handle_inbound(&mut self, conn_id: ConnId, text: String) {
        let is_first_frame = match self.connections.get(&conn_id) {
            Some(conn) => !conn.seen_first_frame,
            None => return,
        };
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.seen_first_frame = true;
        }

        let parsed = protocol::parse_inbound(&text);

        if is_first_frame {
            match parsed {
                Ok(InboundMessage::Join { name: Some(name) }) => self.handle_join(conn_id, name).await,
                Ok(InboundMessage::Join { name: None }) => {
                    self.send_error_and_close(conn_id, ProtocolError::BadName).await
                }
                _ => self.send_error_and_close(conn_id, ProtocolError::BadJoin).await,
            }
            return;
        }

        match parsed {
            Err(error) => self.handle_protocol_error(conn_id, error).await,
            Ok(InboundMessage::Join { .. }) => {} // only the first frame may register; later ones are ignored
            Ok(InboundMessage::Action { action }) => self.handle_action(conn_id, action).await,
        }
    }

    async fn handle_protocol_error(&mut self, conn_id: ConnId, error: ProtocolError) {
        self.send_to(conn_id, ServerMessage::Error { code: error.code(), message: error.code().to_string() })
            .await;
        if error.closes_connection() {
            self.remove_connection(conn_id).await;
            return;
        }
        if error == ProtocolError::BadAction {
            let seat = self.connections.get(&conn_id).and_then(|c| c.seat);
            if seat.is_some() && self.pending_action.as_ref().map(|p| p.seat) == seat {
                self.auto_fold_pending(false, true).await;
            }
        }
    }

    async fn handle_join(&mut self, conn_id: ConnId, name: String) {
        if self.tournament.is_started() {
            let code = if self.tournament.seat_count() >= self.config.max_players {
                ProtocolError::TournamentFull
            } else {
                ProtocolError::TournamentStarted
            };
            self.send_error_and_close(conn_id, code).await;
            return;
        }
        if self.tournament.seat_count() >= self.config.max_players {
            self.send_error_and_close(conn_id, ProtocolError::TournamentFull).await;
            return;
        }
        if !protocol::is_valid_name(&name) || self.tournament.name_taken(&name) {
            self.send_error_and_close(conn_id, ProtocolError::BadName).await;
            return;
        }

        let seat = self.tournament.seat_player(name).expect("validated above");
        self.seat_to_conn.insert(seat, conn_id);
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.seat = Some(seat);
        }
        info!(seat, "bot joined");

        self.broadcast_waiting().await;
        self.arm_lobby_timer();
    }

    /// Arms the lobby debounce: `game_start` fires once this deadline elapses with no further
    /// join resetting it. A full lobby gets an immediate (zero-wait) deadline rather than a
    /// special-cased direct call into `begin_game_start`, so there's a single transition path.
    fn arm_lobby_timer(&mut self) {
        if self.tournament.seat_count() >= self.config.max_players {
            self.lobby_deadline = Some(Instant::now());
        } else if self.tournament.seat_count() >= self.config.min_players {
            self.lobby_deadline =
                Some(Instant::now() + Duration::from_secs(self.config.lobby_debounce_secs));
        } else {
            self.lobby_deadline = None;
        }
    }

    async fn handle_deadline_elapsed(&mut self) {
        if let Some(pending) = self.pending_action.clone() {
            if Instant::now() >= pending.deadline {
                self.auto_fold_pending(true, false).await;
            }
            return;
        }
        if let Some(deadline) = self.lobby_deadline {
            if Instant::now() >= deadline {
                self.lobby_deadline = None;
                self.begin_game_start().await;
            }
        }
    }

    async fn begin_game_start(&mut self) {
        self.lobby_deadline = None;
        let seats: Vec<SeatSummary> = self
            .tournament
            .players
            .iter()
            .map(|p| SeatSummary { seat: p.seat, name: p.name.clone() })
            .collect();
        let starting_stack = self.config.starting_stack;
        self.broadcast_to_all(move |_| ServerMessage::GameStart {
            seats: seats.clone(),
            starting_stack,
        })
        .await;

        let deck = self.fresh_deck();
        self.hand = Some(self.tournament.start_hand(deck));
        self.pump_hand_events().await;
    }

    fn fresh_deck(&self) -> Deck {
        let mut deck = Deck::new();
        let mut rng = rand::rng();
        deck.shuffle(&mut rng);
        deck
    }

    async fn handle_action(&mut self, conn_id: ConnId, action: ActionKind) {
        let Some(seat) = self.connections.get(&conn_id).and_then(|c| c.seat) else { return };
        let Some(pending) = self.pending_action.clone() else { return };
        if pending.seat != seat {
            return; // not the current actor: silently discarded
        }
        let Some(hand) = self.hand.as_mut() else { return };
        match hand.apply_action(seat, action) {
            Ok(()) => {
                self.pending_action = None;
                self.pump_hand_events().await;
            }
            Err(err) => {
                warn!(seat, ?err, "action rejected by hand engine");
                self.send_to(
                    conn_id,
                    ServerMessage::Error { code: "BAD_ACTION", message: game_error_message(&err) },
                )
                .await;
                self.auto_fold_pending(false, true).await;
            }
        }
    }

    async fn auto_fold_pending(&mut self, timed_out: bool, invalid: bool) {
        let Some(pending) = self.pending_action.take() else { return };
        if let Some(hand) = self.hand.as_mut() {
            hand.force_fold(pending.seat, timed_out, invalid);
        }
        self.pump_hand_events().await;
    }

    /// Drains and broadcasts every event the hand engine has queued, looping because finishing a
    /// hand (or the tournament) may immediately queue the next hand's opening events too.
    async fn pump_hand_events(&mut self) {
        loop {
            let events = match self.hand.as_mut() {
                Some(hand) => hand.drain_events(),
                None => return,
            };
            if events.is_empty() {
                return;
            }
            for event in events {
                self.handle_hand_event(event).await;
            }
        }
    }

    async fn handle_hand_event(&mut self, event: HandEvent) {
        match event {
            HandEvent::HandStarted { hand_number, dealer_seat, sb_seat, bb_seat, sb_amount, bb_amount } => {
                self.broadcast_per_recipient(|coordinator, seat| {
                    let game_state = coordinator.view_for(seat);
                    ServerMessage::HandStart {
                        hand_number,
                        dealer_seat,
                        sb_seat,
                        bb_seat,
                        sb_amount,
                        bb_amount,
                        game_state,
                    }
                })
                .await;
            }
            HandEvent::ActionRequested { actor_seat, legal_actions } => {
                let request_id = self.next_request_id();
                self.pending_action = Some(PendingAction {
                    seat: actor_seat,
                    request_id: request_id.clone(),
                    deadline: Instant::now() + Duration::from_secs(self.config.action_timeout_secs),
                });
                let deadline_ms = self.config.action_timeout_secs * 1000;
                let valid_actions: protocol::ValidActionsWire = legal_actions.into();
                self.broadcast_per_recipient(move |coordinator, seat| {
                    let game_state = coordinator.view_for(seat);
                    ServerMessage::ActionRequest {
                        actor_seat,
                        request_id: request_id.clone(),
                        valid_actions: valid_actions.clone(),
                        deadline_ms,
                        game_state,
                    }
                })
                .await;
            }
            HandEvent::ActionApplied { seat, action, timed_out, invalid, .. } => {
                self.broadcast_per_recipient(move |coordinator, recipient| {
                    let game_state = coordinator.view_for(recipient);
                    ServerMessage::ActionResult { seat, action, timed_out, invalid, game_state }
                })
                .await;
            }
            HandEvent::StreetDealt { .. } => {
                // No standalone wire message: the next action_request/action_result/hand_end
                // carries the updated board in its game_state.
            }
            HandEvent::HandEnded { winners, hole_cards_revealed, .. } => {
                let hand_number = self.hand.as_ref().map(|h| h.hand_number).unwrap_or_default();
                let winners_wire: Vec<WinnerWire> = winners
                    .iter()
                    .map(|&(seat, amount_won)| WinnerWire {
                        seat,
                        name: self.player_name(seat),
                        amount_won,
                    })
                    .collect();
                let revealed_wire: Vec<RevealedWire> = hole_cards_revealed
                    .iter()
                    .map(|&(seat, cards)| RevealedWire {
                        seat,
                        hole_cards: [cards[0].to_string(), cards[1].to_string()],
                    })
                    .collect();
                self.broadcast_per_recipient(move |coordinator, seat| {
                    let game_state = coordinator.view_for(seat);
                    ServerMessage::HandEnd {
                        hand_number,
                        winners: winners_wire.clone(),
                        hole_cards_revealed: revealed_wire.clone(),
                        game_state,
                    }
                })
                .await;
                self.finish_hand_and_maybe_start_next().await;
            }
        }
    }

    async fn finish_hand_and_maybe_start_next(&mut self) {
        let Some(hand) = self.hand.take() else { return };
        let final_stacks = hand.final_stacks();
        self.tournament.apply_hand_result(&final_stacks);

        if self.tournament.is_finished() {
            let winner_info = self.tournament.winner().map(|w| (w.seat, w.name.clone()));
            if let Some((winner_seat, winner_name)) = winner_info {
                self.broadcast_to_all(move |_| ServerMessage::GameEnd {
                    winner_seat,
                    winner_name: winner_name.clone(),
                })
                .await;
            }
            return;
        }

        let deck = self.fresh_deck();
        self.hand = Some(self.tournament.start_hand(deck));
    }

    fn view_for(&self, seat: usize) -> GameStateView {
        view::project(self.hand.as_ref().expect("hand in progress"), &self.tournament.players, seat)
    }

    fn player_name(&self, seat: usize) -> String {
        self.tournament
            .players
            .iter()
            .find(|p| p.seat == seat)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    fn next_request_id(&mut self) -> String {
        self.next_request_id += 1;
        format!("req-{}", self.next_request_id)
    }

    async fn broadcast_waiting(&mut self) {
        let seats: Vec<SeatSummary> = self
            .tournament
            .players
            .iter()
            .map(|p| SeatSummary { seat: p.seat, name: p.name.clone() })
            .collect();
        let players_joined = seats.len();
        let min_players = self.config.min_players;
        let max_players = self.config.max_players;
        self.broadcast_to_all(move |_| ServerMessage::Waiting {
            seats: seats.clone(),
            players_joined,
            min_players,
            max_players,
        })
        .await;
    }

    async fn broadcast_to_all(&mut self, mut builder: impl FnMut(usize) -> ServerMessage) {
        let targets: Vec<(ConnId, usize)> = self
            .connections
            .iter()
            .filter_map(|(&id, c)| c.seat.map(|seat| (id, seat)))
            .collect();
        for (conn_id, seat) in targets {
            let msg = builder(seat);
            self.send_to(conn_id, msg).await;
        }
    }

    /// Like [`Self::broadcast_to_all`] but the builder also needs `&self` (for view projection),
    /// so it's threaded through explicitly rather than captured, sidestepping the borrow checker.
    async fn broadcast_per_recipient(&mut self, builder: impl Fn(&Coordinator, usize) -> ServerMessage) {
        let targets: Vec<(ConnId, usize)> = self
            .connections
            .iter()
            .filter_map(|(&id, c)| c.seat.map(|seat| (id, seat)))
            .collect();
        for (conn_id, seat) in targets {
            let msg = builder(self, seat);
            self.send_to(conn_id, msg).await;
        }
    }

    async fn send_error_and_close(&mut self, conn_id: ConnId, error: ProtocolError) {
        self.send_to(conn_id, ServerMessage::Error { code: error.code(), message: error.code().to_string() })
            .await;
        self.remove_connection(conn_id).await;
    }

    /// Sends to one connection's bounded outbound queue. A full queue means a hopelessly slow
    /// recipient — it's dropped rather than allowed to backpressure the engine.
    async fn send_to(&mut self, conn_id: ConnId, msg: ServerMessage) {
        let overflowed = match self.connections.get(&conn_id) {
            Some(conn) => conn.outbound.try_send(msg).is_err(),
            None => return,
        };
        if overflowed {
            warn!(conn_id, "outbound queue overflowed, dropping connection");
            self.remove_connection(conn_id).await;
        }
    }

    async fn remove_connection(&mut self, conn_id: ConnId) {
        let Some(conn) = self.connections.remove(&conn_id) else { return };
        let Some(seat) = conn.seat else { return };
        self.seat_to_conn.remove(&seat);
        if self.pending_action.as_ref().map(|p| p.seat) == Some(seat) {
            self.auto_fold_pending(true, false).await;
        }
        if !self.tournament.is_started() {
            self.broadcast_waiting().await;
            self.arm_lobby_timer();
        }
    }
}

fn game_error_message(err: &GameError) -> String {
    err.to_string()
}
