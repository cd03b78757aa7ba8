use holdem_engine::ActionKind;
use serde::Serialize;
use serde_json::Value;

/// Error taxonomy from the external contract. Each variant carries its own connection policy —
/// see [`ProtocolError::closes_connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    BadJoin,
    BadName,
    TournamentFull,
    TournamentStarted,
    BadJson,
    UnknownType,
    BadAction,
}

impl ProtocolError {
    pub fn code(self) -> &'static str {
        match self {
            ProtocolError::BadJoin => "BAD_JOIN",
            ProtocolError::BadName => "BAD_NAME",
            ProtocolError::TournamentFull => "TOURNAMENT_FULL",
            ProtocolError::TournamentStarted => "TOURNAMENT_STARTED",
            ProtocolError::BadJson => "BAD_JSON",
            ProtocolError::UnknownType => "UNKNOWN_TYPE",
            ProtocolError::BadAction => "BAD_ACTION",
        }
    }

    /// Registration errors and malformed-JSON close the channel; per-message errors during play
    /// keep it open so the bot can retry on its next frame.
    pub fn closes_connection(self) -> bool {
        matches!(
            self,
            ProtocolError::BadJoin
                | ProtocolError::BadName
                | ProtocolError::TournamentFull
                | ProtocolError::TournamentStarted
        )
    }
}

/// A parsed inbound frame. `Join.name` is `None` when the `name` field was absent or not a
/// string — that's still a well-formed envelope, so the caller treats it as `BAD_NAME` rather
/// than `BAD_JOIN`, reserving `BAD_JOIN` for a first frame whose `type` isn't `"join"` at all.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Join { name: Option<String> },
    Action { action: ActionKind },
}

/// Parses a raw text frame into an [`InboundMessage`], or the [`ProtocolError`] it maps to.
/// Parsing happens in two stages so a malformed nested `action` object is reported as
/// `BAD_ACTION` rather than the coarser `BAD_JSON`/`UNKNOWN_TYPE`.
pub fn parse_inbound(text: &str) -> Result<InboundMessage, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ProtocolError::BadJson)?;
    let msg_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::UnknownType)?;

    match msg_type {
        "join" => {
            let name = value.get("name").and_then(Value::as_str).map(str::to_string);
            Ok(InboundMessage::Join { name })
        }
        "action" => {
            let action_value = value.get("action").cloned().ok_or(ProtocolError::BadAction)?;
            let action = serde_json::from_value::<ActionKind>(action_value)
                .map_err(|_| ProtocolError::BadAction)?;
            Ok(InboundMessage::Action { action })
        }
        _ => Err(ProtocolError::UnknownType),
    }
}

/// Validates a join name per the external contract: 1-32 code points, checked for duplicates by
/// the caller (the coordinator owns the live-name registry).
pub fn is_valid_name(name: &str) -> bool {
    let len = name.chars().count();
    (1..=32).contains(&len)
}

/// One seat's hole cards as seen by a particular recipient — the recipient's own cards in the
/// clear, every other seat's masked as `"??"`.
#[derive(Debug, Clone, Serialize)]
pub struct HoleCardsView {
    pub cards: [String; 2],
    pub hole_cards_known: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    pub seat: usize,
    pub name: String,
    pub stack: u64,
    pub is_active: bool,
    pub is_all_in: bool,
    pub current_bet: u64,
    pub hole_cards: HoleCardsView,
}

/// A canonical snapshot of hand state, masked for one specific recipient seat.
#[derive(Debug, Clone, Serialize)]
pub struct GameStateView {
    pub hand_number: u64,
    pub dealer_seat: usize,
    pub street: holdem_engine::Street,
    pub community_cards: Vec<String>,
    pub pot_total: u64,
    pub seats: Vec<SeatView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidActionsWire {
    pub fold: bool,
    pub check: bool,
    pub call: Option<CallWire>,
    pub raise: Option<RaiseWire>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallWire {
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RaiseWire {
    pub min_amount: u64,
    pub max_amount: u64,
}

impl From<holdem_engine::LegalActions> for ValidActionsWire {
    fn from(legal: holdem_engine::LegalActions) -> Self {
        ValidActionsWire {
            fold: legal.fold,
            check: legal.check,
            call: legal.call_amount.map(|amount| CallWire { amount }),
            raise: legal.raise.map(|(min_amount, max_amount)| RaiseWire { min_amount, max_amount }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatSummary {
    pub seat: usize,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WinnerWire {
    pub seat: usize,
    pub name: String,
    pub amount_won: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevealedWire {
    pub seat: usize,
    pub hole_cards: [String; 2],
}

/// Every message the coordinator may send, already masked for the specific recipient.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Waiting {
        seats: Vec<SeatSummary>,
        players_joined: usize,
        min_players: usize,
        max_players: usize,
    },
    GameStart {
        seats: Vec<SeatSummary>,
        starting_stack: u64,
    },
    HandStart {
        hand_number: u64,
        dealer_seat: usize,
        sb_seat: usize,
        bb_seat: usize,
        sb_amount: u64,
        bb_amount: u64,
        game_state: GameStateView,
    },
    ActionRequest {
        actor_seat: usize,
        request_id: String,
        valid_actions: ValidActionsWire,
        deadline_ms: u64,
        game_state: GameStateView,
    },
    ActionResult {
        seat: usize,
        action: ActionKind,
        timed_out: bool,
        invalid: bool,
        game_state: GameStateView,
    },
    HandEnd {
        hand_number: u64,
        winners: Vec<WinnerWire>,
        hole_cards_revealed: Vec<RevealedWire>,
        game_state: GameStateView,
    },
    GameEnd {
        winner_seat: usize,
        winner_name: String,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_join() {
        let parsed = parse_inbound(r#"{"type":"join","name":"Alice"}"#).unwrap();
        assert!(matches!(parsed, InboundMessage::Join { name: Some(ref n) } if n == "Alice"));
    }

    #[test]
    fn invalid_json_is_bad_json() {
        assert_eq!(parse_inbound("not json").unwrap_err(), ProtocolError::BadJson);
    }

    #[test]
    fn unrecognized_type_is_unknown_type() {
        assert_eq!(
            parse_inbound(r#"{"type":"ping"}"#).unwrap_err(),
            ProtocolError::UnknownType
        );
    }

    #[test]
    fn raise_missing_amount_is_bad_action() {
        let err = parse_inbound(r#"{"type":"action","action":{"type":"raise"}}"#).unwrap_err();
        assert_eq!(err, ProtocolError::BadAction);
    }

    #[test]
    fn raise_with_non_integer_amount_is_bad_action() {
        let err = parse_inbound(r#"{"type":"action","action":{"type":"raise","amount":"lots"}}"#)
            .unwrap_err();
        assert_eq!(err, ProtocolError::BadAction);
    }

    #[test]
    fn unknown_action_type_is_bad_action() {
        let err = parse_inbound(r#"{"type":"action","action":{"type":"allin"}}"#).unwrap_err();
        assert_eq!(err, ProtocolError::BadAction);
    }

    #[test]
    fn name_length_bounds() {
        assert!(!is_valid_name(""));
        assert!(is_valid_name("a"));
        assert!(is_valid_name(&"a".repeat(32)));
        assert!(!is_valid_name(&"a".repeat(33)));
    }
}
