use clap::Parser;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::{json, Value};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// A scripted reference bot: joins, then answers every `action_request` addressed to its own
/// seat with a random legal move. Exists to exercise the server end-to-end, not as a strategy.
#[derive(Parser)]
struct Args {
    #[arg(long, default_value = "ws://127.0.0.1:8765/ws")]
    url: String,

    #[arg(long)]
    name: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let (mut ws, _resp) = connect_async(args.url.as_str()).await.expect("connect to server");

    let join = json!({"type": "join", "name": args.name});
    ws.send(Message::Text(join.to_string())).await.expect("send join");

    let mut my_seat: Option<u64> = None;

    while let Some(frame) = ws.next().await {
        let Ok(msg) = frame else { break };
        let Message::Text(text) = msg else { continue };
        let Ok(value) = serde_json::from_str::<Value>(&text) else { continue };
        let msg_type = value.get("type").and_then(Value::as_str).unwrap_or_default();

        match msg_type {
            "hand_start" => {
                if let Some(seats) = value.pointer("/game_state/seats").and_then(Value::as_array) {
                    my_seat = seats
                        .iter()
                        .find(|s| s.get("name").and_then(Value::as_str) == Some(args.name.as_str()))
                        .and_then(|s| s.get("seat"))
                        .and_then(Value::as_u64);
                }
            }
            "action_request" => {
                let actor_seat = value.get("actor_seat").and_then(Value::as_u64);
                if actor_seat.is_some() && actor_seat == my_seat {
                    let action = choose_action(&value);
                    let frame = json!({"type": "action", "action": action});
                    if ws.send(Message::Text(frame.to_string())).await.is_err() {
                        break;
                    }
                }
            }
            "error" => {
                println!("server error: {text}");
            }
            "game_end" => break,
            _ => {}
        }
    }
}

/// Picks uniformly among whatever the `valid_actions` object in an `action_request` allows,
/// preferring a check or call over folding when either is free.
fn choose_action(action_request: &Value) -> Value {
    let valid = &action_request["valid_actions"];
    let can_check = valid.get("check").and_then(Value::as_bool).unwrap_or(false);
    let call = valid.get("call");
    let raise = valid.get("raise");

    if can_check {
        return json!({"type": "check"});
    }

    let mut rng = rand::rng();
    if raise.is_some() && rng.random_bool(0.2) {
        let min = raise.and_then(|r| r.get("min_amount")).and_then(Value::as_u64).unwrap_or(0);
        let max = raise.and_then(|r| r.get("max_amount")).and_then(Value::as_u64).unwrap_or(min);
        let amount = if max > min { rng.random_range(min..=max) } else { min };
        return json!({"type": "raise", "amount": amount});
    }

    if call.is_some() {
        return json!({"type": "call"});
    }

    json!({"type": "fold"})
}
