use clap::Parser;

/// Tournament-wide constants from the external contract. Every field has a spec-mandated
/// default; the CLI flags exist for local testing against non-default timings.
#[derive(Debug, Clone, Parser)]
#[command(name = "poker-server", about = "No-Limit Hold'em tournament server for bot clients")]
pub struct TournamentConfig {
    /// Address the WebSocket listener binds to.
    #[arg(long, default_value = "0.0.0.0:8765")]
    pub listen_addr: String,

    /// Minimum live bots required before the lobby debounce timer can start.
    #[arg(long, default_value_t = 2)]
    pub min_players: usize,

    /// Maximum bots the lobby will admit.
    #[arg(long, default_value_t = 9)]
    pub max_players: usize,

    /// Seconds of no new joins, once `min_players` is reached, before `game_start`.
    #[arg(long, default_value_t = 5)]
    pub lobby_debounce_secs: u64,

    /// Seconds an actor has to respond to an `action_request` before auto-fold.
    #[arg(long, default_value_t = 30)]
    pub action_timeout_secs: u64,

    /// Starting chip stack for every seated player.
    #[arg(long, default_value_t = holdem_engine::STARTING_STACK)]
    pub starting_stack: u64,

    /// Capacity of each connection's outbound queue before it's dropped as unresponsive.
    #[arg(long, default_value_t = 64)]
    pub outbound_queue_capacity: usize,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        TournamentConfig {
            listen_addr: "0.0.0.0:8765".to_string(),
            min_players: 2,
            max_players: 9,
            lobby_debounce_secs: 5,
            action_timeout_secs: 30,
            starting_stack: holdem_engine::STARTING_STACK,
            outbound_queue_capacity: 64,
        }
    }
}
