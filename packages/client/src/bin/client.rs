//! Interactive fan-meeting client.
//!
//! Joins a session on the fanmeet relay as the host or as a fan, then reads
//! commands and chat messages from stdin. A failed connection is not retried.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin fanmeet-client -- --session-id fm-1 --name karina --user-id 1 --host
//! cargo run --bin fanmeet-client -- -s fm-1 -n uaena -i 7
//! ```

use clap::Parser;
use fanmeet_client::{
    domain::Identity,
    ui::{ClientOptions, run_client},
};
use fanmeet_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "fanmeet-client")]
#[command(about = "Interactive client for live fan-meeting sessions", long_about = None)]
struct Args {
    /// Session (fan meeting) to join
    #[arg(short = 's', long)]
    session_id: String,

    /// Display name shown to the other participants
    #[arg(short = 'n', long)]
    name: String,

    /// Numeric user id (used for quiz answers and ranks)
    #[arg(short = 'i', long, default_value = "0")]
    user_id: u64,

    /// Join as the host (at most one per session)
    #[arg(long)]
    host: bool,

    /// WebSocket relay URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// REST API base URL
    #[arg(short = 'a', long, default_value = "http://127.0.0.1:8080")]
    api_url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    let args = Args::parse();
    let identity = if args.host {
        Identity::host(args.name, args.user_id)
    } else {
        Identity::fan(args.name, args.user_id)
    };

    let options = ClientOptions {
        url: args.url,
        api_url: args.api_url,
        session_id: args.session_id,
        identity,
    };
    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
