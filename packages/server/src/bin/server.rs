//! fanmeet signaling relay and session API.
//!
//! Relays signals between the participants of a fan-meeting session and serves
//! the session/recording REST endpoints used by the client.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin fanmeet-server
//! cargo run --bin fanmeet-server -- --host 0.0.0.0 --port 3000 --timetable timetable.json
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use fanmeet_server::{
    domain::TimetableEntry,
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemorySessionRepository},
    ui::{AppState, Server},
};
use fanmeet_shared::{logger::setup_logger, protocol::http::TimetableDto, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "fanmeet-server")]
#[command(about = "Signaling relay and session API for live fan meetings", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// JSON file with the timetable handed out to every opened session
    /// (`[{"categoryName": ..., "sequence": ..., "detail": ...}]`)
    #[arg(short = 't', long)]
    timetable: Option<PathBuf>,

    /// Maximum number of connections per session (host included)
    #[arg(short = 'm', long, default_value = "100")]
    max_participants: usize,
}

fn default_timetable() -> Vec<TimetableEntry> {
    [
        ("오프닝", "인사 및 근황 토크"),
        ("Q&A", "사전 질문 답변"),
        ("O/X 퀴즈", "아티스트에 관한 O/X 퀴즈"),
        ("포토타임", "1:1 네컷 촬영"),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (category_name, detail))| TimetableEntry {
        category_name: category_name.to_string(),
        sequence: i as u32 + 1,
        detail: detail.to_string(),
    })
    .collect()
}

fn load_timetable(path: &PathBuf) -> Result<Vec<TimetableEntry>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<TimetableDto> = serde_json::from_str(&content)?;
    Ok(entries.into_iter().map(TimetableEntry::from).collect())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let timetable = match &args.timetable {
        Some(path) => match load_timetable(path) {
            Ok(timetable) => timetable,
            Err(e) => {
                tracing::error!("Failed to load timetable from {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => default_timetable(),
    };
    tracing::info!("Sessions open with {} corners", timetable.len());

    // 1. Repository / MessagePusher
    let repository = Arc::new(InMemorySessionRepository::default());
    let message_pusher = Arc::new(WebSocketMessagePusher::default());

    // 2. UseCases (AppState)
    let app_state = AppState::new(
        repository,
        message_pusher,
        Arc::new(SystemClock),
        timetable,
        args.max_participants,
    );

    // 3. Server
    let server = Server::new(Arc::new(app_state));
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
