//! Interactive client loop.
//!
//! Reads lines on a rustyline thread and interleaves them with session
//! updates on the manager's task. There is no reconnection: a failed connect
//! or a lost connection ends the run.

use std::{io::Write, sync::Arc};

use fanmeet_shared::time::{Clock, SystemClock};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, FanmeetingApi, Identity, RealtimeTransport},
    infrastructure::{api::HttpFanmeetingApi, transport::WebSocketTransport},
    usecase::{SessionConfig, SessionConnectionManager, SessionUpdate},
};

use super::{
    command::{Command, HELP},
    error::ClientError,
    formatter::MessageFormatter,
};

/// Everything needed to join one session
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// WebSocket relay URL, e.g. `ws://127.0.0.1:8080/ws`
    pub url: String,
    /// REST base URL, e.g. `http://127.0.0.1:8080`
    pub api_url: String,
    pub session_id: String,
    pub identity: Identity,
}

/// Redisplay the prompt after printing something
fn redisplay_prompt(name: &str) {
    print!("{}> ", name);
    std::io::stdout().flush().ok();
}

/// Spawn the blocking readline thread. Lines arrive trimmed and non-empty;
/// the channel closes on Ctrl+C, Ctrl+D or a readline error.
fn spawn_readline(prompt: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("{}", ClientError::Readline(e.to_string()));
                return;
            }
        };
        let prompt = format!("{}> ", prompt);
        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("{}", ClientError::Readline(err.to_string()));
                    break;
                }
            }
        }
    });
    input_rx
}

/// Connect with the WebSocket transport and the HTTP API, then run the
/// interactive loop until the user leaves or the session ends.
pub async fn run_client(options: ClientOptions) -> Result<(), ClientError> {
    let transport: Arc<dyn RealtimeTransport> = Arc::new(WebSocketTransport::new(&options.url));
    let api: Arc<dyn FanmeetingApi> = Arc::new(HttpFanmeetingApi::new(&options.api_url));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut manager = SessionConnectionManager::new(transport, api, clock.clone(), SessionConfig::default());

    manager
        .connect(&options.session_id, options.identity.clone())
        .await
        .map_err(|source| ClientError::Connect {
            session_id: options.session_id.clone(),
            source,
        })?;

    let name = options.identity.display_name.clone();
    println!(
        "\nYou are '{}' ({}) in session '{}'. Type /help for commands.",
        name, options.identity.role, options.session_id
    );
    print!("{}", MessageFormatter::format_participants(manager.state()));
    if let Some(entry) = manager.state().room().current_entry() {
        print!(
            "{}",
            MessageFormatter::format_corner(entry.sequence, Some(entry))
        );
    }

    let mut input_rx = spawn_readline(name.clone());

    loop {
        tokio::select! {
            update = manager.step() => {
                let Some(update) = update else {
                    break;
                };
                if let Some(text) = MessageFormatter::format_update(&update, manager.state(), clock.now_millis()) {
                    print!("{}", text);
                }
                if matches!(
                    update,
                    SessionUpdate::SessionEnded { .. } | SessionUpdate::ConnectionLost { .. }
                ) {
                    break;
                }
                redisplay_prompt(&name);
            }
            line = input_rx.recv() => {
                let Some(line) = line else {
                    manager.leave().await;
                    break;
                };
                match Command::parse(&line) {
                    Ok(Command::Leave) => {
                        manager.leave().await;
                        break;
                    }
                    Ok(Command::Close(reason)) => match manager.close(&reason).await {
                        Ok(()) => {
                            println!("Session closed: {}", reason);
                            break;
                        }
                        Err(e) => println!("{}", ClientError::from(e)),
                    },
                    Ok(command) => match execute(&mut manager, command) {
                        Ok(Some(feedback)) => println!("{}", feedback),
                        Ok(None) => {}
                        Err(e) => println!("{}", e),
                    },
                    Err(e) => println!("{}", e),
                }
                redisplay_prompt(&name);
            }
        }
    }

    tracing::info!("Client session ended");
    Ok(())
}

fn resolve(manager: &SessionConnectionManager, name: &str) -> Result<ConnectionId, ClientError> {
    let state = manager.state();
    if let (Some(identity), Some(me)) = (state.identity(), state.local_id())
        && identity.display_name == name
    {
        return Ok(me.clone());
    }
    state
        .registry()
        .find_by_name(name)
        .map(|p| p.connection_id.clone())
        .ok_or_else(|| ClientError::UnknownName(name.to_string()))
}

/// Run one synchronous command; returns an optional line of feedback.
fn execute(manager: &mut SessionConnectionManager, command: Command) -> Result<Option<String>, ClientError> {
    let feedback = match command {
        Command::Help => Some(HELP.to_string()),
        Command::Who => Some(MessageFormatter::format_participants(manager.state())),
        Command::Mic => {
            let active = manager.toggle_self_audio()?;
            Some(format!("Microphone {}", if active { "on" } else { "off" }))
        }
        Command::Mute => manager
            .mute_self()?
            .then(|| "Microphone off".to_string()),
        Command::Video => {
            let active = manager.toggle_self_video()?;
            Some(format!("Camera {}", if active { "on" } else { "off" }))
        }
        Command::FanMic { name, active } => {
            let target = resolve(manager, &name)?;
            let active = match active {
                Some(active) => {
                    manager.remote_set_audio(&target, active)?;
                    active
                }
                None => manager.toggle_remote_audio(&target)?,
            };
            Some(format!(
                "Asked {} to turn the microphone {}",
                name,
                if active { "on" } else { "off" }
            ))
        }
        Command::Focus(name) => {
            let target = resolve(manager, &name)?;
            manager.toggle_focus(&target)?;
            None
        }
        Command::Corner(sequence) => {
            manager.go_to_corner(sequence)?;
            None
        }
        Command::Quiz(quiz) => {
            manager.set_quiz(quiz)?;
            None
        }
        Command::ClearQuiz => {
            manager.clear_quiz()?;
            None
        }
        Command::Answer(answer) => {
            manager.submit_answer(answer)?;
            Some(format!("Answered {}", if answer { "O" } else { "X" }))
        }
        Command::Reset => {
            manager.reset_answers()?;
            None
        }
        Command::Reveal(revealed) => {
            manager.set_reveal(revealed)?;
            None
        }
        Command::Ranks(ranks) => {
            manager.set_ranks(ranks)?;
            None
        }
        Command::PhotoNext => {
            let sequence = manager.advance_photo()?;
            Some(format!(
                "Preparing shot {}/{}...",
                sequence,
                manager.state().photo().total_shots()
            ))
        }
        Command::PhotoStop => {
            manager.stop_recording()?;
            Some("Stopping the recording".to_string())
        }
        Command::PhotoEnd => {
            manager.finish_photo()?;
            None
        }
        Command::PhotoPartner => {
            let partner = manager.pick_photo_partner()?;
            let name = manager
                .state()
                .registry()
                .get(&partner)
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| partner.to_string());
            Some(format!("Next partner: {}", name))
        }
        Command::Chat(text) => {
            manager.post_chat(&text)?;
            None
        }
        // handled by the loop
        Command::Close(_) | Command::Leave => None,
    };
    Ok(feedback)
}
