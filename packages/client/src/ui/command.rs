//! Parsing of the lines typed at the prompt.
//!
//! A line starting with `/` is a command; anything else is a chat message.

use crate::domain::{Quiz, Rank};

use super::error::ClientError;

/// Help text shown by `/help`
pub const HELP: &str = "\
Commands:
  /help                     show this help
  /who                      list participants
  /mic                      toggle your microphone
  /mute                     turn your microphone off
  /video                    toggle your camera
  /focus <name>             focus a participant for everyone (again to clear)
  /answer <o|x>             answer the current quiz
Host only:
  /fanmic <name> [on|off]   switch a fan's microphone
  /corner <n>               go to corner n (0 = waiting room)
  /quiz <o|x> <problem>     publish a quiz
  /quiz clear               withdraw the quiz
  /reset                    clear the collected answers
  /reveal [off]             reveal (or hide) the answer
  /ranks <fanId:score>...   publish the ranking
  /photo next|stop|end      run the photo corner
  /photo partner            pick a random fan for the next shot
  /close [reason]           close the session for everyone
Anything else is sent as a chat message. /leave or Ctrl+D to quit.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Who,
    Mic,
    Mute,
    Video,
    FanMic { name: String, active: Option<bool> },
    Focus(String),
    Corner(u32),
    Quiz(Quiz),
    ClearQuiz,
    Answer(bool),
    Reset,
    Reveal(bool),
    Ranks(Vec<Rank>),
    PhotoNext,
    PhotoStop,
    PhotoEnd,
    PhotoPartner,
    Close(String),
    Leave,
    Chat(String),
}

fn parse_ox(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "o" | "yes" | "true" => Some(true),
        "x" | "no" | "false" => Some(false),
        _ => None,
    }
}

fn parse_rank(value: &str) -> Option<Rank> {
    let (fan_id, score) = value.split_once(':')?;
    Some(Rank {
        fan_id: fan_id.parse().ok()?,
        score: score.parse().ok()?,
    })
}

impl Command {
    /// Parse one input line. The line is expected to be trimmed and non-empty.
    pub fn parse(line: &str) -> Result<Self, ClientError> {
        let Some(body) = line.strip_prefix('/') else {
            return Ok(Command::Chat(line.to_string()));
        };
        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        match name {
            "help" => Ok(Command::Help),
            "who" => Ok(Command::Who),
            "mic" => Ok(Command::Mic),
            "mute" => Ok(Command::Mute),
            "video" => Ok(Command::Video),
            "fanmic" => {
                const USAGE: &str = "/fanmic <name> [on|off]";
                let active = match args.get(1).copied() {
                    None => None,
                    Some("on") => Some(true),
                    Some("off") => Some(false),
                    Some(_) => return Err(ClientError::Usage(USAGE)),
                };
                match args.first() {
                    Some(name) if args.len() <= 2 => Ok(Command::FanMic {
                        name: name.to_string(),
                        active,
                    }),
                    _ => Err(ClientError::Usage(USAGE)),
                }
            }
            "focus" if !rest.is_empty() => Ok(Command::Focus(rest.to_string())),
            "focus" => Err(ClientError::Usage("/focus <name>")),
            "corner" => rest
                .parse()
                .map(Command::Corner)
                .map_err(|_| ClientError::Usage("/corner <n>")),
            "quiz" if rest == "clear" => Ok(Command::ClearQuiz),
            "quiz" => {
                const USAGE: &str = "/quiz <o|x> <problem>";
                let (answer, problem) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(ClientError::Usage(USAGE))?;
                let answer = parse_ox(answer).ok_or(ClientError::Usage(USAGE))?;
                Ok(Command::Quiz(Quiz {
                    problem: problem.trim().to_string(),
                    answer,
                    total_count: 1,
                    detail: String::new(),
                }))
            }
            "answer" => match args.as_slice() {
                [value] => parse_ox(value)
                    .map(Command::Answer)
                    .ok_or(ClientError::Usage("/answer <o|x>")),
                _ => Err(ClientError::Usage("/answer <o|x>")),
            },
            "reset" => Ok(Command::Reset),
            "reveal" => match rest {
                "" | "on" => Ok(Command::Reveal(true)),
                "off" => Ok(Command::Reveal(false)),
                _ => Err(ClientError::Usage("/reveal [off]")),
            },
            "ranks" => args
                .iter()
                .map(|arg| parse_rank(arg))
                .collect::<Option<Vec<_>>>()
                .map(Command::Ranks)
                .ok_or(ClientError::Usage("/ranks <fanId:score>...")),
            "photo" => match rest {
                "next" => Ok(Command::PhotoNext),
                "stop" => Ok(Command::PhotoStop),
                "end" => Ok(Command::PhotoEnd),
                "partner" => Ok(Command::PhotoPartner),
                _ => Err(ClientError::Usage("/photo next|stop|end|partner")),
            },
            "close" if rest.is_empty() => Ok(Command::Close("closed by host".to_string())),
            "close" => Ok(Command::Close(rest.to_string())),
            "leave" | "quit" | "exit" => Ok(Command::Leave),
            other => Err(ClientError::UnknownCommand(other.to_string())),
        }
    }
}
