//! Message formatting utilities for client display.

use fanmeet_shared::time::timestamp_to_kst_rfc3339;

use crate::{
    domain::{ChatMessage, ConnectionId, Participant, TimetableEntry},
    usecase::{SessionState, SessionUpdate},
};

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the participant list of the joined session
    ///
    /// # Arguments
    ///
    /// * `state` - The local session view
    ///
    /// # Returns
    ///
    /// A formatted string listing this client first, then everyone else
    pub fn format_participants(state: &SessionState) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        output.push_str("Participants:\n");

        if let Some(identity) = state.identity() {
            let mic = state
                .local_id()
                .and_then(|id| state.audio().is_active(id))
                .unwrap_or(false);
            output.push_str(&format!(
                "{} (me, {}){}\n",
                identity.display_name,
                identity.role,
                Self::mic_suffix(mic)
            ));
        }
        if state.registry().is_empty() {
            output.push_str("(No one else yet)\n");
        }
        for participant in state.registry().participants() {
            let mic = state
                .audio()
                .is_active(&participant.connection_id)
                .unwrap_or(participant.stream.audio_active);
            let focus = if state.audio().focused() == Some(&participant.connection_id) {
                " [focus]"
            } else {
                ""
            };
            output.push_str(&format!(
                "{} ({}){}{}\n",
                participant.display_name,
                participant.role,
                Self::mic_suffix(mic),
                focus
            ));
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    fn mic_suffix(active: bool) -> &'static str {
        if active { " mic on" } else { " mic off" }
    }

    /// Format a participant-joined notification
    pub fn format_participant_joined(participant: &Participant) -> String {
        format!(
            "\n+ {} ({}) joined\n",
            participant.display_name, participant.role
        )
    }

    /// Format a participant-left notification
    pub fn format_participant_left(participant: &Participant, reason: &str) -> String {
        format!("\n- {} left ({})\n", participant.display_name, reason)
    }

    /// Format a chat message
    ///
    /// # Arguments
    ///
    /// * `message` - The received message
    /// * `color` - The sender's display color (`#RRGGBB`)
    /// * `received_at` - Unix timestamp when the message arrived (milliseconds)
    ///
    /// # Returns
    ///
    /// A formatted string with the chat message
    pub fn format_chat_message(message: &ChatMessage, color: &str, received_at: i64) -> String {
        let badge = if message.is_host { " ★" } else { "" };
        format!(
            "\n\n{}\n\
             @{}{} [{}]: {}\n\
             received at {}\n\
             {}\n",
            THIN_RULE,
            message.sender,
            badge,
            color,
            message.text,
            timestamp_to_kst_rfc3339(received_at),
            THIN_RULE
        )
    }

    /// Format a corner change
    pub fn format_corner(sequence: u32, entry: Option<&TimetableEntry>) -> String {
        match (sequence, entry) {
            (0, _) => "\n>> Waiting room\n".to_string(),
            (_, Some(entry)) if entry.detail.is_empty() => {
                format!("\n>> Corner {}: {}\n", sequence, entry.category_name)
            }
            (_, Some(entry)) => format!(
                "\n>> Corner {}: {} - {}\n",
                sequence, entry.category_name, entry.detail
            ),
            (_, None) => format!("\n>> Corner {}\n", sequence),
        }
    }

    fn name_of(state: &SessionState, id: &ConnectionId) -> String {
        if state.local_id() == Some(id) {
            return "you".to_string();
        }
        state
            .registry()
            .get(id)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Format any session update. Returns `None` for updates not worth a line.
    ///
    /// # Arguments
    ///
    /// * `update` - The update returned by the session manager
    /// * `state` - The local session view after the update was applied
    /// * `now` - Current Unix timestamp (milliseconds)
    pub fn format_update(update: &SessionUpdate, state: &SessionState, now: i64) -> Option<String> {
        let text = match update {
            SessionUpdate::ParticipantJoined(p) => Self::format_participant_joined(p),
            SessionUpdate::ParticipantLeft {
                participant,
                reason,
            } => Self::format_participant_left(participant, reason),
            SessionUpdate::AudioChanged {
                connection_id,
                audio_active,
            } => format!(
                "\n~ {} turned the microphone {}\n",
                Self::name_of(state, connection_id),
                if *audio_active { "on" } else { "off" }
            ),
            SessionUpdate::OwnAudioChanged { audio_active } => format!(
                "\n~ The host turned your microphone {}\n",
                if *audio_active { "on" } else { "off" }
            ),
            SessionUpdate::FocusChanged(Some(id)) => {
                format!("\n* Focus on {}\n", Self::name_of(state, id))
            }
            SessionUpdate::FocusChanged(None) => "\n* Focus cleared\n".to_string(),
            SessionUpdate::ChatReceived { message, color } => {
                Self::format_chat_message(message, color, now)
            }
            SessionUpdate::QuizChanged(Some(quiz)) => {
                format!("\n? Quiz: {} (answer with /answer o|x)\n", quiz.problem)
            }
            SessionUpdate::QuizChanged(None) => "\n? Quiz withdrawn\n".to_string(),
            SessionUpdate::AnswerReceived { .. } => format!(
                "\n? {} answer(s) collected\n",
                state.quiz().answered_count()
            ),
            SessionUpdate::AnswersReset => "\n? Answers reset\n".to_string(),
            SessionUpdate::RevealChanged(true) => {
                let answer = match state.quiz().current() {
                    Some(quiz) if quiz.answer => "O",
                    Some(_) => "X",
                    None => "-",
                };
                format!(
                    "\n? The answer is {} ({} correct)\n",
                    answer,
                    state.quiz().correct_user_ids().len()
                )
            }
            SessionUpdate::RevealChanged(false) => "\n? Answer hidden\n".to_string(),
            SessionUpdate::RanksChanged(ranks) => {
                let mut output = String::from("\n# Ranking\n");
                for (i, rank) in ranks.iter().enumerate() {
                    output.push_str(&format!(
                        "{}. fan {} - {} pt\n",
                        i + 1,
                        rank.fan_id,
                        rank.score
                    ));
                }
                output
            }
            SessionUpdate::CornerChanged { sequence, entry } => {
                Self::format_corner(*sequence, entry.as_ref())
            }
            SessionUpdate::PhotoSequenceChanged(sequence) => format!(
                "\n[photo] Shot {}/{}\n",
                sequence,
                state.photo().total_shots()
            ),
            SessionUpdate::CountdownStarted { remaining } => {
                format!("\n[photo] Get ready... {}\n", remaining)
            }
            SessionUpdate::CountdownTick(remaining) => format!("[photo] {}\n", remaining),
            SessionUpdate::PhotoCaptured { sequence } => {
                format!("\n[photo] *click* shot {} taken\n", sequence)
            }
            SessionUpdate::CaptureCleared => return None,
            SessionUpdate::PhotoEnded => "\n[photo] Photo time is over\n".to_string(),
            SessionUpdate::RecordingStarted {
                record_id,
                sequence,
            } => format!("\n[rec] Recording {} for shot {}\n", record_id, sequence),
            SessionUpdate::RecordingStopped {
                record_id,
                sequence,
            } => format!("\n[rec] Stopped {} after shot {}\n", record_id, sequence),
            SessionUpdate::RecordingFailed(e) => format!("\n[rec] {}\n", e),
            SessionUpdate::SessionEnded { reason } => {
                format!("\n{}\nSession ended: {}\n{}\n", RULE, reason, RULE)
            }
            SessionUpdate::ConnectionLost { reason } => {
                format!("\nConnection lost: {}\n", reason)
            }
            SessionUpdate::TransportWarning { name, message } => {
                format!("\n! {}: {}\n", name, message)
            }
            SessionUpdate::SignalRejected(e) => format!("\n! Ignored a signal: {}\n", e),
        };
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use fanmeet_shared::protocol::Role;
    use uuid::Uuid;

    use super::*;
    use crate::{
        domain::{Quiz, RemoteStream},
        usecase::SessionConfig,
    };

    fn participant(name: &str, role: Role) -> Participant {
        Participant {
            connection_id: ConnectionId::from(format!("con_{}", name)),
            display_name: name.to_string(),
            user_id: 1,
            role,
            stream: RemoteStream {
                stream_id: format!("str_{}", name),
                audio_active: false,
                video_active: true,
            },
        }
    }

    #[test]
    fn test_format_participants_without_others() {
        // テスト項目: 他の参加者がいない場合、適切なメッセージが表示される
        // given (前提条件):
        let state = SessionState::new(&SessionConfig::default());

        // when (操作):
        let result = MessageFormatter::format_participants(&state);

        // then (期待する結果):
        assert!(result.contains("Participants:"));
        assert!(result.contains("(No one else yet)"));
        assert!(result.contains(RULE));
    }

    #[test]
    fn test_format_participant_joined_and_left() {
        // テスト項目: 参加・退出通知に名前と役割・理由が含まれる
        // given (前提条件):
        let host = participant("karina", Role::Host);

        // when (操作):
        let joined = MessageFormatter::format_participant_joined(&host);
        let left = MessageFormatter::format_participant_left(&host, "disconnect");

        // then (期待する結果):
        assert!(joined.contains("+ karina (host) joined"));
        assert!(left.contains("- karina left (disconnect)"));
    }

    #[test]
    fn test_format_chat_message() {
        // テスト項目: チャットメッセージに送信者・色・受信時刻が含まれる
        // given (前提条件):
        let message = ChatMessage {
            id: Uuid::new_v4(),
            sender: "karina".to_string(),
            text: "Hello, world!".to_string(),
            is_host: true,
        };

        // when (操作):
        let result = MessageFormatter::format_chat_message(&message, "#A0B1C2", 1672498800000);

        // then (期待する結果):
        assert!(result.contains("@karina ★ [#A0B1C2]: Hello, world!"));
        assert!(result.contains("received at"));
        assert!(result.contains("2023-01-01"));
        assert!(result.contains(THIN_RULE));
    }

    #[test]
    fn test_format_corner() {
        // テスト項目: コーナー 0 は待合室、それ以外はタイムテーブルの名前で表示される
        // given (前提条件):
        let entry = TimetableEntry {
            category_name: "O/X 퀴즈".to_string(),
            sequence: 3,
            detail: String::new(),
        };

        // when (操作):
        let waiting = MessageFormatter::format_corner(0, None);
        let quiz = MessageFormatter::format_corner(3, Some(&entry));
        let unknown = MessageFormatter::format_corner(9, None);

        // then (期待する結果):
        assert!(waiting.contains("Waiting room"));
        assert!(quiz.contains("Corner 3: O/X 퀴즈"));
        assert!(unknown.contains("Corner 9"));
    }

    #[test]
    fn test_format_update_quiz_and_capture() {
        // テスト項目: クイズ更新は表示され、撮影表示の解除は表示されない
        // given (前提条件):
        let state = SessionState::new(&SessionConfig::default());
        let quiz = SessionUpdate::QuizChanged(Some(Quiz {
            problem: "Is the lightstick blue?".to_string(),
            answer: true,
            total_count: 1,
            detail: String::new(),
        }));

        // when (操作):
        let shown = MessageFormatter::format_update(&quiz, &state, 0);
        let hidden = MessageFormatter::format_update(&SessionUpdate::CaptureCleared, &state, 0);

        // then (期待する結果):
        assert!(shown.unwrap().contains("Is the lightstick blue?"));
        assert!(hidden.is_none());
    }
}
