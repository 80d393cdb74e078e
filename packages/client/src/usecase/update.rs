//! What the session manager reports to the presentation layer.

use crate::domain::{
    ApiError, ChatMessage, ConnectionId, Participant, Quiz, Rank, SignalError, TimetableEntry,
};

/// One observable change of the local session view.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    ParticipantJoined(Participant),
    ParticipantLeft {
        participant: Participant,
        reason: String,
    },
    AudioChanged {
        connection_id: ConnectionId,
        audio_active: bool,
    },
    /// The host switched this client's microphone
    OwnAudioChanged {
        audio_active: bool,
    },
    FocusChanged(Option<ConnectionId>),
    ChatReceived {
        message: ChatMessage,
        color: String,
    },
    QuizChanged(Option<Quiz>),
    AnswerReceived {
        user_id: u64,
        answer: bool,
    },
    AnswersReset,
    RevealChanged(bool),
    RanksChanged(Vec<Rank>),
    CornerChanged {
        sequence: u32,
        entry: Option<TimetableEntry>,
    },
    PhotoSequenceChanged(u32),
    CountdownStarted {
        remaining: u32,
    },
    CountdownTick(u32),
    PhotoCaptured {
        sequence: u32,
    },
    CaptureCleared,
    PhotoEnded,
    RecordingStarted {
        record_id: String,
        sequence: u32,
    },
    RecordingStopped {
        record_id: String,
        sequence: u32,
    },
    RecordingFailed(ApiError),
    /// The host closed the session; terminal
    SessionEnded {
        reason: String,
    },
    ConnectionLost {
        reason: String,
    },
    TransportWarning {
        name: String,
        message: String,
    },
    SignalRejected(SignalError),
}

/// What a signal handler asks the manager to do after mutating the state.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    Update(SessionUpdate),
    /// The local publisher's flags changed and must be announced to the transport
    PublisherChanged(SessionUpdate),
    StartCountdown { deadline: Option<i64> },
    SessionClosed { reason: String },
    Ignored,
}
