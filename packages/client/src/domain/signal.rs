//! Signal taxonomy: kinds, typed payloads and the outbound/inbound envelopes.
//!
//! Every kind has exactly one payload struct implementing [`SignalPayload`].
//! The wire form of a signal is `{kind, data}` where `data` is the payload
//! serialized as camelCase JSON.

use std::str::FromStr;

use fanmeet_shared::protocol::{Role, websocket::ConnectionInfo};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use super::{
    error::SignalError,
    participant::ConnectionId,
    quiz::{Quiz, Rank},
};

/// Who may send a signal kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalScope {
    Any,
    /// Only the host; receivers drop it from anyone else
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    AudioStatus,
    FanAudioStatus,
    Focus,
    Chat,
    UserAnswer,
    ResetAnswer,
    Quiz,
    RevealAnswer,
    Rank,
    NextCorner,
    NextPhoto,
    StartPhotoTimer,
    EndPhoto,
    CloseSession,
}

impl SignalKind {
    pub const ALL: [SignalKind; 14] = [
        SignalKind::AudioStatus,
        SignalKind::FanAudioStatus,
        SignalKind::Focus,
        SignalKind::Chat,
        SignalKind::UserAnswer,
        SignalKind::ResetAnswer,
        SignalKind::Quiz,
        SignalKind::RevealAnswer,
        SignalKind::Rank,
        SignalKind::NextCorner,
        SignalKind::NextPhoto,
        SignalKind::StartPhotoTimer,
        SignalKind::EndPhoto,
        SignalKind::CloseSession,
    ];

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::AudioStatus => "audioStatus",
            SignalKind::FanAudioStatus => "fanAudioStatus",
            SignalKind::Focus => "focus",
            SignalKind::Chat => "chat",
            SignalKind::UserAnswer => "userAnswer",
            SignalKind::ResetAnswer => "resetAnswer",
            SignalKind::Quiz => "quiz",
            SignalKind::RevealAnswer => "revealAnswer",
            SignalKind::Rank => "rank",
            SignalKind::NextCorner => "nextCorner",
            SignalKind::NextPhoto => "nextPhoto",
            SignalKind::StartPhotoTimer => "startPhotoTimer",
            SignalKind::EndPhoto => "endPhoto",
            SignalKind::CloseSession => "closeSession",
        }
    }

    pub fn scope(self) -> SignalScope {
        match self {
            SignalKind::AudioStatus
            | SignalKind::Focus
            | SignalKind::Chat
            | SignalKind::UserAnswer => SignalScope::Any,
            _ => SignalScope::Host,
        }
    }
}

impl FromStr for SignalKind {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SignalError::UnknownKind(s.to_string()))
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed signal payload bound to its kind.
pub trait SignalPayload: Serialize + DeserializeOwned {
    const KIND: SignalKind;
}

macro_rules! signal_payload {
    ($ty:ty => $kind:ident) => {
        impl SignalPayload for $ty {
            const KIND: SignalKind = SignalKind::$kind;
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStatus {
    pub connection_id: ConnectionId,
    pub audio_active: bool,
}

/// Host → one fan: set your microphone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanAudioStatus {
    pub audio_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Focus {
    pub focused_subscriber: Option<ConnectionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub user: String,
    pub text: String,
    pub is_creator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub user_id: u64,
    pub answer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetAnswer {}

/// Full replacement of the current quiz; `None` clears it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSignal {
    pub quiz: Option<Quiz>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealAnswer {
    pub revealed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankSignal {
    pub ranks: Vec<Rank>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextCorner {
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextPhoto {
    pub sequence: u32,
}

/// Start the shot countdown. `{}` starts it at receipt; `deadline` (Unix
/// epoch milliseconds) lets receivers line up with the host's countdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPhotoTimer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndPhoto {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseSession {
    pub reason: String,
}

signal_payload!(AudioStatus => AudioStatus);
signal_payload!(FanAudioStatus => FanAudioStatus);
signal_payload!(Focus => Focus);
signal_payload!(Chat => Chat);
signal_payload!(UserAnswer => UserAnswer);
signal_payload!(ResetAnswer => ResetAnswer);
signal_payload!(QuizSignal => Quiz);
signal_payload!(RevealAnswer => RevealAnswer);
signal_payload!(RankSignal => Rank);
signal_payload!(NextCorner => NextCorner);
signal_payload!(NextPhoto => NextPhoto);
signal_payload!(StartPhotoTimer => StartPhotoTimer);
signal_payload!(EndPhoto => EndPhoto);
signal_payload!(CloseSession => CloseSession);

/// A signal on its way out. `to = None` broadcasts to the whole session.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundSignal {
    pub kind: SignalKind,
    pub data: serde_json::Value,
    pub to: Option<Vec<ConnectionId>>,
}

impl OutboundSignal {
    pub fn broadcast<P: SignalPayload>(payload: &P) -> Result<Self, SignalError> {
        Ok(Self {
            kind: P::KIND,
            data: encode(payload)?,
            to: None,
        })
    }

    pub fn unicast<P: SignalPayload>(
        payload: &P,
        targets: Vec<ConnectionId>,
    ) -> Result<Self, SignalError> {
        Ok(Self {
            kind: P::KIND,
            data: encode(payload)?,
            to: Some(targets),
        })
    }

    pub fn is_broadcast(&self) -> bool {
        self.to.is_none()
    }

    /// Decode the carried payload back (used by loopback delivery and tests)
    pub fn payload<P: SignalPayload>(&self) -> Result<P, SignalError> {
        decode(self.kind, &self.data)
    }
}

fn encode<P: SignalPayload>(payload: &P) -> Result<serde_json::Value, SignalError> {
    serde_json::to_value(payload).map_err(|e| SignalError::Encode {
        kind: P::KIND,
        reason: e.to_string(),
    })
}

fn decode<P: SignalPayload>(kind: SignalKind, data: &serde_json::Value) -> Result<P, SignalError> {
    if kind != P::KIND {
        return Err(SignalError::KindMismatch {
            expected: P::KIND,
            actual: kind,
        });
    }
    P::deserialize(data).map_err(|e| SignalError::MalformedPayload {
        kind,
        reason: e.to_string(),
    })
}

/// Sender identity stamped by the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSender {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub user_id: u64,
    pub role: Role,
}

impl From<ConnectionInfo> for SignalSender {
    fn from(info: ConnectionInfo) -> Self {
        Self {
            connection_id: ConnectionId::new(info.connection_id),
            display_name: info.display_name,
            user_id: info.user_id,
            role: info.role,
        }
    }
}

/// A signal received from the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundSignal {
    pub kind: SignalKind,
    pub data: serde_json::Value,
    pub from: SignalSender,
}

impl InboundSignal {
    /// Parse the wire kind; unknown kinds are rejected.
    pub fn parse(
        kind: &str,
        data: serde_json::Value,
        from: impl Into<SignalSender>,
    ) -> Result<Self, SignalError> {
        Ok(Self {
            kind: kind.parse()?,
            data,
            from: from.into(),
        })
    }

    pub fn payload<P: SignalPayload>(&self) -> Result<P, SignalError> {
        decode(self.kind, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> SignalSender {
        SignalSender {
            connection_id: ConnectionId::from("con_host"),
            display_name: "IU".to_string(),
            user_id: 1,
            role: Role::Host,
        }
    }

    #[test]
    fn test_every_kind_round_trips_through_its_wire_name() {
        // テスト項目: 全てのシグナル種別がワイヤ名から復元できる
        // given (前提条件):
        let kinds = SignalKind::ALL;

        // when (操作):
        let parsed: Vec<SignalKind> = kinds
            .iter()
            .map(|kind| kind.as_str().parse().unwrap())
            .collect();

        // then (期待する結果):
        assert_eq!(parsed, kinds.to_vec());
        assert!(matches!(
            "dance".parse::<SignalKind>(),
            Err(SignalError::UnknownKind(name)) if name == "dance"
        ));
    }

    #[test]
    fn test_only_participant_kinds_are_open_to_fans() {
        // テスト項目: ファンが送れるのは audioStatus / focus / chat / userAnswer だけ
        // given (前提条件):
        let open: Vec<SignalKind> = SignalKind::ALL
            .into_iter()
            .filter(|kind| kind.scope() == SignalScope::Any)
            .collect();

        // when (操作):

        // then (期待する結果):
        assert_eq!(
            open,
            vec![
                SignalKind::AudioStatus,
                SignalKind::Focus,
                SignalKind::Chat,
                SignalKind::UserAnswer
            ]
        );
    }

    #[test]
    fn test_focus_payload_wire_format() {
        // テスト項目: focus のペイロードが camelCase で null を含めてエンコードされる
        // given (前提条件):
        let cleared = Focus {
            focused_subscriber: None,
        };
        let set = Focus {
            focused_subscriber: Some(ConnectionId::from("con_a")),
        };

        // when (操作):
        let cleared = OutboundSignal::broadcast(&cleared).unwrap();
        let set = OutboundSignal::broadcast(&set).unwrap();

        // then (期待する結果):
        assert_eq!(cleared.data, serde_json::json!({"focusedSubscriber": null}));
        assert_eq!(set.data, serde_json::json!({"focusedSubscriber": "con_a"}));
        assert!(set.is_broadcast());
    }

    #[test]
    fn test_unicast_carries_targets() {
        // テスト項目: ユニキャストのシグナルは宛先を保持する
        // given (前提条件):
        let payload = FanAudioStatus { audio_active: true };

        // when (操作):
        let signal =
            OutboundSignal::unicast(&payload, vec![ConnectionId::from("con_fan")]).unwrap();

        // then (期待する結果):
        assert_eq!(signal.kind, SignalKind::FanAudioStatus);
        assert_eq!(signal.to, Some(vec![ConnectionId::from("con_fan")]));
        assert_eq!(signal.payload::<FanAudioStatus>().unwrap(), payload);
    }

    #[test]
    fn test_malformed_payload_is_reported() {
        // テスト項目: 型の合わないペイロードは MalformedPayload になる
        // given (前提条件):
        let inbound = InboundSignal::parse(
            "nextCorner",
            serde_json::json!({"sequence": "two"}),
            host(),
        )
        .unwrap();

        // when (操作):
        let result = inbound.payload::<NextCorner>();

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(SignalError::MalformedPayload { kind: SignalKind::NextCorner, .. })
        ));
    }

    #[test]
    fn test_payload_of_another_kind_is_a_mismatch() {
        // テスト項目: 別種別のペイロードとして取り出すと KindMismatch になる
        // given (前提条件):
        let inbound =
            InboundSignal::parse("endPhoto", serde_json::json!({}), host()).unwrap();

        // when (操作):
        let result = inbound.payload::<ResetAnswer>();

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SignalError::KindMismatch {
                expected: SignalKind::ResetAnswer,
                actual: SignalKind::EndPhoto,
            })
        );
    }

    #[test]
    fn test_sender_from_connection_info() {
        // テスト項目: リレーが刻印した接続情報から送信者が作られる
        // given (前提条件):
        let info = ConnectionInfo {
            connection_id: "con_fan".to_string(),
            display_name: "uaena".to_string(),
            user_id: 42,
            role: Role::Fan,
            connected_at: 0,
        };

        // when (操作):
        let sender = SignalSender::from(info);

        // then (期待する結果):
        assert_eq!(sender.connection_id.as_str(), "con_fan");
        assert_eq!(sender.user_id, 42);
        assert_eq!(sender.role, Role::Fan);
    }
}
