//! Conversion logic between domain entities and wire DTOs.

use fanmeet_shared::{
    protocol::{
        http::{ParticipantDetailDto, SessionSummaryDto, TimetableDto},
        websocket::{ConnectionInfo, StreamInfo},
    },
    time::timestamp_to_kst_rfc3339,
};

use crate::domain::{Connection, Session, Stream, TimetableEntry};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&Connection> for ConnectionInfo {
    fn from(connection: &Connection) -> Self {
        Self {
            connection_id: connection.id.as_str().to_string(),
            display_name: connection.display_name.as_str().to_string(),
            user_id: connection.user_id,
            role: connection.role,
            connected_at: connection.connected_at.value(),
        }
    }
}

impl From<&TimetableEntry> for TimetableDto {
    fn from(entry: &TimetableEntry) -> Self {
        Self {
            category_name: entry.category_name.clone(),
            sequence: entry.sequence,
            detail: entry.detail.clone(),
        }
    }
}

impl From<&Session> for SessionSummaryDto {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.as_str().to_string(),
            closed: session.closed,
            participants: session
                .connections
                .iter()
                .map(|c| ParticipantDetailDto {
                    connection_id: c.id.as_str().to_string(),
                    display_name: c.display_name.as_str().to_string(),
                    role: c.role,
                    connected_at: timestamp_to_kst_rfc3339(c.connected_at.value()),
                })
                .collect(),
            created_at: timestamp_to_kst_rfc3339(session.created_at.value()),
        }
    }
}

/// Build the wire description of a stream; `None` when its owner already left.
pub fn stream_info(session: &Session, stream: &Stream) -> Option<StreamInfo> {
    let owner = session.connection(&stream.owner)?;
    Some(StreamInfo {
        stream_id: stream.id.as_str().to_string(),
        connection: owner.into(),
        audio_active: stream.audio_active,
        video_active: stream.video_active,
        created_at: stream.created_at.value(),
    })
}

// ========================================
// DTO → Domain Entity
// ========================================

impl From<TimetableDto> for TimetableEntry {
    fn from(dto: TimetableDto) -> Self {
        Self {
            category_name: dto.category_name,
            sequence: dto.sequence,
            detail: dto.detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, Role, SessionId, StreamId, Timestamp};

    fn session_with_host() -> (Session, Connection) {
        let mut session = Session::new(
            SessionId::new("fm-1".to_string()).unwrap(),
            vec![],
            10,
            Timestamp::new(0),
        );
        let host = Connection::new(
            DisplayName::new("IU".to_string()).unwrap(),
            1,
            Role::Host,
            Timestamp::new(1000),
        );
        session.add_connection(host.clone()).unwrap();
        (session, host)
    }

    #[test]
    fn test_connection_to_dto() {
        // テスト項目: ドメインの Connection が ConnectionInfo に変換される
        // given (前提条件):
        let (_, host) = session_with_host();

        // when (操作):
        let info: ConnectionInfo = (&host).into();

        // then (期待する結果):
        assert_eq!(info.connection_id, host.id.as_str());
        assert_eq!(info.display_name, "IU");
        assert_eq!(info.role, Role::Host);
        assert_eq!(info.connected_at, 1000);
    }

    #[test]
    fn test_stream_info_requires_connected_owner() {
        // テスト項目: 所有者が接続中のストリームだけ StreamInfo に変換される
        // given (前提条件):
        let (mut session, host) = session_with_host();
        let stream = Stream {
            id: StreamId::generate(),
            owner: host.id.clone(),
            audio_active: false,
            video_active: true,
            created_at: Timestamp::new(2000),
        };

        // when (操作):
        let present = stream_info(&session, &stream);
        session.remove_connection(&host.id);
        let orphaned = stream_info(&session, &stream);

        // then (期待する結果):
        let present = present.unwrap();
        assert_eq!(present.connection.display_name, "IU");
        assert!(present.video_active);
        assert!(orphaned.is_none());
    }

    #[test]
    fn test_timetable_dto_round_trip() {
        // テスト項目: タイムテーブルが DTO とドメインの間で変換される
        // given (前提条件):
        let dto = TimetableDto {
            category_name: "퀴즈".to_string(),
            sequence: 2,
            detail: "O/X".to_string(),
        };

        // when (操作):
        let entry: TimetableEntry = dto.clone().into();
        let back: TimetableDto = (&entry).into();

        // then (期待する結果):
        assert_eq!(entry.sequence, 2);
        assert_eq!(back, dto);
    }
}
