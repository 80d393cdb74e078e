//! Entities
//!
//! ID によって同一性が決まるオブジェクト。Session が集約ルートとなり、
//! 接続とストリームの整合性（ホストは 1 人まで、ストリームの所有者は接続中）を守る。

use super::{
    Role,
    error::SessionDomainError,
    value_object::{ConnectionId, DisplayName, RecordingId, SessionId, StreamId, Timestamp},
};

/// タイムテーブルの 1 コーナー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableEntry {
    pub category_name: String,
    pub sequence: u32,
    pub detail: String,
}

/// セッションへの接続（参加者）
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: ConnectionId,
    pub display_name: DisplayName,
    pub user_id: u64,
    pub role: Role,
    pub connected_at: Timestamp,
}

impl Connection {
    pub fn new(
        display_name: DisplayName,
        user_id: u64,
        role: Role,
        connected_at: Timestamp,
    ) -> Self {
        Self {
            id: ConnectionId::generate(),
            display_name,
            user_id,
            role,
            connected_at,
        }
    }
}

/// 公開中のメディアストリーム
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub id: StreamId,
    pub owner: ConnectionId,
    pub audio_active: bool,
    pub video_active: bool,
    pub created_at: Timestamp,
}

/// 録画
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub id: RecordingId,
    pub session_id: SessionId,
    pub started_at: Timestamp,
    /// 停止済みなら撮影シーケンスと停止時刻
    pub stopped: Option<(u32, Timestamp)>,
}

impl Recording {
    pub fn start(session_id: SessionId, started_at: Timestamp) -> Self {
        Self {
            id: RecordingId::generate(),
            session_id,
            started_at,
            stopped: None,
        }
    }
}

/// ファンミーティングのセッション（集約ルート）
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub timetable: Vec<TimetableEntry>,
    pub connections: Vec<Connection>,
    pub streams: Vec<Stream>,
    pub closed: bool,
    pub created_at: Timestamp,
    max_participants: usize,
}

impl Session {
    pub fn new(
        id: SessionId,
        timetable: Vec<TimetableEntry>,
        max_participants: usize,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            timetable,
            connections: Vec::new(),
            streams: Vec::new(),
            closed: false,
            created_at,
            max_participants,
        }
    }

    /// 接続を追加する
    ///
    /// - クローズ済みのセッションには参加できない
    /// - 定員を超える接続は拒否する
    /// - ホストは 1 セッションにつき 1 人まで
    pub fn add_connection(&mut self, connection: Connection) -> Result<(), SessionDomainError> {
        if self.closed {
            return Err(SessionDomainError::SessionClosed);
        }
        if self.connections.len() >= self.max_participants {
            return Err(SessionDomainError::CapacityExceeded(self.max_participants));
        }
        if connection.role.is_host() && self.host().is_some() {
            return Err(SessionDomainError::HostAlreadyConnected);
        }
        self.connections.push(connection);
        Ok(())
    }

    /// 接続を削除し、その接続が所有していたストリームを返す
    pub fn remove_connection(&mut self, connection_id: &ConnectionId) -> Vec<Stream> {
        self.connections.retain(|c| &c.id != connection_id);
        let (removed, kept) = std::mem::take(&mut self.streams)
            .into_iter()
            .partition(|s| &s.owner == connection_id);
        self.streams = kept;
        removed
    }

    pub fn connection(&self, connection_id: &ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| &c.id == connection_id)
    }

    pub fn host(&self) -> Option<&Connection> {
        self.connections.iter().find(|c| c.role.is_host())
    }

    /// ストリームを追加または更新する。新規作成なら `true` を返す。
    pub fn upsert_stream(&mut self, stream: Stream) -> Result<bool, SessionDomainError> {
        if self.connection(&stream.owner).is_none() {
            return Err(SessionDomainError::UnknownConnection(
                stream.owner.as_str().to_string(),
            ));
        }
        match self.streams.iter_mut().find(|s| s.id == stream.id) {
            Some(existing) => {
                existing.audio_active = stream.audio_active;
                existing.video_active = stream.video_active;
                Ok(false)
            }
            None => {
                self.streams.push(stream);
                Ok(true)
            }
        }
    }

    pub fn remove_stream(&mut self, stream_id: &StreamId) -> Option<Stream> {
        let index = self.streams.iter().position(|s| &s.id == stream_id)?;
        Some(self.streams.remove(index))
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn max_participants(&self) -> usize {
        self.max_participants
    }
}
