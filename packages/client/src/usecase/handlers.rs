//! One handler per signal kind, applied to the session state on receipt.

use crate::domain::{
    ChatMessage, InboundSignal, SignalError, SignalKind,
    signal::{
        AudioStatus, Chat, CloseSession, EndPhoto, FanAudioStatus, Focus, NextCorner, NextPhoto,
        QuizSignal, RankSignal, ResetAnswer, RevealAnswer, StartPhotoTimer, UserAnswer,
    },
};

use super::{
    session_manager::SessionState,
    signal_bus::SignalBus,
    update::{Reaction, SessionUpdate},
};

pub(crate) fn register_all(bus: &mut SignalBus<SessionState>) -> Result<(), SignalError> {
    bus.on_signal(SignalKind::AudioStatus, on_audio_status)?;
    bus.on_signal(SignalKind::FanAudioStatus, on_fan_audio_status)?;
    bus.on_signal(SignalKind::Focus, on_focus)?;
    bus.on_signal(SignalKind::Chat, on_chat)?;
    bus.on_signal(SignalKind::UserAnswer, on_user_answer)?;
    bus.on_signal(SignalKind::ResetAnswer, on_reset_answer)?;
    bus.on_signal(SignalKind::Quiz, on_quiz)?;
    bus.on_signal(SignalKind::RevealAnswer, on_reveal_answer)?;
    bus.on_signal(SignalKind::Rank, on_rank)?;
    bus.on_signal(SignalKind::NextCorner, on_next_corner)?;
    bus.on_signal(SignalKind::NextPhoto, on_next_photo)?;
    bus.on_signal(SignalKind::StartPhotoTimer, on_start_photo_timer)?;
    bus.on_signal(SignalKind::EndPhoto, on_end_photo)?;
    bus.on_signal(SignalKind::CloseSession, on_close_session)?;
    Ok(())
}

fn from_self(state: &SessionState, signal: &InboundSignal) -> bool {
    state.local_id.as_ref() == Some(&signal.from.connection_id)
}

fn on_audio_status(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let payload: AudioStatus = signal.payload()?;
    state
        .audio
        .apply_audio_status(payload.connection_id.clone(), payload.audio_active);
    Ok(Reaction::Update(SessionUpdate::AudioChanged {
        connection_id: payload.connection_id,
        audio_active: payload.audio_active,
    }))
}

fn on_fan_audio_status(
    state: &mut SessionState,
    signal: &InboundSignal,
) -> Result<Reaction, SignalError> {
    let payload: FanAudioStatus = signal.payload()?;
    let (Some(publisher), Some(me)) = (state.publisher.as_mut(), state.local_id.as_ref()) else {
        return Ok(Reaction::Ignored);
    };
    state
        .audio
        .apply_fan_audio_status(publisher, me, payload.audio_active);
    Ok(Reaction::PublisherChanged(SessionUpdate::OwnAudioChanged {
        audio_active: payload.audio_active,
    }))
}

fn on_focus(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let payload: Focus = signal.payload()?;
    let known = payload.focused_subscriber.as_ref().is_some_and(|id| {
        state.local_id.as_ref() == Some(id) || state.registry.contains(id)
    });
    state.audio.apply_focus(payload.focused_subscriber, known);
    Ok(Reaction::Update(SessionUpdate::FocusChanged(
        state.audio.focused().cloned(),
    )))
}

fn on_chat(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let payload: Chat = signal.payload()?;
    let message = ChatMessage::from(payload);
    let color = state.chat.apply_chat(message.clone());
    Ok(Reaction::Update(SessionUpdate::ChatReceived { message, color }))
}

fn on_user_answer(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let payload: UserAnswer = signal.payload()?;
    state.quiz.apply_user_answer(payload.user_id, payload.answer);
    Ok(Reaction::Update(SessionUpdate::AnswerReceived {
        user_id: payload.user_id,
        answer: payload.answer,
    }))
}

fn on_reset_answer(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let _: ResetAnswer = signal.payload()?;
    state.quiz.apply_reset();
    Ok(Reaction::Update(SessionUpdate::AnswersReset))
}

fn on_quiz(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let payload: QuizSignal = signal.payload()?;
    state.quiz.apply_quiz(payload.quiz.clone());
    Ok(Reaction::Update(SessionUpdate::QuizChanged(payload.quiz)))
}

fn on_reveal_answer(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let payload: RevealAnswer = signal.payload()?;
    state.quiz.apply_reveal(payload.revealed);
    Ok(Reaction::Update(SessionUpdate::RevealChanged(payload.revealed)))
}

fn on_rank(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let payload: RankSignal = signal.payload()?;
    state.quiz.apply_ranks(payload.ranks.clone());
    Ok(Reaction::Update(SessionUpdate::RanksChanged(payload.ranks)))
}

fn on_next_corner(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let payload: NextCorner = signal.payload()?;
    state.room.apply_next_corner(payload.sequence);
    Ok(Reaction::Update(SessionUpdate::CornerChanged {
        sequence: payload.sequence,
        entry: state.room.current_entry().cloned(),
    }))
}

fn on_next_photo(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let payload: NextPhoto = signal.payload()?;
    if !state.photo.apply_next_photo(payload.sequence) {
        return Ok(Reaction::Ignored);
    }
    Ok(Reaction::Update(SessionUpdate::PhotoSequenceChanged(
        payload.sequence,
    )))
}

fn on_start_photo_timer(
    state: &mut SessionState,
    signal: &InboundSignal,
) -> Result<Reaction, SignalError> {
    let payload: StartPhotoTimer = signal.payload()?;
    // the host started its own countdown before broadcasting
    if from_self(state, signal) {
        return Ok(Reaction::Ignored);
    }
    Ok(Reaction::StartCountdown {
        deadline: payload.deadline,
    })
}

fn on_end_photo(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let _: EndPhoto = signal.payload()?;
    state.photo.apply_end_photo();
    Ok(Reaction::Update(SessionUpdate::PhotoEnded))
}

fn on_close_session(state: &mut SessionState, signal: &InboundSignal) -> Result<Reaction, SignalError> {
    let payload: CloseSession = signal.payload()?;
    if from_self(state, signal) {
        return Ok(Reaction::Ignored);
    }
    Ok(Reaction::SessionClosed {
        reason: payload.reason,
    })
}

#[cfg(test)]
mod tests {
    use fanmeet_shared::protocol::Role;

    use super::*;
    use crate::{
        domain::{ConnectionId, Publisher, SignalSender},
        usecase::SessionConfig,
    };

    fn state() -> SessionState {
        let mut state = SessionState::new(&SessionConfig::default());
        state.local_id = Some(ConnectionId::from("con_me"));
        state.publisher = Some(Publisher::new());
        state
    }

    fn bus() -> SignalBus<SessionState> {
        let mut bus = SignalBus::new();
        register_all(&mut bus).unwrap();
        bus
    }

    fn from(id: &str, role: Role) -> SignalSender {
        SignalSender {
            connection_id: ConnectionId::from(id),
            display_name: id.to_string(),
            user_id: 1,
            role,
        }
    }

    fn inbound(kind: &str, data: serde_json::Value, sender: SignalSender) -> InboundSignal {
        InboundSignal::parse(kind, data, sender).unwrap()
    }

    #[test]
    fn test_every_kind_has_a_handler() {
        // テスト項目: 全てのシグナル種別にハンドラが登録される
        // given (前提条件):
        let bus = bus();

        // when (操作):
        let missing: Vec<SignalKind> = SignalKind::ALL
            .into_iter()
            .filter(|kind| !bus.is_registered(*kind))
            .collect();

        // then (期待する結果):
        assert!(missing.is_empty());
    }

    #[test]
    fn test_fan_audio_status_changes_own_publisher() {
        // テスト項目: fanAudioStatus を受けると自分の Publisher が変わり、トランスポートへの通知が要求される
        // given (前提条件):
        let bus = bus();
        let mut state = state();

        // when (操作):
        let reaction = bus
            .dispatch(
                &mut state,
                &inbound(
                    "fanAudioStatus",
                    serde_json::json!({"audioActive": true}),
                    from("con_host", Role::Host),
                ),
            )
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            reaction,
            Some(Reaction::PublisherChanged(SessionUpdate::OwnAudioChanged {
                audio_active: true
            }))
        );
        assert!(state.publisher.as_ref().unwrap().audio_active);
        assert_eq!(state.audio.is_active(&ConnectionId::from("con_me")), Some(true));
    }

    #[test]
    fn test_focus_on_self_is_kept_and_unknown_is_cleared() {
        // テスト項目: 自分へのフォーカスは有効、未知の接続へのフォーカスは解除になる
        // given (前提条件):
        let bus = bus();
        let mut state = state();
        let host = from("con_host", Role::Host);

        // when (操作):
        let on_me = bus
            .dispatch(
                &mut state,
                &inbound("focus", serde_json::json!({"focusedSubscriber": "con_me"}), host.clone()),
            )
            .unwrap();
        let on_ghost = bus
            .dispatch(
                &mut state,
                &inbound("focus", serde_json::json!({"focusedSubscriber": "con_ghost"}), host),
            )
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            on_me,
            Some(Reaction::Update(SessionUpdate::FocusChanged(Some(
                ConnectionId::from("con_me")
            ))))
        );
        assert_eq!(
            on_ghost,
            Some(Reaction::Update(SessionUpdate::FocusChanged(None)))
        );
    }

    #[test]
    fn test_own_photo_timer_echo_is_ignored() {
        // テスト項目: 自分が送った startPhotoTimer のエコーは無視され、他者からのものはカウントダウンを要求する
        // given (前提条件):
        let bus = bus();
        let mut host_state = state();
        host_state.local_id = Some(ConnectionId::from("con_host"));
        let mut fan_state = state();
        let signal = inbound(
            "startPhotoTimer",
            serde_json::json!({"deadline": 1_700_000_005_000_i64}),
            from("con_host", Role::Host),
        );

        // when (操作):
        let echo = bus.dispatch(&mut host_state, &signal).unwrap();
        let received = bus.dispatch(&mut fan_state, &signal).unwrap();

        // then (期待する結果):
        assert_eq!(echo, Some(Reaction::Ignored));
        assert_eq!(
            received,
            Some(Reaction::StartCountdown {
                deadline: Some(1_700_000_005_000)
            })
        );
    }

    #[test]
    fn test_photo_timer_without_deadline_starts_countdown() {
        // テスト項目: 締め切りのない startPhotoTimer {} でもカウントダウンが要求される
        // given (前提条件):
        let bus = bus();
        let mut state = state();
        let signal = inbound(
            "startPhotoTimer",
            serde_json::json!({}),
            from("con_host", Role::Host),
        );

        // when (操作):
        let reaction = bus.dispatch(&mut state, &signal).unwrap();

        // then (期待する結果):
        assert_eq!(reaction, Some(Reaction::StartCountdown { deadline: None }));
    }

    #[test]
    fn test_malformed_payload_leaves_state_untouched() {
        // テスト項目: 不正なペイロードはエラーになり、状態は変わらない
        // given (前提条件):
        let bus = bus();
        let mut state = state();

        // when (操作):
        let result = bus.dispatch(
            &mut state,
            &inbound(
                "nextCorner",
                serde_json::json!({"seq": 2}),
                from("con_host", Role::Host),
            ),
        );

        // then (期待する結果):
        assert!(matches!(result, Err(SignalError::MalformedPayload { .. })));
        assert_eq!(state.room.current_corner(), 0);
    }

    #[test]
    fn test_close_session_from_host_closes() {
        // テスト項目: ホストからの closeSession でセッション終了が要求される
        // given (前提条件):
        let bus = bus();
        let mut state = state();

        // when (操作):
        let reaction = bus
            .dispatch(
                &mut state,
                &inbound(
                    "closeSession",
                    serde_json::json!({"reason": "팬미팅이 종료되었습니다"}),
                    from("con_host", Role::Host),
                ),
            )
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            reaction,
            Some(Reaction::SessionClosed {
                reason: "팬미팅이 종료되었습니다".to_string()
            })
        );
    }
}
