//! Typed signal dispatch: one handler per kind.

use std::collections::HashMap;

use crate::domain::{
    InboundSignal, OutboundSignal, SignalError, SignalKind, SignalScope, TransportError,
    TransportSession,
};

use super::update::Reaction;

pub type SignalHandler<S> = fn(&mut S, &InboundSignal) -> Result<Reaction, SignalError>;

pub struct SignalBus<S> {
    handlers: HashMap<SignalKind, SignalHandler<S>>,
    enforce_host_scope: bool,
}

impl<S> Default for SignalBus<S> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            enforce_host_scope: false,
        }
    }
}

impl<S> SignalBus<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject host-scoped kinds whose relay-stamped sender is not the host.
    /// Off by default: every signal is applied whoever sent it.
    pub fn with_host_scope(mut self, enforce: bool) -> Self {
        self.enforce_host_scope = enforce;
        self
    }

    /// Register the handler of `kind`. A kind has at most one handler.
    pub fn on_signal(&mut self, kind: SignalKind, handler: SignalHandler<S>) -> Result<(), SignalError> {
        if self.handlers.contains_key(&kind) {
            return Err(SignalError::AlreadyRegistered(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn off_signal(&mut self, kind: SignalKind) -> bool {
        self.handlers.remove(&kind).is_some()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn is_registered(&self, kind: SignalKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler of `signal.kind` against `state`.
    ///
    /// With host scope enforced, host-scoped kinds from anyone but the host
    /// are rejected before the handler runs. A kind without handler yields
    /// `Ok(None)`.
    pub fn dispatch(
        &self,
        state: &mut S,
        signal: &InboundSignal,
    ) -> Result<Option<Reaction>, SignalError> {
        if self.enforce_host_scope
            && signal.kind.scope() == SignalScope::Host
            && !signal.from.role.is_host()
        {
            tracing::warn!(
                "Rejected '{}' from non-host {} ({})",
                signal.kind,
                signal.from.display_name,
                signal.from.connection_id
            );
            return Err(SignalError::Unauthorized {
                kind: signal.kind,
                sender: signal.from.connection_id.to_string(),
            });
        }

        let Some(handler) = self.handlers.get(&signal.kind) else {
            tracing::debug!("No handler for '{}'; dropped", signal.kind);
            return Ok(None);
        };
        tracing::debug!(
            "Dispatching '{}' from {}",
            signal.kind,
            signal.from.connection_id
        );
        handler(state, signal).map(Some)
    }

    /// Fire-and-forget: enqueue on the transport, no ack, no retry.
    pub fn send(
        &self,
        transport: &dyn TransportSession,
        signal: OutboundSignal,
    ) -> Result<(), TransportError> {
        tracing::debug!(
            "Sending '{}' to {}",
            signal.kind,
            if signal.is_broadcast() { "everyone" } else { "targets" }
        );
        transport.signal(signal)
    }
}

#[cfg(test)]
mod tests {
    use fanmeet_shared::protocol::Role;

    use super::*;
    use crate::{
        domain::{ConnectionId, MockTransportSession, SignalSender, signal::NextCorner},
        usecase::update::SessionUpdate,
    };

    #[derive(Default)]
    struct Counter {
        corners: Vec<u32>,
    }

    fn record_corner(state: &mut Counter, signal: &InboundSignal) -> Result<Reaction, SignalError> {
        let payload: NextCorner = signal.payload()?;
        state.corners.push(payload.sequence);
        Ok(Reaction::Update(SessionUpdate::PhotoSequenceChanged(payload.sequence)))
    }

    fn sender(role: Role) -> SignalSender {
        SignalSender {
            connection_id: ConnectionId::from("con_1"),
            display_name: "someone".to_string(),
            user_id: 1,
            role,
        }
    }

    fn next_corner(sequence: u32, role: Role) -> InboundSignal {
        InboundSignal::parse(
            "nextCorner",
            serde_json::json!({ "sequence": sequence }),
            sender(role),
        )
        .unwrap()
    }

    #[test]
    fn test_second_handler_for_same_kind_is_rejected() {
        // テスト項目: 同じ種別に 2 つ目のハンドラを登録するとエラーになる
        // given (前提条件):
        let mut bus = SignalBus::<Counter>::new();
        bus.on_signal(SignalKind::NextCorner, record_corner).unwrap();

        // when (操作):
        let result = bus.on_signal(SignalKind::NextCorner, record_corner);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SignalError::AlreadyRegistered(SignalKind::NextCorner))
        );
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_dispatch_runs_registered_handler() {
        // テスト項目: 登録したハンドラが状態に適用される
        // given (前提条件):
        let mut bus = SignalBus::new();
        bus.on_signal(SignalKind::NextCorner, record_corner).unwrap();
        let mut state = Counter::default();

        // when (操作):
        let reaction = bus.dispatch(&mut state, &next_corner(2, Role::Host)).unwrap();

        // then (期待する結果):
        assert!(reaction.is_some());
        assert_eq!(state.corners, vec![2]);
    }

    #[test]
    fn test_host_scoped_signal_from_fan_is_applied_by_default() {
        // テスト項目: 既定では送信者に関係なくホスト用のシグナルも同じように適用される
        // given (前提条件):
        let mut bus = SignalBus::new();
        bus.on_signal(SignalKind::NextCorner, record_corner).unwrap();
        let mut state = Counter::default();

        // when (操作):
        let result = bus.dispatch(&mut state, &next_corner(3, Role::Fan));

        // then (期待する結果):
        assert!(matches!(result, Ok(Some(_))));
        assert_eq!(state.corners, vec![3]);
    }

    #[test]
    fn test_host_scoped_signal_from_fan_is_unauthorized() {
        // テスト項目: ホスト限定を有効にすると、ファンが送ったホスト用シグナルでは状態が変わらない
        // given (前提条件):
        let mut bus = SignalBus::new().with_host_scope(true);
        bus.on_signal(SignalKind::NextCorner, record_corner).unwrap();
        let mut state = Counter::default();

        // when (操作):
        let result = bus.dispatch(&mut state, &next_corner(3, Role::Fan));

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(SignalError::Unauthorized { kind: SignalKind::NextCorner, .. })
        ));
        assert!(state.corners.is_empty());
    }

    #[test]
    fn test_unhandled_and_deregistered_kinds_are_dropped() {
        // テスト項目: ハンドラのない種別や登録解除した種別は黙って捨てられる
        // given (前提条件):
        let mut bus = SignalBus::new();
        bus.on_signal(SignalKind::NextCorner, record_corner).unwrap();
        let mut state = Counter::default();

        // when (操作):
        let removed = bus.off_signal(SignalKind::NextCorner);
        let result = bus.dispatch(&mut state, &next_corner(1, Role::Host));

        // then (期待する結果):
        assert!(removed);
        assert_eq!(result, Ok(None));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_send_enqueues_on_transport() {
        // テスト項目: send はトランスポートに 1 度だけ渡される
        // given (前提条件):
        let bus = SignalBus::<Counter>::new();
        let mut transport = MockTransportSession::new();
        transport
            .expect_signal()
            .withf(|signal| signal.kind == SignalKind::NextCorner && signal.is_broadcast())
            .times(1)
            .returning(|_| Ok(()));

        // when (操作):
        let result = bus.send(
            &transport,
            OutboundSignal::broadcast(&NextCorner { sequence: 1 }).unwrap(),
        );

        // then (期待する結果):
        assert!(result.is_ok());
    }
}
