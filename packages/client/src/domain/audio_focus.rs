//! Microphone state and focus of every participant, as this client sees it.
//!
//! Audio updates are last-write-wins per connection. Focus changes are never
//! applied locally before the round trip: everyone, the sender included,
//! applies the `focus` broadcast on receipt.

use std::collections::HashMap;

use super::{
    error::SignalError,
    participant::{ConnectionId, Publisher},
    signal::{AudioStatus, FanAudioStatus, Focus, OutboundSignal},
};

#[derive(Debug, Default)]
pub struct AudioFocusCoordinator {
    audio: HashMap<ConnectionId, bool>,
    focused: Option<ConnectionId>,
}

impl AudioFocusCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the own microphone, record it and return the `audioStatus` broadcast.
    pub fn toggle_self_audio(
        &mut self,
        publisher: &mut Publisher,
        me: &ConnectionId,
    ) -> Result<OutboundSignal, SignalError> {
        publisher.audio_active = !publisher.audio_active;
        self.announce_self(publisher, me)
    }

    /// Turn the own microphone off. No-op (and no signal) when already off.
    pub fn mute_self(
        &mut self,
        publisher: &mut Publisher,
        me: &ConnectionId,
    ) -> Result<Option<OutboundSignal>, SignalError> {
        if !publisher.audio_active {
            return Ok(None);
        }
        publisher.audio_active = false;
        self.announce_self(publisher, me).map(Some)
    }

    fn announce_self(
        &mut self,
        publisher: &Publisher,
        me: &ConnectionId,
    ) -> Result<OutboundSignal, SignalError> {
        self.audio.insert(me.clone(), publisher.audio_active);
        OutboundSignal::broadcast(&AudioStatus {
            connection_id: me.clone(),
            audio_active: publisher.audio_active,
        })
    }

    /// Host: ask `target` to set its microphone. The value is recorded
    /// optimistically; the fan's own `audioStatus` confirms it later.
    pub fn remote_set_audio(
        &mut self,
        target: &ConnectionId,
        active: bool,
    ) -> Result<OutboundSignal, SignalError> {
        let signal = OutboundSignal::unicast(
            &FanAudioStatus {
                audio_active: active,
            },
            vec![target.clone()],
        )?;
        self.audio.insert(target.clone(), active);
        Ok(signal)
    }

    /// A `fanAudioStatus` addressed to this client: apply it to the publisher.
    pub fn apply_fan_audio_status(
        &mut self,
        publisher: &mut Publisher,
        me: &ConnectionId,
        active: bool,
    ) {
        publisher.audio_active = active;
        self.audio.insert(me.clone(), active);
    }

    /// Build the `focus` broadcast: focusing the focused participant clears it.
    pub fn toggle_focus(&self, id: &ConnectionId) -> Result<OutboundSignal, SignalError> {
        let focused_subscriber = if self.focused.as_ref() == Some(id) {
            None
        } else {
            Some(id.clone())
        };
        OutboundSignal::broadcast(&Focus { focused_subscriber })
    }

    pub fn apply_audio_status(&mut self, id: ConnectionId, active: bool) {
        self.audio.insert(id, active);
    }

    /// Apply a received focus. An id this client does not know clears it.
    pub fn apply_focus(&mut self, id: Option<ConnectionId>, known: bool) {
        self.focused = match id {
            Some(id) if known => Some(id),
            Some(id) => {
                tracing::debug!("Focus on unknown connection {}; clearing focus", id);
                None
            }
            None => None,
        };
    }

    /// Drop everything about a participant who left. Returns true when the
    /// focus was cleared.
    pub fn forget(&mut self, id: &ConnectionId) -> bool {
        self.audio.remove(id);
        if self.focused.as_ref() == Some(id) {
            self.focused = None;
            return true;
        }
        false
    }

    pub fn is_active(&self, id: &ConnectionId) -> Option<bool> {
        self.audio.get(id).copied()
    }

    pub fn focused(&self) -> Option<&ConnectionId> {
        self.focused.as_ref()
    }

    pub fn clear(&mut self) {
        self.audio.clear();
        self.focused = None;
    }
}
