// MIT License - Copyright (c) 2026 ialarm-mk-core contributors
// Core event stream

use crate::status::PanelState;

/// All events that can be emitted by the core.
///
/// Users subscribe via `panel.subscribe()` to receive a
/// `tokio::sync::broadcast::Receiver<CoreEvent>`.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// Push connection to the panel established
    PushConnected,
    /// Push connection lost or recycled; the listener will reconnect
    PushDisconnected { reason: String },
    /// Panel state refreshed, by a push event or an optimistic command
    /// update. Emitted on every decoded push even when the value is
    /// unchanged.
    StateChanged(PanelState),
    /// Sensor table refreshed by a completed poll cycle
    SensorsUpdated,
    /// A fire-and-forget command or poll failed; state was left unchanged
    CommandFailed {
        operation: &'static str,
        error: String,
    },
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<CoreEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<CoreEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
