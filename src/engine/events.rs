// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Engine lifecycle events

use serde::Serialize;
use tokio::sync::mpsc;

use crate::pipeline::StepKey;

/// Emitted at the entry and exit of a run and at the entry of a status check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    RunStarted { key: StepKey },
    RunDone { key: StepKey, succeeded: bool },
    StatusCheckStarted { key: StepKey },
}

impl EngineEvent {
    pub fn key(&self) -> &StepKey {
        match self {
            Self::RunStarted { key } | Self::RunDone { key, .. } | Self::StatusCheckStarted { key } => {
                key
            }
        }
    }
}

/// Receives engine events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: EngineEvent) {
        match &event {
            EngineEvent::RunStarted { key } => tracing::info!(step = %key, "run started"),
            EngineEvent::RunDone { key, succeeded: true } => {
                tracing::info!(step = %key, "run succeeded")
            }
            EngineEvent::RunDone { key, succeeded: false } => {
                tracing::warn!(step = %key, "run failed")
            }
            EngineEvent::StatusCheckStarted { key } => {
                tracing::debug!(step = %key, "status check")
            }
        }
    }
}

/// Forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: EngineEvent) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        let key = StepKey::new("app", "ci", "build");

        sink.emit(EngineEvent::RunStarted { key: key.clone() });
        sink.emit(EngineEvent::RunDone {
            key: key.clone(),
            succeeded: true,
        });

        assert_eq!(rx.try_recv().unwrap(), EngineEvent::RunStarted { key: key.clone() });
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::RunDone { succeeded: true, .. }
        ));
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(EngineEvent::StatusCheckStarted {
            key: StepKey::new("a", "b", "c"),
        });
    }

    #[test]
    fn test_event_json_shape() {
        let event = EngineEvent::RunDone {
            key: StepKey::new("app", "ci", "build"),
            succeeded: false,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("runDone"));
        assert_eq!(value["key"]["step"], json!("build"));
        assert_eq!(event.key().project, "app");
    }
}
