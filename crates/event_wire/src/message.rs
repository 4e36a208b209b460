//! Envelope types written to the peer.
//!
//! One [`Message`] is emitted per flushed batch. The field names here are
//! part of the wire contract with the peer tooling and must not change:
//! `event_name`/`args` on each record, and a single `emit` call whose
//! argument list contains exactly one element, the batch array.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single buffered application event.
///
/// Created by `add_event`, appended to the active buffer, immutable
/// thereafter, and consumed when its buffer is drained by a flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_name: String,
    /// Pass-through payload; the server never interprets it.
    pub args: Map<String, Value>,
}

impl EventRecord {
    pub fn new(event_name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            event_name: event_name.into(),
            args,
        }
    }
}

/// The method invocation carried by a [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub method: String,
    /// Single-element list holding the batch array.
    pub args: [Vec<EventRecord>; 1],
}

/// Wire envelope for one emitted batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Monotonically increasing per server instance, never reused.
    pub id: u64,
    pub call: Call,
}

impl Message {
    /// The only method this server invokes on its peer.
    pub const EMIT_METHOD: &'static str = "emit";

    /// Builds the `emit` envelope for a drained batch.
    pub fn emit(id: u64, batch: Vec<EventRecord>) -> Self {
        Self {
            id,
            call: Call {
                method: Self::EMIT_METHOD.to_string(),
                args: [batch],
            },
        }
    }

    /// The batch carried by this message.
    pub fn batch(&self) -> &[EventRecord] {
        &self.call.args[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emit_envelope_has_wire_shape() {
        let mut args = Map::new();
        args.insert("x".to_string(), json!(1));
        let message = Message::emit(
            7,
            vec![
                EventRecord::new("a", Map::new()),
                EventRecord::new("b", args),
            ],
        );

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 7,
                "call": {
                    "method": "emit",
                    "args": [[
                        { "event_name": "a", "args": {} },
                        { "event_name": "b", "args": { "x": 1 } },
                    ]],
                }
            })
        );
    }

    #[test]
    fn envelope_round_trips() {
        let message = Message::emit(0, vec![EventRecord::new("tick", Map::new())]);
        let bytes = serde_json::to_vec(&message).unwrap();
        let parsed: Message = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.batch().len(), 1);
        assert_eq!(parsed.batch()[0].event_name, "tick");
    }
}
