//! Codec seam between the server and the external serializer.
//!
//! The server treats serialization as a black box: it hands over a
//! [`Message`] and gets payload bytes back. Alternative codecs plug in
//! behind [`MessageCodec`] without touching the server.

use crate::message::Message;
use crate::WireError;

/// Black-box serializer turning an envelope into payload bytes.
pub trait MessageCodec: Send + Sync {
    fn serialize(&self, message: &Message) -> Result<Vec<u8>, WireError>;

    /// Codec name for logging.
    fn name(&self) -> &'static str;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn serialize(&self, message: &Message) -> Result<Vec<u8>, WireError> {
        serde_json::to_vec(message).map_err(WireError::Serialize)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::EventRecord;
    use serde_json::Map;

    #[test]
    fn json_codec_produces_parseable_payload() {
        let message = Message::emit(3, vec![EventRecord::new("spawned", Map::new())]);
        let payload = JsonCodec.serialize(&message).unwrap();
        let parsed: Message = serde_json::from_slice(&payload).unwrap();
        assert_eq!(parsed.id, 3);
        assert_eq!(parsed.call.method, Message::EMIT_METHOD);
    }
}
