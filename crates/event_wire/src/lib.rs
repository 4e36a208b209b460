//! Wire-level building blocks for the piped event server.
//!
//! This crate defines the envelope the server writes to its peer
//! ([`Message`] carrying a batch of [`EventRecord`]s), the seam to the
//! external serializer ([`MessageCodec`], with [`JsonCodec`] as the
//! bundled implementation), and the length-prefixed framing used on the
//! byte stream ([`write_frame`] / [`read_frame`]).
//!
//! The payload of an event is pass-through data: the server never
//! inspects it, so argument values are plain `serde_json::Value`s.

pub mod codec;
pub mod framing;
pub mod message;

pub use codec::{JsonCodec, MessageCodec};
pub use framing::{read_frame, write_frame, MAX_FRAME_LEN};
pub use message::{Call, EventRecord, Message};

/// Errors produced while serializing or framing a message.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: u64, max: u64 },
}
