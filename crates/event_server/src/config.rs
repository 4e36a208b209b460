//! Server configuration.

use std::path::PathBuf;

/// Configuration for an [`EventServer`](crate::EventServer).
#[derive(Debug, Clone)]
pub struct EventServerConfig {
    /// Filesystem path of the socket endpoint. A stale socket file at
    /// this path is removed when the server binds.
    pub socket_path: PathBuf,

    /// Upper bound for a single outbound frame payload. A batch whose
    /// serialized form exceeds this is dropped with a warning rather
    /// than written.
    pub max_frame_len: u32,
}

impl EventServerConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            max_frame_len: event_wire::MAX_FRAME_LEN,
        }
    }
}
