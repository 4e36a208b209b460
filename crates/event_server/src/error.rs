//! Error types for the event server.
//!
//! Only construction can fail from the owner's point of view. Runtime
//! I/O failures are folded into the disconnect path and reported through
//! the connection-event channel, never returned as errors.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EventServerError {
    #[error("failed to bind endpoint at {}: {source}", path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn acceptor thread: {0}")]
    Spawn(#[source] io::Error),
}
