//! Single-peer event-streaming server over a named byte-stream endpoint.
//!
//! The owning process enqueues events with [`EventServer::add_event`] and
//! periodically calls [`EventServer::flush`], which drains the active
//! buffer and writes one length-framed, serialized `emit` message to the
//! connected peer. A dedicated acceptor thread performs the blocking
//! accept so the producer never stalls while no peer is attached.
//!
//! Exactly one peer is served at a time. A write failure during a flush
//! is treated as a peer disconnect: the server flips to a disconnected
//! state and publishes a [`ConnectionEvent::ConnectionLost`] on the
//! channel returned by [`EventServer::connection_events`]; the owner
//! decides if and when to re-arm with
//! [`EventServer::wait_for_connection`].
//!
//! ```no_run
//! use event_server::{EventServer, EventServerConfig};
//! use serde_json::Map;
//!
//! let mut server = EventServer::bind(EventServerConfig::new("/tmp/events.sock"))?;
//! server.add_event("player_spawned", Map::new());
//! server.flush();
//! # Ok::<(), event_server::EventServerError>(())
//! ```

mod buffer;
pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::EventServerConfig;
pub use error::EventServerError;
pub use server::{ConnectionEvent, EventServer};
pub use state::ConnectionState;
