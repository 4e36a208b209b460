//! Connection lifecycle state shared between the producer and acceptor
//! threads.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the single peer connection.
///
/// The producer thread writes `Waiting`, `Disconnected` and `Closed`;
/// the acceptor thread writes `Connected` after a successful accept.
/// That split keeps every transition single-writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Server constructed, accepting not yet armed.
    WaitingToStart = 0,
    /// Accept request outstanding; the acceptor is blocking or about to.
    Waiting = 1,
    /// Accept succeeded; writes are permitted.
    Connected = 2,
    /// Peer gone or explicitly dropped; not accepting until re-armed.
    Disconnected = 3,
    /// Terminal; resources released.
    Closed = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::WaitingToStart,
            1 => Self::Waiting,
            2 => Self::Connected,
            3 => Self::Disconnected,
            _ => Self::Closed,
        }
    }
}

/// Atomic cell holding a [`ConnectionState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Transition that must not overwrite a concurrent change, in
    /// particular `Closed` during disposal. Returns whether it applied.
    pub fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_cell() {
        let cell = StateCell::new(ConnectionState::WaitingToStart);
        assert_eq!(cell.load(), ConnectionState::WaitingToStart);

        cell.store(ConnectionState::Connected);
        assert_eq!(cell.load(), ConnectionState::Connected);
    }

    #[test]
    fn transition_only_applies_from_the_expected_state() {
        let cell = StateCell::new(ConnectionState::Waiting);
        assert!(cell.transition(ConnectionState::Waiting, ConnectionState::Connected));
        assert!(!cell.transition(ConnectionState::Waiting, ConnectionState::Disconnected));
        assert_eq!(cell.load(), ConnectionState::Connected);
    }
}
