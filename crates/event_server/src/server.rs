//! The event server core: endpoint ownership, the blocking-accept loop,
//! and batch emission.
//!
//! Accepting on the endpoint is a blocking call with no timeout, so it
//! runs on a dedicated thread. The loop parks on a wake-up channel until
//! the owner requests a connection, performs one blocking accept, records
//! the outcome, and parks again. Disposal stops the loop, unblocks a
//! pending accept with a wake connection to the endpoint, and joins the
//! thread before the listener is released.

use std::io;
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use event_wire::{write_frame, EventRecord, JsonCodec, Message, MessageCodec, WireError};

use crate::buffer::EventBuffers;
use crate::config::EventServerConfig;
use crate::error::EventServerError;
use crate::state::{ConnectionState, StateCell};

/// Notifications the server publishes to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A write failure revealed that the peer is gone. Published once per
    /// detected loss; explicit [`EventServer::disconnect`] calls do not
    /// produce it.
    ConnectionLost,
}

/// State shared between the producer thread and the acceptor thread.
#[derive(Debug)]
struct Shared {
    state: StateCell,
    /// Peer stream slot. The acceptor writes it on a successful accept;
    /// the producer takes it for writes and disconnects.
    peer: Mutex<Option<UnixStream>>,
    /// Tells the acceptor loop to stop before its next accept.
    stop: AtomicBool,
    /// OS identity of the acceptor thread; zero until the thread has
    /// recorded it.
    acceptor_tid: AtomicU64,
}

impl Shared {
    fn peer_slot(&self) -> MutexGuard<'_, Option<UnixStream>> {
        self.peer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Single-peer event-streaming server.
///
/// Owned by exactly one producer thread: `add_event`, `flush`,
/// `disconnect` and `dispose` all take `&mut self`, which is what makes
/// the double buffer and the message-id counter safe without locks. Only
/// the connection state, the stop flag, the thread identity, and the
/// peer-stream slot are shared with the acceptor thread.
pub struct EventServer {
    config: EventServerConfig,
    shared: Arc<Shared>,
    /// Kept alive until the acceptor thread has been joined; the accept
    /// call may still reference the listener until then.
    listener: Option<Arc<UnixListener>>,
    /// Wake-up signal for the acceptor; dropped on disposal so a parked
    /// loop exits.
    accept_requests: Option<Sender<()>>,
    events_tx: Sender<ConnectionEvent>,
    events_rx: Receiver<ConnectionEvent>,
    buffers: EventBuffers,
    next_message_id: u64,
    codec: Arc<dyn MessageCodec>,
    acceptor: Option<JoinHandle<()>>,
    disposed: bool,
}

impl EventServer {
    /// Binds the endpoint, starts the acceptor thread, and immediately
    /// arms waiting for a peer. Uses the bundled JSON codec.
    pub fn bind(config: EventServerConfig) -> Result<Self, EventServerError> {
        Self::with_codec(config, Arc::new(JsonCodec))
    }

    /// Same as [`bind`](Self::bind) with a caller-supplied codec.
    pub fn with_codec(
        config: EventServerConfig,
        codec: Arc<dyn MessageCodec>,
    ) -> Result<Self, EventServerError> {
        let path = &config.socket_path;
        // A socket file left behind by a previous instance would make the
        // bind fail with AddrInUse.
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
        let listener = UnixListener::bind(path).map_err(|source| EventServerError::Bind {
            path: path.clone(),
            source,
        })?;
        let listener = Arc::new(listener);

        let shared = Arc::new(Shared {
            state: StateCell::new(ConnectionState::WaitingToStart),
            peer: Mutex::new(None),
            stop: AtomicBool::new(false),
            acceptor_tid: AtomicU64::new(0),
        });

        // Capacity one: multiple arm requests before the loop wakes up
        // coalesce into a single accept.
        let (accept_tx, accept_rx) = bounded::<()>(1);
        let (events_tx, events_rx) = unbounded();

        let acceptor = thread::Builder::new()
            .name("event-server-accept".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                let listener = Arc::clone(&listener);
                move || accept_loop(shared, listener, accept_rx)
            })
            .map_err(|err| {
                let _ = std::fs::remove_file(&config.socket_path);
                EventServerError::Spawn(err)
            })?;

        let server = Self {
            config,
            shared,
            listener: Some(listener),
            accept_requests: Some(accept_tx),
            events_tx,
            events_rx,
            buffers: EventBuffers::new(),
            next_message_id: 0,
            codec,
            acceptor: Some(acceptor),
            disposed: false,
        };
        server.wait_for_connection();
        info!(
            path = %server.config.socket_path.display(),
            codec = server.codec.name(),
            "event server listening"
        );
        Ok(server)
    }

    /// Whether a peer is currently attached.
    pub fn is_connected(&self) -> bool {
        self.shared.state.load() == ConnectionState::Connected
    }

    /// Current lifecycle state, for diagnostics.
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.load()
    }

    /// Channel on which [`ConnectionEvent`]s are published.
    pub fn connection_events(&self) -> &Receiver<ConnectionEvent> {
        &self.events_rx
    }

    /// Requests that the acceptor (re-)arm and block for a peer.
    /// Idempotent; a no-op while connected or after disposal.
    pub fn wait_for_connection(&self) {
        match self.shared.state.load() {
            ConnectionState::Connected | ConnectionState::Closed => return,
            _ => {}
        }
        if let Some(requests) = &self.accept_requests {
            self.shared.state.store(ConnectionState::Waiting);
            match requests.try_send(()) {
                // A full channel means an accept is already pending.
                Ok(()) | Err(TrySendError::Full(())) => {}
                Err(TrySendError::Disconnected(())) => {
                    warn!("acceptor thread is gone; cannot re-arm")
                }
            }
        }
    }

    /// Enqueues an event into the active buffer. Never blocks and never
    /// fails; the record is held until the next flush while connected.
    pub fn add_event(&mut self, name: impl Into<String>, args: Map<String, Value>) {
        self.buffers.push(EventRecord::new(name, args));
    }

    /// Drains the active buffer and emits it as one `emit` message.
    ///
    /// A no-op when no peer is attached or the buffer is empty. A write
    /// failure is treated as a peer disconnect: the state flips to
    /// [`ConnectionState::Disconnected`], the peer is dropped, and a
    /// [`ConnectionEvent::ConnectionLost`] is published. The drained
    /// records are discarded on success and failure alike.
    pub fn flush(&mut self) {
        if !self.is_connected() || self.buffers.active_is_empty() {
            return;
        }

        let draining = self.buffers.swap();
        let batch = self.buffers.drain(draining);
        let count = batch.len();

        let message = Message::emit(self.next_message_id, batch);
        self.next_message_id += 1;

        let payload = match self.codec.serialize(&message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "dropping batch: codec failure");
                return;
            }
        };
        if payload.len() as u64 > u64::from(self.config.max_frame_len) {
            warn!(
                len = payload.len(),
                max = self.config.max_frame_len,
                "dropping batch: frame exceeds configured limit"
            );
            return;
        }

        debug!(id = message.id, events = count, "emitting event batch");
        let result = {
            let mut peer = self.shared.peer_slot();
            match peer.as_mut() {
                Some(stream) => write_frame(stream, &payload),
                None => Err(WireError::Io(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "no peer stream",
                ))),
            }
        };

        if let Err(err) = result {
            info!(%err, "peer write failed; treating as disconnect");
            self.drop_peer();
            self.shared.state.store(ConnectionState::Disconnected);
            let _ = self.events_tx.send(ConnectionEvent::ConnectionLost);
        }
    }

    /// Drops the current peer without destroying the server. Publishes no
    /// connection-lost event; the owner asked for this.
    pub fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        self.drop_peer();
        self.shared.state.store(ConnectionState::Disconnected);
        info!("peer disconnected by request");
    }

    /// Releases the endpoint and stops the acceptor thread.
    ///
    /// Idempotent and safe during teardown: every failure on this path is
    /// logged and swallowed, never returned. Also runs on `Drop`.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        // Stop first so an accept that completes from here on is
        // recognized as cancelled rather than a new peer.
        self.shared.stop.store(true, Ordering::Release);
        if self.is_connected() {
            self.drop_peer();
        }
        self.shared.state.store(ConnectionState::Closed);

        // Unparks the loop if it is waiting for an arm request.
        self.accept_requests = None;

        if let Some(handle) = self.acceptor.take() {
            // Only unblock a pending accept once the thread has recorded
            // its identity; before that point there is nothing blocking.
            if self.shared.acceptor_tid.load(Ordering::Acquire) != 0 {
                match UnixStream::connect(&self.config.socket_path) {
                    Ok(stream) => {
                        let _ = stream.shutdown(Shutdown::Both);
                    }
                    Err(err) => debug!(%err, "accept wake connection failed"),
                }
            }
            if handle.join().is_err() {
                debug!("acceptor thread panicked during shutdown");
            }
        }
        // Joined (or never started): nothing references the listener now.
        self.listener = None;

        if let Err(err) = std::fs::remove_file(&self.config.socket_path) {
            debug!(%err, "could not remove socket file");
        }
        info!("event server closed");
    }

    fn drop_peer(&self) {
        let mut peer = self.shared.peer_slot();
        if let Some(stream) = peer.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for EventServer {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Blocking accept loop, run on the dedicated acceptor thread.
fn accept_loop(shared: Arc<Shared>, listener: Arc<UnixListener>, requests: Receiver<()>) {
    shared
        .acceptor_tid
        .store(current_thread_id(), Ordering::Release);
    debug!(
        tid = shared.acceptor_tid.load(Ordering::Relaxed),
        "acceptor thread started"
    );

    loop {
        // Parked here while no connection is requested; the channel
        // closing means the server is being disposed.
        if requests.recv().is_err() {
            break;
        }
        if shared.stop.load(Ordering::Acquire) {
            break;
        }

        match listener.accept() {
            Ok((stream, _addr)) => {
                // Publish the stream before flipping to Connected so a
                // flush that observes the new state always finds a peer.
                *shared.peer_slot() = Some(stream);
                if shared
                    .state
                    .transition(ConnectionState::Waiting, ConnectionState::Connected)
                {
                    info!("peer connected");
                } else {
                    // Disposal won the race; this is the wake connection
                    // or a peer that arrived mid-shutdown.
                    if let Some(stream) = shared.peer_slot().take() {
                        let _ = stream.shutdown(Shutdown::Both);
                    }
                    debug!("accept aborted during shutdown");
                    break;
                }
            }
            Err(err) => {
                if shared.stop.load(Ordering::Acquire) {
                    debug!("accept aborted during shutdown");
                } else {
                    error!(%err, "accept failed; no longer accepting connections");
                }
                break;
            }
        }
    }

    debug!("acceptor thread exiting");
}

/// The pthread identity is only a recorded-identity marker used to gate
/// cancellation and for logging; it is never dereferenced.
fn current_thread_id() -> u64 {
    unsafe { libc::pthread_self() as u64 }
}
