//! Connection tracking above the `h1session` parser.
//!
//! Maintains a set of live HTTP/1.x parsing sessions ordered by activity
//! timestamp, so a host can tell idle from in-flight connections and
//! evict those that blew a headers- or request-level deadline.
//!
//! # Key types
//!
//! - [`ConnectionTracker`] — sessions keyed by [`ConnId`] plus a
//!   [`ConnectionsList`] kept in sync after every feed. Best when you
//!   need idle/active/expired queries over many connections.
//! - [`Session`] — one connection: parser, carry buffer, header-size
//!   enforcement, and assembled [`Message`]s drained via `try_pop()`.
//! - [`ConnectionsList`] — the timestamp-ordered index itself, for hosts
//!   that own their sessions elsewhere.
//! - [`SessionCache`] — thread-safe many-connection cache without
//!   activity tracking.
//!
//! # Example
//!
//! ```
//! use http_conntrack::{ConnId, ConnectionTracker, Mode};
//!
//! let mut tracker = ConnectionTracker::new(Mode::Request);
//!
//! let messages = tracker
//!     .feed(ConnId(7), b"GET /stats HTTP/1.1\r\nHost: example.com\r\n\r\n")
//!     .unwrap();
//! assert_eq!(messages.len(), 1);
//! assert!(messages[0].is_request());
//!
//! // The request completed, so the connection is idle again.
//! assert_eq!(tracker.idle(), vec![ConnId(7)]);
//!
//! // Nothing in flight: no deadline can expire it.
//! assert!(tracker.expired(1, 1).is_empty());
//! ```

mod cache;
mod clock;
mod list;
mod message;
mod session;


use std::collections::HashMap;

pub use cache::SessionCache;
pub use clock::{monotonic_now_ns, TimestampNs};
// Re-export the parser vocabulary hosts need alongside the tracker.
pub use h1session::{ConnectionKind, ErrorCode, Mode, State};
pub use list::{ConnId, ConnectionsList};
pub use message::{HttpRequest, HttpResponse, Message};
pub use session::{Session, SessionConfig, SessionError};

/// Sessions keyed by connection id, with a [`ConnectionsList`] kept in
/// sync after every feed.
///
/// Single-threaded: the host serializes all calls. A connection counts
/// as *active from the moment it is registered* until its first message
/// completes, so a peer that connects and never sends a byte still runs
/// into the headers deadline.
pub struct ConnectionTracker {
    sessions: HashMap<ConnId, Session>,
    list: ConnectionsList,
    mode: Mode,
    config: SessionConfig,
}

impl ConnectionTracker {
    /// Create a tracker whose sessions parse the given protocol side.
    pub fn new(mode: Mode) -> Self {
        Self::with_config(mode, SessionConfig::default())
    }

    /// Create a tracker with explicit per-session limits.
    pub fn with_config(mode: Mode, config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            list: ConnectionsList::new(),
            mode,
            config,
        }
    }

    /// Register a connection. Implied by the first `feed` for an unknown
    /// id; call it eagerly to start the headers-deadline clock at accept
    /// time.
    pub fn insert(&mut self, id: ConnId) {
        self.insert_at(id, monotonic_now_ns());
    }

    /// Deterministic variant of [`insert`](ConnectionTracker::insert).
    pub fn insert_at(&mut self, id: ConnId, now: TimestampNs) {
        let mut session = Session::with_config(self.mode, self.config.clone());
        session.arm_activity(now);
        self.sessions.insert(id, session);
        self.list.message_started(id, now);
    }

    /// Feed a chunk of a connection's byte stream and drain whatever
    /// messages completed. Unknown ids are registered on the fly.
    pub fn feed(&mut self, id: ConnId, data: &[u8]) -> Result<Vec<Message>, SessionError> {
        self.feed_at(id, data, monotonic_now_ns())
    }

    /// Deterministic variant of [`feed`](ConnectionTracker::feed).
    pub fn feed_at(
        &mut self,
        id: ConnId,
        data: &[u8],
        now: TimestampNs,
    ) -> Result<Vec<Message>, SessionError> {
        if !self.sessions.contains_key(&id) {
            self.insert_at(id, now);
        }
        let Some(session) = self.sessions.get_mut(&id) else {
            return Ok(Vec::new());
        };
        let result = session.feed_at(data, now);
        let messages = Self::drain(session);
        self.sync(id);
        result.map(|_| messages)
    }

    /// Signal EOF on a connection. Completes a close-delimited response
    /// body; returns what finished.
    pub fn finish(&mut self, id: ConnId) -> Result<Vec<Message>, SessionError> {
        let Some(session) = self.sessions.get_mut(&id) else {
            return Ok(Vec::new());
        };
        let result = session.finish();
        let messages = Self::drain(session);
        self.sync(id);
        result.map(|_| messages)
    }

    fn drain(session: &mut Session) -> Vec<Message> {
        let mut out = Vec::new();
        while let Some(message) = session.try_pop() {
            out.push(message);
        }
        out
    }

    /// Reconcile the list with the session's activity state. Timestamp
    /// changes must flow through the list's re-key operations.
    fn sync(&mut self, id: ConnId) {
        let Some(session) = self.sessions.get(&id) else {
            return;
        };
        let started = session.last_message_start();
        if started.is_idle() {
            self.list.message_completed(id);
        } else {
            self.list.message_started(id, started);
            if session.headers_completed() {
                self.list.mark_headers_completed(id);
            }
        }
    }

    /// Active connections past a deadline, removed from the active set.
    /// Their sessions stay registered until [`remove`](Self::remove).
    pub fn expired(&mut self, headers_timeout_ns: u64, request_timeout_ns: u64) -> Vec<ConnId> {
        self.list.expired(headers_timeout_ns, request_timeout_ns)
    }

    /// Deterministic variant of [`expired`](ConnectionTracker::expired).
    pub fn expired_at(
        &mut self,
        now: TimestampNs,
        headers_timeout_ns: u64,
        request_timeout_ns: u64,
    ) -> Vec<ConnId> {
        self.list.expired_at(now, headers_timeout_ns, request_timeout_ns)
    }

    /// Drop a connection entirely, returning its session.
    pub fn remove(&mut self, id: ConnId) -> Option<Session> {
        self.list.pop(id);
        self.list.pop_active(id);
        self.sessions.remove(&id)
    }

    /// Borrow a session.
    pub fn get(&self, id: ConnId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Mutably borrow a session (to call `mark_connect`,
    /// `expect_no_body`, …).
    pub fn get_mut(&mut self, id: ConnId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Every tracked connection id.
    pub fn all(&self) -> Vec<ConnId> {
        self.list.all()
    }

    /// Tracked connections with no message in flight.
    pub fn idle(&self) -> Vec<ConnId> {
        self.list.idle()
    }

    /// Connections currently receiving a message.
    pub fn active(&self) -> Vec<ConnId> {
        self.list.active()
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the tracker is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
