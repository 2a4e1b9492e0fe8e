//! Activity-ordered connection index.
//!
//! The ordering key of a tracked connection is its `last_message_start`
//! timestamp — a value that changes on every message boundary. Holding
//! the connections themselves in an ordered container keyed on a mutable
//! field invites silent corruption, so the index stores `(timestamp, id)`
//! keys externally and every timestamp change goes through an explicit
//! re-key operation ([`message_started`](ConnectionsList::message_started)
//! / [`message_completed`](ConnectionsList::message_completed)).

use std::collections::{BTreeSet, HashMap};

use crate::clock::{monotonic_now_ns, TimestampNs};

/// Newtype for connection identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ConnId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl From<ConnId> for u64 {
    fn from(v: ConnId) -> Self {
        v.0
    }
}

/// Ordering key: idle connections sort before active ones, active ones by
/// timestamp, identity breaks every tie. Unlike a comparator that leans
/// on timestamp uniqueness, the unconditional tiebreak makes this a total
/// order, which `BTreeSet` requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConnKey {
    last_message_start: TimestampNs,
    id: ConnId,
}

impl Ord for ConnKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (
            self.last_message_start.is_idle(),
            other.last_message_start.is_idle(),
        ) {
            (true, true) => self.id.cmp(&other.id),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .last_message_start
                .cmp(&other.last_message_start)
                .then_with(|| self.id.cmp(&other.id)),
        }
    }
}

impl PartialOrd for ConnKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy)]
struct ConnState {
    last_message_start: TimestampNs,
    headers_completed: bool,
}

/// Two ordered sets over tracked connections.
///
/// `all` holds every tracked connection; `active` holds those currently
/// receiving a message. Single-threaded: the host serializes access.
#[derive(Debug, Default)]
pub struct ConnectionsList {
    all: BTreeSet<ConnKey>,
    active: BTreeSet<ConnKey>,
    entries: HashMap<ConnId, ConnState>,
}

impl ConnectionsList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&mut self, id: ConnId) -> ConnState {
        *self.entries.entry(id).or_insert(ConnState {
            last_message_start: TimestampNs::IDLE,
            headers_completed: false,
        })
    }

    fn key(state: ConnState, id: ConnId) -> ConnKey {
        ConnKey {
            last_message_start: state.last_message_start,
            id,
        }
    }

    fn prune(&mut self, id: ConnId) {
        let Some(state) = self.entries.get(&id).copied() else {
            return;
        };
        let key = Self::key(state, id);
        if !self.all.contains(&key) && !self.active.contains(&key) {
            self.entries.remove(&id);
        }
    }

    /// Add a connection to `all`.
    pub fn push(&mut self, id: ConnId) {
        let state = self.state(id);
        self.all.insert(Self::key(state, id));
    }

    /// Remove a connection from `all`.
    pub fn pop(&mut self, id: ConnId) {
        if let Some(state) = self.entries.get(&id) {
            let key = Self::key(*state, id);
            self.all.remove(&key);
        }
        self.prune(id);
    }

    /// Add a connection to `active`.
    pub fn push_active(&mut self, id: ConnId) {
        let state = self.state(id);
        self.active.insert(Self::key(state, id));
    }

    /// Remove a connection from `active`.
    pub fn pop_active(&mut self, id: ConnId) {
        if let Some(state) = self.entries.get(&id) {
            let key = Self::key(*state, id);
            self.active.remove(&key);
        }
        self.prune(id);
    }

    /// Re-key a connection for a message that just started: it leaves
    /// both sets, takes the new timestamp, and re-enters both.
    pub fn message_started(&mut self, id: ConnId, now: TimestampNs) {
        self.pop(id);
        self.pop_active(id);
        let state = ConnState {
            last_message_start: now,
            headers_completed: false,
        };
        self.entries.insert(id, state);
        self.all.insert(Self::key(state, id));
        self.active.insert(Self::key(state, id));
    }

    /// Re-key a connection whose message completed: it becomes idle and
    /// leaves the `active` set.
    pub fn message_completed(&mut self, id: ConnId) {
        self.pop(id);
        self.pop_active(id);
        let state = ConnState {
            last_message_start: TimestampNs::IDLE,
            headers_completed: false,
        };
        self.entries.insert(id, state);
        self.all.insert(Self::key(state, id));
    }

    /// Record that the in-flight message finished its header section, so
    /// the headers deadline no longer applies to it.
    pub fn mark_headers_completed(&mut self, id: ConnId) {
        if let Some(state) = self.entries.get_mut(&id) {
            state.headers_completed = true;
        }
    }

    /// The recorded activity timestamp, if the connection is tracked.
    pub fn last_message_start(&self, id: ConnId) -> Option<TimestampNs> {
        self.entries.get(&id).map(|s| s.last_message_start)
    }

    /// Every tracked connection. Iteration order is not part of the
    /// contract.
    pub fn all(&self) -> Vec<ConnId> {
        self.all.iter().map(|k| k.id).collect()
    }

    /// Tracked connections with no message in flight.
    pub fn idle(&self) -> Vec<ConnId> {
        self.all
            .iter()
            .filter(|k| k.last_message_start.is_idle())
            .map(|k| k.id)
            .collect()
    }

    /// Connections currently receiving a message.
    pub fn active(&self) -> Vec<ConnId> {
        self.active.iter().map(|k| k.id).collect()
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Whether no connections are tracked.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Active connections that have outlived a deadline, removed from the
    /// `active` set (they stay in `all`; the caller decides their fate).
    ///
    /// A connection expires when its headers are still incomplete past
    /// the headers deadline, or its message has been in flight past the
    /// request deadline. A headers timeout looser than the request
    /// timeout is nonsensical, so the two are swapped into order first.
    pub fn expired(&mut self, headers_timeout_ns: u64, request_timeout_ns: u64) -> Vec<ConnId> {
        self.expired_at(monotonic_now_ns(), headers_timeout_ns, request_timeout_ns)
    }

    /// Deterministic variant of [`expired`](ConnectionsList::expired) for
    /// hosts that own the clock.
    pub fn expired_at(
        &mut self,
        now: TimestampNs,
        mut headers_timeout_ns: u64,
        mut request_timeout_ns: u64,
    ) -> Vec<ConnId> {
        if headers_timeout_ns == 0 && request_timeout_ns == 0 {
            return Vec::new();
        }
        if request_timeout_ns > 0 && headers_timeout_ns > request_timeout_ns {
            std::mem::swap(&mut headers_timeout_ns, &mut request_timeout_ns);
        }

        // Early in process life `now` can be smaller than a configured
        // timeout; guard the subtraction instead of wrapping.
        let headers_deadline = if headers_timeout_ns > 0 && now.0 > headers_timeout_ns {
            now.0 - headers_timeout_ns
        } else {
            0
        };
        let request_deadline = if request_timeout_ns > 0 && now.0 > request_timeout_ns {
            now.0 - request_timeout_ns
        } else {
            0
        };
        if headers_deadline == 0 && request_deadline == 0 {
            return Vec::new();
        }

        let keys: Vec<ConnKey> = self.active.iter().copied().collect();
        let mut result = Vec::new();
        for key in keys {
            let headers_completed = self
                .entries
                .get(&key.id)
                .map(|s| s.headers_completed)
                .unwrap_or(false);
            let started = key.last_message_start.0;
            let expired = (!headers_completed && headers_deadline > 0 && started < headers_deadline)
                || (request_deadline > 0 && started < request_deadline);
            if expired {
                self.active.remove(&key);
                result.push(key.id);
            }
        }
        result
    }
}
