//! Thread-safe many-connection cache for hosts that want concurrent
//! parsing without activity tracking.

use std::hash::Hash;
use std::sync::Mutex;

use dashmap::DashMap;
use h1session::Mode;

use crate::message::Message;
use crate::session::{Session, SessionConfig, SessionError};

/// HTTP/1.x session cache with generic connection keys.
///
/// Uses `DashMap<K, Mutex<Session>>` to provide per-key serialization.
/// The DashMap shard lock is held only briefly (to look up or insert the
/// entry), while the per-key Mutex serializes concurrent same-key calls
/// to `feed()`. This prevents the remove-and-reinsert race where two
/// threads would both create default state for the same key, losing one
/// thread's carry buffer.
pub struct SessionCache<K> {
    connections: DashMap<K, Mutex<Session>>,
    mode: Mode,
    config: SessionConfig,
}

impl<K: Hash + Eq + Clone> SessionCache<K> {
    /// Create a cache whose sessions parse the given protocol side.
    pub fn new(mode: Mode) -> Self {
        Self::with_config(mode, SessionConfig::default())
    }

    /// Create a cache with explicit per-session limits.
    pub fn with_config(mode: Mode, config: SessionConfig) -> Self {
        Self {
            connections: DashMap::new(),
            mode,
            config,
        }
    }

    /// Feed bytes for `key`, creating session state on demand.
    ///
    /// Returns the messages that completed during this feed. An empty
    /// vector just means nothing completed yet — that is not an error.
    pub fn feed(&self, key: K, data: &[u8]) -> Result<Vec<Message>, SessionError> {
        // Atomic insert-if-absent
        self.connections
            .entry(key.clone())
            .or_insert_with(|| Mutex::new(Session::with_config(self.mode, self.config.clone())));

        // Get shared shard read lock + per-key mutex lock
        let entry = self.connections.get(&key).expect("entry was just ensured");
        let mut session = entry.lock().unwrap_or_else(|e| e.into_inner());
        session.feed(data)?;
        Ok(drain(&mut session))
    }

    /// Signal EOF for `key` (connection closed). Completes a
    /// close-delimited response body and returns what finished.
    pub fn finish(&self, key: &K) -> Result<Vec<Message>, SessionError> {
        let Some(entry) = self.connections.get(key) else {
            return Ok(Vec::new());
        };
        let mut session = entry.lock().unwrap_or_else(|e| e.into_inner());
        session.finish()?;
        Ok(drain(&mut session))
    }

    /// Remove session state (call when the connection closes).
    pub fn remove(&self, key: &K) -> Option<Session> {
        self.connections
            .remove(key)
            .map(|(_, mutex)| mutex.into_inner().unwrap_or_else(|e| e.into_inner()))
    }

    /// Check if session state exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.connections.contains_key(key)
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

fn drain(session: &mut Session) -> Vec<Message> {
    let mut out = Vec::new();
    while let Some(message) = session.try_pop() {
        out.push(message);
    }
    out
}
