//! Live-session table for the home side of the federation plane.
//!
//! Tracks every session this grid has issued that is currently live —
//! either connected to a local region or traveling on a foreign grid.
//! Read and written from concurrent request handlers; the `RwLock` keeps
//! writes atomic with respect to reads, so a lookup never observes a
//! half-written record. All lock acquisitions are brief map operations
//! that never span an `.await` point, which makes a synchronous lock safe
//! here.

use hypergate_types::AgentCircuitRecord;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// One live session: the circuit that opened it and the external name of
/// the grid the agent is currently on.
#[derive(Debug, Clone)]
pub struct LiveSession {
    pub circuit: AgentCircuitRecord,
    pub grid_external_name: String,
}

#[derive(Default)]
struct Inner {
    by_session: HashMap<Uuid, LiveSession>,
    by_agent: HashMap<Uuid, Uuid>,
}

/// Concurrent table of live sessions, keyed by session id with a
/// per-agent index.
#[derive(Default)]
pub struct SessionTable {
    inner: RwLock<Inner>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the live session for an agent.
    pub fn insert(&self, circuit: AgentCircuitRecord, grid_external_name: impl Into<String>) {
        let mut inner = self.inner.write().expect("session table lock poisoned");
        let session_id = circuit.session_id;
        let agent_id = circuit.agent_id;
        // An agent has at most one live session; drop any stale one.
        if let Some(old) = inner.by_agent.insert(agent_id, session_id) {
            inner.by_session.remove(&old);
        }
        inner.by_session.insert(
            session_id,
            LiveSession {
                circuit,
                grid_external_name: grid_external_name.into(),
            },
        );
    }

    /// Removes a session iff both the session id and the user id match.
    /// Returns whether a session was removed.
    pub fn logout(&self, session_id: Uuid, user_id: Uuid) -> bool {
        let mut inner = self.inner.write().expect("session table lock poisoned");
        let matches = inner
            .by_session
            .get(&session_id)
            .is_some_and(|s| s.circuit.agent_id == user_id);
        if matches {
            inner.by_session.remove(&session_id);
            inner.by_agent.remove(&user_id);
        }
        matches
    }

    /// The live session id for a connected agent, or nil when the agent
    /// is not connected.
    pub fn session_id_for_agent(&self, agent_id: Uuid) -> Uuid {
        let inner = self.inner.read().expect("session table lock poisoned");
        inner.by_agent.get(&agent_id).copied().unwrap_or(Uuid::nil())
    }

    /// A named service URL from the connected agent's circuit.
    pub fn service_url(&self, agent_id: Uuid, key: &str) -> Option<String> {
        let inner = self.inner.read().expect("session table lock poisoned");
        let session_id = inner.by_agent.get(&agent_id)?;
        inner
            .by_session
            .get(session_id)?
            .circuit
            .service_urls
            .get(key)
            .cloned()
    }

    /// The visiting agent presented the right service token for this
    /// session.
    pub fn verify_agent(&self, session_id: Uuid, token: &str) -> bool {
        let inner = self.inner.read().expect("session table lock poisoned");
        inner
            .by_session
            .get(&session_id)
            .is_some_and(|s| s.circuit.service_session_id == token)
    }

    /// Client-level verification: the token must match and the session
    /// must carry a secure session id.
    pub fn verify_client(&self, session_id: Uuid, token: &str) -> bool {
        let inner = self.inner.read().expect("session table lock poisoned");
        inner.by_session.get(&session_id).is_some_and(|s| {
            s.circuit.service_session_id == token && !s.circuit.secure_session_id.is_nil()
        })
    }

    /// True when the session exists and is currently on the grid named
    /// `external_name` — i.e. the agent teleporting out of that grid is
    /// one of ours coming home.
    pub fn agent_is_coming_home(&self, session_id: Uuid, external_name: &str) -> bool {
        let inner = self.inner.read().expect("session table lock poisoned");
        inner
            .by_session
            .get(&session_id)
            .is_some_and(|s| s.grid_external_name == external_name)
    }

    /// Records the grid an agent has moved to, keeping the session live.
    pub fn set_grid_external_name(&self, session_id: Uuid, external_name: impl Into<String>) {
        let mut inner = self.inner.write().expect("session table lock poisoned");
        if let Some(session) = inner.by_session.get_mut(&session_id) {
            session.grid_external_name = external_name.into();
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("session table lock poisoned")
            .by_session
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
