use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Identity assigned to a connection for its entire lifetime.
///
/// Minted as a random UUID so identities are never reused while active and
/// collisions across reconnects are negligible. A client that drops and
/// reconnects gets a brand new identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn mint() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounded handle to a peer's outbound queue. The per-connection writer task
/// drains the other end; dropping it marks the peer as no longer reachable.
pub type PeerSender = mpsc::Sender<String>;

/// Best-effort delivery to a single peer.
///
/// A full queue drops the frame for that peer rather than blocking the
/// broadcast loop; a closed queue means the peer is already tearing down.
/// Neither case is an error for the caller.
pub fn try_deliver(id: &ClientId, sender: &PeerSender, frame: &str) {
    match sender.try_send(frame.to_string()) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(client_id = %id, "Outbound queue full, dropping frame for slow peer");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(client_id = %id, "Peer outbound queue closed, skipping send");
        }
    }
}

/// Authoritative mapping from live connections to their assigned identities.
///
/// The single piece of state shared across connection tasks. Mutation and
/// snapshotting are brief lock-holding operations; outbound sends never happen
/// under the lock.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Mint a fresh identity and store it with the connection's outbound
    /// handle. The returned identity is never one that is already active.
    async fn register(&self, sender: PeerSender) -> ClientId;

    /// Remove the entry if present. Returns `false` when the identity was
    /// already gone, so duplicate close signals are a safe no-op.
    async fn unregister(&self, id: &ClientId) -> bool;

    /// Whether the identity is currently registered.
    async fn contains(&self, id: &ClientId) -> bool;

    /// Point-in-time copy of every entry except `excluding`, safe to iterate
    /// while the live registry keeps mutating.
    async fn snapshot_others(&self, excluding: &ClientId) -> Vec<(ClientId, PeerSender)>;

    /// All currently registered identities, used to populate `init.others`.
    async fn all_identities(&self) -> Vec<ClientId>;

    /// Number of live registrations.
    async fn len(&self) -> usize;
}

pub struct InMemoryClientRegistry {
    clients: Arc<RwLock<HashMap<ClientId, PeerSender>>>,
}

impl InMemoryClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientRegistry for InMemoryClientRegistry {
    async fn register(&self, sender: PeerSender) -> ClientId {
        let mut clients = self.clients.write().await;
        let mut id = ClientId::mint();
        // UUID collisions are effectively impossible, but the uniqueness
        // invariant is cheap to enforce outright.
        while clients.contains_key(&id) {
            id = ClientId::mint();
        }
        clients.insert(id.clone(), sender);
        id
    }

    async fn unregister(&self, id: &ClientId) -> bool {
        let mut clients = self.clients.write().await;
        clients.remove(id).is_some()
    }

    async fn contains(&self, id: &ClientId) -> bool {
        let clients = self.clients.read().await;
        clients.contains_key(id)
    }

    async fn snapshot_others(&self, excluding: &ClientId) -> Vec<(ClientId, PeerSender)> {
        let clients = self.clients.read().await;
        clients
            .iter()
            .filter(|(id, _)| *id != excluding)
            .map(|(id, sender)| (id.clone(), sender.clone()))
            .collect()
    }

    async fn all_identities(&self) -> Vec<ClientId> {
        let clients = self.clients.read().await;
        clients.keys().cloned().collect()
    }

    async fn len(&self) -> usize {
        let clients = self.clients.read().await;
        clients.len()
    }
}
