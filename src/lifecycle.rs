use std::sync::Arc;

use tracing::info;

use crate::registry::{try_deliver, ClientId, ClientRegistry, PeerSender};
use crate::websockets::messages::Frame;

/// Orchestrates the connect/disconnect sequence: identity assignment,
/// initial-state delivery and join/leave announcements.
///
/// This is the only place that registers or removes connections, so a single
/// registration can never produce more than one `new` or `remove` broadcast.
pub struct LifecycleManager {
    registry: Arc<dyn ClientRegistry>,
}

impl LifecycleManager {
    pub fn new(registry: Arc<dyn ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Handle a freshly opened connection.
    ///
    /// Registers it, delivers its `init` frame (assigned identity plus the
    /// roster of everyone already present) and announces the newcomer to all
    /// peers registered at this moment.
    pub async fn on_connect(&self, sender: PeerSender) -> ClientId {
        let id = self.registry.register(sender.clone()).await;
        info!(client_id = %id, "Client connected");

        let others: Vec<ClientId> = self
            .registry
            .all_identities()
            .await
            .into_iter()
            .filter(|other| other != &id)
            .collect();
        try_deliver(&id, &sender, &Frame::init(id.clone(), others).to_json());

        let announcement = Frame::new_client(id.clone()).to_json();
        for (peer, peer_sender) in self.registry.snapshot_others(&id).await {
            try_deliver(&peer, &peer_sender, &announcement);
        }

        id
    }

    /// Handle a closed or errored connection.
    ///
    /// Idempotent: only the call that actually removes the registration
    /// broadcasts the `remove` announcement, so duplicate close signals from
    /// the transport are harmless.
    pub async fn on_disconnect(&self, id: &ClientId) {
        if !self.registry.unregister(id).await {
            return;
        }
        info!(client_id = %id, "Client disconnected");

        let announcement = Frame::remove_client(id.clone()).to_json();
        for (peer, peer_sender) in self.registry.snapshot_others(id).await {
            try_deliver(&peer, &peer_sender, &announcement);
        }
    }
}
