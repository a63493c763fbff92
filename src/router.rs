use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::registry::{try_deliver, ClientId, ClientRegistry};
use crate::websockets::messages::Frame;
use crate::websockets::MessageHandler;

/// Decodes inbound frames, stamps the authoritative sender identity and fans
/// the result out to every other registered peer.
pub struct MessageRouter {
    registry: Arc<dyn ClientRegistry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<dyn ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Relay one raw frame from `sender` to all other peers.
    ///
    /// Malformed frames and unrecognized types are dropped without touching
    /// the connection; a failed send to one peer never aborts delivery to the
    /// rest.
    pub async fn route(&self, sender: &ClientId, raw: &str) {
        let frame = match serde_json::from_str::<Frame>(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    client_id = %sender,
                    error = %e,
                    "Dropping malformed frame"
                );
                return;
            }
        };

        let frame = match frame {
            Frame::Sound { .. } => frame,
            // Anti-spoof: the relayed identity is always the one the
            // registry assigned to this connection, whatever the client sent.
            Frame::Avatar {
                position,
                rotation,
                head_rotation_y,
                ..
            } => Frame::Avatar {
                position,
                rotation,
                head_rotation_y,
                id: Some(sender.clone()),
            },
            Frame::Chat { text, .. } => Frame::Chat {
                text,
                id: Some(sender.clone()),
            },
            other => {
                debug!(client_id = %sender, frame = ?other, "Ignoring non-relayable frame");
                return;
            }
        };

        let encoded = frame.to_json();
        for (peer, peer_sender) in self.registry.snapshot_others(sender).await {
            try_deliver(&peer, &peer_sender, &encoded);
        }
    }
}

#[async_trait]
impl MessageHandler for MessageRouter {
    async fn handle_message(&self, sender: &ClientId, message: String) {
        self.route(sender, &message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryClientRegistry;
    use tokio::sync::mpsc;

    struct Peer {
        id: ClientId,
        rx: mpsc::Receiver<String>,
    }

    impl Peer {
        fn drain(&mut self) -> Vec<serde_json::Value> {
            let mut frames = Vec::new();
            while let Ok(raw) = self.rx.try_recv() {
                frames.push(serde_json::from_str(&raw).unwrap());
            }
            frames
        }
    }

    async fn connect(registry: &InMemoryClientRegistry, capacity: usize) -> Peer {
        let (tx, rx) = mpsc::channel(capacity);
        let id = registry.register(tx).await;
        Peer { id, rx }
    }

    async fn three_peers() -> (Arc<InMemoryClientRegistry>, MessageRouter, Vec<Peer>) {
        let registry = Arc::new(InMemoryClientRegistry::new());
        let mut peers = Vec::new();
        for _ in 0..3 {
            peers.push(connect(&registry, 8).await);
        }
        let router = MessageRouter::new(registry.clone());
        (registry, router, peers)
    }

    #[tokio::test]
    async fn test_sound_frame_reaches_everyone_but_the_sender() {
        let (_registry, router, mut peers) = three_peers().await;
        let sender_id = peers[0].id.clone();

        router
            .route(
                &sender_id,
                r#"{"type":"sound","name":"drum","action":"start"}"#,
            )
            .await;

        assert!(peers[0].drain().is_empty());
        for peer in &mut peers[1..] {
            let frames = peer.drain();
            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0]["type"], "sound");
            assert_eq!(frames[0]["name"], "drum");
            assert_eq!(frames[0]["action"], "start");
        }
    }

    #[tokio::test]
    async fn test_chat_identity_is_stamped_over_spoofed_value() {
        let (_registry, router, mut peers) = three_peers().await;
        let sender_id = peers[0].id.clone();

        router
            .route(&sender_id, r#"{"type":"chat","text":"hi","id":"FAKE"}"#)
            .await;

        for peer in &mut peers[1..] {
            let frames = peer.drain();
            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0]["text"], "hi");
            assert_eq!(frames[0]["id"], sender_id.as_str());
        }
    }

    #[tokio::test]
    async fn test_avatar_identity_is_stamped() {
        let (_registry, router, mut peers) = three_peers().await;
        let sender_id = peers[0].id.clone();

        router
            .route(
                &sender_id,
                r#"{"type":"avatar","position":{"x":1.0,"y":0.0,"z":-2.5},"headRotationY":0.3}"#,
            )
            .await;

        let frames = peers[1].drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["id"], sender_id.as_str());
        assert_eq!(frames[0]["position"]["z"], -2.5);
        assert_eq!(frames[0]["headRotationY"], 0.3);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_frames_are_not_relayed() {
        let (_registry, router, mut peers) = three_peers().await;
        let sender_id = peers[0].id.clone();

        router.route(&sender_id, "{not json").await;
        router.route(&sender_id, r#"{"type":"teleport","to":"moon"}"#).await;
        // Server-only frames from a client are dropped too.
        router
            .route(&sender_id, r#"{"type":"remove","id":"victim"}"#)
            .await;

        for peer in &mut peers {
            assert!(peer.drain().is_empty());
        }

        // The connection is still routable afterwards.
        router
            .route(
                &sender_id,
                r#"{"type":"sound","name":"bass","action":"stop"}"#,
            )
            .await;
        assert_eq!(peers[1].drain().len(), 1);
    }

    #[tokio::test]
    async fn test_full_peer_queue_does_not_abort_fan_out() {
        let registry = Arc::new(InMemoryClientRegistry::new());
        let sender = connect(&registry, 8).await;
        let mut slow = connect(&registry, 1).await;
        let mut healthy = connect(&registry, 8).await;
        let router = MessageRouter::new(registry.clone());

        for _ in 0..3 {
            router
                .route(
                    &sender.id,
                    r#"{"type":"sound","name":"drum","action":"start"}"#,
                )
                .await;
        }

        // The slow peer kept only what fit its queue; the healthy peer got
        // every frame.
        assert_eq!(slow.drain().len(), 1);
        assert_eq!(healthy.drain().len(), 3);
    }
}
