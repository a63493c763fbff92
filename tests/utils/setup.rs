use std::sync::Arc;
use tokio::sync::mpsc;

use soundstage::{ClientId, InMemoryClientRegistry, LifecycleManager, MessageRouter};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

const TEST_QUEUE_CAPACITY: usize = 32;

/// A connected test participant: its assigned identity plus the receiving end
/// of its outbound queue, standing in for the WebSocket writer.
pub struct TestClient {
    pub id: ClientId,
    receiver: mpsc::Receiver<String>,
}

impl TestClient {
    /// Drain every frame queued for this client, decoded as JSON.
    pub fn drain(&mut self) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(raw) = self.receiver.try_recv() {
            frames.push(serde_json::from_str(&raw).expect("relayed frame should be valid JSON"));
        }
        frames
    }

    /// Drain, keeping only frames with the given `type` tag.
    pub fn drain_of_type(&mut self, frame_type: &str) -> Vec<serde_json::Value> {
        self.drain()
            .into_iter()
            .filter(|frame| frame["type"] == frame_type)
            .collect()
    }
}

pub struct TestSetup {
    pub registry: Arc<InMemoryClientRegistry>,
    pub lifecycle: LifecycleManager,
    pub router: MessageRouter,
    pub clients: Vec<TestClient>,
}

pub struct TestSetupBuilder {
    client_count: usize,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self { client_count: 0 }
    }

    pub fn with_clients(mut self, count: usize) -> Self {
        self.client_count = count;
        self
    }

    pub fn with_three_clients(self) -> Self {
        self.with_clients(3)
    }

    pub async fn build(self) -> TestSetup {
        let registry = Arc::new(InMemoryClientRegistry::new());
        let lifecycle = LifecycleManager::new(registry.clone());
        let router = MessageRouter::new(registry.clone());

        let mut setup = TestSetup {
            registry,
            lifecycle,
            router,
            clients: Vec::new(),
        };
        for _ in 0..self.client_count {
            setup.connect().await;
        }
        setup
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSetup {
    /// Connect a new client through the full lifecycle path. Returns its
    /// index into `clients`.
    pub async fn connect(&mut self) -> usize {
        self.connect_with_capacity(TEST_QUEUE_CAPACITY).await
    }

    /// Connect a client with a specific outbound queue bound.
    pub async fn connect_with_capacity(&mut self, capacity: usize) -> usize {
        let (sender, receiver) = mpsc::channel(capacity);
        let id = self.lifecycle.on_connect(sender).await;
        self.clients.push(TestClient { id, receiver });
        self.clients.len() - 1
    }

    /// Disconnect the client at `index`, as the transport close path would.
    pub async fn disconnect(&mut self, index: usize) {
        let id = self.clients[index].id.clone();
        self.lifecycle.on_disconnect(&id).await;
    }

    /// Send a raw frame from the client at `index` through the router.
    pub async fn send_raw(&self, index: usize, raw: &str) {
        self.router.route(&self.clients[index].id, raw).await;
    }

    /// Discard everything queued so far, for tests that only care about what
    /// happens next.
    pub fn clear_frames(&mut self) {
        for client in &mut self.clients {
            client.drain();
        }
    }
}
