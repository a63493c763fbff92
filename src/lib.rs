// Library crate for the soundstage relay server
// This file exposes the public API for integration tests

pub mod lifecycle;
pub mod registry;
pub mod router;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use lifecycle::LifecycleManager;
pub use registry::{ClientId, ClientRegistry, InMemoryClientRegistry, PeerSender};
pub use router::MessageRouter;
pub use shared::{AppState, ServerConfig};
pub use websockets::{websocket_handler, Frame, MessageHandler, SoundAction, Vec3};
