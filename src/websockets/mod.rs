// Public API
pub use handler::websocket_handler;
pub use messages::{Frame, SoundAction, Vec3};
pub use socket::{Connection, MessageHandler, SocketError, SocketWrapper};

// Internal modules
mod handler;
pub mod messages;
mod socket;
