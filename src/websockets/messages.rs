use serde::{Deserialize, Serialize};

use crate::registry::ClientId;

/// A point or Euler rotation in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Whether a sound trigger is being pressed or released.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundAction {
    Start,
    Stop,
}

/// Wire frame for the relay protocol.
///
/// Every frame is a JSON object discriminated by a lowercase `type` tag.
/// `init`/`new`/`remove` are only ever produced by the server; `sound`,
/// `avatar` and `chat` come from clients and are fanned out to their peers.
/// A frame with an unrecognized tag decodes to [`Frame::Unknown`] so that
/// future client message types never break the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    /// First frame a client receives: its assigned identity plus the
    /// identities of everyone already in the session.
    Init {
        id: ClientId,
        others: Vec<ClientId>,
    },

    /// A peer joined the session.
    New { id: ClientId },

    /// A peer left the session.
    Remove { id: ClientId },

    /// Sound trigger toggle, relayed verbatim (extra fields included).
    Sound {
        name: String,
        action: SoundAction,
        #[serde(flatten)]
        extra: serde_json::Map<String, serde_json::Value>,
    },

    /// Pose update. The `id` field is always server-stamped on relay.
    Avatar {
        position: Vec3,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotation: Option<Vec3>,
        #[serde(
            default,
            rename = "headRotationY",
            skip_serializing_if = "Option::is_none"
        )]
        head_rotation_y: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<ClientId>,
    },

    /// Chat text. The `id` field is always server-stamped on relay.
    Chat {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<ClientId>,
    },

    /// Any tag the server does not understand. Accepted, never relayed.
    #[serde(other)]
    Unknown,
}

/// Constructors for the server-generated frames
impl Frame {
    /// Create an `init` frame for a newly assigned identity.
    pub fn init(id: ClientId, others: Vec<ClientId>) -> Self {
        Frame::Init { id, others }
    }

    /// Create a `new` announcement for a freshly joined peer.
    pub fn new_client(id: ClientId) -> Self {
        Frame::New { id }
    }

    /// Create a `remove` announcement for a departed peer.
    pub fn remove_client(id: ClientId) -> Self {
        Frame::Remove { id }
    }

    /// Encode the frame to its wire representation.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}
