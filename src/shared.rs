use std::sync::Arc;
use thiserror::Error;

use crate::lifecycle::LifecycleManager;
use crate::registry::ClientRegistry;
use crate::router::MessageRouter;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Process-level configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listening port (`PORT`, default 3000).
    pub port: u16,
    /// Per-connection outbound queue bound (`OUTBOUND_QUEUE_CAPACITY`,
    /// default 64). Frames beyond this are dropped for that peer.
    pub outbound_queue_capacity: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value,
            })?,
            Err(_) => DEFAULT_PORT,
        };
        let outbound_queue_capacity = match std::env::var("OUTBOUND_QUEUE_CAPACITY") {
            Ok(value) => match value.parse() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "OUTBOUND_QUEUE_CAPACITY",
                        value,
                    })
                }
            },
            Err(_) => DEFAULT_OUTBOUND_QUEUE_CAPACITY,
        };
        Ok(Self {
            port,
            outbound_queue_capacity,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

/// Shared application state handed to every connection handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn ClientRegistry>,
    pub lifecycle: Arc<LifecycleManager>,
    pub router: Arc<MessageRouter>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(registry: Arc<dyn ClientRegistry>, config: ServerConfig) -> Self {
        let lifecycle = Arc::new(LifecycleManager::new(registry.clone()));
        let router = Arc::new(MessageRouter::new(registry.clone()));
        Self {
            registry,
            lifecycle,
            router,
            config,
        }
    }
}
