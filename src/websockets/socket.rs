use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::registry::ClientId;

/// Minimal transport abstraction - all the relay needs is text send/receive
#[async_trait]
pub trait SocketWrapper: Send {
    /// Send a text frame to the client
    async fn send_frame(&mut self, frame: String) -> Result<(), SocketError>;

    /// Receive the next text frame from the client (None if connection closed)
    async fn receive_frame(&mut self) -> Result<Option<String>, SocketError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Handler invoked by the connection task for every inbound text frame
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, sender: &ClientId, message: String);
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Direct implementation on axum's WebSocket
#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_frame(&mut self, frame: String) -> Result<(), SocketError> {
        self.send(Message::Text(frame))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_frame(&mut self) -> Result<Option<String>, SocketError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) => return Ok(None),
                // The protocol has no binary frames; ping/pong is handled by
                // axum itself.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(SocketError::ReceiveFailed(e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// One managed relay connection.
///
/// Owns the socket and the receiving end of the bounded outbound queue; the
/// sending end lives in the registry so lifecycle announcements and routed
/// frames from other connections can reach this client.
pub struct Connection {
    client_id: ClientId,
    socket: Box<dyn SocketWrapper>,
    outbound_receiver: mpsc::Receiver<String>,
    message_handler: Arc<dyn MessageHandler>,
}

impl Connection {
    pub fn new(
        client_id: ClientId,
        socket: Box<dyn SocketWrapper>,
        outbound_receiver: mpsc::Receiver<String>,
        message_handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            client_id,
            socket,
            outbound_receiver,
            message_handler,
        }
    }

    /// Run the connection - pumps both directions until disconnect
    pub async fn run(mut self) -> Result<(), SocketError> {
        loop {
            tokio::select! {
                // Outbound: frames queued for this client by its peers
                frame = self.outbound_receiver.recv() => {
                    match frame {
                        Some(frame) => self.socket.send_frame(frame).await?,
                        None => break, // queue closed, disconnect
                    }
                }

                // Inbound: frames from this client, handed to the router
                frame = self.socket.receive_frame() => {
                    match frame {
                        Ok(Some(frame)) => {
                            self.message_handler
                                .handle_message(&self.client_id, frame)
                                .await;
                        }
                        Ok(None) => break, // client disconnected
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        // Clean disconnect
        let _ = self.socket.close().await;
        Ok(())
    }
}
