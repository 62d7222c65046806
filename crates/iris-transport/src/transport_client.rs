//! Async client trait the correlation engine drives against the transport.
//!
//! One implementation per live socket; the supervisor registers it under the
//! owning session id. Send acknowledgments surface the transport-assigned
//! message id, which keys the correlation mapping.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::transport_contract::TransportMessageEvent;

#[derive(Debug, Error)]
/// Failure modes of transport-side operations.
pub enum TransportClientError {
    #[error("transport socket is not connected")]
    NotConnected,
    #[error("transport send failed: {0}")]
    SendFailed(String),
    #[error("transport media download failed: {0}")]
    DownloadFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Acknowledgment returned by the transport for a dispatched message.
pub struct TransportSendReceipt {
    pub message_id: String,
}

/// Send/read/download surface of one transport connection.
#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
    ) -> Result<TransportSendReceipt, TransportClientError>;

    async fn send_image(
        &self,
        chat_id: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<TransportSendReceipt, TransportClientError>;

    async fn send_video(
        &self,
        chat_id: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<TransportSendReceipt, TransportClientError>;

    async fn send_audio(
        &self,
        chat_id: &str,
        bytes: Vec<u8>,
    ) -> Result<TransportSendReceipt, TransportClientError>;

    async fn send_document(
        &self,
        chat_id: &str,
        bytes: Vec<u8>,
        file_name: &str,
        mimetype: &str,
    ) -> Result<TransportSendReceipt, TransportClientError>;

    async fn mark_read(
        &self,
        chat_id: &str,
        message_ids: &[String],
    ) -> Result<(), TransportClientError>;

    async fn download_media(
        &self,
        event: &TransportMessageEvent,
    ) -> Result<Vec<u8>, TransportClientError>;
}

#[derive(Default)]
/// Session-keyed registry of live transport clients. The supervisor owns
/// registration; the correlation layer only looks up.
pub struct TransportClientRegistry {
    clients: Mutex<HashMap<String, Arc<dyn TransportClient>>>,
}

impl TransportClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session_id: &str, client: Arc<dyn TransportClient>) {
        let mut clients = self.clients.lock().await;
        clients.insert(session_id.trim().to_string(), client);
    }

    pub async fn client_for(&self, session_id: &str) -> Option<Arc<dyn TransportClient>> {
        let clients = self.clients.lock().await;
        clients.get(session_id.trim()).cloned()
    }

    pub async fn remove(&self, session_id: &str) {
        let mut clients = self.clients.lock().await;
        clients.remove(session_id.trim());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::TransportClientRegistry;
    use crate::transport_recording::RecordingTransportClient;

    #[tokio::test]
    async fn unit_registry_registers_and_removes_clients() {
        let registry = TransportClientRegistry::new();
        assert!(registry.client_for("session-1").await.is_none());

        registry
            .register("session-1", Arc::new(RecordingTransportClient::new()))
            .await;
        assert!(registry.client_for("session-1").await.is_some());
        assert!(registry.client_for(" session-1 ").await.is_some());

        registry.remove("session-1").await;
        assert!(registry.client_for("session-1").await.is_none());
    }
}
