//! Deterministic in-memory transport client for tests and dry runs.
//!
//! Records every call, hands out sequential receipt ids, and can be scripted
//! to simulate disconnection or media payloads without a live socket.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::transport_client::{TransportClient, TransportClientError, TransportSendReceipt};
use crate::transport_contract::TransportMessageEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One recorded transport call.
pub enum RecordedTransportCall {
    Text {
        chat_id: String,
        text: String,
    },
    Image {
        chat_id: String,
        size_bytes: usize,
        caption: Option<String>,
    },
    Video {
        chat_id: String,
        size_bytes: usize,
        caption: Option<String>,
    },
    Audio {
        chat_id: String,
        size_bytes: usize,
    },
    Document {
        chat_id: String,
        size_bytes: usize,
        file_name: String,
        mimetype: String,
    },
    MarkRead {
        chat_id: String,
        message_ids: Vec<String>,
    },
}

/// Recording transport client with deterministic receipts (`SENT-1`, ...).
pub struct RecordingTransportClient {
    calls: Mutex<Vec<RecordedTransportCall>>,
    receipt_counter: AtomicU64,
    connected: AtomicBool,
    media_bytes: Vec<u8>,
}

impl Default for RecordingTransportClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransportClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            receipt_counter: AtomicU64::new(0),
            connected: AtomicBool::new(true),
            media_bytes: Vec::new(),
        }
    }

    /// Scripts the payload returned by `download_media`.
    pub fn with_media_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.media_bytes = bytes;
        self
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedTransportCall> {
        self.calls.lock().await.clone()
    }

    async fn record(
        &self,
        call: RecordedTransportCall,
    ) -> Result<TransportSendReceipt, TransportClientError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportClientError::NotConnected);
        }
        self.calls.lock().await.push(call);
        let id = self.receipt_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TransportSendReceipt {
            message_id: format!("SENT-{id}"),
        })
    }
}

#[async_trait]
impl TransportClient for RecordingTransportClient {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
    ) -> Result<TransportSendReceipt, TransportClientError> {
        self.record(RecordedTransportCall::Text {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        })
        .await
    }

    async fn send_image(
        &self,
        chat_id: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<TransportSendReceipt, TransportClientError> {
        self.record(RecordedTransportCall::Image {
            chat_id: chat_id.to_string(),
            size_bytes: bytes.len(),
            caption: caption.map(str::to_string),
        })
        .await
    }

    async fn send_video(
        &self,
        chat_id: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<TransportSendReceipt, TransportClientError> {
        self.record(RecordedTransportCall::Video {
            chat_id: chat_id.to_string(),
            size_bytes: bytes.len(),
            caption: caption.map(str::to_string),
        })
        .await
    }

    async fn send_audio(
        &self,
        chat_id: &str,
        bytes: Vec<u8>,
    ) -> Result<TransportSendReceipt, TransportClientError> {
        self.record(RecordedTransportCall::Audio {
            chat_id: chat_id.to_string(),
            size_bytes: bytes.len(),
        })
        .await
    }

    async fn send_document(
        &self,
        chat_id: &str,
        bytes: Vec<u8>,
        file_name: &str,
        mimetype: &str,
    ) -> Result<TransportSendReceipt, TransportClientError> {
        self.record(RecordedTransportCall::Document {
            chat_id: chat_id.to_string(),
            size_bytes: bytes.len(),
            file_name: file_name.to_string(),
            mimetype: mimetype.to_string(),
        })
        .await
    }

    async fn mark_read(
        &self,
        chat_id: &str,
        message_ids: &[String],
    ) -> Result<(), TransportClientError> {
        self.record(RecordedTransportCall::MarkRead {
            chat_id: chat_id.to_string(),
            message_ids: message_ids.to_vec(),
        })
        .await
        .map(|_| ())
    }

    async fn download_media(
        &self,
        _event: &TransportMessageEvent,
    ) -> Result<Vec<u8>, TransportClientError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportClientError::NotConnected);
        }
        if self.media_bytes.is_empty() {
            return Err(TransportClientError::DownloadFailed(
                "no media scripted".to_string(),
            ));
        }
        Ok(self.media_bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordedTransportCall, RecordingTransportClient};
    use crate::transport_client::{TransportClient, TransportClientError};

    #[tokio::test]
    async fn unit_recording_client_hands_out_sequential_receipts() {
        let client = RecordingTransportClient::new();
        let first = client.send_text("chat-1", "hello").await.expect("send");
        let second = client.send_text("chat-1", "again").await.expect("send");
        assert_eq!(first.message_id, "SENT-1");
        assert_eq!(second.message_id, "SENT-2");

        let calls = client.recorded_calls().await;
        assert_eq!(calls.len(), 2);
        assert!(matches!(&calls[0], RecordedTransportCall::Text { text, .. } if text == "hello"));
    }

    #[tokio::test]
    async fn regression_disconnected_client_surfaces_not_connected() {
        let client = RecordingTransportClient::new();
        client.set_connected(false);
        let error = client
            .send_text("chat-1", "hello")
            .await
            .expect_err("disconnected send should fail");
        assert!(matches!(error, TransportClientError::NotConnected));
        assert!(client.recorded_calls().await.is_empty());
    }
}
