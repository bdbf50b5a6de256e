// Progress stream collaborator
//
// Optional helper for callers that kick off a long-running remote job
// and want to block until it finishes. Reads JSON frames from the
// backend's WebSocket feed and returns on a complete or error frame,
// bounded by an overall cap. Nothing in the dispatch loops calls this.

use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::info;

use crate::errors::ProgressError;

/// Overall cap on waiting for a remote job to finish
pub const DEFAULT_COMPLETION_CAP: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    Progress,
    Complete,
    Error,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressData {
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressMessage {
    #[serde(rename = "type")]
    pub kind: ProgressKind,
    #[serde(default)]
    pub data: ProgressData,
}

/// Block until the remote job behind `url` reports completion, giving
/// up after `cap`.
pub async fn wait_for_completion(url: &str, cap: Duration) -> Result<(), ProgressError> {
    timeout(cap, watch(url))
        .await
        .map_err(|_| ProgressError::TimedOut(cap.as_secs()))?
}

async fn watch(url: &str) -> Result<(), ProgressError> {
    let (mut stream, _) = connect_async(url)
        .await
        .map_err(|e| ProgressError::Connection(e.to_string()))?;

    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|e| ProgressError::Protocol(e.to_string()))?;
        let text = match frame {
            Message::Text(text) => text,
            Message::Binary(bytes) => String::from_utf8(bytes)
                .map_err(|e| ProgressError::Malformed(e.to_string()))?,
            Message::Close(_) => return Err(ProgressError::Disconnected),
            // Ping/pong frames are handled by the library
            _ => continue,
        };

        let msg: ProgressMessage =
            serde_json::from_str(&text).map_err(|e| ProgressError::Malformed(e.to_string()))?;

        match msg.kind {
            ProgressKind::Progress => {
                info!(
                    percentage = msg.data.percentage,
                    completed = msg.data.completed,
                    total = msg.data.total,
                    "Remote job progress"
                );
            }
            ProgressKind::Complete => {
                info!(message = %msg.data.message, "Remote job complete");
                return Ok(());
            }
            ProgressKind::Error => {
                return Err(ProgressError::Remote(msg.data.message));
            }
        }
    }

    Err(ProgressError::Disconnected)
}
