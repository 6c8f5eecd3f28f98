//! MCP Progress Notifications
//!
//! Support for emitting progress updates during long-running operations.
//! Updates are correlated with the originating request through the
//! `progressToken` the client supplied in the request's `_meta`.

use serde::{Deserialize, Serialize};

use crate::mcp::peer::Peer;

/// Progress token for tracking operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ProgressToken {
    String(String),
    Number(i64),
}

/// Progress notification params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressParams {
    pub progress_token: ProgressToken,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Progress reporter bound to one request's token.
#[derive(Clone)]
pub struct ProgressReporter {
    token: ProgressToken,
    peer: Peer,
}

impl ProgressReporter {
    pub fn new(token: ProgressToken, peer: Peer) -> Self {
        Self { token, peer }
    }

    /// The token updates are tagged with.
    pub fn token(&self) -> &ProgressToken {
        &self.token
    }

    /// Send a progress notification. Send failures are ignored.
    pub async fn report(&self, progress: f64, total: Option<f64>, message: Option<&str>) {
        let params = ProgressParams {
            progress_token: self.token.clone(),
            progress,
            total,
            message: message.map(String::from),
        };
        self.peer.notify("notifications/progress", params).await;
    }
}
