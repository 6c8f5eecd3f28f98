//! Per-invocation context handed to every handler.

use tokio_util::sync::CancellationToken;

use crate::mcp::peer::Peer;
use crate::mcp::progress::{ProgressReporter, ProgressToken};
use crate::mcp::protocol::{LoggingLevel, RequestId};

/// Everything a handler may need from the request that invoked it.
#[derive(Clone)]
pub struct InvocationContext {
    request_id: RequestId,
    peer: Peer,
    progress: Option<ProgressReporter>,
    cancel: CancellationToken,
}

impl InvocationContext {
    pub fn new(request_id: RequestId, peer: Peer) -> Self {
        Self {
            request_id,
            peer,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach the client's progress token, if it sent one.
    pub fn with_progress_token(mut self, token: Option<ProgressToken>) -> Self {
        self.progress = token.map(|t| ProgressReporter::new(t, self.peer.clone()));
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// The client that made the request.
    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    /// Report progress for this request.
    ///
    /// Does nothing when the request carried no progress token.
    pub async fn report_progress(&self, progress: f64, total: Option<f64>, message: Option<&str>) {
        if let Some(reporter) = &self.progress {
            reporter.report(progress, total, message).await;
        }
    }

    /// Send a log message to the client.
    pub async fn log(&self, level: LoggingLevel, message: impl Into<String>) {
        self.peer.log(level, "mcp-starter", message.into()).await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// A context wired to an in-memory channel, for handler tests.
#[cfg(test)]
pub(crate) fn test_context(
    token: Option<ProgressToken>,
) -> (
    InvocationContext,
    tokio::sync::mpsc::Receiver<crate::mcp::transport::Message>,
) {
    let (tx, rx) = tokio::sync::mpsc::channel(64);
    let ctx = InvocationContext::new(RequestId::Number(1), Peer::new(tx)).with_progress_token(token);
    (ctx, rx)
}
