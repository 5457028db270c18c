//! Access to the correlation of the message being processed.
//!
//! While a handler runs, [`current_correlation`] returns the correlation of
//! the message it was invoked for. The value is scoped to the routing task
//! and released when routing ends, whichever way it ends.
//!
//! Services that keep their own correlation store can also register a
//! [`CorrelationAccessor`] with the router; it is told about the correlation
//! of every message before a handler is resolved.

use std::future::Future;

use courier_core::MessageCorrelationInfo;
use parking_lot::RwLock;

tokio::task_local! {
    static CURRENT_CORRELATION: MessageCorrelationInfo;
}

/// Returns the correlation of the message being routed on this task.
pub fn current_correlation() -> Option<MessageCorrelationInfo> {
    CURRENT_CORRELATION.try_with(Clone::clone).ok()
}

/// Runs `future` with `correlation` as the current correlation.
pub async fn with_correlation<F: Future>(
    correlation: MessageCorrelationInfo,
    future: F,
) -> F::Output {
    CURRENT_CORRELATION.scope(correlation, future).await
}

/// Receives the correlation of each routed message.
pub trait CorrelationAccessor: Send + Sync + 'static {
    fn set_correlation_info(&self, correlation: &MessageCorrelationInfo);
}

/// A [`CorrelationAccessor`] remembering the most recent correlation.
#[derive(Debug, Default)]
pub struct LatestCorrelation {
    latest: RwLock<Option<MessageCorrelationInfo>>,
}

impl LatestCorrelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently routed correlation.
    pub fn get(&self) -> Option<MessageCorrelationInfo> {
        self.latest.read().clone()
    }
}

impl CorrelationAccessor for LatestCorrelation {
    fn set_correlation_info(&self, correlation: &MessageCorrelationInfo) {
        *self.latest.write() = Some(correlation.clone());
    }
}
