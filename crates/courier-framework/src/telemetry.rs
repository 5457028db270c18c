//! Telemetry scope contract and request records.
//!
//! A telemetry backend implements [`CorrelationScope`]. The router calls
//! [`start_operation`](CorrelationScope::start_operation) before resolving a
//! handler and receives a [`MessageCorrelationResult`] whose completion
//! callback it fires exactly once when routing ends. The correlation inside
//! the result is the one handed to the handler, so a backend may replace the
//! operation id with one of its own.
//!
//! Independently of the backend, every routing call emits one request record
//! through `tracing` at target [`REQUEST_TARGET`].

use std::fmt;
use std::time::{Duration, Instant};

use courier_core::{
    MessageContext, MessageCorrelationInfo, MessageCorrelationResult, TransportIdentity,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Target of request records.
pub const REQUEST_TARGET: &str = "courier::request";

/// Operation name used when none is configured.
pub const DEFAULT_OPERATION_NAME: &str = "Process";

/// Telemetry settings passed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryOptions {
    /// Name of the tracked request operation.
    #[serde(default = "default_operation_name")]
    pub operation_name: String,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            operation_name: default_operation_name(),
        }
    }
}

fn default_operation_name() -> String {
    DEFAULT_OPERATION_NAME.to_string()
}

/// Starts tracking the processing of one message.
pub trait CorrelationScope: Send + Sync + 'static {
    /// Starts an operation for the message.
    ///
    /// The returned result must carry a correlation with non-blank operation
    /// and transaction ids; the router completes it exactly once.
    fn start_operation(
        &self,
        context: &dyn MessageContext,
        correlation: &MessageCorrelationInfo,
        options: &TelemetryOptions,
    ) -> MessageCorrelationResult;
}

/// How a routing call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

impl RequestOutcome {
    /// Whether this outcome counts as successful.
    pub fn is_successful(self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestTelemetry {
    /// Where the message came from.
    pub identity: TransportIdentity,
    /// Configured operation name.
    pub operation_name: String,
    /// How routing ended.
    pub outcome: RequestOutcome,
    /// Time spent routing.
    pub duration: Duration,
}

impl RequestTelemetry {
    pub fn is_successful(&self) -> bool {
        self.outcome.is_successful()
    }

    fn emit(&self) {
        info!(
            target: REQUEST_TARGET,
            namespace = %self.identity.namespace,
            entity = %self.identity.entity,
            consumer_group = %self.identity.consumer_group,
            operation_name = %self.operation_name,
            outcome = %self.outcome,
            is_successful = self.is_successful(),
            duration_ms = self.duration.as_secs_f64() * 1000.0,
            "Message request completed"
        );
    }
}

/// Brackets one routing call.
///
/// [`finish`](Self::finish) records the outcome, emits the request record and
/// completes the correlation result. Dropping an unfinished guard does the
/// same: with [`RequestOutcome::Failed`] while a handler panic unwinds, and
/// with [`RequestOutcome::Cancelled`] when the routing future was dropped
/// mid-flight.
pub(crate) struct RequestGuard {
    started: Instant,
    identity: TransportIdentity,
    operation_name: String,
    correlation: Option<MessageCorrelationResult>,
}

impl RequestGuard {
    pub(crate) fn start(
        context: &dyn MessageContext,
        correlation: MessageCorrelationResult,
        options: &TelemetryOptions,
    ) -> Self {
        Self {
            started: Instant::now(),
            identity: context.transport_identity(),
            operation_name: options.operation_name.clone(),
            correlation: Some(correlation),
        }
    }

    pub(crate) fn finish(mut self, outcome: RequestOutcome) -> RequestTelemetry {
        self.close(outcome)
    }

    fn close(&mut self, outcome: RequestOutcome) -> RequestTelemetry {
        let record = RequestTelemetry {
            identity: self.identity.clone(),
            operation_name: self.operation_name.clone(),
            outcome,
            duration: self.started.elapsed(),
        };
        record.emit();

        if let Some(correlation) = self.correlation.take() {
            correlation.complete(outcome.is_successful());
        }
        record
    }

    fn abandoned_outcome() -> RequestOutcome {
        if std::thread::panicking() {
            RequestOutcome::Failed
        } else {
            RequestOutcome::Cancelled
        }
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if self.correlation.is_none() {
            return;
        }

        let outcome = Self::abandoned_outcome();
        match outcome {
            RequestOutcome::Failed => error!(
                operation_name = %self.operation_name,
                "Handler panicked during routing"
            ),
            _ => warn!(
                operation_name = %self.operation_name,
                "Routing abandoned before completion"
            ),
        }
        self.close(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{BusMessageContext, NOT_AVAILABLE, Properties};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn tracked(calls: &Arc<Mutex<Vec<bool>>>) -> MessageCorrelationResult {
        let sink = Arc::clone(calls);
        MessageCorrelationResult::new(
            MessageCorrelationInfo::new("op", "tx", None).unwrap(),
            move |ok| sink.lock().push(ok),
        )
    }

    fn context() -> BusMessageContext {
        BusMessageContext::new("id", "job", Properties::new())
            .unwrap()
            .with_namespace("ns")
    }

    #[test]
    fn test_finish_completes_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let guard = RequestGuard::start(&context(), tracked(&calls), &TelemetryOptions::default());

        let record = guard.finish(RequestOutcome::Succeeded);
        assert_eq!(*calls.lock(), vec![true]);
        assert_eq!(record.identity.namespace, "ns");
        assert_eq!(record.identity.consumer_group, NOT_AVAILABLE);
        assert_eq!(record.operation_name, DEFAULT_OPERATION_NAME);
        assert!(record.is_successful());
    }

    #[test]
    fn test_dropped_guard_reports_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        drop(RequestGuard::start(
            &context(),
            tracked(&calls),
            &TelemetryOptions::default(),
        ));
        assert_eq!(*calls.lock(), vec![false]);
    }

    struct OutcomeOnDrop(Arc<Mutex<Option<RequestOutcome>>>);

    impl Drop for OutcomeOnDrop {
        fn drop(&mut self) {
            *self.0.lock() = Some(RequestGuard::abandoned_outcome());
        }
    }

    #[test]
    fn test_abandoned_outcome_is_cancelled_without_panic() {
        let seen = Arc::new(Mutex::new(None));
        drop(OutcomeOnDrop(Arc::clone(&seen)));
        assert_eq!(*seen.lock(), Some(RequestOutcome::Cancelled));
    }

    #[test]
    fn test_abandoned_outcome_is_failed_while_panicking() {
        let seen = Arc::new(Mutex::new(None));
        let marker = OutcomeOnDrop(Arc::clone(&seen));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _marker = marker;
            panic!("handler exploded");
        }));

        assert!(result.is_err());
        assert_eq!(*seen.lock(), Some(RequestOutcome::Failed));
    }

    #[test]
    fn test_guard_dropped_by_panic_reports_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let guard = RequestGuard::start(&context(), tracked(&calls), &TelemetryOptions::default());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = guard;
            panic!("handler exploded");
        }));

        assert!(result.is_err());
        assert_eq!(*calls.lock(), vec![false]);
    }

    #[test]
    fn test_cancelled_is_not_successful() {
        assert!(!RequestOutcome::Cancelled.is_successful());
        assert!(!RequestOutcome::Failed.is_successful());
        assert_eq!(RequestOutcome::Cancelled.to_string(), "cancelled");
    }
}
