//! The outcome handle of one correlated operation.
//!
//! A [`MessageCorrelationResult`] is returned when a telemetry backend starts
//! tracking an operation. It carries the correlation of the operation and a
//! completion callback that reports whether processing succeeded. The
//! callback fires exactly once: either through [`complete`] or, if the handle
//! is dropped first, with the last value passed to [`set_successful`]
//! (`false` unless set).
//!
//! [`complete`]: MessageCorrelationResult::complete
//! [`set_successful`]: MessageCorrelationResult::set_successful

use std::fmt;

use super::MessageCorrelationInfo;

/// Callback receiving the success flag of a finished operation.
pub type CompletionCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Correlation of an active operation plus its single-use completion.
pub struct MessageCorrelationResult {
    correlation_info: MessageCorrelationInfo,
    is_successful: bool,
    on_completed: Option<CompletionCallback>,
}

impl MessageCorrelationResult {
    /// Starts tracking an operation.
    pub fn new<F>(correlation_info: MessageCorrelationInfo, on_completed: F) -> Self
    where
        F: FnOnce(bool) + Send + 'static,
    {
        Self {
            correlation_info,
            is_successful: false,
            on_completed: Some(Box::new(on_completed)),
        }
    }

    /// A result that reports to nobody.
    pub fn detached(correlation_info: MessageCorrelationInfo) -> Self {
        Self {
            correlation_info,
            is_successful: false,
            on_completed: None,
        }
    }

    /// Correlation of the tracked operation.
    pub fn correlation_info(&self) -> &MessageCorrelationInfo {
        &self.correlation_info
    }

    /// The success flag reported if the handle is dropped.
    pub fn is_successful(&self) -> bool {
        self.is_successful
    }

    /// Records the outcome without completing.
    pub fn set_successful(&mut self, is_successful: bool) {
        self.is_successful = is_successful;
    }

    /// Completes the operation with the given outcome.
    pub fn complete(mut self, is_successful: bool) {
        self.is_successful = is_successful;
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(on_completed) = self.on_completed.take() {
            on_completed(self.is_successful);
        }
    }
}

impl Drop for MessageCorrelationResult {
    fn drop(&mut self) {
        self.fire();
    }
}

impl fmt::Debug for MessageCorrelationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCorrelationResult")
            .field("correlation_info", &self.correlation_info)
            .field("is_successful", &self.is_successful)
            .field("pending", &self.on_completed.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    fn info() -> MessageCorrelationInfo {
        MessageCorrelationInfo::new("op", "tx", None).unwrap()
    }

    fn recording() -> (Arc<Mutex<Vec<bool>>>, impl FnOnce(bool) + Send + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        (calls, move |ok| sink.lock().unwrap().push(ok))
    }

    #[test]
    fn test_complete_fires_once() {
        let (calls, callback) = recording();
        let result = MessageCorrelationResult::new(info(), callback);
        result.complete(true);

        assert_eq!(*calls.lock().unwrap(), vec![true]);
    }

    #[test]
    fn test_drop_fires_with_recorded_outcome() {
        let (calls, callback) = recording();
        {
            let mut result = MessageCorrelationResult::new(info(), callback);
            result.set_successful(true);
        }
        assert_eq!(*calls.lock().unwrap(), vec![true]);
    }

    #[test]
    fn test_drop_without_outcome_reports_failure() {
        let (calls, callback) = recording();
        drop(MessageCorrelationResult::new(info(), callback));
        assert_eq!(*calls.lock().unwrap(), vec![false]);
    }

    #[test]
    fn test_detached_has_no_callback() {
        let result = MessageCorrelationResult::detached(info());
        assert_eq!(result.correlation_info().operation_id(), "op");
        result.complete(true);
    }
}
