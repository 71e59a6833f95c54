use std::fmt;

/// Request-scoped logger used by middleware.
///
/// `GateLog` borrows the request ID from the request it was created for and
/// stamps it on every event, so gate decisions can be correlated with the
/// rest of the request's trace.
#[derive(Debug, Clone, Copy)]
pub struct GateLog<'a> {
    request_id: &'a str,
}

impl<'a> GateLog<'a> {
    /// Creates a logger for one request.
    pub fn new(request_id: &'a str) -> Self {
        Self { request_id }
    }

    /// Logs a warning-level message with request ID.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a debug-level message with request ID.
    ///
    /// Use with `format_args!` for efficient formatting:
    /// ```no_run
    /// # use proxy_weave::GateLog;
    /// let log = GateLog::new("req-1");
    /// log.debug(format_args!("validated {} parameters", 2));
    /// ```
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, "{}", args);
    }
}
