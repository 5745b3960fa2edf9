use std::fmt;

/// Request-scoped logger for routing decisions.
///
/// Every event carries the `user_id`, `dashboard_id` and `item_id` of the
/// request being customized, so log lines from concurrent requests can be told
/// apart. Identifiers are recorded with `Debug` escaping, since they come from
/// the caller and are not yet sanitized. Parameter values are never passed to it.
#[derive(Debug, Clone, Copy)]
pub struct DecisionLog<'a> {
    user_id: &'a str,
    dashboard_id: &'a str,
    item_id: &'a str,
}

impl<'a> DecisionLog<'a> {
    /// Creates a logger for one data item request.
    pub fn new(user_id: &'a str, dashboard_id: &'a str, item_id: &'a str) -> Self {
        Self {
            user_id,
            dashboard_id,
            item_id,
        }
    }

    /// Returns the item id this logger is bound to.
    pub fn item_id(&self) -> &str {
        self.item_id
    }

    /// Logs an info-level message.
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(
            user_id = ?self.user_id,
            dashboard_id = ?self.dashboard_id,
            item_id = ?self.item_id,
            "{}",
            args
        );
    }

    /// Logs a warning-level message.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(
            user_id = ?self.user_id,
            dashboard_id = ?self.dashboard_id,
            item_id = ?self.item_id,
            "{}",
            args
        );
    }

    /// Logs a debug-level message.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(
            user_id = ?self.user_id,
            dashboard_id = ?self.dashboard_id,
            item_id = ?self.item_id,
            "{}",
            args
        );
    }
}
