//! Replay handling — the contract a caller implements to be notified of
//! individual bulk actions Elasticsearch rejected, ported from
//! `shippers/es.py::_handle_outcome`. What happens with a failed action
//! (re-enqueue to SQS, drop, dead-letter) is the caller's business; the
//! shipper only reports it, with enough context to retry.

use serde_json::Value;

/// Mirrors the original's `self._replay_args` dict, populated once the
/// dataset is known.
#[derive(Debug, Clone, Default)]
pub struct ReplayArgs {
    pub dataset: String,
}

/// One bulk action Elasticsearch reported as failed.
#[derive(Debug, Clone)]
pub struct FailedAction {
    pub id: String,
    pub index: String,
    pub document: Value,
    pub error: Value,
}

pub trait ReplayHandler: Send + Sync {
    /// `shipper_kind` is always `"elasticsearch"` today (only the one
    /// shipper exists), kept as a string rather than hardcoded so a second
    /// shipper implementation would not require changing this trait's
    /// signature.
    fn handle(&self, shipper_kind: &str, replay_args: &ReplayArgs, action: &FailedAction);
}

/// A handler that does nothing, useful when the caller wants failed
/// actions logged (the shipper already does that) but not replayed.
pub struct NoopReplayHandler;

impl ReplayHandler for NoopReplayHandler {
    fn handle(&self, _shipper_kind: &str, _replay_args: &ReplayArgs, _action: &FailedAction) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_handler_does_not_panic() {
        let handler = NoopReplayHandler;
        handler.handle(
            "elasticsearch",
            &ReplayArgs { dataset: "generic".to_string() },
            &FailedAction {
                id: "abc".to_string(),
                index: "logs-generic-default".to_string(),
                document: Value::Null,
                error: Value::Null,
            },
        );
    }
}
