//! Error taxonomy for the decoding/shipping core: configuration errors are
//! fatal at construction, trigger errors are fatal per invocation, decode
//! errors abandon the current object, and ship errors carry per-action
//! failures back to the replay path instead of aborting the batch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("exactly one of elasticsearch_url or cloud_id must be set")]
    MissingEndpoint,
    #[error("both elasticsearch_url and cloud_id were set — only one is allowed")]
    ConflictingEndpoint,
    #[error("exactly one of (username, password) or api_key must be set")]
    MissingAuth,
    #[error("both (username, password) and api_key were set — only one is allowed")]
    ConflictingAuth,
    #[error("elasticsearch index cannot be empty")]
    EmptyIndex,
}

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Not supported trigger")]
    NotSupported,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed gzip framing: {0}")]
    Gzip(#[from] std::io::Error),
    #[error("invalid utf-8 in decoded stream: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ShipError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("two bulk actions share the same _id: {0}")]
    DuplicateActionId(String),
    #[error("bulk action for _id {0} reported as failed but not found in the outgoing batch")]
    UnmatchedActionId(String),
    #[error("elasticsearch index must be set before sending an event (dataset not yet discovered)")]
    IndexNotConfigured,
}
