//! Trigger classification — identifies whether an invocation came from a
//! direct SQS delivery or a self-enqueued replay message, ported from
//! `handlers/aws/utils.py`.
//!
//! Two bugs in the original are fixed here rather than reproduced:
//! - the original's `_get_trigger_type` guard reads
//!   `if "Records" not in event and len(event["Records"]) < 1:` — an `and`
//!   where an `or` was clearly intended, since the right side panics with a
//!   `KeyError` whenever the left side is true. Ported as `||`.
//! - the original's bucket-URI split uses `s3_uri.strip("s3://")`, which
//!   strips any of the characters `{'s','3',':','/'}` from both ends
//!   rather than removing the literal prefix — e.g. `"s3://3-logs/key"`
//!   loses its leading `3`. Ported as a real prefix strip.

use crate::error::TriggerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// A direct SQS delivery of an S3 event notification.
    Sqs,
    /// A message this system enqueued itself to replay a previously failed
    /// bulk action.
    SelfSqs,
}

/// Minimal shape of the inbound event this classifier inspects — just
/// enough of an SQS record to tell the two trigger kinds apart, without
/// pulling in a full AWS Lambda event crate.
pub struct InboundEvent {
    pub records: Vec<InboundRecord>,
}

pub struct InboundRecord {
    pub event_source: String,
    pub has_original_event_source_attribute: bool,
}

const AVAILABLE_TRIGGER_EVENT_SOURCE: &str = "aws:sqs";

pub fn classify_trigger(event: &InboundEvent) -> Result<TriggerKind, TriggerError> {
    if event.records.is_empty() {
        return Err(TriggerError::NotSupported);
    }

    let record = &event.records[0];
    if record.event_source != AVAILABLE_TRIGGER_EVENT_SOURCE {
        return Err(TriggerError::NotSupported);
    }

    if record.has_original_event_source_attribute {
        Ok(TriggerKind::SelfSqs)
    } else {
        Ok(TriggerKind::Sqs)
    }
}

/// Splits an `s3://bucket/key` URI into its bucket name and object key.
pub fn split_s3_uri(s3_uri: &str) -> Result<(String, String), String> {
    let rest = s3_uri
        .strip_prefix("s3://")
        .ok_or_else(|| format!("{s3_uri} is not an S3 URI"))?;

    let mut parts = rest.splitn(2, '/');
    let bucket = parts.next().unwrap_or("");
    let key = parts.next();
    match key {
        Some(key) if !bucket.is_empty() => Ok((bucket.to_string(), key.to_string())),
        _ => Err(format!("{s3_uri} is not a well-formed S3 URI")),
    }
}

/// `arn:aws:s3:::my-bucket` -> `my-bucket`.
pub fn bucket_name_from_arn(bucket_arn: &str) -> String {
    bucket_arn.rsplit(':').next().unwrap_or(bucket_arn).to_string()
}
