//! Event Document — the per-record shape shipped to Elasticsearch, and its
//! deterministic `_id` derivation, ported from `shippers/es.py`.

use sha2::{Digest, Sha256};

/// `sha256(bucket_arn || object_key)`'s first 10 hex chars, `-`, then the
/// record's starting offset zero-padded to 12 decimal digits. Stable
/// across redelivery, which is what makes the ES `create` op-type
/// idempotent.
pub fn document_id(bucket_arn: &str, object_key: &str, offset: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bucket_arn.as_bytes());
    hasher.update(object_key.as_bytes());
    let digest = hasher.finalize();
    let hex_prefix = &hex::encode(digest)[..10];
    format!("{hex_prefix}-{offset:012}")
}

/// The log source fields every Event Document carries, mirroring the
/// nested `fields.log` shape the original reads `offset` out of.
#[derive(Debug, Clone)]
pub struct LogSource {
    pub bucket_arn: String,
    pub object_key: String,
    pub offset: u64,
}

/// A fully enriched Event Document, ready to become one Elasticsearch bulk
/// action.
#[derive(Debug, Clone)]
pub struct EventDocument {
    pub message: String,
    pub log: LogSource,
    pub data_stream_type: String,
    pub dataset: String,
    pub namespace: String,
    pub tags: Vec<String>,
}

impl EventDocument {
    /// `_enrich_event` generalized over `event_type` (the original has both
    /// a generic helper in `handlers/aws/utils.py` and a hardcoded `"logs"`
    /// version in `shippers/es.py`; this keeps the `"logs"` default but
    /// accepts an override).
    pub fn new(
        message: String,
        log: LogSource,
        dataset: String,
        namespace: String,
        extra_tags: &[String],
    ) -> Self {
        Self::with_event_type(message, log, dataset, namespace, extra_tags, "logs")
    }

    pub fn with_event_type(
        message: String,
        log: LogSource,
        dataset: String,
        namespace: String,
        extra_tags: &[String],
        event_type: &str,
    ) -> Self {
        let mut tags = vec![
            "preserve_original_event".to_string(),
            "forwarded".to_string(),
            dataset.replace('.', "-"),
        ];
        tags.extend_from_slice(extra_tags);
        Self {
            message,
            log,
            data_stream_type: event_type.to_string(),
            dataset,
            namespace,
            tags,
        }
    }

    pub fn document_id(&self) -> String {
        document_id(&self.log.bucket_arn, &self.log.object_key, self.log.offset)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "message": self.message,
            "data_stream": {
                "type": self.data_stream_type,
                "dataset": self.dataset,
                "namespace": self.namespace,
            },
            "event": {
                "dataset": self.dataset,
                "original": self.message,
            },
            "tags": self.tags,
            "fields": {
                "log": {
                    "offset": self.log.offset,
                },
                "message": self.message,
                "aws": {
                    "s3": {
                        "bucket": {
                            "arn": self.log.bucket_arn,
                        },
                        "object": {
                            "key": self.log.object_key,
                        },
                    },
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_is_deterministic() {
        let id1 = document_id("arn:aws:s3:::my-bucket", "path/to/key.json.gz", 1024);
        let id2 = document_id("arn:aws:s3:::my-bucket", "path/to/key.json.gz", 1024);
        assert_eq!(id1, id2);
    }

    #[test]
    fn document_id_has_expected_shape() {
        let id = document_id("arn:aws:s3:::my-bucket", "path/to/key.json.gz", 42);
        let (hex_part, offset_part) = id.split_once('-').unwrap();
        assert_eq!(hex_part.len(), 10);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(offset_part, "000000000042");
    }

    #[test]
    fn document_id_differs_by_offset() {
        let id1 = document_id("arn:aws:s3:::my-bucket", "key", 0);
        let id2 = document_id("arn:aws:s3:::my-bucket", "key", 1);
        assert_ne!(id1, id2);
    }

    #[test]
    fn document_id_differs_by_source() {
        let id1 = document_id("arn:aws:s3:::bucket-a", "key", 0);
        let id2 = document_id("arn:aws:s3:::bucket-b", "key", 0);
        assert_ne!(id1, id2);
    }

    #[test]
    fn enrichment_sets_expected_tags() {
        let doc = EventDocument::new(
            "hello".to_string(),
            LogSource {
                bucket_arn: "arn:aws:s3:::b".to_string(),
                object_key: "k".to_string(),
                offset: 0,
            },
            "aws.cloudtrail".to_string(),
            "default".to_string(),
            &["extra".to_string()],
        );
        assert_eq!(
            doc.tags,
            vec!["preserve_original_event", "forwarded", "aws-cloudtrail", "extra"]
        );
        assert_eq!(doc.data_stream_type, "logs");
    }

    #[test]
    fn to_json_carries_nested_s3_source_fields() {
        let doc = EventDocument::new(
            "hello".to_string(),
            LogSource {
                bucket_arn: "arn:aws:s3:::my-bucket".to_string(),
                object_key: "path/to/key.json.gz".to_string(),
                offset: 1024,
            },
            "aws.cloudtrail".to_string(),
            "default".to_string(),
            &[],
        );
        let json = doc.to_json();
        assert_eq!(json["fields"]["log"]["offset"], 1024);
        assert_eq!(json["fields"]["aws"]["s3"]["bucket"]["arn"], "arn:aws:s3:::my-bucket");
        assert_eq!(json["fields"]["aws"]["s3"]["object"]["key"], "path/to/key.json.gz");
    }

    #[test]
    fn enrichment_accepts_event_type_override() {
        let doc = EventDocument::with_event_type(
            "hello".to_string(),
            LogSource {
                bucket_arn: "arn".to_string(),
                object_key: "k".to_string(),
                offset: 0,
            },
            "generic".to_string(),
            "default".to_string(),
            &[],
            "metrics",
        );
        assert_eq!(doc.data_stream_type, "metrics");
    }
}
