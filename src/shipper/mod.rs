//! Elasticsearch Shipper — batches enriched Event Documents and ships them
//! via the bulk API, ported from `shippers/es.py::ElasticsearchShipper`.

pub mod client;

use std::time::Duration;

use serde_json::Value;

use crate::error::ShipError;
use crate::event::EventDocument;
use crate::replay::{FailedAction, NoopReplayHandler, ReplayArgs, ReplayHandler};

use client::{Auth, BulkClient};

/// One outgoing `_op_type: create` bulk action.
#[derive(Debug, Clone)]
pub struct BulkAction {
    pub index: String,
    pub id: String,
    pub document: Value,
}

pub struct ElasticsearchShipper {
    client: BulkClient,
    namespace: String,
    extra_tags: Vec<String>,
    batch_max_actions: usize,
    batch_max_bytes: usize,

    dataset: String,
    es_index: String,
    bulk_actions: Vec<BulkAction>,
    replay_args: ReplayArgs,
    replay_handler: Box<dyn ReplayHandler>,
}

impl ElasticsearchShipper {
    pub fn new(
        base_url: String,
        auth: Auth,
        namespace: String,
        extra_tags: Vec<String>,
        batch_max_actions: usize,
        batch_max_bytes: usize,
        timeout: Duration,
    ) -> Result<Self, ShipError> {
        Ok(Self {
            client: BulkClient::new(base_url, auth, timeout)?,
            namespace,
            extra_tags,
            batch_max_actions,
            batch_max_bytes,
            dataset: String::new(),
            es_index: String::new(),
            bulk_actions: Vec::new(),
            replay_args: ReplayArgs::default(),
            replay_handler: Box::new(NoopReplayHandler),
        })
    }

    pub fn with_replay_handler(mut self, handler: Box<dyn ReplayHandler>) -> Self {
        self.replay_handler = handler;
        self
    }

    pub fn with_dataset(mut self, dataset: String) -> Self {
        self.set_dataset(dataset);
        self
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    fn set_dataset(&mut self, dataset: String) {
        self.es_index = format!("logs-{dataset}-{namespace}", namespace = self.namespace);
        self.dataset = dataset;
    }

    /// `discover_dataset` — parses the SQS body's embedded S3 event record
    /// to classify the dataset, only if one has not already been
    /// configured.
    pub fn discover_dataset(&mut self, sqs_body: &str) {
        if !self.dataset.is_empty() {
            return;
        }
        let object_key = parse_object_key_from_sqs_body(sqs_body).unwrap_or_default();
        let dataset = if object_key.is_empty() {
            "generic".to_string()
        } else {
            crate::dataset::classify_dataset(&object_key).to_string()
        };
        self.set_dataset(dataset);
    }

    /// Enqueues one Event Document as a bulk `create` action, flushing the
    /// batch when it reaches `batch_max_actions`.
    pub async fn send(&mut self, event: EventDocument) -> Result<(), ShipError> {
        self.replay_args.dataset = self.dataset.clone();
        if self.es_index.is_empty() {
            return Err(ShipError::IndexNotConfigured);
        }

        let action = BulkAction {
            index: self.es_index.clone(),
            id: event.document_id(),
            document: event.to_json(),
        };
        if self.bulk_actions.iter().any(|a| a.id == action.id) {
            return Err(ShipError::DuplicateActionId(action.id));
        }
        self.bulk_actions.push(action);

        if self.bulk_actions.len() >= self.batch_max_actions
            || self.current_batch_bytes() >= self.batch_max_bytes
        {
            self.flush().await?;
        }
        Ok(())
    }

    fn current_batch_bytes(&self) -> usize {
        self.bulk_actions.iter().map(|a| a.document.to_string().len()).sum()
    }

    /// Ships whatever is currently batched, always clearing the batch
    /// afterward regardless of per-action outcome.
    pub async fn flush(&mut self) -> Result<(), ShipError> {
        if self.bulk_actions.is_empty() {
            return Ok(());
        }
        let actions = std::mem::take(&mut self.bulk_actions);
        let outcome = self.client.bulk(&actions).await?;
        self.handle_outcome(&actions, outcome)
    }

    fn handle_outcome(
        &self,
        sent: &[BulkAction],
        outcome: client::BulkOutcome,
    ) -> Result<(), ShipError> {
        if !outcome.failed.is_empty() {
            tracing::warn!(
                succeeded = outcome.succeeded,
                failed = outcome.failed.len(),
                "elasticsearch bulk request reported per-action failures"
            );
        } else {
            tracing::info!(succeeded = outcome.succeeded, "elasticsearch bulk flush complete");
        }

        for failed in &outcome.failed {
            let matches: Vec<&BulkAction> = sent.iter().filter(|a| a.id == failed.id).collect();
            let action = match matches.as_slice() {
                [single] => single,
                _ => return Err(ShipError::UnmatchedActionId(failed.id.clone())),
            };
            self.replay_handler.handle(
                "elasticsearch",
                &self.replay_args,
                &FailedAction {
                    id: failed.id.clone(),
                    index: action.index.clone(),
                    document: action.document.clone(),
                    error: failed.error.clone().unwrap_or(Value::Null),
                },
            );
        }
        Ok(())
    }
}

/// Pulls `Records[0].s3.object.key` out of an SQS message body that wraps
/// an S3 event notification JSON payload, per `discover_dataset` in the
/// original.
fn parse_object_key_from_sqs_body(sqs_body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(sqs_body).ok()?;
    let record = parsed.get("Records")?.as_array()?.first()?;
    let key = record.get("s3")?.get("object")?.get("key")?.as_str()?;
    Some(key.to_string())
}
