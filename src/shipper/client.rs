//! HTTP transport for the Elasticsearch `_bulk` API: NDJSON body
//! construction, retry/backoff with jitter, and per-action outcome
//! parsing.

use std::time::Duration;

use rand::Rng;
use serde_json::Value;

use crate::error::ShipError;

use super::BulkAction;

/// `max_retries=10` in the original's `_bulk_kwargs`.
const MAX_RETRIES: u32 = 10;
const BASE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub enum Auth {
    Basic { username: String, password: String },
    ApiKey(String),
}

pub struct BulkClient {
    http: reqwest::Client,
    base_url: String,
    auth: Auth,
}

#[derive(Debug, Clone)]
pub struct BulkResponseItem {
    pub id: String,
    pub status: u16,
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub failed: Vec<BulkResponseItem>,
    pub succeeded: usize,
}

impl BulkClient {
    pub fn new(base_url: String, auth: Auth, timeout: Duration) -> Result<Self, ShipError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ShipError::Transport)?;
        Ok(Self { http, base_url, auth })
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::ApiKey(key) => builder.header("Authorization", format!("ApiKey {key}")),
        }
    }

    fn encode_ndjson(actions: &[BulkAction]) -> String {
        let mut body = String::new();
        for action in actions {
            let meta = serde_json::json!({
                "create": { "_index": action.index, "_id": action.id }
            });
            body.push_str(&meta.to_string());
            body.push('\n');
            body.push_str(&action.document.to_string());
            body.push('\n');
        }
        body
    }

    /// Sends one `_bulk` request, honoring `raise_on_error=False,
    /// raise_on_exception=False` from the original: a non-2xx/per-action
    /// error is reported back as failed items rather than raised, and only
    /// transport failures (connection refused, timeout) are retried with
    /// jittered backoff up to [`MAX_RETRIES`].
    pub async fn bulk(&self, actions: &[BulkAction]) -> Result<BulkOutcome, ShipError> {
        if actions.is_empty() {
            return Ok(BulkOutcome::default());
        }
        let body = Self::encode_ndjson(actions);

        let mut attempt = 0;
        loop {
            let request = self
                .apply_auth(self.http.post(format!("{}/_bulk", self.base_url)))
                .header("Content-Type", "application/x-ndjson")
                .body(body.clone());

            match request.send().await {
                Ok(response) => return Self::parse_response(response).await,
                Err(e) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "bulk request failed, retrying");
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
                Err(e) => return Err(ShipError::Transport(e)),
            }
        }
    }

    async fn parse_response(response: reqwest::Response) -> Result<BulkOutcome, ShipError> {
        let body: Value = response.json().await.map_err(ShipError::Transport)?;
        let items = body.get("items").and_then(Value::as_array).cloned().unwrap_or_default();

        let mut outcome = BulkOutcome::default();
        for item in items {
            let Some(create) = item.get("create") else { continue };
            let id = create.get("_id").and_then(Value::as_str).unwrap_or_default().to_string();
            let status = create.get("status").and_then(Value::as_u64).unwrap_or(0) as u16;
            let error = create.get("error").cloned();

            if error.is_some() || !(200..300).contains(&status) {
                outcome.failed.push(BulkResponseItem { id, status, error });
            } else {
                outcome.succeeded += 1;
            }
        }
        Ok(outcome)
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_BACKOFF.saturating_mul(1 << attempt.min(6));
    let capped = exp.min(MAX_BACKOFF);
    let jitter_frac = 0.5 + rand::thread_rng().gen::<f64>() * 0.5;
    Duration::from_secs_f64(capped.as_secs_f64() * jitter_frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipper::BulkAction;

    #[test]
    fn encodes_create_action_pairs() {
        let actions = vec![BulkAction {
            index: "logs-generic-default".to_string(),
            id: "abc-000000000000".to_string(),
            document: serde_json::json!({"message": "hi"}),
        }];
        let body = BulkClient::encode_ndjson(&actions);
        let mut lines = body.lines();
        let meta: Value = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(meta["create"]["_index"], "logs-generic-default");
        assert_eq!(meta["create"]["_id"], "abc-000000000000");
        let doc: Value = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(doc["message"], "hi");
    }

    #[test]
    fn backoff_is_capped_and_nonzero() {
        for attempt in 1..=10 {
            let d = backoff_delay(attempt);
            assert!(d.as_secs_f64() > 0.0);
            assert!(d <= MAX_BACKOFF);
        }
    }
}
