//! Configuration — loads `ShipperConfig` (auth, routing, batching) and
//! `StorageConfig` (decode capabilities) from environment variables.

use std::time::Duration;

use base64::Engine;

use crate::error::ConfigError;
use crate::pipeline::json_collector::JsonContentType;
use crate::shipper::client::Auth;

#[derive(Debug, Clone)]
pub enum Endpoint {
    Url(String),
    CloudId(String),
}

/// Elasticsearch connection, routing, and batching settings.
#[derive(Debug, Clone)]
pub struct ShipperConfig {
    pub endpoint: Endpoint,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub dataset: Option<String>,
    pub namespace: String,
    pub tags: Vec<String>,
    pub batch_max_actions: usize,
    pub batch_max_bytes: usize,
    pub timeout: Duration,
}

impl ShipperConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env_nonempty("ES_URL");
        let cloud_id = env_nonempty("ES_CLOUD_ID");
        let endpoint = match (url, cloud_id) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingEndpoint),
            (Some(u), None) => Endpoint::Url(u),
            (None, Some(c)) => Endpoint::CloudId(c),
            (None, None) => return Err(ConfigError::MissingEndpoint),
        };

        let username = env_nonempty("ES_USERNAME");
        let password = env_nonempty("ES_PASSWORD");
        let api_key = env_nonempty("ES_API_KEY");
        match (username.is_some(), api_key.is_some()) {
            (true, true) => return Err(ConfigError::ConflictingAuth),
            (false, false) => return Err(ConfigError::MissingAuth),
            _ => {}
        }

        let tags = env_nonempty("ES_TAGS")
            .map(|t| t.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Ok(Self {
            endpoint,
            username,
            password,
            api_key,
            dataset: env_nonempty("ES_DATASET"),
            namespace: env_nonempty("ES_NAMESPACE").unwrap_or_else(|| "default".to_string()),
            tags,
            batch_max_actions: env_parse("ES_BATCH_MAX_ACTIONS").unwrap_or(500),
            batch_max_bytes: env_parse("ES_BATCH_MAX_BYTES").unwrap_or(10 * 1024 * 1024),
            timeout: Duration::from_secs(30),
        })
    }

    /// Resolves the configured endpoint + auth into the pieces the bulk
    /// HTTP client needs. Cloud ID decoding follows the documented format
    /// `name:base64(host$es_uuid$kibana_uuid)`, not a transcription of the
    /// official client's resolver.
    pub fn resolve(&self) -> Result<(String, Auth), ConfigError> {
        let base_url = match &self.endpoint {
            Endpoint::Url(u) => u.trim_end_matches('/').to_string(),
            Endpoint::CloudId(cloud_id) => resolve_cloud_id(cloud_id)?,
        };
        let auth = match (&self.username, &self.password, &self.api_key) {
            (Some(username), Some(password), None) => Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            (Some(_), None, None) => return Err(ConfigError::MissingAuth),
            (None, _, Some(key)) => Auth::ApiKey(key.clone()),
            _ => return Err(ConfigError::MissingAuth),
        };
        Ok((base_url, auth))
    }
}

fn resolve_cloud_id(cloud_id: &str) -> Result<String, ConfigError> {
    let (_name, encoded) = cloud_id.split_once(':').ok_or(ConfigError::MissingEndpoint)?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| ConfigError::MissingEndpoint)?;
    let text = String::from_utf8(decoded).map_err(|_| ConfigError::MissingEndpoint)?;
    let mut parts = text.split('$');
    let host = parts.next().ok_or(ConfigError::MissingEndpoint)?;
    let es_uuid = parts.next().ok_or(ConfigError::MissingEndpoint)?;
    Ok(format!("https://{es_uuid}.{host}"))
}

/// Decode-stack capabilities, independent of the shipper config.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub json_content_type: JsonContentType,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let content_type = match env_nonempty("STORAGE_JSON_CONTENT_TYPE").as_deref() {
            Some("single") => JsonContentType::Single,
            Some("ndjson") => JsonContentType::Ndjson,
            _ => JsonContentType::Disabled,
        };
        Self { json_content_type: content_type }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_nonempty(key).and_then(|v| v.parse().ok())
}
