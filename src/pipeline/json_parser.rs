//! JSON parsing as an injected capability, per the Design Notes: the
//! collector only needs *a* parser, not a hardcoded library — this keeps
//! `serde_json` swappable without touching the collector's offset logic.

pub trait JsonParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<serde_json::Value, serde_json::Error>;
}

#[derive(Debug, Default)]
pub struct SerdeJsonParser;

impl JsonParser for SerdeJsonParser {
    fn parse(&self, bytes: &[u8]) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
