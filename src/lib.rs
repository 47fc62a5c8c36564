//! Decoding and shipping engine for a serverless log-forwarding function:
//! inflate a (possibly gzipped) S3 object, split it into lines, optionally
//! regroup multiline records or reassemble JSON objects, optionally
//! explode an array field into multiple events, and bulk-ship the result
//! to Elasticsearch with deterministic, idempotent document IDs.
//!
//! The decoding stack (`pipeline`) is usable standalone as a library; the
//! shipper and trigger/dataset glue assemble it into the full
//! log-forwarder behavior.

pub mod config;
pub mod dataset;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod record;
pub mod replay;
pub mod shipper;
pub mod storage;
pub mod trigger;
