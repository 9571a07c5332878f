//! Canonical screenshot metadata and the text-format decoders that produce it.
//!
//! Every supported wire format decodes into [`ScreenshotMetadata`]:
//!
//! | text starts with | decoder |
//! |------------------|---------|
//! | `lfs`, `screenshotmanager` | [`lfs::parse`] (pipe-delimited, several variants) |
//! | `{` | `serde_json` into the same record |
//!
//! Positions are kept as the decimal text found in the payload; converting
//! them to floats is left to the consumer.

pub mod decoder;
pub mod lfs;

pub use decoder::{classify, decode_file, decode_text, TextFormat};

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::container::ContainerError;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Unknown metadata format")]
    UnknownFormat,
    #[error("Malformed LFS payload: {0}")]
    MalformedLfs(String),
    #[error("Malformed JSON payload: {0}")]
    MalformedStructured(#[from] serde_json::Error),
    #[error(transparent)]
    Container(#[from] ContainerError),
}

// ── Record types ─────────────────────────────────────────────────────────────

/// Who took the screenshot.  `id` is empty on platforms without stable ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInfo {
    #[serde(default)]
    pub id:           String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldInfo {
    #[serde(default)]
    pub id:          String,
    #[serde(default)]
    pub name:        String,
    #[serde(default)]
    pub instance_id: String,
}

/// A point in world space, coordinates kept as decimal text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(deserialize_with = "decimal_text")]
    pub x: String,
    #[serde(deserialize_with = "decimal_text")]
    pub y: String,
    #[serde(deserialize_with = "decimal_text")]
    pub z: String,
}

/// A player present in the scene, in payload order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDetail {
    #[serde(default)]
    pub id:           String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, deserialize_with = "decimal_text")]
    pub x:            String,
    #[serde(default, deserialize_with = "decimal_text")]
    pub y:            String,
    #[serde(default, deserialize_with = "decimal_text")]
    pub z:            String,
}

/// Decoded metadata of one screenshot, whatever format it was stored in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotMetadata {
    pub application:       String,
    pub version:           i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author:            Option<AuthorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world:             Option<WorldInfo>,
    #[serde(default, rename = "pos", skip_serializing_if = "Option::is_none")]
    pub position:          Option<Position>,
    #[serde(default, rename = "rq", skip_serializing_if = "Option::is_none")]
    pub requested_quality: Option<String>,
    #[serde(default)]
    pub players:           Vec<PlayerDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file:       Option<PathBuf>,
}

impl ScreenshotMetadata {
    pub fn new(application: impl Into<String>, version: i32) -> Self {
        Self { application: application.into(), version, ..Default::default() }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Accept either a JSON string or a JSON number, keeping the literal text.
fn decimal_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Decimal {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Decimal::deserialize(deserializer)? {
        Decimal::Text(s)   => s,
        Decimal::Number(n) => n.to_string(),
    })
}
