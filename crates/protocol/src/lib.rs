use anyhow::Result;
use chunk_graph::{GroupId, QueryMode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Not JSON, unknown `type`, or missing/mistyped fields
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl ProtocolError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_input",
        }
    }
}

/// Message sent to the engine
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum Request {
    /// Replace engine state with the graph encoded in `text`
    #[serde(rename = "initFromText")]
    InitFromText {
        text: String,
        #[serde(
            rename = "fileGroupHint",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        file_group_hint: Option<GroupId>,
        #[serde(
            rename = "chunkGroupHint",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        chunk_group_hint: Option<GroupId>,
    },

    /// Combine the chunk sets of the selected features
    #[serde(rename = "compute")]
    Compute {
        selected: Vec<String>,
        #[schemars(with = "String")]
        mode: QueryMode,
    },
}

impl Request {
    pub fn parse(text: &str) -> std::result::Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedRequest(e.to_string()))
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InitFromText { .. } => "initFromText",
            Self::Compute { .. } => "compute",
        }
    }
}

/// Message emitted by the engine
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Response {
    /// Informational; count and timing are not guaranteed
    Progress { pct: u8, msg: String },

    Ready {
        #[serde(rename = "featureIds")]
        feature_ids: Vec<String>,
        #[serde(rename = "chunkCount")]
        chunk_count: usize,
        #[serde(rename = "fileGroup")]
        file_group: GroupId,
        #[serde(rename = "chunkGroup")]
        chunk_group: GroupId,
    },

    Result { chunks: Vec<String> },

    Error(ErrorEnvelope),
}

impl Response {
    pub fn progress(pct: u8, msg: impl Into<String>) -> Self {
        Self::Progress {
            pct: pct.min(100),
            msg: msg.into(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(ErrorEnvelope {
            code: code.into(),
            error: message.into(),
        })
    }

    /// Every request ends with exactly one terminal response
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

impl From<ProtocolError> for Response {
    fn from(err: ProtocolError) -> Self {
        Self::error(err.code(), err.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ErrorEnvelope {
    /// Stable snake_case error kind
    pub code: String,
    /// Human-readable message
    pub error: String,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

/// JSON schemas for both message directions
pub fn schemas() -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "version": PROTOCOL_VERSION,
        "request": serde_json::to_value(schemars::schema_for!(Request))?,
        "response": serde_json::to_value(schemars::schema_for!(Response))?,
    }))
}
