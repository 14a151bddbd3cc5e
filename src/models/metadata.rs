//! Checkpoint metadata stored as `metadata.json` inside every archive.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Fields a metadata document must carry to be trusted.
pub const REQUIRED_FIELDS: [&str; 4] = ["campaign_name", "server_name", "created_at", "files"];

/// Immutable description of one checkpoint archive.
///
/// Constructed once at archive-build time and read back whenever an
/// archive is opened. `files` maps each archived filename to its
/// `sha256:<hex>` digest.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CheckpointMetadata {
    campaign_name: String,
    server_name: String,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
    files: BTreeMap<String, String>,
    name: Option<String>,
    comment: Option<String>,
}

#[derive(Deserialize)]
struct RawMetadata {
    campaign_name: String,
    server_name: String,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
    files: BTreeMap<String, String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

impl CheckpointMetadata {
    /// Construct validated metadata.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the campaign or server name is
    /// empty after trimming.
    pub fn new(
        campaign_name: impl Into<String>,
        server_name: impl Into<String>,
        created_at: DateTime<Utc>,
        files: BTreeMap<String, String>,
        name: Option<String>,
        comment: Option<String>,
    ) -> Result<Self> {
        let campaign_name = campaign_name.into();
        let server_name = server_name.into();

        if campaign_name.trim().is_empty() {
            return Err(AppError::Validation(
                "campaign_name must not be empty".into(),
            ));
        }
        if server_name.trim().is_empty() {
            return Err(AppError::Validation("server_name must not be empty".into()));
        }

        Ok(Self {
            campaign_name,
            server_name,
            created_at,
            files,
            name,
            comment,
        })
    }

    /// Parse a `metadata.json` document.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the text is not valid JSON, is not
    /// an object, is missing any of [`REQUIRED_FIELDS`] (all missing names
    /// are reported), or carries values of the wrong shape.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|err| AppError::Validation(format!("malformed metadata JSON: {err}")))?;

        let object = value
            .as_object()
            .ok_or_else(|| AppError::Validation("metadata must be a JSON object".into()))?;

        let missing: Vec<&str> = REQUIRED_FIELDS
            .into_iter()
            .filter(|field| object.get(*field).is_none_or(serde_json::Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "metadata is missing required fields: {}",
                missing.join(", ")
            )));
        }

        let raw: RawMetadata = serde_json::from_value(value)
            .map_err(|err| AppError::Validation(format!("invalid metadata: {err}")))?;

        Self::new(
            raw.campaign_name,
            raw.server_name,
            raw.created_at,
            raw.files,
            raw.name,
            raw.comment,
        )
    }

    /// Render as a pretty-printed JSON document.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Validation(format!("failed to serialize metadata: {err}")))
    }

    /// Campaign identifier.
    #[must_use]
    pub fn campaign_name(&self) -> &str {
        &self.campaign_name
    }

    /// Server the campaign files were taken from.
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Creation time (UTC).
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Archived filename to `sha256:<hex>` digest.
    #[must_use]
    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    /// Optional operator-supplied name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Optional operator-supplied comment.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// RFC 3339 timestamps with a `Z` suffix. Timezone-less values are read
/// as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|err| D::Error::custom(format!("invalid created_at '{raw}': {err}")))
    }
}
