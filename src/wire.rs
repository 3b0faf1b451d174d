//! Versioned JSON envelope for payloads that cross a process boundary.
//!
//! Resource catalogs and batch results travel between the core and its
//! callers (CLI, desktop shell) as an explicit, versioned wire schema rather
//! than ad hoc deep copies. Decoding rejects unknown versions so producers
//! and consumers can evolve independently.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current wire schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from encoding or decoding wire envelopes.
#[derive(Debug, Error)]
pub enum WireError {
    /// Envelope carried a version this build does not understand.
    #[error("unsupported wire schema version {version} (expected {SCHEMA_VERSION})")]
    UnsupportedVersion {
        /// The version found in the envelope.
        version: u32,
    },

    /// JSON serialization or deserialization failed.
    #[error("wire serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Versioned wrapper around a serializable payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Schema version the payload was written with.
    pub version: u32,
    /// The wrapped payload.
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Wraps a payload at the current schema version.
    pub fn new(payload: T) -> Self {
        Self {
            version: SCHEMA_VERSION,
            payload,
        }
    }
}

/// Encodes a payload as a pretty-printed envelope at [`SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns [`WireError::Json`] when the payload cannot be serialized.
pub fn encode<T: Serialize>(payload: &T) -> Result<String, WireError> {
    let envelope = Envelope {
        version: SCHEMA_VERSION,
        payload,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Decodes an envelope, checking the schema version before touching the
/// payload shape.
///
/// # Errors
///
/// Returns [`WireError::UnsupportedVersion`] for a version mismatch and
/// [`WireError::Json`] for malformed JSON or payloads.
pub fn decode<T: DeserializeOwned>(json: &str) -> Result<T, WireError> {
    #[derive(Deserialize)]
    struct VersionProbe {
        version: u32,
    }

    let probe: VersionProbe = serde_json::from_str(json)?;
    if probe.version != SCHEMA_VERSION {
        return Err(WireError::UnsupportedVersion {
            version: probe.version,
        });
    }

    let envelope: Envelope<T> = serde_json::from_str(json)?;
    Ok(envelope.payload)
}
