//! Session and server configuration.
//!
//! Configuration is plain data loaded from JSON. Every field is optional;
//! missing fields take the defaults listed on [`SessionConfig`].
//!
//! Delimiters are byte sequences. They can be written as a JSON string
//! (taken as its UTF-8 bytes) or as an array of byte values, which allows
//! delimiters that are not valid UTF-8: `"request_delimiter": [255, 0]`.
//!
//! # Example
//!
//! ```
//! use framewire::config::{RequestClassifier, SessionConfig};
//!
//! let config = SessionConfig::from_json_str(r#"{
//!     "request_delimiter": "\r\n",
//!     "request_classifier": "never",
//!     "log_preview_bytes": 32
//! }"#).unwrap();
//!
//! assert_eq!(config.request_delimiter, b"\r\n");
//! assert_eq!(config.request_classifier, RequestClassifier::Never);
//! assert_eq!(config.read_chunk_size, 256);
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::classify::{self, Classifier, ClassifierPair};
use crate::error::{FramewireError, Result};
use crate::framing::DEFAULT_READ_CHUNK_SIZE;

/// Bundled request classifiers selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClassifier {
    /// First three bytes are zero.
    #[default]
    FirstThreeZero,
    /// Never a request.
    Never,
}

impl RequestClassifier {
    /// The predicate this option selects.
    pub fn classifier(self) -> Arc<dyn Classifier> {
        match self {
            RequestClassifier::FirstThreeZero => Arc::new(classify::first_three_zero),
            RequestClassifier::Never => Arc::new(classify::never),
        }
    }
}

/// Bundled response classifiers selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseClassifier {
    /// Starts with `HTTP/`.
    #[default]
    HttpResponse,
    /// Never a response.
    Never,
}

impl ResponseClassifier {
    /// The predicate this option selects.
    pub fn classifier(self) -> Arc<dyn Classifier> {
        match self {
            ResponseClassifier::HttpResponse => Arc::new(classify::http_response),
            ResponseClassifier::Never => Arc::new(classify::never),
        }
    }
}

/// Per-session options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Delimiter used to frame every message. Empty disables it. Default: empty.
    #[serde(deserialize_with = "delimiter_bytes")]
    pub request_delimiter: Vec<u8>,
    /// Response-direction delimiter. Stored but not used for framing. Default: empty.
    #[serde(deserialize_with = "delimiter_bytes")]
    pub response_delimiter: Vec<u8>,
    /// Default: `first_three_zero`.
    pub request_classifier: RequestClassifier,
    /// Default: `http_response`.
    pub response_classifier: ResponseClassifier,
    /// Bytes per incremental read. Default: 256.
    pub read_chunk_size: usize,
    /// When set, both chains start with a `log_preview` stage of this size.
    pub log_preview_bytes: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_delimiter: Vec::new(),
            response_delimiter: Vec::new(),
            request_classifier: RequestClassifier::default(),
            response_classifier: ResponseClassifier::default(),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            log_preview_bytes: None,
        }
    }
}

/// Accept a delimiter as either a string or an array of bytes.
fn delimiter_bytes<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Delimiter {
        Text(String),
        Bytes(Vec<u8>),
    }

    Ok(match Delimiter::deserialize(deserializer)? {
        Delimiter::Text(text) => text.into_bytes(),
        Delimiter::Bytes(bytes) => bytes,
    })
}

impl SessionConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check option values.
    pub fn validate(&self) -> Result<()> {
        if self.read_chunk_size == 0 {
            return Err(FramewireError::Config(
                "read_chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Classifier pair selected by this configuration.
    pub fn classifiers(&self) -> ClassifierPair {
        ClassifierPair::from_shared(
            self.request_classifier.classifier(),
            self.response_classifier.classifier(),
        )
    }
}

/// Options for the bundled [`Server`](crate::server::Server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `127.0.0.1:9004`.
    pub listen: String,
    /// Options applied to every accepted connection.
    #[serde(default)]
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check option values.
    pub fn validate(&self) -> Result<()> {
        if self.listen.trim().is_empty() {
            return Err(FramewireError::Config("listen must not be empty".to_string()));
        }
        self.session.validate()
    }
}
