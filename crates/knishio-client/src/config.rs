//! Client configuration.

use serde::{Deserialize, Serialize};

use knishio_core::{HashEncoding, SignOptions};

use crate::logging::LogFormat;

/// Configuration for a [`crate::KnishClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Node the client talks to; also the session cache key.
    pub node_uri: String,
    /// Cell stamped on every molecule.
    pub cell_slug: Option<String>,
    /// Run the full check suite locally before submitting.
    pub validate_before_submit: bool,
    /// Ship base64 signatures instead of hex.
    pub compressed_signatures: bool,
    /// Encoding used when reporting molecular hashes.
    pub hash_encoding: HashEncoding,
    /// Lifetime requested for auth tokens.
    pub auth_token_ttl_secs: u64,
    pub log_format: LogFormat,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            node_uri: "memory://local".into(),
            cell_slug: None,
            validate_before_submit: true,
            compressed_signatures: true,
            hash_encoding: HashEncoding::Base17,
            auth_token_ttl_secs: 3600,
            log_format: LogFormat::Human,
            log_level: "info".into(),
        }
    }
}

impl ClientConfig {
    pub fn with_node_uri(mut self, node_uri: impl Into<String>) -> Self {
        self.node_uri = node_uri.into();
        self
    }

    pub fn with_cell_slug(mut self, cell_slug: impl Into<String>) -> Self {
        self.cell_slug = Some(cell_slug.into());
        self
    }

    /// Install the global subscriber described by this config.
    pub fn init_logging(&self) -> crate::error::Result<()> {
        crate::logging::init_logging(self.log_format, &self.log_level)
    }

    pub(crate) fn sign_options(&self) -> SignOptions {
        SignOptions {
            anonymous: false,
            compressed: self.compressed_signatures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert!(config.validate_before_submit);
        assert!(config.sign_options().compressed);
        assert_eq!(config.hash_encoding, HashEncoding::Base17);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"nodeUri":"https://node.example","logFormat":"json"}"#)
                .unwrap();
        assert_eq!(config.node_uri, "https://node.example");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.auth_token_ttl_secs, 3600);
    }
}
