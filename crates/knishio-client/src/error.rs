//! Error types for the client.

use knishio_core::{CheckError, CoreError};
use knishio_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Key derivation or molecule assembly failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Local validation rejected the molecule before submission.
    #[error("validation error: {0}")]
    Check(#[from] CheckError),

    /// Message encryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Another molecule is already being built from this position.
    #[error("position {0} already has a molecule in flight")]
    PositionInUse(String),

    /// This position has already signed an accepted molecule.
    #[error("position {0} has already been spent")]
    PositionSpent(String),

    /// The node refused the molecule.
    #[error("molecule rejected ({status}): {reason}")]
    Rejected { status: String, reason: String },

    /// The transport could not deliver the request.
    #[error("transport error: {0}")]
    Transport(String),

    /// No wallet for this token on the bundle.
    #[error("no {token} wallet for bundle {bundle}")]
    WalletNotFound { bundle: String, token: String },

    /// The wallet exists only as a shadow and must be claimed first.
    #[error("{0} wallet is a shadow wallet; claim it before spending")]
    ShadowWallet(String),

    /// No usable auth token for the node.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Payload or snapshot (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A global subscriber was already installed.
    #[error("logging error: {0}")]
    Logging(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
