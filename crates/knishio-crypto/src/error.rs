//! Error types for message encryption.

use thiserror::Error;

use crate::envelope::EncryptionVersion;

/// Errors raised while encrypting or opening a message.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("decryption error: {0}")]
    Decryption(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("unknown envelope version {0}")]
    UnknownVersion(u8),

    #[error("no cipher for envelope version {0:?}")]
    UnsupportedVersion(EncryptionVersion),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("wallet has no private key")]
    MissingWalletKey,

    #[error("core error: {0}")]
    Core(#[from] knishio_core::CoreError),
}

/// Result type for encryption operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
