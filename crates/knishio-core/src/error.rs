//! Error types for the Knish.IO core.

use thiserror::Error;

use crate::types::Isotope;

/// Coarse classification shared by every failure the core can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Missing meta field, bad JSON, wrong-length signature, unparsable number.
    Malformed,
    /// Duplicate index, missing hash, empty molecule, wrong token for an isotope.
    Structural,
    /// Negative amounts, insufficient balance, unbalanced transfers.
    Economic,
    /// Signature or hash does not match.
    Cryptographic,
    /// Caller broke a precondition (uninitialized wallet, missing secret).
    CodeContract,
}

/// Errors raised while deriving keys or assembling molecules.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("secret is required for this operation")]
    MissingSecret,

    #[error("wallet has no position; derive or generate one before signing")]
    MissingPosition,

    #[error("molecule has no source wallet")]
    MissingSourceWallet,

    #[error("molecule has no remainder wallet")]
    MissingRemainderWallet,

    #[error("invalid hex input: {0}")]
    InvalidHex(String),

    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("amount cannot be negative: {0}")]
    NegativeAmount(f64),

    #[error("insufficient balance: have {balance}, need {amount}")]
    BalanceInsufficient { balance: f64, amount: f64 },

    #[error("stackable tokens cannot declare decimals")]
    StackableUnitDecimals,

    #[error("stackable tokens take their amount from the unit list")]
    StackableUnitAmount,

    #[error("missing meta field: {0}")]
    MetaMissing(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("check failed: {0}")]
    Check(#[from] CheckError),
}

impl CoreError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            CoreError::MissingSecret
            | CoreError::MissingPosition
            | CoreError::MissingSourceWallet
            | CoreError::MissingRemainderWallet => FailureKind::CodeContract,
            CoreError::InvalidHex(_)
            | CoreError::InvalidKeyLength { .. }
            | CoreError::Encoding(_)
            | CoreError::MetaMissing(_)
            | CoreError::Serialization(_) => FailureKind::Malformed,
            CoreError::NegativeAmount(_)
            | CoreError::BalanceInsufficient { .. }
            | CoreError::StackableUnitDecimals
            | CoreError::StackableUnitAmount => FailureKind::Economic,
            CoreError::Check(e) => e.kind(),
        }
    }
}

/// Molecule check failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    #[error("molecule has no atoms")]
    AtomsMissing,

    #[error("molecular hash has not been computed")]
    MolecularHashMissing,

    #[error("molecular hash does not match the atoms")]
    MolecularHashMismatch,

    #[error("one-time signature is malformed")]
    SignatureMalformed,

    #[error("one-time signature does not match wallet address")]
    SignatureMismatch,

    #[error("duplicate atom index {0}")]
    DuplicateIndex(usize),

    #[error("isotope {isotope} atom has invalid index {index}")]
    AtomIndex { isotope: Isotope, index: usize },

    #[error("isotope {isotope} requires token {expected}, got {found}")]
    WrongToken {
        isotope: Isotope,
        expected: &'static str,
        found: String,
    },

    #[error("molecule is missing a ContinuID atom")]
    ContinuIdMissing,

    #[error("batch id mismatch: {0}")]
    BatchId(String),

    #[error("missing meta field: {0}")]
    MetaMissing(String),

    #[error("malformed meta: {0}")]
    MetaMalformed(String),

    #[error("malformed JSON in meta field {field}: {reason}")]
    MalformedJson { field: String, reason: String },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("transfer atoms reference different tokens")]
    TransferMismatched,

    #[error("transfer atom carries a negative amount")]
    TransferMalformed,

    #[error("transfer to the signing wallet itself")]
    TransferToSelf,

    #[error("transfer values do not sum to zero")]
    TransferUnbalanced,

    #[error("insufficient balance for transfer")]
    TransferBalance,

    #[error("remainder does not match balance minus debit")]
    TransferRemainder,
}

impl CheckError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            CheckError::SignatureMalformed
            | CheckError::MetaMissing(_)
            | CheckError::MetaMalformed(_)
            | CheckError::MalformedJson { .. }
            | CheckError::InvalidValue(_) => FailureKind::Malformed,
            CheckError::AtomsMissing
            | CheckError::MolecularHashMissing
            | CheckError::DuplicateIndex(_)
            | CheckError::AtomIndex { .. }
            | CheckError::WrongToken { .. }
            | CheckError::ContinuIdMissing
            | CheckError::BatchId(_) => FailureKind::Structural,
            CheckError::TransferMismatched
            | CheckError::TransferMalformed
            | CheckError::TransferToSelf
            | CheckError::TransferUnbalanced
            | CheckError::TransferBalance
            | CheckError::TransferRemainder => FailureKind::Economic,
            CheckError::MolecularHashMismatch | CheckError::SignatureMismatch => {
                FailureKind::Cryptographic
            }
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
