//! # Knish.IO Core
//!
//! Pure primitives for the Knish.IO ledger client: sponge hashing, wallet
//! derivation, atoms and molecules, one-time signatures and validation.
//!
//! This crate contains no I/O, no networking and no logging. Every function
//! is a deterministic computation over its inputs, apart from random
//! position and secret generation.
//!
//! ## Key Types
//!
//! - [`Wallet`] - Keys derived from `(secret, token, position)`
//! - [`Atom`] - One transaction fact, tagged with an [`Isotope`]
//! - [`Molecule`] - Atoms signed together with one one-time signature
//!
//! ## Canonicalization
//!
//! The molecular hash absorbs a fixed field table. See [`canonical`].

pub mod atom;
pub mod builders;
pub mod canonical;
pub mod encoding;
pub mod error;
pub mod molecule;
pub mod ots;
pub mod sponge;
pub mod types;
pub mod validation;
pub mod wallet;

pub use atom::{Atom, AtomBuilder};
pub use builders::{RuleCondition, TokenSettings};
pub use canonical::{hash_atoms, HashEncoding};
pub use encoding::{Base58, Base58Alphabet, Characters};
pub use error::{CheckError, CoreError, FailureKind, Result};
pub use molecule::{Molecule, SignOptions};
pub use sponge::{hash, Sponge};
pub use types::{Isotope, MetaItem, TokenUnit, AUTH_TOKEN, USER_TOKEN};
pub use validation::{verify, CheckResult};
pub use wallet::{Wallet, WalletRecord};
