//! # Knish.IO Testkit
//!
//! Testing utilities for the Knish.IO crates.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Scenario vectors**: fixed derivation inputs whose outputs must agree
//!   across implementations
//! - **Generators**: Proptest strategies for atoms, hashes and meta
//! - **Fixtures**: Secrets, wallets and signed molecules for test setup
//!
//! ## Scenario Vectors
//!
//! ```rust
//! use knishio_testkit::vectors::{all_vectors, derive};
//!
//! for vector in all_vectors() {
//!     let derived = derive(&vector);
//!     println!("{}: {}", vector.name, derived.address);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use knishio_core::{hash_atoms, HashEncoding};
//! use knishio_testkit::generators::atoms;
//!
//! proptest! {
//!     #[test]
//!     fn hash_is_deterministic(atoms in atoms(4)) {
//!         prop_assert_eq!(
//!             hash_atoms(&atoms, HashEncoding::Hex).unwrap(),
//!             hash_atoms(&atoms, HashEncoding::Hex).unwrap()
//!         );
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use knishio_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::with_seed("alice");
//! let (molecule, sender) = fixture.signed_transfer("CRZY", 1000.0, 10.0);
//! assert!(molecule.check(Some(&sender)).is_ok());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, test_secret, zero_position, TestFixture};
pub use generators::{atom_from_params, AtomParams};
pub use vectors::{all_vectors, derive, verify_all_vectors, DerivedVector, ScenarioVector};
