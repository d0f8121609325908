//! # Knish.IO Client
//!
//! Async orchestration over the pure [`knishio_core`] primitives: sessions,
//! single-writer position locks, transports and high-level operations.
//!
//! ## Overview
//!
//! - **Transport**: delivers signed molecules and answers wallet queries.
//!   [`transport::memory::MemoryTransport`] is an in-process node for tests.
//! - **Session**: auth tokens cached per node URI, with snapshot/restore.
//! - **Position locks**: one molecule in flight per signing position; a
//!   position is never signed twice.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use knishio_client::{ClientConfig, KnishClient, TokenSettings};
//! use knishio_client::transport::memory::MemoryTransport;
//!
//! async fn example() {
//!     let config = ClientConfig::default();
//!     let node = MemoryTransport::new(config.node_uri.clone());
//!     let client = KnishClient::new("a1".repeat(1024), node, config);
//!
//!     // Mint a token, then send some of it away
//!     client
//!         .create_token("CRZY", 1000.0, &TokenSettings::default())
//!         .await
//!         .unwrap();
//!     client
//!         .transfer_token("recipient-bundle-hash", "CRZY", 100.0)
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `knishio_client::core` - Wallets, molecules, validation
//! - `knishio_client::crypto` - Message encryption

pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod session;
pub mod transport;

pub use knishio_core as core;
pub use knishio_crypto as crypto;

pub use client::KnishClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use guard::{PositionGuard, PositionLocks};
pub use logging::{init_logging, LogFormat};
pub use session::{AuthToken, AuthTokenSnapshot, Session};
pub use transport::{AuthGrant, SubmitResult, SubmitStatus, Transport};

pub use knishio_core::{
    CheckError, CoreError, MetaItem, Molecule, RuleCondition, TokenSettings, TokenUnit, Wallet,
    WalletRecord,
};
