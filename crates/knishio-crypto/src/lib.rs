//! # Knish.IO Crypto
//!
//! Optional message encryption between wallets. Not on the signing path.
//!
//! ## Methods
//!
//! - **Sealed box** (version 1): ephemeral X25519 key agreement, a BLAKE3
//!   derived key and ChaCha20-Poly1305.
//! - **Kyber768** (version 2): a KEM shared secret keys the same AEAD.
//!
//! Both sit behind [`MessageCipher`]; [`EncryptedMessage`] carries the
//! version so either can be opened later.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use knishio_core::Wallet;
//! use knishio_crypto::WalletKeys;
//!
//! let alice = Wallet::new(&"a1".repeat(1024), "USER", None).unwrap();
//! let bob = Wallet::new(&"b2".repeat(1024), "USER", None).unwrap();
//! let alice_keys = WalletKeys::from_wallet(&alice).unwrap();
//! let bob_keys = WalletKeys::from_wallet(&bob).unwrap();
//!
//! let message = alice_keys
//!     .encrypt_for(b"hello", &bob_keys.pubkey(), bob.characters)
//!     .unwrap();
//! assert_eq!(bob_keys.decrypt(&message).unwrap(), b"hello");
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod kem;
pub mod wallet_keys;

pub use crypto::{MessageKey, MessageNonce, X25519PublicKey, X25519SecretKey};
pub use envelope::{
    open_with, EncryptedMessage, EncryptionVersion, KyberBox, MessageCipher, SealedBox,
};
pub use error::{CryptoError, Result};
pub use kem::KyberKeypair;
pub use wallet_keys::WalletKeys;
