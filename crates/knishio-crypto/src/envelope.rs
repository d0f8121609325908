//! Versioned encrypted message envelope.
//!
//! Every envelope records which method produced it, so messages sealed by
//! an older client still open after the default changes.
//!
//! | Version | Method |
//! |---|---|
//! | 1 | X25519 sealed box (ephemeral ECDH + ChaCha20-Poly1305) |
//! | 2 | Kyber768 KEM + ChaCha20-Poly1305 |

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::{seal_key, MessageKey, MessageNonce, X25519PublicKey, X25519SecretKey};
use crate::error::{CryptoError, Result};
use crate::kem::{encapsulate, KyberKeypair};

/// Method tag carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum EncryptionVersion {
    SealedBox = 1,
    MlKem768 = 2,
}

impl TryFrom<u8> for EncryptionVersion {
    type Error = CryptoError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::SealedBox),
            2 => Ok(Self::MlKem768),
            other => Err(CryptoError::UnknownVersion(other)),
        }
    }
}

impl From<EncryptionVersion> for u8 {
    fn from(version: EncryptionVersion) -> Self {
        version as u8
    }
}

/// An encrypted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    pub version: EncryptionVersion,

    /// Ephemeral X25519 public key (v1) or Kyber ciphertext (v2).
    pub encapsulation: Vec<u8>,

    pub nonce: MessageNonce,

    /// Sealed plaintext, including the authentication tag.
    pub ciphertext: Vec<u8>,
}

impl EncryptedMessage {
    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CryptoError::Serialization(e.to_string()))
    }

    /// Base64 of the CBOR bytes, for text transports.
    pub fn to_base64(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

/// A message encryption method.
///
/// `encrypt` addresses a recipient by public key bytes; `decrypt` opens with
/// the cipher's own secret key.
pub trait MessageCipher {
    fn version(&self) -> EncryptionVersion;

    /// This cipher's public key, as recipients should address it.
    fn public_key(&self) -> Vec<u8>;

    fn encrypt(&self, plaintext: &[u8], recipient: &[u8]) -> Result<EncryptedMessage>;

    fn decrypt(&self, message: &EncryptedMessage) -> Result<Vec<u8>>;
}

/// Anonymous public-key encryption over X25519.
pub struct SealedBox {
    secret: X25519SecretKey,
}

impl SealedBox {
    pub fn new(secret: X25519SecretKey) -> Self {
        Self { secret }
    }

    pub fn x25519_public(&self) -> X25519PublicKey {
        self.secret.public_key()
    }
}

impl MessageCipher for SealedBox {
    fn version(&self) -> EncryptionVersion {
        EncryptionVersion::SealedBox
    }

    fn public_key(&self) -> Vec<u8> {
        self.secret.public_key().0.to_vec()
    }

    fn encrypt(&self, plaintext: &[u8], recipient: &[u8]) -> Result<EncryptedMessage> {
        let recipient = X25519PublicKey::from_slice(recipient)?;
        let (key, ephemeral) = seal_key(&recipient);
        let nonce = MessageNonce::generate();
        let ciphertext = key.seal(plaintext, &nonce)?;
        Ok(EncryptedMessage {
            version: self.version(),
            encapsulation: ephemeral.0.to_vec(),
            nonce,
            ciphertext,
        })
    }

    fn decrypt(&self, message: &EncryptedMessage) -> Result<Vec<u8>> {
        if message.version != self.version() {
            return Err(CryptoError::UnsupportedVersion(message.version));
        }
        let ephemeral = X25519PublicKey::from_slice(&message.encapsulation)?;
        self.secret
            .open_key(&ephemeral)
            .open(&message.ciphertext, &message.nonce)
    }
}

/// Post-quantum encryption over Kyber768.
pub struct KyberBox {
    keypair: KyberKeypair,
}

impl KyberBox {
    pub fn new(keypair: KyberKeypair) -> Self {
        Self { keypair }
    }

    pub fn generate() -> Self {
        Self::new(KyberKeypair::generate())
    }
}

impl MessageCipher for KyberBox {
    fn version(&self) -> EncryptionVersion {
        EncryptionVersion::MlKem768
    }

    fn public_key(&self) -> Vec<u8> {
        self.keypair.public_key().to_vec()
    }

    fn encrypt(&self, plaintext: &[u8], recipient: &[u8]) -> Result<EncryptedMessage> {
        let (shared, kem_ciphertext) = encapsulate(recipient)?;
        let key = MessageKey::derive_from_kem(&shared, &kem_ciphertext);
        let nonce = MessageNonce::generate();
        let ciphertext = key.seal(plaintext, &nonce)?;
        Ok(EncryptedMessage {
            version: self.version(),
            encapsulation: kem_ciphertext,
            nonce,
            ciphertext,
        })
    }

    fn decrypt(&self, message: &EncryptedMessage) -> Result<Vec<u8>> {
        if message.version != self.version() {
            return Err(CryptoError::UnsupportedVersion(message.version));
        }
        let shared = self.keypair.decapsulate(&message.encapsulation)?;
        MessageKey::derive_from_kem(&shared, &message.encapsulation)
            .open(&message.ciphertext, &message.nonce)
    }
}

/// Open `message` with whichever cipher matches its version.
pub fn open_with(message: &EncryptedMessage, ciphers: &[&dyn MessageCipher]) -> Result<Vec<u8>> {
    ciphers
        .iter()
        .find(|c| c.version() == message.version)
        .ok_or(CryptoError::UnsupportedVersion(message.version))?
        .decrypt(message)
}
