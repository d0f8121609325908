//! X25519 key agreement and ChaCha20-Poly1305 sealing.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use knishio_core::{hash, Characters};

use crate::error::{CryptoError, Result};

/// Domain label for symmetric keys derived from a key agreement.
const KDF_CONTEXT: &str = "knishio-crypto v1 message key";

/// An X25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse from a byte slice of exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode in a wallet character set; this is the `pubkey` meta value.
    pub fn encode(&self, characters: Characters) -> String {
        characters.encode(&self.0)
    }

    pub fn decode(encoded: &str, characters: Characters) -> Result<Self> {
        Self::from_slice(&characters.decode(encoded)?)
    }

    fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

/// A long-lived X25519 secret.
pub struct X25519SecretKey(StaticSecret);

impl X25519SecretKey {
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(rand::thread_rng()))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Derive from a wallet private key: the first 32 bytes of its sponge hash.
    pub fn from_wallet_key(key: &str) -> Result<Self> {
        let mut seed = hex::decode(hash(key, 32))
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let secret = X25519PublicKey::from_slice(&seed).map(|pk| Self::from_bytes(pk.0));
        seed.zeroize();
        secret
    }

    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(*PublicKey::from(&self.0).as_bytes())
    }

    /// Agree on a message key with the sender's ephemeral public key.
    pub fn open_key(&self, ephemeral: &X25519PublicKey) -> MessageKey {
        let shared = self.0.diffie_hellman(&ephemeral.to_dalek());
        MessageKey::derive(shared.as_bytes(), ephemeral, &self.public_key())
    }
}

/// Generate an ephemeral key, agree with `recipient` and return the message
/// key together with the ephemeral public key to ship alongside it.
pub fn seal_key(recipient: &X25519PublicKey) -> (MessageKey, X25519PublicKey) {
    let ephemeral = EphemeralSecret::random_from_rng(rand::thread_rng());
    let ephemeral_public = X25519PublicKey(*PublicKey::from(&ephemeral).as_bytes());
    let shared = ephemeral.diffie_hellman(&recipient.to_dalek());
    (
        MessageKey::derive(shared.as_bytes(), &ephemeral_public, recipient),
        ephemeral_public,
    )
}

/// A 256-bit ChaCha20-Poly1305 key, wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MessageKey([u8; 32]);

impl MessageKey {
    /// Derive from a shared secret, bound to both public keys.
    pub fn derive(shared: &[u8], ephemeral: &X25519PublicKey, recipient: &X25519PublicKey) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT);
        hasher.update(shared);
        hasher.update(&ephemeral.0);
        hasher.update(&recipient.0);
        Self(*hasher.finalize().as_bytes())
    }

    /// Derive from a KEM shared secret and the ciphertext that produced it.
    pub fn derive_from_kem(shared: &[u8], kem_ciphertext: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT);
        hasher.update(shared);
        hasher.update(kem_ciphertext);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn seal(&self, plaintext: &[u8], nonce: &MessageNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        cipher
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    pub fn open(&self, ciphertext: &[u8], nonce: &MessageNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|e| CryptoError::Decryption(e.to_string()))
    }
}

/// A 96-bit ChaCha20-Poly1305 nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageNonce(pub [u8; 12]);

impl MessageNonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sealed_key_agreement() {
        let recipient = X25519SecretKey::generate();
        let (sender_key, ephemeral) = seal_key(&recipient.public_key());
        let recipient_key = recipient.open_key(&ephemeral);
        assert_eq!(sender_key.as_bytes(), recipient_key.as_bytes());
    }

    #[test]
    fn test_wallet_key_derivation_deterministic() {
        let key = "ab".repeat(1024);
        let a = X25519SecretKey::from_wallet_key(&key).unwrap();
        let b = X25519SecretKey::from_wallet_key(&key).unwrap();
        assert_eq!(a.public_key(), b.public_key());

        let c = X25519SecretKey::from_wallet_key(&"cd".repeat(1024)).unwrap();
        assert_ne!(a.public_key(), c.public_key());
    }

    #[test]
    fn test_seal_open() {
        let (key, _) = seal_key(&X25519SecretKey::generate().public_key());
        let nonce = MessageNonce::generate();
        let ciphertext = key.seal(b"hello", &nonce).unwrap();
        assert_eq!(key.open(&ciphertext, &nonce).unwrap(), b"hello");
        assert!(key.open(&ciphertext, &MessageNonce::generate()).is_err());
    }

    #[test]
    fn test_public_key_encoding() {
        let pk = X25519SecretKey::generate().public_key();
        for characters in ["BASE64", "BITCOIN", "RIPPLE"] {
            let characters: Characters = characters.parse().unwrap();
            let encoded = pk.encode(characters);
            assert_eq!(X25519PublicKey::decode(&encoded, characters).unwrap(), pk);
        }
    }

    #[test]
    fn test_from_slice_length() {
        assert!(X25519PublicKey::from_slice(&[0u8; 31]).is_err());
    }
}
