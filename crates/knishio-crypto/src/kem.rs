//! Kyber768 key encapsulation.
//!
//! Used only as a shared-secret generator; the secret keys a symmetric
//! cipher, see [`crate::envelope`].

use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::{Ciphertext, PublicKey, SecretKey, SharedSecret};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

/// A Kyber768 key pair. The secret half is wiped on drop.
pub struct KyberKeypair {
    public: Vec<u8>,
    secret: Zeroizing<Vec<u8>>,
}

impl KyberKeypair {
    pub fn generate() -> Self {
        let (pk, sk) = kyber768::keypair();
        Self {
            public: pk.as_bytes().to_vec(),
            secret: Zeroizing::new(sk.as_bytes().to_vec()),
        }
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public
    }

    /// Recover the shared secret from a ciphertext addressed to this key.
    pub fn decapsulate(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let sk = kyber768::SecretKey::from_bytes(&self.secret)
            .map_err(|_| CryptoError::InvalidKey("invalid Kyber768 secret key".into()))?;
        let ct = kyber768::Ciphertext::from_bytes(ciphertext)
            .map_err(|_| CryptoError::Decryption("invalid Kyber768 ciphertext".into()))?;
        let shared = kyber768::decapsulate(&ct, &sk);
        Ok(Zeroizing::new(shared.as_bytes().to_vec()))
    }
}

/// Encapsulate a fresh shared secret for `public_key`.
///
/// Returns the shared secret and the ciphertext to send.
pub fn encapsulate(public_key: &[u8]) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
    let pk = kyber768::PublicKey::from_bytes(public_key)
        .map_err(|_| CryptoError::InvalidKey("invalid Kyber768 public key".into()))?;
    let (shared, ciphertext) = kyber768::encapsulate(&pk);
    Ok((
        Zeroizing::new(shared.as_bytes().to_vec()),
        ciphertext.as_bytes().to_vec(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encapsulate_decapsulate() {
        let keypair = KyberKeypair::generate();
        assert_eq!(keypair.public_key().len(), kyber768::public_key_bytes());

        let (shared, ciphertext) = encapsulate(keypair.public_key()).unwrap();
        assert_eq!(ciphertext.len(), kyber768::ciphertext_bytes());
        assert_eq!(keypair.decapsulate(&ciphertext).unwrap(), shared);
    }

    #[test]
    fn test_rejects_bad_public_key() {
        assert!(matches!(encapsulate(&[0u8; 10]), Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_rejects_truncated_ciphertext() {
        let keypair = KyberKeypair::generate();
        assert!(keypair.decapsulate(&[0u8; 10]).is_err());
    }
}
