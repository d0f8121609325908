//! Encryption keys bound to a wallet.
//!
//! The X25519 key is derived from the wallet's private key, so any client
//! holding the secret can recreate it. The Kyber key is random: the KEM
//! offers no seeded key generation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use knishio_core::{Characters, Wallet};

use crate::crypto::{X25519PublicKey, X25519SecretKey};
use crate::envelope::{open_with, EncryptedMessage, KyberBox, MessageCipher, SealedBox};
use crate::error::{CryptoError, Result};

/// Sealed-box and Kyber ciphers for one wallet.
pub struct WalletKeys {
    characters: Characters,
    sealed: SealedBox,
    kyber: KyberBox,
}

impl WalletKeys {
    pub fn from_wallet(wallet: &Wallet) -> Result<Self> {
        let key = wallet.key().ok_or(CryptoError::MissingWalletKey)?;
        Ok(Self {
            characters: wallet.characters,
            sealed: SealedBox::new(X25519SecretKey::from_wallet_key(key)?),
            kyber: KyberBox::generate(),
        })
    }

    /// X25519 public key in the wallet's character set.
    pub fn pubkey(&self) -> String {
        self.sealed.x25519_public().encode(self.characters)
    }

    /// Kyber768 public key, base64.
    pub fn kyber_pubkey(&self) -> String {
        STANDARD.encode(self.kyber.public_key())
    }

    /// Record the encoded public key on the wallet so builders publish it.
    pub fn attach(&self, wallet: &mut Wallet) {
        wallet.pubkey = Some(self.pubkey());
    }

    /// Seal for a recipient's encoded X25519 public key.
    pub fn encrypt_for(
        &self,
        plaintext: &[u8],
        recipient_pubkey: &str,
        characters: Characters,
    ) -> Result<EncryptedMessage> {
        let recipient = X25519PublicKey::decode(recipient_pubkey, characters)?;
        self.sealed.encrypt(plaintext, recipient.as_bytes())
    }

    /// Encrypt for a recipient's base64 Kyber768 public key.
    pub fn encrypt_for_kyber(
        &self,
        plaintext: &[u8],
        recipient_kyber_pubkey: &str,
    ) -> Result<EncryptedMessage> {
        let recipient = STANDARD
            .decode(recipient_kyber_pubkey)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        self.kyber.encrypt(plaintext, &recipient)
    }

    /// Open a message of either version.
    pub fn decrypt(&self, message: &EncryptedMessage) -> Result<Vec<u8>> {
        open_with(message, &[&self.sealed, &self.kyber])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(secret: &str) -> Wallet {
        Wallet::new(&secret.repeat(1024), "USER", None).unwrap()
    }

    #[test]
    fn test_pubkey_is_stable_for_wallet() {
        let w = wallet("a1");
        let a = WalletKeys::from_wallet(&w).unwrap();
        let b = WalletKeys::from_wallet(&w).unwrap();
        assert_eq!(a.pubkey(), b.pubkey());
        assert_ne!(a.kyber_pubkey(), b.kyber_pubkey());
    }

    #[test]
    fn test_attach_sets_pubkey() {
        let mut w = wallet("a1");
        let keys = WalletKeys::from_wallet(&w).unwrap();
        keys.attach(&mut w);
        assert_eq!(w.pubkey, Some(keys.pubkey()));
    }

    #[test]
    fn test_wallet_to_wallet_sealed() {
        let alice = WalletKeys::from_wallet(&wallet("a1")).unwrap();
        let bob_wallet = wallet("b2");
        let bob = WalletKeys::from_wallet(&bob_wallet).unwrap();

        let message = alice
            .encrypt_for(b"hello", &bob.pubkey(), bob_wallet.characters)
            .unwrap();
        assert_eq!(bob.decrypt(&message).unwrap(), b"hello");
        assert!(alice.decrypt(&message).is_err());
    }

    #[test]
    fn test_wallet_to_wallet_kyber() {
        let alice = WalletKeys::from_wallet(&wallet("a1")).unwrap();
        let bob = WalletKeys::from_wallet(&wallet("b2")).unwrap();

        let message = alice.encrypt_for_kyber(b"pq", &bob.kyber_pubkey()).unwrap();
        assert_eq!(bob.decrypt(&message).unwrap(), b"pq");
    }

    #[test]
    fn test_shadow_wallet_has_no_keys() {
        let shadow = Wallet::shadow("bundle", "USER");
        assert!(matches!(
            WalletKeys::from_wallet(&shadow),
            Err(CryptoError::MissingWalletKey)
        ));
    }
}
