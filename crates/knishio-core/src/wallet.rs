//! Wallet key derivation.
//!
//! A wallet is a derivation result, not an account: `(secret, token, position)`
//! deterministically yields a private key and a public address. The bundle
//! depends on the secret alone and groups every wallet a user owns.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::encoding::{chunk_substr, random_hex, Characters};
use crate::error::{CoreError, Result};
use crate::sponge::{hash, Sponge};
use crate::types::TokenUnit;

/// Private key length in bytes (2048 hex characters).
pub const PRIVATE_KEY_BYTES: usize = 1024;

/// Number of key fragments.
pub const KEY_FRAGMENTS: usize = 16;

/// Hex characters per key fragment.
pub const FRAGMENT_HEX_LEN: usize = 128;

/// Hash steps applied to each fragment when deriving the address.
pub const CHAIN_LENGTH: usize = 16;

/// Default position length in hex characters.
pub const POSITION_LEN: usize = 64;

/// Derive the private key from `secret`, `token` and `position`.
///
/// Secret and position are read as base-16 integers and added without
/// modulus; the hex sum and then the token (if non-empty) are absorbed.
pub fn generate_private_key(secret: &str, token: &str, position: &str) -> Result<String> {
    let s = parse_hex_int(secret)?;
    let p = parse_hex_int(position)?;
    let indexed_key = (s + p).to_str_radix(16);

    let mut sponge = Sponge::new();
    sponge.absorb(indexed_key);
    if !token.is_empty() {
        sponge.absorb(token);
    }
    Ok(sponge.squeeze_hex(PRIVATE_KEY_BYTES))
}

/// Advance one fragment `steps` times along its hash chain.
pub fn chain_fragment(fragment: &str, steps: usize) -> String {
    let mut current = fragment.to_string();
    for _ in 0..steps {
        current = hash(&current, FRAGMENT_HEX_LEN / 2);
    }
    current
}

/// Collapse 16 fully-chained fragments into an address.
///
/// Shared by key derivation and signature recovery.
pub fn address_from_chain_ends<S: AsRef<str>>(ends: &[S]) -> String {
    let mut sponge = Sponge::new();
    for end in ends {
        sponge.absorb(end.as_ref());
    }
    let digest = sponge.squeeze_hex(PRIVATE_KEY_BYTES);
    hash(digest, 32)
}

/// Derive the public address from a private key.
pub fn generate_address(key: &str) -> Result<String> {
    if key.len() != PRIVATE_KEY_BYTES * 2 {
        return Err(CoreError::InvalidKeyLength {
            expected: PRIVATE_KEY_BYTES * 2,
            got: key.len(),
        });
    }
    let ends: Vec<String> = chunk_substr(key, FRAGMENT_HEX_LEN)
        .into_iter()
        .map(|chunk| chain_fragment(chunk, CHAIN_LENGTH))
        .collect();
    Ok(address_from_chain_ends(&ends))
}

/// Identity hash of a secret.
pub fn generate_bundle_hash(secret: &str) -> String {
    hash(secret, 32)
}

/// Fresh random position.
pub fn generate_position(length: usize) -> String {
    random_hex(length)
}

/// Derive a secret from a seed, or generate a random one.
///
/// `length` is in hex characters.
pub fn generate_secret(seed: Option<&str>, length: usize) -> String {
    match seed {
        Some(seed) => hash(seed, length / 2),
        None => random_hex(length),
    }
}

/// Deterministic batch id from a molecular hash and atom index, or a random one.
pub fn generate_batch_id(molecular_hash: Option<&str>, index: Option<usize>) -> String {
    match (molecular_hash, index) {
        (Some(h), Some(i)) => hash(format!("{h}{i}"), 32),
        _ => random_hex(64),
    }
}

fn parse_hex_int(s: &str) -> Result<BigUint> {
    if s.is_empty() {
        return Err(CoreError::InvalidHex("empty".into()));
    }
    BigUint::parse_bytes(s.as_bytes(), 16)
        .ok_or_else(|| CoreError::InvalidHex(s.chars().take(16).collect()))
}

/// A derived (or shadow) wallet.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    #[serde(skip)]
    secret: Option<String>,
    #[serde(skip)]
    key: Option<String>,
    pub token: String,
    pub position: Option<String>,
    pub address: Option<String>,
    pub bundle: Option<String>,
    pub batch_id: Option<String>,
    pub characters: Characters,
    /// Encoded encryption public key, if one has been attached.
    pub pubkey: Option<String>,
    /// Balance as reported by the ledger.
    pub balance: f64,
    pub token_units: Vec<TokenUnit>,
}

impl Wallet {
    /// Derive a wallet. A fresh position is generated when none is given.
    pub fn new(secret: &str, token: &str, position: Option<&str>) -> Result<Self> {
        let position = position
            .map(str::to_string)
            .unwrap_or_else(|| generate_position(POSITION_LEN));
        let key = generate_private_key(secret, token, &position)?;
        let address = generate_address(&key)?;

        Ok(Self {
            secret: Some(secret.to_string()),
            key: Some(key),
            token: token.to_string(),
            position: Some(position),
            address: Some(address),
            bundle: Some(generate_bundle_hash(secret)),
            batch_id: None,
            characters: Characters::default(),
            pubkey: None,
            balance: 0.0,
            token_units: Vec::new(),
        })
    }

    /// A reference-only wallet known by bundle alone.
    pub fn shadow(bundle: &str, token: &str) -> Self {
        Self {
            secret: None,
            key: None,
            token: token.to_string(),
            position: None,
            address: None,
            bundle: Some(bundle.to_string()),
            batch_id: None,
            characters: Characters::default(),
            pubkey: None,
            balance: 0.0,
            token_units: Vec::new(),
        }
    }

    /// Adapt a ledger record. With a secret and a position the keys are
    /// re-derived and must reproduce the record's address.
    pub fn from_record(record: WalletRecord, secret: Option<&str>) -> Result<Self> {
        let mut wallet = match (secret, record.position.as_deref()) {
            (Some(secret), Some(position)) => {
                let wallet = Wallet::new(secret, &record.token_slug, Some(position))?;
                if let Some(address) = record.address.as_deref() {
                    if wallet.address.as_deref() != Some(address) {
                        return Err(CoreError::Encoding(
                            "derived address does not match wallet record".into(),
                        ));
                    }
                }
                wallet
            }
            _ => Self {
                secret: secret.map(str::to_string),
                key: None,
                token: record.token_slug.clone(),
                position: record.position.clone(),
                address: record.address.clone(),
                bundle: None,
                batch_id: None,
                characters: Characters::default(),
                pubkey: None,
                balance: 0.0,
                token_units: Vec::new(),
            },
        };

        if record.bundle_hash.is_some() {
            wallet.bundle = record.bundle_hash;
        }
        wallet.batch_id = record.batch_id;
        if let Some(characters) = record.characters.as_deref() {
            wallet.characters = characters.parse()?;
        }
        wallet.pubkey = record.pubkey;
        wallet.balance = record
            .amount
            .as_deref()
            .map(parse_amount)
            .transpose()?
            .unwrap_or(0.0);
        wallet.token_units = record.token_units;
        Ok(wallet)
    }

    /// A wallet with the same secret and token at a fresh position.
    pub fn create_remainder(&self) -> Result<Self> {
        let secret = self.secret.as_deref().ok_or(CoreError::MissingSecret)?;
        let mut remainder = Wallet::new(secret, &self.token, None)?;
        remainder.characters = self.characters;
        remainder.batch_id = self.batch_id.clone();
        Ok(remainder)
    }

    /// Carry a batch id over from `source`. Remainders inherit it; recipients
    /// get a fresh one.
    pub fn init_batch_id(&mut self, source: &Wallet, is_remainder: bool) {
        if let Some(batch_id) = source.batch_id.as_deref() {
            self.batch_id = Some(if is_remainder {
                batch_id.to_string()
            } else {
                generate_batch_id(None, None)
            });
        }
    }

    /// True for placeholder wallets with neither position nor address.
    pub fn is_shadow(&self) -> bool {
        self.position.is_none() && self.address.is_none()
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// The private key. Only present on derived wallets.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn with_characters(mut self, characters: Characters) -> Self {
        self.characters = characters;
        self
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = |s: &Option<String>| {
            s.as_deref()
                .map(|s| s.chars().take(16).collect::<String>())
                .unwrap_or_else(|| "-".into())
        };
        f.debug_struct("Wallet")
            .field("token", &self.token)
            .field("position", &short(&self.position))
            .field("address", &short(&self.address))
            .field("bundle", &short(&self.bundle))
            .field("balance", &self.balance)
            .finish_non_exhaustive()
    }
}

fn parse_amount(s: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| CoreError::Encoding(format!("invalid amount {s:?}")))
}

/// Wallet as returned by a ledger query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub address: Option<String>,
    pub bundle_hash: Option<String>,
    pub token_slug: String,
    pub position: Option<String>,
    pub batch_id: Option<String>,
    pub characters: Option<String>,
    pub pubkey: Option<String>,
    pub amount: Option<String>,
    #[serde(default)]
    pub token_units: Vec<TokenUnit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> String {
        "a1".repeat(1024)
    }

    #[test]
    fn test_private_key_length() {
        let key = generate_private_key(&secret(), "USER", &"0".repeat(64)).unwrap();
        assert_eq!(key.len(), 2048);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = Wallet::new(&secret(), "USER", Some(&"0".repeat(64))).unwrap();
        let b = Wallet::new(&secret(), "USER", Some(&"0".repeat(64))).unwrap();
        assert_eq!(a.key(), b.key());
        assert_eq!(a.address, b.address);
        assert_eq!(a.address.as_ref().unwrap().len(), 64);
    }

    #[test]
    fn test_position_rotation_changes_keys() {
        let a = Wallet::new(&secret(), "USER", Some(&"0".repeat(64))).unwrap();
        let b = Wallet::new(&secret(), "USER", Some(&format!("{}1", "0".repeat(63)))).unwrap();
        assert_ne!(a.address, b.address);
        assert_eq!(a.bundle, b.bundle);
    }

    #[test]
    fn test_token_changes_keys() {
        let a = Wallet::new(&secret(), "USER", Some(&"0".repeat(64))).unwrap();
        let b = Wallet::new(&secret(), "AUTH", Some(&"0".repeat(64))).unwrap();
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_empty_token_not_absorbed() {
        let position = "0".repeat(64);
        let key = generate_private_key("ff", "", &position).unwrap();
        let mut sponge = Sponge::new();
        sponge.absorb("ff");
        assert_eq!(key, sponge.squeeze_hex(PRIVATE_KEY_BYTES));
    }

    #[test]
    fn test_private_key_adds_position() {
        // 0x0f + 0x01 = 0x10
        let a = generate_private_key("0f", "T", "01").unwrap();
        let b = generate_private_key("10", "T", "00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_hex_secret_rejected() {
        assert!(matches!(
            generate_private_key("zz", "USER", "00"),
            Err(CoreError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_address_rejects_short_key() {
        assert!(matches!(
            generate_address("abcd"),
            Err(CoreError::InvalidKeyLength { expected: 2048, got: 4 })
        ));
    }

    #[test]
    fn test_bundle_is_secret_hash() {
        let wallet = Wallet::new(&secret(), "USER", None).unwrap();
        assert_eq!(wallet.bundle.as_deref(), Some(hash(secret(), 32).as_str()));
        assert_eq!(wallet.position.as_ref().unwrap().len(), POSITION_LEN);
    }

    #[test]
    fn test_shadow_wallet() {
        let wallet = Wallet::shadow("bundle", "TOKEN");
        assert!(wallet.is_shadow());
        assert!(wallet.key().is_none());
        assert!(!Wallet::new(&secret(), "USER", None).unwrap().is_shadow());
    }

    #[test]
    fn test_remainder_keeps_identity() {
        let source = Wallet::new(&secret(), "TOKEN", None).unwrap().with_batch_id("b1");
        let remainder = source.create_remainder().unwrap();
        assert_eq!(remainder.bundle, source.bundle);
        assert_eq!(remainder.batch_id.as_deref(), Some("b1"));
        assert_ne!(remainder.position, source.position);
    }

    #[test]
    fn test_init_batch_id() {
        let source = Wallet::new(&secret(), "TOKEN", None).unwrap().with_batch_id("b1");
        let mut remainder = source.create_remainder().unwrap();
        remainder.init_batch_id(&source, true);
        assert_eq!(remainder.batch_id.as_deref(), Some("b1"));

        let mut recipient = Wallet::new(&generate_secret(None, 2048), "TOKEN", None).unwrap();
        recipient.init_batch_id(&source, false);
        let fresh = recipient.batch_id.unwrap();
        assert_ne!(fresh, "b1");
        assert_eq!(fresh.len(), 64);
    }

    #[test]
    fn test_generate_secret() {
        assert_eq!(generate_secret(Some("seed"), 2048), hash("seed", 1024));
        assert_eq!(generate_secret(None, 2048).len(), 2048);
    }

    #[test]
    fn test_generate_batch_id() {
        assert_eq!(generate_batch_id(Some("abc"), Some(3)), hash("abc3", 32));
        assert_eq!(generate_batch_id(None, None).len(), 64);
    }

    #[test]
    fn test_from_record_rederives() {
        let wallet = Wallet::new(&secret(), "TOKEN", None).unwrap();
        let record = WalletRecord {
            address: wallet.address.clone(),
            bundle_hash: wallet.bundle.clone(),
            token_slug: "TOKEN".into(),
            position: wallet.position.clone(),
            characters: Some("BITCOIN".into()),
            amount: Some("42.5".into()),
            ..Default::default()
        };
        let restored = Wallet::from_record(record, Some(&secret())).unwrap();
        assert_eq!(restored.key(), wallet.key());
        assert_eq!(restored.balance, 42.5);
        assert_eq!(restored.characters.to_string(), "BITCOIN");
    }

    #[test]
    fn test_from_record_wrong_secret() {
        let wallet = Wallet::new(&secret(), "TOKEN", None).unwrap();
        let record = WalletRecord {
            address: wallet.address.clone(),
            token_slug: "TOKEN".into(),
            position: wallet.position.clone(),
            ..Default::default()
        };
        assert!(Wallet::from_record(record, Some(&"b2".repeat(1024))).is_err());
    }

    #[test]
    fn test_from_record_without_secret() {
        let record = WalletRecord {
            address: Some("addr".into()),
            bundle_hash: Some("bundle".into()),
            token_slug: "TOKEN".into(),
            ..Default::default()
        };
        let wallet = Wallet::from_record(record, None).unwrap();
        assert!(wallet.key().is_none());
        assert_eq!(wallet.bundle.as_deref(), Some("bundle"));
    }
}
