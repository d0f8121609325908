//! Test fixtures and helpers.
//!
//! Common setup code for unit and integration tests.

use knishio_core::wallet::{generate_bundle_hash, generate_secret};
use knishio_core::{
    Atom, Isotope, MetaItem, Molecule, SignOptions, Wallet, WalletRecord, USER_TOKEN,
};

/// Timestamp stamped on fixture atoms so hashes are reproducible.
pub const FIXED_CREATED_AT: &str = "1736870400000";

/// Secret length in hex characters.
pub const SECRET_LEN: usize = 2048;

/// A 2048-character secret made of one repeated hex pair.
pub fn test_secret(pair: &str) -> String {
    pair.repeat(SECRET_LEN / pair.len().max(1))
}

/// The all-zero position.
pub fn zero_position() -> String {
    "0".repeat(64)
}

/// A test fixture owning one secret.
pub struct TestFixture {
    pub secret: String,
    pub bundle: String,
}

impl TestFixture {
    /// Create a fixture with a random secret.
    pub fn new() -> Self {
        Self::from_secret(generate_secret(None, SECRET_LEN))
    }

    /// Create with a secret derived from `seed`.
    pub fn with_seed(seed: &str) -> Self {
        Self::from_secret(generate_secret(Some(seed), SECRET_LEN))
    }

    pub fn from_secret(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self {
            bundle: generate_bundle_hash(&secret),
            secret,
        }
    }

    /// A wallet at a fresh position.
    pub fn wallet(&self, token: &str) -> Wallet {
        Wallet::new(&self.secret, token, None).expect("fixture secret is valid hex")
    }

    /// A wallet at a fixed position.
    pub fn wallet_at(&self, token: &str, position: &str) -> Wallet {
        Wallet::new(&self.secret, token, Some(position)).expect("fixture secret is valid hex")
    }

    /// The ledger record a node would hold for `wallet`.
    pub fn record(&self, wallet: &Wallet) -> WalletRecord {
        WalletRecord {
            address: wallet.address.clone(),
            bundle_hash: wallet.bundle.clone(),
            token_slug: wallet.token.clone(),
            position: wallet.position.clone(),
            batch_id: wallet.batch_id.clone(),
            characters: Some(wallet.characters.to_string()),
            pubkey: wallet.pubkey.clone(),
            amount: Some(knishio_core::atom::format_amount(wallet.balance)),
            token_units: wallet.token_units.clone(),
        }
    }

    /// An empty molecule whose source is `source`.
    pub fn molecule(&self, source: Wallet) -> Molecule {
        Molecule::new(&self.secret, source, None, None).expect("fixture secret is valid hex")
    }

    /// A signed metadata molecule from a fresh identity wallet.
    pub fn signed_meta(&self, meta: Vec<MetaItem>) -> Molecule {
        let mut molecule = self.molecule(self.wallet(USER_TOKEN));
        molecule
            .init_meta(meta, "fixture", "1")
            .expect("meta molecule builds");
        molecule.sign(SignOptions::default()).expect("meta molecule signs");
        molecule
    }

    /// A signed transfer of `amount` from a `token` wallet holding `balance`.
    ///
    /// Returns the molecule and the sender wallet to check it against.
    pub fn signed_transfer(&self, token: &str, balance: f64, amount: f64) -> (Molecule, Wallet) {
        let source = self.wallet(token).with_balance(balance);
        let recipient = TestFixture::new().wallet(token);

        let mut molecule = self.molecule(source.clone());
        molecule
            .init_value(&recipient, amount)
            .expect("transfer molecule builds");
        molecule.sign(SignOptions::default()).expect("transfer molecule signs");
        (molecule, source)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple fixtures with distinct deterministic secrets.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| TestFixture::with_seed(&format!("party-{i}")))
        .collect()
}

/// A `V` atom with a fixed timestamp.
pub fn value_atom(
    position: &str,
    address: &str,
    token: &str,
    value: &str,
    index: usize,
) -> Atom {
    Atom::builder(Isotope::V)
        .position(position)
        .wallet_address(address)
        .token(token)
        .value_str(value)
        .index(index)
        .created_at(FIXED_CREATED_AT)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use knishio_core::validation;

    #[test]
    fn test_seeded_fixtures_are_stable() {
        let a = TestFixture::with_seed("alice");
        let b = TestFixture::with_seed("alice");
        assert_eq!(a.secret, b.secret);
        assert_eq!(a.bundle, b.bundle);
        assert_eq!(a.secret.len(), SECRET_LEN);
    }

    #[test]
    fn test_multi_party_distinct() {
        let parties = multi_party_fixtures(3);
        assert_ne!(parties[0].bundle, parties[1].bundle);
        assert_ne!(parties[1].bundle, parties[2].bundle);
    }

    #[test]
    fn test_signed_transfer_checks() {
        let fixture = TestFixture::with_seed("sender");
        let (molecule, sender) = fixture.signed_transfer("CRZY", 1000.0, 250.0);
        assert_eq!(molecule.atoms.len(), 3);
        assert!(validation::verify(&molecule, Some(&sender)).is_ok());
    }

    #[test]
    fn test_record_round_trips_into_wallet() {
        let fixture = TestFixture::with_seed("records");
        let wallet = fixture.wallet("CRZY").with_balance(42.0);
        let restored =
            Wallet::from_record(fixture.record(&wallet), Some(&fixture.secret)).unwrap();
        assert_eq!(restored.address, wallet.address);
        assert_eq!(restored.balance, 42.0);
    }

    #[test]
    fn test_test_secret_length() {
        assert_eq!(test_secret("a1").len(), SECRET_LEN);
        assert_eq!(zero_position().len(), 64);
    }
}
