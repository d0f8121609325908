//! Transport abstraction for talking to a ledger node.
//!
//! A transport delivers finalized molecules and answers wallet queries.
//! Implementations may use HTTP, GraphQL, WebSockets or anything else; the
//! client only sees [`SubmitResult`] and [`WalletRecord`].

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use knishio_core::{Molecule, WalletRecord};

use crate::error::{ClientError, Result};

/// Outcome reported by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitStatus {
    Accepted,
    Rejected,
}

impl SubmitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitStatus::Accepted => "accepted",
            SubmitStatus::Rejected => "rejected",
        }
    }
}

/// A node's answer to a submitted molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitResult {
    pub status: SubmitStatus,
    pub reason: Option<String>,
    /// Operation-specific response body, usually JSON.
    pub payload: Option<Bytes>,
}

impl SubmitResult {
    pub fn accepted(payload: Option<Bytes>) -> Self {
        Self {
            status: SubmitStatus::Accepted,
            reason: None,
            payload,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            status: SubmitStatus::Rejected,
            reason: Some(reason.into()),
            payload: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == SubmitStatus::Accepted
    }

    /// Decode the payload as JSON.
    pub fn payload_json<T: DeserializeOwned>(&self) -> Result<T> {
        let payload = self
            .payload
            .as_ref()
            .ok_or_else(|| ClientError::Serialization("response has no payload".into()))?;
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Payload a node returns for an accepted authorization molecule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthGrant {
    pub token: String,
    pub expires_at: u64,
    pub pubkey: Option<String>,
    pub encrypt: bool,
}

/// Transport trait for submitting molecules and reading wallets.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// The node this transport talks to.
    fn node_uri(&self) -> &str;

    /// Submit a signed molecule. Authorization molecules go without a token.
    async fn submit(&self, molecule: &Molecule, auth_token: Option<&str>) -> Result<SubmitResult>;

    /// The current wallet for `token` on `bundle`, if the node knows one.
    async fn query_wallet(&self, bundle: &str, token: &str) -> Result<Option<WalletRecord>>;
}

/// Clients can share one transport.
#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn node_uri(&self) -> &str {
        (**self).node_uri()
    }

    async fn submit(&self, molecule: &Molecule, auth_token: Option<&str>) -> Result<SubmitResult> {
        (**self).submit(molecule, auth_token).await
    }

    async fn query_wallet(&self, bundle: &str, token: &str) -> Result<Option<WalletRecord>> {
        (**self).query_wallet(bundle, token).await
    }
}

/// An in-process node for testing.
///
/// Validates every molecule with the same checks the client runs, refuses
/// spent positions and stale source wallets, and applies accepted molecules
/// to an in-memory wallet table.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};

    use tokio::sync::RwLock;
    use tracing::{debug, info};

    use knishio_core::atom::format_amount;
    use knishio_core::builders::META_WALLET_BUNDLE;
    use knishio_core::encoding::{random_string, ALPHANUMERIC};
    use knishio_core::{validation, Atom, Characters, Isotope, Wallet, USER_TOKEN};
    use knishio_crypto::{EncryptedMessage, MessageCipher, SealedBox, X25519SecretKey};

    use crate::session::now_secs;

    type WalletKey = (String, String);

    #[derive(Default)]
    struct Ledger {
        wallets: HashMap<WalletKey, WalletRecord>,
        spent: HashSet<String>,
        tokens: HashMap<String, u64>,
        molecules: Vec<Molecule>,
    }

    /// In-memory node.
    pub struct MemoryTransport {
        node_uri: String,
        token_ttl_secs: u64,
        keys: SealedBox,
        ledger: RwLock<Ledger>,
    }

    impl MemoryTransport {
        pub fn new(node_uri: impl Into<String>) -> Self {
            Self {
                node_uri: node_uri.into(),
                token_ttl_secs: 3600,
                keys: SealedBox::new(X25519SecretKey::generate()),
                ledger: RwLock::new(Ledger::default()),
            }
        }

        pub fn with_token_ttl(mut self, secs: u64) -> Self {
            self.token_ttl_secs = secs;
            self
        }

        /// Seed a wallet record, keyed by its bundle and token.
        pub async fn insert_wallet(&self, record: WalletRecord) {
            let key = (
                record.bundle_hash.clone().unwrap_or_default(),
                record.token_slug.clone(),
            );
            self.ledger.write().await.wallets.insert(key, record);
        }

        /// Accepted molecules, in order.
        pub async fn molecules(&self) -> Vec<Molecule> {
            self.ledger.read().await.molecules.clone()
        }

        pub async fn balance(&self, bundle: &str, token: &str) -> Option<f64> {
            self.ledger
                .read()
                .await
                .wallets
                .get(&(bundle.to_string(), token.to_string()))
                .map(amount_of)
        }

        /// The node's X25519 public key, base64.
        pub fn pubkey(&self) -> String {
            self.keys.x25519_public().encode(Characters::Base64)
        }

        /// Open a message sealed for this node.
        pub fn open_message(&self, message: &EncryptedMessage) -> Result<Vec<u8>> {
            Ok(self.keys.decrypt(message)?)
        }

        fn grant(&self, atom: &Atom) -> AuthGrant {
            AuthGrant {
                token: random_string(64, ALPHANUMERIC),
                expires_at: now_secs() + self.token_ttl_secs,
                pubkey: Some(self.pubkey()),
                encrypt: atom.meta("encrypt") == Some("true"),
            }
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        fn node_uri(&self) -> &str {
            &self.node_uri
        }

        async fn submit(
            &self,
            molecule: &Molecule,
            auth_token: Option<&str>,
        ) -> Result<SubmitResult> {
            let mut ledger = self.ledger.write().await;

            let Some(first) = molecule.atoms.first() else {
                return Ok(SubmitResult::rejected("molecule has no atoms"));
            };
            let is_auth = first.isotope == Isotope::U;
            if !is_auth {
                let now = now_secs();
                let authorized = auth_token
                    .and_then(|t| ledger.tokens.get(t))
                    .is_some_and(|expires_at| *expires_at > now);
                if !authorized {
                    return Ok(SubmitResult::rejected("unauthorized"));
                }
            }

            if let Some(position) = first.position.as_deref() {
                if ledger.spent.contains(position) {
                    return Ok(SubmitResult::rejected("position already spent"));
                }
            }

            let bundle = molecule.bundle.clone().unwrap_or_default();
            let current = ledger
                .wallets
                .get(&(bundle.clone(), first.token_str().to_string()))
                .cloned();
            if let Some(address) = current.as_ref().and_then(|r| r.address.as_deref()) {
                if first.wallet_address.as_deref() != Some(address) {
                    return Ok(SubmitResult::rejected("source wallet is not current"));
                }
            }

            let sender = if first.isotope == Isotope::V {
                let Some(record) = current else {
                    return Ok(SubmitResult::rejected("unknown source wallet"));
                };
                match Wallet::from_record(record, None) {
                    Ok(wallet) => Some(wallet),
                    Err(e) => return Ok(SubmitResult::rejected(e.to_string())),
                }
            } else {
                None
            };

            if let Err(e) = validation::verify(molecule, sender.as_ref()) {
                debug!(error = %e, "memory node rejected molecule");
                return Ok(SubmitResult::rejected(e.to_string()));
            }

            apply(&mut ledger, molecule, &bundle);
            if let Some(position) = first.position.clone() {
                ledger.spent.insert(position);
            }
            ledger.molecules.push(molecule.clone());
            info!(
                hash = molecule.molecular_hash.as_deref().unwrap_or_default(),
                atoms = molecule.atoms.len(),
                "memory node accepted molecule"
            );

            if !is_auth {
                return Ok(SubmitResult::accepted(None));
            }
            let grant = self.grant(first);
            ledger.tokens.insert(grant.token.clone(), grant.expires_at);
            Ok(SubmitResult::accepted(Some(Bytes::from(
                serde_json::to_vec(&grant)?,
            ))))
        }

        async fn query_wallet(&self, bundle: &str, token: &str) -> Result<Option<WalletRecord>> {
            Ok(self
                .ledger
                .read()
                .await
                .wallets
                .get(&(bundle.to_string(), token.to_string()))
                .cloned())
        }
    }

    fn amount_of(record: &WalletRecord) -> f64 {
        record
            .amount
            .as_deref()
            .and_then(|a| a.parse().ok())
            .unwrap_or(0.0)
    }

    fn add_amount(record: &mut WalletRecord, value: f64) {
        record.amount = Some(format_amount(amount_of(record) + value));
    }

    fn shadow_record(bundle: &str, token: &str) -> WalletRecord {
        WalletRecord {
            bundle_hash: Some(bundle.to_string()),
            token_slug: token.to_string(),
            amount: Some("0".into()),
            ..WalletRecord::default()
        }
    }

    fn value_of(atom: &Atom) -> f64 {
        atom.value_f64().and_then(|v| v.ok()).unwrap_or(0.0)
    }

    fn apply(ledger: &mut Ledger, molecule: &Molecule, bundle: &str) {
        let last_v = molecule
            .atoms
            .iter()
            .filter(|a| a.isotope == Isotope::V)
            .map(|a| a.index)
            .last();
        let mut debited = false;

        for atom in &molecule.atoms {
            match atom.isotope {
                Isotope::V if !debited => debited = true,
                Isotope::V => {
                    let owner = atom.meta_id.clone().unwrap_or_else(|| bundle.to_string());
                    let key = (owner.clone(), atom.token_str().to_string());
                    let record = ledger
                        .wallets
                        .entry(key)
                        .or_insert_with(|| shadow_record(&owner, atom.token_str()));
                    if owner == bundle && Some(atom.index) == last_v {
                        record.amount = Some(format_amount(value_of(atom)));
                    } else {
                        add_amount(record, value_of(atom));
                    }
                    if atom.wallet_address.is_some() {
                        record.address = atom.wallet_address.clone();
                        record.position = atom.position.clone();
                        record.batch_id = atom.batch_id.clone();
                    }
                }
                Isotope::C if atom.meta_type.as_deref() == Some("token") => {
                    let token = atom.meta_id.clone().unwrap_or_default();
                    let record = ledger
                        .wallets
                        .entry((bundle.to_string(), token.clone()))
                        .or_insert_with(|| shadow_record(bundle, &token));
                    add_amount(record, value_of(atom));
                    if let Some(address) = atom.meta("walletAddress").or(atom.meta("address")) {
                        record.address = Some(address.to_string());
                    }
                    if let Some(position) = atom.meta("walletPosition").or(atom.meta("position")) {
                        record.position = Some(position.to_string());
                    }
                    if let Some(characters) = atom.meta("walletCharacters") {
                        record.characters = Some(characters.to_string());
                    }
                }
                Isotope::C if atom.meta_type.as_deref() == Some("wallet") => {
                    let token = atom.meta("token").unwrap_or_default().to_string();
                    let owner = atom.meta("bundle").unwrap_or(bundle).to_string();
                    let record = ledger
                        .wallets
                        .entry((owner.clone(), token.clone()))
                        .or_insert_with(|| shadow_record(&owner, &token));
                    if record.position.is_none() {
                        record.address = atom.meta("address").map(str::to_string);
                        record.position = atom.meta("position").map(str::to_string);
                        record.batch_id = atom.meta("batchId").map(str::to_string);
                    }
                }
                Isotope::I => {
                    let record = ledger
                        .wallets
                        .entry((bundle.to_string(), USER_TOKEN.to_string()))
                        .or_insert_with(|| shadow_record(bundle, USER_TOKEN));
                    record.address = atom.wallet_address.clone();
                    record.position = atom.position.clone();
                }
                Isotope::T if atom.meta_type.as_deref() == Some(META_WALLET_BUNDLE) => {
                    let owner = atom.meta_id.clone().unwrap_or_default();
                    let token = atom.meta("token").unwrap_or_default().to_string();
                    let record = ledger
                        .wallets
                        .entry((owner.clone(), token.clone()))
                        .or_insert_with(|| shadow_record(&owner, &token));
                    add_amount(record, value_of(atom));
                }
                _ => {}
            }
        }
    }
}
