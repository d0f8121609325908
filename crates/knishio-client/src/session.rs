//! Auth tokens and the per-node session cache.
//!
//! The session belongs to the client, not the core: builders receive the
//! token they need as a parameter. Snapshots store only the signing wallet's
//! position and character set; restoring re-derives the keys from the secret.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use knishio_core::{Characters, Wallet, AUTH_TOKEN};

use crate::error::{ClientError, Result};
use crate::transport::AuthGrant;

/// Seconds since the Unix epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A token issued by a node, bound to the wallet that requested it.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
    /// Expiry, seconds since the Unix epoch.
    pub expires_at: u64,
    /// The node's encryption public key, when it offered one.
    pub pubkey: Option<String>,
    pub encrypt: bool,
    wallet: Wallet,
}

impl AuthToken {
    pub fn from_grant(grant: AuthGrant, wallet: Wallet) -> Self {
        Self {
            token: grant.token,
            expires_at: grant.expires_at,
            pubkey: grant.pubkey,
            encrypt: grant.encrypt,
            wallet,
        }
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn is_expired(&self) -> bool {
        now_secs() >= self.expires_at
    }

    pub fn snapshot(&self) -> AuthTokenSnapshot {
        AuthTokenSnapshot {
            token: self.token.clone(),
            expires_at: self.expires_at,
            pubkey: self.pubkey.clone(),
            encrypt: self.encrypt,
            wallet: WalletSnapshot {
                position: self.wallet.position.clone(),
                characters: self.wallet.characters,
            },
        }
    }

    /// Rebuild a token from a snapshot, re-deriving its wallet.
    pub fn restore(snapshot: AuthTokenSnapshot, secret: &str) -> Result<Self> {
        let position = snapshot
            .wallet
            .position
            .as_deref()
            .ok_or_else(|| ClientError::Unauthorized("snapshot has no wallet position".into()))?;
        let wallet = Wallet::new(secret, AUTH_TOKEN, Some(position))?
            .with_characters(snapshot.wallet.characters);
        Ok(Self {
            token: snapshot.token,
            expires_at: snapshot.expires_at,
            pubkey: snapshot.pubkey,
            encrypt: snapshot.encrypt,
            wallet,
        })
    }
}

/// Persistable form of an [`AuthToken`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokenSnapshot {
    pub token: String,
    pub expires_at: u64,
    pub pubkey: Option<String>,
    pub encrypt: bool,
    pub wallet: WalletSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    pub position: Option<String>,
    pub characters: Characters,
}

/// Auth tokens keyed by node URI.
#[derive(Debug, Default)]
pub struct Session {
    tokens: RwLock<HashMap<String, AuthToken>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token for `node_uri`, if it has not expired.
    pub async fn get(&self, node_uri: &str) -> Option<AuthToken> {
        self.tokens
            .read()
            .await
            .get(node_uri)
            .filter(|t| !t.is_expired())
            .cloned()
    }

    pub async fn insert(&self, node_uri: &str, token: AuthToken) {
        self.tokens.write().await.insert(node_uri.to_string(), token);
    }

    pub async fn remove(&self, node_uri: &str) -> Option<AuthToken> {
        self.tokens.write().await.remove(node_uri)
    }
}
