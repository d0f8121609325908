//! The client: high-level ledger operations over a [`Transport`].
//!
//! Every operation follows the same path: resolve the source wallet, build
//! the molecule, lock the signing position, sign, check locally, submit.
//! Once a signed molecule has left the client its position is spent,
//! whatever the node answered.

use std::sync::Arc;

use tracing::{debug, info, warn};

use knishio_core::builders::META_WALLET_BUNDLE;
use knishio_core::wallet::generate_bundle_hash;
use knishio_core::{
    CoreError, MetaItem, Molecule, RuleCondition, TokenSettings, TokenUnit, Wallet, AUTH_TOKEN,
    USER_TOKEN,
};
use knishio_crypto::{EncryptedMessage, WalletKeys};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::guard::{short, PositionLocks};
use crate::session::{now_secs, AuthToken, AuthTokenSnapshot, Session};
use crate::transport::{AuthGrant, SubmitResult, Transport};

/// A client bound to one secret and one node.
pub struct KnishClient<T: Transport> {
    secret: String,
    bundle: String,
    transport: Arc<T>,
    session: Arc<Session>,
    locks: Arc<PositionLocks>,
    config: ClientConfig,
}

impl<T: Transport> KnishClient<T> {
    pub fn new(secret: impl Into<String>, transport: T, config: ClientConfig) -> Self {
        let secret = secret.into();
        Self {
            bundle: generate_bundle_hash(&secret),
            secret,
            transport: Arc::new(transport),
            session: Arc::new(Session::new()),
            locks: PositionLocks::new(),
            config,
        }
    }

    /// Share a session (and its cached tokens) with other clients.
    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = session;
        self
    }

    /// Share position locks with other clients using the same secret.
    pub fn with_locks(mut self, locks: Arc<PositionLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn bundle(&self) -> &str {
        &self.bundle
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn locks(&self) -> &Arc<PositionLocks> {
        &self.locks
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Wallets
    // ─────────────────────────────────────────────────────────────────────────

    /// Another bundle's wallet for `token`, as a reference without keys.
    pub async fn query_wallet(&self, bundle: &str, token: &str) -> Result<Option<Wallet>> {
        let Some(record) = self.transport.query_wallet(bundle, token).await? else {
            return Ok(None);
        };
        let mut wallet = Wallet::from_record(record, None)?;
        wallet.bundle.get_or_insert_with(|| bundle.to_string());
        Ok(Some(wallet))
    }

    /// Our current wallet for `token`, with keys re-derived from the secret.
    ///
    /// A bundle with no identity wallet yet starts one at a fresh position.
    pub async fn source_wallet(&self, token: &str) -> Result<Wallet> {
        match self.transport.query_wallet(&self.bundle, token).await? {
            Some(record) if record.position.is_some() => {
                Ok(Wallet::from_record(record, Some(&self.secret))?)
            }
            Some(_) => Err(ClientError::ShadowWallet(token.to_string())),
            None if token == USER_TOKEN => Ok(Wallet::new(&self.secret, USER_TOKEN, None)?),
            None => Err(ClientError::WalletNotFound {
                bundle: self.bundle.clone(),
                token: token.to_string(),
            }),
        }
    }

    pub async fn balance(&self, token: &str) -> Result<f64> {
        Ok(self
            .query_wallet(&self.bundle, token)
            .await?
            .map_or(0.0, |w| w.balance))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization
    // ─────────────────────────────────────────────────────────────────────────

    /// Request a fresh auth token and cache it for this node.
    ///
    /// With `encrypt`, the signing wallet publishes its encryption key.
    pub async fn request_auth_token(&self, encrypt: bool) -> Result<AuthToken> {
        let mut wallet = Wallet::new(&self.secret, AUTH_TOKEN, None)?;
        if encrypt {
            WalletKeys::from_wallet(&wallet)?.attach(&mut wallet);
        }

        let mut molecule = self.molecule(wallet.clone())?;
        molecule.init_authorization(vec![MetaItem::new("encrypt", encrypt.to_string())])?;
        let result = self.submit(molecule, None, None).await?;

        let grant: AuthGrant = result.payload_json()?;
        let mut token = AuthToken::from_grant(grant, wallet);
        token.expires_at = token
            .expires_at
            .min(now_secs() + self.config.auth_token_ttl_secs);
        self.session.insert(&self.config.node_uri, token.clone()).await;
        info!(node = %self.config.node_uri, encrypt, "auth token issued");
        Ok(token)
    }

    /// The cached token for this node, requesting one when absent or expired.
    pub async fn auth_token(&self) -> Result<AuthToken> {
        match self.session.get(&self.config.node_uri).await {
            Some(token) => Ok(token),
            None => {
                debug!(node = %self.config.node_uri, "no cached auth token");
                self.request_auth_token(false).await
            }
        }
    }

    /// Restore a persisted token into the session.
    pub async fn restore_auth_token(&self, snapshot: AuthTokenSnapshot) -> Result<AuthToken> {
        let token = AuthToken::restore(snapshot, &self.secret)?;
        if token.is_expired() {
            return Err(ClientError::Unauthorized("restored token has expired".into()));
        }
        self.session.insert(&self.config.node_uri, token.clone()).await;
        Ok(token)
    }

    /// Seal a message for the node with its advertised public key.
    pub async fn encrypt_for_node(&self, plaintext: &[u8]) -> Result<EncryptedMessage> {
        let token = self.auth_token().await?;
        let node_key = token
            .pubkey
            .as_deref()
            .ok_or_else(|| ClientError::Unauthorized("node offered no encryption key".into()))?;
        let keys = WalletKeys::from_wallet(token.wallet())?;
        Ok(keys.encrypt_for(plaintext, node_key, token.wallet().characters)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tokens
    // ─────────────────────────────────────────────────────────────────────────

    /// Create `token` with an initial supply held by a new wallet of ours.
    pub async fn create_token(
        &self,
        token: &str,
        amount: f64,
        settings: &TokenSettings,
    ) -> Result<SubmitResult> {
        let source = self.source_wallet(USER_TOKEN).await?;
        let recipient = Wallet::new(&self.secret, token, None)?;

        let mut molecule = self.molecule(source)?;
        molecule.init_token_creation(&recipient, amount, settings)?;
        self.execute(molecule, None).await
    }

    /// Send `amount` of `token` to another bundle.
    ///
    /// A recipient without a wallet for the token receives a shadow wallet.
    pub async fn transfer_token(
        &self,
        recipient_bundle: &str,
        token: &str,
        amount: f64,
    ) -> Result<SubmitResult> {
        let source = self.source_wallet(token).await?;
        let mut recipient = self
            .query_wallet(recipient_bundle, token)
            .await?
            .unwrap_or_else(|| Wallet::shadow(recipient_bundle, token));
        recipient.init_batch_id(&source, false);

        let mut molecule = self.molecule(source.clone())?;
        molecule.init_value(&recipient, amount)?;
        self.execute(molecule, Some(&source)).await
    }

    /// Destroy `amount` of our `token`.
    pub async fn burn_tokens(&self, token: &str, amount: f64) -> Result<SubmitResult> {
        let source = self.source_wallet(token).await?;
        let mut molecule = self.molecule(source.clone())?;
        molecule.burn_token(amount)?;
        self.execute(molecule, Some(&source)).await
    }

    /// Mint more `token` into our existing wallet for it.
    pub async fn replenish_tokens(
        &self,
        token: &str,
        amount: f64,
        units: &[TokenUnit],
    ) -> Result<SubmitResult> {
        let recipient = self.source_wallet(token).await?;
        let source = self.source_wallet(USER_TOKEN).await?;

        let mut molecule = self.molecule(source)?;
        molecule.replenish_token(token, amount, units, &recipient)?;
        self.execute(molecule, None).await
    }

    /// Ask the ledger for `amount` of `token`.
    ///
    /// The target defaults to our own bundle.
    pub async fn request_tokens(
        &self,
        token: &str,
        amount: f64,
        target: Option<(&str, &str)>,
        meta: Vec<MetaItem>,
    ) -> Result<SubmitResult> {
        let (meta_type, meta_id) = target.unwrap_or((META_WALLET_BUNDLE, self.bundle.as_str()));
        let source = self.source_wallet(USER_TOKEN).await?;

        let mut molecule = self.molecule(source)?;
        molecule.init_token_request(token, amount, meta_type, meta_id, meta)?;
        self.execute(molecule, None).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Wallet Declarations
    // ─────────────────────────────────────────────────────────────────────────

    /// Declare a new wallet for `token` and return it.
    pub async fn create_wallet(&self, token: &str) -> Result<Wallet> {
        let wallet = Wallet::new(&self.secret, token, None)?;
        let source = self.source_wallet(USER_TOKEN).await?;

        let mut molecule = self.molecule(source)?;
        molecule.init_wallet_creation(&wallet)?;
        self.execute(molecule, None).await?;
        Ok(wallet)
    }

    /// Replace our shadow wallet for `token` with a derived one.
    pub async fn claim_shadow_wallet(&self, token: &str) -> Result<Wallet> {
        let shadow = self
            .query_wallet(&self.bundle, token)
            .await?
            .filter(Wallet::is_shadow)
            .ok_or_else(|| ClientError::WalletNotFound {
                bundle: self.bundle.clone(),
                token: token.to_string(),
            })?;

        let wallet = Wallet::new(&self.secret, token, None)?.with_balance(shadow.balance);
        let source = self.source_wallet(USER_TOKEN).await?;

        let mut molecule = self.molecule(source)?;
        molecule.init_shadow_wallet_claim(&wallet)?;
        self.execute(molecule, None).await?;
        Ok(wallet)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metadata, Identifiers, Rules
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_meta(
        &self,
        meta_type: &str,
        meta_id: &str,
        meta: Vec<MetaItem>,
    ) -> Result<SubmitResult> {
        let source = self.source_wallet(USER_TOKEN).await?;
        let mut molecule = self.molecule(source)?;
        molecule.init_meta(meta, meta_type, meta_id)?;
        self.execute(molecule, None).await
    }

    /// Register a contact (email, phone) against our bundle.
    pub async fn create_identifier(
        &self,
        identifier_type: &str,
        contact: &str,
        code: &str,
    ) -> Result<SubmitResult> {
        let source = self.source_wallet(USER_TOKEN).await?;
        let mut molecule = self.molecule(source)?;
        molecule.init_identifier_creation(identifier_type, contact, code)?;
        self.execute(molecule, None).await
    }

    pub async fn create_rule(
        &self,
        meta_type: &str,
        meta_id: &str,
        rule: &str,
        conditions: &[RuleCondition],
        callback: &str,
    ) -> Result<SubmitResult> {
        let source = self.source_wallet(USER_TOKEN).await?;
        let mut molecule = self.molecule(source)?;
        molecule.init_rule(meta_type, meta_id, rule, conditions, callback)?;
        self.execute(molecule, None).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Execution
    // ─────────────────────────────────────────────────────────────────────────

    fn molecule(&self, source: Wallet) -> Result<Molecule> {
        Ok(Molecule::new(
            &self.secret,
            source,
            None,
            self.config.cell_slug.clone(),
        )?)
    }

    /// Sign and submit with this node's auth token.
    pub async fn execute(&self, molecule: Molecule, sender: Option<&Wallet>) -> Result<SubmitResult> {
        let token = self.auth_token().await?;
        self.submit(molecule, sender, Some(&token.token)).await
    }

    async fn submit(
        &self,
        mut molecule: Molecule,
        sender: Option<&Wallet>,
        auth_token: Option<&str>,
    ) -> Result<SubmitResult> {
        let position = molecule
            .source_wallet()
            .and_then(|w| w.position.clone())
            .ok_or(CoreError::MissingPosition)?;
        let guard = self.locks.acquire(&position)?;

        molecule.sign(self.config.sign_options())?;
        if self.config.validate_before_submit {
            if let Err(e) = molecule.check(sender) {
                warn!(error = %e, kind = ?e.kind(), "molecule failed local checks");
                return Err(e.into());
            }
        }

        let hash = molecule.hash(self.config.hash_encoding)?;
        info!(
            hash = %hash,
            atoms = molecule.atoms.len(),
            position = short(&position),
            "submitting molecule"
        );

        let submitted = self.transport.submit(&molecule, auth_token).await;
        guard.spend();
        let result = submitted?;

        if !result.is_accepted() {
            let reason = result.reason.clone().unwrap_or_default();
            warn!(hash = %hash, reason = %reason, "molecule rejected");
            return Err(ClientError::Rejected {
                status: result.status.as_str().to_string(),
                reason,
            });
        }
        debug!(hash = %hash, "molecule accepted");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryTransport;

    fn client() -> KnishClient<MemoryTransport> {
        let config = ClientConfig::default();
        let node = MemoryTransport::new(config.node_uri.clone());
        KnishClient::new("a1".repeat(1024), node, config)
    }

    #[tokio::test]
    async fn test_auth_token_cached() {
        let client = client();
        let first = client.auth_token().await.unwrap();
        let second = client.auth_token().await.unwrap();
        assert_eq!(first.token, second.token);
        assert_eq!(client.transport().molecules().await.len(), 1);
    }

    #[tokio::test]
    async fn test_ttl_caps_expiry() {
        let mut config = ClientConfig::default();
        config.auth_token_ttl_secs = 5;
        let node = MemoryTransport::new(config.node_uri.clone()).with_token_ttl(3600);
        let client = KnishClient::new("a1".repeat(1024), node, config);

        let token = client.request_auth_token(false).await.unwrap();
        assert!(token.expires_at <= now_secs() + 5);
    }

    #[tokio::test]
    async fn test_source_wallet_for_missing_token() {
        let client = client();
        assert!(matches!(
            client.source_wallet("NOPE").await,
            Err(ClientError::WalletNotFound { .. })
        ));
        let user = client.source_wallet(USER_TOKEN).await.unwrap();
        assert_eq!(user.bundle.as_deref(), Some(client.bundle()));
    }

    #[tokio::test]
    async fn test_locked_position_refused() {
        let client = client();
        let source = client.source_wallet(USER_TOKEN).await.unwrap();
        let _held = client
            .locks()
            .acquire(source.position.as_deref().unwrap())
            .unwrap();

        let mut molecule = client.molecule(source).unwrap();
        molecule
            .init_meta(vec![MetaItem::new("k", "v")], "thing", "1")
            .unwrap();
        assert!(matches!(
            client.execute(molecule, None).await,
            Err(ClientError::PositionInUse(_))
        ));
    }
}
