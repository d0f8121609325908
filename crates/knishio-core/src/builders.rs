//! Molecule builders: assemble the atoms of each ledger operation.
//!
//! Each builder appends atoms at [`Molecule::generate_index`] and returns
//! the molecule for chaining. Signing and checking are left to the caller.

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::error::{CoreError, Result};
use crate::molecule::Molecule;
use crate::types::{meta_value, Isotope, MetaItem, TokenUnit, USER_TOKEN};
use crate::wallet::{generate_batch_id, generate_bundle_hash, Wallet};

/// Meta type linking an atom to a wallet bundle.
pub const META_WALLET_BUNDLE: &str = "walletBundle";

/// Token creation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSettings {
    pub fungibility: String,
    pub supply: String,
    pub decimals: u32,
    /// Stackable units. When non-empty the amount is the unit count.
    #[serde(default)]
    pub units: Vec<TokenUnit>,
    /// Extra meta (name, icon, ...), appended after the fixed keys.
    #[serde(default)]
    pub meta: Vec<MetaItem>,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            fungibility: "fungible".into(),
            supply: "limited".into(),
            decimals: 0,
            units: Vec::new(),
            meta: Vec::new(),
        }
    }
}

/// One condition of a rule atom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub key: String,
    pub value: String,
    pub comparison: String,
    pub managed_by: String,
}

/// Append the signer's public key and character set.
fn final_metas(mut meta: Vec<MetaItem>, wallet: &Wallet) -> Vec<MetaItem> {
    if let Some(pubkey) = &wallet.pubkey {
        meta.push(MetaItem::new("pubkey", pubkey.clone()));
    }
    meta.push(MetaItem::new("characters", wallet.characters.to_string()));
    meta
}

fn units_json(units: &[TokenUnit]) -> Result<String> {
    let data: Vec<Vec<String>> = units.iter().map(TokenUnit::to_data).collect();
    serde_json::to_string(&data).map_err(|e| CoreError::Serialization(e.to_string()))
}

fn optional(key: &str, value: Option<&str>) -> MetaItem {
    match value {
        Some(v) => MetaItem::new(key, v),
        None => MetaItem::null(key),
    }
}

impl Molecule {
    /// Transfer `amount` from the source wallet to `recipient`; the
    /// remainder wallet receives what is left.
    pub fn init_value(&mut self, recipient: &Wallet, amount: f64) -> Result<&mut Self> {
        if amount < 0.0 {
            return Err(CoreError::NegativeAmount(amount));
        }
        let source = self.require_source()?.clone();
        let remainder = self.require_remainder()?.clone();
        if source.balance - amount < 0.0 {
            return Err(CoreError::BalanceInsufficient {
                balance: source.balance,
                amount,
            });
        }

        let debit = Atom::from_wallet(Isotope::V, &source)
            .value(-amount)
            .meta(final_metas(Vec::new(), &source))
            .index(self.generate_index())
            .build();
        self.add_atom(debit);

        let credit = Atom::from_wallet(Isotope::V, recipient)
            .value(amount)
            .meta_type(META_WALLET_BUNDLE)
            .meta_id(recipient.bundle.clone().unwrap_or_default())
            .meta(final_metas(Vec::new(), &source))
            .index(self.generate_index())
            .build();
        self.add_atom(credit);

        self.add_remainder_atom(&source, &remainder, source.balance - amount);
        Ok(self)
    }

    /// Destroy `amount` of the source wallet's tokens.
    pub fn burn_token(&mut self, amount: f64) -> Result<&mut Self> {
        if amount < 0.0 {
            return Err(CoreError::NegativeAmount(amount));
        }
        let source = self.require_source()?.clone();
        let remainder = self.require_remainder()?.clone();
        if source.balance - amount < 0.0 {
            return Err(CoreError::BalanceInsufficient {
                balance: source.balance,
                amount,
            });
        }

        let debit = Atom::from_wallet(Isotope::V, &source)
            .value(-amount)
            .meta(final_metas(Vec::new(), &source))
            .index(self.generate_index())
            .build();
        self.add_atom(debit);

        self.add_remainder_atom(&source, &remainder, source.balance - amount);
        Ok(self)
    }

    fn add_remainder_atom(&mut self, source: &Wallet, remainder: &Wallet, value: f64) {
        let atom = Atom::from_wallet(Isotope::V, remainder)
            .value(value)
            .meta_type(META_WALLET_BUNDLE)
            .meta_id(remainder.bundle.clone().unwrap_or_default())
            .meta(final_metas(Vec::new(), source))
            .index(self.generate_index())
            .build();
        self.add_atom(atom);
    }

    /// Create a token whose initial supply lands in `recipient`.
    ///
    /// Stackable tokens take their amount from the unit list and may not
    /// declare decimals.
    pub fn init_token_creation(
        &mut self,
        recipient: &Wallet,
        amount: f64,
        settings: &TokenSettings,
    ) -> Result<&mut Self> {
        let source = self.require_source()?.clone();

        let mut amount = amount;
        let mut decimals = settings.decimals;
        let mut batch_id = recipient.batch_id.clone();
        let mut unit_meta = Vec::new();
        if !settings.units.is_empty() {
            if settings.decimals > 0 {
                return Err(CoreError::StackableUnitDecimals);
            }
            if amount > 0.0 {
                return Err(CoreError::StackableUnitAmount);
            }
            amount = settings.units.len() as f64;
            decimals = 0;
            batch_id = Some(generate_batch_id(None, None));
            unit_meta.push(MetaItem::new("splittable", "1"));
            unit_meta.push(MetaItem::new("tokenUnits", units_json(&settings.units)?));
        }
        if amount < 0.0 {
            return Err(CoreError::NegativeAmount(amount));
        }

        let mut meta = vec![
            optional("walletAddress", recipient.address.as_deref()),
            optional("walletPosition", recipient.position.as_deref()),
            MetaItem::new("walletCharacters", recipient.characters.to_string()),
        ];
        if let Some(pubkey) = &recipient.pubkey {
            meta.push(MetaItem::new("walletPubkey", pubkey.clone()));
        }
        meta.push(MetaItem::new("fungibility", settings.fungibility.clone()));
        meta.push(MetaItem::new("supply", settings.supply.clone()));
        meta.push(MetaItem::new("decimals", decimals.to_string()));
        meta.extend(unit_meta);
        meta.extend(settings.meta.iter().cloned());

        let atom = Atom::from_wallet(Isotope::C, &source)
            .value(amount)
            .batch_id(batch_id)
            .meta_type("token")
            .meta_id(recipient.token.clone())
            .meta(final_metas(meta, &source))
            .index(self.generate_index())
            .build();
        self.add_atom(atom);
        self.add_continuid_atom()
    }

    /// Mint more of an existing token into `recipient`.
    pub fn replenish_token(
        &mut self,
        token: &str,
        amount: f64,
        units: &[TokenUnit],
        recipient: &Wallet,
    ) -> Result<&mut Self> {
        if amount < 0.0 {
            return Err(CoreError::NegativeAmount(amount));
        }
        let source = self.require_source()?.clone();

        let mut meta = vec![
            MetaItem::new("action", "add"),
            optional("address", recipient.address.as_deref()),
            optional("position", recipient.position.as_deref()),
            optional("batchId", recipient.batch_id.as_deref()),
        ];
        for key in ["address", "position"] {
            if meta_value(&meta, key).is_none() {
                return Err(CoreError::MetaMissing(key.into()));
            }
        }

        let mut amount = amount;
        if !units.is_empty() {
            if amount > 0.0 {
                return Err(CoreError::StackableUnitAmount);
            }
            amount = units.len() as f64;
            meta.push(MetaItem::new("tokenUnits", units_json(units)?));
        }

        let atom = Atom::from_wallet(Isotope::C, &source)
            .value(amount)
            .meta_type("token")
            .meta_id(token)
            .meta(final_metas(meta, &source))
            .index(self.generate_index())
            .build();
        self.add_atom(atom);
        self.add_continuid_atom()
    }

    /// Attach metadata to an external record.
    pub fn init_meta(
        &mut self,
        meta: Vec<MetaItem>,
        meta_type: &str,
        meta_id: &str,
    ) -> Result<&mut Self> {
        let source = self.require_source()?.clone();
        let atom = Atom::from_wallet(Isotope::M, &source)
            .token(USER_TOKEN)
            .meta_type(meta_type)
            .meta_id(meta_id)
            .meta(final_metas(meta, &source))
            .index(self.generate_index())
            .build();
        self.add_atom(atom);
        self.add_continuid_atom()
    }

    /// Declare a new wallet on the ledger.
    pub fn init_wallet_creation(&mut self, wallet: &Wallet) -> Result<&mut Self> {
        self.wallet_creation_atom(wallet, Vec::new())?;
        self.add_continuid_atom()
    }

    /// Claim a shadow wallet by declaring a derived wallet for its token.
    pub fn init_shadow_wallet_claim(&mut self, wallet: &Wallet) -> Result<&mut Self> {
        self.wallet_creation_atom(wallet, vec![MetaItem::new("shadowWalletClaim", "1")])?;
        self.add_continuid_atom()
    }

    fn wallet_creation_atom(&mut self, wallet: &Wallet, extra: Vec<MetaItem>) -> Result<()> {
        let source = self.require_source()?.clone();
        let mut meta = vec![
            optional("address", wallet.address.as_deref()),
            MetaItem::new("token", wallet.token.clone()),
            optional("bundle", wallet.bundle.as_deref()),
            optional("position", wallet.position.as_deref()),
            optional("batchId", wallet.batch_id.as_deref()),
        ];
        meta.extend(extra);

        let atom = Atom::from_wallet(Isotope::C, &source)
            .token(USER_TOKEN)
            .meta_type("wallet")
            .meta_id(wallet.address.clone().unwrap_or_default())
            .meta(final_metas(meta, &source))
            .index(self.generate_index())
            .build();
        self.add_atom(atom);
        Ok(())
    }

    /// Register an identifier (email, phone, ...) against the bundle.
    pub fn init_identifier_creation(
        &mut self,
        identifier_type: &str,
        contact: &str,
        code: &str,
    ) -> Result<&mut Self> {
        let source = self.require_source()?.clone();
        let meta = vec![
            MetaItem::new("code", code),
            MetaItem::new("hash", generate_bundle_hash(contact.trim())),
        ];
        let atom = Atom::from_wallet(Isotope::C, &source)
            .token(USER_TOKEN)
            .meta_type("identifier")
            .meta_id(identifier_type)
            .meta(final_metas(meta, &source))
            .index(self.generate_index())
            .build();
        self.add_atom(atom);
        self.add_continuid_atom()
    }

    /// Request an authorization token. The source wallet holds `AUTH`.
    pub fn init_authorization(&mut self, meta: Vec<MetaItem>) -> Result<&mut Self> {
        let source = self.require_source()?.clone();
        let atom = Atom::from_wallet(Isotope::U, &source)
            .meta(final_metas(meta, &source))
            .index(self.generate_index())
            .build();
        self.add_atom(atom);
        Ok(self)
    }

    /// Request `amount` of `token` for the record at `meta_type`/`meta_id`.
    pub fn init_token_request(
        &mut self,
        token: &str,
        amount: f64,
        meta_type: &str,
        meta_id: &str,
        mut meta: Vec<MetaItem>,
    ) -> Result<&mut Self> {
        if amount < 0.0 {
            return Err(CoreError::NegativeAmount(amount));
        }
        let source = self.require_source()?.clone();
        meta.push(MetaItem::new("token", token));

        let atom = Atom::from_wallet(Isotope::T, &source)
            .token(USER_TOKEN)
            .value(amount)
            .meta_type(meta_type)
            .meta_id(meta_id)
            .meta(final_metas(meta, &source))
            .index(self.generate_index())
            .build();
        self.add_atom(atom);
        self.add_continuid_atom()
    }

    /// Attach a rule to the record at `meta_type`/`meta_id`.
    pub fn init_rule(
        &mut self,
        meta_type: &str,
        meta_id: &str,
        rule: &str,
        conditions: &[RuleCondition],
        callback: &str,
    ) -> Result<&mut Self> {
        let source = self.require_source()?.clone();
        let conditions = serde_json::to_string(conditions)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        let meta = vec![
            MetaItem::new("callback", callback),
            MetaItem::new("conditions", conditions),
            MetaItem::new("rule", rule),
        ];

        let atom = Atom::from_wallet(Isotope::R, &source)
            .token(USER_TOKEN)
            .meta_type(meta_type)
            .meta_id(meta_id)
            .meta(final_metas(meta, &source))
            .index(self.generate_index())
            .build();
        self.add_atom(atom);
        self.add_continuid_atom()
    }

    /// Append the ContinuID atom binding the remainder wallet to the bundle.
    pub fn add_continuid_atom(&mut self) -> Result<&mut Self> {
        let remainder = self.require_remainder()?.clone();
        let atom = Atom::from_wallet(Isotope::I, &remainder)
            .token(USER_TOKEN)
            .meta_type(META_WALLET_BUNDLE)
            .meta_id(remainder.bundle.clone().unwrap_or_default())
            .meta(final_metas(Vec::new(), &remainder))
            .index(self.generate_index())
            .build();
        self.add_atom(atom);
        Ok(self)
    }
}
