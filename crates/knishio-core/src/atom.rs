//! Atom: one indivisible transaction fact.

use serde::{Deserialize, Serialize};

use crate::types::{meta_value, now_millis, Isotope, MetaItem};
use crate::wallet::Wallet;

/// One atom within a molecule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Atom {
    /// Position of the wallet issuing or receiving this atom.
    pub position: Option<String>,
    pub wallet_address: Option<String>,
    pub isotope: Isotope,
    pub token: Option<String>,
    /// Signed decimal amount, as text.
    pub value: Option<String>,
    pub batch_id: Option<String>,
    pub meta_type: Option<String>,
    pub meta_id: Option<String>,
    #[serde(default)]
    pub meta: Vec<MetaItem>,
    /// This atom's slice of the molecule signature.
    pub ots_fragment: Option<String>,
    pub index: usize,
    /// Unix milliseconds, as text.
    pub created_at: String,
}

impl Atom {
    /// Start building an atom of the given isotope.
    pub fn builder(isotope: Isotope) -> AtomBuilder {
        AtomBuilder::new(isotope)
    }

    /// Start building an atom addressed to `wallet`: position, address,
    /// token and batch id are taken from it.
    pub fn from_wallet(isotope: Isotope, wallet: &Wallet) -> AtomBuilder {
        let mut builder = AtomBuilder::new(isotope);
        builder.atom.position = wallet.position.clone();
        builder.atom.wallet_address = wallet.address.clone();
        builder.atom.token = Some(wallet.token.clone());
        builder.atom.batch_id = wallet.batch_id.clone();
        builder
    }

    /// First non-null meta value for `key`.
    pub fn meta(&self, key: &str) -> Option<&str> {
        meta_value(&self.meta, key)
    }

    pub fn token_str(&self) -> &str {
        self.token.as_deref().unwrap_or("")
    }

    /// Parse `value` as a float. `None` when absent.
    pub fn value_f64(&self) -> Option<Result<f64, std::num::ParseFloatError>> {
        self.value.as_deref().map(|v| v.trim().parse::<f64>())
    }
}

/// Builder for [`Atom`].
#[derive(Debug, Clone)]
pub struct AtomBuilder {
    atom: Atom,
}

impl AtomBuilder {
    pub fn new(isotope: Isotope) -> Self {
        Self {
            atom: Atom {
                position: None,
                wallet_address: None,
                isotope,
                token: None,
                value: None,
                batch_id: None,
                meta_type: None,
                meta_id: None,
                meta: Vec::new(),
                ots_fragment: None,
                index: 0,
                created_at: now_millis(),
            },
        }
    }

    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.atom.position = Some(position.into());
        self
    }

    pub fn wallet_address(mut self, address: impl Into<String>) -> Self {
        self.atom.wallet_address = Some(address.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.atom.token = Some(token.into());
        self
    }

    /// Set the value from a number, formatted without a trailing `.0`.
    pub fn value(mut self, value: f64) -> Self {
        self.atom.value = Some(format_amount(value));
        self
    }

    /// Set the value text verbatim.
    pub fn value_str(mut self, value: impl Into<String>) -> Self {
        self.atom.value = Some(value.into());
        self
    }

    pub fn batch_id(mut self, batch_id: Option<String>) -> Self {
        self.atom.batch_id = batch_id;
        self
    }

    pub fn meta_type(mut self, meta_type: impl Into<String>) -> Self {
        self.atom.meta_type = Some(meta_type.into());
        self
    }

    pub fn meta_id(mut self, meta_id: impl Into<String>) -> Self {
        self.atom.meta_id = Some(meta_id.into());
        self
    }

    pub fn meta(mut self, meta: Vec<MetaItem>) -> Self {
        self.atom.meta = meta;
        self
    }

    pub fn add_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.atom.meta.push(MetaItem::new(key, value));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.atom.index = index;
        self
    }

    pub fn created_at(mut self, created_at: impl Into<String>) -> Self {
        self.atom.created_at = created_at.into();
        self
    }

    pub fn build(self) -> Atom {
        self.atom
    }
}

/// Format an amount the way it is carried on the wire: integral values
/// without a fractional part.
pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let atom = Atom::builder(Isotope::V)
            .token("TOKEN")
            .value(-100.0)
            .index(3)
            .add_meta("k", "v")
            .build();
        assert_eq!(atom.isotope, Isotope::V);
        assert_eq!(atom.value.as_deref(), Some("-100"));
        assert_eq!(atom.index, 3);
        assert_eq!(atom.meta("k"), Some("v"));
        assert!(atom.ots_fragment.is_none());
        assert!(!atom.created_at.is_empty());
    }

    #[test]
    fn test_from_wallet() {
        let wallet = Wallet::new(&"a1".repeat(1024), "TOKEN", None)
            .unwrap()
            .with_batch_id("batch");
        let atom = Atom::from_wallet(Isotope::V, &wallet).build();
        assert_eq!(atom.position, wallet.position);
        assert_eq!(atom.wallet_address, wallet.address);
        assert_eq!(atom.token_str(), "TOKEN");
        assert_eq!(atom.batch_id.as_deref(), Some("batch"));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(100.0), "100");
        assert_eq!(format_amount(-0.5), "-0.5");
        assert_eq!(format_amount(0.0), "0");
    }

    #[test]
    fn test_value_f64() {
        let atom = Atom::builder(Isotope::V).value_str("abc").build();
        assert!(atom.value_f64().unwrap().is_err());
        let atom = Atom::builder(Isotope::V).build();
        assert!(atom.value_f64().is_none());
    }

    #[test]
    fn test_camel_case_wire_names() {
        let atom = Atom::builder(Isotope::M).wallet_address("addr").build();
        let json = serde_json::to_value(&atom).unwrap();
        assert_eq!(json["walletAddress"], "addr");
        assert_eq!(json["isotope"], "M");
        assert!(json.get("otsFragment").is_some());
    }
}
