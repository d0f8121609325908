//! Canonical molecular hash.
//!
//! The atom fields that feed the hash, their order and how null values are
//! treated are fixed by [`HASHED_FIELDS`]. Any change here breaks signature
//! verification against every other client.
//!
//! Per atom (in `index` order):
//! 1. absorb the decimal atom count
//! 2. absorb each field per its [`FieldPolicy`]
//!
//! The sponge is squeezed once, for 32 bytes.

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::encoding::{charset_base_convert, BASE17_SYMBOLS, HEX_SYMBOLS};
use crate::error::Result;
use crate::sponge::Sponge;

/// Length of the base17 molecular hash.
pub const BASE17_HASH_LEN: usize = 64;

/// Hashed atom fields, in absorption order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomField {
    Position,
    WalletAddress,
    Isotope,
    Token,
    Value,
    BatchId,
    MetaType,
    MetaId,
    Meta,
    OtsFragment,
    Index,
    CreatedAt,
}

/// How a field contributes to the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Absorbed as its string form; null becomes the empty string.
    Always,
    /// Absorbed when present, contributes nothing when null.
    SkipIfNull,
    /// Key then value for every entry; null-valued entries are skipped.
    Pairs,
    /// Never absorbed.
    Excluded,
}

/// The canonical field table.
pub const HASHED_FIELDS: [(AtomField, FieldPolicy); 12] = [
    (AtomField::Position, FieldPolicy::Always),
    (AtomField::WalletAddress, FieldPolicy::Always),
    (AtomField::Isotope, FieldPolicy::Always),
    (AtomField::Token, FieldPolicy::SkipIfNull),
    (AtomField::Value, FieldPolicy::SkipIfNull),
    (AtomField::BatchId, FieldPolicy::SkipIfNull),
    (AtomField::MetaType, FieldPolicy::SkipIfNull),
    (AtomField::MetaId, FieldPolicy::SkipIfNull),
    (AtomField::Meta, FieldPolicy::Pairs),
    (AtomField::OtsFragment, FieldPolicy::Excluded),
    (AtomField::Index, FieldPolicy::Excluded),
    (AtomField::CreatedAt, FieldPolicy::SkipIfNull),
];

/// Output form of the molecular hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashEncoding {
    /// 64 base17 digits (`0-9a-g`), zero-padded. The on-ledger form.
    #[default]
    Base17,
    /// 64 lowercase hex characters.
    Hex,
}

fn scalar(atom: &Atom, field: AtomField) -> Option<String> {
    match field {
        AtomField::Position => atom.position.clone(),
        AtomField::WalletAddress => atom.wallet_address.clone(),
        AtomField::Isotope => Some(atom.isotope.to_string()),
        AtomField::Token => atom.token.clone(),
        AtomField::Value => atom.value.clone(),
        AtomField::BatchId => atom.batch_id.clone(),
        AtomField::MetaType => atom.meta_type.clone(),
        AtomField::MetaId => atom.meta_id.clone(),
        AtomField::CreatedAt => Some(atom.created_at.clone()),
        AtomField::OtsFragment => atom.ots_fragment.clone(),
        AtomField::Index => Some(atom.index.to_string()),
        AtomField::Meta => None,
    }
}

fn absorb_atom(sponge: &mut Sponge, atom: &Atom) {
    for (field, policy) in HASHED_FIELDS {
        match policy {
            FieldPolicy::Excluded => {}
            FieldPolicy::Always => {
                sponge.absorb(scalar(atom, field).unwrap_or_default());
            }
            FieldPolicy::SkipIfNull => {
                if let Some(v) = scalar(atom, field) {
                    sponge.absorb(v);
                }
            }
            FieldPolicy::Pairs => {
                for item in &atom.meta {
                    if let Some(value) = &item.value {
                        sponge.absorb(&item.key);
                        sponge.absorb(value);
                    }
                }
            }
        }
    }
}

/// Raw 32-byte hex digest of `atoms`, sorted by index.
pub fn hash_atoms_hex(atoms: &[Atom]) -> String {
    let mut sorted: Vec<&Atom> = atoms.iter().collect();
    sorted.sort_by_key(|a| a.index);

    let count = sorted.len().to_string();
    let mut sponge = Sponge::new();
    for atom in sorted {
        sponge.absorb(&count);
        absorb_atom(&mut sponge, atom);
    }
    sponge.squeeze_hex(32)
}

/// Molecular hash of `atoms` in the requested encoding.
pub fn hash_atoms(atoms: &[Atom], encoding: HashEncoding) -> Result<String> {
    let hex_digest = hash_atoms_hex(atoms);
    match encoding {
        HashEncoding::Hex => Ok(hex_digest),
        HashEncoding::Base17 => {
            let b17 = charset_base_convert(
                &hex_digest,
                16,
                17,
                Some(HEX_SYMBOLS),
                Some(BASE17_SYMBOLS),
            )?;
            Ok(format!("{b17:0>width$}", width = BASE17_HASH_LEN))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Isotope, MetaItem};

    fn atom(index: usize) -> Atom {
        Atom::builder(Isotope::V)
            .position("pos")
            .wallet_address("addr")
            .token("TOKEN")
            .value(10.0)
            .index(index)
            .created_at("1700000000000")
            .build()
    }

    #[test]
    fn test_base17_shape() {
        let h = hash_atoms(&[atom(0)], HashEncoding::Base17).unwrap();
        assert_eq!(h.len(), BASE17_HASH_LEN);
        assert!(h.chars().all(|c| BASE17_SYMBOLS.contains(c)));
    }

    #[test]
    fn test_hex_shape() {
        let h = hash_atoms(&[atom(0)], HashEncoding::Hex).unwrap();
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_order_independent() {
        let a = hash_atoms_hex(&[atom(0), atom(1), atom(2)]);
        let b = hash_atoms_hex(&[atom(2), atom(0), atom(1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_manual_absorption_matches() {
        let a = atom(0);
        let mut sponge = Sponge::new();
        sponge
            .absorb("1")
            .absorb("pos")
            .absorb("addr")
            .absorb("V")
            .absorb("TOKEN")
            .absorb("10")
            .absorb("1700000000000");
        assert_eq!(hash_atoms_hex(&[a]), sponge.squeeze_hex(32));
    }

    #[test]
    fn test_count_absorbed_per_atom() {
        let (a, b) = (atom(0), atom(1));
        let mut sponge = Sponge::new();
        for x in [&a, &b] {
            sponge.absorb("2");
            absorb_atom(&mut sponge, x);
        }
        assert_eq!(hash_atoms_hex(&[a, b]), sponge.squeeze_hex(32));
    }

    #[test]
    fn test_ots_fragment_and_index_excluded() {
        let a = atom(0);
        let mut b = a.clone();
        b.ots_fragment = Some("deadbeef".into());
        b.index = 7;
        assert_eq!(hash_atoms_hex(&[a]), hash_atoms_hex(&[b]));
    }

    #[test]
    fn test_null_batch_id_skipped() {
        let a = atom(0);
        let mut b = a.clone();
        b.batch_id = Some(String::new());
        // An empty string absorbs nothing, so it matches null.
        assert_eq!(hash_atoms_hex(&[a.clone()]), hash_atoms_hex(&[b]));

        let mut c = a.clone();
        c.batch_id = Some("batch".into());
        assert_ne!(hash_atoms_hex(&[a]), hash_atoms_hex(&[c]));
    }

    #[test]
    fn test_null_position_absorbs_empty_string() {
        let mut a = atom(0);
        a.position = None;
        let mut b = atom(0);
        b.position = Some(String::new());
        assert_eq!(hash_atoms_hex(&[a]), hash_atoms_hex(&[b]));
    }

    #[test]
    fn test_meta_null_values_skipped() {
        let mut a = atom(0);
        a.meta = vec![MetaItem::new("k", "v")];
        let mut b = atom(0);
        b.meta = vec![MetaItem::new("k", "v"), MetaItem::null("ignored")];
        assert_eq!(hash_atoms_hex(&[a.clone()]), hash_atoms_hex(&[b]));

        let mut c = atom(0);
        c.meta = vec![MetaItem::new("v", "k")];
        assert_ne!(hash_atoms_hex(&[a]), hash_atoms_hex(&[c]));
    }

    #[test]
    fn test_meta_order_matters() {
        let mut a = atom(0);
        a.meta = vec![MetaItem::new("a", "1"), MetaItem::new("b", "2")];
        let mut b = atom(0);
        b.meta = vec![MetaItem::new("b", "2"), MetaItem::new("a", "1")];
        assert_ne!(hash_atoms_hex(&[a]), hash_atoms_hex(&[b]));
    }

    #[test]
    fn test_base17_is_rebased_hex() {
        let atoms = [atom(0)];
        let hex_digest = hash_atoms_hex(&atoms);
        let b17 = hash_atoms(&atoms, HashEncoding::Base17).unwrap();
        let from_hex = num_bigint::BigUint::parse_bytes(hex_digest.as_bytes(), 16).unwrap();
        let from_b17 = num_bigint::BigUint::parse_bytes(b17.as_bytes(), 17).unwrap();
        assert_eq!(from_hex, from_b17);
    }
}
