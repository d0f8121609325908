//! Molecule: an atomic group of atoms sharing one signature.
//!
//! Lifecycle: bind a source wallet, append atoms, sign (which computes the
//! molecular hash and fills every atom's `ots_fragment`), check, submit.
//! Appending an atom always clears a previously computed hash.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::atom::Atom;
use crate::canonical::{hash_atoms, HashEncoding};
use crate::encoding::chunk_substr;
use crate::error::{CheckError, CoreError, Result};
use crate::ots::{compress_signature, sign_hash};
use crate::validation;
use crate::wallet::{generate_bundle_hash, generate_private_key, Wallet};

/// Signing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignOptions {
    /// Leave `bundle` unset.
    pub anonymous: bool,
    /// Distribute the base64 form of the signature instead of hex.
    pub compressed: bool,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            anonymous: false,
            compressed: true,
        }
    }
}

/// A transaction: atoms plus the wallets and secret that sign them.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Molecule {
    #[serde(skip)]
    secret: Option<String>,
    #[serde(skip)]
    source_wallet: Option<Wallet>,
    #[serde(skip)]
    remainder_wallet: Option<Wallet>,
    pub molecular_hash: Option<String>,
    pub cell_slug: Option<String>,
    pub bundle: Option<String>,
    pub status: Option<String>,
    pub created_at: String,
    pub atoms: Vec<Atom>,
}

impl Molecule {
    /// Bind a molecule to a source wallet. Without an explicit remainder one
    /// is derived from the source at a fresh position.
    pub fn new(
        secret: &str,
        source_wallet: Wallet,
        remainder_wallet: Option<Wallet>,
        cell_slug: Option<String>,
    ) -> Result<Self> {
        let remainder_wallet = match remainder_wallet {
            Some(w) => w,
            None => {
                let mut w = Wallet::new(secret, &source_wallet.token, None)?
                    .with_characters(source_wallet.characters);
                w.init_batch_id(&source_wallet, true);
                w
            }
        };

        Ok(Self {
            secret: Some(secret.to_string()),
            source_wallet: Some(source_wallet),
            remainder_wallet: Some(remainder_wallet),
            molecular_hash: None,
            cell_slug,
            bundle: None,
            status: None,
            created_at: crate::types::now_millis(),
            atoms: Vec::new(),
        })
    }

    /// A molecule with no signer, for checking atoms received from elsewhere.
    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        let mut molecule = Self {
            secret: None,
            source_wallet: None,
            remainder_wallet: None,
            molecular_hash: None,
            cell_slug: None,
            bundle: None,
            status: None,
            created_at: crate::types::now_millis(),
            atoms: Vec::new(),
        };
        for atom in atoms {
            molecule.add_atom(atom);
        }
        molecule
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn source_wallet(&self) -> Option<&Wallet> {
        self.source_wallet.as_ref()
    }

    pub fn remainder_wallet(&self) -> Option<&Wallet> {
        self.remainder_wallet.as_ref()
    }

    pub(crate) fn require_secret(&self) -> Result<&str> {
        self.secret.as_deref().ok_or(CoreError::MissingSecret)
    }

    pub(crate) fn require_source(&self) -> Result<&Wallet> {
        self.source_wallet
            .as_ref()
            .ok_or(CoreError::MissingSourceWallet)
    }

    pub(crate) fn require_remainder(&self) -> Result<&Wallet> {
        self.remainder_wallet
            .as_ref()
            .ok_or(CoreError::MissingRemainderWallet)
    }

    /// Next free index: one past the last atom's, or 0.
    pub fn generate_index(&self) -> usize {
        self.atoms.last().map_or(0, |a| a.index + 1)
    }

    /// Append an atom, keep atoms in index order and clear the hash.
    pub fn add_atom(&mut self, atom: Atom) -> &mut Self {
        self.molecular_hash = None;
        self.atoms.push(atom);
        self.atoms.sort_by_key(|a| a.index);
        self
    }

    /// Canonical hash of the current atoms.
    pub fn hash(&self, encoding: HashEncoding) -> Result<String> {
        hash_atoms(&self.atoms, encoding)
    }

    /// Compute the molecular hash and sign it with the key of the first
    /// atom's wallet. Every atom receives a slice of the signature.
    pub fn sign(&mut self, options: SignOptions) -> Result<()> {
        if self.atoms.is_empty() {
            return Err(CheckError::AtomsMissing.into());
        }
        let secret = self.require_secret()?.to_string();

        if !options.anonymous {
            self.bundle = Some(generate_bundle_hash(&secret));
        }

        let molecular_hash = self.hash(HashEncoding::Base17)?;

        let first = &self.atoms[0];
        let position = first.position.as_deref().ok_or(CoreError::MissingPosition)?;
        let key = generate_private_key(&secret, first.token_str(), position)?;

        let mut signature = sign_hash(&key, &molecular_hash)?;
        if options.compressed {
            signature = compress_signature(&signature)?;
        }

        let chunk_size = signature.len().div_ceil(self.atoms.len());
        let fragments = chunk_substr(&signature, chunk_size);
        for (i, atom) in self.atoms.iter_mut().enumerate() {
            atom.ots_fragment = Some(fragments.get(i).copied().unwrap_or_default().to_string());
        }

        self.molecular_hash = Some(molecular_hash);
        Ok(())
    }

    /// The signature reassembled from every atom's fragment, in index order.
    pub fn ots(&self) -> String {
        self.atoms
            .iter()
            .filter_map(|a| a.ots_fragment.as_deref())
            .collect()
    }

    /// Run every check. `sender` supplies the balance for transfer checks.
    pub fn check(&self, sender: Option<&Wallet>) -> std::result::Result<(), CheckError> {
        validation::verify(self, sender)
    }
}

impl fmt::Debug for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Molecule")
            .field("molecular_hash", &self.molecular_hash)
            .field("source_wallet", &self.source_wallet)
            .field("remainder_wallet", &self.remainder_wallet)
            .field("atoms", &self.atoms.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ots::SIGNATURE_HEX_LEN;
    use crate::types::{Isotope, USER_TOKEN};
    use crate::validation::check_ots;

    fn secret() -> String {
        "a1".repeat(1024)
    }

    fn molecule_with_meta_atom() -> Molecule {
        let source = Wallet::new(&secret(), USER_TOKEN, None).unwrap();
        let mut molecule = Molecule::new(&secret(), source.clone(), None, None).unwrap();
        molecule.add_atom(
            Atom::from_wallet(Isotope::M, &source)
                .add_meta("name", "value")
                .index(0)
                .build(),
        );
        molecule
    }

    #[test]
    fn test_add_atom_sorts_and_clears_hash() {
        let mut molecule = molecule_with_meta_atom();
        molecule.molecular_hash = Some("stale".into());
        molecule.add_atom(Atom::builder(Isotope::I).index(5).build());
        molecule.add_atom(Atom::builder(Isotope::I).index(2).build());
        assert!(molecule.molecular_hash.is_none());
        let indices: Vec<usize> = molecule.atoms.iter().map(|a| a.index).collect();
        assert_eq!(indices, vec![0, 2, 5]);
        assert_eq!(molecule.generate_index(), 6);
    }

    #[test]
    fn test_generate_index_empty() {
        let molecule = Molecule::from_atoms(Vec::new());
        assert_eq!(molecule.generate_index(), 0);
    }

    #[test]
    fn test_sign_sets_hash_and_fragments() {
        let mut molecule = molecule_with_meta_atom();
        molecule.add_atom(Atom::builder(Isotope::I).index(1).build());
        molecule.sign(SignOptions::default()).unwrap();

        assert_eq!(molecule.molecular_hash.as_ref().unwrap().len(), 64);
        assert_eq!(molecule.bundle.as_deref(), Some(generate_bundle_hash(&secret()).as_str()));
        assert!(molecule.atoms.iter().all(|a| a.ots_fragment.is_some()));
        check_ots(&molecule).unwrap();
    }

    #[test]
    fn test_uncompressed_signature_length() {
        let mut molecule = molecule_with_meta_atom();
        molecule
            .sign(SignOptions {
                anonymous: true,
                compressed: false,
            })
            .unwrap();
        assert_eq!(molecule.ots().len(), SIGNATURE_HEX_LEN);
        assert!(molecule.bundle.is_none());
        check_ots(&molecule).unwrap();
    }

    #[test]
    fn test_sign_empty_molecule() {
        let source = Wallet::new(&secret(), USER_TOKEN, None).unwrap();
        let mut molecule = Molecule::new(&secret(), source, None, None).unwrap();
        assert!(matches!(
            molecule.sign(SignOptions::default()),
            Err(CoreError::Check(CheckError::AtomsMissing))
        ));
    }

    #[test]
    fn test_sign_requires_position() {
        let mut molecule = molecule_with_meta_atom();
        molecule.atoms[0].position = None;
        assert!(matches!(
            molecule.sign(SignOptions::default()),
            Err(CoreError::MissingPosition)
        ));
    }

    #[test]
    fn test_fragments_cover_more_atoms_than_chunks() {
        let mut molecule = molecule_with_meta_atom();
        for i in 1..4 {
            molecule.add_atom(Atom::builder(Isotope::I).index(i).build());
        }
        molecule.sign(SignOptions::default()).unwrap();
        assert_eq!(molecule.atoms.len(), 4);
        check_ots(&molecule).unwrap();
    }

    #[test]
    fn test_default_remainder_shares_bundle() {
        let molecule = molecule_with_meta_atom();
        let source = molecule.source_wallet().unwrap();
        let remainder = molecule.remainder_wallet().unwrap();
        assert_eq!(source.bundle, remainder.bundle);
        assert_ne!(source.position, remainder.position);
    }

    #[test]
    fn test_serialized_molecule_omits_secret() {
        let mut molecule = molecule_with_meta_atom();
        molecule.sign(SignOptions::default()).unwrap();
        let json = serde_json::to_string(&molecule).unwrap();
        assert!(!json.contains(&secret()));
        assert!(json.contains("molecularHash"));
    }
}
