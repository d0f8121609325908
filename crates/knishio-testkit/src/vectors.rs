//! Scenario vectors for deterministic verification.
//!
//! Each vector fixes every input of wallet derivation and molecule hashing.
//! Two implementations with the same sponge must report the same outputs.

use serde::{Deserialize, Serialize};

use knishio_core::wallet::generate_bundle_hash;
use knishio_core::{
    hash, hash_atoms, Atom, HashEncoding, Isotope, MetaItem, Molecule, Wallet, USER_TOKEN,
};

use crate::fixtures::{test_secret, value_atom, zero_position, FIXED_CREATED_AT};

/// Fixed derivation inputs.
#[derive(Debug, Clone)]
pub struct ScenarioVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Hex pair repeated into a 2048-character secret.
    pub secret_pair: &'static str,
    pub token: &'static str,
    pub position: String,
    /// Expected address; empty means "report only".
    pub expected_address: &'static str,
}

/// Outputs derived from a [`ScenarioVector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedVector {
    pub name: String,
    pub bundle: String,
    /// `hash(key, 32)`; the key itself is too long to publish.
    pub key_digest: String,
    pub address: String,
    /// Hash of a fixed metadata atom signed by this wallet.
    pub molecular_hash: String,
}

/// Get all scenario vectors.
pub fn all_vectors() -> Vec<ScenarioVector> {
    vec![
        ScenarioVector {
            name: "identity wallet at zero position",
            secret_pair: "a1",
            token: USER_TOKEN,
            position: zero_position(),
            expected_address: "",
        },
        ScenarioVector {
            name: "auth wallet at zero position",
            secret_pair: "a1",
            token: "AUTH",
            position: zero_position(),
            expected_address: "",
        },
        ScenarioVector {
            name: "custom token at ones position",
            secret_pair: "b2",
            token: "CRZY",
            position: "1".repeat(64),
            expected_address: "",
        },
    ]
}

/// The wallet a vector describes.
pub fn wallet_from_vector(vector: &ScenarioVector) -> Wallet {
    Wallet::new(
        &test_secret(vector.secret_pair),
        vector.token,
        Some(&vector.position),
    )
    .expect("vector inputs are valid hex")
}

/// Derive every output of a vector.
pub fn derive(vector: &ScenarioVector) -> DerivedVector {
    let wallet = wallet_from_vector(vector);
    let atom = Atom::from_wallet(Isotope::M, &wallet)
        .meta_type("vector")
        .meta_id(vector.name)
        .meta(vec![MetaItem::new("name", vector.name)])
        .created_at(FIXED_CREATED_AT)
        .build();

    DerivedVector {
        name: vector.name.to_string(),
        bundle: generate_bundle_hash(&test_secret(vector.secret_pair)),
        key_digest: hash(wallet.key().unwrap_or_default(), 32),
        address: wallet.address.clone().unwrap_or_default(),
        molecular_hash: hash_atoms(&[atom], HashEncoding::Base17)
            .expect("base17 conversion of a hex digest"),
    }
}

/// Verify all vectors against their expected addresses.
///
/// Returns `(name, matches, address)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let derived = derive(v);
            let matches = v.expected_address.is_empty() || derived.address == v.expected_address;
            (v.name.to_string(), matches, derived.address)
        })
        .collect()
}

/// Two `V` atoms moving 100 units between different addresses.
pub fn simple_transfer() -> Molecule {
    hashed(Molecule::from_atoms(vec![
        value_atom(&zero_position(), &"a".repeat(64), "CRZY", "-100", 0),
        value_atom(&"1".repeat(64), &"b".repeat(64), "CRZY", "100", 1),
    ]))
}

/// Two atoms sharing index 0.
pub fn duplicate_index() -> Molecule {
    let mut molecule = simple_transfer();
    for atom in &mut molecule.atoms {
        atom.index = 0;
    }
    hashed(molecule)
}

fn hashed(mut molecule: Molecule) -> Molecule {
    let hash = molecule
        .hash(HashEncoding::Base17)
        .expect("vector atoms hash");
    molecule.molecular_hash = Some(hash);
    molecule
}

#[cfg(test)]
mod tests {
    use super::*;
    use knishio_core::{validation, CheckError};

    #[test]
    fn test_vectors_are_deterministic() {
        for vector in all_vectors() {
            let a = derive(&vector);
            let b = derive(&vector);
            assert_eq!(a, b, "vector '{}' changed on regeneration", vector.name);
            assert_eq!(a.address.len(), 64);
            assert_eq!(a.molecular_hash.len(), 64);
        }
    }

    #[test]
    fn test_vectors_differ() {
        let derived: Vec<_> = all_vectors().iter().map(derive).collect();
        assert_eq!(derived[0].bundle, derived[1].bundle);
        assert_ne!(derived[0].address, derived[1].address);
        assert_ne!(derived[0].bundle, derived[2].bundle);
    }

    #[test]
    fn test_verify_all_vectors() {
        for (name, matches, _) in verify_all_vectors() {
            assert!(matches, "vector '{name}' does not match its expected address");
        }
    }

    #[test]
    fn print_vectors_json() {
        let derived: Vec<_> = all_vectors().iter().map(derive).collect();
        println!("{}", serde_json::to_string_pretty(&derived).unwrap());
    }

    #[test]
    fn test_simple_transfer_scenario() {
        let molecule = simple_transfer();
        validation::check_molecular_hash(&molecule).unwrap();
        assert!(validation::isotope_v(&molecule, None).is_ok());

        let mut unhashed = molecule.clone();
        unhashed.molecular_hash = None;
        assert_eq!(
            validation::isotope_v(&unhashed, None),
            Err(CheckError::MolecularHashMissing)
        );

        let mut to_self = molecule.clone();
        to_self.atoms[1].wallet_address = to_self.atoms[0].wallet_address.clone();
        assert_eq!(
            validation::isotope_v(&to_self, None),
            Err(CheckError::TransferToSelf)
        );
    }

    #[test]
    fn test_duplicate_index_scenario() {
        let molecule = duplicate_index();
        assert_eq!(
            validation::check_index(&molecule),
            Err(CheckError::DuplicateIndex(0))
        );
    }

    #[test]
    fn test_malformed_ots_scenario() {
        let mut molecule = simple_transfer();
        molecule.atoms[0].ots_fragment = Some("abc".into());
        molecule.atoms[1].ots_fragment = Some("def".into());
        assert_eq!(
            validation::check_ots(&molecule),
            Err(CheckError::SignatureMalformed)
        );
    }
}
