//! Molecule validation: structural, economic and cryptographic checks.
//!
//! Every check is pure and returns the first [`CheckError`] it finds.
//! [`verify`] runs all of them in a fixed order; callers validating a single
//! operation may run only the checks that apply.

use std::collections::HashSet;

use crate::atom::Atom;
use crate::canonical::HashEncoding;
use crate::error::CheckError;
use crate::molecule::Molecule;
use crate::ots::verify_signature;
use crate::types::{Isotope, AUTH_TOKEN, USER_TOKEN};
use crate::wallet::Wallet;

/// Result of a single check.
pub type CheckResult = Result<(), CheckError>;

/// A per-isotope check.
pub type IsotopeRule = fn(&Molecule, Option<&Wallet>) -> CheckResult;

/// Isotope checks, in the order [`verify`] runs them.
pub const ISOTOPE_RULES: [(Isotope, IsotopeRule); 7] = [
    (Isotope::M, rule_m),
    (Isotope::T, rule_t),
    (Isotope::C, rule_c),
    (Isotope::U, rule_u),
    (Isotope::I, rule_i),
    (Isotope::R, rule_r),
    (Isotope::V, isotope_v),
];

/// Keys every rule condition must carry.
pub const CONDITION_KEYS: [&str; 4] = ["key", "value", "comparison", "managedBy"];

/// Run every check.
///
/// Order: hash, signature, index, batch id, ContinuID, then the isotope
/// rules. A tampered atom therefore surfaces as a hash mismatch rather than a
/// signature mismatch.
pub fn verify(molecule: &Molecule, sender: Option<&Wallet>) -> CheckResult {
    check_molecular_hash(molecule)?;
    check_ots(molecule)?;
    check_index(molecule)?;
    check_batch_id(molecule)?;
    check_continu_id(molecule)?;
    for (_, rule) in ISOTOPE_RULES {
        rule(molecule, sender)?;
    }
    Ok(())
}

/// Run the rule registered for `isotope`.
pub fn check_isotope(
    isotope: Isotope,
    molecule: &Molecule,
    sender: Option<&Wallet>,
) -> CheckResult {
    ISOTOPE_RULES
        .iter()
        .find(|(i, _)| *i == isotope)
        .map_or(Ok(()), |(_, rule)| rule(molecule, sender))
}

/// Precondition for most checks: atoms present and hash computed.
pub fn missing(molecule: &Molecule) -> CheckResult {
    if molecule.atoms.is_empty() {
        return Err(CheckError::AtomsMissing);
    }
    if molecule.molecular_hash.is_none() {
        return Err(CheckError::MolecularHashMissing);
    }
    Ok(())
}

/// Recompute the canonical hash and compare it to the stored one.
pub fn check_molecular_hash(molecule: &Molecule) -> CheckResult {
    missing(molecule)?;
    let computed = molecule
        .hash(HashEncoding::Base17)
        .map_err(|_| CheckError::MolecularHashMismatch)?;
    if molecule.molecular_hash.as_deref() != Some(computed.as_str()) {
        return Err(CheckError::MolecularHashMismatch);
    }
    Ok(())
}

/// Verify the one-time signature against the first atom's address.
pub fn check_ots(molecule: &Molecule) -> CheckResult {
    missing(molecule)?;
    let hash = molecule
        .molecular_hash
        .as_deref()
        .ok_or(CheckError::MolecularHashMissing)?;
    let address = molecule.atoms[0]
        .wallet_address
        .as_deref()
        .ok_or(CheckError::SignatureMismatch)?;
    verify_signature(&molecule.ots(), hash, address)
}

/// Atom indices must be unique.
pub fn check_index(molecule: &Molecule) -> CheckResult {
    missing(molecule)?;
    let mut seen = HashSet::with_capacity(molecule.atoms.len());
    for atom in &molecule.atoms {
        if !seen.insert(atom.index) {
            return Err(CheckError::DuplicateIndex(atom.index));
        }
    }
    Ok(())
}

/// When the signing atom is a batched transfer, every `V` atom carries a
/// batch id and the first and last agree.
pub fn check_batch_id(molecule: &Molecule) -> CheckResult {
    missing(molecule)?;
    let signing = &molecule.atoms[0];
    if signing.isotope != Isotope::V || signing.batch_id.is_none() {
        return Ok(());
    }

    let v_atoms = filter(molecule, Isotope::V);
    if v_atoms.iter().any(|a| a.batch_id.as_deref().map_or(true, str::is_empty)) {
        return Err(CheckError::BatchId("transfer atom without batch id".into()));
    }
    let last = v_atoms.last().map(|a| &a.batch_id);
    if last != Some(&signing.batch_id) {
        return Err(CheckError::BatchId(
            "first and last transfer atoms differ".into(),
        ));
    }
    Ok(())
}

/// Identity-token molecules must carry a ContinuID atom.
pub fn check_continu_id(molecule: &Molecule) -> CheckResult {
    missing(molecule)?;
    if molecule.atoms[0].token_str() == USER_TOKEN && filter(molecule, Isotope::I).is_empty() {
        return Err(CheckError::ContinuIdMissing);
    }
    Ok(())
}

/// Metadata atoms: non-empty meta on the identity token.
pub fn isotope_m(molecule: &Molecule) -> CheckResult {
    missing(molecule)?;
    for atom in filter(molecule, Isotope::M) {
        if atom.meta.is_empty() {
            return Err(CheckError::MetaMissing("meta".into()));
        }
        require_token(atom, USER_TOKEN)?;
    }
    Ok(())
}

/// Creation atoms: identity token, first in the molecule.
pub fn isotope_c(molecule: &Molecule) -> CheckResult {
    missing(molecule)?;
    for atom in filter(molecule, Isotope::C) {
        require_token(atom, USER_TOKEN)?;
        if atom.index != 0 {
            return Err(index_error(atom));
        }
    }
    Ok(())
}

/// ContinuID atoms: identity token, never first.
pub fn isotope_i(molecule: &Molecule) -> CheckResult {
    missing(molecule)?;
    for atom in filter(molecule, Isotope::I) {
        require_token(atom, USER_TOKEN)?;
        if atom.index == 0 {
            return Err(index_error(atom));
        }
    }
    Ok(())
}

/// Authorization atoms: auth token, first in the molecule.
pub fn isotope_u(molecule: &Molecule) -> CheckResult {
    missing(molecule)?;
    for atom in filter(molecule, Isotope::U) {
        require_token(atom, AUTH_TOKEN)?;
        if atom.index != 0 {
            return Err(index_error(atom));
        }
    }
    Ok(())
}

/// Token request atoms.
pub fn isotope_t(molecule: &Molecule) -> CheckResult {
    missing(molecule)?;
    for atom in filter(molecule, Isotope::T) {
        require_meta(atom, &["token"])?;
        let wallet_target = atom
            .meta_type
            .as_deref()
            .map_or(true, |t| t.eq_ignore_ascii_case("wallet"));
        if wallet_target {
            require_meta(atom, &["position", "bundle"])?;
        }
        require_token(atom, USER_TOKEN)?;
        if atom.index != 0 {
            return Err(index_error(atom));
        }
    }
    Ok(())
}

/// Rule atoms: callback, rule and a JSON list of well-formed conditions.
pub fn isotope_r(molecule: &Molecule) -> CheckResult {
    missing(molecule)?;
    for atom in filter(molecule, Isotope::R) {
        require_meta(atom, &["callback", "conditions", "rule"])?;
        let raw = atom.meta("conditions").unwrap_or_default();

        let conditions: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| CheckError::MalformedJson {
                field: "conditions".into(),
                reason: e.to_string(),
            })?;
        let list = conditions.as_array().ok_or_else(|| {
            CheckError::MetaMalformed("conditions must be a list".into())
        })?;
        for condition in list {
            let map = condition.as_object().ok_or_else(|| {
                CheckError::MetaMalformed("each condition must be an object".into())
            })?;
            for key in CONDITION_KEYS {
                if !map.contains_key(key) {
                    return Err(CheckError::MetaMissing(format!("conditions.{key}")));
                }
            }
        }
    }
    Ok(())
}

/// Value transfers.
///
/// The first `V` atom is the debit. When the molecule opens with one of
/// exactly two `V` atoms only the token match, the credit sign and the
/// address difference are checked.
/// Otherwise every `V` atom must share the debit's token, credits must be
/// non-negative and leave the debit's address, and the sum must balance:
/// to zero without a sender, or to `sender.balance + debit` with one.
pub fn isotope_v(molecule: &Molecule, sender: Option<&Wallet>) -> CheckResult {
    missing(molecule)?;
    let v_atoms = filter(molecule, Isotope::V);
    let Some(&first) = v_atoms.first() else {
        return Ok(());
    };

    let simple = molecule.atoms[0].isotope == Isotope::V;
    if let (true, [_, last]) = (simple, v_atoms.as_slice()) {
        if first.token != last.token {
            return Err(CheckError::TransferMismatched);
        }
        if value_of(last)? < 0.0 {
            return Err(CheckError::TransferMalformed);
        }
        if first.wallet_address == last.wallet_address {
            return Err(CheckError::TransferToSelf);
        }
        return Ok(());
    }

    let mut sum = 0.0;
    for (i, atom) in v_atoms.iter().enumerate() {
        let value = value_of(atom)?;
        if atom.token != first.token {
            return Err(CheckError::TransferMismatched);
        }
        if i > 0 {
            if value < 0.0 {
                return Err(CheckError::TransferMalformed);
            }
            if atom.wallet_address == first.wallet_address {
                return Err(CheckError::TransferToSelf);
            }
        }
        sum += value;
    }

    match sender {
        Some(wallet) => {
            let remainder = wallet.balance + value_of(first)?;
            if remainder < 0.0 {
                return Err(CheckError::TransferBalance);
            }
            if remainder != sum {
                return Err(CheckError::TransferRemainder);
            }
        }
        None if sum != 0.0 => return Err(CheckError::TransferUnbalanced),
        None => {}
    }
    Ok(())
}

fn rule_m(molecule: &Molecule, _: Option<&Wallet>) -> CheckResult {
    isotope_m(molecule)
}

fn rule_t(molecule: &Molecule, _: Option<&Wallet>) -> CheckResult {
    isotope_t(molecule)
}

fn rule_c(molecule: &Molecule, _: Option<&Wallet>) -> CheckResult {
    isotope_c(molecule)
}

fn rule_u(molecule: &Molecule, _: Option<&Wallet>) -> CheckResult {
    isotope_u(molecule)
}

fn rule_i(molecule: &Molecule, _: Option<&Wallet>) -> CheckResult {
    isotope_i(molecule)
}

fn rule_r(molecule: &Molecule, _: Option<&Wallet>) -> CheckResult {
    isotope_r(molecule)
}

fn filter(molecule: &Molecule, isotope: Isotope) -> Vec<&Atom> {
    molecule
        .atoms
        .iter()
        .filter(|a| a.isotope == isotope)
        .collect()
}

fn require_token(atom: &Atom, expected: &'static str) -> CheckResult {
    if atom.token_str() != expected {
        return Err(CheckError::WrongToken {
            isotope: atom.isotope,
            expected,
            found: atom.token_str().to_string(),
        });
    }
    Ok(())
}

fn require_meta(atom: &Atom, keys: &[&str]) -> CheckResult {
    for key in keys {
        if atom.meta(key).map_or(true, str::is_empty) {
            return Err(CheckError::MetaMissing((*key).to_string()));
        }
    }
    Ok(())
}

fn index_error(atom: &Atom) -> CheckError {
    CheckError::AtomIndex {
        isotope: atom.isotope,
        index: atom.index,
    }
}

fn value_of(atom: &Atom) -> Result<f64, CheckError> {
    match atom.value_f64() {
        Some(Ok(v)) if v.is_finite() => Ok(v),
        _ => Err(CheckError::InvalidValue(
            atom.value.clone().unwrap_or_else(|| "null".into()),
        )),
    }
}
