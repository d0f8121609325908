//! One-time signatures over the base17 molecular hash.
//!
//! The 2048-hex private key is cut into 16 fragments. The hash is mapped to
//! signed digits in `[-8, 8]` and balanced to sum to zero; fragment `i` is
//! then hashed `8 - n[i]` times to sign. A verifier finishes every chain with
//! `8 + n[i]` more steps, which reproduces the 16-step chains the address was
//! derived from.
//!
//! A position must sign at most once: two signatures from one key reveal
//! enough chain links to forge a third.

use crate::encoding::{base64_to_hex, chunk_substr, hex_to_base64};
use crate::error::{CheckError, CoreError, Result};
use crate::wallet::{
    address_from_chain_ends, chain_fragment, FRAGMENT_HEX_LEN, KEY_FRAGMENTS, PRIVATE_KEY_BYTES,
};

/// Hex characters in an uncompressed signature.
pub const SIGNATURE_HEX_LEN: usize = PRIVATE_KEY_BYTES * 2;

/// Largest absolute digit after enumeration.
pub const DIGIT_BOUND: i8 = 8;

/// Map each base17 character to a signed digit: `'0'` is -8, `'8'` is 0,
/// `'g'` is 8.
pub fn enumerate(hash: &str) -> Result<Vec<i8>> {
    hash.chars()
        .map(|c| {
            c.to_digit(17)
                .filter(|_| !c.is_ascii_uppercase())
                .map(|d| d as i8 - DIGIT_BOUND)
                .ok_or_else(|| CoreError::Encoding(format!("invalid base17 digit {c:?}")))
        })
        .collect()
}

/// Adjust digits one unit at a time until they sum to zero.
///
/// When the sum is negative, digits below 8 are raised; otherwise digits
/// above -8 are lowered. Digits are visited in order and the scan repeats
/// until balanced.
pub fn normalize(mut digits: Vec<i8>) -> Vec<i8> {
    let mut total: i32 = digits.iter().map(|&d| d as i32).sum();
    let raise = total < 0;

    while total != 0 {
        let mut changed = false;
        for d in digits.iter_mut() {
            if raise && *d < DIGIT_BOUND {
                *d += 1;
                total += 1;
                changed = true;
            } else if !raise && *d > -DIGIT_BOUND {
                *d -= 1;
                total -= 1;
                changed = true;
            }
            if total == 0 {
                break;
            }
        }
        // Saturated: every digit is already at the bound.
        if !changed {
            break;
        }
    }
    digits
}

/// Enumerate and balance a base17 hash.
pub fn normalized_hash(hash: &str) -> Result<Vec<i8>> {
    Ok(normalize(enumerate(hash)?))
}

fn key_fragments(key: &str) -> Result<Vec<&str>> {
    if key.len() != SIGNATURE_HEX_LEN {
        return Err(CoreError::InvalidKeyLength {
            expected: SIGNATURE_HEX_LEN,
            got: key.len(),
        });
    }
    Ok(chunk_substr(key, FRAGMENT_HEX_LEN))
}

fn chain_digits(normalized: &[i8]) -> Result<&[i8]> {
    normalized
        .get(..KEY_FRAGMENTS)
        .ok_or_else(|| CoreError::Encoding("hash too short to sign".into()))
}

/// Sign a base17 hash with a private key. Returns 2048 hex characters.
pub fn sign_hash(key: &str, hash: &str) -> Result<String> {
    let fragments = key_fragments(key)?;
    let normalized = normalized_hash(hash)?;
    let digits = chain_digits(&normalized)?;

    Ok(fragments
        .iter()
        .zip(digits)
        .map(|(fragment, &n)| chain_fragment(fragment, (DIGIT_BOUND - n) as usize))
        .collect())
}

/// Base64 form of a hex signature.
pub fn compress_signature(signature: &str) -> Result<String> {
    hex_to_base64(signature)
}

/// Accept a raw or base64-compressed signature and return it as 2048 hex.
pub fn decode_signature(ots: &str) -> std::result::Result<String, CheckError> {
    if ots.len() == SIGNATURE_HEX_LEN {
        if !is_hex(ots) {
            return Err(CheckError::SignatureMalformed);
        }
        return Ok(ots.to_string());
    }
    match base64_to_hex(ots) {
        Ok(decoded) if decoded.len() == SIGNATURE_HEX_LEN => Ok(decoded),
        _ => Err(CheckError::SignatureMalformed),
    }
}

fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Complete every chain in `signature` and derive the address it commits to.
pub fn recover_address(signature: &str, hash: &str) -> std::result::Result<String, CheckError> {
    if signature.len() != SIGNATURE_HEX_LEN || !is_hex(signature) {
        return Err(CheckError::SignatureMalformed);
    }
    let normalized = normalized_hash(hash).map_err(|_| CheckError::MolecularHashMismatch)?;
    let digits = chain_digits(&normalized).map_err(|_| CheckError::MolecularHashMismatch)?;

    let ends: Vec<String> = chunk_substr(signature, FRAGMENT_HEX_LEN)
        .into_iter()
        .zip(digits)
        .map(|(fragment, &n)| chain_fragment(fragment, (DIGIT_BOUND + n) as usize))
        .collect();
    Ok(address_from_chain_ends(&ends))
}

/// Verify a signature (raw or compressed) against an expected address.
pub fn verify_signature(
    ots: &str,
    hash: &str,
    address: &str,
) -> std::result::Result<(), CheckError> {
    let signature = decode_signature(ots)?;
    if recover_address(&signature, hash)? != address {
        return Err(CheckError::SignatureMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    const HASH: &str = "0123456789abcdefg0123456789abcdefg0123456789abcdefg0123456789ab";

    #[test]
    fn test_enumerate_table() {
        assert_eq!(enumerate("08g").unwrap(), vec![-8, 0, 8]);
        assert_eq!(enumerate("9a").unwrap(), vec![1, 2]);
        assert!(enumerate("h").is_err());
        assert!(enumerate("A").is_err());
    }

    #[test]
    fn test_normalize_raises_first_eligible() {
        // sum -2: the first two digits below 8 are raised.
        assert_eq!(normalize(vec![8, -1, -1, 0]), vec![8, 0, 0, 0]);
    }

    #[test]
    fn test_normalize_lowers_first_eligible() {
        // sum 3: -8 is already at the floor and is skipped.
        assert_eq!(normalize(vec![-8, 6, 5]), vec![-8, 4, 4]);
    }

    #[test]
    fn test_normalize_multiple_passes() {
        // sum -16 over two slots needs eight passes.
        assert_eq!(normalize(vec![-8, -8]), vec![0, 0]);
    }

    #[test]
    fn test_normalize_balanced_untouched() {
        assert_eq!(normalize(vec![-3, 3, 0]), vec![-3, 3, 0]);
    }

    #[test]
    fn test_normalized_hash_sums_to_zero() {
        let n = normalized_hash(HASH).unwrap();
        assert_eq!(n.iter().map(|&d| d as i32).sum::<i32>(), 0);
        assert!(n.iter().all(|d| (-8..=8).contains(d)));
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let wallet = Wallet::new(&"a1".repeat(1024), "USER", Some(&"0".repeat(64))).unwrap();
        let signature = sign_hash(wallet.key().unwrap(), HASH).unwrap();
        assert_eq!(signature.len(), SIGNATURE_HEX_LEN);
        assert_eq!(
            recover_address(&signature, HASH).unwrap(),
            wallet.address.clone().unwrap()
        );

        let compressed = compress_signature(&signature).unwrap();
        assert!(compressed.len() < SIGNATURE_HEX_LEN);
        verify_signature(&compressed, HASH, wallet.address.as_deref().unwrap()).unwrap();
    }

    #[test]
    fn test_wrong_hash_mismatches() {
        let wallet = Wallet::new(&"a1".repeat(1024), "USER", None).unwrap();
        let signature = sign_hash(wallet.key().unwrap(), HASH).unwrap();
        let other = HASH.replace('0', "1");
        assert_eq!(
            verify_signature(&signature, &other, wallet.address.as_deref().unwrap()),
            Err(CheckError::SignatureMismatch)
        );
    }

    #[test]
    fn test_malformed_signature() {
        assert_eq!(decode_signature("abcd"), Err(CheckError::SignatureMalformed));
        assert_eq!(decode_signature("!!!"), Err(CheckError::SignatureMalformed));
        assert_eq!(
            verify_signature(&"0".repeat(2047), HASH, "addr"),
            Err(CheckError::SignatureMalformed)
        );
    }

    #[test]
    fn test_non_hex_signature_is_malformed() {
        let ots = "z".repeat(SIGNATURE_HEX_LEN);
        assert_eq!(decode_signature(&ots), Err(CheckError::SignatureMalformed));
        assert_eq!(recover_address(&ots, HASH), Err(CheckError::SignatureMalformed));
        assert_eq!(
            verify_signature(&ots, HASH, "addr"),
            Err(CheckError::SignatureMalformed)
        );
    }

    #[test]
    fn test_sign_rejects_bad_key() {
        assert!(matches!(
            sign_hash("ab", HASH),
            Err(CoreError::InvalidKeyLength { .. })
        ));
    }
}
