//! Encoding utilities: charset base conversion, Base58(+check), base64 and
//! random strings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use num_bigint::BigUint;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Lowercase hexadecimal symbols.
pub const HEX_SYMBOLS: &str = "0123456789abcdef";

/// Base17 symbols used by the canonical molecular hash.
pub const BASE17_SYMBOLS: &str = "0123456789abcdefg";

/// Default symbol table for [`charset_base_convert`].
pub const BASE_SYMBOLS: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ~`!@#$%^&*()-_=+[{]}\\|;:'\",<.>/?";

/// Alphanumeric alphabet for [`random_string`].
pub const ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Convert `src` between arbitrary bases using explicit symbol tables.
///
/// `dest_symbols` defaults to `src_symbols`, which defaults to [`BASE_SYMBOLS`].
/// No padding is applied; zero converts to the first destination symbol.
pub fn charset_base_convert(
    src: &str,
    from_base: u32,
    to_base: u32,
    src_symbols: Option<&str>,
    dest_symbols: Option<&str>,
) -> Result<String> {
    let src_table: Vec<char> = src_symbols.unwrap_or(BASE_SYMBOLS).chars().collect();
    let dest_table: Vec<char> = dest_symbols
        .map(|s| s.chars().collect())
        .unwrap_or_else(|| src_table.clone());

    if !(2..=256).contains(&from_base) || !(2..=256).contains(&to_base) {
        return Err(CoreError::Encoding(format!(
            "unsupported bases {from_base} -> {to_base}"
        )));
    }
    if from_base as usize > src_table.len() || to_base as usize > dest_table.len() {
        return Err(CoreError::Encoding("symbol table shorter than base".into()));
    }

    let mut digits = Vec::with_capacity(src.len());
    for c in src.chars() {
        let digit = src_table[..from_base as usize]
            .iter()
            .position(|&s| s == c)
            .ok_or_else(|| CoreError::Encoding(format!("symbol {c:?} not in base {from_base}")))?;
        digits.push(digit as u8);
    }
    if digits.is_empty() {
        return Err(CoreError::Encoding("empty input".into()));
    }

    let value = BigUint::from_radix_be(&digits, from_base)
        .ok_or_else(|| CoreError::Encoding("invalid digits".into()))?;

    Ok(value
        .to_radix_be(to_base)
        .into_iter()
        .map(|d| dest_table[d as usize])
        .collect())
}

/// Generate a random string of `length` symbols drawn from `alphabet`.
pub fn random_string(length: usize, alphabet: &str) -> String {
    let symbols: Vec<char> = alphabet.chars().collect();
    if symbols.is_empty() {
        return String::new();
    }
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| symbols[rng.gen_range(0..symbols.len())])
        .collect()
}

/// Random lowercase hex string of `length` characters.
pub fn random_hex(length: usize) -> String {
    random_string(length, HEX_SYMBOLS)
}

/// Split `s` into consecutive chunks of at most `size` characters.
pub fn chunk_substr(s: &str, size: usize) -> Vec<&str> {
    if size == 0 {
        return vec![s];
    }
    let mut chunks = Vec::with_capacity(s.len().div_ceil(size));
    let mut start = 0;
    for (count, (offset, _)) in s.char_indices().enumerate() {
        if count > 0 && count % size == 0 {
            chunks.push(&s[start..offset]);
            start = offset;
        }
    }
    if start < s.len() {
        chunks.push(&s[start..]);
    }
    chunks
}

/// Re-encode a hex string as standard base64.
pub fn hex_to_base64(hex_str: &str) -> Result<String> {
    let bytes = hex::decode(hex_str).map_err(|e| CoreError::InvalidHex(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

/// Decode standard base64 into a lowercase hex string.
pub fn base64_to_hex(b64: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(b64)
        .map_err(|e| CoreError::Encoding(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Base58 alphabets understood by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Base58Alphabet {
    Gmp,
    Bitcoin,
    Flickr,
    Ripple,
    Ipfs,
}

impl Base58Alphabet {
    /// The 58 symbols of this alphabet.
    pub fn symbols(self) -> &'static str {
        match self {
            Base58Alphabet::Gmp => "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuv",
            Base58Alphabet::Bitcoin | Base58Alphabet::Ipfs => {
                "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz"
            }
            Base58Alphabet::Flickr => "123456789abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ",
            Base58Alphabet::Ripple => "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz",
        }
    }
}

/// Base58 codec over a chosen alphabet. Leading zero bytes map to the
/// alphabet's first symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base58 {
    alphabet: Base58Alphabet,
}

impl Base58 {
    pub fn new(alphabet: Base58Alphabet) -> Self {
        Self { alphabet }
    }

    pub fn encode(&self, data: &[u8]) -> String {
        let symbols: Vec<char> = self.alphabet.symbols().chars().collect();
        let zeros = data.iter().take_while(|&&b| b == 0).count();
        let mut out: String = std::iter::repeat(symbols[0]).take(zeros).collect();
        if zeros < data.len() {
            let value = BigUint::from_bytes_be(&data[zeros..]);
            out.extend(value.to_radix_be(58).into_iter().map(|d| symbols[d as usize]));
        }
        out
    }

    pub fn decode(&self, encoded: &str) -> Result<Vec<u8>> {
        let symbols: Vec<char> = self.alphabet.symbols().chars().collect();
        let mut digits = Vec::with_capacity(encoded.len());
        for c in encoded.chars() {
            let d = symbols
                .iter()
                .position(|&s| s == c)
                .ok_or_else(|| CoreError::Encoding(format!("invalid base58 symbol {c:?}")))?;
            digits.push(d as u8);
        }

        let zeros = digits.iter().take_while(|&&d| d == 0).count();
        let mut out = vec![0u8; zeros];
        if zeros < digits.len() {
            let value = BigUint::from_radix_be(&digits[zeros..], 58)
                .ok_or_else(|| CoreError::Encoding("invalid base58 digits".into()))?;
            out.extend(value.to_bytes_be());
        }
        Ok(out)
    }

    /// Encode with a 4-byte double-SHA256 checksum appended.
    pub fn encode_check(&self, data: &[u8]) -> String {
        let mut buf = data.to_vec();
        buf.extend_from_slice(&checksum(data));
        self.encode(&buf)
    }

    /// Decode and verify the 4-byte checksum.
    pub fn decode_check(&self, encoded: &str) -> Result<Vec<u8>> {
        let mut buf = self.decode(encoded)?;
        if buf.len() < 4 {
            return Err(CoreError::Encoding("base58check payload too short".into()));
        }
        let payload_len = buf.len() - 4;
        if checksum(&buf[..payload_len]) != buf[payload_len..] {
            return Err(CoreError::Encoding("base58check checksum mismatch".into()));
        }
        buf.truncate(payload_len);
        Ok(buf)
    }
}

fn checksum(data: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Character-set selector a wallet uses to encode its public keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Characters {
    #[default]
    Base64,
    Base58(Base58Alphabet),
}

impl Characters {
    pub fn encode(&self, data: &[u8]) -> String {
        match self {
            Characters::Base64 => STANDARD.encode(data),
            Characters::Base58(alphabet) => Base58::new(*alphabet).encode(data),
        }
    }

    pub fn decode(&self, encoded: &str) -> Result<Vec<u8>> {
        match self {
            Characters::Base64 => STANDARD
                .decode(encoded)
                .map_err(|e| CoreError::Encoding(e.to_string())),
            Characters::Base58(alphabet) => Base58::new(*alphabet).decode(encoded),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Characters::Base64 => "BASE64",
            Characters::Base58(Base58Alphabet::Gmp) => "GMP",
            Characters::Base58(Base58Alphabet::Bitcoin) => "BITCOIN",
            Characters::Base58(Base58Alphabet::Flickr) => "FLICKR",
            Characters::Base58(Base58Alphabet::Ripple) => "RIPPLE",
            Characters::Base58(Base58Alphabet::Ipfs) => "IPFS",
        }
    }
}

impl fmt::Display for Characters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Characters {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BASE64" => Ok(Characters::Base64),
            "GMP" => Ok(Characters::Base58(Base58Alphabet::Gmp)),
            "BITCOIN" => Ok(Characters::Base58(Base58Alphabet::Bitcoin)),
            "FLICKR" => Ok(Characters::Base58(Base58Alphabet::Flickr)),
            "RIPPLE" => Ok(Characters::Base58(Base58Alphabet::Ripple)),
            "IPFS" => Ok(Characters::Base58(Base58Alphabet::Ipfs)),
            other => Err(CoreError::Encoding(format!("unknown character set {other}"))),
        }
    }
}

impl TryFrom<String> for Characters {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Characters> for String {
    fn from(c: Characters) -> Self {
        c.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hex_to_base17() {
        let out =
            charset_base_convert("ff", 16, 17, Some(HEX_SYMBOLS), Some(BASE17_SYMBOLS)).unwrap();
        // 255 = 15 * 17 + 0
        assert_eq!(out, "f0");
    }

    #[test]
    fn test_zero_converts_to_single_symbol() {
        let out = charset_base_convert("000", 16, 17, Some(HEX_SYMBOLS), Some(BASE17_SYMBOLS))
            .unwrap();
        assert_eq!(out, "0");
    }

    #[test]
    fn test_unknown_symbol_rejected() {
        assert!(charset_base_convert("xyz", 16, 10, Some(HEX_SYMBOLS), None).is_err());
    }

    #[test]
    fn test_decimal_to_hex_default_table() {
        assert_eq!(charset_base_convert("255", 10, 16, None, None).unwrap(), "ff");
    }

    #[test]
    fn test_alphabets_have_58_unique_symbols() {
        for alphabet in [
            Base58Alphabet::Gmp,
            Base58Alphabet::Bitcoin,
            Base58Alphabet::Flickr,
            Base58Alphabet::Ripple,
            Base58Alphabet::Ipfs,
        ] {
            let symbols: std::collections::HashSet<char> = alphabet.symbols().chars().collect();
            assert_eq!(symbols.len(), 58, "{alphabet:?}");
        }
    }

    #[test]
    fn test_base58_bitcoin_known_value() {
        let b58 = Base58::new(Base58Alphabet::Bitcoin);
        assert_eq!(b58.encode(b"hello world"), "StV1DL6CwTryKyV");
        assert_eq!(b58.encode(&[0, 0, 1]), "112");
        assert_eq!(b58.decode("112").unwrap(), vec![0, 0, 1]);
    }

    #[test]
    fn test_base58_check_detects_corruption() {
        let b58 = Base58::new(Base58Alphabet::Bitcoin);
        let encoded = b58.encode_check(b"payload");
        assert_eq!(b58.decode_check(&encoded).unwrap(), b"payload");

        let mut corrupted: Vec<char> = encoded.chars().collect();
        corrupted[0] = if corrupted[0] == '2' { '3' } else { '2' };
        let corrupted: String = corrupted.into_iter().collect();
        assert!(b58.decode_check(&corrupted).is_err());
    }

    #[test]
    fn test_random_string_alphabet() {
        let s = random_hex(64);
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| HEX_SYMBOLS.contains(c)));
        assert_ne!(random_hex(64), s);
    }

    #[test]
    fn test_chunk_substr() {
        assert_eq!(chunk_substr("abcdefg", 3), vec!["abc", "def", "g"]);
        assert!(chunk_substr("", 3).is_empty());
        assert_eq!(chunk_substr("h\u{e9}llo\u{2713}", 2), vec!["h\u{e9}", "ll", "o\u{2713}"]);
        assert_eq!(chunk_substr("\u{e9}\u{e9}\u{e9}", 1).concat(), "\u{e9}\u{e9}\u{e9}");
    }

    #[test]
    fn test_base64_hex_roundtrip() {
        let b64 = hex_to_base64("deadbeef").unwrap();
        assert_eq!(b64, "3q2+7w==");
        assert_eq!(base64_to_hex(&b64).unwrap(), "deadbeef");
    }

    #[test]
    fn test_characters_parse_and_display() {
        let c: Characters = "bitcoin".parse().unwrap();
        assert_eq!(c, Characters::Base58(Base58Alphabet::Bitcoin));
        assert_eq!(c.to_string(), "BITCOIN");
        assert!("EBCDIC".parse::<Characters>().is_err());
        assert_eq!(Characters::default(), Characters::Base64);
    }

    proptest! {
        #[test]
        fn test_base58_check_preserves_bytes(
            data in prop::collection::vec(any::<u8>(), 0..64),
            alphabet in prop::sample::select(vec![
                Base58Alphabet::Gmp,
                Base58Alphabet::Bitcoin,
                Base58Alphabet::Flickr,
                Base58Alphabet::Ripple,
                Base58Alphabet::Ipfs,
            ]),
        ) {
            let codec = Base58::new(alphabet);
            prop_assert_eq!(codec.decode_check(&codec.encode_check(&data)).unwrap(), data);
        }

        #[test]
        fn test_base17_digits_only(hex in "[1-9a-f][0-9a-f]{0,63}") {
            let b17 = charset_base_convert(&hex, 16, 17, Some(HEX_SYMBOLS), Some(BASE17_SYMBOLS))
                .unwrap();
            prop_assert!(b17.chars().all(|c| BASE17_SYMBOLS.contains(c)));
            let back = charset_base_convert(&b17, 17, 16, Some(BASE17_SYMBOLS), Some(HEX_SYMBOLS))
                .unwrap();
            prop_assert_eq!(back, hex);
        }
    }
}
