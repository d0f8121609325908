//! Shared protocol types: isotopes, meta entries, token units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// The platform identity token. Metadata, continuity and wallet atoms use it.
pub const USER_TOKEN: &str = "USER";

/// The authorization token issued by `U` atoms.
pub const AUTH_TOKEN: &str = "AUTH";

/// Operation kind carried by an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Isotope {
    /// Value transfer.
    V,
    /// Metadata write.
    M,
    /// Creation (token, wallet, identifier).
    C,
    /// ContinuID.
    I,
    /// Authorization.
    U,
    /// Token request.
    T,
    /// Rule.
    R,
}

impl Isotope {
    /// Every isotope, in validation order.
    pub const ALL: [Isotope; 7] = [
        Isotope::M,
        Isotope::T,
        Isotope::C,
        Isotope::U,
        Isotope::I,
        Isotope::R,
        Isotope::V,
    ];

    /// Single-character tag.
    pub fn as_char(self) -> char {
        match self {
            Isotope::V => 'V',
            Isotope::M => 'M',
            Isotope::C => 'C',
            Isotope::I => 'I',
            Isotope::U => 'U',
            Isotope::T => 'T',
            Isotope::R => 'R',
        }
    }

    /// Parse a single-character tag.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'V' => Some(Isotope::V),
            'M' => Some(Isotope::M),
            'C' => Some(Isotope::C),
            'I' => Some(Isotope::I),
            'U' => Some(Isotope::U),
            'T' => Some(Isotope::T),
            'R' => Some(Isotope::R),
            _ => None,
        }
    }
}

impl fmt::Display for Isotope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<String> for Isotope {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Isotope::from_char(c).ok_or_else(|| format!("unknown isotope {s}")),
            _ => Err(format!("isotope must be one character, got {s:?}")),
        }
    }
}

impl From<Isotope> for String {
    fn from(isotope: Isotope) -> Self {
        isotope.as_char().to_string()
    }
}

/// One meta entry. A `None` value is carried but never hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaItem {
    pub key: String,
    pub value: Option<String>,
}

impl MetaItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// An entry whose value is explicitly null.
    pub fn null(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// Build an ordered meta list from `(key, value)` pairs.
pub fn normalize_meta<K, V, I>(pairs: I) -> Vec<MetaItem>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| MetaItem::new(k, v))
        .collect()
}

/// Look up the first non-null value for `key`.
pub fn meta_value<'a>(meta: &'a [MetaItem], key: &str) -> Option<&'a str> {
    meta.iter()
        .filter(|m| m.key == key)
        .find_map(|m| m.value.as_deref())
}

/// A stackable token unit held by a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUnit {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub metas: Vec<String>,
}

impl TokenUnit {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            metas: Vec::new(),
        }
    }

    /// Wire form: `[id, name, ...metas]`.
    pub fn to_data(&self) -> Vec<String> {
        let mut out = vec![self.id.clone()];
        out.extend(self.name.clone());
        out.extend(self.metas.iter().cloned());
        out
    }
}

/// Current time in Unix milliseconds, as a decimal string.
pub fn now_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isotope_char_roundtrip() {
        for isotope in Isotope::ALL {
            assert_eq!(Isotope::from_char(isotope.as_char()), Some(isotope));
        }
        assert_eq!(Isotope::from_char('X'), None);
    }

    #[test]
    fn test_isotope_serializes_as_letter() {
        let json = serde_json::to_string(&Isotope::V).unwrap();
        assert_eq!(json, "\"V\"");
        let parsed: Isotope = serde_json::from_str("\"R\"").unwrap();
        assert_eq!(parsed, Isotope::R);
        assert!(serde_json::from_str::<Isotope>("\"VV\"").is_err());
    }

    #[test]
    fn test_meta_value_skips_null() {
        let meta = vec![MetaItem::null("a"), MetaItem::new("b", "2")];
        assert_eq!(meta_value(&meta, "a"), None);
        assert_eq!(meta_value(&meta, "b"), Some("2"));
        assert_eq!(meta_value(&meta, "c"), None);
    }

    #[test]
    fn test_normalize_meta_keeps_order() {
        let meta = normalize_meta([("z", "1"), ("a", "2")]);
        assert_eq!(meta[0].key, "z");
        assert_eq!(meta[1].key, "a");
    }

    #[test]
    fn test_token_unit_data() {
        let unit = TokenUnit::new("u1", "Gold");
        assert_eq!(unit.to_data(), vec!["u1".to_string(), "Gold".to_string()]);
    }
}
