// ── MacAddress ──
//
// Canonical form is six uppercase hex pairs joined by colons
// (`AA:BB:CC:DD:EE:FF`). Equality and hashing go through the canonical
// string, so `aa-bb-cc-dd-ee-ff` and `AABB.CCDD.EEFF` are the same device.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const HEX_DIGITS: usize = 12;

/// Why a raw string is not a MAC address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacParseError {
    /// Wrong number of characters once separators are stripped.
    #[error("MAC address must have 12 hex digits, found {found}")]
    WrongLength { found: usize },

    /// Right length, but some characters are not hex digits.
    #[error("MAC address contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },
}

/// A validated, canonical 48-bit MAC address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Parse any common notation: colons, dashes, dots, spaces or bare hex,
    /// in either case.
    pub fn parse(raw: &str) -> Result<Self, MacParseError> {
        let stripped: Vec<char> = raw.chars().filter(|c| c.is_alphanumeric()).collect();

        if stripped.len() != HEX_DIGITS {
            return Err(MacParseError::WrongLength {
                found: stripped.len(),
            });
        }

        let invalid: BTreeSet<char> = stripped
            .iter()
            .copied()
            .filter(|c| !c.is_ascii_hexdigit())
            .collect();
        if !invalid.is_empty() {
            return Err(MacParseError::InvalidCharacters {
                chars: invalid.into_iter().collect(),
            });
        }

        let mut canonical = String::with_capacity(17);
        for (i, pair) in stripped.chunks(2).enumerate() {
            if i > 0 {
                canonical.push(':');
            }
            canonical.extend(pair.iter().map(char::to_ascii_uppercase));
        }
        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = MacParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

impl AsRef<str> for MacAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn canonicalizes_common_notations() {
        for raw in [
            "aa:bb:cc:dd:ee:ff",
            "AA-BB-CC-DD-EE-FF",
            "aabb.ccdd.eeff",
            "AaBbCcDdEeFf",
            " aa bb cc dd ee ff ",
        ] {
            assert_eq!(
                MacAddress::parse(raw).unwrap().as_str(),
                "AA:BB:CC:DD:EE:FF",
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn reparsing_canonical_output_is_stable() {
        let mac = MacAddress::parse("0a-1b-2c-3d-4e-5f").unwrap();
        let again = MacAddress::parse(mac.as_str()).unwrap();
        assert_eq!(mac, again);
        assert_eq!(again.to_string(), "0A:1B:2C:3D:4E:5F");
    }

    #[test]
    fn wrong_length_reports_digit_count() {
        assert_eq!(
            MacAddress::parse("aa:bb:cc:dd:ee"),
            Err(MacParseError::WrongLength { found: 10 })
        );
        assert_eq!(
            MacAddress::parse("aa:bb:cc:dd:ee:ff:00"),
            Err(MacParseError::WrongLength { found: 14 })
        );
        assert_eq!(
            MacAddress::parse(""),
            Err(MacParseError::WrongLength { found: 0 })
        );
    }

    #[test]
    fn invalid_characters_are_named() {
        let err = MacAddress::parse("ZZ:BB:CC:DD:EE:GG").unwrap_err();
        match err {
            MacParseError::InvalidCharacters { chars } => {
                assert!(chars.contains('Z'));
                assert!(chars.contains('G'));
                assert!(!chars.contains('B'));
            }
            other @ MacParseError::WrongLength { .. } => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn each_invalid_character_is_named_once() {
        assert_eq!(
            MacAddress::parse("ZZ:BB:CC:DD:EE:ZG"),
            Err(MacParseError::InvalidCharacters { chars: "GZ".into() })
        );
    }

    #[test]
    fn equal_after_canonicalization_hash_identically() {
        let mut set = HashSet::new();
        set.insert(MacAddress::parse("aa:bb:cc:dd:ee:ff").unwrap());
        set.insert(MacAddress::parse("AA-BB-CC-DD-EE-FF").unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn serde_goes_through_parse() {
        let mac: MacAddress = serde_json::from_str("\"aa-bb-cc-dd-ee-ff\"").unwrap();
        assert_eq!(mac.as_str(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(serde_json::to_string(&mac).unwrap(), "\"AA:BB:CC:DD:EE:FF\"");
        assert!(serde_json::from_str::<MacAddress>("\"nope\"").is_err());
    }
}
