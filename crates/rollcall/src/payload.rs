//! QR payload codec.
//!
//! A badge carries `student_id=<ID>|name=<NAME>`. Fields are separated by
//! [`FIELD_SEPARATOR`] and each field is split on the first
//! [`KEY_VALUE_SEPARATOR`], so values may contain `=` but never `|`.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};

/// Separator between `key=value` fields.
pub const FIELD_SEPARATOR: char = '|';

/// Separator between a key and its value.
pub const KEY_VALUE_SEPARATOR: char = '=';

/// Key carrying the student identifier.
pub const STUDENT_ID_KEY: &str = "student_id";

/// Key carrying the display name.
pub const NAME_KEY: &str = "name";

/// Keys printed on first-generation badges, still accepted when decoding.
const LEGACY_STUDENT_ID_KEY: &str = "ID";
const LEGACY_NAME_KEY: &str = "NAME";

/// The identity carried by a well-formed payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identity {
    /// Stable student identifier. Always a string; never coerced to a number.
    pub student_id: String,
    /// Display name. Informational only.
    pub name: String,
}

/// Result of decoding a scanned string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Both fields present and non-empty.
    Valid(Identity),
    /// Anything else: garbage, partial frames, unrelated QR codes.
    Invalid,
}

impl Decoded {
    /// Returns the identity if the payload was well-formed.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Valid(identity) => Some(identity),
            Self::Invalid => None,
        }
    }

    /// Check if the payload was well-formed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Encode an identity into the badge payload.
///
/// Values are trimmed before encoding.
///
/// # Errors
///
/// Returns [`Error::PayloadField`] if a value is empty after trimming or
/// contains the field separator or a line break, since such a value could not
/// be decoded back unambiguously.
pub fn encode(student_id: &str, name: &str) -> Result<String> {
    let student_id = check_field(STUDENT_ID_KEY, student_id)?;
    let name = check_field(NAME_KEY, name)?;
    Ok(format!(
        "{STUDENT_ID_KEY}{KEY_VALUE_SEPARATOR}{student_id}{FIELD_SEPARATOR}{NAME_KEY}{KEY_VALUE_SEPARATOR}{name}"
    ))
}

fn check_field<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    let reason = if trimmed.is_empty() {
        Some("value is empty")
    } else if trimmed.contains(FIELD_SEPARATOR) {
        Some("value contains the field separator '|'")
    } else if trimmed.contains(['\n', '\r']) {
        Some("value contains a line break")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::PayloadField {
            field,
            value: value.to_string(),
            reason,
        }),
        None => Ok(trimmed),
    }
}

/// Decode a scanned string.
///
/// Never fails: anything that is not a well-formed payload maps to
/// [`Decoded::Invalid`].
#[must_use]
pub fn decode(data: &str) -> Decoded {
    let mut fields = HashMap::new();
    for piece in data.split(FIELD_SEPARATOR) {
        let Some((key, value)) = piece.split_once(KEY_VALUE_SEPARATOR) else {
            return Decoded::Invalid;
        };
        fields.insert(key.trim(), value.trim());
    }

    let student_id = lookup(&fields, STUDENT_ID_KEY, LEGACY_STUDENT_ID_KEY);
    let name = lookup(&fields, NAME_KEY, LEGACY_NAME_KEY);

    match (student_id, name) {
        (Some(student_id), Some(name)) => Decoded::Valid(Identity {
            student_id: student_id.to_string(),
            name: name.to_string(),
        }),
        _ => Decoded::Invalid,
    }
}

fn lookup<'a>(fields: &HashMap<&str, &'a str>, key: &str, legacy: &str) -> Option<&'a str> {
    fields
        .get(key)
        .or_else(|| fields.get(legacy))
        .copied()
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(student_id: &str, name: &str) -> Decoded {
        Decoded::Valid(Identity {
            student_id: student_id.to_string(),
            name: name.to_string(),
        })
    }

    #[test]
    fn test_encode_format() {
        let payload = encode("101", "Arun Kumar").unwrap();
        assert_eq!(payload, "student_id=101|name=Arun Kumar");
    }

    #[test]
    fn test_decode_roundtrip() {
        let payload = encode("101", "Arun Kumar").unwrap();
        assert_eq!(decode(&payload), valid("101", "Arun Kumar"));

        let payload = encode("007", "Zoë O'Brien").unwrap();
        assert_eq!(decode(&payload), valid("007", "Zoë O'Brien"));
    }

    #[test]
    fn test_encode_trims_values() {
        let payload = encode("  42 ", " Mei Lin\t").unwrap();
        assert_eq!(payload, "student_id=42|name=Mei Lin");
    }

    #[test]
    fn test_encode_rejects_separator_in_name() {
        let err = encode("101", "Arun|Kumar").unwrap_err();
        assert!(matches!(err, Error::PayloadField { field: "name", .. }));
    }

    #[test]
    fn test_encode_rejects_empty_values() {
        assert!(matches!(
            encode("  ", "Arun").unwrap_err(),
            Error::PayloadField {
                field: "student_id",
                ..
            }
        ));
        assert!(encode("101", "").is_err());
    }

    #[test]
    fn test_encode_rejects_line_break() {
        assert!(encode("101", "Arun\nKumar").is_err());
    }

    #[test]
    fn test_decode_field_order_irrelevant() {
        assert_eq!(
            decode("name=Arun Kumar|student_id=101"),
            valid("101", "Arun Kumar")
        );
    }

    #[test]
    fn test_decode_value_may_contain_key_value_separator() {
        assert_eq!(decode("student_id=A=1|name=x=y"), valid("A=1", "x=y"));
    }

    #[test]
    fn test_decode_trims_whitespace() {
        assert_eq!(
            decode("student_id= 101 |name=  Arun Kumar "),
            valid("101", "Arun Kumar")
        );
    }

    #[test]
    fn test_decode_invalid_inputs() {
        for data in [
            "garbage",
            "ID=|NAME=",
            "NAME=OnlyName",
            "",
            "student_id=101",
            "student_id=101|name=",
            "student_id=101|name=Arun|trailing",
            "https://example.com/?a=b",
            "student_id=   |name=Arun",
        ] {
            assert_eq!(decode(data), Decoded::Invalid, "input: {data:?}");
        }
    }

    #[test]
    fn test_decode_legacy_keys() {
        assert_eq!(decode("ID=101|NAME=Arun Kumar"), valid("101", "Arun Kumar"));
    }

    #[test]
    fn test_decode_canonical_keys_win_over_legacy() {
        assert_eq!(
            decode("ID=1|NAME=Old|student_id=2|name=New"),
            valid("2", "New")
        );
    }

    #[test]
    fn test_decode_leading_zeros_preserved() {
        let decoded = decode("student_id=000123|name=Ana");
        assert_eq!(decoded.identity().unwrap().student_id, "000123");
    }

    #[test]
    fn test_decoded_helpers() {
        assert!(valid("1", "a").is_valid());
        assert!(!Decoded::Invalid.is_valid());
        assert!(Decoded::Invalid.identity().is_none());
    }
}
