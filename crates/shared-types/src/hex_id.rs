//! Hex encoding for 32-byte ids as they appear in peer requests and logs.

use thiserror::Error;

use crate::entities::Hash;

/// Errors from parsing a hex id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexIdError {
    #[error("id has {0} hex chars, expected 64")]
    WrongLength(usize),

    #[error("id is not valid hex: {0}")]
    InvalidHex(String),
}

/// Lowercase hex of a full id.
pub fn to_hex(id: &Hash) -> String {
    hex::encode(id)
}

/// First four bytes of an id in hex, for log fields.
pub fn short_hex(id: &Hash) -> String {
    hex::encode(&id[..4])
}

/// Parse a 64-char hex string into an id. Accepts an optional `0x` prefix.
pub fn hash_from_hex(input: &str) -> Result<Hash, HexIdError> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    if digits.len() != 64 {
        return Err(HexIdError::WrongLength(digits.len()));
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(digits, &mut out).map_err(|e| HexIdError::InvalidHex(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let id = [0xABu8; 32];
        assert_eq!(hash_from_hex(&to_hex(&id)), Ok(id));
        assert_eq!(hash_from_hex(&format!("0x{}", to_hex(&id))), Ok(id));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(hash_from_hex("abcd"), Err(HexIdError::WrongLength(4)));
        let not_hex = "zz".repeat(32);
        assert!(matches!(hash_from_hex(&not_hex), Err(HexIdError::InvalidHex(_))));
    }

    #[test]
    fn test_short_hex() {
        assert_eq!(short_hex(&[0x01u8; 32]), "01010101");
    }
}
