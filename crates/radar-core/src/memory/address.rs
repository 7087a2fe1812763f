//! Hex address parsing and formatting utilities.

use crate::error::{Error, Result};

/// Parse a hex address string (with or without 0x prefix).
///
/// An empty string parses as address 0 (unset).
pub fn parse_hex_address(s: &str) -> Result<u64> {
    let s = s.trim();
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|e| Error::InvalidAddress(format!("{}: {}", s, e)))
}

/// Format an address as a hex string with 0x prefix.
pub fn format_hex_address(addr: u64) -> String {
    format!("0x{:X}", addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_address_with_prefix() {
        assert_eq!(parse_hex_address("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_hex_address("0X1000").unwrap(), 0x1000);
    }

    #[test]
    fn test_parse_hex_address_without_prefix() {
        assert_eq!(parse_hex_address("DEADBEEF").unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn test_parse_hex_address_unset() {
        assert_eq!(parse_hex_address("").unwrap(), 0);
        assert_eq!(parse_hex_address("0x00000000").unwrap(), 0);
    }

    #[test]
    fn test_parse_hex_address_invalid() {
        assert!(matches!(
            parse_hex_address("0xZZZ"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_format_hex_address() {
        assert_eq!(format_hex_address(0x1431B08A0), "0x1431B08A0");
        assert_eq!(format_hex_address(0), "0x0");
    }
}
