use alloy_primitives::Address;

use crate::error::DraftError;

/// Abbreviate a hex address as 0x1234...abcd for compact UI display.
pub fn abbreviate_address(addr: &str) -> String {
    let count = addr.chars().count();
    if count <= 10 {
        return addr.to_string();
    }
    let head: String = addr.chars().take(6).collect();
    let tail: String = addr.chars().skip(count - 4).collect();
    format!("{head}...{tail}")
}

/// Parse a strict 20-byte EVM address in 0x-prefixed hex format.
/// Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_evm_address(value: &str) -> Result<Address, DraftError> {
    let trimmed = value.trim();
    if trimmed.len() != 42 || !trimmed.starts_with("0x") {
        return Err(DraftError::InvalidAddress);
    }
    let digits = &trimmed[2..];
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DraftError::InvalidAddress);
    }

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(trimmed, None).map_err(|_| DraftError::InvalidAddress);
    }
    trimmed
        .parse::<Address>()
        .map_err(|_| DraftError::InvalidAddress)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid(value: &str) -> bool {
        parse_evm_address(value).is_ok()
    }

    #[test]
    fn accepts_lowercase_uppercase_and_checksummed() {
        assert!(is_valid("0xd8da6bf26964af9d7eed9e03e53415d37aa96045"));
        assert!(is_valid("0xD8DA6BF26964AF9D7EED9E03E53415D37AA96045"));
        assert!(is_valid("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"));
        assert!(is_valid("  0xd8da6bf26964af9d7eed9e03e53415d37aa96045 "));
    }

    #[test]
    fn rejects_bad_shapes_and_checksums() {
        for bad in [
            "",
            "not-an-address",
            "0x",
            "d8da6bf26964af9d7eed9e03e53415d37aa96045",
            "0xd8da6bf26964af9d7eed9e03e53415d37aa9604",
            "0xd8da6bf26964af9d7eed9e03e53415d37aa960455",
            "0xz8da6bf26964af9d7eed9e03e53415d37aa96045",
            "0xD8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
        ] {
            assert!(!is_valid(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn abbreviates_long_addresses_only() {
        assert_eq!(
            abbreviate_address("0xd8da6bf26964af9d7eed9e03e53415d37aa96045"),
            "0xd8da...6045"
        );
        assert_eq!(abbreviate_address("0x1234"), "0x1234");
        assert_eq!(abbreviate_address("0xé1234567890ü"), "0xé123...890ü");
    }
}
