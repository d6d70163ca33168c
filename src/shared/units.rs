use alloy_primitives::utils::{format_ether, parse_ether};
use alloy_primitives::U256;

use crate::error::DraftError;

const ETHER_DECIMALS: usize = 18;
/// Balances are shown as their first seven characters.
pub const BALANCE_DISPLAY_CHARS: usize = 7;

/// Parse a user-entered ether amount into wei. Accepts plain nonnegative
/// decimals ("1", "1.5", ".25", "2.") with at most 18 fractional digits.
pub fn parse_amount(input: &str) -> Result<U256, DraftError> {
    let trimmed = input.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() && fraction.is_empty() {
        return Err(DraftError::InvalidAmount);
    }
    if !digits_only(whole) || !digits_only(fraction) || fraction.len() > ETHER_DECIMALS {
        return Err(DraftError::InvalidAmount);
    }

    let normalized = format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        if fraction.is_empty() { "0" } else { fraction }
    );
    parse_ether(&normalized).map_err(|_| DraftError::InvalidAmount)
}

/// Ether string without trailing fractional zeros: 1.5, 0.001, 2.
pub fn format_ether_trimmed(wei: U256) -> String {
    let formatted = format_ether(wei);
    if !formatted.contains('.') {
        return formatted;
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Text shown for a balance: "0" for zero, otherwise the formatted value cut
/// to [`BALANCE_DISPLAY_CHARS`]. The cut is cosmetic, not a rounding rule.
pub fn balance_display_text(wei: U256) -> String {
    if wei.is_zero() {
        return "0".to_string();
    }
    format_ether_trimmed(wei)
        .chars()
        .take(BALANCE_DISPLAY_CHARS)
        .collect()
}
