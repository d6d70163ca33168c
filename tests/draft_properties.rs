use alloy_primitives::{Address, U256};
use proptest::prelude::*;

use magic_aa_wallet::panels::TransactionDraft;
use magic_aa_wallet::shared::address::parse_evm_address;
use magic_aa_wallet::shared::units::{
    balance_display_text, format_ether_trimmed, parse_amount, BALANCE_DISPLAY_CHARS,
};
use magic_aa_wallet::{DraftError, WalletError};

const RECIPIENT: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

fn wei_per_ether() -> U256 {
    U256::from(10u64).pow(U256::from(18))
}

proptest! {
    #[test]
    fn accepted_addresses_have_strict_shape(input in any::<String>()) {
        if parse_evm_address(&input).is_ok() {
            let trimmed = input.trim();
            prop_assert_eq!(trimmed.len(), 42);
            prop_assert!(trimmed.starts_with("0x"));
            prop_assert!(trimmed[2..].bytes().all(|b| b.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn lowercase_and_checksummed_forms_round_trip(bytes in any::<[u8; 20]>()) {
        let address = Address::from(bytes);
        prop_assert_eq!(parse_evm_address(&format!("0x{}", hex::encode(bytes))), Ok(address));
        prop_assert_eq!(parse_evm_address(&address.to_checksum(None)), Ok(address));
    }

    #[test]
    fn bad_recipient_always_flags_the_address(to in "[^0]{0,41}|0x[0-9a-f]{0,39}") {
        let mut draft = TransactionDraft::new(to, "1");
        let err = draft.validate().unwrap_err();
        prop_assert!(matches!(err, WalletError::Validation(DraftError::InvalidAddress)));
        prop_assert!(draft.to_address_error);
        prop_assert!(!draft.amount_error);
    }

    #[test]
    fn decimal_amounts_parse_exactly(whole in 0u64..1_000_000_000, fraction in "[0-9]{0,18}") {
        let padded = format!("{fraction:0<18}");
        let expected = U256::from(whole) * wei_per_ether()
            + padded.parse::<U256>().unwrap();
        prop_assert_eq!(parse_amount(&format!("{whole}.{fraction}")), Ok(expected));
    }

    #[test]
    fn excess_precision_is_rejected(whole in 0u64..1_000, fraction in "[0-9]{19,30}") {
        prop_assert_eq!(
            parse_amount(&format!("{whole}.{fraction}")),
            Err(DraftError::InvalidAmount)
        );
    }

    #[test]
    fn signs_and_exponents_are_rejected(
        mantissa in "[0-9]{1,6}",
        marker in prop::sample::select(vec!["-", "+", "e", "E"]),
    ) {
        let leading = format!("{marker}{mantissa}");
        let embedded = format!("{mantissa}{marker}3");
        prop_assert!(parse_amount(&leading).is_err());
        prop_assert!(parse_amount(&embedded).is_err());
    }

    #[test]
    fn any_amount_text_sets_only_the_amount_flag(amount in any::<String>()) {
        let mut draft = TransactionDraft::new(RECIPIENT, amount.clone());
        match draft.validate() {
            Ok((_, value)) => {
                prop_assert_eq!(Ok(value), parse_amount(&amount));
                prop_assert!(!draft.amount_error);
            }
            Err(_) => prop_assert!(draft.amount_error),
        }
        prop_assert!(!draft.to_address_error);
        prop_assert_eq!(draft.amount, amount);
    }

    #[test]
    fn balance_text_is_a_short_prefix(raw in any::<u128>()) {
        let wei = U256::from(raw);
        let shown = balance_display_text(wei);
        prop_assert!(shown.chars().count() <= BALANCE_DISPLAY_CHARS);
        if wei.is_zero() {
            prop_assert_eq!(shown, "0");
        } else {
            prop_assert!(format_ether_trimmed(wei).starts_with(&shown));
        }
    }
}
