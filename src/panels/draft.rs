use alloy_primitives::{Address, U256};

use crate::error::{DraftError, Result};
use crate::shared::address::parse_evm_address;
use crate::shared::units::parse_amount;

/// Recipient and amount as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionDraft {
    pub to_address: String,
    pub amount: String,
    pub to_address_error: bool,
    pub amount_error: bool,
}

impl TransactionDraft {
    pub fn new(to_address: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            to_address: to_address.into(),
            amount: amount.into(),
            ..Default::default()
        }
    }

    pub fn set_to_address(&mut self, value: impl Into<String>) {
        self.to_address = value.into();
        self.to_address_error = false;
    }

    pub fn set_amount(&mut self, value: impl Into<String>) {
        self.amount = value.into();
        self.amount_error = false;
    }

    pub fn is_empty(&self) -> bool {
        self.to_address.trim().is_empty() || self.amount.trim().is_empty()
    }

    /// Check both fields, flagging each bad one. The text is left as typed.
    pub fn validate(&mut self) -> Result<(Address, U256)> {
        let to = parse_evm_address(&self.to_address);
        let value = parse_amount(&self.amount);
        self.to_address_error = to.is_err();
        self.amount_error = value.is_err();
        match (to, value) {
            (Ok(to), Ok(value)) => Ok((to, value)),
            (Err(err), _) | (_, Err(err)) => {
                log::debug!(
                    "[Send] draft rejected: to_address_error={} amount_error={}",
                    self.to_address_error,
                    self.amount_error
                );
                Err(err.into())
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Field-level error for a draft, used when reporting validation results.
pub fn field_error(draft: &TransactionDraft) -> Option<DraftError> {
    if draft.to_address_error {
        Some(DraftError::InvalidAddress)
    } else if draft.amount_error {
        Some(DraftError::InvalidAmount)
    } else {
        None
    }
}
