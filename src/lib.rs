//! Passwordless wallet client with an ERC-4337 smart account.
//!
//! A user logs in through a hosted passwordless page, gets a session wallet,
//! and sends native transfers either directly from that wallet or as
//! sponsored user operations from a smart account it owns.

pub mod app;
pub mod auth;
pub mod chain;
pub mod config;
pub mod error;
pub mod network;
pub mod panels;
pub mod polling;
pub mod session;
pub mod shared;
pub mod smart_account;
pub mod status_center;

pub use error::{DraftError, Result, WalletError};
