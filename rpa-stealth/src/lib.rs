//! # RPA Stealth
//!
//! The two sides of a paycode payment:
//!
//! - **Wallet**: the receiver's scan/spend key pairs and paycode issuance
//! - **Payment**: the sender's flow, building and grinding a transaction
//!   until it carries the paycode's discoverability prefix
//! - **Discovery**: the receiver's flow, recovering payment keys from
//!   candidate transactions

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod discovery;
pub mod payment;
pub mod wallet;

pub use discovery::PaymentScanner;
pub use payment::{BuiltPayment, CancelToken, PaymentBuilder};
pub use wallet::RpaWallet;
