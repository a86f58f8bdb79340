//! # RPA Crypto
//!
//! The cryptographic core of the paycode protocol:
//!
//! - **Shared secrets**: the ECDH-plus-outpoint construction both parties
//!   compute independently
//! - **Derivation**: single-step child key derivation turning a shared
//!   secret into a one-time payment address and its private key
//! - **Signing**: deterministic Schnorr signatures with caller-supplied
//!   auxiliary entropy, the knob the transaction grinder turns

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod derive;
pub mod schnorr;
pub mod secret;

pub use derive::{
    ckd_private_key, ckd_public_key, derive_payment_address, derive_payment_private_key,
    private_key_to_wif, wif_to_private_key,
};
pub use secret::shared_secret;
