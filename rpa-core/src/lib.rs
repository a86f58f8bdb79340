//! # RPA Core
//!
//! Core types, errors, and traits for the RPA (Reusable Payment Address)
//! paycode protocol.
//!
//! This crate provides the foundational building blocks used by all other
//! RPA crates:
//!
//! - **Types**: paycodes, addresses, scripts, and the transaction model
//! - **Codec**: the cashaddr-style base32 encoding shared by paycodes and
//!   P2PKH addresses
//! - **Errors**: the protocol-wide error hierarchy
//! - **Traits**: collaborator interfaces (coin selection, keystore, cursor
//!   persistence, indexing server)

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod cashaddr;
pub mod constants;
pub mod error;
pub mod hash;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, RpaError};
pub use traits::*;
pub use types::*;
