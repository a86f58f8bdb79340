//! Error types for the RPA crates.
//!
//! One `thiserror` hierarchy shared by every crate in the workspace, with a
//! `Result` alias and a couple of classification helpers.

use thiserror::Error;

/// Result type alias using [`RpaError`].
pub type Result<T> = std::result::Result<T, RpaError>;

/// Main error type for all RPA operations.
#[derive(Debug, Error)]
pub enum RpaError {
    // ═══════════════════════════════════════════════════════════════════════════
    // PAYCODE / FORMAT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Malformed paycode token, address, or payload. Always fatal to the
    /// calling operation, never retried.
    #[error("format error: {0}")]
    Format(String),

    /// Token checksum did not verify.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Paycode prefix-size field outside {4, 8, 12, 16} bits.
    #[error("unsupported prefix size byte {0:#04x} (must encode 4, 8, 12 or 16 bits)")]
    UnsupportedPrefixSize(u8),

    /// The paycode's validity window has passed (or will pass before a
    /// payment could confirm).
    #[error("paycode expired")]
    PaycodeExpired,

    // ═══════════════════════════════════════════════════════════════════════════
    // PAYMENT BUILD ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Coin selection could not fund the requested outputs.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Grinding was cancelled by the caller before a match was found. No
    /// transaction is returned.
    #[error("grinding cancelled")]
    Cancelled,

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSACTION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Malformed or truncated raw transaction.
    #[error("transaction error: {0}")]
    Transaction(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Error bubbled up from the curve library.
    #[error("secp256k1 error: {0}")]
    Secp(#[from] secp256k1::Error),

    /// Derived scalar or other crypto-level failure outside the curve
    /// library's own error type.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Invalid hex encoding.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    // ═══════════════════════════════════════════════════════════════════════════
    // COLLABORATOR ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Keystore import/export failure.
    #[error("keystore error: {0}")]
    Keystore(String),

    /// Cursor persistence failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Transport-level failure reported by a collaborator. The core never
    /// retries these; the scan pipeline simply leaves its cursor
    /// un-advanced.
    #[error("network error: {0}")]
    Network(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RpaError {
    /// True if the operation may succeed when simply re-driven (the scan
    /// pipeline relies on its next tick for these).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RpaError::Network(_))
    }

    /// True for malformed-input errors that must never be retried.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            RpaError::Format(_)
                | RpaError::ChecksumMismatch
                | RpaError::UnsupportedPrefixSize(_)
                | RpaError::Hex(_)
        )
    }
}
