//! Protocol constants for RPA.
//!
//! Values marked "wire" are fixed by the paycode format and the indexing
//! server protocol; changing them breaks compatibility with deployed
//! wallets.

// ═══════════════════════════════════════════════════════════════════════════════
// PAYCODE FORMAT (wire)
// ═══════════════════════════════════════════════════════════════════════════════

/// Paycode version byte on mainnet.
pub const PAYCODE_VERSION_MAINNET: u8 = 0x01;

/// Paycode version byte on testnet.
pub const PAYCODE_VERSION_TESTNET: u8 = 0x05;

/// Human-readable token prefix for mainnet paycodes.
pub const RPA_PREFIX_MAINNET: &str = "paycode";

/// Human-readable token prefix for testnet paycodes.
pub const RPA_PREFIX_TESTNET: &str = "paycodetest";

/// Cashaddr type-tag byte identifying a paycode payload.
pub const PAYCODE_TYPE_TAG: u8 = 0x08;

/// Size of a compressed secp256k1 public key.
pub const COMPRESSED_PUBKEY_SIZE: usize = 33;

/// Serialized paycode payload: version(1) + prefix_size(1) + scan(33) +
/// spend(33) + expiry(4).
pub const PAYCODE_PAYLOAD_SIZE: usize = 72;

/// Size of the appended 40-bit cashaddr checksum in bytes.
pub const CASHADDR_CHECKSUM_SIZE: usize = 5;

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESSES (wire)
// ═══════════════════════════════════════════════════════════════════════════════

/// Cashaddr prefix for mainnet P2PKH addresses.
pub const CASHADDR_PREFIX_MAINNET: &str = "bitcoincash";

/// Cashaddr prefix for testnet P2PKH addresses.
pub const CASHADDR_PREFIX_TESTNET: &str = "bchtest";

/// Cashaddr type-tag byte for P2PKH.
pub const CASHADDR_TYPE_P2PKH: u8 = 0x00;

/// WIF version byte prepended to exported private keys.
pub const WIF_VERSION: u8 = 0x80;

// ═══════════════════════════════════════════════════════════════════════════════
// DERIVATION & SIGNING (wire)
// ═══════════════════════════════════════════════════════════════════════════════

/// Child index used for all paycode key derivation. Non-hardened, fixed.
pub const DERIVATION_INDEX: u32 = 0;

/// Version string mixed into the grinding entropy preimage.
pub const GRINDING_VERSION: &str = "1";

/// SIGHASH_ALL | SIGHASH_FORKID, the only hash type the builder emits.
pub const SIGHASH_ALL_FORKID: u32 = 0x41;

/// A paycode with a nonzero expiry is rejected unless it remains valid for
/// at least this long (seconds), so an accepted payment has time to confirm.
pub const PAYCODE_EXPIRY_GRACE_SECS: u64 = 604_800; // 7 days

// ═══════════════════════════════════════════════════════════════════════════════
// GRINDING
// ═══════════════════════════════════════════════════════════════════════════════

/// Progress callback cadence: one notification per this many iterations.
pub const GRIND_PROGRESS_INTERVAL: u64 = 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// SCAN PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum number of blocks requested per history chunk.
pub const SCAN_CHUNK_BLOCKS: u32 = 50;

/// How far behind the server tip a fresh wallet starts scanning.
pub const SCAN_LOOKBACK_BLOCKS: u32 = 100;

/// Default lifetime of an unanswered block-range request before the same
/// start height may be requested again.
pub const PENDING_REQUEST_TTL_SECS: u64 = 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paycode_payload_size_adds_up() {
        assert_eq!(
            PAYCODE_PAYLOAD_SIZE,
            1 + 1 + COMPRESSED_PUBKEY_SIZE + COMPRESSED_PUBKEY_SIZE + 4
        );
    }

    #[test]
    fn network_tags_are_distinct() {
        assert_ne!(PAYCODE_VERSION_MAINNET, PAYCODE_VERSION_TESTNET);
        assert_ne!(RPA_PREFIX_MAINNET, RPA_PREFIX_TESTNET);
        assert_ne!(PAYCODE_TYPE_TAG, CASHADDR_TYPE_P2PKH);
    }
}
