//! Reusable payment codes.
//!
//! A paycode bundles the receiver's scan and spend public keys with a
//! discoverability prefix size and an optional expiry, serialized as a
//! checksummed base32 token under the `paycode` / `paycodetest` prefix.

use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

use crate::cashaddr;
use crate::constants::{
    COMPRESSED_PUBKEY_SIZE, PAYCODE_EXPIRY_GRACE_SECS, PAYCODE_PAYLOAD_SIZE, PAYCODE_TYPE_TAG,
};
use crate::error::{Result, RpaError};
use crate::types::Network;

/// Discoverability prefix size in bits.
///
/// The sender grinds the first transaction input until the hex digest of
/// its serialization starts with this many bits of the receiver's scan
/// public key. Larger prefixes mean cheaper scanning for the receiver and
/// more grinding work for the sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PrefixSize {
    /// 4 bits, one hex digit.
    Bits4 = 0x04,
    /// 8 bits, two hex digits.
    Bits8 = 0x08,
    /// 12 bits, three hex digits.
    Bits12 = 0x0c,
    /// 16 bits, four hex digits.
    Bits16 = 0x10,
}

impl PrefixSize {
    /// Parses the on-wire prefix-size byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x04 => Ok(Self::Bits4),
            0x08 => Ok(Self::Bits8),
            0x0c => Ok(Self::Bits12),
            0x10 => Ok(Self::Bits16),
            other => Err(RpaError::UnsupportedPrefixSize(other)),
        }
    }

    /// On-wire byte value.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Number of hex digits covered by this prefix.
    pub fn hex_chars(self) -> usize {
        self.as_byte() as usize / 4
    }
}

impl Default for PrefixSize {
    fn default() -> Self {
        Self::Bits16
    }
}

/// A decoded paycode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Paycode {
    /// Network the paycode is valid on.
    pub network: Network,
    /// Discoverability prefix size.
    pub prefix_size: PrefixSize,
    /// Scan public key; its ECDH secret locates payments.
    pub scan_pubkey: PublicKey,
    /// Spend public key; child keys of it receive funds.
    pub spend_pubkey: PublicKey,
    /// Expiry as unix seconds, 0 for never.
    pub expiry: u32,
}

impl Paycode {
    /// A non-expiring paycode.
    pub fn new(
        network: Network,
        prefix_size: PrefixSize,
        scan_pubkey: PublicKey,
        spend_pubkey: PublicKey,
    ) -> Self {
        Self {
            network,
            prefix_size,
            scan_pubkey,
            spend_pubkey,
            expiry: 0,
        }
    }

    /// Sets the expiry timestamp (unix seconds).
    pub fn with_expiry(mut self, expiry: u32) -> Self {
        self.expiry = expiry;
        self
    }

    /// The 72-byte payload: version, prefix size, both compressed keys,
    /// big-endian expiry.
    pub fn payload(&self) -> [u8; PAYCODE_PAYLOAD_SIZE] {
        let mut out = [0u8; PAYCODE_PAYLOAD_SIZE];
        out[0] = self.network.paycode_version();
        out[1] = self.prefix_size.as_byte();
        out[2..2 + COMPRESSED_PUBKEY_SIZE].copy_from_slice(&self.scan_pubkey.serialize());
        out[35..35 + COMPRESSED_PUBKEY_SIZE].copy_from_slice(&self.spend_pubkey.serialize());
        out[68..].copy_from_slice(&self.expiry.to_be_bytes());
        out
    }

    /// Encodes the paycode as its textual token.
    pub fn encode(&self) -> String {
        cashaddr::encode(self.network.rpa_prefix(), PAYCODE_TYPE_TAG, &self.payload())
    }

    /// Decodes and validates a paycode token.
    pub fn decode(token: &str) -> Result<Self> {
        let (prefix, tag, payload) = cashaddr::decode(token)?;
        let network = match prefix.as_str() {
            p if p == Network::Mainnet.rpa_prefix() => Network::Mainnet,
            p if p == Network::Testnet.rpa_prefix() => Network::Testnet,
            other => return Err(RpaError::Format(format!("unknown paycode prefix '{other}'"))),
        };
        if tag != PAYCODE_TYPE_TAG {
            return Err(RpaError::Format(format!("unknown paycode type tag {tag:#04x}")));
        }
        if payload.len() != PAYCODE_PAYLOAD_SIZE {
            return Err(RpaError::Format(format!(
                "paycode payload must be {PAYCODE_PAYLOAD_SIZE} bytes, got {}",
                payload.len()
            )));
        }
        if payload[0] != network.paycode_version() {
            return Err(RpaError::Format(format!(
                "version byte {:#04x} does not match prefix '{prefix}'",
                payload[0]
            )));
        }
        let prefix_size = PrefixSize::from_byte(payload[1])?;
        let scan_pubkey = PublicKey::from_slice(&payload[2..35])
            .map_err(|e| RpaError::Format(format!("invalid scan pubkey: {e}")))?;
        let spend_pubkey = PublicKey::from_slice(&payload[35..68])
            .map_err(|e| RpaError::Format(format!("invalid spend pubkey: {e}")))?;
        let expiry = u32::from_be_bytes(payload[68..72].try_into().expect("4 bytes"));
        Ok(Self {
            network,
            prefix_size,
            scan_pubkey,
            spend_pubkey,
            expiry,
        })
    }

    /// The grinding target: leading hex digits of the scan public key's
    /// x coordinate, uppercase. Skips the 1-byte parity prefix of the
    /// compressed serialization.
    pub fn grind_prefix(&self) -> String {
        let hex = hex::encode(self.scan_pubkey.serialize());
        hex[2..2 + self.prefix_size.hex_chars()].to_uppercase()
    }

    /// Uppercase hex of payload plus 5-byte checksum, the string the
    /// grinder feeds into its per-nonce entropy hash.
    pub fn payload_with_checksum_hex(&self) -> String {
        let payload = self.payload();
        let checksum =
            cashaddr::checksum_bytes(self.network.rpa_prefix(), PAYCODE_TYPE_TAG, &payload);
        let mut bytes = payload.to_vec();
        bytes.extend_from_slice(&checksum);
        hex::encode_upper(bytes)
    }

    /// Whether the paycode has expired as of `now` (unix seconds).
    ///
    /// Senders refuse a paycode one week ahead of its stated expiry so a
    /// payment broadcast near the deadline is still scanned for.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiry != 0 && u64::from(self.expiry) < now + PAYCODE_EXPIRY_GRACE_SECS
    }
}

impl std::fmt::Display for Paycode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}
