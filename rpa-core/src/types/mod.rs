//! Domain types for the RPA protocol.

use serde::{Deserialize, Serialize};

use crate::constants::{
    CASHADDR_PREFIX_MAINNET, CASHADDR_PREFIX_TESTNET, PAYCODE_VERSION_MAINNET,
    PAYCODE_VERSION_TESTNET, RPA_PREFIX_MAINNET, RPA_PREFIX_TESTNET,
};

pub mod address;
pub mod paycode;
pub mod script;
pub mod transaction;

pub use address::Address;
pub use paycode::{Paycode, PrefixSize};
pub use transaction::{OutPoint, Transaction, TxInput, TxOutput};

/// Which chain a paycode or address belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    /// Bitcoin Cash mainnet.
    Mainnet,
    /// Bitcoin Cash testnet.
    Testnet,
}

impl Network {
    /// Paycode version byte for this network.
    pub fn paycode_version(self) -> u8 {
        match self {
            Network::Mainnet => PAYCODE_VERSION_MAINNET,
            Network::Testnet => PAYCODE_VERSION_TESTNET,
        }
    }

    /// Human-readable paycode token prefix.
    pub fn rpa_prefix(self) -> &'static str {
        match self {
            Network::Mainnet => RPA_PREFIX_MAINNET,
            Network::Testnet => RPA_PREFIX_TESTNET,
        }
    }

    /// Human-readable P2PKH address prefix.
    pub fn cashaddr_prefix(self) -> &'static str {
        match self {
            Network::Mainnet => CASHADDR_PREFIX_MAINNET,
            Network::Testnet => CASHADDR_PREFIX_TESTNET,
        }
    }
}

/// A matching transaction reference returned by the indexing server's
/// prefix-filtered history and mempool queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRef {
    /// Transaction id, display-order hex.
    pub tx_hash: String,
    /// Confirmation height; 0 for mempool transactions.
    pub height: u32,
}
