//! P2PKH addresses in cashaddr form.

use serde::{Deserialize, Serialize};

use crate::cashaddr;
use crate::constants::CASHADDR_TYPE_P2PKH;
use crate::error::{Result, RpaError};
use crate::hash::hash160;
use crate::types::{script, Network};

/// A pay-to-pubkey-hash destination.
///
/// Derived paycode destinations hash the *uncompressed* child public key;
/// ordinary wallet coins hash the compressed key. Either way this type only
/// sees the resulting 20-byte hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    /// Network the address is valid on.
    pub network: Network,
    /// HASH160 of the serialized public key.
    pub hash160: [u8; 20],
}

impl Address {
    /// Builds an address from any serialized public key (compressed or
    /// uncompressed).
    pub fn from_pubkey(network: Network, pubkey: &[u8]) -> Self {
        Self {
            network,
            hash160: hash160(pubkey),
        }
    }

    /// Cashaddr textual form (`bitcoincash:q...`).
    pub fn to_cashaddr(&self) -> String {
        cashaddr::encode(self.network.cashaddr_prefix(), CASHADDR_TYPE_P2PKH, &self.hash160)
    }

    /// Parses a cashaddr P2PKH token.
    pub fn from_cashaddr(token: &str) -> Result<Self> {
        let (prefix, tag, payload) = cashaddr::decode(token)?;
        let network = match prefix.as_str() {
            p if p == Network::Mainnet.cashaddr_prefix() => Network::Mainnet,
            p if p == Network::Testnet.cashaddr_prefix() => Network::Testnet,
            other => return Err(RpaError::Format(format!("unknown address prefix '{other}'"))),
        };
        if tag != CASHADDR_TYPE_P2PKH {
            return Err(RpaError::Format(format!("unknown address type tag {tag:#04x}")));
        }
        let hash: [u8; 20] = payload
            .try_into()
            .map_err(|_| RpaError::Format("address payload must be 20 bytes".into()))?;
        Ok(Self {
            network,
            hash160: hash,
        })
    }

    /// The P2PKH locking script paying this address.
    pub fn script_pubkey(&self) -> Vec<u8> {
        script::p2pkh_script(&self.hash160)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_cashaddr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cashaddr_round_trip() {
        let addr = Address {
            network: Network::Mainnet,
            hash160: [0x5a; 20],
        };
        let token = addr.to_cashaddr();
        assert!(token.starts_with("bitcoincash:"));
        assert_eq!(Address::from_cashaddr(&token).unwrap(), addr);
    }

    #[test]
    fn test_compressed_and_uncompressed_differ() {
        let compressed = [0x02u8; 33];
        let uncompressed = [0x04u8; 65];
        let a = Address::from_pubkey(Network::Mainnet, &compressed);
        let b = Address::from_pubkey(Network::Mainnet, &uncompressed);
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        let addr = Address {
            network: Network::Testnet,
            hash160: [1; 20],
        };
        let token = addr.to_cashaddr();
        assert!(Address::from_cashaddr(&token).is_ok());
        assert!(Address::from_cashaddr("somechain:qqqqqq").is_err());
    }

    #[test]
    fn test_script_pubkey_shape() {
        let addr = Address {
            network: Network::Mainnet,
            hash160: [9; 20],
        };
        let script = addr.script_pubkey();
        assert_eq!(script.len(), 25);
        assert_eq!(script[0], 0x76); // OP_DUP
        assert_eq!(script[24], 0xac); // OP_CHECKSIG
    }
}
