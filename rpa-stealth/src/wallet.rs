//! Receiver-side key material.

use rand::Rng;
use secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroizing;

use rpa_core::error::Result;
use rpa_core::types::{Network, Paycode, PrefixSize};

use crate::discovery::PaymentScanner;

/// The scan and spend key pairs behind a paycode.
///
/// The scan key locates incoming payments and can be exported to a
/// semi-trusted watcher; the spend key alone controls the funds.
pub struct RpaWallet {
    secp: Secp256k1<All>,
    network: Network,
    scan_privkey: SecretKey,
    spend_privkey: SecretKey,
    scan_pubkey: PublicKey,
    spend_pubkey: PublicKey,
}

impl RpaWallet {
    /// Generates a fresh wallet from `rng`.
    pub fn generate<R: Rng + ?Sized>(network: Network, rng: &mut R) -> Self {
        let secp = Secp256k1::new();
        let scan_privkey = SecretKey::new(rng);
        let spend_privkey = SecretKey::new(rng);
        let scan_pubkey = PublicKey::from_secret_key(&secp, &scan_privkey);
        let spend_pubkey = PublicKey::from_secret_key(&secp, &spend_privkey);
        Self {
            secp,
            network,
            scan_privkey,
            spend_privkey,
            scan_pubkey,
            spend_pubkey,
        }
    }

    /// Restores a wallet from raw 32-byte secrets.
    pub fn from_secret_bytes(network: Network, scan: &[u8; 32], spend: &[u8; 32]) -> Result<Self> {
        let scan = Zeroizing::new(*scan);
        let spend = Zeroizing::new(*spend);
        let secp = Secp256k1::new();
        let scan_privkey = SecretKey::from_slice(&scan[..])?;
        let spend_privkey = SecretKey::from_slice(&spend[..])?;
        let scan_pubkey = PublicKey::from_secret_key(&secp, &scan_privkey);
        let spend_pubkey = PublicKey::from_secret_key(&secp, &spend_privkey);
        Ok(Self {
            secp,
            network,
            scan_privkey,
            spend_privkey,
            scan_pubkey,
            spend_pubkey,
        })
    }

    /// The wallet's network.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Scan public key, safe to publish.
    pub fn scan_pubkey(&self) -> &PublicKey {
        &self.scan_pubkey
    }

    /// Spend public key, safe to publish.
    pub fn spend_pubkey(&self) -> &PublicKey {
        &self.spend_pubkey
    }

    /// Issues a non-expiring paycode with the given prefix size.
    pub fn paycode(&self, prefix_size: PrefixSize) -> Paycode {
        Paycode::new(self.network, prefix_size, self.scan_pubkey, self.spend_pubkey)
    }

    /// Issues a paycode expiring at `expiry` (unix seconds).
    pub fn paycode_with_expiry(&self, prefix_size: PrefixSize, expiry: u32) -> Paycode {
        self.paycode(prefix_size).with_expiry(expiry)
    }

    /// The prefix the wallet subscribes to at the indexing server.
    pub fn grind_prefix(&self, prefix_size: PrefixSize) -> String {
        self.paycode(prefix_size).grind_prefix()
    }

    /// A scanner sharing this wallet's keys.
    pub fn scanner(&self) -> PaymentScanner {
        PaymentScanner::new(self.network, self.scan_privkey, self.spend_privkey)
    }
}

impl std::fmt::Debug for RpaWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print private key material
        f.debug_struct("RpaWallet")
            .field("network", &self.network)
            .field("scan_pubkey", &self.scan_pubkey)
            .field("spend_pubkey", &self.spend_pubkey)
            .finish_non_exhaustive()
    }
}

impl Drop for RpaWallet {
    fn drop(&mut self) {
        self.scan_privkey.non_secure_erase();
        self.spend_privkey.non_secure_erase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_generate_and_restore() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let wallet = RpaWallet::generate(Network::Mainnet, &mut rng);
        let restored = RpaWallet::from_secret_bytes(
            Network::Mainnet,
            &wallet.scan_privkey.secret_bytes(),
            &wallet.spend_privkey.secret_bytes(),
        )
        .unwrap();
        assert_eq!(wallet.scan_pubkey(), restored.scan_pubkey());
        assert_eq!(wallet.spend_pubkey(), restored.spend_pubkey());
    }

    #[test]
    fn test_paycode_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let wallet = RpaWallet::generate(Network::Mainnet, &mut rng);
        let code = wallet.paycode(PrefixSize::Bits8);
        let decoded = Paycode::decode(&code.encode()).unwrap();
        assert_eq!(decoded.scan_pubkey, *wallet.scan_pubkey());
        assert_eq!(decoded.spend_pubkey, *wallet.spend_pubkey());
    }

    #[test]
    fn test_grind_prefix_matches_paycode() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let wallet = RpaWallet::generate(Network::Testnet, &mut rng);
        assert_eq!(
            wallet.grind_prefix(PrefixSize::Bits16),
            wallet.paycode(PrefixSize::Bits16).grind_prefix()
        );
        assert_eq!(wallet.grind_prefix(PrefixSize::Bits4).len(), 1);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let wallet =
            RpaWallet::from_secret_bytes(Network::Mainnet, &[0x13; 32], &[0x31; 32]).unwrap();
        let dbg = format!("{wallet:?}");
        assert!(!dbg.contains(&hex::encode([0x13u8; 32])));
        assert!(!dbg.contains(&hex::encode([0x31u8; 32])));
    }
}
