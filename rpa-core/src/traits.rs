//! Seams between the protocol logic and its host wallet.
//!
//! The payment builder and scan pipeline are written against these traits
//! so the cryptographic code never touches coin selection, key storage,
//! persistence, or the network directly.

use secp256k1::{PublicKey, SecretKey};

use crate::error::Result;
use crate::types::transaction::{Transaction, TxOutput};
use crate::types::Address;

/// Builds unsigned transactions from the host wallet's coins.
pub trait TransactionConstructor {
    /// Returns an unsigned transaction funding `outputs` plus `fee`.
    ///
    /// Each selected input must carry its spent value and owning public
    /// key so the caller can sign it. When `domain` is given, only coins
    /// on those addresses may be selected.
    fn make_unsigned(
        &self,
        outputs: &[TxOutput],
        fee: u64,
        domain: Option<&[Address]>,
    ) -> Result<Transaction>;
}

/// Looks up private keys for coins the wallet owns.
pub trait KeySource {
    /// The private key whose public key is `pubkey`, if held.
    fn private_key_for(&self, pubkey: &PublicKey) -> Option<SecretKey>;
}

/// Receives private keys recovered by the scanner.
pub trait Keystore {
    /// Imports a WIF key, returning `true` if it was new and `false` if
    /// already present. Must be idempotent.
    fn import_private_key(&self, wif: &str) -> Result<bool>;
}

/// Persists the scan cursor across restarts.
pub trait CursorStore {
    /// Height of the next block to scan, if one has been recorded.
    fn rpa_height(&self) -> Option<u32>;

    /// Records the height of the next block to scan.
    fn set_rpa_height(&self, height: u32) -> Result<()>;
}

/// Fire-and-forget requests to the prefix-indexing server.
///
/// Responses arrive asynchronously through the pipeline's `on_*_response`
/// methods; implementations route them back however their transport works.
pub trait IndexerClient {
    /// Current chain tip height known to the server, if connected.
    fn server_height(&self) -> Option<u32>;

    /// Requests prefix-matching confirmed history for `count` blocks
    /// starting at `start`.
    fn request_history(&self, start: u32, count: u32, prefix: &str);

    /// Requests prefix-matching mempool transactions.
    fn request_mempool(&self, prefix: &str);

    /// Requests the raw hex of `txid`.
    fn request_transaction(&self, txid: &str);
}

/// Extracts payment keys from raw transactions.
pub trait PaymentKeyExtractor {
    /// Whether extraction can run right now (keys unlocked).
    fn ready(&self) -> bool {
        true
    }

    /// WIF private keys for any outputs of `raw_tx` paying this wallet.
    fn extract(&self, raw_tx: &str) -> Result<Vec<String>>;
}
