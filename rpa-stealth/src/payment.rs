//! Sender-side payment construction and grinding.
//!
//! A paycode payment is an ordinary P2PKH transaction whose first input
//! has been re-signed with varying auxiliary entropy until the double-SHA
//! of its serialization starts with the paycode's discoverability prefix.
//! The receiver's indexing server matches on that prefix, so the grinding
//! work is what makes the payment findable without addresses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use secp256k1::{All, PublicKey, Secp256k1};
use tracing::{debug, info};

use rpa_core::constants::{GRINDING_VERSION, GRIND_PROGRESS_INTERVAL, SIGHASH_ALL_FORKID};
use rpa_core::error::{Result, RpaError};
use rpa_core::hash::{sha256, sha256d};
use rpa_core::traits::{KeySource, TransactionConstructor};
use rpa_core::types::transaction::{Transaction, TxOutput};
use rpa_core::types::{script, Address, Network, Paycode};
use rpa_crypto::{derive_payment_address, shared_secret};

/// Cooperative cancellation handle for a grinding run.
///
/// Clone it, hand one copy to the builder, and call [`cancel`] from any
/// thread; the grinder checks it every iteration.
///
/// [`cancel`]: CancelToken::cancel
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress callback, invoked with the number of grinding iterations
/// completed so far.
pub type ProgressFn = dyn Fn(u64) + Send + Sync;

/// A successfully ground payment, ready to broadcast.
#[derive(Clone, Debug)]
pub struct BuiltPayment {
    /// Raw transaction hex.
    pub raw_hex: String,
    /// The one-time destination the funds were sent to.
    pub destination: Address,
    /// How many grinding iterations the prefix match took.
    pub grind_iterations: u64,
}

/// Builds paycode payments on top of the host wallet's coin selection.
pub struct PaymentBuilder<'a> {
    secp: Secp256k1<All>,
    constructor: &'a dyn TransactionConstructor,
    keys: &'a dyn KeySource,
    progress: Option<Box<ProgressFn>>,
    cancel: CancelToken,
    locktime: Option<u32>,
}

impl<'a> PaymentBuilder<'a> {
    /// A builder drawing coins from `constructor` and signing keys from
    /// `keys`.
    pub fn new(constructor: &'a dyn TransactionConstructor, keys: &'a dyn KeySource) -> Self {
        Self {
            secp: Secp256k1::new(),
            constructor,
            keys,
            progress: None,
            cancel: CancelToken::new(),
            locktime: None,
        }
    }

    /// Registers a progress callback, invoked once per
    /// [`GRIND_PROGRESS_INTERVAL`] iterations.
    pub fn with_progress(mut self, progress: Box<ProgressFn>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Attaches a cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Overrides the transaction's lock time.
    pub fn with_locktime(mut self, locktime: u32) -> Self {
        self.locktime = Some(locktime);
        self
    }

    /// Builds, signs, and grinds a payment of `amount` satoshis to
    /// `token`, paying `fee` on top.
    pub fn build(&self, token: &str, amount: u64, fee: u64) -> Result<BuiltPayment> {
        let paycode = Paycode::decode(token)?;
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        if paycode.is_expired(now) {
            return Err(RpaError::PaycodeExpired);
        }
        self.build_to_paycode(&paycode, amount, fee)
    }

    /// [`build`](Self::build) for an already-decoded, already-vetted
    /// paycode.
    pub fn build_to_paycode(
        &self,
        paycode: &Paycode,
        amount: u64,
        fee: u64,
    ) -> Result<BuiltPayment> {
        let network = paycode.network;

        // The real destination depends on the first input chosen, so fund
        // the transaction against a placeholder and swap its script after
        // coin selection.
        let placeholder = Address {
            network,
            hash160: [0u8; 20],
        };
        let outputs = [TxOutput {
            value: amount,
            script_pubkey: placeholder.script_pubkey(),
        }];
        let mut tx = self.constructor.make_unsigned(&outputs, fee, None)?;
        if tx.inputs.is_empty() {
            return Err(RpaError::InsufficientFunds("no inputs selected".into()));
        }
        if let Some(locktime) = self.locktime {
            tx.locktime = locktime;
        }
        // The sighashes commit to input and output order, so ordering must
        // be final before anything is signed. Grinding only rewrites the
        // anchor's scriptSig, which is not part of any preimage.
        tx.sort_deterministic();

        let anchor = &tx.inputs[0];
        let anchor_pubkey = anchor
            .pubkey
            .ok_or_else(|| RpaError::Internal("selected input lacks its public key".into()))?;
        let anchor_privkey = self
            .keys
            .private_key_for(&anchor_pubkey)
            .ok_or_else(|| RpaError::Keystore("no private key for selected input".into()))?;
        let outpoint_id = anchor.prevout.rpa_identifier();

        let secret = shared_secret(&self.secp, &anchor_privkey, &paycode.scan_pubkey, &outpoint_id)?;
        let destination = derive_payment_address(&self.secp, &paycode.spend_pubkey, &secret, network)?;
        debug!(%destination, "derived one-time payment destination");

        let placeholder_script = placeholder.script_pubkey();
        let slot = tx
            .outputs
            .iter()
            .position(|o| o.script_pubkey == placeholder_script)
            .ok_or_else(|| RpaError::Internal("placeholder output missing".into()))?;
        tx.outputs[slot].script_pubkey = destination.script_pubkey();
        // the swapped script changes the output sort key
        tx.sort_deterministic();

        for index in 0..tx.inputs.len() {
            sign_input(&self.secp, &mut tx, index, network, self.keys, &[0u8; 32])?;
        }

        let iterations = self.grind(&mut tx, paycode, network)?;
        let raw_hex = tx.to_hex()?;
        info!(
            iterations,
            txid = %tx.txid()?,
            "ground payment transaction"
        );
        Ok(BuiltPayment {
            raw_hex,
            destination,
            grind_iterations: iterations,
        })
    }

    /// Re-signs input 0 with successive entropy values until its serialized
    /// form double-hashes to the paycode's prefix.
    fn grind(&self, tx: &mut Transaction, paycode: &Paycode, network: Network) -> Result<u64> {
        let target = paycode.grind_prefix();
        let grind_hex = paycode.payload_with_checksum_hex();

        let anchor = &tx.inputs[0];
        let anchor_pubkey = anchor
            .pubkey
            .ok_or_else(|| RpaError::Internal("anchor input lacks its public key".into()))?;
        let anchor_privkey = self
            .keys
            .private_key_for(&anchor_pubkey)
            .ok_or_else(|| RpaError::Keystore("no private key for anchor input".into()))?;
        // scriptSig is not part of the preimage, so one sighash serves
        // every iteration
        let script_code = script_code_for(network, &anchor_pubkey);
        let sighash = tx.sighash(0, &script_code, anchor.value, SIGHASH_ALL_FORKID)?;

        let mut nonce: u64 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(RpaError::Cancelled);
            }
            let ndata = sha256(format!("{grind_hex}{nonce}{GRINDING_VERSION}").as_bytes());
            let sig = rpa_crypto::schnorr::sign(&self.secp, &anchor_privkey, &sighash, &ndata)?;
            let mut sig_with_hashtype = sig.to_vec();
            sig_with_hashtype.push(SIGHASH_ALL_FORKID as u8);
            tx.inputs[0].script_sig =
                script::p2pkh_script_sig(&sig_with_hashtype, &anchor_pubkey.serialize());

            let digest = sha256d(&tx.inputs[0].to_wire()?);
            if hex::encode_upper(digest).starts_with(&target) {
                return Ok(nonce + 1);
            }

            nonce += 1;
            if nonce % GRIND_PROGRESS_INTERVAL == 0 {
                if let Some(progress) = &self.progress {
                    progress(nonce);
                }
            }
        }
    }
}

/// Signs input `index` in place with the given auxiliary entropy.
fn sign_input(
    secp: &Secp256k1<All>,
    tx: &mut Transaction,
    index: usize,
    network: Network,
    keys: &dyn KeySource,
    ndata: &[u8; 32],
) -> Result<()> {
    let input = &tx.inputs[index];
    let pubkey = input
        .pubkey
        .ok_or_else(|| RpaError::Internal(format!("input {index} lacks its public key")))?;
    let privkey = keys
        .private_key_for(&pubkey)
        .ok_or_else(|| RpaError::Keystore(format!("no private key for input {index}")))?;

    let script_code = script_code_for(network, &pubkey);
    let sighash = tx.sighash(index, &script_code, input.value, SIGHASH_ALL_FORKID)?;
    let sig = rpa_crypto::schnorr::sign(secp, &privkey, &sighash, ndata)?;
    let mut sig_with_hashtype = sig.to_vec();
    sig_with_hashtype.push(SIGHASH_ALL_FORKID as u8);
    tx.inputs[index].script_sig = script::p2pkh_script_sig(&sig_with_hashtype, &pubkey.serialize());
    Ok(())
}

/// The P2PKH script code a compressed-key coin is locked with.
fn script_code_for(network: Network, pubkey: &PublicKey) -> Vec<u8> {
    Address::from_pubkey(network, &pubkey.serialize()).script_pubkey()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_pre_cancelled_build_aborts() {
        struct NoCoins;
        impl TransactionConstructor for NoCoins {
            fn make_unsigned(
                &self,
                _outputs: &[TxOutput],
                _fee: u64,
                _domain: Option<&[Address]>,
            ) -> Result<Transaction> {
                Err(RpaError::InsufficientFunds("empty wallet".into()))
            }
        }
        struct NoKeys;
        impl KeySource for NoKeys {
            fn private_key_for(&self, _pubkey: &PublicKey) -> Option<secp256k1::SecretKey> {
                None
            }
        }

        // coin selection runs before grinding, so the failure surfaces as
        // InsufficientFunds even with a cancelled token attached
        let token = CancelToken::new();
        token.cancel();
        let builder = PaymentBuilder::new(&NoCoins, &NoKeys).with_cancel_token(token);
        let wallet = crate::wallet::RpaWallet::from_secret_bytes(
            Network::Mainnet,
            &[0x13; 32],
            &[0x31; 32],
        )
        .unwrap();
        let code = wallet.paycode(rpa_core::types::PrefixSize::Bits4);
        assert!(matches!(
            builder.build_to_paycode(&code, 1_000, 100),
            Err(RpaError::InsufficientFunds(_))
        ));
    }

    #[test]
    fn test_expired_paycode_rejected() {
        struct Unreachable;
        impl TransactionConstructor for Unreachable {
            fn make_unsigned(
                &self,
                _outputs: &[TxOutput],
                _fee: u64,
                _domain: Option<&[Address]>,
            ) -> Result<Transaction> {
                panic!("must not reach coin selection");
            }
        }
        struct NoKeys;
        impl KeySource for NoKeys {
            fn private_key_for(&self, _pubkey: &PublicKey) -> Option<secp256k1::SecretKey> {
                None
            }
        }

        let wallet = crate::wallet::RpaWallet::from_secret_bytes(
            Network::Mainnet,
            &[0x13; 32],
            &[0x31; 32],
        )
        .unwrap();
        // expired long ago
        let code = wallet.paycode_with_expiry(rpa_core::types::PrefixSize::Bits4, 1_000_000);
        let token = code.encode();
        let builder = PaymentBuilder::new(&Unreachable, &NoKeys);
        assert!(matches!(
            builder.build(&token, 1_000, 100),
            Err(RpaError::PaycodeExpired)
        ));
    }
}
