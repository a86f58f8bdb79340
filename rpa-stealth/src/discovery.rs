//! Receiver-side payment discovery.

use std::collections::HashSet;

use secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use tracing::{debug, trace};

use rpa_core::error::Result;
use rpa_core::traits::PaymentKeyExtractor;
use rpa_core::types::transaction::Transaction;
use rpa_core::types::{script, Address, Network};
use rpa_crypto::{derive_payment_address, derive_payment_private_key, shared_secret};

/// Recovers payment keys from candidate transactions.
///
/// For every input of a candidate, the scanner replays the sender's
/// derivation from its own side: ECDH against the recovered input public
/// key, then the child of the spend key. If the resulting address appears
/// among the outputs, the payment is ours and the matching private key is
/// returned as WIF.
pub struct PaymentScanner {
    secp: Secp256k1<All>,
    network: Network,
    scan_privkey: SecretKey,
    spend_privkey: SecretKey,
    spend_pubkey: PublicKey,
}

impl PaymentScanner {
    /// A scanner for the given scan/spend keys.
    pub fn new(network: Network, scan_privkey: SecretKey, spend_privkey: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let spend_pubkey = PublicKey::from_secret_key(&secp, &spend_privkey);
        Self {
            secp,
            network,
            scan_privkey,
            spend_privkey,
            spend_pubkey,
        }
    }

    /// Scans a raw transaction, returning WIF keys for every output it
    /// pays to this wallet. Inputs without a recoverable public key are
    /// skipped, not errors; an empty result means "not our payment".
    pub fn extract_keys(&self, raw_tx: &str) -> Result<Vec<String>> {
        let tx = Transaction::from_hex(raw_tx)?;

        let output_addresses: HashSet<Address> = tx
            .outputs
            .iter()
            .filter_map(|o| script::address_from_script_pubkey(&o.script_pubkey, self.network))
            .collect();
        if output_addresses.is_empty() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut seen = HashSet::new();
        for input in &tx.inputs {
            let Some(pubkey_bytes) = script::script_sig_pubkey(&input.script_sig) else {
                trace!(outpoint = %input.prevout.rpa_identifier(), "no recoverable pubkey, skipping input");
                continue;
            };
            let Ok(sender_pubkey) = PublicKey::from_slice(&pubkey_bytes) else {
                continue;
            };

            let outpoint_id = input.prevout.rpa_identifier();
            let secret =
                shared_secret(&self.secp, &self.scan_privkey, &sender_pubkey, &outpoint_id)?;
            let candidate =
                derive_payment_address(&self.secp, &self.spend_pubkey, &secret, self.network)?;
            if output_addresses.contains(&candidate) && seen.insert(candidate) {
                debug!(%candidate, "matched paycode payment output");
                keys.push(derive_payment_private_key(
                    &self.secp,
                    &self.spend_privkey,
                    &secret,
                )?);
            }
        }
        Ok(keys)
    }
}

impl PaymentKeyExtractor for PaymentScanner {
    fn extract(&self, raw_tx: &str) -> Result<Vec<String>> {
        self.extract_keys(raw_tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpa_core::error::RpaError;
    use rpa_core::traits::{KeySource, TransactionConstructor};
    use rpa_core::types::transaction::{OutPoint, TxInput, TxOutput};
    use rpa_core::types::PrefixSize;
    use rpa_crypto::wif_to_private_key;

    use crate::payment::{CancelToken, PaymentBuilder};
    use crate::wallet::RpaWallet;

    /// One funded coin plus its key, standing in for the host wallet.
    struct SingleCoin {
        privkey: SecretKey,
        pubkey: PublicKey,
        value: u64,
    }

    impl SingleCoin {
        fn new(byte: u8, value: u64) -> Self {
            let secp = Secp256k1::new();
            let privkey = SecretKey::from_slice(&[byte; 32]).unwrap();
            let pubkey = PublicKey::from_secret_key(&secp, &privkey);
            Self {
                privkey,
                pubkey,
                value,
            }
        }
    }

    impl TransactionConstructor for SingleCoin {
        fn make_unsigned(
            &self,
            outputs: &[TxOutput],
            fee: u64,
            _domain: Option<&[Address]>,
        ) -> Result<Transaction> {
            let spend: u64 = outputs.iter().map(|o| o.value).sum::<u64>() + fee;
            if spend > self.value {
                return Err(RpaError::InsufficientFunds(format!(
                    "need {spend}, have {}",
                    self.value
                )));
            }
            let mut tx = Transaction::new();
            tx.inputs.push(TxInput::new(
                OutPoint {
                    txid: "9f".repeat(32),
                    vout: 1,
                },
                self.value,
                self.pubkey,
            ));
            tx.outputs.extend_from_slice(outputs);
            let change = self.value - spend;
            if change > 0 {
                tx.outputs.push(TxOutput {
                    value: change,
                    script_pubkey: Address::from_pubkey(
                        Network::Mainnet,
                        &self.pubkey.serialize(),
                    )
                    .script_pubkey(),
                });
            }
            Ok(tx)
        }
    }

    impl KeySource for SingleCoin {
        fn private_key_for(&self, pubkey: &PublicKey) -> Option<SecretKey> {
            (pubkey == &self.pubkey).then_some(self.privkey)
        }
    }

    #[test]
    fn test_build_then_scan_round_trip() {
        let coin = SingleCoin::new(0x61, 100_000);
        let wallet =
            RpaWallet::from_secret_bytes(Network::Mainnet, &[0x13; 32], &[0x31; 32]).unwrap();
        // 4-bit prefix keeps the grind to a handful of iterations
        let code = wallet.paycode(PrefixSize::Bits4);

        let built = PaymentBuilder::new(&coin, &coin)
            .with_locktime(800_000)
            .build(&code.encode(), 25_000, 500)
            .unwrap();
        assert!(built.grind_iterations >= 1);
        assert_eq!(Transaction::from_hex(&built.raw_hex).unwrap().locktime, 800_000);

        let keys = wallet.scanner().extract_keys(&built.raw_hex).unwrap();
        assert_eq!(keys.len(), 1);

        // the recovered key controls the matched output
        let secp = Secp256k1::new();
        let recovered = wif_to_private_key(&keys[0]).unwrap();
        let recovered_pub = PublicKey::from_secret_key(&secp, &recovered);
        let recovered_addr =
            Address::from_pubkey(Network::Mainnet, &recovered_pub.serialize_uncompressed());
        assert_eq!(recovered_addr, built.destination);

        let tx = Transaction::from_hex(&built.raw_hex).unwrap();
        assert!(tx
            .outputs
            .iter()
            .any(|o| o.script_pubkey == built.destination.script_pubkey()));
    }

    #[test]
    fn test_ground_prefix_present() {
        let coin = SingleCoin::new(0x62, 100_000);
        let wallet =
            RpaWallet::from_secret_bytes(Network::Mainnet, &[0x14; 32], &[0x32; 32]).unwrap();
        let code = wallet.paycode(PrefixSize::Bits4);

        let built = PaymentBuilder::new(&coin, &coin)
            .build(&code.encode(), 10_000, 500)
            .unwrap();

        let tx = Transaction::from_hex(&built.raw_hex).unwrap();
        // with one input, deterministic sorting cannot displace the anchor
        let digest = rpa_core::hash::sha256d(&tx.inputs[0].to_wire().unwrap());
        assert!(hex::encode_upper(digest).starts_with(&code.grind_prefix()));
    }

    #[test]
    fn test_grind_is_deterministic() {
        let wallet =
            RpaWallet::from_secret_bytes(Network::Mainnet, &[0x15; 32], &[0x33; 32]).unwrap();
        let code = wallet.paycode(PrefixSize::Bits4);

        let build = || {
            let coin = SingleCoin::new(0x63, 100_000);
            PaymentBuilder::new(&coin, &coin)
                .build(&code.encode(), 10_000, 500)
                .unwrap()
        };
        let a = build();
        let b = build();
        assert_eq!(a.raw_hex, b.raw_hex);
        assert_eq!(a.grind_iterations, b.grind_iterations);
        // pinned for this key set; a change here means the grind entropy
        // derivation or the signer drifted
        assert_eq!(a.grind_iterations, 9);
    }

    #[test]
    fn test_cancelled_grind_yields_no_transaction() {
        let coin = SingleCoin::new(0x65, 100_000);
        let wallet =
            RpaWallet::from_secret_bytes(Network::Mainnet, &[0x1a; 32], &[0x38; 32]).unwrap();
        let code = wallet.paycode(PrefixSize::Bits16);

        let token = CancelToken::new();
        token.cancel();
        let err = PaymentBuilder::new(&coin, &coin)
            .with_cancel_token(token)
            .build(&code.encode(), 10_000, 500)
            .unwrap_err();
        assert!(matches!(err, RpaError::Cancelled));
    }

    #[test]
    fn test_unrelated_transaction_yields_nothing() {
        let coin = SingleCoin::new(0x64, 100_000);
        let wallet =
            RpaWallet::from_secret_bytes(Network::Mainnet, &[0x16; 32], &[0x34; 32]).unwrap();
        let other =
            RpaWallet::from_secret_bytes(Network::Mainnet, &[0x17; 32], &[0x35; 32]).unwrap();
        let code = other.paycode(PrefixSize::Bits4);

        let built = PaymentBuilder::new(&coin, &coin)
            .build(&code.encode(), 10_000, 500)
            .unwrap();
        // wrong wallet sees no payment
        assert!(wallet.scanner().extract_keys(&built.raw_hex).unwrap().is_empty());
    }

    #[test]
    fn test_inputs_without_pubkeys_are_skipped() {
        let wallet =
            RpaWallet::from_secret_bytes(Network::Mainnet, &[0x18; 32], &[0x36; 32]).unwrap();
        let mut tx = Transaction::new();
        tx.inputs.push(TxInput {
            prevout: OutPoint {
                txid: "11".repeat(32),
                vout: 0,
            },
            script_sig: vec![0x03, 0x01, 0x02, 0x03], // coinbase-like
            sequence: 0xffff_ffff,
            value: 0,
            pubkey: None,
        });
        tx.outputs.push(TxOutput {
            value: 5_000,
            script_pubkey: Address {
                network: Network::Mainnet,
                hash160: [9; 20],
            }
            .script_pubkey(),
        });
        let raw = tx.to_hex().unwrap();
        assert!(wallet.scanner().extract_keys(&raw).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_raw_tx_is_an_error() {
        let wallet =
            RpaWallet::from_secret_bytes(Network::Mainnet, &[0x19; 32], &[0x37; 32]).unwrap();
        assert!(wallet.scanner().extract_keys("deadbeef").is_err());
    }
}
