//! Minimal script handling: P2PKH lock/unlock scripts and recovery of the
//! spender's public key from an unlocking script.

use crate::types::{Address, Network};

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;

/// Standard P2PKH locking script.
pub fn p2pkh_script(hash160: &[u8; 20]) -> Vec<u8> {
    let mut s = Vec::with_capacity(25);
    s.push(OP_DUP);
    s.push(OP_HASH160);
    s.push(20);
    s.extend_from_slice(hash160);
    s.push(OP_EQUALVERIFY);
    s.push(OP_CHECKSIG);
    s
}

/// P2PKH unlocking script: `push(sig || hashtype) push(pubkey)`.
pub fn p2pkh_script_sig(sig_with_hashtype: &[u8], pubkey: &[u8]) -> Vec<u8> {
    let mut s = Vec::with_capacity(sig_with_hashtype.len() + pubkey.len() + 2);
    s.push(sig_with_hashtype.len() as u8);
    s.extend_from_slice(sig_with_hashtype);
    s.push(pubkey.len() as u8);
    s.extend_from_slice(pubkey);
    s
}

/// If `script` is a standard P2PKH locking script, its address.
pub fn address_from_script_pubkey(script: &[u8], network: Network) -> Option<Address> {
    if script.len() == 25
        && script[0] == OP_DUP
        && script[1] == OP_HASH160
        && script[2] == 20
        && script[23] == OP_EQUALVERIFY
        && script[24] == OP_CHECKSIG
    {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&script[3..23]);
        Some(Address {
            network,
            hash160: hash,
        })
    } else {
        None
    }
}

/// Recovers the spender's serialized public key from an unlocking script.
///
/// A P2PKH unlock script is the push pair `(signature, pubkey)`, so the
/// key is taken structurally from the final push; shape alone cannot
/// identify it, since a signature push may begin with a pubkey-looking
/// byte. Returns `None` for scripts whose last push is not key-shaped
/// (coinbase, P2PK, non-standard): the scanner treats those inputs as
/// non-matches, not errors.
pub fn script_sig_pubkey(script_sig: &[u8]) -> Option<Vec<u8>> {
    let push = iter_pushes(script_sig).last()?;
    let is_pubkey = matches!(
        (push.len(), push.first()),
        (33, Some(0x02)) | (33, Some(0x03)) | (65, Some(0x04))
    );
    is_pubkey.then(|| push.to_vec())
}

/// Iterates the data pushes of a script, stopping at anything that is not a
/// plain push.
fn iter_pushes(script: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = script;
    std::iter::from_fn(move || {
        let (&len, tail) = rest.split_first()?;
        // only direct pushes (0x01..=0x4b) appear in the scripts we emit
        let len = len as usize;
        if len == 0 || len > 0x4b || tail.len() < len {
            return None;
        }
        let (push, tail) = tail.split_at(len);
        rest = tail;
        Some(push)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p2pkh_round_trip() {
        let hash = [0xabu8; 20];
        let script = p2pkh_script(&hash);
        let addr = address_from_script_pubkey(&script, Network::Mainnet).unwrap();
        assert_eq!(addr.hash160, hash);
    }

    #[test]
    fn test_non_p2pkh_script_yields_no_address() {
        assert!(address_from_script_pubkey(&[0x6a, 0x01, 0x00], Network::Mainnet).is_none());
        assert!(address_from_script_pubkey(&[], Network::Mainnet).is_none());
    }

    #[test]
    fn test_script_sig_pubkey_recovery() {
        let sig = [0x30u8; 65];
        let mut pubkey = [0x02u8; 33];
        pubkey[1] = 0x77;
        let script = p2pkh_script_sig(&sig, &pubkey);
        assert_eq!(script_sig_pubkey(&script).unwrap(), pubkey.to_vec());
    }

    #[test]
    fn test_script_sig_pubkey_uncompressed() {
        let sig = [0x30u8; 65];
        let pubkey = [0x04u8; 65];
        let script = p2pkh_script_sig(&sig, &pubkey);
        assert_eq!(script_sig_pubkey(&script).unwrap(), pubkey.to_vec());
    }

    #[test]
    fn test_signature_bytes_never_mistaken_for_key() {
        // a ground signature's first byte is R.x[0], so it can be 0x04;
        // recovery must still land on the key push
        let mut sig = [0x04u8; 65];
        sig[1] = 0x99;
        let pubkey = [0x02u8; 33];
        let script = p2pkh_script_sig(&sig, &pubkey);
        assert_eq!(script_sig_pubkey(&script).unwrap(), pubkey.to_vec());

        // same for a signature starting with a compressed-key prefix
        let sig = [0x02u8; 65];
        let script = p2pkh_script_sig(&sig, &pubkey);
        assert_eq!(script_sig_pubkey(&script).unwrap(), pubkey.to_vec());
    }

    #[test]
    fn test_script_sig_without_pubkey() {
        // coinbase-like arbitrary bytes
        assert!(script_sig_pubkey(&[0x03, 0x01, 0x02, 0x03]).is_none());
        assert!(script_sig_pubkey(&[]).is_none());
    }
}
