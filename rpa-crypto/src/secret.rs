//! Per-payment shared secrets.
//!
//! Sender and receiver arrive at the same 32-byte secret from opposite
//! sides of an ECDH exchange, salted with the transaction's first
//! outpoint so repeated payments to one paycode never reuse a secret:
//!
//! ```text
//! secret = SHA256( minimal_be( SHA256(0x00 || x(a·B)) + SHA256(outpoint) ) )
//! ```
//!
//! where `a·B` is the ECDH point, the x coordinate is padded to 33 bytes,
//! the two digests are added as big-endian integers, and the sum is
//! re-serialized without leading zero bytes.

use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey, Verification};

use rpa_core::error::Result;
use rpa_core::hash::sha256;

/// Computes the shared secret for one payment.
///
/// Commutative in the key pair: the sender calls it with an input private
/// key and the receiver's scan public key, the receiver with the scan
/// private key and the sender's recovered input public key.
///
/// `outpoint` is the first input's identifier string, txid hex followed
/// directly by the decimal output index.
pub fn shared_secret<C: Verification>(
    secp: &Secp256k1<C>,
    privkey: &SecretKey,
    pubkey: &PublicKey,
    outpoint: &str,
) -> Result<[u8; 32]> {
    let point = pubkey.mul_tweak(secp, &Scalar::from(*privkey))?;
    // x coordinate, zero-padded to 33 bytes big-endian
    let mut x_padded = [0u8; 33];
    x_padded[1..].copy_from_slice(&point.serialize()[1..33]);

    let ecdh_digest = sha256(&x_padded);
    let outpoint_digest = sha256(outpoint.as_bytes());
    let sum = add_minimal_be(&ecdh_digest, &outpoint_digest);
    Ok(sha256(&sum))
}

/// Adds two 32-byte big-endian integers, returning the minimal big-endian
/// encoding of the sum (no leading zero bytes).
fn add_minimal_be(a: &[u8; 32], b: &[u8; 32]) -> Vec<u8> {
    let mut out = [0u8; 33];
    let mut carry = 0u16;
    for i in (0..32).rev() {
        let sum = a[i] as u16 + b[i] as u16 + carry;
        out[i + 1] = sum as u8;
        carry = sum >> 8;
    }
    out[0] = carry as u8;

    let start = out.iter().position(|&x| x != 0).unwrap_or(32);
    out[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(byte: u8) -> (SecretKey, PublicKey) {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[byte; 32]).unwrap();
        (sk, PublicKey::from_secret_key(&secp, &sk))
    }

    #[test]
    fn test_ecdh_symmetry() {
        let secp = Secp256k1::new();
        let (sender_sk, sender_pk) = keypair(0x21);
        let (scan_sk, scan_pk) = keypair(0x42);
        let outpoint = format!("{}{}", "ab".repeat(32), 0);

        let from_sender = shared_secret(&secp, &sender_sk, &scan_pk, &outpoint).unwrap();
        let from_receiver = shared_secret(&secp, &scan_sk, &sender_pk, &outpoint).unwrap();
        assert_eq!(from_sender, from_receiver);
    }

    #[test]
    fn test_outpoint_changes_secret() {
        let secp = Secp256k1::new();
        let (sk, _) = keypair(0x21);
        let (_, pk) = keypair(0x42);
        let txid = "cd".repeat(32);

        let a = shared_secret(&secp, &sk, &pk, &format!("{txid}0")).unwrap();
        let b = shared_secret(&secp, &sk, &pk, &format!("{txid}1")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_keys_change_secret() {
        let secp = Secp256k1::new();
        let (sk1, _) = keypair(0x21);
        let (sk2, _) = keypair(0x22);
        let (_, pk) = keypair(0x42);
        let outpoint = format!("{}{}", "ef".repeat(32), 3);

        let a = shared_secret(&secp, &sk1, &pk, &outpoint).unwrap();
        let b = shared_secret(&secp, &sk2, &pk, &outpoint).unwrap();
        assert_ne!(a, b);
    }

    proptest::proptest! {
        #[test]
        fn prop_symmetry(
            a in proptest::array::uniform32(1u8..),
            b in proptest::array::uniform32(1u8..),
            vout in 0u32..16,
        ) {
            let secp = Secp256k1::new();
            if let (Ok(sk_a), Ok(sk_b)) =
                (SecretKey::from_slice(&a), SecretKey::from_slice(&b))
            {
                let pk_a = PublicKey::from_secret_key(&secp, &sk_a);
                let pk_b = PublicKey::from_secret_key(&secp, &sk_b);
                let outpoint = format!("{}{}", "77".repeat(32), vout);
                proptest::prop_assert_eq!(
                    shared_secret(&secp, &sk_a, &pk_b, &outpoint).unwrap(),
                    shared_secret(&secp, &sk_b, &pk_a, &outpoint).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_add_minimal_be() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        a[31] = 0x01;
        b[31] = 0x02;
        assert_eq!(add_minimal_be(&a, &b), vec![0x03]);

        // carry out of the top byte
        let c = [0xffu8; 32];
        let mut d = [0u8; 32];
        d[31] = 0x01;
        let sum = add_minimal_be(&c, &d);
        assert_eq!(sum.len(), 33);
        assert_eq!(sum[0], 0x01);
        assert!(sum[1..].iter().all(|&x| x == 0));

        // zero plus zero keeps one byte
        assert_eq!(add_minimal_be(&[0; 32], &[0; 32]), vec![0x00]);
    }
}
