//! Deterministic Schnorr signatures with auxiliary entropy.
//!
//! The signature is a function of the key, the message, and a 32-byte
//! `ndata` value. Re-signing with a different `ndata` yields a different
//! but equally valid signature over the same digest; the transaction
//! grinder iterates `ndata` until the signed input hashes to the wanted
//! prefix.

use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey, Signing, Verification};

use rpa_core::error::{Result, RpaError};
use rpa_core::hash::sha256;

/// Signs `msg32` with `key`, mixing `ndata` into the nonce.
///
/// Returns the 64-byte signature `R.x || s`. The nonce is derived by
/// hashing key, message, entropy and a retry counter, and is negated when
/// `R` has an odd y coordinate so verifiers can reconstruct `R` from its
/// x coordinate alone.
pub fn sign<C: Signing>(
    secp: &Secp256k1<C>,
    key: &SecretKey,
    msg32: &[u8; 32],
    ndata: &[u8; 32],
) -> Result<[u8; 64]> {
    let pubkey = PublicKey::from_secret_key(secp, key);

    for counter in 0u32..=255 {
        let mut preimage = Vec::with_capacity(32 * 3 + 4);
        preimage.extend_from_slice(&key.secret_bytes());
        preimage.extend_from_slice(msg32);
        preimage.extend_from_slice(ndata);
        preimage.extend_from_slice(&counter.to_be_bytes());
        let Ok(mut k) = SecretKey::from_slice(&sha256(&preimage)) else {
            continue;
        };

        let r = PublicKey::from_secret_key(secp, &k);
        let r_serialized = r.serialize();
        if r_serialized[0] == 0x03 {
            k = k.negate();
        }
        let r_x: [u8; 32] = r_serialized[1..33].try_into().expect("32 bytes");

        let e = challenge(&r_x, &pubkey, msg32)?;
        let ed = key.mul_tweak(&e)?;
        let Ok(s) = k.add_tweak(&Scalar::from(ed)) else {
            continue;
        };

        let mut sig = [0u8; 64];
        sig[..32].copy_from_slice(&r_x);
        sig[32..].copy_from_slice(&s.secret_bytes());
        return Ok(sig);
    }
    Err(RpaError::Crypto("nonce generation exhausted".into()))
}

/// Verifies a signature produced by [`sign`].
///
/// Needs a signing-capable context as well: `s·G` is computed by treating
/// `s` as a secret key.
pub fn verify<C: Signing + Verification>(
    secp: &Secp256k1<C>,
    pubkey: &PublicKey,
    msg32: &[u8; 32],
    sig: &[u8; 64],
) -> Result<bool> {
    let r_x: [u8; 32] = sig[..32].try_into().expect("32 bytes");
    let mut r_bytes = [0u8; 33];
    r_bytes[0] = 0x02; // even y by construction
    r_bytes[1..].copy_from_slice(&r_x);
    let Ok(r) = PublicKey::from_slice(&r_bytes) else {
        return Ok(false);
    };
    let Ok(s) = SecretKey::from_slice(&sig[32..]) else {
        return Ok(false);
    };

    let e = challenge(&r_x, pubkey, msg32)?;
    let lhs = PublicKey::from_secret_key(secp, &s);
    let Ok(ep) = pubkey.mul_tweak(secp, &e) else {
        return Ok(false);
    };
    let Ok(rhs) = r.combine(&ep) else {
        return Ok(false);
    };
    Ok(lhs == rhs)
}

/// The challenge scalar `e = H(R.x || P || m)`.
fn challenge(r_x: &[u8; 32], pubkey: &PublicKey, msg32: &[u8; 32]) -> Result<Scalar> {
    let mut preimage = Vec::with_capacity(32 + 33 + 32);
    preimage.extend_from_slice(r_x);
    preimage.extend_from_slice(&pubkey.serialize());
    preimage.extend_from_slice(msg32);
    Scalar::from_be_bytes(sha256(&preimage))
        .map_err(|_| RpaError::Crypto("challenge out of range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Secp256k1<secp256k1::All>, SecretKey, PublicKey) {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[0x51; 32]).unwrap();
        let pk = PublicKey::from_secret_key(&secp, &sk);
        (secp, sk, pk)
    }

    #[test]
    fn test_sign_verify() {
        let (secp, sk, pk) = setup();
        let msg = [0xaau8; 32];
        let sig = sign(&secp, &sk, &msg, &[0u8; 32]).unwrap();
        assert!(verify(&secp, &pk, &msg, &sig).unwrap());
    }

    #[test]
    fn test_deterministic() {
        let (secp, sk, _) = setup();
        let msg = [0xaau8; 32];
        let ndata = [0x07u8; 32];
        assert_eq!(
            sign(&secp, &sk, &msg, &ndata).unwrap(),
            sign(&secp, &sk, &msg, &ndata).unwrap()
        );
    }

    #[test]
    fn test_ndata_changes_signature() {
        let (secp, sk, pk) = setup();
        let msg = [0xaau8; 32];
        let a = sign(&secp, &sk, &msg, &[1u8; 32]).unwrap();
        let b = sign(&secp, &sk, &msg, &[2u8; 32]).unwrap();
        assert_ne!(a, b);
        // both remain valid over the same digest
        assert!(verify(&secp, &pk, &msg, &a).unwrap());
        assert!(verify(&secp, &pk, &msg, &b).unwrap());
    }

    #[test]
    fn test_wrong_message_rejected() {
        let (secp, sk, pk) = setup();
        let sig = sign(&secp, &sk, &[0xaau8; 32], &[0u8; 32]).unwrap();
        assert!(!verify(&secp, &pk, &[0xabu8; 32], &sig).unwrap());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (secp, sk, _) = setup();
        let other = PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[0x52; 32]).unwrap());
        let msg = [0xaau8; 32];
        let sig = sign(&secp, &sk, &msg, &[0u8; 32]).unwrap();
        assert!(!verify(&secp, &other, &msg, &sig).unwrap());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let (secp, sk, pk) = setup();
        let msg = [0xaau8; 32];
        let mut sig = sign(&secp, &sk, &msg, &[0u8; 32]).unwrap();
        sig[40] ^= 0x01;
        assert!(!verify(&secp, &pk, &msg, &sig).unwrap());
    }
}
