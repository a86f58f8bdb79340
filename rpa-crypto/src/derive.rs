//! Child key derivation and WIF export.
//!
//! One non-hardened derivation step at index 0, with the shared secret as
//! the chain code. The receiving address hashes the *uncompressed* child
//! public key, so both sides must derive it the same way.

use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey, Signing, Verification};
use sha2::Sha512;
use zeroize::Zeroizing;

use rpa_core::constants::{DERIVATION_INDEX, WIF_VERSION};
use rpa_core::error::{Result, RpaError};
use rpa_core::types::{Address, Network};

type HmacSha512 = Hmac<Sha512>;

/// The additive tweak for one derivation step: the left half of
/// HMAC-SHA512(chain_code, serP(parent) || ser32(index)).
fn derivation_tweak(secret: &[u8; 32], parent: &PublicKey) -> Result<Scalar> {
    let mut mac = HmacSha512::new_from_slice(secret)
        .map_err(|e| RpaError::Crypto(format!("hmac key: {e}")))?;
    mac.update(&parent.serialize());
    mac.update(&DERIVATION_INDEX.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let mut tweak = [0u8; 32];
    tweak.copy_from_slice(&digest[..32]);
    Scalar::from_be_bytes(tweak)
        .map_err(|_| RpaError::Crypto("derivation tweak out of range".into()))
}

/// Child public key of `parent` under chain code `secret`.
pub fn ckd_public_key<C: Verification>(
    secp: &Secp256k1<C>,
    parent: &PublicKey,
    secret: &[u8; 32],
) -> Result<PublicKey> {
    let tweak = derivation_tweak(secret, parent)?;
    Ok(parent.add_exp_tweak(secp, &tweak)?)
}

/// Child private key of `parent` under chain code `secret`.
pub fn ckd_private_key<C: Signing>(
    secp: &Secp256k1<C>,
    parent: &SecretKey,
    secret: &[u8; 32],
) -> Result<SecretKey> {
    let parent_pub = PublicKey::from_secret_key(secp, parent);
    let tweak = derivation_tweak(secret, &parent_pub)?;
    Ok(parent.add_tweak(&tweak)?)
}

/// The one-time receiving address for a payment: P2PKH over the hash of
/// the uncompressed child of the spend public key.
pub fn derive_payment_address<C: Verification>(
    secp: &Secp256k1<C>,
    spend_pubkey: &PublicKey,
    secret: &[u8; 32],
    network: Network,
) -> Result<Address> {
    let child = ckd_public_key(secp, spend_pubkey, secret)?;
    Ok(Address::from_pubkey(network, &child.serialize_uncompressed()))
}

/// The private key controlling [`derive_payment_address`]'s output,
/// exported as WIF.
pub fn derive_payment_private_key<C: Signing>(
    secp: &Secp256k1<C>,
    spend_privkey: &SecretKey,
    secret: &[u8; 32],
) -> Result<String> {
    let child = ckd_private_key(secp, spend_privkey, secret)?;
    Ok(private_key_to_wif(&child))
}

/// Base58Check WIF encoding, version byte 0x80, no compression flag.
pub fn private_key_to_wif(key: &SecretKey) -> String {
    let mut payload = Zeroizing::new([0u8; 33]);
    payload[0] = WIF_VERSION;
    payload[1..].copy_from_slice(&key.secret_bytes());
    bs58::encode(&payload[..]).with_check().into_string()
}

/// Parses a WIF string back into a private key.
pub fn wif_to_private_key(wif: &str) -> Result<SecretKey> {
    let decoded = Zeroizing::new(
        bs58::decode(wif)
            .with_check(Some(WIF_VERSION))
            .into_vec()
            .map_err(|e| RpaError::Format(format!("invalid WIF: {e}")))?,
    );
    if decoded.len() != 33 {
        return Err(RpaError::Format(format!(
            "WIF payload must be 33 bytes, got {}",
            decoded.len()
        )));
    }
    Ok(SecretKey::from_slice(&decoded[1..])?)
}
