//! Cashaddr-style base32 codec.
//!
//! Shared by P2PKH addresses (`bitcoincash:...`) and paycode tokens
//! (`paycode:...`). The payload is `type_tag || body` converted to 5-bit
//! groups, followed by the 40-bit BCH polymod checksum. Unlike the strict
//! cashaddr address format, the body length is not encoded in the tag byte;
//! callers validate the decoded length themselves.

use crate::error::{Result, RpaError};

const CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Encodes `type_tag || payload` under `prefix`, appending the checksum.
pub fn encode(prefix: &str, type_tag: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 1);
    data.push(type_tag);
    data.extend_from_slice(payload);
    // 8 -> 5 with padding never fails
    let converted = convert_bits(&data, 8, 5, true).expect("padding conversion is total");

    let checksum = compute_checksum(prefix, &converted);
    let mut out = format!("{prefix}:");
    for d in converted.iter().chain(checksum.iter()) {
        out.push(CHARSET[*d as usize] as char);
    }
    out
}

/// Decodes a token into `(prefix, type_tag, payload)`.
///
/// Fails with [`RpaError::ChecksumMismatch`] when the polymod does not
/// verify and [`RpaError::Format`] on any other malformation.
pub fn decode(token: &str) -> Result<(String, u8, Vec<u8>)> {
    let token = token.trim();
    let (prefix, body) = token
        .split_once(':')
        .ok_or_else(|| RpaError::Format("missing ':' separator".into()))?;
    let prefix = prefix.to_ascii_lowercase();
    if body.chars().any(|c| c.is_ascii_uppercase()) && body.chars().any(|c| c.is_ascii_lowercase())
    {
        return Err(RpaError::Format("mixed-case token".into()));
    }

    let mut data = Vec::with_capacity(body.len());
    for c in body.to_ascii_lowercase().bytes() {
        let v = CHARSET
            .iter()
            .position(|&x| x == c)
            .ok_or_else(|| RpaError::Format(format!("invalid base32 character '{}'", c as char)))?;
        data.push(v as u8);
    }
    if data.len() <= 8 {
        return Err(RpaError::Format("token too short".into()));
    }
    if polymod(expand_prefix(&prefix).into_iter().chain(data.iter().copied())) != 0 {
        return Err(RpaError::ChecksumMismatch);
    }

    let payload5 = &data[..data.len() - 8];
    let bytes = convert_bits(payload5, 5, 8, false)?;
    if bytes.is_empty() {
        return Err(RpaError::Format("empty payload".into()));
    }
    Ok((prefix, bytes[0], bytes[1..].to_vec()))
}

/// The 5 checksum bytes (40-bit value, big-endian) for a given payload.
///
/// The grinder hashes the paycode payload followed by these bytes.
pub fn checksum_bytes(prefix: &str, type_tag: u8, payload: &[u8]) -> [u8; 5] {
    let mut data = Vec::with_capacity(payload.len() + 1);
    data.push(type_tag);
    data.extend_from_slice(payload);
    let converted = convert_bits(&data, 8, 5, true).expect("padding conversion is total");
    let checksum = compute_checksum(prefix, &converted);

    let mut value: u64 = 0;
    for d in checksum {
        value = (value << 5) | d as u64;
    }
    let mut out = [0u8; 5];
    for (i, b) in out.iter_mut().enumerate() {
        *b = (value >> (8 * (4 - i))) as u8;
    }
    out
}

fn expand_prefix(prefix: &str) -> Vec<u8> {
    let mut v: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    v.push(0); // separator
    v
}

/// Eight 5-bit checksum digits for `prefix` and converted payload digits.
fn compute_checksum(prefix: &str, data: &[u8]) -> [u8; 8] {
    let template = expand_prefix(prefix)
        .into_iter()
        .chain(data.iter().copied())
        .chain(std::iter::repeat(0).take(8));
    let cs = polymod(template);
    let mut out = [0u8; 8];
    for (i, d) in out.iter_mut().enumerate() {
        *d = ((cs >> (5 * (7 - i))) & 0x1f) as u8;
    }
    out
}

fn polymod(values: impl Iterator<Item = u8>) -> u64 {
    let mut c: u64 = 1;
    for v in values {
        let b = c >> 35;
        c = ((c & 0x07_ffff_ffff) << 5) ^ v as u64;
        if b & 0x01 != 0 {
            c ^= 0x98_f2bc_8e61;
        }
        if b & 0x02 != 0 {
            c ^= 0x79_b76d_99e2;
        }
        if b & 0x04 != 0 {
            c ^= 0xf3_3e5f_b3c4;
        }
        if b & 0x08 != 0 {
            c ^= 0xae_2eab_2aed;
        }
        if b & 0x10 != 0 {
            c ^= 0x1e_4f43_755f;
        }
    }
    c ^ 1
}

fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Result<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let maxv: u32 = (1 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);
    for &value in data {
        if u32::from(value) >> from != 0 {
            return Err(RpaError::Format("value out of range for base conversion".into()));
        }
        acc = (acc << from) | u32::from(value);
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & maxv) as u8);
        }
    }
    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & maxv) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & maxv) != 0 {
        return Err(RpaError::Format("invalid padding bits".into()));
    }
    Ok(out)
}
