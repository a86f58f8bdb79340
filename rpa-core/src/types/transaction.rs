//! Transaction model and wire codec.
//!
//! Just enough of the BCH transaction format for the RPA protocol: the
//! builder needs to re-sign and re-serialize a single input during
//! grinding, and the scanner needs to walk the inputs and outputs of an
//! arbitrary raw transaction. Coin selection and fee logic live behind the
//! [`TransactionConstructor`](crate::traits::TransactionConstructor)
//! collaborator and never touch this module.

use secp256k1::PublicKey;

use crate::error::{Result, RpaError};
use crate::hash::sha256d;

/// The (txid, output index) pair identifying a spent coin.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutPoint {
    /// Funding transaction id, display-order hex.
    pub txid: String,
    /// Output index in the funding transaction.
    pub vout: u32,
}

impl OutPoint {
    /// The identifier string both parties hash into the shared secret:
    /// txid hex immediately followed by the decimal output index, no
    /// separator.
    pub fn rpa_identifier(&self) -> String {
        format!("{}{}", self.txid, self.vout)
    }

    /// 36-byte wire form: little-endian txid then LE index.
    pub fn to_wire(&self) -> Result<[u8; 36]> {
        let mut txid = hex::decode(&self.txid)?;
        if txid.len() != 32 {
            return Err(RpaError::Transaction("txid must be 32 bytes".into()));
        }
        txid.reverse();
        let mut out = [0u8; 36];
        out[..32].copy_from_slice(&txid);
        out[32..].copy_from_slice(&self.vout.to_le_bytes());
        Ok(out)
    }
}

/// A transaction input.
///
/// `value` and `pubkey` are signing metadata supplied by the transaction
/// constructor for coins the wallet owns; they are not part of the wire
/// format and are absent on deserialized transactions.
#[derive(Clone, Debug)]
pub struct TxInput {
    /// The coin being spent.
    pub prevout: OutPoint,
    /// Unlocking script; empty until signed.
    pub script_sig: Vec<u8>,
    /// Sequence number.
    pub sequence: u32,
    /// Value of the spent coin in satoshis (BIP143 signing commits to it).
    pub value: u64,
    /// Compressed public key owning the coin.
    pub pubkey: Option<PublicKey>,
}

impl TxInput {
    /// An unsigned input spending `prevout`.
    pub fn new(prevout: OutPoint, value: u64, pubkey: PublicKey) -> Self {
        Self {
            prevout,
            script_sig: Vec::new(),
            sequence: 0xffff_ffff,
            value,
            pubkey: Some(pubkey),
        }
    }

    /// Wire serialization of this single input. The grinder double-hashes
    /// this to test the discoverability prefix.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(36 + 5 + self.script_sig.len() + 4);
        buf.extend_from_slice(&self.prevout.to_wire()?);
        write_varint(&mut buf, self.script_sig.len() as u64);
        buf.extend_from_slice(&self.script_sig);
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        Ok(buf)
    }
}

/// A transaction output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    /// Amount in satoshis.
    pub value: u64,
    /// Locking script.
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9 + self.script_pubkey.len());
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_varint(&mut buf, self.script_pubkey.len() as u64);
        buf.extend_from_slice(&self.script_pubkey);
        buf
    }
}

/// A transaction.
#[derive(Clone, Debug, Default)]
pub struct Transaction {
    /// Format version.
    pub version: u32,
    /// Inputs.
    pub inputs: Vec<TxInput>,
    /// Outputs.
    pub outputs: Vec<TxOutput>,
    /// Lock time.
    pub locktime: u32,
}

impl Transaction {
    /// An empty version-1 transaction.
    pub fn new() -> Self {
        Self {
            version: 1,
            ..Default::default()
        }
    }

    /// Full wire serialization.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(10 + self.inputs.len() * 150 + self.outputs.len() * 34);
        buf.extend_from_slice(&self.version.to_le_bytes());
        write_varint(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(&input.to_wire()?);
        }
        write_varint(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            buf.extend_from_slice(&output.to_wire());
        }
        buf.extend_from_slice(&self.locktime.to_le_bytes());
        Ok(buf)
    }

    /// Wire serialization as lowercase hex.
    pub fn to_hex(&self) -> Result<String> {
        Ok(hex::encode(self.to_wire()?))
    }

    /// Parses a raw transaction from hex.
    pub fn from_hex(raw: &str) -> Result<Self> {
        Self::from_wire(&hex::decode(raw.trim())?)
    }

    /// Parses a raw transaction from wire bytes.
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let version = u32::from_le_bytes(r.take_array()?);
        let n_inputs = r.take_varint()?;
        let mut inputs = Vec::with_capacity(n_inputs.min(1024) as usize);
        for _ in 0..n_inputs {
            let mut txid: [u8; 32] = r.take_array()?;
            txid.reverse();
            let vout = u32::from_le_bytes(r.take_array()?);
            let script_len = r.take_varint()?;
            let script_sig = r.take_bytes(script_len)?.to_vec();
            let sequence = u32::from_le_bytes(r.take_array()?);
            inputs.push(TxInput {
                prevout: OutPoint {
                    txid: hex::encode(txid),
                    vout,
                },
                script_sig,
                sequence,
                value: 0,
                pubkey: None,
            });
        }
        let n_outputs = r.take_varint()?;
        let mut outputs = Vec::with_capacity(n_outputs.min(1024) as usize);
        for _ in 0..n_outputs {
            let value = u64::from_le_bytes(r.take_array()?);
            let script_len = r.take_varint()?;
            let script_pubkey = r.take_bytes(script_len)?.to_vec();
            outputs.push(TxOutput {
                value,
                script_pubkey,
            });
        }
        let locktime = u32::from_le_bytes(r.take_array()?);
        if !r.is_empty() {
            return Err(RpaError::Transaction("trailing bytes after transaction".into()));
        }
        Ok(Self {
            version,
            inputs,
            outputs,
            locktime,
        })
    }

    /// Display-order txid of the serialized transaction.
    pub fn txid(&self) -> Result<String> {
        let mut digest = sha256d(&self.to_wire()?);
        digest.reverse();
        Ok(hex::encode(digest))
    }

    /// BIP143 signature hash for `input_index` under `script_code`.
    ///
    /// SIGHASH_ALL | FORKID only; `value` is the spent coin's amount.
    pub fn sighash(
        &self,
        input_index: usize,
        script_code: &[u8],
        value: u64,
        hash_type: u32,
    ) -> Result<[u8; 32]> {
        let input = self
            .inputs
            .get(input_index)
            .ok_or_else(|| RpaError::Transaction(format!("no input {input_index}")))?;

        let mut prevouts = Vec::with_capacity(self.inputs.len() * 36);
        let mut sequences = Vec::with_capacity(self.inputs.len() * 4);
        for i in &self.inputs {
            prevouts.extend_from_slice(&i.prevout.to_wire()?);
            sequences.extend_from_slice(&i.sequence.to_le_bytes());
        }
        let mut outputs = Vec::new();
        for o in &self.outputs {
            outputs.extend_from_slice(&o.to_wire());
        }

        let mut buf = Vec::with_capacity(156 + script_code.len());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&sha256d(&prevouts));
        buf.extend_from_slice(&sha256d(&sequences));
        buf.extend_from_slice(&input.prevout.to_wire()?);
        write_varint(&mut buf, script_code.len() as u64);
        buf.extend_from_slice(script_code);
        buf.extend_from_slice(&value.to_le_bytes());
        buf.extend_from_slice(&input.sequence.to_le_bytes());
        buf.extend_from_slice(&sha256d(&outputs));
        buf.extend_from_slice(&self.locktime.to_le_bytes());
        buf.extend_from_slice(&hash_type.to_le_bytes());
        Ok(sha256d(&buf))
    }

    /// Deterministic input/output ordering (BIP69 / LI01): inputs by
    /// (txid, vout), outputs by (value, script).
    pub fn sort_deterministic(&mut self) {
        self.inputs
            .sort_by(|a, b| (&a.prevout.txid, a.prevout.vout).cmp(&(&b.prevout.txid, b.prevout.vout)));
        self.outputs
            .sort_by(|a, b| (a.value, &a.script_pubkey).cmp(&(b.value, &b.script_pubkey)));
    }
}

fn write_varint(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take_bytes(&mut self, n: u64) -> Result<&'a [u8]> {
        // scripts and counts in real transactions never approach this
        if n > 1_000_000 {
            return Err(RpaError::Transaction("oversized field".into()));
        }
        let n = n as usize;
        let end = self
            .pos
            .checked_add(n)
            .filter(|&e| e <= self.data.len())
            .ok_or_else(|| RpaError::Transaction("truncated transaction".into()))?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.take_bytes(N as u64)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn take_varint(&mut self) -> Result<u64> {
        let first = self.take_array::<1>()?[0];
        Ok(match first {
            0..=0xfc => first as u64,
            0xfd => u16::from_le_bytes(self.take_array()?) as u64,
            0xfe => u32::from_le_bytes(self.take_array()?) as u64,
            0xff => u64::from_le_bytes(self.take_array()?),
        })
    }
}
