//! Invocation transaction construction and serialization
//!
//! Layout of the unsigned payload:
//!
//! ```text
//! | type 0xd1 | version 1 | script (var bytes) | gas (Fixed8) |
//! | attributes (var count) | inputs (0) | outputs (0) |
//! ```
//!
//! The signed transaction appends the witness list. The hash is
//! double SHA-256 of the unsigned payload and is displayed byte-reversed.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::address::ScriptHash;
use crate::error::LockProxyError;

const INVOCATION_TX_TYPE: u8 = 0xd1;
const INVOCATION_TX_VERSION: u8 = 1;

/// Attribute usage: additional script hash that must witness the transaction
const ATTR_SCRIPT: u8 = 0x20;
/// Attribute usage: free-form remark, carries the nonce
const ATTR_REMARK: u8 = 0xf0;

// ============================================================================
// Amounts and hashes
// ============================================================================

/// Fixed-point amount with 8 decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Fixed8(pub i64);

impl Fixed8 {
    pub const ZERO: Fixed8 = Fixed8(0);
}

impl fmt::Display for Fixed8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:08}", sign, abs / 100_000_000, abs % 100_000_000)
    }
}

/// Transaction identifier, stored in hash order (little-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    /// Big-endian hex, the form explorers and `gettransactionheight` use
    pub fn to_hex(&self) -> String {
        let mut be = self.0;
        be.reverse();
        hex::encode(be)
    }

    /// Parse the big-endian display form (optional 0x)
    pub fn from_hex(input: &str) -> crate::error::Result<Self> {
        let trimmed = input.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(body).map_err(|e| LockProxyError::format(input, e))?;
        let mut hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LockProxyError::format(input, "expected 32 bytes"))?;
        hash.reverse();
        Ok(TxHash(hash))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ============================================================================
// Witness
// ============================================================================

/// Invocation script (signature push) plus verification script (key + CHECKSIG)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub invocation_script: Vec<u8>,
    pub verification_script: Vec<u8>,
}

impl Witness {
    pub fn script_hash(&self) -> ScriptHash {
        ScriptHash::from_verification_script(&self.verification_script)
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// Unsigned invocation transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    script: Vec<u8>,
    sender: ScriptHash,
    system_fee: Fixed8,
    network_fee: Fixed8,
    nonce: u64,
}

impl Transaction {
    /// Zero-fee invocation with `sender` as both witness and fee payer
    pub fn invocation(script: Vec<u8>, sender: ScriptHash, nonce: u64) -> Self {
        Self {
            script,
            sender,
            system_fee: Fixed8::ZERO,
            network_fee: Fixed8::ZERO,
            nonce,
        }
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn sender(&self) -> &ScriptHash {
        &self.sender
    }

    pub fn system_fee(&self) -> Fixed8 {
        self.system_fee
    }

    /// Network fee is implied by inputs minus outputs; with neither it is zero
    pub fn network_fee(&self) -> Fixed8 {
        self.network_fee
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Payload covered by the signature
    pub fn unsigned_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.script.len() + 64);
        out.push(INVOCATION_TX_TYPE);
        out.push(INVOCATION_TX_VERSION);
        write_var_bytes(&mut out, &self.script);
        out.extend_from_slice(&self.system_fee.0.to_le_bytes());

        write_var_int(&mut out, 2);
        out.push(ATTR_SCRIPT);
        out.extend_from_slice(self.sender.as_bytes());
        out.push(ATTR_REMARK);
        write_var_bytes(&mut out, &self.nonce.to_le_bytes());

        // inputs, outputs
        write_var_int(&mut out, 0);
        write_var_int(&mut out, 0);
        out
    }

    pub fn hash(&self) -> TxHash {
        let first = Sha256::digest(self.unsigned_bytes());
        let second = Sha256::digest(first);
        let mut out = [0u8; 32];
        out.copy_from_slice(&second);
        TxHash(out)
    }

    pub fn into_signed(self, witness: Witness) -> SignedTransaction {
        let hash = self.hash();
        SignedTransaction {
            tx: self,
            witness,
            hash,
        }
    }
}

/// Transaction with its witness attached; immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: Transaction,
    witness: Witness,
    hash: TxHash,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn witness(&self) -> &Witness {
        &self.witness
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.tx.unsigned_bytes();
        write_var_int(&mut out, 1);
        write_var_bytes(&mut out, &self.witness.invocation_script);
        write_var_bytes(&mut out, &self.witness.verification_script);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

pub(crate) fn write_var_int(out: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

pub(crate) fn write_var_bytes(out: &mut Vec<u8>, data: &[u8]) {
    write_var_int(out, data.len() as u64);
    out.extend_from_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction::invocation(vec![0x00, 0xc1], ScriptHash([0x22; 20]), 42)
    }

    #[test]
    fn test_unsigned_layout() {
        let bytes = sample().unsigned_bytes();
        assert_eq!(&bytes[..2], &[0xd1, 0x01]);
        // script length + script
        assert_eq!(&bytes[2..5], &[0x02, 0x00, 0xc1]);
        // zero gas
        assert_eq!(&bytes[5..13], &[0u8; 8]);
        // two attributes, script attribute first
        assert_eq!(bytes[13], 2);
        assert_eq!(bytes[14], ATTR_SCRIPT);
        assert_eq!(&bytes[15..35], &[0x22; 20]);
        assert_eq!(bytes[35], ATTR_REMARK);
        assert_eq!(bytes[36], 8);
        // no inputs, no outputs
        assert_eq!(&bytes[bytes.len() - 2..], &[0, 0]);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(sample().hash(), sample().hash());
        let other = Transaction::invocation(vec![0x00, 0xc1], ScriptHash([0x22; 20]), 43);
        assert_ne!(sample().hash(), other.hash());
    }

    #[test]
    fn test_hash_display_is_reversed() {
        let hash = TxHash({
            let mut b = [0u8; 32];
            b[0] = 0xab;
            b
        });
        assert!(hash.to_hex().ends_with("ab"));
        assert_eq!(hash.to_hex().len(), 64);
    }

    #[test]
    fn test_signed_appends_witness() {
        let tx = sample();
        let unsigned_len = tx.unsigned_bytes().len();
        let hash = tx.hash();
        let signed = tx.into_signed(Witness {
            invocation_script: vec![0x40; 65],
            verification_script: vec![0x21; 35],
        });
        assert_eq!(signed.hash(), hash);
        assert_eq!(signed.transaction().nonce(), 42);
        assert_eq!(signed.witness().invocation_script.len(), 65);
        let bytes = signed.to_bytes();
        assert_eq!(bytes.len(), unsigned_len + 1 + 1 + 65 + 1 + 35);
        assert_eq!(bytes[unsigned_len], 1);
    }

    #[test]
    fn test_var_int_boundaries() {
        let mut out = Vec::new();
        write_var_int(&mut out, 0xfc);
        assert_eq!(out, vec![0xfc]);

        let mut out = Vec::new();
        write_var_int(&mut out, 0xfd);
        assert_eq!(out, vec![0xfd, 0xfd, 0x00]);

        let mut out = Vec::new();
        write_var_int(&mut out, 0x1_0000);
        assert_eq!(out, vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_fixed8_display() {
        assert_eq!(Fixed8::ZERO.to_string(), "0.00000000");
        assert_eq!(Fixed8(150_000_000).to_string(), "1.50000000");
    }

    #[test]
    fn test_tx_hash_parses_display_form() {
        let hash = sample().hash();
        assert_eq!(TxHash::from_hex(&hash.to_hex()).unwrap(), hash);
        assert_eq!(
            TxHash::from_hex(&format!("0x{}", hash)).unwrap(),
            hash
        );
        assert!(TxHash::from_hex("abcd").is_err());
        assert!(TxHash::from_hex(&format!("0x0x{}", hash)).is_err());
    }
}
