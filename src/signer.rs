//! Transaction signing
//!
//! The invoker only needs two things from key material: the account address
//! and a witness for a transaction. [`TxSigner`] is that seam; [`WifSigner`]
//! backs it with a secp256r1 key imported from WIF.

use p256::ecdsa::{signature::Signer, Signature, SigningKey, VerifyingKey};
use std::fmt;
use tracing::info;

use crate::address::ScriptHash;
use crate::error::{LockProxyError, Result};
use crate::script::opcode;
use crate::transaction::{Transaction, Witness};

/// WIF payload: 0x80 | 32-byte key | 0x01 (compressed)
const WIF_PREFIX: u8 = 0x80;
const WIF_COMPRESSED_FLAG: u8 = 0x01;
const WIF_PAYLOAD_LEN: usize = 34;

/// Push opcode for a 64-byte signature
const PUSHBYTES64: u8 = 0x40;
/// Push opcode for a 33-byte compressed public key
const PUSHBYTES33: u8 = 0x21;

/// Signer capability consumed by the contract invoker
pub trait TxSigner: Send + Sync {
    /// Base58 account address
    fn address(&self) -> String;

    /// Produce the witness authorizing `tx`
    fn sign(&self, tx: &Transaction) -> Result<Witness>;
}

/// Single-signature account backed by a secp256r1 private key
pub struct WifSigner {
    signing_key: SigningKey,
    verification_script: Vec<u8>,
    script_hash: ScriptHash,
}

impl fmt::Debug for WifSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifSigner")
            .field("address", &self.script_hash.to_address())
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

impl WifSigner {
    /// Import from a WIF string
    pub fn from_wif(wif: &str) -> Result<Self> {
        let payload = bs58::decode(wif.trim())
            .with_check(None)
            .into_vec()
            .map_err(|e| LockProxyError::Signing(format!("Invalid WIF: {}", e)))?;

        if payload.len() != WIF_PAYLOAD_LEN
            || payload[0] != WIF_PREFIX
            || payload[WIF_PAYLOAD_LEN - 1] != WIF_COMPRESSED_FLAG
        {
            return Err(LockProxyError::Signing(
                "Invalid WIF: expected compressed secp256r1 key".to_string(),
            ));
        }

        Self::from_key_bytes(&payload[1..33])
    }

    /// Import from a raw 32-byte private key
    pub fn from_key_bytes(key: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(key)
            .map_err(|e| LockProxyError::Signing(format!("Invalid private key: {}", e)))?;

        let verification_script = verification_script(signing_key.verifying_key());
        let script_hash = ScriptHash::from_verification_script(&verification_script);

        info!(address = %script_hash.to_address(), "NEO signer initialized");

        Ok(Self {
            signing_key,
            verification_script,
            script_hash,
        })
    }

    pub fn script_hash(&self) -> ScriptHash {
        self.script_hash
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Export back to WIF
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(WIF_PAYLOAD_LEN);
        payload.push(WIF_PREFIX);
        payload.extend_from_slice(&self.signing_key.to_bytes());
        payload.push(WIF_COMPRESSED_FLAG);
        bs58::encode(payload).with_check().into_string()
    }
}

impl TxSigner for WifSigner {
    fn address(&self) -> String {
        self.script_hash.to_address()
    }

    fn sign(&self, tx: &Transaction) -> Result<Witness> {
        let signature: Signature = self.signing_key.sign(&tx.unsigned_bytes());

        let mut invocation_script = Vec::with_capacity(65);
        invocation_script.push(PUSHBYTES64);
        invocation_script.extend_from_slice(&signature.to_bytes());

        Ok(Witness {
            invocation_script,
            verification_script: self.verification_script.clone(),
        })
    }
}

/// `PUSHBYTES33 <compressed pubkey> CHECKSIG`
fn verification_script(key: &VerifyingKey) -> Vec<u8> {
    let point = key.to_encoded_point(true);
    let mut script = Vec::with_capacity(35);
    script.push(PUSHBYTES33);
    script.extend_from_slice(point.as_bytes());
    script.push(opcode::CHECKSIG);
    script
}
