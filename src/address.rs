//! NEO Address Codec
//!
//! Normalizes the address spellings an operator may type into the 20-byte
//! script hash the NeoVM works with.
//!
//! ## Accepted Formats
//!
//! ```text
//! 0x17da3881ab2d050fea414c80b3fa8324d756f60e   big-endian display hex (reversed on parse)
//! 0ef656d72483fab3804c41ea0f052dab8138da17     raw little-endian hex (taken as-is)
//! AKkkumHbBipZ46UMZJoFynJMXzSRnBvKcs           base58check, version byte 0x17
//! ```
//!
//! Script hashes are always stored little-endian, which is the order they
//! appear in invocation scripts and on the evaluation stack.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{LockProxyError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Address version byte for NEO legacy addresses
pub const ADDRESS_VERSION: u8 = 0x17;

/// Script hash length in bytes
pub const SCRIPT_HASH_LEN: usize = 20;

/// Length of a base58 NEO address string
const BASE58_ADDRESS_LEN: usize = 34;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

// ============================================================================
// Script Hash
// ============================================================================

/// 20-byte contract or account identifier in little-endian order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScriptHash(pub [u8; SCRIPT_HASH_LEN]);

impl ScriptHash {
    /// The all-zero hash, used as the signer context for dry-run reads
    pub const ZERO: ScriptHash = ScriptHash([0u8; SCRIPT_HASH_LEN]);

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SCRIPT_HASH_LEN {
            return Err(LockProxyError::format(
                hex::encode(bytes),
                format!(
                    "expected {} bytes, got {}",
                    SCRIPT_HASH_LEN,
                    bytes.len()
                ),
            ));
        }
        let mut out = [0u8; SCRIPT_HASH_LEN];
        out.copy_from_slice(bytes);
        Ok(ScriptHash(out))
    }

    /// Hash of a verification script: RIPEMD-160(SHA-256(script))
    pub fn from_verification_script(script: &[u8]) -> Self {
        let sha = Sha256::digest(script);
        let digest = Ripemd160::digest(sha);
        let mut out = [0u8; SCRIPT_HASH_LEN];
        out.copy_from_slice(&digest);
        ScriptHash(out)
    }

    pub fn as_bytes(&self) -> &[u8; SCRIPT_HASH_LEN] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Raw little-endian hex, as it appears on the stack
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Big-endian hex without prefix, as the RPC node expects for `getstorage`
    pub fn to_display_hex(&self) -> String {
        let mut be = self.0;
        be.reverse();
        hex::encode(be)
    }

    /// Base58check address with version 0x17
    pub fn to_address(&self) -> String {
        let mut payload = Vec::with_capacity(SCRIPT_HASH_LEN + 1);
        payload.push(ADDRESS_VERSION);
        payload.extend_from_slice(&self.0);
        bs58::encode(payload).with_check().into_string()
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_display_hex())
    }
}

impl From<[u8; SCRIPT_HASH_LEN]> for ScriptHash {
    fn from(bytes: [u8; SCRIPT_HASH_LEN]) -> Self {
        ScriptHash(bytes)
    }
}

// ============================================================================
// Tagged Input
// ============================================================================

/// An address string together with the format it is written in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressInput<'a> {
    /// `0x`-prefixed big-endian display hex
    HexBigEndian(&'a str),
    /// Base58check address
    Base58(&'a str),
    /// Little-endian hex, no prefix
    HexRaw(&'a str),
}

impl<'a> AddressInput<'a> {
    /// Classify by exact grammar; anything ambiguous or malformed is rejected
    pub fn classify(input: &'a str) -> Result<Self> {
        let s = input.trim();
        if let Some(body) = s.strip_prefix("0x") {
            if body.len() == SCRIPT_HASH_LEN * 2 && is_hex(body) {
                return Ok(AddressInput::HexBigEndian(s));
            }
            return Err(LockProxyError::format(
                input,
                "0x prefix must be followed by exactly 40 hex characters",
            ));
        }
        if s.len() == SCRIPT_HASH_LEN * 2 && is_hex(s) {
            return Ok(AddressInput::HexRaw(s));
        }
        if s.len() == BASE58_ADDRESS_LEN
            && s.starts_with('A')
            && s.chars().all(|c| BASE58_ALPHABET.contains(c))
        {
            return Ok(AddressInput::Base58(s));
        }
        Err(LockProxyError::format(
            input,
            "not a 0x-hex, raw hex or base58 NEO address",
        ))
    }

    pub fn decode(&self) -> Result<ScriptHash> {
        match self {
            AddressInput::HexBigEndian(s) => decode_hex_big_endian(s),
            AddressInput::Base58(s) => decode_base58(s),
            AddressInput::HexRaw(s) => decode_hex_raw(s),
        }
    }
}

/// Parse an address with the strict grammar of [`AddressInput::classify`]
pub fn parse(input: &str) -> Result<ScriptHash> {
    AddressInput::classify(input)?.decode()
}

/// Parse with the legacy substring heuristic.
///
/// Checked in order: contains "0x" (reversed hex), contains 'A' (base58),
/// otherwise raw hex. A raw hex string containing an uppercase 'A' is routed
/// to base58 and fails, so [`parse`] should be preferred.
pub fn parse_heuristic(input: &str) -> Result<ScriptHash> {
    if input.contains("0x") {
        decode_hex_big_endian(input)
    } else if input.contains('A') {
        decode_base58(input)
    } else {
        decode_hex_raw(input)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn is_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}

fn decode_hex_big_endian(input: &str) -> Result<ScriptHash> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let mut bytes = hex::decode(body).map_err(|e| LockProxyError::format(input, e))?;
    bytes.reverse();
    ScriptHash::from_slice(&bytes).map_err(|_| {
        LockProxyError::format(
            input,
            format!("expected {} bytes, got {}", SCRIPT_HASH_LEN, bytes.len()),
        )
    })
}

fn decode_hex_raw(input: &str) -> Result<ScriptHash> {
    let bytes = hex::decode(input.trim()).map_err(|e| LockProxyError::format(input, e))?;
    ScriptHash::from_slice(&bytes).map_err(|_| {
        LockProxyError::format(
            input,
            format!("expected {} bytes, got {}", SCRIPT_HASH_LEN, bytes.len()),
        )
    })
}

fn decode_base58(input: &str) -> Result<ScriptHash> {
    let data = bs58::decode(input.trim())
        .with_check(None)
        .into_vec()
        .map_err(|e| LockProxyError::format(input, e))?;

    if data.len() != SCRIPT_HASH_LEN + 1 {
        return Err(LockProxyError::format(
            input,
            format!("decoded payload is {} bytes, expected 21", data.len()),
        ));
    }
    if data[0] != ADDRESS_VERSION {
        return Err(LockProxyError::format(
            input,
            format!("unexpected address version 0x{:02x}", data[0]),
        ));
    }
    ScriptHash::from_slice(&data[1..])
}

/// Decode a hex argument (with or without 0x) into raw bytes, no reversal
pub fn decode_hex_bytes(input: &str) -> Result<Vec<u8>> {
    let body = input.trim().strip_prefix("0x").unwrap_or(input.trim());
    hex::decode(body).map_err(|e| LockProxyError::format(input, e))
}
