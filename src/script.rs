//! NeoVM invocation script construction
//!
//! A contract call is encoded as:
//!
//! ```text
//! PUSH argN ... PUSH arg1   arguments in reverse order
//! PUSH N; PACK              collect them into one array
//! PUSH "method"             operation name
//! APPCALL <script hash>     20 bytes, little-endian
//! ```
//!
//! Several calls can be appended to one builder; their results land on the
//! evaluation stack in the same order.

use num_bigint::BigInt;

use crate::address::ScriptHash;

// ============================================================================
// Opcodes
// ============================================================================

pub mod opcode {
    pub const PUSH0: u8 = 0x00;
    pub const PUSHBYTES75: u8 = 0x4b;
    pub const PUSHDATA1: u8 = 0x4c;
    pub const PUSHDATA2: u8 = 0x4d;
    pub const PUSHDATA4: u8 = 0x4e;
    pub const PUSHM1: u8 = 0x4f;
    pub const PUSH1: u8 = 0x51;
    pub const APPCALL: u8 = 0x67;
    pub const CHECKSIG: u8 = 0xac;
    pub const PACK: u8 = 0xc1;
}

// ============================================================================
// Typed arguments
// ============================================================================

/// A contract argument; the tag decides how it is pushed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    ByteArray(Vec<u8>),
    Integer(BigInt),
}

impl TypedValue {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        TypedValue::ByteArray(bytes.into())
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        TypedValue::Integer(value.into())
    }
}

impl From<ScriptHash> for TypedValue {
    fn from(hash: ScriptHash) -> Self {
        TypedValue::ByteArray(hash.to_vec())
    }
}

/// One method call against one contract. Argument order is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    contract: ScriptHash,
    method: String,
    args: Vec<TypedValue>,
}

impl ContractCall {
    pub fn new(contract: ScriptHash, method: impl Into<String>, args: Vec<TypedValue>) -> Self {
        Self {
            contract,
            method: method.into(),
            args,
        }
    }

    pub fn contract(&self) -> &ScriptHash {
        &self.contract
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &[TypedValue] {
        &self.args
    }

    /// Script for this call alone
    pub fn to_script(&self) -> Vec<u8> {
        let mut builder = ScriptBuilder::new();
        builder.emit_app_call(self);
        builder.into_bytes()
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Default)]
pub struct ScriptBuilder {
    buf: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, op: u8) -> &mut Self {
        self.buf.push(op);
        self
    }

    pub fn emit_push_int(&mut self, value: &BigInt) -> &mut Self {
        match i64::try_from(value) {
            Ok(-1) => self.emit(opcode::PUSHM1),
            Ok(0) => self.emit(opcode::PUSH0),
            Ok(n @ 1..=16) => self.emit(opcode::PUSH1 + (n as u8) - 1),
            _ => self.emit_push_bytes(&value.to_signed_bytes_le()),
        }
    }

    pub fn emit_push_bytes(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len <= opcode::PUSHBYTES75 as usize {
            self.buf.push(len as u8);
        } else if len < 0x100 {
            self.buf.push(opcode::PUSHDATA1);
            self.buf.push(len as u8);
        } else if len < 0x1_0000 {
            self.buf.push(opcode::PUSHDATA2);
            self.buf.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.buf.push(opcode::PUSHDATA4);
            self.buf.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.buf.extend_from_slice(data);
        self
    }

    pub fn emit_push(&mut self, value: &TypedValue) -> &mut Self {
        match value {
            TypedValue::ByteArray(bytes) => self.emit_push_bytes(bytes),
            TypedValue::Integer(n) => self.emit_push_int(n),
        }
    }

    /// Append a full contract call
    pub fn emit_app_call(&mut self, call: &ContractCall) -> &mut Self {
        for arg in call.args.iter().rev() {
            self.emit_push(arg);
        }
        self.emit_push_int(&BigInt::from(call.args.len()));
        self.emit(opcode::PACK);
        self.emit_push_bytes(call.method.as_bytes());
        self.emit(opcode::APPCALL);
        self.buf.extend_from_slice(call.contract.as_bytes());
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
