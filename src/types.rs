//! Type vocabulary for native calls.
//!
//! Defines the closed set of primitive type tags, the high-level value
//! enum passed across the facade, and declared method signatures.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Primitive type tags understood by the bridge.
///
/// The set is closed: every tag fixes exactly one encoding and one decoding
/// rule, dispatched by exhaustive `match`. Unknown tags are unrepresentable
/// by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 32-bit floating point
    F32,
    /// 64-bit floating point
    F64,
    /// No value; valid only as a return tag
    Void,
    /// Single-byte character; normalized to `U8` during encoding
    Char,
    /// Native string; the bridge owns C-string conversion
    Str,
    /// Pointer to bytes, decoded with a declared length
    Ptr,
    /// Raw address, transmitted by the bridge as hexadecimal text
    RawPtr,
}

impl TypeTag {
    /// Wire name of this tag.
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::U8 => "u8",
            TypeTag::U16 => "u16",
            TypeTag::U32 => "u32",
            TypeTag::U64 => "u64",
            TypeTag::I8 => "i8",
            TypeTag::I16 => "i16",
            TypeTag::I32 => "i32",
            TypeTag::I64 => "i64",
            TypeTag::F32 => "f32",
            TypeTag::F64 => "f64",
            TypeTag::Void => "void",
            TypeTag::Char => "char",
            TypeTag::Str => "str",
            TypeTag::Ptr => "ptr",
            TypeTag::RawPtr => "raw_ptr",
        }
    }

    /// Check if this tag is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            TypeTag::U8
                | TypeTag::U16
                | TypeTag::U32
                | TypeTag::U64
                | TypeTag::I8
                | TypeTag::I16
                | TypeTag::I32
                | TypeTag::I64
        )
    }

    /// Check if this tag is a floating point type.
    pub fn is_float(&self) -> bool {
        matches!(self, TypeTag::F32 | TypeTag::F64)
    }

    /// Check if this tag is a pointer type.
    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeTag::Ptr | TypeTag::RawPtr)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value passed to or returned from a native call.
///
/// Serialized untagged, so descriptors carry plain primitives on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value
    Void,
    /// Unsigned integer (covers all unsigned widths and addresses)
    UInt(u64),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Owned text
    Str(String),
    /// Owned byte buffer (caller-serialized structs, pointer reads)
    Bytes(Vec<u8>),
}

impl Value {
    /// Shape name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::UInt(_) | Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Check if this is a void value.
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    /// Extract an unsigned integer, converting from `Int` when non-negative.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    /// Extract a signed integer, converting from `UInt` when it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) if *v <= i64::MAX as u64 => Some(*v as i64),
            _ => None,
        }
    }

    /// Extract a float, widening from integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Borrow the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the contents of a byte value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

/// Return specification: a bare tag, or a pointer return with a declared
/// byte length for structs returned by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReturnSpec {
    /// Plain tagged return.
    Tag(TypeTag),
    /// Pointer return decoded as exactly `len` bytes.
    Buffer { len: usize },
}

impl ReturnSpec {
    /// The wire tag submitted in the descriptor.
    pub fn tag(&self) -> TypeTag {
        match self {
            ReturnSpec::Tag(tag) => *tag,
            ReturnSpec::Buffer { .. } => TypeTag::Ptr,
        }
    }

    /// Declared byte length for buffer returns.
    pub fn declared_len(&self) -> Option<usize> {
        match self {
            ReturnSpec::Tag(_) => None,
            ReturnSpec::Buffer { len } => Some(*len),
        }
    }
}

impl Default for ReturnSpec {
    fn default() -> Self {
        ReturnSpec::Tag(TypeTag::Void)
    }
}

impl From<TypeTag> for ReturnSpec {
    fn from(tag: TypeTag) -> Self {
        ReturnSpec::Tag(tag)
    }
}

/// Declared signature of one native function: ordered parameter tags plus
/// a return specification. Arity is fixed at definition time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSig {
    /// Parameter type tags, in call order.
    pub params: Vec<TypeTag>,
    /// Return specification.
    #[serde(default)]
    pub returns: ReturnSpec,
}

impl MethodSig {
    /// Create a signature.
    pub fn new(params: Vec<TypeTag>, returns: impl Into<ReturnSpec>) -> Self {
        Self {
            params,
            returns: returns.into(),
        }
    }

    /// Signature with no parameters.
    pub fn nullary(returns: impl Into<ReturnSpec>) -> Self {
        Self::new(Vec::new(), returns)
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Name → signature mapping attached to exactly one library handle.
///
/// Built up front with [`MethodTable::define`] and immutable once the
/// handle exists; names are unique (later definitions replace earlier
/// ones). Never validated against the library's actual exports;
/// unresolved symbols surface only at call time.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    methods: HashMap<String, MethodSig>,
}

impl MethodTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method definition, consuming and returning the table so
    /// definitions chain.
    pub fn define(mut self, name: impl Into<String>, sig: MethodSig) -> Self {
        self.methods.insert(name.into(), sig);
        self
    }

    /// Look up a signature by method name.
    pub fn get(&self, name: &str) -> Option<&MethodSig> {
        self.methods.get(name)
    }

    /// Number of defined methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Check if the table has no definitions.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Iterate defined method names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(|s| s.as_str())
    }
}
