//! Per-tag argument encoding and result decoding.
//!
//! Each type tag fixes exactly one encoding rule (argument → bridge-ready
//! value) and one decoding rule (bridge payload → caller value). Both
//! directions dispatch by exhaustive `match`; there is no default arm to
//! fall through.

use crate::error::{Error, Result};
use crate::types::{ReturnSpec, TypeTag, Value};

/// Encode one argument for its declared tag, returning the wire tag and
/// the bridge-ready value.
///
/// `Char` accepts a numeric code point or a single-byte text value and is
/// rewritten to `U8` in the descriptor. Integer values must fit their
/// declared width; the encoder fails fast rather than truncating.
pub fn encode_arg(tag: TypeTag, value: &Value) -> Result<(TypeTag, Value)> {
    match tag {
        TypeTag::U8 => Ok((tag, Value::UInt(unsigned_in_range(tag, value, u8::MAX as u64)?))),
        TypeTag::U16 => Ok((tag, Value::UInt(unsigned_in_range(tag, value, u16::MAX as u64)?))),
        TypeTag::U32 => Ok((tag, Value::UInt(unsigned_in_range(tag, value, u32::MAX as u64)?))),
        TypeTag::U64 => Ok((tag, Value::UInt(unsigned_in_range(tag, value, u64::MAX)?))),
        TypeTag::I8 => Ok((
            tag,
            Value::Int(signed_in_range(tag, value, i8::MIN as i64, i8::MAX as i64)?),
        )),
        TypeTag::I16 => Ok((
            tag,
            Value::Int(signed_in_range(tag, value, i16::MIN as i64, i16::MAX as i64)?),
        )),
        TypeTag::I32 => Ok((
            tag,
            Value::Int(signed_in_range(tag, value, i32::MIN as i64, i32::MAX as i64)?),
        )),
        TypeTag::I64 => Ok((tag, Value::Int(signed_in_range(tag, value, i64::MIN, i64::MAX)?))),
        TypeTag::F32 | TypeTag::F64 => {
            let v = value.as_f64().ok_or_else(|| mismatch(tag, value))?;
            Ok((tag, Value::Float(v)))
        }
        TypeTag::Char => encode_char(value),
        TypeTag::Str => match value {
            Value::Str(s) => Ok((tag, Value::Str(s.clone()))),
            other => Err(mismatch(tag, other)),
        },
        TypeTag::Ptr => match value {
            Value::Bytes(b) => Ok((tag, Value::Bytes(b.clone()))),
            other => Err(mismatch(tag, other)),
        },
        TypeTag::RawPtr => {
            // Opaque address; passed through as an unsigned integer.
            let addr = value.as_u64().ok_or_else(|| mismatch(tag, value))?;
            Ok((tag, Value::UInt(addr)))
        }
        TypeTag::Void => Err(mismatch(tag, value)),
    }
}

fn encode_char(value: &Value) -> Result<(TypeTag, Value)> {
    match value {
        Value::Str(s) => {
            if s.len() != 1 {
                return Err(Error::CharLength { actual: s.len() });
            }
            Ok((TypeTag::U8, Value::UInt(s.as_bytes()[0] as u64)))
        }
        Value::UInt(_) | Value::Int(_) => {
            let code = unsigned_in_range(TypeTag::Char, value, u8::MAX as u64)?;
            Ok((TypeTag::U8, Value::UInt(code)))
        }
        other => Err(mismatch(TypeTag::Char, other)),
    }
}

fn unsigned_in_range(tag: TypeTag, value: &Value, max: u64) -> Result<u64> {
    let v = match value {
        Value::UInt(v) => *v as i128,
        Value::Int(v) => *v as i128,
        other => return Err(mismatch(tag, other)),
    };
    if v < 0 || v > max as i128 {
        return Err(Error::IntRange { value: v, tag });
    }
    Ok(v as u64)
}

fn signed_in_range(tag: TypeTag, value: &Value, min: i64, max: i64) -> Result<i64> {
    let v = match value {
        Value::UInt(v) => *v as i128,
        Value::Int(v) => *v as i128,
        other => return Err(mismatch(tag, other)),
    };
    if v < min as i128 || v > max as i128 {
        return Err(Error::IntRange { value: v, tag });
    }
    Ok(v as i64)
}

fn mismatch(tag: TypeTag, value: &Value) -> Error {
    Error::TypeMismatch {
        tag,
        got: value.kind(),
    }
}

/// Decode a success payload according to the declared return spec.
///
/// Applied only after the bridge's envelope reported success. A payload
/// whose shape does not match the declared tag is a malformed response.
pub fn decode_return(spec: &ReturnSpec, payload: Value) -> Result<Value> {
    match spec {
        ReturnSpec::Buffer { len } => decode_buffer(*len, payload),
        ReturnSpec::Tag(tag) => match tag {
            TypeTag::Void => Ok(Value::Void),
            TypeTag::U8 | TypeTag::U16 | TypeTag::U32 | TypeTag::U64 | TypeTag::Char => {
                let v = payload
                    .as_u64()
                    .ok_or_else(|| malformed(*tag, &payload))?;
                Ok(Value::UInt(v))
            }
            TypeTag::I8 | TypeTag::I16 | TypeTag::I32 | TypeTag::I64 => {
                let v = payload
                    .as_i64()
                    .ok_or_else(|| malformed(*tag, &payload))?;
                Ok(Value::Int(v))
            }
            TypeTag::F32 | TypeTag::F64 => {
                let v = payload
                    .as_f64()
                    .ok_or_else(|| malformed(*tag, &payload))?;
                Ok(Value::Float(v))
            }
            TypeTag::Str => match payload {
                Value::Str(s) => Ok(Value::Str(s)),
                other => Err(malformed(TypeTag::Str, &other)),
            },
            // Bare pointer return without a declared length: the bridge's
            // decoding is passed through unchanged.
            TypeTag::Ptr => Ok(payload),
            TypeTag::RawPtr => decode_raw_ptr(payload),
        },
    }
}

/// Addresses can exceed safely representable decimal precision on some
/// hosts, so the bridge transmits them as hexadecimal text and the core
/// parses base-16.
fn decode_raw_ptr(payload: Value) -> Result<Value> {
    let text = payload
        .as_str()
        .ok_or_else(|| malformed(TypeTag::RawPtr, &payload))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    let addr = u64::from_str_radix(digits, 16).map_err(|e| {
        Error::MalformedResponse(format!("bad raw_ptr address '{text}': {e}"))
    })?;
    Ok(Value::UInt(addr))
}

/// Declared length is caller-asserted, never verified against the actual
/// native object size; a count the bridge disagrees with is an error in
/// either direction, not a truncation.
fn decode_buffer(len: usize, payload: Value) -> Result<Value> {
    let bytes = match payload {
        Value::Bytes(b) => b,
        other => return Err(malformed(TypeTag::Ptr, &other)),
    };
    if bytes.len() != len {
        return Err(Error::ReturnLength {
            expected: len,
            actual: bytes.len(),
        });
    }
    Ok(Value::Bytes(bytes))
}

fn malformed(tag: TypeTag, payload: &Value) -> Error {
    Error::MalformedResponse(format!(
        "expected {tag} payload, got {}",
        payload.kind()
    ))
}
