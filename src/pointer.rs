//! Raw native memory reads.

use crate::bridge::{NativeBridge, PointerRead};
use crate::error::{Error, Result};

/// Read `length` raw bytes at `address`, returning an owned byte sequence
/// of exactly `length`.
///
/// Used for walking symbol tables and structs returned by value. Address
/// liveness cannot be validated at this layer: an invalid address is a
/// fatal native-level fault outside this facade's recovery scope.
pub fn read_pointer(bridge: &dyn NativeBridge, address: u64, length: usize) -> Result<Vec<u8>> {
    let request = PointerRead {
        addr: address,
        len: length,
    };
    let bytes = bridge
        .read_pointer(&request)
        .map_err(|e| Error::NativeCall(e.to_string()))?;
    if bytes.len() != length {
        return Err(Error::ReturnLength {
            expected: length,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}
