//! Seam to the excluded native bridge.
//!
//! The capability that actually performs dynamic-library loading,
//! invocation and memory reads is injected into this facade as a
//! [`NativeBridge`] trait object. This module defines that boundary and
//! the thin client that unwraps the bridge's response envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::CallDescriptor;
use crate::error::{Error, Result};
use crate::types::Value;

/// Opaque identifier of one opened native library resource.
pub type ResourceId = u32;

/// Error reported by a bridge operation; the message is opaque to the
/// facade and propagated verbatim.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct BridgeError(pub String);

impl BridgeError {
    /// Wrap a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Response wrapper for a native call: an error message, a wrapped success
/// payload, or a bare value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    /// The bridge reported an explicit failure.
    Err {
        /// Bridge-side message, uninterpreted.
        err: String,
    },
    /// Wrapped success payload.
    Data {
        /// The payload.
        data: Value,
    },
    /// Bare success payload.
    Bare(Value),
}

/// Request shape for a raw memory read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerRead {
    /// Native address to read from.
    pub addr: u64,
    /// Number of bytes to read.
    pub len: usize,
}

/// The foreign native capability this facade drives.
///
/// Implementations perform the actual `dlopen`/`dlsym`/call/memory-read
/// work. Each operation is one blocking round trip; requests issued
/// sequentially against one resource must be observed in program order.
/// Whether one resource tolerates concurrent calls is a precondition of
/// the implementation and is not validated here.
pub trait NativeBridge: Send + Sync {
    /// Load the library at `path` and return its resource id.
    fn open(&self, path: &str) -> std::result::Result<ResourceId, BridgeError>;

    /// Invoke one fully-resolved call.
    fn call(&self, descriptor: &CallDescriptor) -> Envelope;

    /// Release a resource id obtained from [`NativeBridge::open`].
    fn close(&self, rid: ResourceId) -> std::result::Result<(), BridgeError>;

    /// Read `request.len` raw bytes at `request.addr`.
    fn read_pointer(&self, request: &PointerRead) -> std::result::Result<Vec<u8>, BridgeError>;
}

/// Submit a descriptor and unwrap the response envelope into a success
/// payload or a [`Error::NativeCall`] failure.
pub fn submit(bridge: &dyn NativeBridge, descriptor: &CallDescriptor) -> Result<Value> {
    match bridge.call(descriptor) {
        Envelope::Err { err } => Err(Error::NativeCall(err)),
        Envelope::Data { data } => Ok(data),
        Envelope::Bare(value) => Ok(value),
    }
}
