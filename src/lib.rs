//! Dybind: declarative invocation facade over a native dynamic-library
//! bridge.
//!
//! Given a declarative description of a native function's parameter and
//! return types, the facade resolves a callable target (by exported symbol
//! name, or by raw address plus an inline signature), marshals high-level
//! values into the bridge's primitive forms, submits the call, and decodes
//! the response. It also reads raw bytes at arbitrary native addresses,
//! which is how symbol tables and structs returned by value are walked.
//!
//! # Architecture
//!
//! ```text
//! Caller
//!   │
//!   ▼
//! Library handle (method table, open/close lifecycle)
//!   │
//!   ▼
//! Call descriptor (arity check + per-tag argument encoding)
//!   │
//!   ▼
//! NativeBridge (injected: dlopen/dlsym/call/memory-read)
//!   │
//!   ▼
//! Envelope → per-tag result decoding → caller value
//! ```
//!
//! The bridge itself, the capability that actually loads libraries and
//! performs calls, is not part of this crate. Hosts implement
//! [`NativeBridge`] and inject it; nothing happens at module load, and no
//! ambient state exists.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use dybind::{Envelope, Library, MethodSig, MethodTable, NativeBridge, TypeTag, Value};
//! # use dybind::{BridgeError, CallDescriptor, PointerRead, ResourceId};
//! # struct AddBridge;
//! # impl NativeBridge for AddBridge {
//! #     fn open(&self, _path: &str) -> Result<ResourceId, BridgeError> { Ok(1) }
//! #     fn call(&self, d: &CallDescriptor) -> Envelope {
//! #         let a = d.params[0].value.as_i64().unwrap();
//! #         let b = d.params[1].value.as_i64().unwrap();
//! #         Envelope::Bare(Value::Int(a + b))
//! #     }
//! #     fn close(&self, _rid: ResourceId) -> Result<(), BridgeError> { Ok(()) }
//! #     fn read_pointer(&self, _r: &PointerRead) -> Result<Vec<u8>, BridgeError> { Ok(Vec::new()) }
//! # }
//! # let bridge: Arc<dyn NativeBridge> = Arc::new(AddBridge);
//! let methods = MethodTable::new()
//!     .define("add", MethodSig::new(vec![TypeTag::I32, TypeTag::I32], TypeTag::I32));
//!
//! let mut lib = Library::open(bridge, "./libdemo.so", methods)?;
//! let sum = lib.call("add", &[Value::from(2), Value::from(3)])?;
//! assert_eq!(sum.as_i64(), Some(5));
//! lib.close()?;
//! # Ok::<(), dybind::Error>(())
//! ```

#![warn(clippy::all)]

pub mod bridge;
pub mod descriptor;
pub mod error;
pub mod library;
pub mod loader;
pub mod marshal;
pub mod pointer;
pub mod types;

pub use bridge::{BridgeError, Envelope, NativeBridge, PointerRead, ResourceId};
pub use descriptor::{CallDescriptor, CallTarget, Param, Target};
pub use error::{Error, Result};
pub use library::{call_address, Library};
pub use loader::{
    prepare, ArtifactLocation, CachePolicy, Platform, PrepareOptions, ARTIFACT_URL_ENV,
};
pub use pointer::read_pointer;
pub use types::{MethodSig, MethodTable, ReturnSpec, TypeTag, Value};
