//! Call descriptors: the single self-contained value handed to the bridge.

use serde::{Deserialize, Serialize};

use crate::bridge::ResourceId;
use crate::error::{Error, Result};
use crate::marshal;
use crate::types::{MethodSig, TypeTag, Value};

/// What a caller asks to invoke: an exported symbol name resolved through
/// the owning handle's method table, or an explicit address paired with an
/// inline signature (for function pointers obtained dynamically, e.g. out
/// of a symbol table read through the pointer reader).
#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    /// Resolve through the handle's method table.
    Name(String),
    /// Call a raw address with the given signature.
    Address {
        /// Native function address.
        address: u64,
        /// Inline signature for the call.
        signature: MethodSig,
    },
}

impl CallTarget {
    /// Address target constructor.
    pub fn address(address: u64, signature: MethodSig) -> Self {
        CallTarget::Address { address, signature }
    }
}

impl From<&str> for CallTarget {
    fn from(name: &str) -> Self {
        CallTarget::Name(name.to_string())
    }
}

impl From<String> for CallTarget {
    fn from(name: String) -> Self {
        CallTarget::Name(name)
    }
}

/// A resolved target as submitted to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Exported symbol name.
    Name(String),
    /// Raw function address.
    Address(u64),
}

/// One encoded argument: wire tag plus bridge-ready value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Wire type tag (post-normalization, e.g. `char` → `u8`).
    pub ptype: TypeTag,
    /// Encoded value.
    pub value: Value,
}

/// Fully-resolved, serializable representation of one pending native call.
///
/// Immutable once built; it has no identity beyond the call it represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDescriptor {
    /// Resource id of the owning handle; `None` for address-only calls
    /// submitted without a handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rid: Option<ResourceId>,
    /// Resolved call target.
    pub target: Target,
    /// Encoded arguments, in call order.
    pub params: Vec<Param>,
    /// Declared return tag.
    pub rtype: TypeTag,
    /// Declared byte length for `ptr` returns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rlen: Option<usize>,
}

impl CallDescriptor {
    /// Validate arity, encode every argument for its declared tag, and
    /// produce the descriptor.
    pub fn build(
        rid: Option<ResourceId>,
        target: Target,
        signature: &MethodSig,
        args: &[Value],
    ) -> Result<Self> {
        if args.len() != signature.params.len() {
            return Err(Error::Arity {
                expected: signature.params.len(),
                actual: args.len(),
            });
        }

        let mut params = Vec::with_capacity(args.len());
        for (tag, value) in signature.params.iter().zip(args) {
            let (ptype, value) = marshal::encode_arg(*tag, value)?;
            params.push(Param { ptype, value });
        }

        Ok(Self {
            rid,
            target,
            params,
            rtype: signature.returns.tag(),
            rlen: signature.returns.declared_len(),
        })
    }

    /// Serialize for bridges that cross a process or JSON boundary.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
