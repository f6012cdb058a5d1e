//! Library handles: the open/call/close lifecycle around one native
//! resource.

use std::sync::Arc;

use crate::bridge::{self, NativeBridge, ResourceId};
use crate::descriptor::{CallDescriptor, CallTarget, Target};
use crate::error::{Error, Result};
use crate::marshal;
use crate::types::{MethodSig, MethodTable, Value};

/// One opened native library.
///
/// Owns exactly one bridge resource id, obtained at open time and never
/// reused across handles. The method table is fixed at construction and
/// not validated against the library's actual exports; unresolved symbols
/// surface only at call time, through the bridge.
///
/// The facade tracks open/closed state itself: the bridge offers no
/// use-after-close protection, so any call or close against a closed
/// handle fails fast with [`Error::UseAfterClose`].
pub struct Library {
    bridge: Arc<dyn NativeBridge>,
    rid: ResourceId,
    methods: MethodTable,
    closed: bool,
}

impl Library {
    /// Open the library at `path` and attach `methods` as its method table.
    ///
    /// Fails with [`Error::LoadFailure`] naming the path if the bridge
    /// cannot load the file.
    pub fn open(
        bridge: Arc<dyn NativeBridge>,
        path: &str,
        methods: MethodTable,
    ) -> Result<Self> {
        let rid = bridge.open(path).map_err(|e| Error::LoadFailure {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            bridge,
            rid,
            methods,
            closed: false,
        })
    }

    /// The native resource id backing this handle.
    pub fn rid(&self) -> ResourceId {
        self.rid
    }

    /// The method table attached at open time.
    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    /// Check if this handle was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Invoke a target with the given arguments.
    ///
    /// Accepts a method name (resolved through the method table) or an
    /// explicit [`CallTarget::Address`] with an inline signature. The
    /// arguments are validated and encoded per their declared tags, the
    /// descriptor is submitted through the bridge, and a success payload
    /// is decoded per the declared return spec.
    ///
    /// Address-mode calls with an invalid address may fault the process at
    /// the native level; that is outside this facade's recovery scope.
    pub fn call(&self, target: impl Into<CallTarget>, args: &[Value]) -> Result<Value> {
        if self.closed {
            return Err(Error::UseAfterClose);
        }

        let (resolved, signature) = match target.into() {
            CallTarget::Name(name) => {
                let sig = self
                    .methods
                    .get(&name)
                    .ok_or_else(|| Error::UnknownMethod(name.clone()))?
                    .clone();
                (Target::Name(name), sig)
            }
            CallTarget::Address { address, signature } => (Target::Address(address), signature),
        };

        let descriptor = CallDescriptor::build(Some(self.rid), resolved, &signature, args)?;
        let payload = bridge::submit(self.bridge.as_ref(), &descriptor)?;
        marshal::decode_return(&signature.returns, payload)
    }

    /// Release the native resource.
    ///
    /// The handle is marked closed even if the bridge reports a release
    /// error; the resource id is never reused, and every subsequent call
    /// or close fails with [`Error::UseAfterClose`].
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::UseAfterClose);
        }
        self.closed = true;
        self.bridge
            .close(self.rid)
            .map_err(|e| Error::NativeCall(e.to_string()))
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        // Best-effort release; close() is the error-aware path.
        if !self.closed {
            let _ = self.bridge.close(self.rid);
        }
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("rid", &self.rid)
            .field("methods", &self.methods.len())
            .field("closed", &self.closed)
            .finish()
    }
}

/// Invoke a raw function address without an owning handle.
///
/// Submits a descriptor with no resource id; whether such calls are
/// accepted is up to the bridge. Same fatal-fault caveat as
/// [`Library::call`] address targets.
pub fn call_address(
    bridge: &dyn NativeBridge,
    address: u64,
    signature: &MethodSig,
    args: &[Value],
) -> Result<Value> {
    let descriptor = CallDescriptor::build(None, Target::Address(address), signature, args)?;
    let payload = bridge::submit(bridge, &descriptor)?;
    marshal::decode_return(&signature.returns, payload)
}
