//! End-to-end dispatch tests against a scripted bridge.
//!
//! The bridge simulates a native library exposing `add(i32,i32)->i32`,
//! `hello(str)->str`, a symbol-table export, and a small fake memory
//! space for pointer reads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dybind::{
    call_address, read_pointer, BridgeError, CallDescriptor, CallTarget, Envelope, Error, Library,
    MethodSig, MethodTable, NativeBridge, PointerRead, ResourceId, ReturnSpec, Target, TypeTag,
    Value,
};

/// Address of the exported symbol table in the fake memory space.
const SYMBOLS_ADDR: u64 = 0x5000;
/// Address of the `greet` function stored in the table's second slot.
const GREET_ADDR: u64 = 0x6100;

struct ScriptedBridge {
    state: Mutex<State>,
    memory: HashMap<u64, Vec<u8>>,
}

#[derive(Default)]
struct State {
    next_rid: ResourceId,
    closed: Vec<ResourceId>,
    calls: usize,
}

impl ScriptedBridge {
    fn new() -> Self {
        // Symbol table: two little-endian u64 slots; the second one holds
        // the greeter's address.
        let mut table = Vec::new();
        table.extend_from_slice(&0x6000u64.to_le_bytes());
        table.extend_from_slice(&GREET_ADDR.to_le_bytes());

        let mut memory = HashMap::new();
        memory.insert(SYMBOLS_ADDR, table);

        Self {
            state: Mutex::new(State::default()),
            memory,
        }
    }

    fn closed_rids(&self) -> Vec<ResourceId> {
        self.state.lock().unwrap().closed.clone()
    }

    fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    // Greetings come back data-wrapped; everything else in this bridge
    // answers with a bare payload.
    fn greet(&self, descriptor: &CallDescriptor) -> Envelope {
        match descriptor.params[0].value.as_str() {
            Some(name) => Envelope::Data {
                data: Value::Str(format!("Hello, {name}")),
            },
            None => Envelope::Err {
                err: "greet expects a string".to_string(),
            },
        }
    }
}

impl NativeBridge for ScriptedBridge {
    fn open(&self, path: &str) -> Result<ResourceId, BridgeError> {
        if path.contains("missing") {
            return Err(BridgeError::new(format!("cannot open '{path}'")));
        }
        let mut state = self.state.lock().unwrap();
        state.next_rid += 1;
        Ok(state.next_rid)
    }

    fn call(&self, descriptor: &CallDescriptor) -> Envelope {
        self.state.lock().unwrap().calls += 1;
        match &descriptor.target {
            Target::Name(name) => match name.as_str() {
                "add" => {
                    let a = descriptor.params[0].value.as_i64().unwrap();
                    let b = descriptor.params[1].value.as_i64().unwrap();
                    Envelope::Bare(Value::Int(a + b))
                }
                "hello" => self.greet(descriptor),
                "native_symbols" => {
                    Envelope::Bare(Value::Bytes(self.memory[&SYMBOLS_ADDR].clone()))
                }
                "putc" => {
                    // The facade must have rewritten char to u8.
                    assert_eq!(descriptor.params[0].ptype, TypeTag::U8);
                    Envelope::Bare(Value::Void)
                }
                "explode" => Envelope::Err {
                    err: "illegal instruction".to_string(),
                },
                other => Envelope::Err {
                    err: format!("symbol '{other}' not found"),
                },
            },
            Target::Address(addr) if *addr == GREET_ADDR => self.greet(descriptor),
            Target::Address(addr) => Envelope::Err {
                err: format!("bad address {addr:#x}"),
            },
        }
    }

    fn close(&self, rid: ResourceId) -> Result<(), BridgeError> {
        self.state.lock().unwrap().closed.push(rid);
        Ok(())
    }

    fn read_pointer(&self, request: &PointerRead) -> Result<Vec<u8>, BridgeError> {
        match self.memory.get(&request.addr) {
            Some(bytes) if bytes.len() >= request.len => Ok(bytes[..request.len].to_vec()),
            Some(bytes) => Ok(bytes.clone()),
            None => Err(BridgeError::new(format!(
                "unmapped address {:#x}",
                request.addr
            ))),
        }
    }
}

fn demo_methods() -> MethodTable {
    MethodTable::new()
        .define(
            "add",
            MethodSig::new(vec![TypeTag::I32, TypeTag::I32], TypeTag::I32),
        )
        .define("hello", MethodSig::new(vec![TypeTag::Str], TypeTag::Str))
        .define(
            "native_symbols",
            MethodSig::nullary(ReturnSpec::Buffer { len: 16 }),
        )
        .define("putc", MethodSig::new(vec![TypeTag::Char], TypeTag::Void))
        .define("explode", MethodSig::nullary(TypeTag::Void))
        .define("ghost", MethodSig::nullary(TypeTag::Void))
}

fn open_demo(bridge: &Arc<ScriptedBridge>) -> Library {
    Library::open(bridge.clone() as Arc<dyn NativeBridge>, "./libdemo.so", demo_methods()).unwrap()
}

#[test]
fn test_add_end_to_end() {
    let bridge = Arc::new(ScriptedBridge::new());
    let lib = open_demo(&bridge);
    let sum = lib
        .call("add", &[Value::from(2), Value::from(3)])
        .unwrap();
    assert_eq!(sum, Value::Int(5));
}

#[test]
fn test_hello_passes_greeting_through_unchanged() {
    let bridge = Arc::new(ScriptedBridge::new());
    let lib = open_demo(&bridge);
    let greeting = lib.call("hello", &[Value::from("World")]).unwrap();
    assert_eq!(greeting, Value::Str("Hello, World".to_string()));
}

#[test]
fn test_open_failure_names_path() {
    let bridge: Arc<dyn NativeBridge> = Arc::new(ScriptedBridge::new());
    let err = Library::open(bridge, "./missing.so", MethodTable::new()).unwrap_err();
    match err {
        Error::LoadFailure { path, reason } => {
            assert_eq!(path, "./missing.so");
            assert!(reason.contains("missing.so"));
        }
        other => panic!("expected LoadFailure, got {other:?}"),
    }
}

#[test]
fn test_unknown_method() {
    let bridge = Arc::new(ScriptedBridge::new());
    let lib = open_demo(&bridge);
    let err = lib.call("nonexistent", &[]).unwrap_err();
    assert!(matches!(err, Error::UnknownMethod(name) if name == "nonexistent"));
    // Validation failures never reach the bridge.
    assert_eq!(bridge.call_count(), 0);
}

#[test]
fn test_arity_mismatch_reports_counts() {
    let bridge = Arc::new(ScriptedBridge::new());
    let lib = open_demo(&bridge);
    let err = lib.call("add", &[Value::from(2)]).unwrap_err();
    match err {
        Error::Arity { expected, actual } => {
            assert_eq!(expected, 2);
            assert_eq!(actual, 1);
        }
        other => panic!("expected Arity, got {other:?}"),
    }
    assert_eq!(bridge.call_count(), 0);
}

#[test]
fn test_char_length_checked_before_dispatch() {
    let bridge = Arc::new(ScriptedBridge::new());
    let lib = open_demo(&bridge);
    let err = lib.call("putc", &[Value::from("ab")]).unwrap_err();
    assert!(matches!(err, Error::CharLength { actual: 2 }));
    assert_eq!(bridge.call_count(), 0);

    // A well-formed char goes through, rewritten to u8.
    lib.call("putc", &[Value::from("A")]).unwrap();
    assert_eq!(bridge.call_count(), 1);
}

#[test]
fn test_declared_but_unexported_symbol_fails_at_call_time() {
    let bridge = Arc::new(ScriptedBridge::new());
    let lib = open_demo(&bridge);
    // 'ghost' is in the method table, so validation passes; the bridge
    // reports the unresolved symbol.
    let err = lib.call("ghost", &[]).unwrap_err();
    assert!(matches!(err, Error::NativeCall(msg) if msg.contains("'ghost' not found")));
}

#[test]
fn test_error_envelope_propagates_verbatim() {
    let bridge = Arc::new(ScriptedBridge::new());
    let lib = open_demo(&bridge);
    let err = lib.call("explode", &[]).unwrap_err();
    assert!(matches!(err, Error::NativeCall(msg) if msg == "illegal instruction"));
}

#[test]
fn test_use_after_close() {
    let bridge = Arc::new(ScriptedBridge::new());
    let mut lib = open_demo(&bridge);
    let rid = lib.rid();

    lib.close().unwrap();
    assert_eq!(bridge.closed_rids(), vec![rid]);

    let err = lib.call("add", &[Value::from(2), Value::from(3)]).unwrap_err();
    assert!(matches!(err, Error::UseAfterClose));

    let err = lib.close().unwrap_err();
    assert!(matches!(err, Error::UseAfterClose));

    // The resource was released exactly once.
    assert_eq!(bridge.closed_rids(), vec![rid]);
}

#[test]
fn test_drop_releases_unclosed_handle() {
    let bridge = Arc::new(ScriptedBridge::new());
    let rid = {
        let lib = open_demo(&bridge);
        lib.rid()
    };
    assert_eq!(bridge.closed_rids(), vec![rid]);
}

#[test]
fn test_symbol_table_walk() {
    let bridge = Arc::new(ScriptedBridge::new());
    let lib = open_demo(&bridge);

    // Struct returned by value: the export table, 16 bytes.
    let table = lib.call("native_symbols", &[]).unwrap();
    let table = table.as_bytes().unwrap();
    assert_eq!(table.len(), 16);

    // The same bytes are readable straight from native memory.
    let raw = read_pointer(bridge.as_ref(), SYMBOLS_ADDR, 16).unwrap();
    assert_eq!(raw, table);

    // Extract the second little-endian slot and call through it.
    let addr = u64::from_le_bytes(raw[8..16].try_into().unwrap());
    assert_eq!(addr, GREET_ADDR);

    let signature = MethodSig::new(vec![TypeTag::Str], TypeTag::Str);
    let greeting = lib
        .call(
            CallTarget::address(addr, signature),
            &[Value::from("World")],
        )
        .unwrap();
    assert_eq!(greeting, Value::Str("Hello, World".to_string()));
}

#[test]
fn test_address_call_without_handle() {
    let bridge = ScriptedBridge::new();
    let signature = MethodSig::new(vec![TypeTag::Str], TypeTag::Str);
    let greeting =
        call_address(&bridge, GREET_ADDR, &signature, &[Value::from("pointer")]).unwrap();
    assert_eq!(greeting, Value::Str("Hello, pointer".to_string()));

    let err = call_address(&bridge, 0x1, &signature, &[Value::from("x")]).unwrap_err();
    assert!(matches!(err, Error::NativeCall(msg) if msg.contains("bad address")));
}

#[test]
fn test_read_pointer_unmapped_address_is_native_failure() {
    let bridge = ScriptedBridge::new();
    let err = read_pointer(&bridge, 0xdead, 8).unwrap_err();
    assert!(matches!(err, Error::NativeCall(msg) if msg.contains("unmapped")));
}

#[test]
fn test_read_pointer_short_read_is_length_error() {
    let bridge = ScriptedBridge::new();
    // The table is only 16 bytes; asking for more surfaces the count
    // mismatch instead of silently returning fewer bytes.
    let err = read_pointer(&bridge, SYMBOLS_ADDR, 32).unwrap_err();
    match err {
        Error::ReturnLength { expected, actual } => {
            assert_eq!(expected, 32);
            assert_eq!(actual, 16);
        }
        other => panic!("expected ReturnLength, got {other:?}"),
    }
}
