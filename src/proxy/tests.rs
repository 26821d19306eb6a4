//! Binder tests against synthetic objects laid out in Rust memory

use super::*;
use crate::errors::{CallError, ConversionError, Error, ResolutionError};
use crate::interop::{Address, CallingConvention, FfiType, FfiValue, WORD_SIZE};
use std::ffi::c_char;
use CallingConvention::{Cdecl, Thiscall};

/// Object layout the binder expects: table pointer first
#[repr(C)]
struct Widget {
    vtable: *const usize,
    value: isize,
}

// Instance methods. Off 32-bit x86 the receiver is simply the first C argument.
extern "C" fn widget_value(this: *const Widget) -> isize {
    unsafe { (*this).value }
}

extern "C" fn widget_add(this: *const Widget, delta: isize) -> isize {
    unsafe { (*this).value + delta }
}

extern "C" fn widget_name(_this: *const Widget) -> *const c_char {
    b"widget\0".as_ptr() as *const c_char
}

extern "C" fn widget_echo(_this: *const Widget, text: *const c_char) -> *const c_char {
    text
}

extern "C" fn widget_negate(this: *const Widget) -> isize {
    unsafe { -(*this).value }
}

extern "C" fn make_answer() -> i32 {
    42
}

/// Owns a table and an instance pointing at it
struct Fixture {
    table: Box<[usize]>,
    object: Box<Widget>,
}

impl Fixture {
    fn new(entries: Vec<usize>, value: isize) -> Self {
        let table = entries.into_boxed_slice();
        let object = Box::new(Widget {
            vtable: table.as_ptr(),
            value,
        });
        Self { table, object }
    }

    fn widget(value: isize) -> Self {
        Self::new(
            vec![
                widget_value as usize,
                widget_add as usize,
                widget_name as usize,
                widget_echo as usize,
                widget_negate as usize,
                widget_negate as usize,
            ],
            value,
        )
    }

    fn base(&self) -> Address {
        &*self.object as *const Widget as Address
    }
}

fn widget_schema() -> ProxySchema {
    ProxySchema::builder()
        .virtual_method("value", Thiscall, &[], FfiType::ISize)
        .virtual_method("add", Thiscall, &[FfiType::ISize], FfiType::ISize)
        .virtual_method("name", Thiscall, &[], FfiType::String)
        .virtual_method("echo", Thiscall, &[FfiType::String], FfiType::String)
        .build()
        .unwrap()
}

#[test]
fn test_resolves_each_ordinal_to_its_table_entry() {
    let fx = Fixture::widget(5);
    let binder = Binder::new();
    for k in 0..fx.table.len() {
        assert_eq!(unsafe { binder.resolve_slot(fx.base(), k) }, Ok(fx.table[k]));
    }

    let proxy = unsafe { bind(fx.base(), &widget_schema()) }.unwrap();
    for (k, name) in ["value", "add", "name", "echo"].into_iter().enumerate() {
        assert_eq!(proxy.get(name).unwrap().address(), fx.table[k]);
    }
    assert_eq!(proxy.names().collect::<Vec<_>>(), vec!["value", "add", "name", "echo"]);
}

#[test]
fn test_ordinal_beyond_declared_slots_is_rejected() {
    let fx = Fixture::widget(5);
    let schema = ProxySchema::builder()
        .virtual_at(4, "negate", Thiscall, &[], FfiType::ISize)
        .build()
        .unwrap();
    let negate = &schema.methods()[0];

    let err = unsafe { Binder::new().bind_method(fx.base(), negate, 4) }.unwrap_err();
    assert!(matches!(
        err,
        Error::Resolution(ResolutionError::OrdinalOutOfRange { ordinal: 4, slots: 4 })
    ));
}

#[test]
fn test_permissive_binder_reads_past_declared_slots() {
    let fx = Fixture::widget(5);
    let schema = ProxySchema::builder()
        .virtual_at(5, "negate", Thiscall, &[], FfiType::ISize)
        .build()
        .unwrap();
    let negate = &schema.methods()[0];

    let callable = unsafe { Binder::with_config(BinderConfig::permissive()).bind_method(fx.base(), negate, 4) }.unwrap();
    assert_eq!(callable.address(), fx.table[5]);
}

#[test]
fn test_binder_config_reads_from_toml() {
    let config: BinderConfig = toml::from_str("strict_slots = false").unwrap();
    assert!(!config.strict_slots);
    assert!(config.require_alignment);
    assert_eq!(toml::from_str::<BinderConfig>("").unwrap(), BinderConfig::default());

    let permissive = toml::to_string(&BinderConfig::permissive()).unwrap();
    assert_eq!(toml::from_str::<BinderConfig>(&permissive).unwrap(), BinderConfig::permissive());
}

#[test]
fn test_null_and_misaligned_objects_fail_closed() {
    let fx = Fixture::widget(5);
    let schema = widget_schema();

    let err = unsafe { bind(0, &schema) }.unwrap_err();
    assert!(matches!(err, Error::Resolution(ResolutionError::NullObject)));

    let err = unsafe { bind(fx.base() + 1, &schema) }.unwrap_err();
    assert!(matches!(err, Error::Resolution(ResolutionError::Misaligned { .. })));
}

#[test]
fn test_null_vtable_and_null_slot_fail_closed() {
    let empty = Widget {
        vtable: core::ptr::null(),
        value: 0,
    };
    let base = &empty as *const Widget as Address;
    let err = unsafe { bind(base, &widget_schema()) }.unwrap_err();
    assert!(matches!(err, Error::Resolution(ResolutionError::NullVtable { object }) if object == base));

    let holes = Fixture::new(vec![widget_value as usize, 0], 1);
    let schema = ProxySchema::builder()
        .virtual_method("value", Thiscall, &[], FfiType::ISize)
        .virtual_method("missing", Thiscall, &[], FfiType::ISize)
        .build()
        .unwrap();
    let err = unsafe { bind(holes.base(), &schema) }.unwrap_err();
    assert!(matches!(err, Error::Resolution(ResolutionError::NullSlot { ordinal: 1 })));
}

#[test]
fn test_explicit_null_address_is_rejected() {
    let schema = ProxySchema::builder()
        .static_method("nothing", 0, Cdecl, &[], FfiType::Void)
        .build()
        .unwrap();
    let err = unsafe { bind(0, &schema) }.unwrap_err();
    assert!(matches!(err, Error::Resolution(ResolutionError::NullAddress { method }) if method == "nothing"));
}

#[test]
fn test_unsupported_declarations_fail_at_bind_time() {
    let fx = Fixture::widget(5);

    let floats = ProxySchema::builder()
        .virtual_method("scale", Thiscall, &[FfiType::F64], FfiType::Void)
        .build()
        .unwrap();
    let err = unsafe { bind(fx.base(), &floats) }.unwrap_err();
    assert!(matches!(
        err,
        Error::Conversion(ConversionError::UnsupportedType { ty: FfiType::F64 })
    ));

    let wide = ProxySchema::builder()
        .static_method("wide", make_answer as usize, Cdecl, &[FfiType::I32; 7], FfiType::I32)
        .build()
        .unwrap();
    let err = unsafe { bind(0, &wide) }.unwrap_err();
    assert!(matches!(err, Error::Call(CallError::Arity { got: 7, max: 6 })));
}

#[test]
fn test_binding_twice_yields_identical_callables() {
    let fx = Fixture::widget(5);
    let schema = widget_schema();
    let first = unsafe { bind(fx.base(), &schema) }.unwrap();
    let second = unsafe { bind(fx.base(), &schema) }.unwrap();

    for name in first.names() {
        assert_eq!(first.get(name), second.get(name));
    }

    let single = unsafe { Binder::new().bind_method(fx.base(), &schema.methods()[1], schema.slots()) }.unwrap();
    assert_eq!(Some(&single), first.get("add"));
}

#[test]
fn test_thiscall_callables_capture_the_base_once() {
    let fx = Fixture::widget(5);
    let proxy = unsafe { bind(fx.base(), &widget_schema()) }.unwrap();

    let add = proxy.get("add").unwrap();
    assert_eq!(add.receiver(), Some(fx.base()));
    assert_eq!(add.params(), &[FfiType::ISize]);

    let static_only = ProxySchema::builder()
        .static_method("answer", make_answer as usize, Cdecl, &[], FfiType::I32)
        .build()
        .unwrap();
    let proxy = unsafe { bind(0, &static_only) }.unwrap();
    assert_eq!(proxy.get("answer").unwrap().receiver(), None);
}

#[cfg(not(target_arch = "x86"))]
#[test]
fn test_invokes_virtual_methods() {
    let fx = Fixture::widget(5);
    let proxy = unsafe { bind(fx.base(), &widget_schema()) }.unwrap();

    unsafe {
        assert_eq!(proxy.call("value", &[]).unwrap(), FfiValue::Int(5));
        assert_eq!(proxy.call("add", &[FfiValue::Int(-8)]).unwrap(), FfiValue::Int(-3));
        assert_eq!(proxy.call("name", &[]).unwrap(), FfiValue::from("widget"));
        assert_eq!(proxy.call("echo", &[FfiValue::from("hi there")]).unwrap(), FfiValue::from("hi there"));
        assert_eq!(proxy.get("add").unwrap().call_words(&[10]).unwrap(), 15);
    }
}

#[cfg(not(target_arch = "x86"))]
#[test]
fn test_invokes_static_methods_without_receiver() {
    let schema = ProxySchema::builder()
        .static_method("answer", make_answer as usize, Cdecl, &[], FfiType::I32)
        .build()
        .unwrap();
    let proxy = unsafe { bind(0, &schema) }.unwrap();
    assert_eq!(unsafe { proxy.call("answer", &[]) }.unwrap(), FfiValue::Int(42));
}

#[cfg(not(target_arch = "x86"))]
#[test]
fn test_rebind_is_explicit() {
    let first = Fixture::widget(5);
    let proxy = unsafe { bind(first.base(), &widget_schema()) }.unwrap();

    // Same layout, different table order: slot 0 now negates.
    let second = Fixture::new(
        vec![
            widget_negate as usize,
            widget_add as usize,
            widget_name as usize,
            widget_echo as usize,
        ],
        9,
    );
    let rebound = unsafe { proxy.rebind(second.base()) }.unwrap();

    unsafe {
        assert_eq!(proxy.call("value", &[]).unwrap(), FfiValue::Int(5));
        assert_eq!(rebound.call("value", &[]).unwrap(), FfiValue::Int(-9));
    }
    assert_eq!(proxy.base(), first.base());
    assert_eq!(rebound.base(), second.base());
    assert_ne!(proxy.get("value"), rebound.get("value"));
}

#[test]
fn test_call_errors_are_raised_before_the_native_call() {
    let fx = Fixture::widget(5);
    let proxy = unsafe { bind(fx.base(), &widget_schema()) }.unwrap();

    let err = unsafe { proxy.call("missing", &[]) }.unwrap_err();
    assert!(matches!(err, Error::Resolution(ResolutionError::UnknownMethod { name }) if name == "missing"));

    let err = unsafe { proxy.call("add", &[]) }.unwrap_err();
    assert!(matches!(
        err,
        Error::Conversion(ConversionError::ArgCount { expected: 1, got: 0 })
    ));

    let err = unsafe { proxy.call("echo", &[FfiValue::Text(b"a\0b".to_vec())]) }.unwrap_err();
    assert!(matches!(err, Error::Conversion(ConversionError::InteriorNul { position: 1 })));
}

#[test]
fn test_vtable_view_reports_layout() {
    let fx = Fixture::widget(5);
    let vt = unsafe { VirtualTable::of(fx.base(), Some(6), true) }.unwrap();
    assert_eq!(vt.object(), fx.base());
    assert_eq!(vt.address(), fx.table.as_ptr() as Address);
    assert_eq!(vt.address() % WORD_SIZE, 0);
    assert_eq!(unsafe { read_word(fx.base()) }, vt.address());
    assert_eq!(unsafe { vt.slot(6) }, Err(ResolutionError::OrdinalOutOfRange { ordinal: 6, slots: 6 }));
}

#[test]
fn test_bound_types_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BoundCallable>();
    assert_send_sync::<Proxy>();
    assert_send_sync::<ProxySchema>();
    assert_send_sync::<Binder>();
}

#[cfg(not(target_arch = "x86"))]
#[test]
fn test_one_proxy_serves_many_threads() {
    let fx = Fixture::widget(5);
    let proxy = unsafe { bind(fx.base(), &widget_schema()) }.unwrap();

    std::thread::scope(|scope| {
        for t in 0..8isize {
            let proxy = &proxy;
            scope.spawn(move || {
                for i in 0..200isize {
                    let text = format!("thread {t} call {i}");
                    unsafe {
                        assert_eq!(proxy.call("add", &[FfiValue::Int((t * i) as i64)]).unwrap(), FfiValue::Int((5 + t * i) as i64));
                        assert_eq!(proxy.call("echo", &[FfiValue::from(text.as_str())]).unwrap(), FfiValue::from(text.as_str()));
                        assert_eq!(proxy.call("name", &[]).unwrap(), FfiValue::from("widget"));
                    }
                }
            });
        }
    });
}
