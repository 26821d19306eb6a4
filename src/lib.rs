//! cppcall - call methods on foreign vtable-dispatched objects
//!
//! Given only the address of a native object and a structural description of
//! its methods, build callables that invoke those methods with the right
//! calling convention. No headers, no generated stubs.
//!
//! Layers, leaves first:
//! - [`interop`] - per-(convention, arity) call primitives, the dispatcher,
//!   and value ↔ machine word marshaling
//! - [`proxy`] - method schemas, virtual table resolution and bound callables
//!
//! ```no_run
//! use cppcall::{bind, CallingConvention, FfiType, FfiValue, ProxySchema};
//!
//! # fn main() -> cppcall::Result<()> {
//! # let object_address: usize = 0;
//! let schema = ProxySchema::builder()
//!     .virtual_method("get_id", CallingConvention::Thiscall, &[], FfiType::I32)
//!     .virtual_method("greet", CallingConvention::Thiscall, &[FfiType::String], FfiType::String)
//!     .build()?;
//!
//! let proxy = unsafe { bind(object_address, &schema)? };
//! let greeting = unsafe { proxy.call("greet", &[FfiValue::from("world")])? };
//! # let _ = greeting;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod interop;
pub mod logging;
pub mod proxy;

// Re-export commonly used items
pub use errors::{CallError, ConversionError, Error, ResolutionError, Result, SchemaError};
pub use interop::{dispatch, dispatch_method, Address, CallingConvention, FfiType, FfiValue, Word, MAX_ARGS};
pub use proxy::{bind, Binder, BinderConfig, BoundCallable, MethodDescriptor, MethodTarget, Proxy, ProxySchema};
