//! Object proxies - call methods of foreign vtable-dispatched objects
//!
//! Design: explicit schema in, immutable name → callable map out. There is no
//! runtime reflection over user types; a [`ProxySchema`] lists the methods.
//!
//! Architecture:
//! - `schema.rs` - method descriptors, ordinal assignment, TOML/JSON loading
//! - `vtable.rs` - reading table pointers and slots from foreign memory
//! - `callable.rs` - bound callables (address + convention + marshaling)
//! - `binder.rs` - resolution policy and the resulting proxy

mod binder;
mod callable;
mod schema;
mod vtable;

pub use binder::{Binder, BinderConfig, Proxy};
pub use callable::BoundCallable;
pub use schema::{MethodDescriptor, MethodTarget, ProxySchema, SchemaBuilder};
pub use vtable::{check_object, read_word, VirtualTable};

/// Bind `schema` against `base` with the default (fail-closed) policy
///
/// # Safety
/// See [`Binder::bind`].
pub unsafe fn bind(base: crate::interop::Address, schema: &ProxySchema) -> crate::errors::Result<Proxy> {
    Binder::new().bind(base, schema)
}

#[cfg(test)]
mod tests;
