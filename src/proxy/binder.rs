//! Object proxy binder
//!
//! Turns a base address and a [`ProxySchema`] into a [`Proxy`]: every method
//! is resolved to a function pointer once, at bind time, and wrapped in a
//! [`BoundCallable`]. The table is never re-read implicitly; a replaced object
//! needs an explicit [`Proxy::rebind`].

use super::callable::BoundCallable;
use super::schema::{MethodDescriptor, MethodTarget, ProxySchema};
use super::vtable::{check_object, VirtualTable};
use crate::errors::{CallError, Error, ResolutionError, Result};
use crate::interop::{self, check_param_type, check_return_type, Address, FfiValue, MAX_ARGS};
use crate::logging;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Resolution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinderConfig {
    /// Reject ordinals at or beyond the schema's declared slot count instead
    /// of reading past the table
    #[serde(default = "default_true")]
    pub strict_slots: bool,

    /// Reject object and table addresses that are not word aligned
    #[serde(default = "default_true")]
    pub require_alignment: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            strict_slots: true,
            require_alignment: true,
        }
    }
}

impl BinderConfig {
    /// Read the same unchecked table entries the foreign compiler would
    pub fn permissive() -> Self {
        Self {
            strict_slots: false,
            require_alignment: false,
        }
    }
}

/// Resolves method descriptors against foreign objects
#[derive(Debug, Clone, Copy, Default)]
pub struct Binder {
    config: BinderConfig,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BinderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Bind every method of `schema` against the object at `base`.
    ///
    /// All checks (arity, declared types, addresses, table slots) happen here;
    /// nothing is called.
    ///
    /// # Safety
    /// If the schema has virtual methods, `base` must point to a live object
    /// whose first word is its virtual table pointer, and the declared slots
    /// must exist in that table.
    pub unsafe fn bind(&self, base: Address, schema: &ProxySchema) -> Result<Proxy> {
        let slots = self.config.strict_slots.then_some(schema.slots());
        let mut table = None;
        let mut methods = HashMap::with_capacity(schema.len());

        for descriptor in schema.methods() {
            let callable = self
                .bind_with(base, descriptor, slots, &mut table)
                .map_err(|err| {
                    logging::log_ffi_error(&descriptor.name, &err);
                    err
                })?;
            methods.insert(descriptor.name.clone(), callable);
        }

        interop::record_bind();
        logging::log_bind(base, methods.len());

        Ok(Proxy {
            base,
            methods,
            schema: schema.clone(),
            binder: *self,
        })
    }

    /// Bind a single descriptor. Ordinals are checked against `slots` when the
    /// binder is strict.
    ///
    /// # Safety
    /// See [`Binder::bind`].
    pub unsafe fn bind_method(
        &self,
        base: Address,
        descriptor: &MethodDescriptor,
        slots: usize,
    ) -> Result<BoundCallable> {
        let slots = self.config.strict_slots.then_some(slots);
        self.bind_with(base, descriptor, slots, &mut None)
    }

    /// Read the function pointer at `ordinal` in the table of `base`, with no
    /// slot bound.
    ///
    /// # Safety
    /// `base` must point to a live object with a virtual table holding at
    /// least `ordinal + 1` entries.
    pub unsafe fn resolve_slot(&self, base: Address, ordinal: usize) -> std::result::Result<Address, ResolutionError> {
        VirtualTable::of(base, None, self.config.require_alignment)?.slot(ordinal)
    }

    unsafe fn bind_with(
        &self,
        base: Address,
        descriptor: &MethodDescriptor,
        slots: Option<usize>,
        table: &mut Option<VirtualTable>,
    ) -> Result<BoundCallable> {
        if descriptor.params.len() > MAX_ARGS {
            return Err(CallError::Arity {
                got: descriptor.params.len(),
                max: MAX_ARGS,
            }
            .into());
        }
        for &ty in &descriptor.params {
            check_param_type(ty)?;
        }
        check_return_type(descriptor.returns)?;

        if descriptor.convention.has_receiver() {
            check_object(base, self.config.require_alignment)?;
        }

        let address = match descriptor.target {
            MethodTarget::Address(0) => {
                return Err(ResolutionError::NullAddress {
                    method: descriptor.name.clone(),
                }
                .into())
            }
            MethodTarget::Address(address) => address,
            MethodTarget::Virtual(ordinal) => {
                let vt = match *table {
                    Some(vt) => vt,
                    None => *table.insert(VirtualTable::of(base, slots, self.config.require_alignment)?),
                };
                vt.slot(ordinal)?
            }
        };

        logging::log_resolution(&descriptor.name, address);
        Ok(BoundCallable::new(
            descriptor.name.as_str(),
            address,
            descriptor.convention,
            descriptor.params.as_slice(),
            descriptor.returns,
            base,
        ))
    }
}

/// A foreign object viewed through its schema: one bound callable per method
#[derive(Debug, Clone)]
pub struct Proxy {
    base: Address,
    methods: HashMap<String, BoundCallable>,
    schema: ProxySchema,
    binder: Binder,
}

impl Proxy {
    /// Object address this proxy was bound against
    pub fn base(&self) -> Address {
        self.base
    }

    pub fn schema(&self) -> &ProxySchema {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&BoundCallable> {
        self.methods.get(name)
    }

    pub fn method(&self, name: &str) -> std::result::Result<&BoundCallable, ResolutionError> {
        self.get(name).ok_or_else(|| ResolutionError::UnknownMethod {
            name: name.to_string(),
        })
    }

    /// Method names in schema declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.schema.methods().iter().map(|m| m.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Invoke the method `name`
    ///
    /// # Safety
    /// The foreign object must still be alive; see [`BoundCallable::call`].
    pub unsafe fn call(&self, name: &str, args: &[FfiValue]) -> Result<FfiValue> {
        let method = self.method(name).map_err(Error::from)?;
        method.call(args)
    }

    /// Resolve the same schema against another object
    ///
    /// # Safety
    /// See [`Binder::bind`].
    pub unsafe fn rebind(&self, base: Address) -> Result<Proxy> {
        self.binder.bind(base, &self.schema)
    }
}
