//! Method schemas - the structural description of a foreign object
//!
//! A schema is an ordered list of method descriptors plus the number of
//! virtual-table slots it declares. Virtual methods take the next free ordinal
//! in declaration order, matching how the foreign compiler lays out the table;
//! that ordering is the compatibility contract between the two sides.

use crate::errors::SchemaError;
use crate::interop::{Address, CallingConvention, FfiType};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::path::Path;

/// Where a method's entry point comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodTarget {
    /// Explicit entry point (free functions, static or non-virtual members)
    Address(Address),
    /// Slot index in the object's virtual table
    Virtual(usize),
}

/// Signature and location of one foreign method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub name: String,
    pub convention: CallingConvention,
    pub params: Vec<FfiType>,
    pub returns: FfiType,
    pub target: MethodTarget,
}

impl MethodDescriptor {
    /// Virtual table ordinal, if this method dispatches through the table
    pub fn ordinal(&self) -> Option<usize> {
        match self.target {
            MethodTarget::Virtual(ordinal) => Some(ordinal),
            MethodTarget::Address(_) => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.ordinal().is_some()
    }
}

/// Immutable structural description of a proxy type
///
/// Serializes to the same layout [`ProxySchema::from_toml_str`] and
/// [`ProxySchema::from_json_str`] read, with every ordinal, convention and
/// the slot count written out explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySchema {
    methods: Vec<MethodDescriptor>,
    slots: usize,
}

impl ProxySchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Descriptors in declaration order
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Number of virtual-table slots this schema declares
    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn get(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Parse a TOML schema
    pub fn from_toml_str(source: &str) -> Result<Self, SchemaError> {
        let raw: RawSchema = toml::from_str(source)?;
        raw.into_schema()
    }

    /// Parse a JSON schema
    pub fn from_json_str(source: &str) -> Result<Self, SchemaError> {
        let raw: RawSchema = serde_json::from_str(source)?;
        raw.into_schema()
    }

    pub fn to_toml_string(&self) -> Result<String, SchemaError> {
        Ok(toml::to_string(&RawSchema::of(self))?)
    }

    pub fn to_json_string(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(&RawSchema::of(self))?)
    }

    /// Load a schema file; `.toml` and `.json` are recognized
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&source),
            Some("json") => Self::from_json_str(&source),
            other => Err(SchemaError::UnknownFormat(other.unwrap_or_default().to_string())),
        }
    }
}

/// Incremental schema construction with implicit ordinal assignment
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    methods: Vec<MethodDescriptor>,
    next_ordinal: usize,
    slots: Option<usize>,
}

impl SchemaBuilder {
    /// Declare a virtual method at the next free ordinal
    pub fn virtual_method(
        self,
        name: impl Into<String>,
        convention: CallingConvention,
        params: &[FfiType],
        returns: FfiType,
    ) -> Self {
        let ordinal = self.next_ordinal;
        self.virtual_at(ordinal, name, convention, params, returns)
    }

    /// Declare a virtual method at an explicit ordinal; later implicit
    /// ordinals continue after it
    pub fn virtual_at(
        mut self,
        ordinal: usize,
        name: impl Into<String>,
        convention: CallingConvention,
        params: &[FfiType],
        returns: FfiType,
    ) -> Self {
        self.next_ordinal = self.next_ordinal.max(ordinal.saturating_add(1));
        self.methods.push(MethodDescriptor {
            name: name.into(),
            convention,
            params: params.to_vec(),
            returns,
            target: MethodTarget::Virtual(ordinal),
        });
        self
    }

    /// Reserve table slots the caller does not bind (inherited entries,
    /// destructors)
    pub fn skip_slots(mut self, count: usize) -> Self {
        self.next_ordinal = self.next_ordinal.saturating_add(count);
        self
    }

    /// Declare a method with an explicit entry point
    pub fn static_method(
        mut self,
        name: impl Into<String>,
        address: Address,
        convention: CallingConvention,
        params: &[FfiType],
        returns: FfiType,
    ) -> Self {
        self.methods.push(MethodDescriptor {
            name: name.into(),
            convention,
            params: params.to_vec(),
            returns,
            target: MethodTarget::Address(address),
        });
        self
    }

    /// Add a prebuilt descriptor
    pub fn method(mut self, descriptor: MethodDescriptor) -> Self {
        if let MethodTarget::Virtual(ordinal) = descriptor.target {
            self.next_ordinal = self.next_ordinal.max(ordinal.saturating_add(1));
        }
        self.methods.push(descriptor);
        self
    }

    /// Declare the table length; defaults to one past the highest ordinal
    pub fn slots(mut self, slots: usize) -> Self {
        self.slots = Some(slots);
        self
    }

    pub fn build(self) -> Result<ProxySchema, SchemaError> {
        let mut seen = HashSet::with_capacity(self.methods.len());
        for method in &self.methods {
            if !seen.insert(method.name.as_str()) {
                return Err(SchemaError::DuplicateMethod(method.name.clone()));
            }
        }

        // Such a schema could never bind under the strict policy
        let required = self
            .methods
            .iter()
            .filter_map(|m| m.ordinal())
            .map(|ordinal| ordinal.saturating_add(1))
            .max()
            .unwrap_or(0);
        if let Some(slots) = self.slots.filter(|&slots| slots < required) {
            return Err(SchemaError::SlotsTooSmall { slots, required });
        }

        Ok(ProxySchema {
            slots: self.slots.unwrap_or(self.next_ordinal),
            methods: self.methods,
        })
    }
}

/// On-disk schema layout
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slots: Option<usize>,
    #[serde(default)]
    methods: Vec<RawMethod>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMethod {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    convention: Option<CallingConvention>,
    #[serde(default)]
    params: Vec<FfiType>,
    #[serde(default = "void")]
    returns: FfiType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ordinal: Option<usize>,
    /// Table slots to skip before this method
    #[serde(default, skip_serializing_if = "is_zero")]
    skip: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

fn void() -> FfiType {
    FfiType::Void
}

impl Serialize for ProxySchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawSchema::of(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProxySchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawSchema::deserialize(deserializer)?
            .into_schema()
            .map_err(serde::de::Error::custom)
    }
}

impl RawSchema {
    fn of(schema: &ProxySchema) -> Self {
        let methods = schema
            .methods
            .iter()
            .cloned()
            .map(|m| {
                let (address, ordinal) = match m.target {
                    MethodTarget::Address(address) => (Some(address), None),
                    MethodTarget::Virtual(ordinal) => (None, Some(ordinal)),
                };
                RawMethod {
                    name: m.name,
                    convention: Some(m.convention),
                    params: m.params,
                    returns: m.returns,
                    address,
                    ordinal,
                    skip: 0,
                }
            })
            .collect();

        RawSchema {
            slots: Some(schema.slots),
            methods,
        }
    }

    fn into_schema(self) -> Result<ProxySchema, SchemaError> {
        let mut builder = ProxySchema::builder();
        if let Some(slots) = self.slots {
            builder = builder.slots(slots);
        }

        for m in self.methods {
            builder = builder.skip_slots(m.skip);
            builder = match (m.address, m.ordinal) {
                (Some(_), Some(_)) => return Err(SchemaError::AmbiguousTarget(m.name)),
                (Some(address), None) => {
                    let convention = m.convention.unwrap_or(CallingConvention::Cdecl);
                    builder.static_method(m.name, address, convention, &m.params, m.returns)
                }
                (None, Some(ordinal)) => {
                    let convention = m.convention.unwrap_or(CallingConvention::Thiscall);
                    builder.virtual_at(ordinal, m.name, convention, &m.params, m.returns)
                }
                (None, None) => {
                    let convention = m.convention.unwrap_or(CallingConvention::Thiscall);
                    builder.virtual_method(m.name, convention, &m.params, m.returns)
                }
            };
        }

        builder.build()
    }
}
