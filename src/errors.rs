//! Error types for dispatch, resolution, marshaling and schema loading
//!
//! Every error here is raised before a native call is attempted. Faults inside
//! the foreign function (bad address, memory corruption, a call that never
//! returns) are outside what this crate can observe.

use crate::interop::{Address, FfiType};
use thiserror::Error;

/// Argument-count failures detected by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("too many arguments: {got} exceeds the supported maximum of {max}")]
    Arity { got: usize, max: usize },

    #[error("thiscall dispatch requires a receiver as the first argument")]
    MissingReceiver,
}

/// Failures while turning a method descriptor into a function address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("object base address is null")]
    NullObject,

    #[error("address {address:#x} is not word aligned")]
    Misaligned { address: Address },

    #[error("object at {object:#x} has a null virtual table pointer")]
    NullVtable { object: Address },

    #[error("virtual table ordinal {ordinal} is outside the declared {slots} slots")]
    OrdinalOutOfRange { ordinal: usize, slots: usize },

    #[error("virtual table slot {ordinal} holds a null function pointer")]
    NullSlot { ordinal: usize },

    #[error("method '{method}' declares a null entry point")]
    NullAddress { method: String },

    #[error("no method named '{name}' is bound on this proxy")]
    UnknownMethod { name: String },
}

/// A value or declared type that cannot travel through one machine word.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("type {ty:?} cannot be passed as a machine word")]
    UnsupportedType { ty: FfiType },

    #[error("expected a value compatible with {expected:?}, found {found}")]
    Mismatch { expected: FfiType, found: &'static str },

    #[error("value {value} does not fit in {ty:?}")]
    OutOfRange { value: i128, ty: FfiType },

    #[error("text argument contains an interior NUL byte at offset {position}")]
    InteriorNul { position: usize },

    #[error("method expects {expected} arguments, got {got}")]
    ArgCount { expected: usize, got: usize },
}

/// Failures while reading a method schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid TOML schema: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot write TOML schema: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("cannot read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrecognized schema file extension '{0}'")]
    UnknownFormat(String),

    #[error("method '{0}' is declared more than once")]
    DuplicateMethod(String),

    #[error("method '{0}' declares both an address and a vtable ordinal")]
    AmbiguousTarget(String),

    #[error("schema declares {slots} vtable slots but uses ordinals up to {}", .required - 1)]
    SlotsTooSmall { slots: usize, required: usize },
}

/// Umbrella error returned by the binder and bound callables.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type Result<T> = std::result::Result<T, Error>;
