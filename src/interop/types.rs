//! Type definitions for the native call boundary
//!
//! Everything crossing the boundary is a single machine word. `FfiType` tags
//! describe how a language-level `FfiValue` is packed into, or unpacked from,
//! that word.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Native pointer-sized integer used for arguments and return values.
pub type Word = usize;

/// Location in the foreign address space. Never owned by this crate.
pub type Address = usize;

/// Size of a machine word in bytes
pub const WORD_SIZE: usize = core::mem::size_of::<Word>();

/// FFI type tag
///
/// Unknown tag names parse as [`FfiType::Raw`]: the value is passed through as
/// an unconverted machine word. Aggregates and length-carrying sequences have
/// no tag of their own and must be reduced to a handle by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
#[repr(u8)]
pub enum FfiType {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    ISize,
    U8,
    U16,
    U32,
    U64,
    USize,
    Pointer,
    String,
    F32,
    F64,
    /// Opaque word, no conversion
    Raw,
}

impl FfiType {
    /// Get size of type in bytes
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::Void => 0,
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
            Self::ISize | Self::USize | Self::Pointer | Self::String | Self::Raw => WORD_SIZE,
        }
    }

    /// Check if type is a signed integer
    #[inline]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::ISize)
    }

    /// Check if type is an unsigned integer
    #[inline]
    pub const fn is_unsigned(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::USize)
    }

    /// Check if type is integral
    #[inline]
    pub const fn is_integral(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Check if type is floating point
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Whether a value of this type travels in the integer word path.
    ///
    /// Floats are returned and passed in separate registers on most ABIs, so
    /// they cannot be expressed through a word-only primitive.
    #[inline]
    pub const fn fits_word(self) -> bool {
        !self.is_float() && self.size() <= WORD_SIZE
    }

    /// Inclusive value range for integral tags, widened to `i128`.
    pub const fn range(self) -> Option<(i128, i128)> {
        match self {
            Self::Bool => Some((0, 1)),
            Self::I8 => Some((i8::MIN as i128, i8::MAX as i128)),
            Self::I16 => Some((i16::MIN as i128, i16::MAX as i128)),
            Self::I32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Self::I64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Self::ISize => Some((isize::MIN as i128, isize::MAX as i128)),
            Self::U8 => Some((0, u8::MAX as i128)),
            Self::U16 => Some((0, u16::MAX as i128)),
            Self::U32 => Some((0, u32::MAX as i128)),
            Self::U64 => Some((0, u64::MAX as i128)),
            Self::USize | Self::Pointer => Some((0, usize::MAX as i128)),
            Self::Raw => Some((isize::MIN as i128, usize::MAX as i128)),
            _ => None,
        }
    }
}

impl fmt::Display for FfiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::ISize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::USize => "usize",
            Self::Pointer => "pointer",
            Self::String => "string",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Raw => "raw",
        };
        f.write_str(name)
    }
}

impl FromStr for FfiType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "void" => Self::Void,
            "bool" => Self::Bool,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "isize" | "int" => Self::ISize,
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "usize" | "uint" | "uintptr" => Self::USize,
            "pointer" | "ptr" | "handle" => Self::Pointer,
            "string" | "str" | "text" => Self::String,
            "f32" => Self::F32,
            "f64" => Self::F64,
            _ => Self::Raw,
        })
    }
}

impl From<String> for FfiType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(ty) => ty,
            Err(never) => match never {},
        }
    }
}

/// Language-level value handed to, or returned from, a bound callable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FfiValue {
    /// Result of a `void` function
    Void,
    /// Null pointer or null string
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Handle(Address),
    /// Bytes without the trailing NUL
    Text(Vec<u8>),
}

impl FfiValue {
    /// Short name used in error messages
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Handle(_) => "handle",
            Self::Text(_) => "text",
        }
    }

    /// Integer view of the value, if it has one
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Self::Bool(b) => Some(b as i128),
            Self::Int(v) => Some(v as i128),
            Self::UInt(v) => Some(v as i128),
            Self::Handle(a) => Some(a as i128),
            Self::Null => Some(0),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&[u8]> {
        match self {
            Self::Text(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl Default for FfiValue {
    #[inline]
    fn default() -> Self {
        Self::Void
    }
}

impl From<bool> for FfiValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FfiValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FfiValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for FfiValue {
    fn from(v: u32) -> Self {
        Self::UInt(v as u64)
    }
}

impl From<u64> for FfiValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<&str> for FfiValue {
    fn from(v: &str) -> Self {
        Self::Text(v.as_bytes().to_vec())
    }
}

impl From<String> for FfiValue {
    fn from(v: String) -> Self {
        Self::Text(v.into_bytes())
    }
}

impl From<&[u8]> for FfiValue {
    fn from(v: &[u8]) -> Self {
        Self::Text(v.to_vec())
    }
}
