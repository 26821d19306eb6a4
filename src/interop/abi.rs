//! Calling convention tags
//!
//! The set is closed: caller-cleans (`cdecl`), callee-cleans (`stdcall`) and
//! instance calls with the receiver in the implicit parameter (`thiscall`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of explicit machine-word arguments a primitive accepts.
///
/// For thiscall this excludes the receiver.
pub const MAX_ARGS: usize = 6;

/// Calling convention tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CallingConvention {
    /// Caller cleans the stack, arguments pushed right to left
    #[serde(alias = "c")]
    Cdecl,
    /// Callee cleans the stack
    #[serde(alias = "std")]
    Stdcall,
    /// Receiver in the convention's implicit `this` slot (ECX on 32-bit x86)
    #[serde(alias = "this")]
    Thiscall,
}

impl CallingConvention {
    /// Whether calls in this convention carry an implicit receiver
    #[inline]
    pub const fn has_receiver(self) -> bool {
        matches!(self, Self::Thiscall)
    }

    /// Whether the callee pops its own arguments on this target.
    ///
    /// Only 32-bit x86 distinguishes conventions by stack cleanup; everywhere
    /// else all three collapse onto the platform C ABI.
    #[inline]
    pub const fn callee_cleans(self) -> bool {
        cfg!(target_arch = "x86") && matches!(self, Self::Stdcall | Self::Thiscall)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cdecl => "cdecl",
            Self::Stdcall => "stdcall",
            Self::Thiscall => "thiscall",
        }
    }
}

impl Default for CallingConvention {
    #[inline]
    fn default() -> Self {
        Self::Cdecl
    }
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized convention tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConvention(pub String);

impl fmt::Display for UnknownConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown calling convention '{}'", self.0)
    }
}

impl std::error::Error for UnknownConvention {}

impl FromStr for CallingConvention {
    type Err = UnknownConvention;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cdecl" | "c" => Ok(Self::Cdecl),
            "stdcall" | "std" => Ok(Self::Stdcall),
            "thiscall" | "this" => Ok(Self::Thiscall),
            _ => Err(UnknownConvention(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_struct_tag_vocabulary() {
        assert_eq!("std".parse(), Ok(CallingConvention::Stdcall));
        assert_eq!("this".parse(), Ok(CallingConvention::Thiscall));
        assert_eq!("CDECL".parse(), Ok(CallingConvention::Cdecl));
        assert!("fastcall".parse::<CallingConvention>().is_err());
    }

    #[test]
    fn test_only_thiscall_has_receiver() {
        assert!(CallingConvention::Thiscall.has_receiver());
        assert!(!CallingConvention::Stdcall.has_receiver());
        assert!(!CallingConvention::Cdecl.has_receiver());
    }

    #[test]
    fn test_cleanup_collapses_off_x86() {
        assert!(!CallingConvention::Cdecl.callee_cleans());
        if !cfg!(target_arch = "x86") {
            assert!(!CallingConvention::Stdcall.callee_cleans());
            assert!(!CallingConvention::Thiscall.callee_cleans());
        }
    }
}
