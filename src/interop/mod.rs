//! Interoperability - call native functions by address
//!
//! Design: every argument and return value is one machine word. Conventions
//! and arities form a closed table of primitives; the dispatcher picks one.
//!
//! Architecture:
//! - `types.rs` - word aliases, FFI type tags and language-level values
//! - `abi.rs` - calling convention tags
//! - `call.rs` - per-(convention, arity) primitives and the dispatcher
//! - `marshal.rs` - value ↔ word conversion and per-call text buffers
//! - `stats.rs` - process-wide counters

mod abi;
mod call;
mod marshal;
mod stats;
mod types;

pub use abi::{CallingConvention, UnknownConvention, MAX_ARGS};
pub use call::{cdecl, dispatch, dispatch_method, stdcall, thiscall};
pub use marshal::{
    check_param_type, check_return_type, from_word, marshal_args, read_text, to_word, ArgWords,
    TextArena,
};
pub use stats::{reset_stats, stats, InteropStats};
pub use types::{Address, FfiType, FfiValue, Word, WORD_SIZE};

pub(crate) use stats::record_bind;
