//! Type marshaling - language values ↔ machine words
//!
//! Scalars are range-checked and packed into a single word. Text arguments are
//! copied into NUL-terminated buffers owned by a [`TextArena`] that lives for
//! exactly one native call.

use super::stats;
use super::types::{Address, FfiType, FfiValue, Word};
use crate::errors::ConversionError;
use smallvec::SmallVec;
use std::ffi::{CStr, CString};
use tracing::trace;

/// Marshaled argument words for one call (receiver included for thiscall)
pub type ArgWords = SmallVec<[Word; 8]>;

/// Owner of the NUL-terminated buffers created for text arguments.
///
/// Buffers are released when the arena drops, which callers arrange to happen
/// right after the native call returns. If the foreign function faults the
/// process never gets that far; the buffers leak with it.
#[derive(Debug, Default)]
pub struct TextArena {
    buffers: SmallVec<[CString; 2]>,
}

impl TextArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `bytes` into a NUL-terminated buffer and return its address
    pub fn alloc(&mut self, bytes: &[u8]) -> Result<Address, ConversionError> {
        let owned = CString::new(bytes).map_err(|e| ConversionError::InteriorNul {
            position: e.nul_position(),
        })?;
        let addr = owned.as_ptr() as Address;
        self.buffers.push(owned);
        Ok(addr)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Check that a declared type can travel through the word-only call path.
///
/// `Void` is only meaningful as a return type.
pub fn check_param_type(ty: FfiType) -> Result<(), ConversionError> {
    if ty == FfiType::Void || !ty.fits_word() {
        return Err(ConversionError::UnsupportedType { ty });
    }
    Ok(())
}

/// Check that a declared return type can be read back from one word
pub fn check_return_type(ty: FfiType) -> Result<(), ConversionError> {
    if ty != FfiType::Void && !ty.fits_word() {
        return Err(ConversionError::UnsupportedType { ty });
    }
    Ok(())
}

/// Marshal one value to a machine word
pub fn to_word(value: &FfiValue, ty: FfiType, arena: &mut TextArena) -> Result<Word, ConversionError> {
    let result = pack(value, ty, arena);
    match &result {
        Ok(word) => trace!(target: "cppcall::marshal", from = value.kind(), to = %ty, word, "packed argument"),
        Err(_) => stats::record_marshaling_error(),
    }
    result
}

fn pack(value: &FfiValue, ty: FfiType, arena: &mut TextArena) -> Result<Word, ConversionError> {
    check_param_type(ty)?;

    match (ty, value) {
        (_, FfiValue::Void) => Err(mismatch(ty, value)),
        (FfiType::String, FfiValue::Text(bytes)) => arena.alloc(bytes),
        (FfiType::String, FfiValue::Null) => Ok(0),
        (FfiType::String, _) => Err(mismatch(ty, value)),
        (FfiType::Pointer | FfiType::Raw, FfiValue::Handle(addr)) => Ok(*addr),
        (FfiType::Pointer | FfiType::Raw, FfiValue::Null) => Ok(0),
        (_, FfiValue::Text(_) | FfiValue::Handle(_) | FfiValue::Null) => Err(mismatch(ty, value)),
        (FfiType::Pointer, FfiValue::Bool(_)) => Err(mismatch(ty, value)),
        _ => pack_integral(value, ty),
    }
}

fn pack_integral(value: &FfiValue, ty: FfiType) -> Result<Word, ConversionError> {
    let v = value.as_i128().ok_or_else(|| mismatch(ty, value))?;
    let (lo, hi) = ty.range().ok_or(ConversionError::UnsupportedType { ty })?;
    if v < lo || v > hi {
        return Err(ConversionError::OutOfRange { value: v, ty });
    }
    // Truncation keeps the two's complement bits, so negatives sign-extend.
    Ok(v as Word)
}

fn mismatch(expected: FfiType, found: &FfiValue) -> ConversionError {
    ConversionError::Mismatch {
        expected,
        found: found.kind(),
    }
}

/// Marshal every argument of a call, checking the declared count first
pub fn marshal_args(
    args: &[FfiValue],
    types: &[FfiType],
    arena: &mut TextArena,
    out: &mut ArgWords,
) -> Result<(), ConversionError> {
    if args.len() != types.len() {
        stats::record_marshaling_error();
        return Err(ConversionError::ArgCount {
            expected: types.len(),
            got: args.len(),
        });
    }

    for (value, &ty) in args.iter().zip(types) {
        out.push(to_word(value, ty, arena)?);
    }
    Ok(())
}

/// Unmarshal a returned machine word
///
/// # Safety
/// For [`FfiType::String`] a non-zero `word` must point to a NUL-terminated
/// byte sequence. The callee supplies no length, so an unterminated string
/// reads past its allocation.
pub unsafe fn from_word(word: Word, ty: FfiType) -> Result<FfiValue, ConversionError> {
    let value = match ty {
        FfiType::Void => FfiValue::Void,
        FfiType::Bool => FfiValue::Bool(word as u8 != 0),
        FfiType::I8 => FfiValue::Int(word as i8 as i64),
        FfiType::I16 => FfiValue::Int(word as i16 as i64),
        FfiType::I32 => FfiValue::Int(word as i32 as i64),
        FfiType::I64 | FfiType::ISize => FfiValue::Int(word as isize as i64),
        FfiType::U8 => FfiValue::UInt(word as u8 as u64),
        FfiType::U16 => FfiValue::UInt(word as u16 as u64),
        FfiType::U32 => FfiValue::UInt(word as u32 as u64),
        FfiType::U64 | FfiType::USize => FfiValue::UInt(word as u64),
        FfiType::Pointer if word == 0 => FfiValue::Null,
        FfiType::Pointer | FfiType::Raw => FfiValue::Handle(word),
        FfiType::String if word == 0 => FfiValue::Null,
        FfiType::String => FfiValue::Text(read_text(word).to_vec()),
        FfiType::F32 | FfiType::F64 => {
            stats::record_marshaling_error();
            return Err(ConversionError::UnsupportedType { ty });
        }
    };
    trace!(target: "cppcall::marshal", word, to = %ty, "unpacked return value");
    Ok(value)
}

/// Borrow the NUL-terminated bytes at `addr`, without the terminator.
///
/// # Safety
/// `addr` must be non-zero and point to a NUL-terminated sequence that
/// outlives the returned slice.
pub unsafe fn read_text<'a>(addr: Address) -> &'a [u8] {
    CStr::from_ptr(addr as *const core::ffi::c_char).to_bytes()
}

