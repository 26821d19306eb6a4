//! Virtual table access
//!
//! An instance stores the address of its type's table in its first word; the
//! table is an array of function pointers indexed by ordinal. Nothing here is
//! copied or owned; every read goes straight to foreign memory.

use crate::errors::ResolutionError;
use crate::interop::{Address, Word, WORD_SIZE};

/// Reject null and, optionally, misaligned addresses without dereferencing.
///
/// This is as far as validation can go; a non-null aligned address may still
/// be unmapped.
pub fn check_object(addr: Address, require_alignment: bool) -> Result<(), ResolutionError> {
    if addr == 0 {
        return Err(ResolutionError::NullObject);
    }
    if require_alignment && addr % WORD_SIZE != 0 {
        return Err(ResolutionError::Misaligned { address: addr });
    }
    Ok(())
}

/// Read one machine word from foreign memory
///
/// # Safety
/// `addr` must be readable for `WORD_SIZE` bytes.
#[inline]
pub unsafe fn read_word(addr: Address) -> Word {
    core::ptr::read_unaligned(addr as *const Word)
}

/// View of one object's virtual table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualTable {
    object: Address,
    table: Address,
    slots: Option<usize>,
}

impl VirtualTable {
    /// Locate the table of the object at `object`.
    ///
    /// `slots` bounds later ordinal lookups; `None` disables the bound.
    ///
    /// # Safety
    /// `object` must point to a live instance whose first word is its
    /// virtual table pointer.
    pub unsafe fn of(object: Address, slots: Option<usize>, require_alignment: bool) -> Result<Self, ResolutionError> {
        check_object(object, require_alignment)?;

        let table = read_word(object);
        if table == 0 {
            return Err(ResolutionError::NullVtable { object });
        }
        if require_alignment && table % WORD_SIZE != 0 {
            return Err(ResolutionError::Misaligned { address: table });
        }

        Ok(Self { object, table, slots })
    }

    pub fn object(&self) -> Address {
        self.object
    }

    /// Address of slot 0
    pub fn address(&self) -> Address {
        self.table
    }

    pub fn slots(&self) -> Option<usize> {
        self.slots
    }

    /// Function pointer stored at `ordinal`
    ///
    /// # Safety
    /// Without a slot bound, `ordinal` must lie inside the foreign table.
    pub unsafe fn slot(&self, ordinal: usize) -> Result<Address, ResolutionError> {
        let out_of_range = || ResolutionError::OrdinalOutOfRange {
            ordinal,
            slots: self.slots.unwrap_or(usize::MAX),
        };

        if let Some(slots) = self.slots {
            if ordinal >= slots {
                return Err(out_of_range());
            }
        }

        let entry = ordinal
            .checked_mul(WORD_SIZE)
            .and_then(|offset| self.table.checked_add(offset))
            .ok_or_else(out_of_range)?;

        match read_word(entry) {
            0 => Err(ResolutionError::NullSlot { ordinal }),
            func => Ok(func),
        }
    }
}
