//! Native call targets for exercising cppcall against C-compiled code
//!
//! Only the cdecl getters below are linked by name. Every stdcall and
//! thiscall target is reached through the address one of them returns.

use std::ffi::{c_int, c_void};

extern "C" {
    /// Free function returning its last argument (42 for arity 0)
    pub fn tb_cdecl_nth_addr(arity: c_int) -> usize;
    pub fn tb_stdcall_nth_addr(arity: c_int) -> usize;

    /// `42`, `a + 1`, `a / b`, `a / b / c`, `a / b / c / d`, `e`
    pub fn tb_stdcall_f_addr(arity: c_int) -> usize;
    /// As [`tb_stdcall_f_addr`] behind a receiver, up to arity 6
    pub fn tb_thiscall_f_addr(arity: c_int) -> usize;
    /// `(this, a, b) -> this * 100 + a * 10 + b`
    pub fn tb_thiscall_mix_addr() -> usize;

    pub fn tb_cdecl_inc_addr() -> usize;
    pub fn tb_cdecl_echo_addr() -> usize;
    pub fn tb_cdecl_length_addr() -> usize;

    pub fn tb_counter_new(value: isize) -> *mut c_void;
    /// Same table layout, slot 0 returns the negated value
    pub fn tb_counter_new_negated(value: isize) -> *mut c_void;
    pub fn tb_counter_free(counter: *mut c_void);
    pub fn tb_counter_value(counter: *const c_void) -> isize;
    /// Non-virtual `scaled(factor)` member
    pub fn tb_counter_scaled_addr() -> usize;
    pub fn tb_counter_slot_count() -> usize;
}

/// Owns a native counter object
///
/// Layout: `{ vtbl, value }` with six slots
/// `get, add, name, echo, bump, sum6`.
pub struct Counter(*mut c_void);

impl Counter {
    pub fn new(value: isize) -> Self {
        let ptr = unsafe { tb_counter_new(value) };
        assert!(!ptr.is_null(), "counter allocation failed");
        Self(ptr)
    }

    pub fn negated(value: isize) -> Self {
        let ptr = unsafe { tb_counter_new_negated(value) };
        assert!(!ptr.is_null(), "counter allocation failed");
        Self(ptr)
    }

    pub fn base(&self) -> usize {
        self.0 as usize
    }

    pub fn value(&self) -> isize {
        unsafe { tb_counter_value(self.0) }
    }
}

impl Drop for Counter {
    fn drop(&mut self) {
        unsafe { tb_counter_free(self.0) }
    }
}
