//! Raw call primitives and the convention dispatcher
//!
//! Each (convention, arity) pair has its own fixed call-site shape, so the
//! primitives are a closed, macro-generated set rather than a variadic loop.
//! On 32-bit x86 the three conventions use the compiler's `cdecl`, `stdcall`
//! and `thiscall` ABIs (the latter loads the receiver into ECX). Every other
//! target has a single C ABI in which member calls take `this` as the leading
//! integer argument, so all three collapse onto `extern "C"`.

use super::abi::{CallingConvention, MAX_ARGS};
use super::types::{Address, Word};
use crate::errors::CallError;
use tracing::{trace, warn};

macro_rules! word {
    ($arg:ident) => {
        Word
    };
}

macro_rules! free_primitives {
    ($abi:tt) => {
        free_primitives!(@fn $abi, call0());
        free_primitives!(@fn $abi, call1(a0));
        free_primitives!(@fn $abi, call2(a0, a1));
        free_primitives!(@fn $abi, call3(a0, a1, a2));
        free_primitives!(@fn $abi, call4(a0, a1, a2, a3));
        free_primitives!(@fn $abi, call5(a0, a1, a2, a3, a4));
        free_primitives!(@fn $abi, call6(a0, a1, a2, a3, a4, a5));

        /// Select the primitive whose arity equals `args.len()`.
        ///
        /// # Safety
        /// `addr` must be a function of this convention taking exactly
        /// `args.len()` word-sized arguments.
        pub unsafe fn call(addr: Address, args: &[Word]) -> Result<Word, CallError> {
            Ok(match *args {
                [] => call0(addr),
                [a0] => call1(addr, a0),
                [a0, a1] => call2(addr, a0, a1),
                [a0, a1, a2] => call3(addr, a0, a1, a2),
                [a0, a1, a2, a3] => call4(addr, a0, a1, a2, a3),
                [a0, a1, a2, a3, a4] => call5(addr, a0, a1, a2, a3, a4),
                [a0, a1, a2, a3, a4, a5] => call6(addr, a0, a1, a2, a3, a4, a5),
                _ => {
                    return Err(CallError::Arity {
                        got: args.len(),
                        max: MAX_ARGS,
                    })
                }
            })
        }
    };
    (@fn $abi:tt, $name:ident($($arg:ident),*)) => {
        /// # Safety
        /// `addr` must point to a function of this convention and arity.
        #[inline]
        pub unsafe fn $name(addr: Address $(, $arg: Word)*) -> Word {
            let f = core::mem::transmute::<Address, unsafe extern $abi fn($(word!($arg)),*) -> Word>(addr);
            f($($arg),*)
        }
    };
}

macro_rules! method_primitives {
    ($abi:tt) => {
        method_primitives!(@fn $abi, call0());
        method_primitives!(@fn $abi, call1(a0));
        method_primitives!(@fn $abi, call2(a0, a1));
        method_primitives!(@fn $abi, call3(a0, a1, a2));
        method_primitives!(@fn $abi, call4(a0, a1, a2, a3));
        method_primitives!(@fn $abi, call5(a0, a1, a2, a3, a4));
        method_primitives!(@fn $abi, call6(a0, a1, a2, a3, a4, a5));

        /// Select the primitive whose explicit arity equals `args.len()`.
        ///
        /// # Safety
        /// `addr` must be an instance method of `this` taking exactly
        /// `args.len()` explicit word-sized arguments.
        pub unsafe fn call(addr: Address, this: Address, args: &[Word]) -> Result<Word, CallError> {
            Ok(match *args {
                [] => call0(addr, this),
                [a0] => call1(addr, this, a0),
                [a0, a1] => call2(addr, this, a0, a1),
                [a0, a1, a2] => call3(addr, this, a0, a1, a2),
                [a0, a1, a2, a3] => call4(addr, this, a0, a1, a2, a3),
                [a0, a1, a2, a3, a4] => call5(addr, this, a0, a1, a2, a3, a4),
                [a0, a1, a2, a3, a4, a5] => call6(addr, this, a0, a1, a2, a3, a4, a5),
                _ => {
                    return Err(CallError::Arity {
                        got: args.len(),
                        max: MAX_ARGS,
                    })
                }
            })
        }
    };
    (@fn $abi:tt, $name:ident($($arg:ident),*)) => {
        /// # Safety
        /// `addr` must be an instance method of `this` with this arity.
        #[inline]
        pub unsafe fn $name(addr: Address, this: Address $(, $arg: Word)*) -> Word {
            let f = core::mem::transmute::<Address, unsafe extern $abi fn(Address $(, word!($arg))*) -> Word>(addr);
            f(this $(, $arg)*)
        }
    };
}

/// Caller-cleans primitives
pub mod cdecl {
    use super::*;

    #[cfg(target_arch = "x86")]
    free_primitives!("cdecl");
    #[cfg(not(target_arch = "x86"))]
    free_primitives!("C");
}

/// Callee-cleans primitives
pub mod stdcall {
    use super::*;

    #[cfg(target_arch = "x86")]
    free_primitives!("stdcall");
    #[cfg(not(target_arch = "x86"))]
    free_primitives!("C");
}

/// Instance-call primitives; the receiver never appears among `a0..a5`
pub mod thiscall {
    use super::*;

    #[cfg(target_arch = "x86")]
    method_primitives!("thiscall");
    #[cfg(not(target_arch = "x86"))]
    method_primitives!("C");
}

/// Call `addr` with `args` using `convention`.
///
/// For [`CallingConvention::Thiscall`] the first word is the receiver and the
/// remaining words are the explicit arguments. Arity is checked before any
/// native code runs.
///
/// # Safety
/// `addr` must be a live function of the given convention whose parameter
/// list matches `args`. An invalid address faults the process.
pub unsafe fn dispatch(
    addr: Address,
    convention: CallingConvention,
    args: &[Word],
) -> Result<Word, CallError> {
    let result = match convention {
        CallingConvention::Cdecl => cdecl::call(addr, args),
        CallingConvention::Stdcall => stdcall::call(addr, args),
        CallingConvention::Thiscall => match args.split_first() {
            Some((&this, rest)) => return dispatch_method(addr, this, rest),
            None => Err(CallError::MissingReceiver),
        },
    };
    record(addr, convention, args.len(), &result);
    result
}

/// Call the instance method at `addr` on the receiver `this`.
///
/// # Safety
/// See [`dispatch`]; additionally `this` must be the object the method
/// expects as its receiver.
pub unsafe fn dispatch_method(addr: Address, this: Address, args: &[Word]) -> Result<Word, CallError> {
    let result = thiscall::call(addr, this, args);
    record(addr, CallingConvention::Thiscall, args.len(), &result);
    result
}

fn record(addr: Address, convention: CallingConvention, arity: usize, result: &Result<Word, CallError>) {
    match result {
        Ok(ret) => {
            super::stats::record_call();
            trace!(
                target: "cppcall::dispatch",
                address = addr,
                %convention,
                arity,
                ret,
                "native call returned"
            );
        }
        Err(err) => {
            match err {
                CallError::Arity { .. } => super::stats::record_arity_error(),
                CallError::MissingReceiver => super::stats::record_receiver_error(),
            }
            warn!(
                target: "cppcall::dispatch",
                address = addr,
                %convention,
                arity,
                error = %err,
                "native call rejected"
            );
        }
    }
}
