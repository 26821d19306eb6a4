//! Bound callables - a resolved entry point plus its marshaling rules

use crate::errors::Result;
use crate::interop::{
    dispatch, from_word, marshal_args, Address, ArgWords, CallingConvention, FfiType, FfiValue, TextArena, Word,
};
use crate::logging;
use std::sync::Arc;

/// A resolved, invocable foreign method.
///
/// Immutable after construction: invoking it never changes its state, and two
/// callables bound from the same descriptor and object compare equal. It stops
/// being valid when the foreign object is destroyed, which the caller must
/// prevent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundCallable {
    name: Arc<str>,
    address: Address,
    convention: CallingConvention,
    params: Arc<[FfiType]>,
    returns: FfiType,
    receiver: Option<Address>,
}

impl BoundCallable {
    /// Bind a raw entry point. `receiver` is required for thiscall and
    /// ignored otherwise.
    pub fn new(
        name: impl Into<Arc<str>>,
        address: Address,
        convention: CallingConvention,
        params: impl Into<Arc<[FfiType]>>,
        returns: FfiType,
        receiver: Address,
    ) -> Self {
        Self {
            name: name.into(),
            address,
            convention,
            params: params.into(),
            returns,
            receiver: convention.has_receiver().then_some(receiver),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved entry point
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn convention(&self) -> CallingConvention {
        self.convention
    }

    pub fn params(&self) -> &[FfiType] {
        &self.params
    }

    pub fn returns(&self) -> FfiType {
        self.returns
    }

    /// Object passed in the implicit `this` slot on every thiscall invocation
    pub fn receiver(&self) -> Option<Address> {
        self.receiver
    }

    /// Marshal `args`, call the entry point, unmarshal the result.
    ///
    /// Text arguments live until the return value has been read, so a callee
    /// that hands back one of its inputs is read safely.
    ///
    /// # Safety
    /// The entry point must still be live and its real signature must match
    /// the declared one. A foreign string return must be NUL-terminated.
    pub unsafe fn call(&self, args: &[FfiValue]) -> Result<FfiValue> {
        logging::log_ffi_call(&self.name, args.len());

        let mut arena = TextArena::new();
        let mut words = ArgWords::new();
        if let Some(this) = self.receiver {
            words.push(this);
        }

        let outcome: Result<FfiValue> = marshal_args(args, &self.params, &mut arena, &mut words)
            .map_err(Into::into)
            .and_then(|()| dispatch(self.address, self.convention, &words).map_err(Into::into))
            .and_then(|ret| from_word(ret, self.returns).map_err(Into::into));
        drop(arena);

        match &outcome {
            Ok(_) => logging::log_ffi_return(&self.name),
            Err(err) => logging::log_ffi_error(&self.name, err),
        }
        outcome
    }

    /// Call with pre-marshaled words; the receiver is still supplied here.
    ///
    /// # Safety
    /// As for [`BoundCallable::call`], with `args` already in the callee's
    /// word representation.
    pub unsafe fn call_words(&self, args: &[Word]) -> Result<Word> {
        let mut words = ArgWords::new();
        if let Some(this) = self.receiver {
            words.push(this);
        }
        words.extend_from_slice(args);
        Ok(dispatch(self.address, self.convention, &words)?)
    }
}
