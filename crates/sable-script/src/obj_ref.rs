// Copyright 2025 the Sable authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Managed references into the script runtime's object model.
//!
//! The runtime distinguishes "I already own a count, take it from me"
//! (*steal*) from "give me my own count to what you have" (*acquire*).
//! Collapsing the two causes refcount leaks or premature frees, so the
//! distinction stays visible at every call site as four constructors, each
//! in a hard (null is an error) and soft (null becomes unreferenced)
//! variant.

use crate::vm::{ScriptHandle, ScriptValue, ScriptVm};
use sable_core::error::EngineError;
use std::fmt;
use std::sync::Arc;

/// A managed reference to a script runtime object.
///
/// Holds at most one runtime reference count and releases it exactly once,
/// on [`release`](ScriptObjectRef::release) or drop. Cloning always
/// acquires a fresh count (a clone of an unreferenced ref is
/// unreferenced); nothing ever steals implicitly.
pub struct ScriptObjectRef {
    vm: Arc<ScriptVm>,
    handle: Option<ScriptHandle>,
}

impl ScriptObjectRef {
    /// Creates an unreferenced wrapper.
    pub fn empty(vm: &Arc<ScriptVm>) -> Self {
        ScriptObjectRef {
            vm: vm.clone(),
            handle: None,
        }
    }

    /// Takes ownership of a count the caller already held.
    /// `None` is an error.
    pub fn stolen(
        vm: &Arc<ScriptVm>,
        obj: Option<ScriptHandle>,
    ) -> Result<Self, EngineError> {
        let handle =
            obj.ok_or(EngineError::InvalidReference("stealing a null script object"))?;
        debug_assert!(vm.lock().is_alive(handle), "stealing a dead script object");
        Ok(ScriptObjectRef {
            vm: vm.clone(),
            handle: Some(handle),
        })
    }

    /// Takes ownership of a count the caller already held; `None` is
    /// tolerated and yields an unreferenced wrapper.
    pub fn stolen_soft(vm: &Arc<ScriptVm>, obj: Option<ScriptHandle>) -> Self {
        if let Some(handle) = obj {
            debug_assert!(vm.lock().is_alive(handle), "stealing a dead script object");
        }
        ScriptObjectRef {
            vm: vm.clone(),
            handle: obj,
        }
    }

    /// Acquires a new count on an existing object. `None` is an error.
    pub fn acquired(
        vm: &Arc<ScriptVm>,
        obj: Option<ScriptHandle>,
    ) -> Result<Self, EngineError> {
        let handle =
            obj.ok_or(EngineError::InvalidReference("acquiring a null script object"))?;
        vm.lock().incref(handle);
        Ok(ScriptObjectRef {
            vm: vm.clone(),
            handle: Some(handle),
        })
    }

    /// Acquires a new count on an existing object; `None` is tolerated and
    /// yields an unreferenced wrapper.
    pub fn acquired_soft(vm: &Arc<ScriptVm>, obj: Option<ScriptHandle>) -> Self {
        if let Some(handle) = obj {
            vm.lock().incref(handle);
        }
        ScriptObjectRef {
            vm: vm.clone(),
            handle: obj,
        }
    }

    /// Whether this wrapper currently references an object.
    pub fn exists(&self) -> bool {
        self.handle.is_some()
    }

    /// The raw handle, or `None` if unreferenced.
    pub fn get(&self) -> Option<ScriptHandle> {
        self.handle
    }

    /// The raw handle, or [`EngineError::InvalidReference`] if
    /// unreferenced.
    pub fn try_get(&self) -> Result<ScriptHandle, EngineError> {
        self.handle
            .ok_or(EngineError::InvalidReference("dereferencing unreferenced script ref"))
    }

    /// Releases the held count, if any. Idempotent: releasing an empty
    /// wrapper is a no-op, every time.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.vm.lock().decref(handle);
        }
    }

    /// Clears the wrapper *without* releasing and returns the raw handle;
    /// the caller now owns the count. Errors if unreferenced.
    pub fn hand_over(&mut self) -> Result<ScriptHandle, EngineError> {
        self.handle
            .take()
            .ok_or(EngineError::InvalidReference("handing over unreferenced script ref"))
    }

    /// Takes an additional count on the object and returns the raw handle;
    /// the caller owns the new count. Errors if unreferenced.
    pub fn new_ref(&self) -> Result<ScriptHandle, EngineError> {
        let handle = self.try_get()?;
        self.vm.lock().incref(handle);
        Ok(handle)
    }

    /// The VM this reference lives in.
    pub fn vm(&self) -> &Arc<ScriptVm> {
        &self.vm
    }

    /// A snapshot of the referenced value. Errors if unreferenced or if
    /// the object has been destroyed out from under a stale raw handle.
    pub fn value(&self) -> Result<ScriptValue, EngineError> {
        let handle = self.try_get()?;
        self.vm
            .lock()
            .value(handle)
            .cloned()
            .ok_or(EngineError::InvalidReference("script object destroyed"))
    }

    /// The referenced string, or a type-mismatch error.
    pub fn str_value(&self) -> Result<String, EngineError> {
        match self.value()? {
            ScriptValue::Str(s) => Ok(s),
            other => Err(EngineError::TypeMismatch {
                expected: "str",
                found: other.kind(),
            }),
        }
    }

    /// The referenced integer, or a type-mismatch error.
    pub fn int_value(&self) -> Result<i64, EngineError> {
        match self.value()? {
            ScriptValue::Int(v) => Ok(v),
            other => Err(EngineError::TypeMismatch {
                expected: "int",
                found: other.kind(),
            }),
        }
    }

    /// Whether the referenced object is callable. Errors if unreferenced.
    pub fn callable_check(&self) -> Result<bool, EngineError> {
        Ok(matches!(self.value()?, ScriptValue::Callable(_)))
    }

    /// Invokes the referenced callable with `args`.
    ///
    /// Script-side failures are caught here at the boundary — logged with
    /// the ambient context and returned as taxonomy errors, never allowed
    /// to propagate as raw runtime state. The heap lock is *not* held
    /// while the callable body runs, so callables may allocate or call
    /// back into the runtime.
    pub fn call(&self, args: &[ScriptValue]) -> Result<ScriptValue, EngineError> {
        let handle = self.try_get()?;
        let callable = {
            let heap = self.vm.lock();
            match heap.value(handle) {
                Some(ScriptValue::Callable(f)) => f.clone(),
                Some(other) => {
                    return Err(EngineError::TypeMismatch {
                        expected: "callable",
                        found: other.kind(),
                    })
                }
                None => {
                    return Err(EngineError::InvalidReference("calling destroyed script object"))
                }
            }
        };
        callable(args).map_err(|e| {
            log::error!(
                "script call failed (ambient context {:?}): {e}",
                sable_core::ContextRef::current()
            );
            e
        })
    }
}

/// Cloning acquires; a clone of an unreferenced wrapper is unreferenced.
impl Clone for ScriptObjectRef {
    fn clone(&self) -> Self {
        if let Some(handle) = self.handle {
            self.vm.lock().incref(handle);
        }
        ScriptObjectRef {
            vm: self.vm.clone(),
            handle: self.handle,
        }
    }
}

impl Drop for ScriptObjectRef {
    fn drop(&mut self) {
        self.release();
    }
}

/// Identity comparison, like the runtime's `is`; two unreferenced
/// wrappers compare equal.
impl PartialEq for ScriptObjectRef {
    fn eq(&self, other: &Self) -> bool {
        match (self.handle, other.handle) {
            (Some(a), Some(b)) => Arc::ptr_eq(&self.vm, &other.vm) && a == b,
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for ScriptObjectRef {}

impl fmt::Debug for ScriptObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handle {
            Some(handle) => write!(f, "ScriptObjectRef({handle:?})"),
            None => write!(f, "ScriptObjectRef(<unreferenced>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refcount(vm: &Arc<ScriptVm>, handle: ScriptHandle) -> Option<u32> {
        vm.lock().refcount(handle)
    }

    #[test]
    fn steal_takes_the_existing_count() {
        let vm = ScriptVm::new();
        let h = vm.alloc(ScriptValue::Int(1));
        let r = ScriptObjectRef::stolen(&vm, Some(h)).unwrap();
        assert_eq!(refcount(&vm, h), Some(1));
        drop(r);
        assert!(!vm.lock().is_alive(h));
    }

    #[test]
    fn steal_of_null_is_invalid_reference_but_soft_tolerates() {
        let vm = ScriptVm::new();
        assert!(matches!(
            ScriptObjectRef::stolen(&vm, None),
            Err(EngineError::InvalidReference(_))
        ));
        let soft = ScriptObjectRef::stolen_soft(&vm, None);
        assert!(!soft.exists());
        assert!(matches!(
            ScriptObjectRef::acquired(&vm, None),
            Err(EngineError::InvalidReference(_))
        ));
        assert!(!ScriptObjectRef::acquired_soft(&vm, None).exists());
    }

    #[test]
    fn acquire_adds_a_count() {
        let vm = ScriptVm::new();
        let h = vm.alloc(ScriptValue::Int(2));
        let owner = ScriptObjectRef::stolen(&vm, Some(h)).unwrap();
        let viewer = ScriptObjectRef::acquired(&vm, Some(h)).unwrap();
        assert_eq!(refcount(&vm, h), Some(2));
        drop(viewer);
        assert_eq!(refcount(&vm, h), Some(1));
        drop(owner);
        assert_eq!(vm.lock().live_count(), 0);
    }

    #[test]
    fn clone_acquires_never_steals() {
        let vm = ScriptVm::new();
        let h = vm.alloc(ScriptValue::Str("shared".into()));
        let a = ScriptObjectRef::stolen(&vm, Some(h)).unwrap();
        let b = a.clone();
        assert_eq!(refcount(&vm, h), Some(2));
        assert_eq!(a, b);
        drop(a);
        assert_eq!(refcount(&vm, h), Some(1));
        assert_eq!(b.str_value().unwrap(), "shared");
    }

    #[test]
    fn release_is_idempotent_on_empty() {
        let vm = ScriptVm::new();
        let h = vm.alloc(ScriptValue::Int(3));
        let mut r = ScriptObjectRef::stolen(&vm, Some(h)).unwrap();
        r.release();
        assert!(!r.exists());
        r.release();
        r.release();
        assert_eq!(vm.lock().live_count(), 0);
    }

    #[test]
    fn drop_releases_exactly_once() {
        let vm = ScriptVm::new();
        let h = vm.alloc(ScriptValue::Int(4));
        {
            let _r = ScriptObjectRef::stolen(&vm, Some(h)).unwrap();
        }
        assert_eq!(vm.lock().live_count(), 0);
    }

    #[test]
    fn hand_over_transfers_without_releasing() {
        let vm = ScriptVm::new();
        let h = vm.alloc(ScriptValue::Int(5));
        let mut r = ScriptObjectRef::stolen(&vm, Some(h)).unwrap();
        let raw = r.hand_over().unwrap();
        assert_eq!(raw, h);
        assert!(!r.exists());
        assert!(matches!(
            r.hand_over(),
            Err(EngineError::InvalidReference(_))
        ));
        // Still alive: we now own the count and settle it manually.
        assert_eq!(refcount(&vm, h), Some(1));
        vm.lock().decref(raw);
    }

    #[test]
    fn new_ref_hands_out_an_owned_count() {
        let vm = ScriptVm::new();
        let h = vm.alloc(ScriptValue::Int(6));
        let r = ScriptObjectRef::stolen(&vm, Some(h)).unwrap();
        let raw = r.new_ref().unwrap();
        assert_eq!(refcount(&vm, h), Some(2));
        vm.lock().decref(raw);
        assert_eq!(refcount(&vm, h), Some(1));
    }

    #[test]
    fn unreferenced_wrappers_compare_equal() {
        let vm = ScriptVm::new();
        let a = ScriptObjectRef::empty(&vm);
        let b = ScriptObjectRef::stolen_soft(&vm, None);
        assert_eq!(a, b);

        let h = vm.alloc(ScriptValue::Int(7));
        let c = ScriptObjectRef::stolen(&vm, Some(h)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn call_invokes_callables_and_rejects_the_rest() {
        let vm = ScriptVm::new();
        let double = vm.alloc(ScriptValue::Callable(Arc::new(|args| {
            match args.first() {
                Some(ScriptValue::Int(v)) => Ok(ScriptValue::Int(v * 2)),
                Some(other) => Err(EngineError::TypeMismatch {
                    expected: "int",
                    found: other.kind(),
                }),
                None => Err(EngineError::InvalidArgument("missing argument".into())),
            }
        })));
        let f = ScriptObjectRef::stolen(&vm, Some(double)).unwrap();
        assert!(f.callable_check().unwrap());
        assert_eq!(
            f.call(&[ScriptValue::Int(21)]).unwrap(),
            ScriptValue::Int(42)
        );
        assert!(matches!(
            f.call(&[ScriptValue::Str("nope".into())]),
            Err(EngineError::TypeMismatch { .. })
        ));

        let n = vm.alloc(ScriptValue::Int(0));
        let not_callable = ScriptObjectRef::stolen(&vm, Some(n)).unwrap();
        assert!(!not_callable.callable_check().unwrap());
        assert!(matches!(
            not_callable.call(&[]),
            Err(EngineError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn typed_accessors_enforce_shape() {
        let vm = ScriptVm::new();
        let h = vm.alloc(ScriptValue::Int(9));
        let r = ScriptObjectRef::stolen(&vm, Some(h)).unwrap();
        assert_eq!(r.int_value().unwrap(), 9);
        assert!(matches!(
            r.str_value(),
            Err(EngineError::TypeMismatch {
                expected: "str",
                found: "int"
            })
        ));
    }
}
