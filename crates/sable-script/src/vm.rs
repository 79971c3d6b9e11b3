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

//! The embedded scripting runtime's object model.
//!
//! A deliberately small substrate: a refcount-collected heap of values
//! behind a single global lock, which is all the lifecycle core needs from
//! a runtime (the full language is someone else's problem). Only one
//! thread may touch runtime state at a time; every access goes through
//! [`ScriptVm::lock`], and the cardinal rule is to never block on another
//! subsystem's queue while holding that guard.
//!
//! Handles are generational, so a stale handle held after its object was
//! collected can never resolve to a different object.

use sable_core::error::EngineError;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// A native function exposed to the runtime as a callable object.
///
/// Must not capture owning [`ScriptObjectRef`](crate::ScriptObjectRef)s:
/// the closure is destroyed under the heap lock, and a release from inside
/// that destruction would self-deadlock. Capture raw handles or weak
/// native refs instead.
pub type NativeFn =
    Arc<dyn Fn(&[ScriptValue]) -> Result<ScriptValue, EngineError> + Send + Sync>;

/// The primitive value shapes that cross the native/script boundary.
#[derive(Clone)]
pub enum ScriptValue {
    /// The runtime's null/none value.
    None,
    /// A boolean.
    Bool(bool),
    /// A 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A string.
    Str(String),
    /// A callable implemented natively and registered at module import.
    Callable(NativeFn),
}

impl ScriptValue {
    /// The value's shape name, used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ScriptValue::None => "none",
            ScriptValue::Bool(_) => "bool",
            ScriptValue::Int(_) => "int",
            ScriptValue::Float(_) => "float",
            ScriptValue::Str(_) => "str",
            ScriptValue::Callable(_) => "callable",
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::None => write!(f, "None"),
            ScriptValue::Bool(v) => write!(f, "Bool({v})"),
            ScriptValue::Int(v) => write!(f, "Int({v})"),
            ScriptValue::Float(v) => write!(f, "Float({v})"),
            ScriptValue::Str(v) => write!(f, "Str({v:?})"),
            ScriptValue::Callable(_) => write!(f, "Callable(<native>)"),
        }
    }
}

/// Value comparison for primitives; callables compare by identity.
impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::None, ScriptValue::None) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Int(a), ScriptValue::Int(b)) => a == b,
            (ScriptValue::Float(a), ScriptValue::Float(b)) => a == b,
            (ScriptValue::Str(a), ScriptValue::Str(b)) => a == b,
            (ScriptValue::Callable(a), ScriptValue::Callable(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        ScriptValue::Bool(v)
    }
}

impl From<i64> for ScriptValue {
    fn from(v: i64) -> Self {
        ScriptValue::Int(v)
    }
}

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        ScriptValue::Float(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        ScriptValue::Str(v.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(v: String) -> Self {
        ScriptValue::Str(v)
    }
}

/// A raw, unmanaged handle into the runtime heap.
///
/// Identity comparison only; generational, so handles to collected objects
/// go permanently stale instead of aliasing a reused slot. Owning one
/// confers no lifetime guarantee — that is [`ScriptObjectRef`]'s job.
///
/// [`ScriptObjectRef`]: crate::ScriptObjectRef
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptHandle {
    index: u32,
    generation: u32,
}

struct HeapSlot {
    generation: u32,
    entry: Option<HeapEntry>,
}

struct HeapEntry {
    value: ScriptValue,
    refcount: u32,
}

/// The runtime's refcount-collected object heap.
///
/// Never shared directly; lives behind [`ScriptVm`]'s global lock.
pub struct ScriptHeap {
    slots: Vec<HeapSlot>,
    free: Vec<u32>,
    live: usize,
}

impl ScriptHeap {
    fn new() -> Self {
        ScriptHeap {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Allocates a new object with refcount 1; the caller owns that count.
    pub fn alloc(&mut self, value: ScriptValue) -> ScriptHandle {
        self.live += 1;
        let entry = HeapEntry { value, refcount: 1 };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                ScriptHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(HeapSlot {
                    generation: 0,
                    entry: Some(entry),
                });
                ScriptHandle {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn entry_mut(&mut self, handle: ScriptHandle) -> Option<&mut HeapEntry> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    fn entry(&self, handle: ScriptHandle) -> Option<&HeapEntry> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Takes an additional reference count on a live object.
    ///
    /// A stale handle here is a refcounting bug on the caller's side:
    /// debug-asserted, ignored in release.
    pub fn incref(&mut self, handle: ScriptHandle) {
        match self.entry_mut(handle) {
            Some(entry) => {
                entry.refcount += 1;
                debug_assert!(entry.refcount != 0, "script refcount overflow");
            }
            None => {
                debug_assert!(false, "incref of dead script object {handle:?}");
                log::error!("incref of dead script object {handle:?}");
            }
        }
    }

    /// Releases one reference count, destroying the object at zero.
    pub fn decref(&mut self, handle: ScriptHandle) {
        let Some(entry) = self.entry_mut(handle) else {
            debug_assert!(false, "decref of dead script object {handle:?}");
            log::error!("decref of dead script object {handle:?}");
            return;
        };
        debug_assert!(entry.refcount > 0, "script refcount underflow");
        entry.refcount -= 1;
        if entry.refcount == 0 {
            let slot = &mut self.slots[handle.index as usize];
            slot.entry = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(handle.index);
            self.live -= 1;
        }
    }

    /// Whether the handle still names a live object.
    pub fn is_alive(&self, handle: ScriptHandle) -> bool {
        self.entry(handle).is_some()
    }

    /// The object's value, or `None` for a stale handle.
    pub fn value(&self, handle: ScriptHandle) -> Option<&ScriptValue> {
        self.entry(handle).map(|e| &e.value)
    }

    /// The object's current reference count. Diagnostic/test aid.
    pub fn refcount(&self, handle: ScriptHandle) -> Option<u32> {
        self.entry(handle).map(|e| e.refcount)
    }

    /// Number of live objects. Diagnostic/test aid.
    pub fn live_count(&self) -> usize {
        self.live
    }
}

/// The embedded runtime: the object heap behind its single global lock.
///
/// Shared as `Arc<ScriptVm>` across every subsystem that touches the
/// boundary. Only one thread executes runtime operations at a time;
/// acquire the guard, do the work, release immediately. Holding the guard
/// while waiting on another event loop's queue is prohibited — all
/// cross-thread calls stay fire-and-forget precisely so this lock and the
/// per-loop queue locks can never deadlock against each other.
pub struct ScriptVm {
    heap: Mutex<ScriptHeap>,
}

impl ScriptVm {
    /// Creates a fresh runtime instance.
    pub fn new() -> Arc<Self> {
        log::info!("script vm initialized");
        Arc::new(ScriptVm {
            heap: Mutex::new(ScriptHeap::new()),
        })
    }

    /// Acquires the runtime's global lock.
    pub fn lock(&self) -> MutexGuard<'_, ScriptHeap> {
        self.heap.lock().expect("script vm lock poisoned")
    }

    /// Allocates an object, handing the caller its initial count.
    pub fn alloc(&self, value: ScriptValue) -> ScriptHandle {
        self.lock().alloc(value)
    }
}
