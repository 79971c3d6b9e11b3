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

//! The fixed-ID table of cached script object references.
//!
//! Each feature module resolves its well-known script objects once during
//! module-import bootstrap and reads them by enum ID forever after — no
//! per-call-site name lookups. The key set is a closed enum; slots are
//! populated exactly once (a second store is a [`DuplicateSlot`] error,
//! uniformly — silent overwrite hides double-import bugs).
//!
//! [`DuplicateSlot`]: EngineError::DuplicateSlot

use crate::obj_ref::ScriptObjectRef;
use crate::vm::ScriptValue;
use sable_core::context::ContextCall;
use sable_core::error::EngineError;
use sable_core::event_loop::EventLoop;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A closed enumeration usable as an object-table key.
///
/// Implementations are plain enums with a fixed variant count; `COUNT`
/// doubles as the out-of-range sentinel when decoding untyped boundary
/// input.
pub trait SlotId: Copy + Eq + fmt::Debug + 'static {
    /// Number of slots; one past the last valid index.
    const COUNT: usize;

    /// This ID's table index, in `0..COUNT`.
    fn index(self) -> usize;

    /// Bounds-checked decode of an untyped index.
    fn from_index(index: usize) -> Option<Self>;

    /// Stable name for logs and error messages.
    fn name(self) -> &'static str;
}

/// Decodes an externally supplied integer into a slot ID, rejecting
/// anything outside the closed range. Never trust a boundary integer.
pub fn decode_slot<I: SlotId>(raw: usize) -> Result<I, EngineError> {
    I::from_index(raw).ok_or_else(|| {
        EngineError::InvalidArgument(format!(
            "slot index {raw} out of range (0..{})",
            I::COUNT
        ))
    })
}

/// A fixed table of script object references keyed by a closed enum.
///
/// Populated during module-import bootstrap; immutable in its key set
/// thereafter.
pub struct ScriptObjectSet<I: SlotId> {
    slots: Vec<Option<ScriptObjectRef>>,
    _ids: PhantomData<I>,
}

impl<I: SlotId> ScriptObjectSet<I> {
    /// Creates a table with every slot unpopulated.
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(I::COUNT);
        slots.resize_with(I::COUNT, || None);
        ScriptObjectSet {
            slots,
            _ids: PhantomData,
        }
    }

    /// Populates `id` by consuming `obj` (steal semantics: the table takes
    /// over the wrapper's count). Fails with
    /// [`EngineError::DuplicateSlot`] if the slot is already populated.
    pub fn store(&mut self, id: I, obj: ScriptObjectRef) -> Result<(), EngineError> {
        let slot = &mut self.slots[id.index()];
        if slot.is_some() {
            return Err(EngineError::DuplicateSlot(id.name()));
        }
        *slot = Some(obj);
        Ok(())
    }

    /// A borrowed, non-owning view of the slot, or `None` if unpopulated.
    pub fn get(&self, id: I) -> Option<&ScriptObjectRef> {
        self.slots[id.index()].as_ref()
    }

    /// A borrowed view of the slot, or a not-found error naming it.
    pub fn try_get(&self, id: I) -> Result<&ScriptObjectRef, EngineError> {
        self.get(id)
            .ok_or_else(|| EngineError::NotFound(format!("object table slot '{}'", id.name())))
    }

    /// Whether the slot has been populated.
    pub fn exists(&self, id: I) -> bool {
        self.slots[id.index()].is_some()
    }

    /// Fires the script hook in slot `id` as a deferred call on `target`.
    ///
    /// Sugar for: fetch the slot, acquire a count, capture the current
    /// ambient context, and submit fire-and-forget. The hook runs under
    /// the captured context; failures are caught and logged inside the
    /// dispatched call, never propagated into the loop.
    pub fn push_call(
        &self,
        id: I,
        args: Vec<ScriptValue>,
        target: &Arc<EventLoop>,
    ) -> Result<(), EngineError> {
        let obj = self.try_get(id)?.clone();
        let name = id.name();
        target.push_context_call(ContextCall::new(move || {
            if let Err(e) = obj.call(&args) {
                log::error!("object table hook '{name}' failed: {e}");
            }
        }));
        Ok(())
    }
}

impl<I: SlotId> Default for ScriptObjectSet<I> {
    fn default() -> Self {
        Self::new()
    }
}
