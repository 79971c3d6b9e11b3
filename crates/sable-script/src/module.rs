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

//! Module-import bootstrap for a native feature set.
//!
//! When a feature module is imported into the runtime, its native side
//! gets exactly one shot to set itself up: define its natively-backed
//! objects in the module namespace, resolve the well-known names its
//! object table caches, and finally signal "fully loaded" so
//! reciprocal-import cycles can sanity-check themselves.

use crate::obj_ref::ScriptObjectRef;
use crate::vm::{ScriptValue, ScriptVm};
use sable_core::error::EngineError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A feature module's namespace in the runtime, as seen from native code.
///
/// Owns one reference to every object defined in it; [`resolve`] hands out
/// acquired references so callers' wrappers and the namespace's never
/// alias a single count.
///
/// [`resolve`]: ScriptModule::resolve
pub struct ScriptModule {
    name: &'static str,
    vm: Arc<ScriptVm>,
    globals: Mutex<HashMap<String, ScriptObjectRef>>,
    loaded: AtomicBool,
}

impl ScriptModule {
    /// Creates an empty module namespace.
    pub fn new(name: &'static str, vm: &Arc<ScriptVm>) -> Self {
        log::debug!("script module '{name}' exec begin");
        ScriptModule {
            name,
            vm: vm.clone(),
            globals: Mutex::new(HashMap::new()),
            loaded: AtomicBool::new(false),
        }
    }

    /// The module's import name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The VM this module lives in.
    pub fn vm(&self) -> &Arc<ScriptVm> {
        &self.vm
    }

    /// Defines `name` in the module namespace, allocating a fresh runtime
    /// object for `value`. Redefinition is a duplicate-slot error: module
    /// namespaces are written once, at import.
    pub fn define(&self, name: &'static str, value: ScriptValue) -> Result<(), EngineError> {
        let mut globals = self.globals.lock().expect("module globals lock poisoned");
        if globals.contains_key(name) {
            return Err(EngineError::DuplicateSlot(name));
        }
        let handle = self.vm.alloc(value);
        let obj = ScriptObjectRef::stolen(&self.vm, Some(handle))?;
        globals.insert(name.to_string(), obj);
        Ok(())
    }

    /// Resolves a well-known name to an acquired reference.
    pub fn resolve(&self, name: &str) -> Result<ScriptObjectRef, EngineError> {
        let globals = self.globals.lock().expect("module globals lock poisoned");
        match globals.get(name) {
            Some(obj) => Ok(obj.clone()),
            None => Err(EngineError::NotFound(format!(
                "name '{name}' in module '{}'",
                self.name
            ))),
        }
    }

    /// Whether `name` is defined, without erroring.
    pub fn has(&self, name: &str) -> bool {
        self.globals
            .lock()
            .expect("module globals lock poisoned")
            .contains_key(name)
    }

    /// Marks the module fully loaded. Called once, at the end of the
    /// import hook.
    pub fn mark_loaded(&self) {
        let was = self.loaded.swap(true, Ordering::AcqRel);
        debug_assert!(!was, "script module '{}' marked loaded twice", self.name);
        log::info!("script module '{}' loaded", self.name);
    }

    /// Whether import completed. Reciprocal importers check this to catch
    /// partially-initialized import cycles early.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_resolve_roundtrip() {
        let vm = ScriptVm::new();
        let module = ScriptModule::new("_sableui", &vm);

        module.define("quit_call", ScriptValue::Int(1)).unwrap();
        assert!(module.has("quit_call"));
        assert!(!module.has("missing"));

        let obj = module.resolve("quit_call").unwrap();
        assert_eq!(obj.int_value().unwrap(), 1);
        // Namespace keeps its own count alongside the resolved one.
        assert_eq!(vm.lock().refcount(obj.get().unwrap()), Some(2));
    }

    #[test]
    fn resolve_of_unknown_name_is_not_found() {
        let vm = ScriptVm::new();
        let module = ScriptModule::new("_sableui", &vm);
        assert!(matches!(
            module.resolve("nope"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn redefinition_is_rejected() {
        let vm = ScriptVm::new();
        let module = ScriptModule::new("_sableui", &vm);
        module.define("hook", ScriptValue::Int(1)).unwrap();
        assert!(matches!(
            module.define("hook", ScriptValue::Int(2)),
            Err(EngineError::DuplicateSlot("hook"))
        ));
    }

    #[test]
    fn loaded_flag_flips_once() {
        let vm = ScriptVm::new();
        let module = ScriptModule::new("_sablebase", &vm);
        assert!(!module.is_loaded());
        module.mark_loaded();
        assert!(module.is_loaded());
    }
}
