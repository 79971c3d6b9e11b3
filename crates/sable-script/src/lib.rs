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

//! # Sable Script
//!
//! The bridge between native engine code and the embedded scripting
//! runtime. The runtime is single-threaded and refcount-collected; native
//! subsystems live on many threads. Everything in this crate exists to keep
//! those two ownership models from silently aliasing:
//!
//! - [`vm`]: the runtime's object heap behind its single global lock.
//! - [`obj_ref`]: [`ScriptObjectRef`], the managed handle with explicit
//!   steal/acquire semantics at every call site.
//! - [`object_set`]: the fixed-ID table of runtime references a feature
//!   module resolves once at import and reads forever after.
//! - [`module`]: the module-import bootstrap hook.

#![warn(missing_docs)]

pub mod module;
pub mod obj_ref;
pub mod object_set;
pub mod vm;

pub use module::ScriptModule;
pub use obj_ref::ScriptObjectRef;
pub use object_set::{ScriptObjectSet, SlotId};
pub use vm::{ScriptHandle, ScriptValue, ScriptVm};
