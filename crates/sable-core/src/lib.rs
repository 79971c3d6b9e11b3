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

//! # Sable Core
//!
//! Foundational crate for the Sable engine: the cross-thread object
//! lifecycle and thread-affinity substrate everything else is built atop.
//!
//! The pieces, leaves first:
//!
//! - [`object`]: strong ([`ObjectRef`]) and weak ([`WeakRef`]) handles to
//!   engine objects whose destruction may happen on any thread.
//! - [`event_loop`]: one FIFO queue of deferred callables per subsystem
//!   thread, plus one-shot app-time / display-time timers.
//! - [`context`]: the ambient "which session is active" token
//!   ([`ContextRef`]) with stack-disciplined capture/restore around
//!   deferred call execution.
//! - [`time`]: the microsecond clock newtypes the timers are measured in.

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod event_loop;
pub mod object;
pub mod time;

pub use context::{ContextCall, ContextRef, ContextTarget, ScopedContext};
pub use error::EngineError;
pub use event_loop::{EventLoop, EventLoopId};
pub use object::{ObjectRef, WeakRef};
pub use time::{AppTime, DisplayTime, TimeDelta};
