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

//! The closed error taxonomy shared by all engine crates.
//!
//! Errors crossing the native/script boundary are caught at the call site
//! and converted into one of these variants; raw script-side failures never
//! propagate across native frames. Thread-affinity violations are *not*
//! represented here: constructing or driving a thread-affine object from
//! the wrong thread is a structural bug and panics instead.

use thiserror::Error;

/// The error type for engine substrate operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A null/unreferenced handle was dereferenced or acquired where a live
    /// object is required.
    #[error("invalid reference: {0}")]
    InvalidReference(&'static str),

    /// A caller-supplied value is outside the operation's domain
    /// (e.g. a negative timer delay).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A script value of the wrong shape was passed across the boundary.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The shape the native side required.
        expected: &'static str,
        /// The shape actually observed.
        found: &'static str,
    },

    /// An object-identity lookup (widget, node, session, slot...) failed.
    #[error("not found: {0}")]
    NotFound(String),

    /// An operation was attempted outside an allowed ambient context.
    #[error("context error: {0}")]
    ContextError(String),

    /// An object-table slot was stored twice. Slots are populated exactly
    /// once at module bootstrap.
    #[error("object table slot '{0}' is already populated")]
    DuplicateSlot(&'static str),

    /// A call was pushed to an event loop whose thread has already shut
    /// down, through an API that reports instead of dropping.
    #[error("event loop '{0}' has shut down")]
    LoopShutDown(&'static str),
}
