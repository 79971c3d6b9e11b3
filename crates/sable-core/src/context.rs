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

//! Ambient execution context capture and restore.
//!
//! Deferred callbacks frequently care *which* session or scene was logically
//! active when they were scheduled, not whichever one happens to be active
//! on the target thread when they finally run. [`ContextRef`] is the token
//! naming that ambient context; [`ScopedContext`] installs one for the
//! duration of a scope with stack discipline; [`ContextCall`] bundles a
//! callable with the context captured at schedule time.
//!
//! The `Foreground` value is deliberately late-bound: it resolves to
//! whatever the registered foreground resolver reports at *install* time,
//! so UI-triggered callbacks always land in whatever is currently visible.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, Weak};

/// Capability for objects that can serve as an ambient context target
/// (a game session, a scene, an editor document...).
pub trait ContextTarget: Send + Sync + 'static {
    /// Short human-readable label used in logs and diagnostics.
    fn label(&self) -> &str;
}

#[derive(Clone)]
enum State {
    Empty,
    Foreground,
    Target(Weak<dyn ContextTarget>),
}

/// A token identifying the ambient "active session/scene".
///
/// Holds its target weakly: a context never keeps a session alive, and a
/// context whose session has been torn down resolves to nothing.
#[derive(Clone)]
pub struct ContextRef {
    state: State,
}

thread_local! {
    static CURRENT: RefCell<ContextRef> = RefCell::new(ContextRef::empty());
}

type ForegroundResolver = Arc<dyn Fn() -> ContextRef + Send + Sync>;

static FOREGROUND_RESOLVER: RwLock<Option<ForegroundResolver>> = RwLock::new(None);

/// Registers the process-wide foreground resolver.
///
/// Wired once by the composition root (normally the app-mode owner) at
/// startup; re-registering mid-run is reserved for test harnesses, which
/// should pair it with [`reset_foreground_resolver`].
pub fn set_foreground_resolver(resolver: ForegroundResolver) {
    *FOREGROUND_RESOLVER
        .write()
        .expect("foreground resolver lock poisoned") = Some(resolver);
}

/// Clears the foreground resolver. Test-harness hook.
pub fn reset_foreground_resolver() {
    *FOREGROUND_RESOLVER
        .write()
        .expect("foreground resolver lock poisoned") = None;
}

impl ContextRef {
    /// The explicit "no context" value.
    pub fn empty() -> Self {
        ContextRef { state: State::Empty }
    }

    /// The late-bound "whatever is foreground at install time" value.
    pub fn foreground() -> Self {
        ContextRef {
            state: State::Foreground,
        }
    }

    /// A context bound to a concrete target.
    pub fn of<T: ContextTarget>(target: &Arc<T>) -> Self {
        let dynamic: Arc<dyn ContextTarget> = target.clone();
        ContextRef {
            state: State::Target(Arc::downgrade(&dynamic)),
        }
    }

    /// Captures the calling thread's current ambient context.
    pub fn current() -> Self {
        CURRENT.with(|c| c.borrow().clone())
    }

    /// Whether this is the explicit empty value.
    pub fn is_empty(&self) -> bool {
        matches!(self.state, State::Empty)
    }

    /// Whether this is the late-bound foreground value.
    pub fn is_foreground(&self) -> bool {
        matches!(self.state, State::Foreground)
    }

    /// The bound target, if this context has one and it is still alive.
    pub fn target(&self) -> Option<Arc<dyn ContextTarget>> {
        match &self.state {
            State::Target(weak) => weak.upgrade(),
            _ => None,
        }
    }

    /// Resolves `Foreground` through the registered resolver; other values
    /// pass through unchanged. Called at install time, never capture time.
    fn resolved(&self) -> ContextRef {
        if !self.is_foreground() {
            return self.clone();
        }
        let resolver = FOREGROUND_RESOLVER
            .read()
            .expect("foreground resolver lock poisoned")
            .clone();
        match resolver {
            Some(resolve) => resolve(),
            None => ContextRef::empty(),
        }
    }
}

impl Default for ContextRef {
    fn default() -> Self {
        ContextRef::empty()
    }
}

impl PartialEq for ContextRef {
    fn eq(&self, other: &Self) -> bool {
        match (&self.state, &other.state) {
            (State::Empty, State::Empty) => true,
            (State::Foreground, State::Foreground) => true,
            (State::Target(a), State::Target(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            State::Empty => write!(f, "ContextRef(<empty>)"),
            State::Foreground => write!(f, "ContextRef(<foreground>)"),
            State::Target(weak) => match weak.upgrade() {
                Some(target) => write!(f, "ContextRef({})", target.label()),
                None => write!(f, "ContextRef(<gone>)"),
            },
        }
    }
}

/// RAII guard installing an ambient context for the current scope.
///
/// On construction the thread's current ambient context is saved and the
/// given one installed (resolving `Foreground` at that moment). On drop —
/// every exit path, including unwinding — the saved value is restored.
/// Nesting behaves as a stack.
pub struct ScopedContext {
    prev: Option<ContextRef>,
    // Thread-ambient state; the guard must not migrate across threads.
    _not_send: PhantomData<*const ()>,
}

impl ScopedContext {
    /// Saves the current ambient context and installs `context`.
    pub fn new(context: &ContextRef) -> Self {
        let installed = context.resolved();
        let prev = CURRENT.with(|c| c.replace(installed));
        ScopedContext {
            prev: Some(prev),
            _not_send: PhantomData,
        }
    }
}

impl Drop for ScopedContext {
    fn drop(&mut self) {
        if let Some(prev) = self.prev.take() {
            CURRENT.with(|c| *c.borrow_mut() = prev);
        }
    }
}

/// A deferred callable bundled with the context captured at schedule time.
///
/// When run — typically on another thread's event loop — the captured
/// context is installed around the body, so the callable observes the
/// scheduler's ambient context and never the target thread's.
pub struct ContextCall {
    context: ContextRef,
    call: Box<dyn FnOnce() + Send + 'static>,
}

impl ContextCall {
    /// Captures the calling thread's current ambient context.
    pub fn new(call: impl FnOnce() + Send + 'static) -> Self {
        ContextCall {
            context: ContextRef::current(),
            call: Box::new(call),
        }
    }

    /// Uses an explicitly chosen context instead of capturing.
    pub fn with_context(context: ContextRef, call: impl FnOnce() + Send + 'static) -> Self {
        ContextCall {
            context,
            call: Box::new(call),
        }
    }

    /// The context this call will run under.
    pub fn context(&self) -> &ContextRef {
        &self.context
    }

    /// Runs the body under the captured context.
    pub fn run(self) {
        let _scope = ScopedContext::new(&self.context);
        (self.call)();
    }
}

impl fmt::Debug for ContextCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextCall")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
