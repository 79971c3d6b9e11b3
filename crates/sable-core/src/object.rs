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

//! Strong and weak handles to engine objects.
//!
//! Engine objects with scripting-visible identity (widgets, scene nodes,
//! sounds, timers) are owned by exactly one subsystem thread, but handles
//! to them travel everywhere — most importantly onto the scripting thread,
//! which must be able to ask "does this still exist?" at any moment while
//! the owning thread is free to destroy the object.
//!
//! [`ObjectRef`] is a *nullable* strong handle: while it points at an
//! object the object cannot die, and `release()` is an explicit, idempotent
//! way to drop that claim. [`WeakRef`] observes without extending lifetime:
//! once the last strong handle is gone, every weak handle resolves to
//! "gone" — atomically with respect to concurrent resolution from other
//! threads, with no dangling intermediate state.

use crate::error::EngineError;
use std::sync::{Arc, Weak};

/// A nullable, reference-counted strong handle to an engine object.
///
/// Cloning acquires a new count on the same object; assigning away or
/// calling [`release`](ObjectRef::release) drops it. The underlying object
/// is destroyed exactly when the last strong handle releases, on whichever
/// thread that happens.
#[derive(Debug)]
pub struct ObjectRef<T>(Option<Arc<T>>);

impl<T> ObjectRef<T> {
    /// Creates a handle owning a freshly allocated object.
    pub fn new(value: T) -> Self {
        ObjectRef(Some(Arc::new(value)))
    }

    /// Creates an empty (unreferenced) handle.
    pub fn empty() -> Self {
        ObjectRef(None)
    }

    /// Whether this handle currently points at an object.
    pub fn exists(&self) -> bool {
        self.0.is_some()
    }

    /// The referenced object, or `None` if unreferenced.
    pub fn get(&self) -> Option<&T> {
        self.0.as_deref()
    }

    /// The referenced object, or [`EngineError::InvalidReference`] if
    /// unreferenced.
    pub fn try_get(&self) -> Result<&T, EngineError> {
        self.0
            .as_deref()
            .ok_or(EngineError::InvalidReference("dereferencing empty ObjectRef"))
    }

    /// Drops this handle's claim on the object, leaving it empty.
    ///
    /// Safe to call on an already-empty handle; that is a no-op.
    pub fn release(&mut self) {
        self.0 = None;
    }

    /// Creates a weak handle observing the same object.
    ///
    /// A weak handle made from an empty `ObjectRef` resolves to "gone"
    /// immediately.
    pub fn downgrade(&self) -> WeakRef<T> {
        match &self.0 {
            Some(arc) => WeakRef(Arc::downgrade(arc)),
            None => WeakRef(Weak::new()),
        }
    }

    /// Number of strong handles to the object, 0 when empty. Test aid.
    pub fn strong_count(&self) -> usize {
        self.0.as_ref().map_or(0, Arc::strong_count)
    }
}

impl<T> Clone for ObjectRef<T> {
    fn clone(&self) -> Self {
        ObjectRef(self.0.clone())
    }
}

impl<T> Default for ObjectRef<T> {
    fn default() -> Self {
        ObjectRef::empty()
    }
}

/// Identity comparison; two empty handles compare equal.
impl<T> PartialEq for ObjectRef<T> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> Eq for ObjectRef<T> {}

/// A handle that observes an engine object without keeping it alive.
///
/// `get()` either resolves to a live strong handle or to `None` ("gone");
/// there is no third state. Safe to create, clone, query, and drop from any
/// thread regardless of which thread owns or destroys the target.
#[derive(Debug)]
pub struct WeakRef<T>(Weak<T>);

impl<T> WeakRef<T> {
    /// Creates a weak handle that never resolves (already "gone").
    pub fn new() -> Self {
        WeakRef(Weak::new())
    }

    /// Resolves to a strong handle if the object is still alive.
    pub fn get(&self) -> Option<ObjectRef<T>> {
        self.0.upgrade().map(|arc| ObjectRef(Some(arc)))
    }

    /// Resolves to a strong handle, or reports the object as gone.
    pub fn upgrade_or_err(&self) -> Result<ObjectRef<T>, EngineError> {
        self.get()
            .ok_or_else(|| EngineError::NotFound("weakly referenced object is gone".into()))
    }

    /// Whether the target has been destroyed.
    pub fn gone(&self) -> bool {
        self.0.strong_count() == 0
    }
}

impl<T> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        WeakRef(self.0.clone())
    }
}

impl<T> Default for WeakRef<T> {
    fn default() -> Self {
        WeakRef::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct Probe {
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn probe() -> (ObjectRef<Probe>, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        (
            ObjectRef::new(Probe {
                drops: drops.clone(),
            }),
            drops,
        )
    }

    #[test]
    fn object_lives_while_any_strong_handle_exists() {
        let (a, drops) = probe();
        let b = a.clone();
        let mut c = b.clone();
        assert_eq!(a.strong_count(), 3);

        c.release();
        drop(b);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(a);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_is_idempotent() {
        let (mut a, drops) = probe();
        a.release();
        a.release();
        assert!(!a.exists());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn try_get_on_empty_is_invalid_reference() {
        let r = ObjectRef::<i32>::empty();
        assert!(matches!(
            r.try_get(),
            Err(EngineError::InvalidReference(_))
        ));
    }

    #[test]
    fn equality_is_identity() {
        let a = ObjectRef::new(7);
        let b = a.clone();
        let c = ObjectRef::new(7);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ObjectRef::<i32>::empty(), ObjectRef::<i32>::empty());
    }

    #[test]
    fn weak_resolves_then_goes_gone() {
        let (a, _drops) = probe();
        let w = a.downgrade();
        assert!(w.get().is_some());
        assert!(!w.gone());

        drop(a);
        assert!(w.gone());
        assert!(w.get().is_none());
        assert!(matches!(
            w.upgrade_or_err(),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn weak_from_empty_is_gone() {
        let w = ObjectRef::<i32>::empty().downgrade();
        assert!(w.gone());
    }

    #[test]
    fn cross_thread_destroy_versus_get() {
        // Owner thread destroys while another thread hammers get(); every
        // resolution must be either a live handle or cleanly gone.
        for _ in 0..32 {
            let (owner, _drops) = probe();
            let w = owner.downgrade();

            let reader = thread::spawn(move || {
                let mut saw_gone = false;
                for _ in 0..10_000 {
                    match w.get() {
                        Some(strong) => {
                            assert!(strong.exists());
                        }
                        None => {
                            saw_gone = true;
                            break;
                        }
                    }
                }
                saw_gone
            });

            drop(owner);
            // Whether the reader observed the destruction depends on timing;
            // the property under test is that it never crashes or dangles.
            let _ = reader.join().unwrap();
        }
    }
}
