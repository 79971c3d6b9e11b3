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

//! The audio server subsystem.
//!
//! Owns every live [`SoundSource`] exclusively on its loop thread; other
//! threads (the scripting thread above all) hold only weak handles and
//! submit mutations as deferred calls. Destroying a source on the audio
//! thread cleanly invalidates every weak handle, wherever it is held.

use sable_core::event_loop::{EventLoop, EventLoopId};
use sable_core::object::{ObjectRef, WeakRef};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A playable sound with scripting-visible identity.
#[derive(Debug)]
pub struct SoundSource {
    id: u64,
    name: String,
}

impl SoundSource {
    /// The source's stable ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The asset name this source plays.
    pub fn name(&self) -> &str {
        &self.name
    }
}

// Mixing DSP is an external collaborator; this subsystem only models
// source lifetime and the thread-ownership contract around it.
struct AudioState {
    sources: HashMap<u64, ObjectRef<SoundSource>>,
}

/// The audio subsystem: one event loop, exclusive ownership of sources.
pub struct AudioServer {
    event_loop: Arc<EventLoop>,
    state: Arc<Mutex<AudioState>>,
    next_id: AtomicU64,
}

impl AudioServer {
    /// Spawns the audio loop.
    pub fn new() -> Self {
        AudioServer {
            event_loop: EventLoop::spawn(EventLoopId::Audio),
            state: Arc::new(Mutex::new(AudioState {
                sources: HashMap::new(),
            })),
            next_id: AtomicU64::new(1),
        }
    }

    /// This subsystem's event loop.
    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.event_loop
    }

    /// Logs readiness on the audio thread. Part of the startup order the
    /// logic thread drives.
    pub fn on_app_start(&self) {
        self.event_loop
            .push_call(|| log::info!("audio-server on-app-start"));
    }

    /// Creates a source owned by the audio thread and returns a weak
    /// handle immediately usable from any thread.
    pub fn add_source(&self, name: impl Into<String>) -> WeakRef<SoundSource> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let source = ObjectRef::new(SoundSource {
            id,
            name: name.into(),
        });
        let weak = source.downgrade();

        let state = self.state.clone();
        self.event_loop.push_call(move || {
            log::debug!(
                "audio source {} ('{}') registered",
                id,
                source.get().map(|s| s.name()).unwrap_or_default()
            );
            state
                .lock()
                .expect("audio state lock poisoned")
                .sources
                .insert(id, source);
        });
        weak
    }

    /// Destroys a source. The drop happens on the audio thread; weak
    /// handles elsewhere observe "gone" from that point on.
    pub fn destroy_source(&self, id: u64) {
        let state = self.state.clone();
        self.event_loop.push_call(move || {
            if state
                .lock()
                .expect("audio state lock poisoned")
                .sources
                .remove(&id)
                .is_none()
            {
                log::warn!("destroy of unknown audio source {id}");
            }
        });
    }

    /// Stops the loop and waits for its thread.
    pub fn shutdown(&self) {
        self.event_loop.shutdown();
        self.event_loop.join();
    }
}

impl Default for AudioServer {
    fn default() -> Self {
        Self::new()
    }
}
