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

//! The asset server subsystem.
//!
//! Load requests run on the asset loop; completion callbacks hop back to
//! the logic loop carrying the ambient context captured at *request*
//! time, so a load kicked off by UI code lands back in that UI's session
//! no matter what the logic thread is doing when the bytes arrive. File
//! format decoding is an external collaborator.

use sable_core::context::ContextCall;
use sable_core::event_loop::{EventLoop, EventLoopId};
use std::sync::Arc;

/// The asset-loading subsystem: one event loop, completions delivered to
/// the logic loop.
pub struct AssetServer {
    event_loop: Arc<EventLoop>,
    logic_loop: Arc<EventLoop>,
}

impl AssetServer {
    /// Spawns the asset loop. Completions are delivered to `logic_loop`.
    pub fn new(logic_loop: Arc<EventLoop>) -> Self {
        AssetServer {
            event_loop: EventLoop::spawn(EventLoopId::Assets),
            logic_loop,
        }
    }

    /// This subsystem's event loop.
    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.event_loop
    }

    /// Logs readiness on the asset thread.
    pub fn on_app_start(&self) {
        self.event_loop
            .push_call(|| log::info!("asset-server on-app-start"));
    }

    /// Requests a load. `on_loaded` later runs on the logic loop under the
    /// ambient context current *now*, on the requesting thread.
    pub fn load(&self, path: impl Into<String>, on_loaded: impl FnOnce() + Send + 'static) {
        let path = path.into();
        // Capture on the requesting thread; the asset thread's ambient
        // context is meaningless to the requester.
        let completion = ContextCall::new(on_loaded);

        let logic = self.logic_loop.clone();
        self.event_loop.push_call(move || {
            log::debug!("asset '{path}' loaded");
            logic.push_context_call(completion);
        });
    }

    /// Stops the loop and waits for its thread.
    pub fn shutdown(&self) {
        self.event_loop.shutdown();
        self.event_loop.join();
    }
}
