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

//! The graphics server subsystem.
//!
//! Consumes frame submissions on its own loop and advances the logic
//! loop's display-time clock one step per frame — display timers on the
//! logic thread march to the renderer's cadence, not wall time. Actual
//! GPU command encoding is an external collaborator.

use sable_core::event_loop::{EventLoop, EventLoopId};
use sable_core::time::TimeDelta;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The graphics subsystem: one event loop, frame-driven.
pub struct GraphicsServer {
    event_loop: Arc<EventLoop>,
    logic_loop: Arc<EventLoop>,
    frames: Arc<AtomicU64>,
}

impl GraphicsServer {
    /// Spawns the graphics loop. Frame steps are forwarded to
    /// `logic_loop`'s display-time clock.
    pub fn new(logic_loop: Arc<EventLoop>) -> Self {
        GraphicsServer {
            event_loop: EventLoop::spawn(EventLoopId::Graphics),
            logic_loop,
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    /// This subsystem's event loop.
    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.event_loop
    }

    /// Logs readiness on the graphics thread.
    pub fn on_app_start(&self) {
        self.event_loop
            .push_call(|| log::info!("graphics-server on-app-start"));
    }

    /// Submits one frame: processed on the graphics thread, then the
    /// logic loop's display time steps by `delta`.
    pub fn submit_frame(&self, delta: TimeDelta) {
        let frames = self.frames.clone();
        let logic = self.logic_loop.clone();
        self.event_loop.push_call(move || {
            let n = frames.fetch_add(1, Ordering::Relaxed) + 1;
            log::trace!("frame {n} submitted");
            logic.step_display_time(delta);
        });
    }

    /// Total frames processed so far.
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Stops the loop and waits for its thread.
    pub fn shutdown(&self) {
        self.event_loop.shutdown();
        self.event_loop.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn frames_step_logic_display_time() {
        let logic = EventLoop::spawn(EventLoopId::Logic);
        let server = GraphicsServer::new(logic.clone());

        let (tx, rx) = flume::bounded::<()>(1);
        logic
            .push_display_timer_call(TimeDelta::from_millis(20), move || {
                let _ = tx.send(());
            })
            .unwrap();

        // Two 16ms frames cross the 20ms display deadline.
        server.submit_frame(TimeDelta::from_millis(16));
        server.submit_frame(TimeDelta::from_millis(16));

        rx.recv_timeout(Duration::from_secs(2))
            .expect("display timer never fired");
        assert_eq!(server.frame_count(), 2);

        server.shutdown();
        logic.shutdown();
        logic.join();
    }
}
