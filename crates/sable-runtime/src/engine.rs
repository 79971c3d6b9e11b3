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

//! The engine composition root.
//!
//! Wires subsystems leaf-first: the VM and logic loop exist before any
//! subsystem that delivers calls into them, and the script module import
//! happens last of all, on the logic thread, once every subsystem it may
//! reach is already standing. Teardown is the exact reverse.

use crate::assets::AssetServer;
use crate::audio::AudioServer;
use crate::config::EngineConfig;
use crate::graphics::GraphicsServer;
use crate::logic::{Logic, LogicHook};
use crate::network::{NetworkReader, NetworkWriter, PacketHandler};
use sable_core::event_loop::{EventLoop, EventLoopId};
use sable_script::ScriptVm;
use std::sync::Arc;

/// The assembled engine. One instance per process.
pub struct Engine {
    config: EngineConfig,
    vm: Arc<ScriptVm>,
    main_loop: Arc<EventLoop>,
    logic: Arc<Logic>,
    graphics: Option<GraphicsServer>,
    audio: AudioServer,
    assets: AssetServer,
    network_writer: NetworkWriter,
    network_reader: NetworkReader,
}

impl Engine {
    /// Builds every subsystem. Nothing runs scripts or touches the network
    /// until [`start`](Engine::start).
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        let vm = ScriptVm::new();
        let main_loop = EventLoop::new_main(EventLoopId::Main);
        let logic = Logic::new(&vm);

        let graphics = if config.headless {
            None
        } else {
            Some(GraphicsServer::new(logic.event_loop().clone()))
        };
        let audio = AudioServer::new();
        let assets = AssetServer::new(logic.event_loop().clone());

        let network_reader = if config.port == 0 {
            log::info!("networking disabled by config");
            NetworkReader::disabled()
        } else {
            let handler: PacketHandler = Arc::new(|data, addr| {
                log::debug!("{} byte packet from {addr}", data.len());
            });
            NetworkReader::open(config.port, logic.event_loop().clone(), handler)?
        };
        let network_writer = NetworkWriter::new(network_reader.shared_socket());

        Ok(Engine {
            config,
            vm,
            main_loop,
            logic,
            graphics,
            audio,
            assets,
            network_writer,
            network_reader,
        })
    }

    /// Runs the startup choreography: subsystem on-app-start callbacks,
    /// then the script module import on the logic thread, then the
    /// app-running hook.
    pub fn start(&self) -> anyhow::Result<()> {
        log::info!(
            "engine starting (port {}, headless {})",
            self.config.port,
            self.config.headless
        );
        if let Some(graphics) = &self.graphics {
            graphics.on_app_start();
        }
        self.audio.on_app_start();
        self.assets.on_app_start();

        // Module import goes last: by the time script code can observe the
        // engine, every subsystem it can reach already exists.
        self.logic.start()?;
        Ok(())
    }

    /// Blocks the calling thread driving the main loop until
    /// [`request_exit`](Engine::request_exit).
    pub fn run(&self) {
        self.main_loop.run(false);
    }

    /// Asks the main loop to wind down; [`run`](Engine::run) returns once
    /// already-queued main-loop work drains.
    pub fn request_exit(&self) {
        self.main_loop.shutdown();
    }

    /// Suspends the engine: script hook first, then clocks freeze and
    /// packet intake pauses. Queued work still drains while suspended.
    pub fn suspend(&self) {
        if let Err(e) = self.logic.fire_hook(LogicHook::AppSuspend, Vec::new()) {
            log::error!("app-suspend hook failed: {e}");
        }
        self.logic.event_loop().suspend();
        if let Some(graphics) = &self.graphics {
            graphics.event_loop().suspend();
        }
        self.audio.event_loop().suspend();
        self.assets.event_loop().suspend();
        self.network_writer.event_loop().suspend();
        self.network_reader.set_paused(true);
    }

    /// Resumes the engine: clocks thaw and packet intake restarts, then
    /// the script hook fires last.
    pub fn resume(&self) {
        self.network_reader.set_paused(false);
        self.network_writer.event_loop().resume();
        self.assets.event_loop().resume();
        self.audio.event_loop().resume();
        if let Some(graphics) = &self.graphics {
            graphics.event_loop().resume();
        }
        self.logic.event_loop().resume();
        if let Err(e) = self.logic.fire_hook(LogicHook::AppResume, Vec::new()) {
            log::error!("app-resume hook failed: {e}");
        }
    }

    /// Tears everything down in reverse construction order. The shutdown
    /// hook is the last script code that ever runs.
    pub fn shutdown(&self) {
        if self.logic.module().is_loaded() {
            if let Err(e) = self.logic.fire_hook(LogicHook::ShutdownComplete, Vec::new()) {
                log::error!("shutdown-complete hook failed: {e}");
            }
            // Let the hook actually run before the loops start dying.
            self.logic.event_loop().push_call_synchronous(|| {});
        }

        self.network_reader.shutdown();
        self.network_writer.shutdown();
        self.assets.shutdown();
        self.audio.shutdown();
        if let Some(graphics) = &self.graphics {
            graphics.shutdown();
        }
        self.logic.shutdown();
        if self.main_loop.is_running() {
            self.main_loop.shutdown();
        }
        log::info!("engine shut down");
    }

    /// The boot configuration this engine was built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shared script VM.
    pub fn vm(&self) -> &Arc<ScriptVm> {
        &self.vm
    }

    /// The logic subsystem.
    pub fn logic(&self) -> &Arc<Logic> {
        &self.logic
    }

    /// The graphics subsystem; absent in headless mode.
    pub fn graphics(&self) -> Option<&GraphicsServer> {
        self.graphics.as_ref()
    }

    /// The audio subsystem.
    pub fn audio(&self) -> &AudioServer {
        &self.audio
    }

    /// The asset subsystem.
    pub fn assets(&self) -> &AssetServer {
        &self.assets
    }

    /// The outbound network subsystem.
    pub fn network_writer(&self) -> &NetworkWriter {
        &self.network_writer
    }

    /// The inbound network subsystem.
    pub fn network_reader(&self) -> &NetworkReader {
        &self.network_reader
    }
}
