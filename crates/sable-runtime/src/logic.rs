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

//! The logic subsystem: home of the scripting bridge.
//!
//! The logic thread is the only thread that runs script code. Its module
//! import happens exactly once, on this thread, during app start: define
//! the natively-backed hook objects, populate the hook table by resolving
//! their well-known names, mark the module loaded. From then on native
//! code anywhere fires script hooks by table ID, fire-and-forget, onto
//! this loop.

use sable_core::context::{self, ContextRef, ContextTarget};
use sable_core::error::EngineError;
use sable_core::event_loop::{EventLoop, EventLoopId};
use sable_script::object_set::{ScriptObjectSet, SlotId};
use sable_script::{ScriptModule, ScriptValue, ScriptVm};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once, OnceLock, RwLock};

/// A running game session; the concrete target ambient contexts bind to.
pub struct GameSession {
    name: String,
}

impl GameSession {
    /// Creates a session.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(GameSession { name: name.into() })
    }
}

impl ContextTarget for GameSession {
    fn label(&self) -> &str {
        &self.name
    }
}

// The foreground session is app-global: a late-bound `Foreground` context
// must resolve the same way no matter which thread installs it.
fn foreground_store() -> &'static RwLock<Option<Arc<GameSession>>> {
    static STORE: OnceLock<RwLock<Option<Arc<GameSession>>>> = OnceLock::new();
    STORE.get_or_init(|| RwLock::new(None))
}

fn install_foreground_resolver() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        context::set_foreground_resolver(Arc::new(|| {
            match foreground_store()
                .read()
                .expect("foreground session lock poisoned")
                .as_ref()
            {
                Some(session) => ContextRef::of(session),
                None => ContextRef::empty(),
            }
        }));
    });
}

/// Script hooks the logic module caches at import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicHook {
    /// Fired once startup choreography completes.
    AppRunning,
    /// Fired before the app's loops freeze.
    AppSuspend,
    /// Fired after the app's loops thaw.
    AppResume,
    /// Fired as the last scripted act before teardown.
    ShutdownComplete,
}

impl LogicHook {
    const ALL: [LogicHook; 4] = [
        LogicHook::AppRunning,
        LogicHook::AppSuspend,
        LogicHook::AppResume,
        LogicHook::ShutdownComplete,
    ];

    /// The well-known module-namespace name this hook is resolved from.
    pub fn script_name(self) -> &'static str {
        match self {
            LogicHook::AppRunning => "on_app_running",
            LogicHook::AppSuspend => "on_app_suspend",
            LogicHook::AppResume => "on_app_resume",
            LogicHook::ShutdownComplete => "on_shutdown_complete",
        }
    }
}

impl SlotId for LogicHook {
    const COUNT: usize = 4;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    fn name(self) -> &'static str {
        self.script_name()
    }
}

/// The logic subsystem.
pub struct Logic {
    event_loop: Arc<EventLoop>,
    vm: Arc<ScriptVm>,
    module: Arc<ScriptModule>,
    hooks: Arc<Mutex<ScriptObjectSet<LogicHook>>>,
    app_running: Arc<AtomicBool>,
}

impl Logic {
    /// Spawns the logic loop and registers the foreground-context
    /// resolver: a late-bound `Foreground` context resolves to whatever
    /// session is foreground when the context is *installed*.
    pub fn new(vm: &Arc<ScriptVm>) -> Arc<Self> {
        install_foreground_resolver();

        Arc::new(Logic {
            event_loop: EventLoop::spawn(EventLoopId::Logic),
            vm: vm.clone(),
            module: Arc::new(ScriptModule::new("_sablebase", vm)),
            hooks: Arc::new(Mutex::new(ScriptObjectSet::new())),
            app_running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// This subsystem's event loop.
    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.event_loop
    }

    /// The script module this subsystem bootstraps.
    pub fn module(&self) -> &Arc<ScriptModule> {
        &self.module
    }

    /// The VM shared across the engine.
    pub fn vm(&self) -> &Arc<ScriptVm> {
        &self.vm
    }

    /// Whether the app-running hook has fired.
    pub fn is_app_running(&self) -> bool {
        self.app_running.load(Ordering::Acquire)
    }

    /// Makes `session` the foreground target for late-bound contexts.
    pub fn set_foreground_session(&self, session: Option<Arc<GameSession>>) {
        *foreground_store()
            .write()
            .expect("foreground session lock poisoned") = session;
    }

    /// Runs module import on the logic thread and fires the app-running
    /// hook. Called once by the composition root during startup.
    pub fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        let (tx, rx) = flume::bounded::<Result<(), EngineError>>(1);
        let logic = self.clone();
        self.event_loop.push_call(move || {
            let _ = tx.send(logic.import_module());
        });
        rx.recv()
            .map_err(|_| anyhow::anyhow!("logic loop died during startup"))??;

        self.fire_hook(LogicHook::AppRunning, Vec::new())?;
        Ok(())
    }

    /// The module-import hook: define natively-backed objects, populate
    /// the hook table from well-known names, signal fully-loaded.
    fn import_module(&self) -> Result<(), EngineError> {
        self.event_loop.assert_in_loop();

        {
            let app_running = self.app_running.clone();
            self.module.define(
                LogicHook::AppRunning.script_name(),
                ScriptValue::Callable(Arc::new(move |_args| {
                    app_running.store(true, Ordering::Release);
                    log::info!("app running");
                    Ok(ScriptValue::None)
                })),
            )?;
        }
        self.module.define(
            LogicHook::AppSuspend.script_name(),
            ScriptValue::Callable(Arc::new(|_args| {
                log::info!("app suspending");
                Ok(ScriptValue::None)
            })),
        )?;
        self.module.define(
            LogicHook::AppResume.script_name(),
            ScriptValue::Callable(Arc::new(|_args| {
                log::info!("app resumed");
                Ok(ScriptValue::None)
            })),
        )?;
        self.module.define(
            LogicHook::ShutdownComplete.script_name(),
            ScriptValue::Callable(Arc::new(|_args| {
                log::info!("shutdown complete");
                Ok(ScriptValue::None)
            })),
        )?;

        let mut hooks = self.hooks.lock().expect("hook table lock poisoned");
        for hook in LogicHook::ALL {
            hooks.store(hook, self.module.resolve(hook.script_name())?)?;
        }
        drop(hooks);

        self.module.mark_loaded();
        Ok(())
    }

    /// Fires a cached script hook as a deferred, context-capturing call
    /// on the logic loop.
    pub fn fire_hook(
        &self,
        hook: LogicHook,
        args: Vec<ScriptValue>,
    ) -> Result<(), EngineError> {
        self.hooks
            .lock()
            .expect("hook table lock poisoned")
            .push_call(hook, args, &self.event_loop)
    }

    /// Whether a hook slot has been populated.
    pub fn has_hook(&self, hook: LogicHook) -> bool {
        self.hooks
            .lock()
            .expect("hook table lock poisoned")
            .exists(hook)
    }

    /// Stops the loop and waits for its thread.
    pub fn shutdown(&self) {
        self.event_loop.shutdown();
        self.event_loop.join();
        self.app_running.store(false, Ordering::Release);
    }
}
