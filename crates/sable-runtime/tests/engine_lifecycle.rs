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

//! Whole-engine lifecycle tests: boot, scripting hooks, cross-thread
//! object handles, exit.

use sable_core::time::TimeDelta;
use sable_runtime::{Engine, EngineConfig};
use std::time::{Duration, Instant};

fn headless() -> EngineConfig {
    EngineConfig {
        port: 0,
        headless: true,
        ..EngineConfig::default()
    }
}

fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn boot_run_exit() {
    let engine = Engine::new(headless()).unwrap();
    engine.start().unwrap();
    wait_until("app running", || engine.logic().is_app_running());
    assert!(engine.logic().module().is_loaded());

    // A logic-side timer stands in for the platform event that would ask
    // the app to quit.
    let (tx, rx) = flume::bounded::<()>(1);
    engine
        .logic()
        .event_loop()
        .push_timer_call(TimeDelta::from_millis(20), move || {
            let _ = tx.send(());
        })
        .unwrap();
    rx.recv_timeout(Duration::from_secs(2))
        .expect("logic timer never fired");

    engine.request_exit();
    engine.run(); // exit already requested; drains and returns
    engine.shutdown();
}

#[test]
fn sound_handles_survive_threads_but_not_destruction() {
    let engine = Engine::new(headless()).unwrap();
    engine.start().unwrap();
    wait_until("app running", || engine.logic().is_app_running());

    let weak = engine.audio().add_source("menu-music.ogg");
    engine.audio().event_loop().push_call_synchronous(|| {});

    // Resolve the weak handle from a foreign thread.
    let resolved = {
        let weak = weak.clone();
        std::thread::spawn(move || weak.get().map(|s| s.get().unwrap().name().to_string()))
            .join()
            .unwrap()
    };
    assert_eq!(resolved.as_deref(), Some("menu-music.ogg"));

    let id = weak.get().unwrap().get().unwrap().id();
    engine.audio().destroy_source(id);
    engine.audio().event_loop().push_call_synchronous(|| {});
    assert!(weak.gone());

    engine.shutdown();
}

#[test]
fn suspend_and_resume_fire_script_hooks_in_order() {
    let engine = Engine::new(headless()).unwrap();
    engine.start().unwrap();
    wait_until("app running", || engine.logic().is_app_running());

    engine.suspend();
    engine.resume();
    // Hooks are deferred onto the logic loop; a synchronous marker after
    // them proves both ran without panicking the loop.
    engine.logic().event_loop().push_call_synchronous(|| {});
    assert!(engine.logic().event_loop().is_running());

    engine.shutdown();
}

#[test]
fn disabled_networking_has_no_socket() {
    let engine = Engine::new(headless()).unwrap();
    assert!(engine.network_reader().local_addr().is_none());
    engine.start().unwrap();
    engine.shutdown();
}
