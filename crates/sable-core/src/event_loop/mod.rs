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

//! Per-thread event loops and cross-thread deferred call scheduling.
//!
//! Every engine subsystem thread owns exactly one [`EventLoop`]: a FIFO
//! queue of deferred callables drained by that thread alone. Any thread may
//! submit work with [`push_call`](EventLoop::push_call); the loop executes
//! callables strictly in enqueue order, each run to completion before the
//! next begins. This is what serializes all mutation of a subsystem's state
//! onto its owning thread without per-object locking.
//!
//! Cross-loop calls are fire-and-forget by design. Blocking on another
//! loop's queue while holding the script VM lock is how lock-ordering
//! deadlocks are born; the only blocking primitive offered,
//! [`push_call_synchronous`](EventLoop::push_call_synchronous), exists for
//! boot/shutdown choreography on threads that hold no such lock.

mod timer;

use crate::context::{ContextCall, ContextRef};
use crate::error::EngineError;
use crate::time::{AppTime, DisplayTime, TimeDelta};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use timer::TimerList;

/// The closed set of subsystem event loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventLoopId {
    /// The process main thread; integrates an externally-owned OS loop.
    Main,
    /// Game logic and the scripting bridge.
    Logic,
    /// Render command submission.
    Graphics,
    /// Audio source and mixer control.
    Audio,
    /// Background asset loading.
    Assets,
    /// Outbound network writes.
    NetworkWrite,
}

impl EventLoopId {
    /// Stable lowercase name, used for thread names and log provenance.
    pub fn name(self) -> &'static str {
        match self {
            EventLoopId::Main => "main",
            EventLoopId::Logic => "logic",
            EventLoopId::Graphics => "graphics",
            EventLoopId::Audio => "audio",
            EventLoopId::Assets => "assets",
            EventLoopId::NetworkWrite => "network-write",
        }
    }
}

type Call = Box<dyn FnOnce() + Send + 'static>;
type Hook = Box<dyn Fn() + Send + 'static>;

enum LoopMessage {
    Call(Call),
    AppTimer { delay: TimeDelta, call: Call },
    DisplayTimer { delay: TimeDelta, call: Call },
    StepDisplayTime(TimeDelta),
    Suspend,
    Resume,
    AddSuspendHook(Hook),
    AddResumeHook(Hook),
    Shutdown,
}

/// App-time clock: monotonic, frozen while the loop is suspended.
struct AppClock {
    start: Instant,
    paused_total: Duration,
    suspended_at: Option<Instant>,
}

impl AppClock {
    fn new() -> Self {
        AppClock {
            start: Instant::now(),
            paused_total: Duration::ZERO,
            suspended_at: None,
        }
    }

    fn now(&self) -> AppTime {
        let effective = self.suspended_at.unwrap_or_else(Instant::now);
        let run = effective
            .saturating_duration_since(self.start)
            .saturating_sub(self.paused_total);
        AppTime(run.as_micros() as i64)
    }

    fn suspend(&mut self) {
        if self.suspended_at.is_none() {
            self.suspended_at = Some(Instant::now());
        }
    }

    fn resume(&mut self) {
        if let Some(at) = self.suspended_at.take() {
            self.paused_total += at.elapsed();
        }
    }

    fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }
}

/// State owned exclusively by the loop's own thread.
struct LoopState {
    clock: AppClock,
    display_time: DisplayTime,
    app_timers: TimerList<AppTime>,
    display_timers: TimerList<DisplayTime>,
    suspend_hooks: Vec<Hook>,
    resume_hooks: Vec<Hook>,
}

impl LoopState {
    fn new() -> Self {
        LoopState {
            clock: AppClock::new(),
            display_time: DisplayTime::default(),
            app_timers: TimerList::new(),
            display_timers: TimerList::new(),
            suspend_hooks: Vec::new(),
            resume_hooks: Vec::new(),
        }
    }
}

enum ExitReason {
    /// `run(return_on_empty = true)` found the queue empty.
    Drained,
    /// A shutdown message was processed.
    ShutDown,
}

/// A subsystem's private FIFO queue of deferred callables plus the thread
/// that drains it.
///
/// Created either with [`spawn`](EventLoop::spawn) (dedicated OS thread) or
/// [`new_main`](EventLoop::new_main) (the main thread integrates the loop
/// into an OS loop it must own itself, pumping via [`run`](EventLoop::run)).
pub struct EventLoop {
    id: EventLoopId,
    sender: flume::Sender<LoopMessage>,
    receiver: flume::Receiver<LoopMessage>,
    running: AtomicBool,
    thread_id: OnceLock<ThreadId>,
    handle: Mutex<Option<JoinHandle<()>>>,
    // Touched only by the owning thread, inside run; the mutex exists so
    // state survives across pump-style re-entries on main loops.
    state: Mutex<LoopState>,
}

impl EventLoop {
    fn new(id: EventLoopId) -> Arc<Self> {
        let (sender, receiver) = flume::unbounded();
        Arc::new(EventLoop {
            id,
            sender,
            receiver,
            running: AtomicBool::new(true),
            thread_id: OnceLock::new(),
            handle: Mutex::new(None),
            state: Mutex::new(LoopState::new()),
        })
    }

    /// Creates the loop and spawns its dedicated owning thread.
    pub fn spawn(id: EventLoopId) -> Arc<Self> {
        let event_loop = Self::new(id);
        let for_thread = event_loop.clone();
        let handle = thread::Builder::new()
            .name(format!("sable-{}", id.name()))
            .spawn(move || {
                for_thread.run_internal(false);
            })
            .expect("failed to spawn event loop thread");
        *event_loop.handle.lock().expect("event loop handle lock poisoned") = Some(handle);
        log::debug!("event loop '{}' spawned", id.name());
        event_loop
    }

    /// Creates a loop without a thread; the external owner drives it with
    /// [`run`](EventLoop::run).
    pub fn new_main(id: EventLoopId) -> Arc<Self> {
        Self::new(id)
    }

    /// The loop's identity.
    pub fn id(&self) -> EventLoopId {
        self.id
    }

    /// Whether the loop still accepts work. The `AppRunning`-style gate
    /// callers consult before pushing speculative work during startup or
    /// shutdown windows.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether the calling thread is this loop's owning thread.
    pub fn is_current(&self) -> bool {
        self.thread_id.get() == Some(&thread::current().id())
    }

    /// Hard-stop if the calling thread does not own this loop. A violation
    /// is a structural bug, not a recoverable condition.
    pub fn assert_in_loop(&self) {
        assert!(
            self.is_current(),
            "thread-affinity violation: not on the '{}' loop thread",
            self.id.name()
        );
    }

    /// Enqueues `call` for execution on this loop's thread and returns
    /// immediately.
    ///
    /// FIFO relative to other `push_call`s from the same submitting thread;
    /// the loop executes whatever is queued, oldest first, each callable
    /// run to completion. Pushing to a loop that has fully shut down is a
    /// programming error: it asserts in debug builds and drops with an
    /// error log in release builds.
    pub fn push_call(&self, call: impl FnOnce() + Send + 'static) {
        if let Err(e) = self.try_push_call(call) {
            debug_assert!(false, "push_call to dead loop: {e}");
            log::error!(
                "dropping call pushed to dead '{}' loop (ambient context {:?})",
                self.id.name(),
                ContextRef::current()
            );
        }
    }

    /// Like [`push_call`](EventLoop::push_call), but reports a dead loop as
    /// [`EngineError::LoopShutDown`] instead of dropping.
    pub fn try_push_call(
        &self,
        call: impl FnOnce() + Send + 'static,
    ) -> Result<(), EngineError> {
        if !self.is_running() {
            return Err(EngineError::LoopShutDown(self.id.name()));
        }
        self.sender
            .send(LoopMessage::Call(Box::new(call)))
            .map_err(|_| EngineError::LoopShutDown(self.id.name()))
    }

    /// Enqueues a context-carrying call; the body runs under the context
    /// captured at schedule time, not the target thread's ambient one.
    pub fn push_context_call(&self, call: ContextCall) {
        self.push_call(move || call.run());
    }

    /// Pushes `call` and blocks until it has finished executing.
    ///
    /// Boot/shutdown choreography only. Must never be called while holding
    /// the script VM lock (lock-ordering deadlock) and never from the
    /// loop's own thread (self-deadlock; asserted).
    pub fn push_call_synchronous(&self, call: impl FnOnce() + Send + 'static) {
        assert!(
            !self.is_current(),
            "push_call_synchronous from the '{}' loop's own thread would deadlock",
            self.id.name()
        );
        let (done_tx, done_rx) = flume::bounded::<()>(1);
        let queued = self.try_push_call(move || {
            call();
            let _ = done_tx.send(());
        });
        if queued.is_err() {
            log::error!(
                "dropping synchronous call pushed to dead '{}' loop",
                self.id.name()
            );
            return;
        }
        // The loop can shut down between the liveness gate in try_push_call
        // and execution, stranding the queued closure (and its `done`
        // sender) in the retained channel. Re-check liveness on a timeout
        // instead of blocking on a signal that may never come.
        loop {
            match done_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(()) => return,
                Err(flume::RecvTimeoutError::Disconnected) => return,
                Err(flume::RecvTimeoutError::Timeout) => {
                    if !self.is_running() {
                        // The call may still have run during the shutdown
                        // drain; one last look before declaring it dropped.
                        if done_rx.try_recv().is_err() {
                            log::error!(
                                "dropping synchronous call: '{}' loop shut down before running it",
                                self.id.name()
                            );
                        }
                        return;
                    }
                }
            }
        }
    }

    /// Schedules `call` to run once after `delay` of this loop's app-time
    /// (which pauses while the loop is suspended).
    ///
    /// The deadline is measured when the loop thread registers the timer.
    /// One-shot timers cannot be canceled. A negative delay is a usage
    /// error, not silently clamped.
    pub fn push_timer_call(
        &self,
        delay: TimeDelta,
        call: impl FnOnce() + Send + 'static,
    ) -> Result<(), EngineError> {
        if delay.is_negative() {
            return Err(EngineError::InvalidArgument(format!(
                "negative timer delay: {}us",
                delay.as_micros()
            )));
        }
        self.send(LoopMessage::AppTimer {
            delay,
            call: Box::new(call),
        });
        Ok(())
    }

    /// Schedules `call` to run once after `delay` of display-time, the
    /// smoothed per-frame clock advanced by
    /// [`step_display_time`](EventLoop::step_display_time).
    pub fn push_display_timer_call(
        &self,
        delay: TimeDelta,
        call: impl FnOnce() + Send + 'static,
    ) -> Result<(), EngineError> {
        if delay.is_negative() {
            return Err(EngineError::InvalidArgument(format!(
                "negative display timer delay: {}us",
                delay.as_micros()
            )));
        }
        self.send(LoopMessage::DisplayTimer {
            delay,
            call: Box::new(call),
        });
        Ok(())
    }

    /// Advances display-time by one frame step, firing any display timers
    /// that come due.
    pub fn step_display_time(&self, delta: TimeDelta) {
        self.send(LoopMessage::StepDisplayTime(delta));
    }

    /// Freezes the loop's app-time clock. Queued calls still drain.
    pub fn suspend(&self) {
        self.send(LoopMessage::Suspend);
    }

    /// Unfreezes the loop's app-time clock.
    pub fn resume(&self) {
        self.send(LoopMessage::Resume);
    }

    /// Registers a hook run on the loop thread whenever the loop suspends.
    pub fn add_suspend_hook(&self, hook: impl Fn() + Send + 'static) {
        self.send(LoopMessage::AddSuspendHook(Box::new(hook)));
    }

    /// Registers a hook run on the loop thread whenever the loop resumes.
    pub fn add_resume_hook(&self, hook: impl Fn() + Send + 'static) {
        self.send(LoopMessage::AddResumeHook(Box::new(hook)));
    }

    /// Requests shutdown: the loop drains calls already queued, then its
    /// thread exits. Pending timers are discarded.
    pub fn shutdown(&self) {
        self.send(LoopMessage::Shutdown);
    }

    /// Waits for a spawned loop's thread to exit. No-op for main-style
    /// loops and when already joined.
    pub fn join(&self) {
        let handle = self
            .handle
            .lock()
            .expect("event loop handle lock poisoned")
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("event loop '{}' thread panicked", self.id.name());
            }
        }
    }

    /// Drives a main-style loop on the calling thread.
    ///
    /// With `return_on_empty` the call processes everything currently
    /// queued (plus due timers) and returns, letting an externally-owned
    /// OS loop interleave its own pumping; otherwise it blocks until
    /// [`shutdown`](EventLoop::shutdown).
    pub fn run(&self, return_on_empty: bool) {
        self.run_internal(return_on_empty);
    }

    fn send(&self, message: LoopMessage) {
        if !self.is_running() || self.sender.send(message).is_err() {
            log::error!(
                "dropping message for dead '{}' loop",
                self.id.name()
            );
        }
    }

    fn run_internal(&self, return_on_empty: bool) {
        let bound = self.thread_id.get_or_init(|| thread::current().id());
        assert!(
            *bound == thread::current().id(),
            "event loop '{}' driven from a thread that does not own it",
            self.id.name()
        );

        let mut state = self.state.lock().expect("event loop state lock poisoned");
        let reason = self.pump(&mut state, return_on_empty);

        if matches!(reason, ExitReason::ShutDown) {
            self.running.store(false, Ordering::Release);
            log::debug!("event loop '{}' shut down", self.id.name());
        }
    }

    fn pump(&self, state: &mut LoopState, return_on_empty: bool) -> ExitReason {
        loop {
            for call in state.app_timers.take_due(state.clock.now()) {
                self.dispatch(call);
            }

            let message = if return_on_empty {
                match self.receiver.try_recv() {
                    Ok(m) => m,
                    Err(_) => return ExitReason::Drained,
                }
            } else if state.clock.is_suspended() {
                // Timers are frozen with the clock; only messages matter.
                match self.receiver.recv() {
                    Ok(m) => m,
                    Err(_) => return ExitReason::ShutDown,
                }
            } else {
                match state.app_timers.next_deadline() {
                    Some(deadline) => {
                        let now = state.clock.now();
                        let wait = Duration::from_micros(
                            (deadline.0 - now.0).max(0) as u64,
                        );
                        match self.receiver.recv_timeout(wait) {
                            Ok(m) => m,
                            Err(flume::RecvTimeoutError::Timeout) => continue,
                            Err(flume::RecvTimeoutError::Disconnected) => {
                                return ExitReason::ShutDown
                            }
                        }
                    }
                    None => match self.receiver.recv() {
                        Ok(m) => m,
                        Err(_) => return ExitReason::ShutDown,
                    },
                }
            };

            match message {
                LoopMessage::Call(call) => self.dispatch(call),
                LoopMessage::AppTimer { delay, call } => {
                    state
                        .app_timers
                        .add(state.clock.now().offset(delay), call);
                }
                LoopMessage::DisplayTimer { delay, call } => {
                    state
                        .display_timers
                        .add(state.display_time.offset(delay), call);
                }
                LoopMessage::StepDisplayTime(delta) => {
                    state.display_time.step(delta);
                    for call in state.display_timers.take_due(state.display_time) {
                        self.dispatch(call);
                    }
                }
                LoopMessage::Suspend => {
                    if !state.clock.is_suspended() {
                        state.clock.suspend();
                        log::debug!("event loop '{}' suspended", self.id.name());
                        for hook in &state.suspend_hooks {
                            hook();
                        }
                    }
                }
                LoopMessage::Resume => {
                    if state.clock.is_suspended() {
                        state.clock.resume();
                        log::debug!("event loop '{}' resumed", self.id.name());
                        for hook in &state.resume_hooks {
                            hook();
                        }
                    }
                }
                LoopMessage::AddSuspendHook(hook) => state.suspend_hooks.push(hook),
                LoopMessage::AddResumeHook(hook) => state.resume_hooks.push(hook),
                LoopMessage::Shutdown => {
                    // Graceful drain: run what was already queued, drop the
                    // rest of the message kinds.
                    while let Ok(message) = self.receiver.try_recv() {
                        if let LoopMessage::Call(call) = message {
                            self.dispatch(call);
                        }
                    }
                    return ExitReason::ShutDown;
                }
            }
        }
    }

    /// Runs one callable to completion, containing any panic so a failing
    /// callable cannot stall the queue for subsequent ones.
    fn dispatch(&self, call: Call) {
        if catch_unwind(AssertUnwindSafe(call)).is_err() {
            log::error!(
                "deferred call panicked on '{}' loop (ambient context {:?}); queue continues",
                self.id.name(),
                ContextRef::current()
            );
        }
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("id", &self.id)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn drain(event_loop: &Arc<EventLoop>) {
        // Barrier: once this runs, everything pushed before it has run.
        event_loop.push_call_synchronous(|| {});
    }

    #[test]
    fn same_thread_push_order_is_execution_order() {
        let event_loop = EventLoop::spawn(EventLoopId::Logic);
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["A", "B", "C"] {
            let order = order.clone();
            event_loop.push_call(move || order.lock().unwrap().push(tag));
        }
        drain(&event_loop);

        assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C"]);
        event_loop.shutdown();
        event_loop.join();
    }

    #[test]
    fn callables_run_on_the_owning_thread_to_completion() {
        let event_loop = EventLoop::spawn(EventLoopId::Graphics);
        let observed = Arc::new(Mutex::new(Vec::new()));

        for i in 0..100u32 {
            let observed = observed.clone();
            let for_check = event_loop.clone();
            event_loop.push_call(move || {
                for_check.assert_in_loop();
                observed.lock().unwrap().push(i);
            });
        }
        drain(&event_loop);

        let observed = observed.lock().unwrap();
        assert_eq!(observed.len(), 100);
        assert!(observed.windows(2).all(|w| w[0] < w[1]));
        event_loop.shutdown();
        event_loop.join();
    }

    #[test]
    fn panicking_callable_does_not_stall_the_queue() {
        let event_loop = EventLoop::spawn(EventLoopId::Audio);
        let ran = Arc::new(AtomicBool::new(false));

        event_loop.push_call(|| panic!("deliberate test panic"));
        {
            let ran = ran.clone();
            event_loop.push_call(move || ran.store(true, Ordering::SeqCst));
        }
        drain(&event_loop);

        assert!(ran.load(Ordering::SeqCst));
        event_loop.shutdown();
        event_loop.join();
    }

    #[test]
    fn negative_timer_delay_is_rejected() {
        let event_loop = EventLoop::spawn(EventLoopId::Logic);
        let result = event_loop.push_timer_call(TimeDelta::from_millis(-1), || {});
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
        let result = event_loop.push_display_timer_call(TimeDelta::from_micros(-1), || {});
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
        event_loop.shutdown();
        event_loop.join();
    }

    #[test]
    fn app_timer_fires_once_after_delay() {
        let event_loop = EventLoop::spawn(EventLoopId::Logic);
        let fired = Arc::new(AtomicUsize::new(0));

        let (tx, rx) = flume::bounded(1);
        {
            let fired = fired.clone();
            event_loop
                .push_timer_call(TimeDelta::from_millis(20), move || {
                    fired.fetch_add(1, Ordering::SeqCst);
                    let _ = tx.send(());
                })
                .unwrap();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        rx.recv_timeout(Duration::from_secs(2))
            .expect("timer did not fire");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        event_loop.shutdown();
        event_loop.join();
    }

    #[test]
    fn display_timer_fires_on_stepped_frames() {
        let event_loop = EventLoop::spawn(EventLoopId::Logic);
        let fired = Arc::new(AtomicBool::new(false));

        {
            let fired = fired.clone();
            event_loop
                .push_display_timer_call(TimeDelta::from_millis(30), move || {
                    fired.store(true, Ordering::SeqCst);
                })
                .unwrap();
        }

        event_loop.step_display_time(TimeDelta::from_millis(16));
        drain(&event_loop);
        assert!(!fired.load(Ordering::SeqCst));

        event_loop.step_display_time(TimeDelta::from_millis(16));
        drain(&event_loop);
        assert!(fired.load(Ordering::SeqCst));
        event_loop.shutdown();
        event_loop.join();
    }

    #[test]
    fn suspend_freezes_app_time_but_not_the_queue() {
        let event_loop = EventLoop::spawn(EventLoopId::Logic);
        let fired = Arc::new(AtomicBool::new(false));

        event_loop.suspend();
        {
            let fired = fired.clone();
            event_loop
                .push_timer_call(TimeDelta::from_millis(5), move || {
                    fired.store(true, Ordering::SeqCst);
                })
                .unwrap();
        }
        // Queued plain calls still run while suspended.
        drain(&event_loop);
        thread::sleep(Duration::from_millis(30));
        drain(&event_loop);
        assert!(!fired.load(Ordering::SeqCst), "timer ran on frozen clock");

        event_loop.resume();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !fired.load(Ordering::SeqCst) {
            assert!(Instant::now() < deadline, "timer never fired after resume");
            thread::sleep(Duration::from_millis(5));
        }
        event_loop.shutdown();
        event_loop.join();
    }

    #[test]
    fn suspend_and_resume_hooks_run_on_loop_thread() {
        let event_loop = EventLoop::spawn(EventLoopId::Audio);
        let log = Arc::new(Mutex::new(Vec::new()));

        {
            let log = log.clone();
            event_loop.add_suspend_hook(move || log.lock().unwrap().push("suspend"));
        }
        {
            let log = log.clone();
            event_loop.add_resume_hook(move || log.lock().unwrap().push("resume"));
        }
        event_loop.suspend();
        event_loop.suspend(); // redundant; hooks fire once
        event_loop.resume();
        drain(&event_loop);

        assert_eq!(*log.lock().unwrap(), vec!["suspend", "resume"]);
        event_loop.shutdown();
        event_loop.join();
    }

    #[test]
    fn shutdown_drains_queued_calls_then_rejects_new_ones() {
        let event_loop = EventLoop::spawn(EventLoopId::Assets);
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let ran = ran.clone();
            event_loop.push_call(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        event_loop.shutdown();
        event_loop.join();
        assert_eq!(ran.load(Ordering::SeqCst), 10);

        assert!(!event_loop.is_running());
        assert!(matches!(
            event_loop.try_push_call(|| {}),
            Err(EngineError::LoopShutDown(_))
        ));
    }

    #[test]
    fn synchronous_push_returns_even_when_racing_shutdown() {
        // Hammer the window between try_push_call's liveness gate and the
        // shutdown drain's final empty try_recv; a call stranded in the
        // retained channel must be reported dropped, never waited on.
        for _ in 0..16 {
            let event_loop = EventLoop::spawn(EventLoopId::Assets);
            let pusher = {
                let event_loop = event_loop.clone();
                thread::spawn(move || {
                    for _ in 0..64 {
                        event_loop.push_call_synchronous(|| {});
                        if !event_loop.is_running() {
                            break;
                        }
                    }
                })
            };
            event_loop.shutdown();
            event_loop.join();
            pusher.join().unwrap();

            // Fully dead: the synchronous push degrades to a logged drop.
            event_loop.push_call_synchronous(|| {});
        }
    }

    #[test]
    fn main_style_loop_pumps_and_returns_on_empty() {
        let event_loop = EventLoop::new_main(EventLoopId::Main);
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let ran = ran.clone();
            event_loop.push_call(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        event_loop.run(true);
        assert_eq!(ran.load(Ordering::SeqCst), 3);

        // A second pump with nothing queued returns immediately.
        event_loop.run(true);
        assert_eq!(ran.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn main_style_loop_blocks_until_shutdown() {
        let event_loop = EventLoop::new_main(EventLoopId::Main);
        let ran = Arc::new(AtomicBool::new(false));

        {
            let ran = ran.clone();
            event_loop.push_call(move || ran.store(true, Ordering::SeqCst));
        }
        event_loop.shutdown();
        event_loop.run(false);

        assert!(ran.load(Ordering::SeqCst));
        assert!(!event_loop.is_running());
    }

    #[test]
    fn cross_thread_submissions_each_keep_their_own_order() {
        let event_loop = EventLoop::spawn(EventLoopId::Logic);
        let observed: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));

        let mut submitters = Vec::new();
        for thread_tag in 0..4 {
            let event_loop = event_loop.clone();
            let observed = observed.clone();
            submitters.push(thread::spawn(move || {
                for seq in 0..50 {
                    let observed = observed.clone();
                    event_loop.push_call(move || {
                        observed.lock().unwrap().push((thread_tag, seq));
                    });
                }
            }));
        }
        for submitter in submitters {
            submitter.join().unwrap();
        }
        drain(&event_loop);

        let observed = observed.lock().unwrap();
        assert_eq!(observed.len(), 200);
        // Per-submitter FIFO: each thread's sequence numbers appear in order.
        for thread_tag in 0..4 {
            let seqs: Vec<usize> = observed
                .iter()
                .filter(|(t, _)| *t == thread_tag)
                .map(|(_, s)| *s)
                .collect();
            assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        }
        event_loop.shutdown();
        event_loop.join();
    }
}
