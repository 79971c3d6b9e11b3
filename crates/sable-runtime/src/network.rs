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

//! The network subsystems.
//!
//! The reader is the engine's one non-message-driven thread: it sits
//! blocked in a socket wait and communicates outward exclusively via
//! deferred calls into the logic loop — it never accepts pushed work. The
//! shared socket handle is mutex-guarded for writers on any thread, while
//! the reader keeps a private clone it reads from without locking (no one
//! else ever reads).
//!
//! Wire formats are an external collaborator; packets cross this boundary
//! as raw bytes.

use sable_core::event_loop::{EventLoop, EventLoopId};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handler invoked on the logic loop for each inbound packet.
pub type PacketHandler = Arc<dyn Fn(Vec<u8>, SocketAddr) + Send + Sync>;

/// Shared write-side guard around the game socket.
///
/// Lock it for any write or for socket replacement; the reader thread is
/// the single exception, reading through its own clone without the lock.
pub type SharedSocket = Arc<Mutex<Option<UdpSocket>>>;

const READ_POLL: Duration = Duration::from_millis(250);
const MAX_PACKET: usize = 64 * 1024;

/// The inbound half: a dedicated thread blocked in a socket wait.
pub struct NetworkReader {
    socket: SharedSocket,
    local_addr: Option<SocketAddr>,
    running: Arc<AtomicBool>,
    paused: Arc<(Mutex<bool>, Condvar)>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkReader {
    /// A reader with networking disabled; no socket, no thread.
    pub fn disabled() -> Self {
        NetworkReader {
            socket: Arc::new(Mutex::new(None)),
            local_addr: None,
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new((Mutex::new(false), Condvar::new())),
            thread: Mutex::new(None),
        }
    }

    /// Binds the game socket on `port` (0 picks an ephemeral port) and
    /// starts the read thread. Each packet becomes a deferred
    /// `on_packet` call on `logic_loop`.
    pub fn open(
        port: u16,
        logic_loop: Arc<EventLoop>,
        on_packet: PacketHandler,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        let local_addr = socket.local_addr()?;
        // Private read handle; recv_from needs no lock on it, ever.
        let read_socket = socket.try_clone()?;
        read_socket.set_read_timeout(Some(READ_POLL))?;

        let running = Arc::new(AtomicBool::new(true));
        let paused = Arc::new((Mutex::new(false), Condvar::new()));

        let thread = {
            let running = running.clone();
            let paused = paused.clone();
            thread::Builder::new()
                .name("sable-network-read".into())
                .spawn(move || {
                    Self::read_thread(read_socket, logic_loop, on_packet, running, paused);
                })?
        };

        log::info!("network reader listening on {local_addr}");
        Ok(NetworkReader {
            socket: Arc::new(Mutex::new(Some(socket))),
            local_addr: Some(local_addr),
            running,
            paused,
            thread: Mutex::new(Some(thread)),
        })
    }

    fn read_thread(
        socket: UdpSocket,
        logic_loop: Arc<EventLoop>,
        on_packet: PacketHandler,
        running: Arc<AtomicBool>,
        paused: Arc<(Mutex<bool>, Condvar)>,
    ) {
        let mut buffer = vec![0u8; MAX_PACKET];
        while running.load(Ordering::Acquire) {
            {
                let (flag, cv) = &*paused;
                let mut is_paused = flag.lock().expect("network pause lock poisoned");
                while *is_paused && running.load(Ordering::Acquire) {
                    let (guard, _timeout) = cv
                        .wait_timeout(is_paused, READ_POLL)
                        .expect("network pause lock poisoned");
                    is_paused = guard;
                }
            }

            match socket.recv_from(&mut buffer) {
                Ok((len, addr)) => {
                    let data = buffer[..len].to_vec();
                    let on_packet = on_packet.clone();
                    // Fire-and-forget into logic; the reader never blocks
                    // on anyone else's queue.
                    logic_loop.push_call(move || on_packet(data, addr));
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) => {}
                Err(e) => {
                    if running.load(Ordering::Acquire) {
                        log::error!("network read failed: {e}");
                    }
                    break;
                }
            }
        }
        log::debug!("network read thread exiting");
    }

    /// The bound address, if networking is enabled.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// The mutex-guarded socket handle writers share.
    pub fn shared_socket(&self) -> SharedSocket {
        self.socket.clone()
    }

    /// Pauses or resumes packet intake.
    pub fn set_paused(&self, value: bool) {
        let (flag, cv) = &*self.paused;
        *flag.lock().expect("network pause lock poisoned") = value;
        cv.notify_all();
    }

    /// Stops the read thread and closes the socket.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
        self.set_paused(false);
        // Dropping the shared handle; the reader's clone dies with the
        // thread after its current poll interval.
        self.socket
            .lock()
            .expect("network socket lock poisoned")
            .take();
        let handle = self
            .thread
            .lock()
            .expect("network thread handle lock poisoned")
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("network read thread panicked");
            }
        }
    }
}

/// The outbound half: an event-loop subsystem writing under the socket
/// mutex.
pub struct NetworkWriter {
    event_loop: Arc<EventLoop>,
    socket: SharedSocket,
}

impl NetworkWriter {
    /// Creates the writer over the reader's shared socket handle.
    pub fn new(socket: SharedSocket) -> Self {
        NetworkWriter {
            event_loop: EventLoop::spawn(EventLoopId::NetworkWrite),
            socket,
        }
    }

    /// This subsystem's event loop.
    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.event_loop
    }

    /// Queues a datagram. The write happens on the network-write thread
    /// with the socket mutex held.
    pub fn push_send_to(&self, data: Vec<u8>, addr: SocketAddr) {
        let socket = self.socket.clone();
        self.event_loop.push_call(move || {
            let guard = socket.lock().expect("network socket lock poisoned");
            match guard.as_ref() {
                Some(sock) => {
                    if let Err(e) = sock.send_to(&data, addr) {
                        log::error!("send to {addr} failed: {e}");
                    }
                }
                None => log::warn!("dropping send to {addr}: socket closed"),
            }
        });
    }

    /// Stops the loop and waits for its thread.
    pub fn shutdown(&self) {
        self.event_loop.shutdown();
        self.event_loop.join();
    }
}
