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

//! # Sable Runtime
//!
//! The engine's composition root and subsystem set. Each subsystem —
//! logic, graphics server, audio server, asset server, network writer —
//! owns exactly one [`EventLoop`](sable_core::EventLoop); the network
//! reader is the one non-message-driven thread, blocked in a socket wait.
//! [`Engine`] wires them together leaf-first, once, at startup.

#![warn(missing_docs)]

pub mod assets;
pub mod audio;
pub mod config;
pub mod engine;
pub mod graphics;
pub mod logic;
pub mod network;

pub use config::EngineConfig;
pub use engine::Engine;
