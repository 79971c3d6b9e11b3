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

//! Engine time newtypes.
//!
//! All engine clocks are integer microseconds. Two time bases exist per
//! event loop: *app-time*, which stops advancing while the loop is
//! suspended, and *display-time*, a smoothed per-frame value stepped
//! explicitly by whoever drives frames.

use std::time::Duration;

/// A signed span between two engine times, in microseconds.
///
/// Signed so that caller mistakes (negative delays) stay representable and
/// can be rejected loudly instead of silently clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TimeDelta(pub i64);

impl TimeDelta {
    /// A zero-length span.
    pub const ZERO: TimeDelta = TimeDelta(0);

    /// Builds a span from whole milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        TimeDelta(millis * 1_000)
    }

    /// Builds a span from whole microseconds.
    pub fn from_micros(micros: i64) -> Self {
        TimeDelta(micros)
    }

    /// The span in microseconds.
    pub fn as_micros(self) -> i64 {
        self.0
    }

    /// Whether this span is negative (a usage error for timer delays).
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Converts to a [`Duration`]; negative spans saturate to zero.
    pub fn to_duration(self) -> Duration {
        Duration::from_micros(self.0.max(0) as u64)
    }
}

/// A point on a loop's app-time clock, microseconds since loop start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct AppTime(pub i64);

impl AppTime {
    /// Adds a span, producing a deadline.
    pub fn offset(self, delta: TimeDelta) -> AppTime {
        AppTime(self.0 + delta.0)
    }
}

/// A point on a loop's display-time clock, microseconds of stepped frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct DisplayTime(pub i64);

impl DisplayTime {
    /// Adds a span, producing a deadline.
    pub fn offset(self, delta: TimeDelta) -> DisplayTime {
        DisplayTime(self.0 + delta.0)
    }

    /// Advances the clock by one frame step.
    pub fn step(&mut self, delta: TimeDelta) {
        self.0 += delta.0.max(0);
    }
}
