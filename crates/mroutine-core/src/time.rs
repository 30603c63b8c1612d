// Copyright 2025 eraflo
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

//! Time inputs for the scheduler.
//!
//! The scheduler never reads a clock on its own: the host hands it a
//! [`TimeStep`] on every tick, and awaitables observe the resulting
//! [`TickTime`]. [`FrameClock`] is a convenience source for hosts that just
//! want wall-clock deltas.

use std::time::Instant;

/// Elapsed time supplied by the host for a single tick, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeStep {
    /// Elapsed time with the host's time scale applied.
    pub delta: f32,
    /// Elapsed real time, unaffected by time scale.
    pub unscaled_delta: f32,
}

impl TimeStep {
    /// A step where scaled and real time advanced by the same amount.
    pub fn fixed(seconds: f32) -> Self {
        Self {
            delta: seconds,
            unscaled_delta: seconds,
        }
    }

    /// A step with distinct scaled and real deltas.
    pub fn new(delta: f32, unscaled_delta: f32) -> Self {
        Self {
            delta,
            unscaled_delta,
        }
    }
}

/// The view of the current tick that awaitables evaluate against.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickTime {
    /// The global frame counter. Incremented once at the start of each tick.
    pub frame: u64,
    /// Scaled seconds elapsed since the previous tick.
    pub delta: f32,
    /// Real seconds elapsed since the previous tick.
    pub unscaled_delta: f32,
}

impl TickTime {
    /// Builds the time view of `frame` from the host's step.
    pub fn from_step(frame: u64, step: TimeStep) -> Self {
        Self {
            frame,
            delta: step.delta,
            unscaled_delta: step.unscaled_delta,
        }
    }
}

/// Measures wall-clock time between successive calls to [`FrameClock::step`].
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    time_scale: f32,
}

impl FrameClock {
    /// Creates a clock that starts measuring now, with a time scale of 1.
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            time_scale: 1.0,
        }
    }

    /// Returns the current time scale.
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Sets the factor applied to scaled deltas. Negative values clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Produces the step for the time elapsed since the previous call.
    ///
    /// ## Returns
    /// A [`TimeStep`] whose `delta` is the real elapsed time multiplied by
    /// the current time scale.
    pub fn step(&mut self) -> TimeStep {
        let now = Instant::now();
        let real = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        TimeStep::new(real * self.time_scale, real)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
