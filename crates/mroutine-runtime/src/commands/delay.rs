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

//! Time- and frame-based waits.

use mroutine_core::{Awaitable, PoolRegistry, TickTime};

/// Satisfied once the configured number of seconds has elapsed.
///
/// The remaining time is decremented by the tick's scaled delta, or by the
/// real delta when `realtime` is set.
#[derive(Debug, Default)]
pub struct WaitForSeconds {
    remaining: f32,
    realtime: bool,
}

impl WaitForSeconds {
    pub(crate) fn configure(&mut self, seconds: f32, realtime: bool) {
        self.remaining = seconds;
        self.realtime = realtime;
    }

    pub(crate) fn reset(&mut self) {
        self.remaining = 0.0;
        self.realtime = false;
    }

    /// Seconds left before the wait is satisfied.
    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}

impl Awaitable for WaitForSeconds {
    fn evaluate(&mut self, time: &TickTime) -> bool {
        self.remaining -= if self.realtime {
            time.unscaled_delta
        } else {
            time.delta
        };
        self.remaining <= 0.0
    }

    fn dispose(self: Box<Self>, pools: &mut PoolRegistry) {
        pools.release(self);
    }
}

/// Satisfied once the global frame counter reaches a target frame.
#[derive(Debug, Default)]
pub struct WaitForFrames {
    target: u64,
}

impl WaitForFrames {
    pub(crate) fn configure(&mut self, current_frame: u64, frames: u64) {
        self.target = current_frame.saturating_add(frames);
    }

    pub(crate) fn reset(&mut self) {
        self.target = 0;
    }

    /// The frame on which the wait is satisfied.
    pub fn target(&self) -> u64 {
        self.target
    }
}

impl Awaitable for WaitForFrames {
    fn evaluate(&mut self, time: &TickTime) -> bool {
        time.frame >= self.target
    }

    fn dispose(self: Box<Self>, pools: &mut PoolRegistry) {
        pools.release(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mroutine_core::TimeStep;

    #[test]
    fn test_scaled_seconds_ignore_real_time() {
        let mut wait = WaitForSeconds::default();
        wait.configure(1.0, false);

        let paused = TickTime::from_step(1, TimeStep::new(0.0, 5.0));
        assert!(!wait.evaluate(&paused));

        let running = TickTime::from_step(2, TimeStep::fixed(1.0));
        assert!(wait.evaluate(&running));
    }

    #[test]
    fn test_realtime_seconds_ignore_time_scale() {
        let mut wait = WaitForSeconds::default();
        wait.configure(0.5, true);

        let paused = TickTime::from_step(1, TimeStep::new(0.0, 0.5));
        assert!(wait.evaluate(&paused));
    }

    #[test]
    fn test_frames_target_is_relative() {
        let mut wait = WaitForFrames::default();
        wait.configure(10, 3);
        assert_eq!(wait.target(), 13);

        assert!(!wait.evaluate(&TickTime::from_step(12, TimeStep::default())));
        assert!(wait.evaluate(&TickTime::from_step(13, TimeStep::default())));
    }

    #[test]
    fn test_reset_clears_configuration() {
        let mut wait = WaitForSeconds::default();
        wait.configure(3.0, true);
        wait.reset();
        assert_eq!(wait.remaining(), 0.0);
    }
}
