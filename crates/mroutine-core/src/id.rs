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

//! Identity and observable state of scheduled routines.

use std::fmt;

/// A generational identifier for a processor slot.
///
/// Processor slots are recycled once a run finishes, so the index alone
/// cannot tell two runs apart. The generation is incremented every time the
/// slot is released, which means any `RoutineId` captured during an earlier
/// run stops matching and is treated as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutineId {
    /// The index of the processor slot in the scheduler's arena.
    pub index: u32,
    /// The generation of the slot when this id was issued.
    pub generation: u32,
}

impl fmt::Display for RoutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// The state of a routine as observed through its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoutineState {
    /// The handle was never bound to a processor.
    #[default]
    Unassigned,
    /// Created and configurable, but not started yet.
    Idle,
    /// Advancing once per tick.
    Running,
    /// A stop was requested; teardown happens on the next advance.
    Stopping,
    /// The run is over. Always reported once the handle's generation is stale.
    Complete,
}

impl RoutineState {
    /// Returns `true` for states where the run has not ended yet.
    pub fn is_alive(self) -> bool {
        matches!(self, Self::Idle | Self::Running | Self::Stopping)
    }
}
