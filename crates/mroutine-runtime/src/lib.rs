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

//! # MRoutine Runtime
//!
//! A single-threaded, frame-driven scheduler for cooperative routines.
//!
//! A routine is a [`Sequence`]: a resumable computation that, each time it is
//! resumed, either yields something to wait on or reports that it is done.
//! The [`Scheduler`] wraps a sequence in a pooled processor and hands back a
//! [`Handle`]. Once started, the host's per-frame [`Scheduler::tick`] advances
//! every running processor until it suspends again.
//!
//! ```rust
//! use mroutine_runtime::{Scheduler, Script, TimeStep};
//!
//! let scheduler = Scheduler::default();
//! let handle = scheduler.create(
//!     Script::new()
//!         .step(|_| None)
//!         .step(|cx| Some(cx.scheduler().wait_frames(2))),
//! );
//! handle.start().unwrap();
//!
//! scheduler.tick(TimeStep::fixed(0.016)).unwrap();
//! assert!(handle.is_valid());
//! scheduler.tick(TimeStep::fixed(0.016)).unwrap();
//! assert!(!handle.is_valid());
//! ```

#![warn(missing_docs)]

pub mod commands;
mod convert;
pub mod handle;
mod processor;
pub mod scheduler;
pub mod sequence;

pub use handle::Handle;
pub use scheduler::Scheduler;
pub use sequence::{GroupMode, RoutineContext, Script, Sequence, YieldValue, Yielded};

pub use mroutine_core::{
    AsyncOperation, Awaitable, FrameClock, Lifetime, LifetimeSignal, PoolRegistry, PoolStats,
    RoutineError, RoutineId, RoutineState, SchedulerConfig, TickTime, TimeStep,
};
