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

//! # MRoutine Core
//!
//! Foundational crate containing the contracts shared by the routine
//! scheduler and its hosts: the [`Awaitable`] primitive, time types, the
//! external-operation and lifetime adapters, the type-keyed object pool, and
//! the error taxonomy.
//!
//! Nothing in here advances routines. The scheduler itself lives in
//! `mroutine-runtime`, which depends on this crate.

#![warn(missing_docs)]

pub mod awaitable;
pub mod config;
pub mod error;
pub mod id;
pub mod lifetime;
pub mod operation;
pub mod pool;
pub mod time;

pub use awaitable::Awaitable;
pub use config::SchedulerConfig;
pub use error::RoutineError;
pub use id::{RoutineId, RoutineState};
pub use lifetime::{Lifetime, LifetimeSignal, ListenerKey};
pub use operation::AsyncOperation;
pub use pool::{Pool, PoolRegistry, PoolStats};
pub use time::{FrameClock, TickTime, TimeStep};
