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

//! The runtime driver.
//!
//! A [`Scheduler`] owns the processor arena, the command pools and the yield
//! conversion table. The host calls [`Scheduler::tick`] once per frame; every
//! running processor is advanced once, in the order it was started.
//!
//! The scheduler is an explicit instance rather than a process-wide global.
//! Clones share the same state, which makes it cheap to hand to routines or
//! host systems. It is single-threaded by construction (`!Send`).

use crate::convert::ConverterTable;
use crate::handle::Handle;
use crate::processor::{self, ProcessorArena, ProcessorState};
use crate::sequence::Sequence;
use mroutine_core::{
    Awaitable, PoolRegistry, PoolStats, RoutineError, RoutineId, SchedulerConfig, TickTime,
    TimeStep,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

pub(crate) struct SchedulerInner {
    pub(crate) arena: RefCell<ProcessorArena>,
    pub(crate) pools: RefCell<PoolRegistry>,
    pub(crate) converters: RefCell<ConverterTable>,
    pub(crate) time: Cell<TickTime>,
    pub(crate) ticking: Cell<bool>,
    pub(crate) config: SchedulerConfig,
}

/// A frame-driven cooperative scheduler.
///
/// # Example
///
/// ```rust
/// use mroutine_runtime::{sequence, Scheduler, SchedulerConfig, TimeStep};
///
/// let scheduler = Scheduler::new(SchedulerConfig::default());
/// let mut remaining = 3;
/// let handle = scheduler.create(sequence::from_fn(move |cx| {
///     if remaining == 0 {
///         return None;
///     }
///     remaining -= 1;
///     Some(cx.scheduler().wait_frames(1))
/// }));
/// handle.start().unwrap();
///
/// while handle.is_valid() {
///     scheduler.tick(TimeStep::fixed(1.0 / 60.0)).unwrap();
/// }
/// assert_eq!(scheduler.frame(), 3);
/// ```
#[derive(Clone)]
pub struct Scheduler {
    pub(crate) inner: Rc<SchedulerInner>,
}

/// Clears the re-entrancy flag even if a routine panics mid-tick.
struct TickGuard<'a>(&'a Cell<bool>);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Scheduler {
    /// Creates a scheduler with `config.initial_capacity` idle processors.
    pub fn new(config: SchedulerConfig) -> Self {
        let mut pools = PoolRegistry::new();
        pools.set_warn_on_missing_reset(config.warn_on_missing_reset);

        log::debug!(
            "Scheduler initialized with {} processor slot(s).",
            config.initial_capacity
        );
        Self {
            inner: Rc::new(SchedulerInner {
                arena: RefCell::new(ProcessorArena::with_capacity(config.initial_capacity)),
                pools: RefCell::new(pools),
                converters: RefCell::new(ConverterTable::with_defaults()),
                time: Cell::new(TickTime::default()),
                ticking: Cell::new(false),
                config,
            }),
        }
    }

    /// Wraps `sequence` in a processor and returns its handle.
    ///
    /// The routine is idle until [`Handle::start`] is called, which leaves
    /// room to configure it with `attach`, `check` and `callback` first.
    pub fn create<S: Sequence + 'static>(&self, sequence: S) -> Handle {
        self.create_boxed(Box::new(sequence))
    }

    /// Same as [`create`](Scheduler::create) for an already boxed sequence.
    pub fn create_boxed(&self, sequence: Box<dyn Sequence>) -> Handle {
        let id = self.inner.arena.borrow_mut().claim(sequence);
        log::trace!("Routine {id} created.");
        Handle::bound(self, id)
    }

    /// Creates and immediately starts a routine.
    ///
    /// ## Errors
    /// Any error raised by the routine's first advance.
    pub fn run<S: Sequence + 'static>(&self, sequence: S) -> Result<Handle, RoutineError> {
        let handle = self.create(sequence);
        handle.start()?;
        Ok(handle)
    }

    /// Advances every running routine by one tick.
    ///
    /// The frame counter is incremented first, then each processor that was
    /// subscribed when the tick began is processed in subscription order.
    /// Routines started during the tick had their first advance in `start`
    /// and join the driver from the next tick on.
    ///
    /// ## Errors
    /// [`RoutineError::ReentrantTick`] if called from inside a routine.
    /// Otherwise, the first usage error raised by a routine this tick; the
    /// failing routine is torn down and the others still run.
    pub fn tick(&self, step: TimeStep) -> Result<(), RoutineError> {
        if self.inner.ticking.replace(true) {
            return Err(RoutineError::ReentrantTick);
        }
        let _guard = TickGuard(&self.inner.ticking);

        let frame = self.inner.time.get().frame + 1;
        self.inner.time.set(TickTime::from_step(frame, step));

        let subscribers = self.inner.arena.borrow().active_ids();
        log::trace!("Tick {frame}: {} active routine(s).", subscribers.len());

        let mut first_error = None;
        for id in subscribers {
            if let Err(e) = processor::advance(self, id) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// The current global frame. Zero until the first tick.
    pub fn frame(&self) -> u64 {
        self.inner.time.get().frame
    }

    /// The time view of the most recent tick.
    pub fn time(&self) -> TickTime {
        self.inner.time.get()
    }

    /// The configuration this scheduler was built with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Requests a stop on every running routine.
    ///
    /// ## Returns
    /// The number of routines that accepted the request.
    pub fn stop_all(&self) -> usize {
        let subscribers = self.inner.arena.borrow().active_ids();
        subscribers
            .into_iter()
            .filter(|&id| self.stop_routine(id))
            .count()
    }

    /// The number of processor slots ever constructed, pooled or in use.
    pub fn allocated_processors(&self) -> usize {
        self.inner.arena.borrow().len()
    }

    /// The number of routines currently subscribed to the tick.
    pub fn active_count(&self) -> usize {
        self.inner.arena.borrow().active_len()
    }

    /// Pool counters for the command or pooled type `T`.
    pub fn pool_stats<T: Default + 'static>(&self) -> PoolStats {
        self.inner.pools.borrow().stats::<T>()
    }

    /// Registers a conversion so sequences can yield values of type `T`
    /// directly. Conversions are tried in registration order after the
    /// built-in ones; registering `T` again replaces the earlier entry.
    pub fn register_conversion<T, F>(&self, convert: F)
    where
        T: Any,
        F: Fn(T, &Scheduler) -> Box<dyn Awaitable> + 'static,
    {
        self.inner.converters.borrow_mut().register(convert);
    }

    /// The type names accepted by the conversion table, in dispatch order.
    pub fn conversions(&self) -> Vec<&'static str> {
        self.inner.converters.borrow().type_names()
    }

    pub(crate) fn start_routine(&self, id: RoutineId) -> Result<(), RoutineError> {
        {
            let mut arena = self.inner.arena.borrow_mut();
            let processor = arena.get_mut(id).ok_or(RoutineError::InvalidHandle)?;
            if processor.state != ProcessorState::Idle {
                return Err(RoutineError::AlreadyStarted { id });
            }
            let entry = processor
                .entry
                .take()
                .ok_or(RoutineError::AlreadyStarted { id })?;
            processor.run.stack.push(entry);
            processor.state = ProcessorState::Running;
            arena.subscribe(id.index);
        }

        log::debug!("Routine {id} started.");
        processor::advance(self, id)
    }

    /// Requests a stop. Idle routines that were never started finish on the
    /// spot; running ones finish on their next advance.
    pub(crate) fn stop_routine(&self, id: RoutineId) -> bool {
        let state = {
            let mut arena = self.inner.arena.borrow_mut();
            let Some(processor) = arena.get_mut(id) else {
                return false;
            };
            let state = processor.state;
            if state == ProcessorState::Running {
                processor.state = ProcessorState::Stopping;
            }
            state
        };

        match state {
            ProcessorState::Running => {
                log::debug!("Routine {id} stop requested.");
                true
            }
            ProcessorState::Idle => {
                processor::finish(self, id, None);
                true
            }
            ProcessorState::Stopping => false,
        }
    }

    pub(crate) fn stop_requested(&self, id: RoutineId) -> bool {
        self.inner
            .arena
            .borrow()
            .get(id)
            .map_or(true, |p| p.state == ProcessorState::Stopping)
    }

    /// Returns `awaitable` to its pool, then drops whatever user state it
    /// parked once the pools are no longer borrowed.
    pub(crate) fn dispose(&self, awaitable: Box<dyn Awaitable>) {
        let deferred = {
            let mut pools = self.inner.pools.borrow_mut();
            awaitable.dispose(&mut pools);
            pools.take_deferred()
        };
        drop(deferred);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("frame", &self.frame())
            .field("allocated_processors", &self.allocated_processors())
            .field("active", &self.active_count())
            .finish()
    }
}
