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

//! The processor: one routine's execution state and the per-tick advance.
//!
//! Processors live in a slot arena owned by the scheduler. The arena's free
//! list is the processor pool: a finished processor bumps its generation,
//! drops every per-run field and goes back on the free list, so the next
//! `create` reuses the same slot without allocating.
//!
//! A slot whose generation reaches `u32::MAX` is retired for good instead of
//! wrapping, so a stale handle can never match a later run.

use crate::handle::Handle;
use crate::scheduler::Scheduler;
use crate::sequence::{RoutineContext, Sequence, Yielded};
use mroutine_core::{Awaitable, Lifetime, ListenerKey, RoutineError, RoutineId, RoutineState};
use std::mem;

/// The run state of a processor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessorState {
    Idle,
    Running,
    Stopping,
}

impl From<ProcessorState> for RoutineState {
    fn from(state: ProcessorState) -> Self {
        match state {
            ProcessorState::Idle => RoutineState::Idle,
            ProcessorState::Running => RoutineState::Running,
            ProcessorState::Stopping => RoutineState::Stopping,
        }
    }
}

/// A lifetime subscription that stops the routine when it fires.
pub(crate) struct Attachment {
    lifetime: Box<dyn Lifetime>,
    key: ListenerKey,
}

impl Attachment {
    pub(crate) fn new(lifetime: Box<dyn Lifetime>, key: ListenerKey) -> Self {
        Self { lifetime, key }
    }

    fn detach(self) {
        self.lifetime.remove_listener(self.key);
    }
}

/// The fields the advance loop works on. Taken out of the slot while the
/// routine is being advanced so user code can call back into the scheduler.
#[derive(Default)]
pub(crate) struct RunData {
    pub(crate) stack: Vec<Box<dyn Sequence>>,
    pub(crate) pending: Option<Box<dyn Awaitable>>,
    pub(crate) check: Option<Box<dyn FnMut() -> bool>>,
}

pub(crate) struct Processor {
    pub(crate) generation: u32,
    pub(crate) state: ProcessorState,
    /// Handed out by `create` and not yet finished.
    pub(crate) claimed: bool,
    /// The run data is out of the slot for an advance.
    pub(crate) busy: bool,
    /// Teardown has begun; the finish callbacks may be running.
    pub(crate) finishing: bool,
    /// The sequence given to `create`, moved onto the stack by `start`.
    pub(crate) entry: Option<Box<dyn Sequence>>,
    pub(crate) run: RunData,
    pub(crate) has_check: bool,
    pub(crate) attachment: Option<Attachment>,
    pub(crate) callbacks: Vec<Box<dyn FnOnce()>>,
}

impl Processor {
    fn new() -> Self {
        Self {
            generation: 0,
            state: ProcessorState::Idle,
            claimed: false,
            busy: false,
            finishing: false,
            entry: None,
            run: RunData::default(),
            has_check: false,
            attachment: None,
            callbacks: Vec::new(),
        }
    }
}

/// Everything a finished processor owned during its run.
struct Teardown {
    run: RunData,
    entry: Option<Box<dyn Sequence>>,
    attachment: Option<Attachment>,
    callbacks: Vec<Box<dyn FnOnce()>>,
}

impl Teardown {
    /// Drops what is left and detaches a lifetime attached late.
    fn release(self) {
        let Teardown {
            run,
            entry,
            attachment,
            callbacks,
        } = self;
        drop(run);
        drop(entry);
        drop(callbacks);
        if let Some(attachment) = attachment {
            attachment.detach();
        }
    }
}

/// The processor slots, their free list, and the driver subscription list.
pub(crate) struct ProcessorArena {
    processors: Vec<Processor>,
    free: Vec<u32>,
    active: Vec<u32>,
}

impl ProcessorArena {
    /// Creates an arena with `capacity` idle slots ready to be claimed.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            processors: (0..capacity).map(|_| Processor::new()).collect(),
            // Reversed so the lowest index is claimed first.
            free: (0..capacity as u32).rev().collect(),
            active: Vec::new(),
        }
    }

    /// Claims a slot from the free list, growing the arena if it is empty.
    pub(crate) fn claim(&mut self, entry: Box<dyn Sequence>) -> RoutineId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.processors.len() as u32;
                self.processors.push(Processor::new());
                log::trace!("Processor arena grew to {} slot(s).", self.processors.len());
                index
            }
        };

        let processor = &mut self.processors[index as usize];
        processor.claimed = true;
        processor.entry = Some(entry);
        RoutineId {
            index,
            generation: processor.generation,
        }
    }

    /// Returns the processor for `id` if that run is still current.
    pub(crate) fn get(&self, id: RoutineId) -> Option<&Processor> {
        self.processors
            .get(id.index as usize)
            .filter(|p| p.claimed && p.generation == id.generation)
    }

    /// Mutable counterpart of [`get`](ProcessorArena::get).
    pub(crate) fn get_mut(&mut self, id: RoutineId) -> Option<&mut Processor> {
        self.processors
            .get_mut(id.index as usize)
            .filter(|p| p.claimed && p.generation == id.generation)
    }

    /// Adds a slot to the end of the driver's subscription list.
    pub(crate) fn subscribe(&mut self, index: u32) {
        self.active.push(index);
    }

    /// The ids of every subscribed processor, in subscription order.
    pub(crate) fn active_ids(&self) -> Vec<RoutineId> {
        self.active
            .iter()
            .map(|&index| RoutineId {
                index,
                generation: self.processors[index as usize].generation,
            })
            .collect()
    }

    /// Ends the run of `id`: invalidates its handles, unsubscribes it and
    /// returns the slot to the free list. Whatever the run still owns is
    /// handed back so it can be dropped outside the arena borrow.
    fn retire(&mut self, id: RoutineId) -> Option<Teardown> {
        let processor = self.get_mut(id)?;
        let teardown = Teardown {
            run: mem::take(&mut processor.run),
            entry: processor.entry.take(),
            attachment: processor.attachment.take(),
            callbacks: mem::take(&mut processor.callbacks),
        };
        processor.state = ProcessorState::Idle;
        processor.claimed = false;
        processor.busy = false;
        processor.finishing = false;
        processor.has_check = false;
        self.active.retain(|&index| index != id.index);

        let processor = &mut self.processors[id.index as usize];
        match processor.generation.checked_add(1) {
            Some(generation) => {
                processor.generation = generation;
                self.free.push(id.index);
            }
            None => log::warn!(
                "Processor slot {} exhausted its generations and is retired.",
                id.index
            ),
        }
        Some(teardown)
    }

    /// The number of slots ever constructed.
    pub(crate) fn len(&self) -> usize {
        self.processors.len()
    }

    /// The number of subscribed processors.
    pub(crate) fn active_len(&self) -> usize {
        self.active.len()
    }
}

enum Step {
    Suspended,
    Over,
}

/// Runs one `Process` step for `id`, as the driver does every tick.
///
/// Stale ids and idle or already-busy processors are ignored. A usage error
/// raised while advancing tears the routine down before it is returned.
pub(crate) fn advance(scheduler: &Scheduler, id: RoutineId) -> Result<(), RoutineError> {
    let mut run = {
        let mut arena = scheduler.inner.arena.borrow_mut();
        let Some(processor) = arena.get_mut(id) else {
            return Ok(());
        };
        if processor.busy || processor.state == ProcessorState::Idle {
            return Ok(());
        }
        if processor.state == ProcessorState::Stopping {
            drop(arena);
            finish(scheduler, id, None);
            return Ok(());
        }
        processor.busy = true;
        mem::take(&mut processor.run)
    };

    match drive(scheduler, id, &mut run) {
        Ok(Step::Suspended) => {
            let mut arena = scheduler.inner.arena.borrow_mut();
            if let Some(processor) = arena.get_mut(id) {
                processor.busy = false;
                // A check installed while the routine was running stays.
                if run.check.is_none() {
                    run.check = processor.run.check.take();
                }
                processor.run = run;
            }
            Ok(())
        }
        Ok(Step::Over) => {
            finish(scheduler, id, Some(run));
            Ok(())
        }
        Err(e) => {
            log::error!("Routine {id} failed and was torn down: {e}");
            finish(scheduler, id, Some(run));
            Err(e)
        }
    }
}

fn drive(scheduler: &Scheduler, id: RoutineId, run: &mut RunData) -> Result<Step, RoutineError> {
    if let Some(check) = run.check.as_mut() {
        if !check() {
            log::debug!("Routine {id} stopped by its continuation check.");
            return Ok(Step::Over);
        }
    }

    let time = scheduler.time();
    if let Some(pending) = run.pending.as_mut() {
        if !pending.evaluate(&time) {
            return Ok(Step::Suspended);
        }
        if let Some(satisfied) = run.pending.take() {
            scheduler.dispose(satisfied);
        }
    }

    let handle = Handle::bound(scheduler, id);
    while run.pending.is_none() {
        let Some(top) = run.stack.last_mut() else {
            return Ok(Step::Over);
        };

        let cx = RoutineContext::new(scheduler, &handle, time);
        match top.resume(&cx) {
            None => {
                run.stack.pop();
                log::trace!("Routine {id} popped a sequence, depth {}.", run.stack.len());
            }
            Some(Yielded::Nested(child)) => {
                run.stack.push(child);
                log::trace!("Routine {id} pushed a sequence, depth {}.", run.stack.len());
            }
            Some(yielded) => run.pending = Some(scheduler.convert(yielded)?),
        }

        if scheduler.stop_requested(id) {
            return Ok(Step::Over);
        }
    }
    Ok(Step::Suspended)
}

/// Tears down the current run of `id` and fires its finish callbacks.
///
/// The pending wait, the check, the sequence stack and the lifetime are
/// released first. Callbacks then run while the slot is still claimed at the
/// run's generation, so the handle stays valid inside them. Only after the
/// last callback is the generation bumped and the slot freed.
pub(crate) fn finish(scheduler: &Scheduler, id: RoutineId, taken: Option<RunData>) {
    let (run, entry, attachment) = {
        let mut arena = scheduler.inner.arena.borrow_mut();
        let Some(processor) = arena.get_mut(id) else {
            return;
        };
        if processor.finishing {
            return;
        }
        processor.finishing = true;
        processor.busy = true;
        processor.state = ProcessorState::Stopping;
        (
            mem::take(&mut processor.run),
            processor.entry.take(),
            processor.attachment.take(),
        )
    };

    // While busy the slot holds an empty RunData and the live one is `taken`.
    for mut run in std::iter::once(run).chain(taken) {
        if let Some(pending) = run.pending.take() {
            scheduler.dispose(pending);
        }
        drop(run);
    }
    drop(entry);
    if let Some(attachment) = attachment {
        attachment.detach();
    }

    // Callbacks may register further callbacks; those fire in the same pass.
    loop {
        let callbacks = match scheduler.inner.arena.borrow_mut().get_mut(id) {
            Some(processor) => mem::take(&mut processor.callbacks),
            None => Vec::new(),
        };
        if callbacks.is_empty() {
            break;
        }
        for callback in callbacks {
            callback();
        }
    }

    let leftover = scheduler.inner.arena.borrow_mut().retire(id);
    if let Some(leftover) = leftover {
        leftover.release();
    }
    log::debug!("Routine {id} finished.");
}
