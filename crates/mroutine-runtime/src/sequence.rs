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

//! Resumable computations and the values they yield.
//!
//! A [`Sequence`] is advanced one step at a time by its processor. Each step
//! returns a [`Yielded`] value describing why the routine wants to suspend,
//! or `None` once the sequence is exhausted. Yielding
//! [`Yielded::Nested`] pushes a sub-sequence that runs to completion before
//! the parent is resumed again.

use crate::handle::Handle;
use crate::scheduler::Scheduler;
use mroutine_core::{Awaitable, TickTime};
use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::fmt;

/// A stepwise computation driven by a processor.
pub trait Sequence {
    /// Runs the sequence up to its next suspension point.
    ///
    /// ## Returns
    /// `Some` with the reason to suspend, or `None` when the sequence is done.
    fn resume(&mut self, cx: &RoutineContext<'_>) -> Option<Yielded>;
}

/// What a sequence sees while it is being resumed.
pub struct RoutineContext<'a> {
    scheduler: &'a Scheduler,
    handle: &'a Handle,
    time: TickTime,
}

impl<'a> RoutineContext<'a> {
    pub(crate) fn new(scheduler: &'a Scheduler, handle: &'a Handle, time: TickTime) -> Self {
        Self {
            scheduler,
            handle,
            time,
        }
    }

    /// The scheduler running this routine. Use it to lease commands or start
    /// other routines.
    pub fn scheduler(&self) -> &'a Scheduler {
        self.scheduler
    }

    /// A handle to the routine being resumed.
    pub fn handle(&self) -> &'a Handle {
        self.handle
    }

    /// The time view of the current tick.
    pub fn time(&self) -> TickTime {
        self.time
    }

    /// The current global frame.
    pub fn frame(&self) -> u64 {
        self.time.frame
    }
}

/// An arbitrary value yielded by a sequence, resolved through the
/// scheduler's conversion table.
pub struct YieldValue {
    value: Box<dyn Any>,
    type_id: TypeId,
    type_name: &'static str,
}

impl YieldValue {
    /// Wraps a value, remembering its concrete type for dispatch.
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The name of the wrapped type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The [`TypeId`] of the wrapped type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn into_inner(self) -> Box<dyn Any> {
        self.value
    }
}

impl fmt::Debug for YieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YieldValue")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// How a [`Yielded::Group`] combines its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    /// Satisfied when every member is satisfied on the same tick.
    All,
    /// Satisfied when at least one member is.
    Any,
}

/// The reason a sequence suspended.
pub enum Yielded {
    /// Wait until the awaitable is satisfied.
    Await(Box<dyn Awaitable>),
    /// Run the sub-sequence to completion, then resume the parent.
    Nested(Box<dyn Sequence>),
    /// Any other value; converted to an awaitable by type, or rejected.
    Value(YieldValue),
    /// Wait on several members at once. Members are resolved when the group
    /// is yielded, so a member that cannot become an awaitable fails the
    /// routine like any other unsupported yield.
    Group {
        /// All or any.
        mode: GroupMode,
        /// The unresolved members.
        members: Vec<Yielded>,
    },
}

impl Yielded {
    /// Yields a custom awaitable.
    pub fn awaiting<A: Awaitable + 'static>(awaitable: A) -> Self {
        Self::Await(Box::new(awaitable))
    }

    /// Yields a nested sub-sequence.
    pub fn nested<S: Sequence + 'static>(sequence: S) -> Self {
        Self::Nested(Box::new(sequence))
    }

    /// Yields an arbitrary value to be resolved through the conversion table.
    pub fn value<T: Any>(value: T) -> Self {
        Self::Value(YieldValue::new(value))
    }
}

impl From<Box<dyn Awaitable>> for Yielded {
    fn from(awaitable: Box<dyn Awaitable>) -> Self {
        Self::Await(awaitable)
    }
}

impl From<Box<dyn Sequence>> for Yielded {
    fn from(sequence: Box<dyn Sequence>) -> Self {
        Self::Nested(sequence)
    }
}

/// Waiting on a handle resumes once that routine has finished.
impl From<Handle> for Yielded {
    fn from(handle: Handle) -> Self {
        Self::value(handle)
    }
}

impl fmt::Debug for Yielded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Yielded::Await(_) => write!(f, "Yielded::Await(..)"),
            Yielded::Nested(_) => write!(f, "Yielded::Nested(..)"),
            Yielded::Value(value) => write!(f, "Yielded::Value({})", value.type_name()),
            Yielded::Group { mode, members } => f
                .debug_struct("Yielded::Group")
                .field("mode", mode)
                .field("members", members)
                .finish(),
        }
    }
}

/// A sequence driven by a closure. Returning `None` ends it.
pub struct FnSequence<F> {
    step: F,
}

impl<F> Sequence for FnSequence<F>
where
    F: FnMut(&RoutineContext<'_>) -> Option<Yielded>,
{
    fn resume(&mut self, cx: &RoutineContext<'_>) -> Option<Yielded> {
        (self.step)(cx)
    }
}

/// Creates a sequence that calls `step` on every resumption.
pub fn from_fn<F>(step: F) -> FnSequence<F>
where
    F: FnMut(&RoutineContext<'_>) -> Option<Yielded>,
{
    FnSequence { step }
}

/// A sequence that yields the items of an iterator in order.
pub struct IterSequence<I> {
    items: I,
}

impl<I: Iterator<Item = Yielded>> Sequence for IterSequence<I> {
    fn resume(&mut self, _cx: &RoutineContext<'_>) -> Option<Yielded> {
        self.items.next()
    }
}

/// Creates a sequence from anything iterable over [`Yielded`].
///
/// Items are pulled lazily, one per resumption.
pub fn from_iter<I>(items: I) -> IterSequence<I::IntoIter>
where
    I: IntoIterator<Item = Yielded>,
{
    IterSequence {
        items: items.into_iter(),
    }
}

type Step = Box<dyn FnOnce(&RoutineContext<'_>) -> Option<Yielded>>;

/// An ordered list of one-shot steps.
///
/// Each resumption runs steps until one of them yields; steps returning
/// `None` complete without suspending. This mirrors straight-line code with
/// occasional yield points.
#[derive(Default)]
pub struct Script {
    steps: VecDeque<Step>,
}

impl Script {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
        }
    }

    /// Appends a step.
    pub fn step<F>(mut self, step: F) -> Self
    where
        F: FnOnce(&RoutineContext<'_>) -> Option<Yielded> + 'static,
    {
        self.steps.push_back(Box::new(step));
        self
    }

    /// Returns the number of steps that have not run yet.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` once every step has run.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Sequence for Script {
    fn resume(&mut self, cx: &RoutineContext<'_>) -> Option<Yielded> {
        while let Some(step) = self.steps.pop_front() {
            if let Some(yielded) = step(cx) {
                return Some(yielded);
            }
        }
        None
    }
}
