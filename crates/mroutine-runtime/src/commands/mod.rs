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

//! The built-in command library.
//!
//! Commands are the stock [`Awaitable`] variants. Each one is leased from the
//! scheduler's [`PoolRegistry`](mroutine_core::PoolRegistry) through the
//! factory methods below, configured for the call, and handed back to its
//! pool when the processor disposes it.

mod delay;
mod group;
mod operation;
mod predicate;
mod routine;

pub use delay::{WaitForFrames, WaitForSeconds};
pub use group::{WaitAll, WaitAny};
pub use operation::{WaitForOperation, WaitForTask};
pub use predicate::WaitPredicate;
pub use routine::WaitForRoutine;

use crate::handle::Handle;
use crate::scheduler::Scheduler;
use crate::sequence::{GroupMode, Yielded};
use mroutine_core::{AsyncOperation, Awaitable, RoutineError};
use tokio::task::JoinHandle;

impl Scheduler {
    /// Waits for `seconds` of scaled time.
    pub fn wait_seconds(&self, seconds: f32) -> Yielded {
        self.lease_seconds(seconds, false)
    }

    /// Waits for `seconds` of real time, ignoring the host's time scale.
    pub fn wait_seconds_realtime(&self, seconds: f32) -> Yielded {
        self.lease_seconds(seconds, true)
    }

    fn lease_seconds(&self, seconds: f32, realtime: bool) -> Yielded {
        let mut wait = self
            .inner
            .pools
            .borrow_mut()
            .lease_with::<WaitForSeconds>(WaitForSeconds::reset);
        wait.configure(seconds, realtime);
        Yielded::Await(wait)
    }

    /// Waits until `frames` more ticks have started.
    pub fn wait_frames(&self, frames: u64) -> Yielded {
        let mut wait = self
            .inner
            .pools
            .borrow_mut()
            .lease_with::<WaitForFrames>(WaitForFrames::reset);
        wait.configure(self.frame(), frames);
        Yielded::Await(wait)
    }

    /// Waits until `predicate` returns `true`.
    pub fn wait_until<F>(&self, predicate: F) -> Yielded
    where
        F: FnMut() -> bool + 'static,
    {
        self.lease_predicate(Box::new(predicate), true)
    }

    /// Waits while `predicate` keeps returning `true`.
    pub fn wait_while<F>(&self, predicate: F) -> Yielded
    where
        F: FnMut() -> bool + 'static,
    {
        self.lease_predicate(Box::new(predicate), false)
    }

    fn lease_predicate(&self, predicate: Box<dyn FnMut() -> bool>, target: bool) -> Yielded {
        let mut wait = self
            .inner
            .pools
            .borrow_mut()
            .lease_with::<WaitPredicate>(WaitPredicate::reset);
        wait.configure(predicate, target);
        Yielded::Await(wait)
    }

    /// Waits until the routine behind `handle` has finished.
    pub fn wait_routine(&self, handle: Handle) -> Yielded {
        Yielded::Await(self.lease_routine_wait(handle))
    }

    pub(crate) fn lease_routine_wait(&self, handle: Handle) -> Box<dyn Awaitable> {
        let mut wait = self
            .inner
            .pools
            .borrow_mut()
            .lease_with::<WaitForRoutine>(WaitForRoutine::reset);
        wait.configure(handle);
        wait
    }

    /// Waits until `operation` reports completion.
    pub fn wait_operation<O>(&self, operation: O) -> Yielded
    where
        O: AsyncOperation + 'static,
    {
        Yielded::Await(self.lease_operation_wait(Box::new(operation)))
    }

    pub(crate) fn lease_operation_wait(
        &self,
        operation: Box<dyn AsyncOperation>,
    ) -> Box<dyn Awaitable> {
        let mut wait = self
            .inner
            .pools
            .borrow_mut()
            .lease_with::<WaitForOperation>(WaitForOperation::reset);
        wait.configure(operation);
        wait
    }

    /// Waits until a tokio task has finished.
    pub fn wait_task<T: 'static>(&self, task: JoinHandle<T>) -> Yielded {
        let mut wait = self
            .inner
            .pools
            .borrow_mut()
            .lease_with::<WaitForTask<T>>(WaitForTask::reset);
        wait.configure(task);
        Yielded::Await(wait)
    }

    /// Waits until every member is satisfied on the same tick.
    ///
    /// Members go through the same conversion as a plain yield when the
    /// group is yielded, so handles and operation values are accepted
    /// alongside awaitables. A member that cannot be converted fails the
    /// routine with [`RoutineError::NestedSequenceInGroup`] or
    /// [`RoutineError::UnsupportedYield`].
    pub fn wait_all<I>(&self, members: I) -> Yielded
    where
        I: IntoIterator<Item = Yielded>,
    {
        Yielded::Group {
            mode: GroupMode::All,
            members: members.into_iter().collect(),
        }
    }

    /// Waits until at least one member is satisfied. Members are resolved
    /// the same way as for [`wait_all`](Scheduler::wait_all).
    pub fn wait_any<I>(&self, members: I) -> Yielded
    where
        I: IntoIterator<Item = Yielded>,
    {
        Yielded::Group {
            mode: GroupMode::Any,
            members: members.into_iter().collect(),
        }
    }

    /// Converts every member and leases the matching group command. Members
    /// already converted are disposed if a later one fails.
    pub(crate) fn lease_group(
        &self,
        mode: GroupMode,
        members: Vec<Yielded>,
    ) -> Result<Box<dyn Awaitable>, RoutineError> {
        let mut converted = Vec::with_capacity(members.len());
        for member in members {
            match self.convert(member) {
                Ok(awaitable) => converted.push(awaitable),
                Err(e) => {
                    for awaitable in converted {
                        self.dispose(awaitable);
                    }
                    return Err(e);
                }
            }
        }

        let mut pools = self.inner.pools.borrow_mut();
        let group: Box<dyn Awaitable> = match mode {
            GroupMode::All => {
                let mut wait = pools.lease_with::<WaitAll>(WaitAll::reset);
                wait.configure(converted);
                wait
            }
            GroupMode::Any => {
                let mut wait = pools.lease_with::<WaitAny>(WaitAny::reset);
                wait.configure(converted);
                wait
            }
        };
        Ok(group)
    }
}
