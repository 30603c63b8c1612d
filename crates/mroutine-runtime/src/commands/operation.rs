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

//! Waits bridging to asynchronous work outside the scheduler.

use mroutine_core::{AsyncOperation, Awaitable, PoolRegistry, TickTime};
use tokio::task::JoinHandle;

/// Satisfied once the wrapped [`AsyncOperation`] reports completion.
#[derive(Default)]
pub struct WaitForOperation {
    operation: Option<Box<dyn AsyncOperation>>,
}

impl WaitForOperation {
    pub(crate) fn configure(&mut self, operation: Box<dyn AsyncOperation>) {
        self.operation = Some(operation);
    }

    pub(crate) fn reset(&mut self) {
        self.operation = None;
    }
}

impl Awaitable for WaitForOperation {
    fn evaluate(&mut self, _time: &TickTime) -> bool {
        self.operation
            .as_ref()
            .map_or(true, |operation| operation.is_done())
    }

    fn dispose(mut self: Box<Self>, pools: &mut PoolRegistry) {
        if let Some(operation) = self.operation.take() {
            pools.defer_drop(operation);
        }
        pools.release(self);
    }
}

/// Satisfied once a tokio task has finished.
///
/// The task's output is discarded; the [`JoinHandle`] is dropped on dispose,
/// which detaches rather than aborts the task.
pub struct WaitForTask<T> {
    task: Option<JoinHandle<T>>,
}

impl<T> Default for WaitForTask<T> {
    fn default() -> Self {
        Self { task: None }
    }
}

impl<T> WaitForTask<T> {
    pub(crate) fn configure(&mut self, task: JoinHandle<T>) {
        self.task = Some(task);
    }

    pub(crate) fn reset(&mut self) {
        self.task = None;
    }
}

impl<T: 'static> Awaitable for WaitForTask<T> {
    fn evaluate(&mut self, _time: &TickTime) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    fn dispose(mut self: Box<Self>, pools: &mut PoolRegistry) {
        if let Some(task) = self.task.take() {
            pools.defer_drop(task);
        }
        pools.release(self);
    }
}
