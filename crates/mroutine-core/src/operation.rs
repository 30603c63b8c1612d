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

//! Adapter contract for asynchronous work that lives outside the scheduler.
//!
//! The scheduler never blocks on external work; it polls
//! [`AsyncOperation::is_done`] once per tick from the wait-on-operation
//! command. Hosts implement the trait for their own primitives, and a few
//! common ones are covered here.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Anything that can report whether it has finished.
pub trait AsyncOperation {
    /// Returns `true` once the operation has completed, successfully or not.
    fn is_done(&self) -> bool;
}

impl AsyncOperation for Arc<AtomicBool> {
    fn is_done(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

impl AsyncOperation for Rc<Cell<bool>> {
    fn is_done(&self) -> bool {
        self.get()
    }
}

/// A receiver is done once a message is waiting or every sender has gone away.
impl<T> AsyncOperation for flume::Receiver<T> {
    fn is_done(&self) -> bool {
        !self.is_empty() || self.is_disconnected()
    }
}

impl<T> AsyncOperation for tokio::task::JoinHandle<T> {
    fn is_done(&self) -> bool {
        self.is_finished()
    }
}

impl AsyncOperation for Box<dyn AsyncOperation> {
    fn is_done(&self) -> bool {
        self.as_ref().is_done()
    }
}
