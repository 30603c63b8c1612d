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

//! Predicate-driven waits.

use mroutine_core::{Awaitable, PoolRegistry, TickTime};

/// Satisfied when a predicate returns the target value.
///
/// `wait_until` targets `true`, `wait_while` targets `false`. The predicate
/// is parked in the registry's deferred drops on dispose, so captured state
/// does not outlive the wait and is never dropped inside the pool borrow.
pub struct WaitPredicate {
    predicate: Option<Box<dyn FnMut() -> bool>>,
    target: bool,
}

impl Default for WaitPredicate {
    fn default() -> Self {
        Self {
            predicate: None,
            target: true,
        }
    }
}

impl WaitPredicate {
    pub(crate) fn configure(&mut self, predicate: Box<dyn FnMut() -> bool>, target: bool) {
        self.predicate = Some(predicate);
        self.target = target;
    }

    pub(crate) fn reset(&mut self) {
        self.predicate = None;
        self.target = true;
    }
}

impl Awaitable for WaitPredicate {
    fn evaluate(&mut self, _time: &TickTime) -> bool {
        match self.predicate.as_mut() {
            Some(predicate) => predicate() == self.target,
            None => true,
        }
    }

    fn dispose(mut self: Box<Self>, pools: &mut PoolRegistry) {
        if let Some(predicate) = self.predicate.take() {
            pools.defer_drop(predicate);
        }
        pools.release(self);
    }
}
