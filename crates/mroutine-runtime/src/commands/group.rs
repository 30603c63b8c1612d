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

//! Composite waits over several awaitables.
//!
//! Both groups evaluate every member on every call. Members such as timed
//! waits advance their own state inside `evaluate`, so skipping one after an
//! earlier member already decided the outcome would stall it.

use mroutine_core::{Awaitable, PoolRegistry, TickTime};

/// Satisfied when every member reports satisfied on the same evaluation.
#[derive(Default)]
pub struct WaitAll {
    members: Vec<Box<dyn Awaitable>>,
}

/// Satisfied when at least one member reports satisfied.
#[derive(Default)]
pub struct WaitAny {
    members: Vec<Box<dyn Awaitable>>,
}

fn dispose_members(members: &mut Vec<Box<dyn Awaitable>>, pools: &mut PoolRegistry) {
    for member in members.drain(..) {
        member.dispose(pools);
    }
}

impl WaitAll {
    pub(crate) fn configure(&mut self, members: Vec<Box<dyn Awaitable>>) {
        self.members = members;
    }

    pub(crate) fn reset(&mut self) {
        self.members.clear();
    }

    /// The number of grouped awaitables.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` for an empty group, which is satisfied immediately.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Awaitable for WaitAll {
    fn evaluate(&mut self, time: &TickTime) -> bool {
        let mut all = true;
        for member in &mut self.members {
            all = member.evaluate(time) && all;
        }
        all
    }

    fn dispose(mut self: Box<Self>, pools: &mut PoolRegistry) {
        dispose_members(&mut self.members, pools);
        pools.release(self);
    }
}

impl WaitAny {
    pub(crate) fn configure(&mut self, members: Vec<Box<dyn Awaitable>>) {
        self.members = members;
    }

    pub(crate) fn reset(&mut self) {
        self.members.clear();
    }

    /// The number of grouped awaitables.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` for an empty group, which is satisfied immediately.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Awaitable for WaitAny {
    fn evaluate(&mut self, time: &TickTime) -> bool {
        let mut any = self.members.is_empty();
        for member in &mut self.members {
            any = member.evaluate(time) || any;
        }
        any
    }

    fn dispose(mut self: Box<Self>, pools: &mut PoolRegistry) {
        dispose_members(&mut self.members, pools);
        pools.release(self);
    }
}
