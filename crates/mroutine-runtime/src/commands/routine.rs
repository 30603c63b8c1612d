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

//! Waiting on another routine.

use crate::handle::Handle;
use mroutine_core::{Awaitable, PoolRegistry, TickTime};

/// Satisfied once the referenced routine's run is over, i.e. its handle no
/// longer matches the processor's generation.
#[derive(Debug, Default)]
pub struct WaitForRoutine {
    handle: Handle,
}

impl WaitForRoutine {
    pub(crate) fn configure(&mut self, handle: Handle) {
        self.handle = handle;
    }

    pub(crate) fn reset(&mut self) {
        self.handle = Handle::default();
    }
}

impl Awaitable for WaitForRoutine {
    fn evaluate(&mut self, _time: &TickTime) -> bool {
        !self.handle.is_valid()
    }

    fn dispose(self: Box<Self>, pools: &mut PoolRegistry) {
        pools.release(self);
    }
}
