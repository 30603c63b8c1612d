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

//! The minimal suspension primitive every routine waits on.

use crate::pool::PoolRegistry;
use crate::time::TickTime;

/// A condition that becomes true at some later tick.
///
/// A processor holds at most one pending `Awaitable`. It calls
/// [`evaluate`](Awaitable::evaluate) once per tick until it returns `true`,
/// then calls [`dispose`](Awaitable::dispose) before installing anything else.
///
/// Implementations that are leased from a [`PoolRegistry`] must clear every
/// field that may hold external state (closures, handles, tasks) before
/// handing themselves back, since the same box is reused by an unrelated
/// routine afterwards. That state goes to
/// [`PoolRegistry::defer_drop`] rather than being dropped in place: `dispose`
/// runs while the registry is borrowed, and user values may lease from it
/// when dropped.
pub trait Awaitable: 'static {
    /// Advances the internal state by one tick and reports whether the
    /// condition is now satisfied.
    ///
    /// ## Arguments
    /// * `time` - The frame counter and deltas of the tick being processed.
    ///
    /// ## Returns
    /// `true` exactly when the suspension is over.
    fn evaluate(&mut self, time: &TickTime) -> bool;

    /// Releases held references and returns the instance to its pool.
    ///
    /// The default hands the box to the registry's deferred drops, which is
    /// what non-pooled, user-defined awaitables want.
    fn dispose(self: Box<Self>, pools: &mut PoolRegistry) {
        pools.defer_drop(self);
    }
}
