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

//! Ordered dispatch table turning yielded values into awaitables.
//!
//! Resolution order: an awaitable is used as-is, a nested sequence is pushed
//! by the processor before it ever gets here, a group resolves each member
//! the same way, and any other value is looked up by its [`TypeId`] in
//! registration order. Anything left over is an
//! [`RoutineError::UnsupportedYield`].

use crate::handle::Handle;
use crate::scheduler::Scheduler;
use crate::sequence::Yielded;
use mroutine_core::{AsyncOperation, Awaitable, RoutineError};
use std::any::{Any, TypeId};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type ConvertFn = dyn Fn(Box<dyn Any>, &Scheduler) -> Option<Box<dyn Awaitable>>;

struct Conversion {
    type_id: TypeId,
    type_name: &'static str,
    convert: Rc<ConvertFn>,
}

/// The registered conversions, in the order they were added.
pub(crate) struct ConverterTable {
    entries: Vec<Conversion>,
}

impl ConverterTable {
    /// A table holding the built-in conversions for handles and operation flags.
    pub(crate) fn with_defaults() -> Self {
        let mut table = Self {
            entries: Vec::new(),
        };
        table.register(|handle: Handle, scheduler: &Scheduler| scheduler.lease_routine_wait(handle));
        table.register(|flag: Arc<AtomicBool>, scheduler: &Scheduler| {
            scheduler.lease_operation_wait(Box::new(flag))
        });
        table.register(|flag: Rc<Cell<bool>>, scheduler: &Scheduler| {
            scheduler.lease_operation_wait(Box::new(flag))
        });
        table.register(|operation: Box<dyn AsyncOperation>, scheduler: &Scheduler| {
            scheduler.lease_operation_wait(operation)
        });
        table
    }

    /// Adds a conversion for `T`. Registering `T` again replaces the earlier
    /// entry but keeps its position.
    pub(crate) fn register<T, F>(&mut self, convert: F)
    where
        T: Any,
        F: Fn(T, &Scheduler) -> Box<dyn Awaitable> + 'static,
    {
        let convert: Rc<ConvertFn> = Rc::new(move |value: Box<dyn Any>, scheduler: &Scheduler| {
            value
                .downcast::<T>()
                .ok()
                .map(|value| convert(*value, scheduler))
        });
        let type_id = TypeId::of::<T>();

        match self.entries.iter_mut().find(|entry| entry.type_id == type_id) {
            Some(entry) => entry.convert = convert,
            None => self.entries.push(Conversion {
                type_id,
                type_name: std::any::type_name::<T>(),
                convert,
            }),
        }
        log::trace!("Registered yield conversion for '{}'.", std::any::type_name::<T>());
    }

    fn lookup(&self, type_id: TypeId) -> Option<Rc<ConvertFn>> {
        self.entries
            .iter()
            .find(|entry| entry.type_id == type_id)
            .map(|entry| entry.convert.clone())
    }

    /// The type names of every registered conversion, in dispatch order.
    pub(crate) fn type_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.type_name).collect()
    }
}

impl Scheduler {
    /// Resolves a yielded value to the awaitable the processor should wait on.
    ///
    /// ## Errors
    /// [`RoutineError::NestedSequenceInGroup`] for a nested sequence, and
    /// [`RoutineError::UnsupportedYield`] for a value with no conversion.
    pub(crate) fn convert(&self, yielded: Yielded) -> Result<Box<dyn Awaitable>, RoutineError> {
        match yielded {
            Yielded::Await(awaitable) => Ok(awaitable),
            Yielded::Nested(_) => Err(RoutineError::NestedSequenceInGroup),
            Yielded::Group { mode, members } => self.lease_group(mode, members),
            Yielded::Value(value) => {
                let type_name = value.type_name();
                // Clone the entry out so the table is not borrowed while the
                // conversion leases from the pools.
                let convert = self.inner.converters.borrow().lookup(value.type_id());
                convert
                    .and_then(|convert| convert(value.into_inner(), self))
                    .ok_or(RoutineError::UnsupportedYield { type_name })
            }
        }
    }
}
