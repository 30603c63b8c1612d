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

//! Versioned references to routine runs.
//!
//! A [`Handle`] records the processor slot and the generation it was issued
//! for. Once the run finishes the slot's generation moves on, so every copy
//! of the handle becomes invalid even if the slot is immediately reused.

use crate::processor::Attachment;
use crate::scheduler::{Scheduler, SchedulerInner};
use mroutine_core::{Lifetime, RoutineError, RoutineId, RoutineState};
use std::fmt;
use std::rc::{Rc, Weak};

/// A cheap, copyable reference to one run of a routine.
///
/// The default handle refers to nothing and reports
/// [`RoutineState::Unassigned`].
#[derive(Clone, Default)]
pub struct Handle {
    id: Option<RoutineId>,
    scheduler: Weak<SchedulerInner>,
}

impl Handle {
    pub(crate) fn bound(scheduler: &Scheduler, id: RoutineId) -> Self {
        Self {
            id: Some(id),
            scheduler: Rc::downgrade(&scheduler.inner),
        }
    }

    fn scheduler(&self) -> Option<(Scheduler, RoutineId)> {
        let id = self.id?;
        let inner = self.scheduler.upgrade()?;
        Some((Scheduler { inner }, id))
    }

    /// The slot and generation this handle was issued for.
    pub fn id(&self) -> Option<RoutineId> {
        self.id
    }

    /// Returns `true` while the run this handle refers to has not finished.
    pub fn is_valid(&self) -> bool {
        self.scheduler()
            .is_some_and(|(scheduler, id)| scheduler.inner.arena.borrow().get(id).is_some())
    }

    /// The observable state of the run.
    pub fn state(&self) -> RoutineState {
        if self.id.is_none() {
            return RoutineState::Unassigned;
        }
        self.scheduler()
            .and_then(|(scheduler, id)| {
                let arena = scheduler.inner.arena.borrow();
                arena.get(id).map(|processor| processor.state.into())
            })
            .unwrap_or(RoutineState::Complete)
    }

    /// Begins executing the routine. Its first advance runs synchronously,
    /// so a routine that never waits is already complete on return.
    ///
    /// ## Errors
    /// - [`RoutineError::InvalidHandle`] if the run is over or never existed.
    /// - [`RoutineError::AlreadyStarted`] if `start` was already called.
    /// - Any usage error raised by the first advance.
    pub fn start(&self) -> Result<&Self, RoutineError> {
        let (scheduler, id) = self.scheduler().ok_or(RoutineError::InvalidHandle)?;
        scheduler.start_routine(id)?;
        Ok(self)
    }

    /// Requests the routine to stop.
    ///
    /// ## Returns
    /// `true` if the request was accepted. A stop on a routine already
    /// stopping, or on an invalid handle, returns `false`.
    pub fn stop(&self) -> bool {
        self.scheduler()
            .is_some_and(|(scheduler, id)| scheduler.stop_routine(id))
    }

    /// Ties the routine to an external lifetime: when `lifetime` deactivates,
    /// the routine is stopped. A lifetime that is already inactive stops the
    /// routine right away.
    ///
    /// ## Errors
    /// - [`RoutineError::InvalidHandle`] if the run is over.
    /// - [`RoutineError::AlreadyAttached`] if a lifetime is already attached.
    pub fn attach<L: Lifetime + 'static>(&self, lifetime: L) -> Result<&Self, RoutineError> {
        let (scheduler, id) = self.scheduler().ok_or(RoutineError::InvalidHandle)?;
        {
            let arena = scheduler.inner.arena.borrow();
            let processor = arena.get(id).ok_or(RoutineError::InvalidHandle)?;
            if processor.attachment.is_some() {
                return Err(RoutineError::AlreadyAttached { id });
            }
        }

        if !lifetime.is_active() {
            log::debug!("Routine {id} attached to an inactive lifetime, stopping.");
            scheduler.stop_routine(id);
            return Ok(self);
        }

        let weak = Rc::downgrade(&scheduler.inner);
        let key = lifetime.on_deactivate(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                log::debug!("Lifetime of routine {id} ended.");
                Scheduler { inner }.stop_routine(id);
            }
        }));

        let mut arena = scheduler.inner.arena.borrow_mut();
        if let Some(processor) = arena.get_mut(id) {
            processor.attachment = Some(Attachment::new(Box::new(lifetime), key));
            return Ok(self);
        }
        drop(arena);
        lifetime.remove_listener(key);
        Ok(self)
    }

    /// Installs a continuation check evaluated at the start of every advance.
    /// The first time it returns `false` the routine finishes.
    ///
    /// ## Errors
    /// - [`RoutineError::InvalidHandle`] if the run is over.
    /// - [`RoutineError::CheckAlreadyInstalled`] if a check is already set.
    pub fn check<F>(&self, check: F) -> Result<&Self, RoutineError>
    where
        F: FnMut() -> bool + 'static,
    {
        let (scheduler, id) = self.scheduler().ok_or(RoutineError::InvalidHandle)?;
        let mut arena = scheduler.inner.arena.borrow_mut();
        let processor = arena.get_mut(id).ok_or(RoutineError::InvalidHandle)?;
        if processor.has_check {
            return Err(RoutineError::CheckAlreadyInstalled { id });
        }
        processor.has_check = true;
        processor.run.check = Some(Box::new(check));
        Ok(self)
    }

    /// Adds a callback fired once when the run finishes, for any reason.
    /// Callbacks fire in registration order. On an invalid handle the
    /// callback is dropped without running.
    pub fn callback<F>(&self, callback: F) -> &Self
    where
        F: FnOnce() + 'static,
    {
        let registered = self.scheduler().is_some_and(|(scheduler, id)| {
            let mut arena = scheduler.inner.arena.borrow_mut();
            match arena.get_mut(id) {
                Some(processor) => {
                    processor.callbacks.push(Box::new(callback));
                    true
                }
                None => false,
            }
        });
        if !registered {
            log::trace!("Callback dropped: handle {self:?} is no longer valid.");
        }
        self
    }

    /// Resolves once the run is over.
    ///
    /// The scheduler is not thread-safe, so the future is `!Send`: poll it
    /// from a [`tokio::task::LocalSet`] or a current-thread runtime while the
    /// host keeps ticking. Completion is observed every
    /// [`bridge_poll_interval`](mroutine_core::SchedulerConfig::bridge_poll_interval).
    pub async fn wait(&self) {
        while let Some((scheduler, id)) = self.scheduler() {
            if scheduler.inner.arena.borrow().get(id).is_none() {
                break;
            }
            let interval = scheduler.config().bridge_poll_interval();
            drop(scheduler);
            tokio::time::sleep(interval).await;
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.scheduler, &other.scheduler)
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Handle({id}, {:?})", self.state()),
            None => f.write_str("Handle(unassigned)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Script;

    #[test]
    fn test_default_handle_is_unassigned() {
        let handle = Handle::default();
        assert_eq!(handle.state(), RoutineState::Unassigned);
        assert!(!handle.is_valid());
        assert!(!handle.stop());
        assert_eq!(handle.start().err(), Some(RoutineError::InvalidHandle));
    }

    #[test]
    fn test_handle_outliving_scheduler_reports_complete() {
        let scheduler = Scheduler::default();
        let handle = scheduler.create(Script::new());
        drop(scheduler);

        assert!(!handle.is_valid());
        assert_eq!(handle.state(), RoutineState::Complete);
    }

    #[test]
    fn test_copies_compare_equal() {
        let scheduler = Scheduler::default();
        let a = scheduler.create(Script::new());
        let b = a.clone();
        let c = scheduler.create(Script::new());

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(format!("{a:?}"), "Handle(0v0, Idle)");
    }

    #[test]
    fn test_second_check_is_rejected() {
        let scheduler = Scheduler::default();
        let handle = scheduler.create(Script::new());
        handle.check(|| true).unwrap();

        let id = handle.id().unwrap();
        assert_eq!(
            handle.check(|| true).err(),
            Some(RoutineError::CheckAlreadyInstalled { id })
        );
    }
}
