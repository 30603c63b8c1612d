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

//! External lifetimes that a routine can be attached to.
//!
//! A routine attached to a [`Lifetime`] is stopped as soon as that lifetime
//! reports deactivation. The scheduler only needs the listener contract;
//! [`LifetimeSignal`] is the stock implementation hosts can embed in their
//! own objects.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Identifies a listener registered on a [`Lifetime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(pub u64);

/// An external object whose deactivation should stop attached routines.
pub trait Lifetime {
    /// Returns `false` once the object has been deactivated or destroyed.
    fn is_active(&self) -> bool;

    /// Registers a listener fired once when the object deactivates.
    ///
    /// ## Returns
    /// A key that can be passed to [`remove_listener`](Lifetime::remove_listener).
    fn on_deactivate(&self, listener: Box<dyn FnOnce()>) -> ListenerKey;

    /// Removes a listener. Unknown keys are ignored.
    fn remove_listener(&self, key: ListenerKey);
}

struct SignalState {
    active: bool,
    next_key: u64,
    listeners: Vec<(ListenerKey, Box<dyn FnOnce()>)>,
}

/// A shared on/off switch implementing [`Lifetime`].
///
/// Clones observe and control the same underlying state.
#[derive(Clone)]
pub struct LifetimeSignal {
    state: Rc<RefCell<SignalState>>,
}

impl LifetimeSignal {
    /// Creates an active signal with no listeners.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SignalState {
                active: true,
                next_key: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Marks the signal inactive and fires every registered listener once.
    ///
    /// Listeners run after the internal borrow is released, so they are free
    /// to register or remove listeners on this same signal.
    pub fn deactivate(&self) {
        let listeners = {
            let mut state = self.state.borrow_mut();
            if !state.active {
                return;
            }
            state.active = false;
            std::mem::take(&mut state.listeners)
        };

        log::trace!("LifetimeSignal deactivated, notifying {} listener(s).", listeners.len());
        for (_, listener) in listeners {
            listener();
        }
    }

    /// Marks the signal active again. Only listeners registered from now on
    /// will fire on the next deactivation.
    pub fn activate(&self) {
        self.state.borrow_mut().active = true;
    }

    /// Returns the number of listeners waiting for deactivation.
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

impl Default for LifetimeSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifetimeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LifetimeSignal")
            .field("active", &state.active)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl Lifetime for LifetimeSignal {
    fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    /// Listeners registered while the signal is inactive are dropped
    /// without ever firing, even if the signal is activated again later.
    fn on_deactivate(&self, listener: Box<dyn FnOnce()>) -> ListenerKey {
        let mut state = self.state.borrow_mut();
        let key = ListenerKey(state.next_key);
        state.next_key += 1;
        if !state.active {
            drop(state);
            drop(listener);
            return key;
        }
        state.listeners.push((key, listener));
        key
    }

    fn remove_listener(&self, key: ListenerKey) {
        self.state
            .borrow_mut()
            .listeners
            .retain(|(existing, _)| *existing != key);
    }
}
