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

//! Defines the error taxonomy of the routine scheduler.
//!
//! Every variant except [`RoutineError::Config`] is a usage error: it is
//! returned at the exact call that misused the API and is never retried.

use crate::id::RoutineId;
use std::fmt;

/// An error raised by the scheduler or one of its handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutineError {
    /// `start` was called on a routine that is not idle.
    AlreadyStarted {
        /// The routine that was started twice.
        id: RoutineId,
    },
    /// `attach` was called a second time during the same run.
    AlreadyAttached {
        /// The routine that already has an attachment.
        id: RoutineId,
    },
    /// `check` was called a second time during the same run.
    CheckAlreadyInstalled {
        /// The routine that already has a continuation check.
        id: RoutineId,
    },
    /// The handle is unassigned, or its run has already finished.
    InvalidHandle,
    /// A sequence yielded a value with no registered conversion.
    UnsupportedYield {
        /// The type name of the offending value.
        type_name: &'static str,
    },
    /// A nested sequence was passed where only awaitables are accepted.
    NestedSequenceInGroup,
    /// `tick` was called from inside a routine being ticked.
    ReentrantTick,
    /// The scheduler configuration could not be loaded.
    Config(String),
}

impl fmt::Display for RoutineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutineError::AlreadyStarted { id } => {
                write!(f, "Routine {id} was started while already running")
            }
            RoutineError::AlreadyAttached { id } => {
                write!(f, "Routine {id} is already attached to a lifetime")
            }
            RoutineError::CheckAlreadyInstalled { id } => {
                write!(f, "Routine {id} already has a continuation check")
            }
            RoutineError::InvalidHandle => {
                write!(f, "Operation on an unassigned or finished routine handle")
            }
            RoutineError::UnsupportedYield { type_name } => {
                write!(f, "Routine yielded an unsupported value of type '{type_name}'")
            }
            RoutineError::NestedSequenceInGroup => {
                write!(f, "Nested sequences cannot be grouped with wait_all/wait_any")
            }
            RoutineError::ReentrantTick => {
                write!(f, "Scheduler tick was called from inside a running routine")
            }
            RoutineError::Config(details) => {
                write!(f, "Invalid scheduler configuration: {details}")
            }
        }
    }
}

impl std::error::Error for RoutineError {}
