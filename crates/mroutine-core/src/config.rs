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

//! Scheduler configuration.

use crate::error::RoutineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for a scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Processor slots constructed up front, before the first routine is created.
    pub initial_capacity: usize,
    /// Polling period, in milliseconds, used when an async caller awaits a handle.
    pub bridge_poll_interval_ms: u64,
    /// Whether pools without a reset hook log a warning on first release.
    pub warn_on_missing_reset: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            bridge_poll_interval_ms: 10,
            warn_on_missing_reset: true,
        }
    }
}

impl SchedulerConfig {
    /// Load the configuration from a JSON string. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, RoutineError> {
        serde_json::from_str(json).map_err(|e| RoutineError::Config(e.to_string()))
    }

    /// Load the configuration from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, RoutineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RoutineError::Config(format!("{path}: {e}")))?;
        Self::from_json(&content)
    }

    /// Serialize the configuration to pretty JSON.
    pub fn to_json(&self) -> Result<String, RoutineError> {
        serde_json::to_string_pretty(self).map_err(|e| RoutineError::Config(e.to_string()))
    }

    /// The async bridge polling period as a [`Duration`]. Never zero.
    pub fn bridge_poll_interval(&self) -> Duration {
        Duration::from_millis(self.bridge_poll_interval_ms.max(1))
    }
}
