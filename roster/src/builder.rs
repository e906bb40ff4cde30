// Copyright 2026 roster Project Authors
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

use std::{fmt::Debug, sync::Arc, time::Duration};

use roster_common::{
    clock::{Clock, SystemClock},
    error::{Error, Result},
    spawn::Spawner,
};
use serde::Deserialize;

use crate::{
    fetch::{Fetcher, NoopFetcher},
    registry::Registry,
};

/// Serializable registry settings, for embedding in an application config file.
///
/// ```rust
/// # use roster::RegistryConfig;
/// let config: RegistryConfig = serde_json::from_str(r#"{ "message_capacity": 50 }"#).unwrap();
/// assert_eq!(config.message_capacity, 50);
/// assert_eq!(config.private_channel_expiry_secs, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Number of messages kept, oldest evicted first.
    pub message_capacity: usize,
    /// Seconds a private channel is kept after its newest message.
    pub private_channel_expiry_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            message_capacity: 1000,
            private_channel_expiry_secs: 300,
        }
    }
}

/// Builder of a [`Registry`].
pub struct RegistryBuilder {
    message_capacity: usize,
    private_channel_expiry: Duration,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    spawner: Spawner,
}

impl Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("message_capacity", &self.message_capacity)
            .field("private_channel_expiry", &self.private_channel_expiry)
            .field("clock", &self.clock)
            .field("spawner", &self.spawner)
            .finish()
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default())
    }
}

impl RegistryBuilder {
    /// Create a builder with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from serialized settings.
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self {
            message_capacity: config.message_capacity,
            private_channel_expiry: Duration::from_secs(config.private_channel_expiry_secs),
            fetcher: Arc::new(NoopFetcher),
            clock: Arc::new(SystemClock),
            spawner: Spawner::default(),
        }
    }

    /// Set the number of messages kept.
    ///
    /// The default value is 1000.
    pub fn with_message_capacity(mut self, message_capacity: usize) -> Self {
        self.message_capacity = message_capacity;
        self
    }

    /// Set how long a private channel is kept after its newest message.
    ///
    /// The default value is 5 minutes.
    pub fn with_private_channel_expiry(mut self, expiry: Duration) -> Self {
        self.private_channel_expiry = expiry;
        self
    }

    /// Set the remote lookups used to resolve placeholders.
    ///
    /// By default nothing can be resolved.
    pub fn with_fetcher(mut self, fetcher: impl Fetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    /// Set the clock private channel expiry is measured with.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Set where placeholder resolutions are spawned.
    ///
    /// By default they are spawned on the runtime of the task that triggers them.
    pub fn with_spawner(mut self, spawner: impl Into<Spawner>) -> Self {
        self.spawner = spawner.into();
        self
    }

    /// Validate the settings and build the registry.
    pub fn build(self) -> Result<Registry> {
        if self.message_capacity == 0 {
            return Err(Error::config("message capacity must be positive").with_context("message_capacity", 0));
        }
        if self.private_channel_expiry.is_zero() {
            return Err(Error::config("private channel expiry must be positive"));
        }
        Registry::new(
            self.message_capacity,
            self.private_channel_expiry,
            self.fetcher,
            self.clock,
            self.spawner,
        )
    }
}
