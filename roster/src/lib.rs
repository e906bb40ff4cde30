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

//! An in-process entity cache for clients of a real-time gateway.
//!
//! The [`Registry`] incorporates the partial updates pushed by the remote service into a consistent graph of
//! guilds, channels, roles, members, presences, emojis, voice states, invites, private channels and
//! messages. Every mutation returns the entities it produced, and every update returns the entity before and
//! after the change, so an event layer can tell subscribers what changed.
//!
//! ```
//! use roster::{payload::GuildPayload, Id, RegistryBuilder};
//!
//! let mut registry = RegistryBuilder::new().with_message_capacity(500).build().unwrap();
//! registry.parse_guild(&GuildPayload {
//!     id: Id::new(1),
//!     name: Some("crabs".into()),
//!     ..Default::default()
//! });
//! assert_eq!(registry.get_guild_by_id(Id::new(1)).unwrap().name, "crabs");
//! ```

#[macro_use]
mod macros;

mod builder;
mod fetch;
pub mod model;
pub mod payload;
mod record;
mod registry;

mod prelude;
pub use prelude::*;
