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

//! In-memory containers for roster.
//!
//! The containers know nothing about the entity model: bounded maps, manually counted shared values,
//! copy-on-read views and single-flight placeholders.

mod activity;
mod fixed;
mod inflight;
mod placeholder;
mod record;
mod shared;
mod view;

mod prelude;
pub use prelude::*;
