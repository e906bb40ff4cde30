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

//! Shared components for roster.

/// Allow to enable debug assertions in release profile with feature "strict_assertion".
pub mod assert;
/// Time source abstraction used by time-based eviction.
pub mod clock;
/// Error type for roster.
pub mod error;
/// Compact sorted set of identifiers.
pub mod id_set;
/// Time-ordered 64-bit identifiers.
pub mod snowflake;
/// Runtime handle used to drive background resolutions.
pub mod spawn;
