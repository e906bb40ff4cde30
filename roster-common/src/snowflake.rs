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

use std::fmt::{Debug, Display};

use chrono::{DateTime, TimeZone, Utc};
use serde::{de::Visitor, Deserialize, Deserializer, Serialize, Serializer};

/// Milliseconds between the unix epoch and the identifier epoch (2015-01-01T00:00:00Z).
pub const EPOCH_MILLIS: i64 = 1_420_070_400_000;

const TIMESTAMP_SHIFT: u32 = 22;

/// A 64-bit, time-ordered unique identifier.
///
/// The upper 42 bits hold the milliseconds elapsed since [`EPOCH_MILLIS`], so identifiers sort by
/// creation time and the creation time can be recovered without any lookup.
///
/// On the wire identifiers travel as decimal strings. Deserialization also accepts plain integers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Id(u64);

impl Id {
    /// The smallest identifier.
    pub const MIN: Id = Id(0);
    /// The largest identifier.
    pub const MAX: Id = Id((1 << 63) - 1);

    /// Wrap a raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Milliseconds since the unix epoch at which this identifier was created.
    pub const fn timestamp_millis(self) -> i64 {
        (self.0 >> TIMESTAMP_SHIFT) as i64 + EPOCH_MILLIS
    }

    /// The creation time embedded in this identifier.
    pub fn created_at(self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp_millis())
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// The smallest identifier that could have been created at `at`.
    ///
    /// Times before the identifier epoch clamp to [`Id::MIN`].
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let millis = (at.timestamp_millis() - EPOCH_MILLIS).max(0) as u64;
        Self(millis << TIMESTAMP_SHIFT)
    }

    /// Compose an identifier from its creation time and the low 22 bits (worker, process and increment).
    pub fn from_parts(at: DateTime<Utc>, low: u32) -> Self {
        Self(Self::from_datetime(at).0 | (low as u64 & ((1 << TIMESTAMP_SHIFT) - 1)))
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Id({})", self.0)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<u64> for Id {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Id> for u64 {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

struct IdVisitor;

impl Visitor<'_> for IdVisitor {
    type Value = Id;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("an identifier as a decimal string or an unsigned integer")
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Id, E> {
        Ok(Id(v))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Id, E> {
        u64::try_from(v)
            .map(Id)
            .map_err(|_| E::invalid_value(serde::de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Id, E> {
        v.parse::<u64>()
            .map(Id)
            .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor)
    }
}
