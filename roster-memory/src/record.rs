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

/// Apply the fields present in a partial update. Absent fields keep their current value.
pub trait Merge<P> {
    /// Merge `patch` into `self` in place.
    fn merge(&mut self, patch: &P);
}

/// Flat storage form of one entity kind.
///
/// A record keeps only the fields needed to rebuild the public entity plus foreign keys as plain
/// identifiers. Fields that live elsewhere (the user of a member, for example) are supplied as
/// [`EntityRecord::Extra`] when building.
pub trait EntityRecord: Sized {
    /// The public entity handed to application code.
    type Entity;
    /// Fields resolved from other tables at build time.
    type Extra;
    /// A partial update.
    type Patch;

    /// Materialize a fresh public entity. Never mutates the record.
    fn build(&self, extra: Self::Extra) -> Self::Entity;

    /// Capture a record from an already-built entity.
    fn capture(entity: &Self::Entity) -> Self;

    /// Merge the fields present in `patch`.
    fn merge(&mut self, patch: &Self::Patch);
}

/// Records that can outlive their deletion while something still refers to them.
///
/// A deleted record with holders left stays as a tombstone so stale references fail closed.
pub trait Tombstone {
    /// Whether the entity was deleted upstream.
    fn has_been_deleted(&self) -> bool;

    /// Number of holders that still need the record.
    fn ref_count(&self) -> usize;

    /// Whether the record can be dropped from its table.
    fn is_collectable(&self) -> bool {
        self.has_been_deleted() && self.ref_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Badge {
        id: u64,
        label: String,
        owner: String,
    }

    #[derive(Debug, Default)]
    struct BadgePatch {
        label: Option<String>,
    }

    #[derive(Debug, Clone)]
    struct BadgeRecord {
        id: u64,
        label: String,
        deleted: bool,
        holders: usize,
    }

    impl EntityRecord for BadgeRecord {
        type Entity = Badge;
        type Extra = String;
        type Patch = BadgePatch;

        fn build(&self, owner: String) -> Badge {
            Badge {
                id: self.id,
                label: self.label.clone(),
                owner,
            }
        }

        fn capture(entity: &Badge) -> Self {
            Self {
                id: entity.id,
                label: entity.label.clone(),
                deleted: false,
                holders: 0,
            }
        }

        fn merge(&mut self, patch: &BadgePatch) {
            if let Some(label) = &patch.label {
                self.label = label.clone();
            }
        }
    }

    impl Tombstone for BadgeRecord {
        fn has_been_deleted(&self) -> bool {
            self.deleted
        }

        fn ref_count(&self) -> usize {
            self.holders
        }
    }

    #[test]
    fn test_capture_build() {
        let badge = Badge {
            id: 1,
            label: "gold".into(),
            owner: "a".into(),
        };
        let record = BadgeRecord::capture(&badge);
        assert_eq!(record.build("a".into()), badge);
    }

    #[test]
    fn test_merge_keeps_omitted() {
        let mut record = BadgeRecord::capture(&Badge {
            id: 1,
            label: "gold".into(),
            owner: "a".into(),
        });
        record.merge(&BadgePatch::default());
        assert_eq!(record.label, "gold");
        record.merge(&BadgePatch {
            label: Some("silver".into()),
        });
        assert_eq!(record.label, "silver");
    }

    #[test]
    fn test_tombstone() {
        let mut record = BadgeRecord {
            id: 1,
            label: "gold".into(),
            deleted: true,
            holders: 1,
        };
        assert!(!record.is_collectable());
        record.holders = 0;
        assert!(record.is_collectable());
    }
}
