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

use roster_common::assert::{release_count, retain_count};

/// A value that is jointly owned by every holder that retained it.
///
/// The count is manual: a holder calls [`SharedRef::retain`] when it starts depending on the value and
/// [`SharedRef::release`] when it goes away. The owning table evicts the entry once `release` reports zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedRef<T> {
    value: T,
    ref_count: usize,
}

impl<T> SharedRef<T> {
    /// Wrap `value` with no holders yet.
    pub fn new(value: T) -> Self {
        Self { value, ref_count: 0 }
    }

    /// The shared value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Mutable access for in-place merges. Holders keep their claim.
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Replace the value, keeping the count.
    pub fn replace(&mut self, value: T) -> T {
        std::mem::replace(&mut self.value, value)
    }

    /// Number of holders.
    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    /// Register one more holder.
    pub fn retain(&mut self) {
        retain_count(&mut self.ref_count, 1);
    }

    /// Drop one holder. Returns `true` once no holder is left and the entry must be evicted.
    pub fn release(&mut self) -> bool {
        release_count(&mut self.ref_count)
    }

    /// Unwrap the value.
    pub fn into_value(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_release() {
        let mut shared = SharedRef::new("emoji");
        shared.retain();
        shared.retain();
        assert_eq!(shared.ref_count(), 2);

        assert!(!shared.release());
        assert!(shared.release());
        assert_eq!(shared.ref_count(), 0);
    }

    #[test]
    fn test_replace_keeps_count() {
        let mut shared = SharedRef::new(1);
        shared.retain();
        assert_eq!(shared.replace(2), 1);
        *shared.value_mut() += 1;
        assert_eq!(*shared.value(), 3);
        assert_eq!(shared.ref_count(), 1);
    }
}
