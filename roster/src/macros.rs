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

/// Copy every present payload field onto the target.
///
/// `target_field => payload_field` pairs. A payload field of type `Option<T>` overwrites a `T`; nullable
/// `Option<Option<T>>` fields overwrite an `Option<T>`, so an explicit null clears it.
macro_rules! merge_fields {
    ($target:expr, $patch:expr, { $($field:ident => $source:ident),* $(,)? }) => {
        $(
            if let Some(v) = &$patch.$source {
                $target.$field = ::std::clone::Clone::clone(v);
            }
        )*
    };
}
