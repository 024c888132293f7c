// Copyright 2025 Stoolap Contributors
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

//! Join operators for streaming execution.
//!
//! Each operator implements [`RowStream`](super::RowStream) with the
//! `open()`, `next()`, `close()` lifecycle and combines rows with the
//! row merge, so a pair joins exactly when its bindings agree.
//!
//! # Available Operators
//!
//! - `HashJoin` - Build left, stream right, O(N+M)
//! - `PipelineHashJoin` - Symmetric hash join, results before either side ends
//! - `InnerLoopJoin` - Materialize left, scan it per right row, O(N*M)
//! - `SortMergeJoin` - Merge of inputs sorted on the key, O(N+M)
//! - `SubstitutionJoin` - Index lookup per left row through an accessor
//!
//! # Algorithm Selection
//!
//! | Condition | Recommended Operator |
//! |-----------|---------------------|
//! | Selective key, one small side | `HashJoin` |
//! | Slow or unbounded inputs | `PipelineHashJoin` |
//! | Both inputs sorted on the key | `SortMergeJoin` |
//! | Right side is a pattern over an index | `SubstitutionJoin` |
//! | Tiny inputs, no usable key | `InnerLoopJoin` |

pub mod hash_join;
pub mod merge_join;
pub mod nested_loop_join;
pub mod pipeline_hash_join;
pub mod substitution_join;

// Re-export all operators and types
pub use hash_join::{HashJoin, JoinType};
pub use merge_join::{sort_rows, BindingOrder, RowOrder, SortMergeJoin};
pub use nested_loop_join::{inner_loop_join_all, InnerLoopJoin};
pub use pipeline_hash_join::PipelineHashJoin;
pub use substitution_join::SubstitutionJoin;
