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

//! Join Executor
//!
//! Pull-based join operators over streams of variable bindings.
//!
//! # Architecture
//!
//! ```text
//! Row source / index access
//!   ↓
//! RowStream (open / next / close)
//!   ↓
//! Join operator (HashProbeTable, sorted cursors, accessor streams)
//!   ↓
//! RowStream
//!   ↓
//! Consumer
//! ```
//!
//! # Components
//!
//! - [`RowStream`] - Volcano iterator implemented by sources and joins
//! - [`HashProbeTable`] - Multi-map from join hash to rows
//! - [`operators`] - The join operators
//! - [`join()`] - Operator selection by [`JoinAlgorithm`]
//! - [`JoinConfig`] / [`Diagnostics`] - Configuration and explain output

pub mod access;
pub mod config;
pub mod diagnostics;
pub mod hash_table;
pub mod join;
pub mod operator;
pub mod operators;

pub use access::{AccessPattern, AccessRows, Slot, TupleIndex};
pub use config::{JoinConfig, UnsortedPolicy};
pub use diagnostics::{Diagnostics, JoinStats};
pub use hash_table::{hash_row, hash_var, CandidateCursor, Candidates, HashProbeTable, JoinHash};
pub use join::{join, JoinAlgorithm};
pub use operator::{collect_rows, create_row_list, EmptyRows, IterRows, MaterializedRows, RowStream};
pub use operators::{
    inner_loop_join_all, sort_rows, BindingOrder, HashJoin, InnerLoopJoin, JoinType,
    PipelineHashJoin, RowOrder, SortMergeJoin, SubstitutionJoin,
};
