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

//! # sparql-join - Join operators for SPARQL-style query engines
//!
//! Pull-based join operators over streams of variable bindings. A row is a
//! partial mapping from query variables to terms; two rows join when they
//! agree on every variable both of them bind.
//!
//! ## Key Features
//!
//! - **Hash Join** - Build one side into a probe table, stream the other
//! - **Pipeline Hash Join** - Symmetric, emits results before either input ends
//! - **Inner Loop Join** - Nested loops, no hashing
//! - **Sort Merge Join** - Merge of sorted inputs, falls back to hashing
//! - **Substitution Join** - Index lookups driven by each left row
//! - **Generic terms** - Any `Clone + Eq + Hash + Debug + Send + Sync` value type
//!
//! ## Quick Start
//!
//! ```rust
//! use sparql_join::core::{JoinKey, Row, Term, Var};
//! use sparql_join::executor::{collect_rows, HashJoin, JoinConfig, MaterializedRows};
//!
//! let left = MaterializedRows::from_rows(vec![Row::from_pairs(vec![
//!     (Var::new("s"), Term::iri("alice")),
//!     (Var::new("name"), Term::literal("Alice")),
//! ])]);
//! let right = MaterializedRows::from_rows(vec![Row::from_pairs(vec![
//!     (Var::new("s"), Term::iri("alice")),
//!     (Var::new("age"), Term::integer(30)),
//! ])]);
//!
//! let mut join = HashJoin::new(
//!     Some(JoinKey::single(Var::new("s"))),
//!     Box::new(left),
//!     Box::new(right),
//!     JoinConfig::default(),
//! );
//! let rows = collect_rows(&mut join).unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].len(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Core types ([`Var`], [`Term`], [`Row`], [`JoinKey`], [`Error`])
//! - [`executor`] - Row streams, the probe table and the join operators

pub mod core;
pub mod executor;

// Re-export main types for convenience
pub use core::{
    compatible, merge, Error, JoinKey, JoinSide, Result, Row, RowBuilder, Term, TermValue, Var,
    VarSet,
};
pub use executor::{
    collect_rows, create_row_list, join, Diagnostics, HashJoin, HashProbeTable, InnerLoopJoin,
    JoinAlgorithm, JoinConfig, JoinStats, JoinType, PipelineHashJoin, RowStream, SortMergeJoin,
    SubstitutionJoin, UnsortedPolicy,
};
