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

//! JOIN Execution Module
//!
//! Picks an operator for a join of two row streams:
//! - Hash Join: O(N + M), left side materialized
//! - Pipeline Hash Join: O(N + M), neither side materialized up front
//! - Inner Loop Join: O(N * M), no hashing
//! - Sort Merge Join: O(N + M) for inputs sorted on the key
//!
//! Substitution joins take an accessor instead of a right stream and are
//! built directly with [`SubstitutionJoin::new`](super::operators::SubstitutionJoin::new).

use std::fmt;

use crate::core::{JoinKey, TermValue};

use super::config::JoinConfig;
use super::operator::RowStream;
use super::operators::{BindingOrder, HashJoin, InnerLoopJoin, PipelineHashJoin, SortMergeJoin};

/// Join algorithm for two row streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinAlgorithm {
    #[default]
    Hash,
    PipelineHash,
    InnerLoop,
    SortMerge,
}

impl JoinAlgorithm {
    pub const ALL: [JoinAlgorithm; 4] = [
        JoinAlgorithm::Hash,
        JoinAlgorithm::PipelineHash,
        JoinAlgorithm::InnerLoop,
        JoinAlgorithm::SortMerge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinAlgorithm::Hash => "hash",
            JoinAlgorithm::PipelineHash => "pipeline-hash",
            JoinAlgorithm::InnerLoop => "inner-loop",
            JoinAlgorithm::SortMerge => "sort-merge",
        }
    }
}

impl fmt::Display for JoinAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build an inner join of `left` and `right` with the given algorithm.
///
/// `SortMerge` compares key bindings with [`BindingOrder`] and expects both
/// inputs ascending under it. `InnerLoop` ignores the key: the row merge
/// alone decides which pairs join.
pub fn join<X: TermValue + Ord>(
    algorithm: JoinAlgorithm,
    key: Option<JoinKey>,
    left: Box<dyn RowStream<X>>,
    right: Box<dyn RowStream<X>>,
    config: JoinConfig,
) -> Box<dyn RowStream<X>> {
    match algorithm {
        JoinAlgorithm::Hash => Box::new(HashJoin::new(key, left, right, config)),
        JoinAlgorithm::PipelineHash => Box::new(PipelineHashJoin::new(key, left, right, config)),
        JoinAlgorithm::InnerLoop => Box::new(InnerLoopJoin::new(left, right, config)),
        JoinAlgorithm::SortMerge => Box::new(SortMergeJoin::new(
            key,
            left,
            right,
            Box::new(BindingOrder),
            config,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Row, Term, Var};
    use crate::executor::operator::{collect_rows, MaterializedRows};

    fn make_row(pairs: &[(&str, i64)]) -> Row<Term> {
        pairs
            .iter()
            .map(|(v, n)| (Var::new(v), Term::integer(*n)))
            .collect()
    }

    #[test]
    fn test_every_algorithm_agrees_on_sorted_input() {
        let left = vec![
            make_row(&[("k", 1), ("a", 1)]),
            make_row(&[("k", 2), ("a", 2)]),
            make_row(&[("k", 2), ("a", 3)]),
        ];
        let right = vec![
            make_row(&[("k", 2), ("b", 1)]),
            make_row(&[("k", 3), ("b", 2)]),
        ];

        for algorithm in JoinAlgorithm::ALL {
            let mut stream = join(
                algorithm,
                Some(JoinKey::single(Var::new("k"))),
                Box::new(MaterializedRows::from_rows(left.clone())),
                Box::new(MaterializedRows::from_rows(right.clone())),
                JoinConfig::default(),
            );
            let results = collect_rows(&mut stream).unwrap();
            assert_eq!(results.len(), 2, "{}", algorithm);
            assert!(
                results.contains(&make_row(&[("k", 2), ("a", 3), ("b", 1)])),
                "{}",
                algorithm
            );
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(JoinAlgorithm::default(), JoinAlgorithm::Hash);
        assert_eq!(JoinAlgorithm::SortMerge.to_string(), "sort-merge");
    }
}
