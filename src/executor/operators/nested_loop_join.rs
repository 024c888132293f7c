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

//! Inner Loop Join Operator.
//!
//! Classic nested loop join with O(N*M) complexity. No hashing: every pair is
//! tested with the row merge itself. Used for small inputs and as the
//! reference the other algorithms are checked against.
//!
//! Two modes:
//! - [`InnerLoopJoin`] streams the outer input lazily
//! - [`inner_loop_join_all`] returns the complete result at once

use crate::core::{merge, Error, JoinSide, Result, Row, RowBuilder, TermValue, VarSet};
use crate::executor::config::JoinConfig;
use crate::executor::diagnostics::JoinStats;
use crate::executor::operator::{drain, RowStream};

use super::hash_join::JoinType;

#[derive(Debug)]
enum LoopState {
    /// Pull the next outer row
    NeedOuter,
    /// Scanning the materialized rows for the current outer row
    Scanning { pos: usize, matched: bool },
    Done,
}

/// Inner Loop Join Operator.
///
/// The inner join materializes the left input and streams the right input;
/// each right row is tried against every left row. The left-outer join swaps
/// the roles so that each left row is visited exactly once.
pub struct InnerLoopJoin<X: TermValue> {
    // Input streams
    left: Box<dyn RowStream<X>>,
    right: Box<dyn RowStream<X>>,

    join_type: JoinType,
    config: JoinConfig,
    vars: VarSet,

    // Materialized side (populated in open())
    inner_rows: Vec<Row<X>>,
    builder: RowBuilder<X>,

    // Current state
    state: LoopState,
    current_outer: Option<Row<X>>,

    stats: JoinStats,
    opened: bool,
}

impl<X: TermValue> InnerLoopJoin<X> {
    pub fn new(
        left: Box<dyn RowStream<X>>,
        right: Box<dyn RowStream<X>>,
        config: JoinConfig,
    ) -> Self {
        Self::with_join_type(left, right, JoinType::Inner, config)
    }

    pub fn left_outer(
        left: Box<dyn RowStream<X>>,
        right: Box<dyn RowStream<X>>,
        config: JoinConfig,
    ) -> Self {
        Self::with_join_type(left, right, JoinType::LeftOuter, config)
    }

    pub fn with_join_type(
        left: Box<dyn RowStream<X>>,
        right: Box<dyn RowStream<X>>,
        join_type: JoinType,
        config: JoinConfig,
    ) -> Self {
        let vars = left.vars().union(right.vars());
        Self {
            left,
            right,
            join_type,
            config,
            vars,
            inner_rows: Vec::new(),
            builder: RowBuilder::new(),
            state: LoopState::Done,
            current_outer: None,
            stats: JoinStats::default(),
            opened: false,
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> JoinStats {
        self.stats
    }

    /// Materialized side for this join type.
    fn inner_side(&self) -> JoinSide {
        self.join_type.build_side()
    }

    fn advance_outer(&mut self) -> Result<Option<Row<X>>> {
        let row = match self.inner_side() {
            JoinSide::Left => self.right.next()?,
            JoinSide::Right => self.left.next()?,
        };
        if row.is_some() {
            match self.inner_side() {
                JoinSide::Left => self.stats.right_rows += 1,
                JoinSide::Right => self.stats.left_rows += 1,
            }
            self.stats.probes += 1;
        }
        Ok(row)
    }
}

impl<X: TermValue> RowStream<X> for InnerLoopJoin<X> {
    fn open(&mut self) -> Result<()> {
        self.left.open()?;
        self.right.open()?;

        self.inner_rows = match self.inner_side() {
            JoinSide::Left => drain(self.left.as_mut())?,
            JoinSide::Right => drain(self.right.as_mut())?,
        };
        match self.inner_side() {
            JoinSide::Left => self.stats.left_rows = self.inner_rows.len(),
            JoinSide::Right => self.stats.right_rows = self.inner_rows.len(),
        }

        self.state = if self.inner_rows.is_empty() && self.join_type == JoinType::Inner {
            LoopState::Done
        } else {
            LoopState::NeedOuter
        };
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Row<X>>> {
        if !self.opened {
            return Err(Error::internal("InnerLoopJoin::next called before open"));
        }

        let inner_is_left = self.inner_side() == JoinSide::Left;

        loop {
            match &mut self.state {
                LoopState::Done => return Ok(None),

                LoopState::NeedOuter => match self.advance_outer()? {
                    Some(row) => {
                        self.current_outer = Some(row);
                        self.state = LoopState::Scanning {
                            pos: 0,
                            matched: false,
                        };
                    }
                    None => {
                        self.state = LoopState::Done;
                        self.current_outer = None;
                        self.config.diagnostics.report(self.name(), &self.stats);
                        return Ok(None);
                    }
                },

                LoopState::Scanning { pos, matched } => {
                    let outer = match &self.current_outer {
                        Some(row) => row,
                        None => return Err(Error::internal("InnerLoopJoin lost its outer row")),
                    };

                    while let Some(inner) = self.inner_rows.get(*pos) {
                        *pos += 1;
                        let merged = if inner_is_left {
                            merge(inner, outer, &mut self.builder)
                        } else {
                            merge(outer, inner, &mut self.builder)
                        };
                        if let Some(row) = merged {
                            *matched = true;
                            self.stats.results += 1;
                            return Ok(Some(row));
                        }
                    }

                    let unmatched = !*matched;
                    self.state = LoopState::NeedOuter;
                    let outer = self.current_outer.take();
                    if unmatched && self.join_type == JoinType::LeftOuter {
                        if let Some(row) = outer {
                            self.stats.results += 1;
                            return Ok(Some(row));
                        }
                    }
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.inner_rows.clear();
        self.left.close()?;
        self.right.close()
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn estimated_rows(&self) -> Option<usize> {
        let left_est = self.left.estimated_rows()?;
        let right_est = self.right.estimated_rows()?;

        Some(match self.join_type {
            JoinType::Inner => left_est.saturating_mul(right_est),
            JoinType::LeftOuter => left_est.max(left_est.saturating_mul(right_est)),
        })
    }

    fn name(&self) -> &str {
        match self.join_type {
            JoinType::Inner => "InnerLoopJoin",
            JoinType::LeftOuter => "InnerLoopJoin (LEFT)",
        }
    }
}

/// Join two streams completely and return every merged row.
///
/// Left is materialized, right is read once; an empty left input returns
/// without reading right at all.
pub fn inner_loop_join_all<X: TermValue>(
    mut left: Box<dyn RowStream<X>>,
    mut right: Box<dyn RowStream<X>>,
) -> Result<Vec<Row<X>>> {
    left.open()?;
    let left_rows = drain(left.as_mut())?;
    left.close()?;

    let mut results = Vec::new();
    if left_rows.is_empty() {
        return Ok(results);
    }

    let mut builder = RowBuilder::new();
    right.open()?;
    while let Some(right_row) = right.next()? {
        for left_row in &left_rows {
            if let Some(row) = merge(left_row, &right_row, &mut builder) {
                results.push(row);
            }
        }
    }
    right.close()?;

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Term, Var};
    use crate::executor::operator::{collect_rows, create_row_list, MaterializedRows};

    fn make_row(pairs: &[(&str, i64)]) -> Row<Term> {
        pairs
            .iter()
            .map(|(v, n)| (Var::new(v), Term::integer(*n)))
            .collect()
    }

    fn make_stream(rows: Vec<Row<Term>>) -> Box<dyn RowStream<Term>> {
        Box::new(MaterializedRows::from_rows(rows))
    }

    #[test]
    fn test_inner_loop_join() {
        let left = make_stream(vec![
            make_row(&[("k", 1), ("a", 10)]),
            make_row(&[("k", 2), ("a", 20)]),
        ]);
        let right = make_stream(vec![
            make_row(&[("k", 2), ("b", 200)]),
            make_row(&[("k", 1), ("b", 100)]),
        ]);

        let mut join = InnerLoopJoin::new(left, right, JoinConfig::default());
        let results = collect_rows(&mut join).unwrap();

        // Right order, left order within
        assert_eq!(
            results,
            vec![
                make_row(&[("k", 2), ("a", 20), ("b", 200)]),
                make_row(&[("k", 1), ("a", 10), ("b", 100)]),
            ]
        );
        let stats = join.stats();
        assert_eq!(stats.probes, 2);
        assert_eq!(stats.left_rows, 2);
        // No buckets or tie groups in a loop join
        assert_eq!(stats.max_bucket, 0);
    }

    #[test]
    fn test_cross_product() {
        let left = make_stream(vec![make_row(&[("x", 1)]), make_row(&[("x", 2)])]);
        let right = make_stream(vec![
            make_row(&[("y", 1)]),
            make_row(&[("y", 2)]),
            make_row(&[("y", 3)]),
        ]);

        let mut join = InnerLoopJoin::new(left, right, JoinConfig::default());
        assert_eq!(collect_rows(&mut join).unwrap().len(), 6);
    }

    #[test]
    fn test_empty_left_short_circuits() {
        let left = make_stream(vec![]);
        let right = create_row_list(VarSet::new(), vec![Err(Error::source("unread"))]);

        let mut join = InnerLoopJoin::new(left, right, JoinConfig::default());
        assert!(collect_rows(&mut join).unwrap().is_empty());
    }

    #[test]
    fn test_left_outer() {
        let left = make_stream(vec![
            make_row(&[("k", 1), ("a", 10)]),
            make_row(&[("k", 2), ("a", 20)]),
        ]);
        let right = make_stream(vec![make_row(&[("k", 1), ("b", 100)])]);

        let mut join = InnerLoopJoin::left_outer(left, right, JoinConfig::default());
        let results = collect_rows(&mut join).unwrap();

        assert_eq!(
            results,
            vec![
                make_row(&[("k", 1), ("a", 10), ("b", 100)]),
                make_row(&[("k", 2), ("a", 20)]),
            ]
        );
    }

    #[test]
    fn test_join_all() {
        let left = make_stream(vec![make_row(&[("k", 1)]), make_row(&[("k", 2)])]);
        let right = make_stream(vec![
            make_row(&[("k", 1), ("b", 1)]),
            make_row(&[("k", 1), ("b", 2)]),
            make_row(&[("b", 3)]),
        ]);

        let results = inner_loop_join_all(left, right).unwrap();
        // {b:3} has no k, so it merges with both left rows
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_join_all_propagates_errors() {
        let left = make_stream(vec![make_row(&[("k", 1)])]);
        let right = create_row_list(VarSet::new(), vec![Err(Error::source("bad page"))]);

        assert_eq!(
            inner_loop_join_all(left, right),
            Err(Error::source("bad page"))
        );
    }
}
