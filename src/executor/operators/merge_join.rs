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

//! Sort Merge Join Operator for pre-sorted inputs.
//!
//! O(N+M) when both inputs are already ordered on the join key, for example
//! index scans sharing their leading variable. Only the current run of equal
//! left rows is buffered, plus the rows that leave a key variable unbound.
//!
//! The join needs a key that both inputs may bind. Without one it hands the
//! work to a [`HashJoin`] instead.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use log::{debug, warn};

use crate::core::{merge, Error, JoinKey, JoinSide, Result, Row, RowBuilder, TermValue, VarSet};
use crate::executor::config::{JoinConfig, UnsortedPolicy};
use crate::executor::diagnostics::JoinStats;
use crate::executor::operator::RowStream;

use super::hash_join::HashJoin;

/// Ordering of rows on a join key.
///
/// Rows that bind every key variable must compare `Equal` exactly when their
/// key bindings are equal. Rows that leave a key variable unbound must sort
/// before every fully bound row; the merge sets them aside and pairs them
/// with the whole other input. Both merge join inputs must be ascending
/// under it.
pub trait RowOrder<X>: Send + Sync {
    fn compare(&self, key: &JoinKey, a: &Row<X>, b: &Row<X>) -> Ordering;
}

/// Compare key bindings variable by variable, in key order.
///
/// Rows that leave any key variable unbound come first, then fully bound
/// rows ordered by their key values.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingOrder;

impl<X: TermValue + Ord> RowOrder<X> for BindingOrder {
    fn compare(&self, key: &JoinKey, a: &Row<X>, b: &Row<X>) -> Ordering {
        key.is_bound_by(a)
            .cmp(&key.is_bound_by(b))
            .then_with(|| {
                for var in key {
                    let cmp = a.get(var).cmp(&b.get(var));
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                }
                Ordering::Equal
            })
    }
}

/// Sort rows into the order a merge join expects.
pub fn sort_rows<X>(rows: &mut [Row<X>], key: &JoinKey, order: &dyn RowOrder<X>) {
    rows.sort_by(|a, b| order.compare(key, a, b));
}

/// One merge input with a one-row lookahead and an order check.
struct SortedInput<X: TermValue> {
    side: JoinSide,
    stream: Box<dyn RowStream<X>>,
    peeked: Option<Row<X>>,
    // Last row pulled from the stream, for the order check
    previous: Option<Row<X>>,
    position: usize,
    exhausted: bool,
    warned: bool,
}

impl<X: TermValue> SortedInput<X> {
    fn new(side: JoinSide, stream: Box<dyn RowStream<X>>) -> Self {
        Self {
            side,
            stream,
            peeked: None,
            previous: None,
            position: 0,
            exhausted: false,
            warned: false,
        }
    }

    fn peek(
        &mut self,
        key: &JoinKey,
        order: &dyn RowOrder<X>,
        config: &JoinConfig,
    ) -> Result<Option<&Row<X>>> {
        if self.peeked.is_none() && !self.exhausted {
            match self.stream.next()? {
                Some(row) => {
                    if config.check_order {
                        self.check_order(&row, key, order, config)?;
                    }
                    self.position += 1;
                    self.previous = Some(row.clone());
                    self.peeked = Some(row);
                }
                None => self.exhausted = true,
            }
        }
        Ok(self.peeked.as_ref())
    }

    fn pop(
        &mut self,
        key: &JoinKey,
        order: &dyn RowOrder<X>,
        config: &JoinConfig,
    ) -> Result<Option<Row<X>>> {
        self.peek(key, order, config)?;
        Ok(self.peeked.take())
    }

    fn check_order(
        &mut self,
        row: &Row<X>,
        key: &JoinKey,
        order: &dyn RowOrder<X>,
        config: &JoinConfig,
    ) -> Result<()> {
        let previous = match &self.previous {
            Some(previous) => previous,
            None => return Ok(()),
        };
        if order.compare(key, previous, row) != Ordering::Greater {
            return Ok(());
        }

        match config.unsorted_policy {
            UnsortedPolicy::Fail => Err(Error::UnsortedInput {
                side: self.side,
                position: self.position,
            }),
            UnsortedPolicy::Warn => {
                if !self.warned {
                    self.warned = true;
                    warn!(
                        "merge join: {} input is not sorted on {} (row {}); results may be incomplete",
                        self.side, key, self.position
                    );
                }
                Ok(())
            }
        }
    }
}

enum MergeState<X> {
    /// Set aside the leading rows that leave the key unbound
    Start,
    /// Compare the heads of both inputs
    Advance,
    /// Crossing one right row with the buffered run of equal left rows
    Group {
        run: Vec<Row<X>>,
        right_row: Row<X>,
        pos: usize,
    },
    Done,
}

/// The merge proper, used when the key allows it.
///
/// Rows leaving a key variable unbound cannot be placed in the key order, so
/// they are kept per side (like the no-key bucket of a probe table) and every
/// row read from the other side is merged against them. Those results queue
/// in `pending` ahead of the merge output.
struct MergeCore<X: TermValue> {
    left: SortedInput<X>,
    right: SortedInput<X>,
    key: JoinKey,
    order: Box<dyn RowOrder<X>>,
    config: JoinConfig,
    builder: RowBuilder<X>,
    state: MergeState<X>,
    loose_left: Vec<Row<X>>,
    loose_right: Vec<Row<X>>,
    pending: VecDeque<Row<X>>,
    stats: JoinStats,
}

impl<X: TermValue> MergeCore<X> {
    fn new(
        left: Box<dyn RowStream<X>>,
        right: Box<dyn RowStream<X>>,
        key: JoinKey,
        order: Box<dyn RowOrder<X>>,
        config: JoinConfig,
    ) -> Self {
        Self {
            left: SortedInput::new(JoinSide::Left, left),
            right: SortedInput::new(JoinSide::Right, right),
            key,
            order,
            config,
            builder: RowBuilder::new(),
            state: MergeState::Done,
            loose_left: Vec::new(),
            loose_right: Vec::new(),
            pending: VecDeque::new(),
            stats: JoinStats::default(),
        }
    }

    fn next_row(&mut self) -> Result<Option<Row<X>>> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }

            let state = std::mem::replace(&mut self.state, MergeState::Done);
            match state {
                MergeState::Done => return Ok(None),

                MergeState::Start => {
                    while self.take_loose(JoinSide::Left)? {}
                    while self.take_loose(JoinSide::Right)? {}
                    self.state = MergeState::Advance;
                }

                MergeState::Advance => {
                    // A loose row after a bound one is out of order; it still pairs with the rest
                    if self.take_loose(JoinSide::Left)? || self.take_loose(JoinSide::Right)? {
                        self.state = MergeState::Advance;
                        continue;
                    }

                    let key = &self.key;
                    let order = self.order.as_ref();
                    let has_left = self.left.peek(key, order, &self.config)?.is_some();
                    let has_right = self.right.peek(key, order, &self.config)?.is_some();

                    match (has_left, has_right) {
                        (true, true) => {}
                        // One side is done: the other only pairs with its loose rows
                        (true, false) if !self.loose_right.is_empty() => {
                            self.pop_bound(JoinSide::Left)?;
                            self.state = MergeState::Advance;
                            continue;
                        }
                        (false, true) if !self.loose_left.is_empty() => {
                            self.pop_bound(JoinSide::Right)?;
                            self.state = MergeState::Advance;
                            continue;
                        }
                        _ => {
                            self.finish();
                            continue;
                        }
                    }

                    let cmp = match (self.left.peeked.as_ref(), self.right.peeked.as_ref()) {
                        (Some(left), Some(right)) => order.compare(key, left, right),
                        _ => return Err(Error::internal("merge join lost an input head")),
                    };

                    match cmp {
                        Ordering::Less => {
                            self.pop_bound(JoinSide::Left)?;
                            self.state = MergeState::Advance;
                        }
                        Ordering::Greater => {
                            self.pop_bound(JoinSide::Right)?;
                            self.state = MergeState::Advance;
                        }
                        Ordering::Equal => {
                            // Buffer the run of left rows equal to the head
                            let mut run = vec![self.pop_bound(JoinSide::Left)?];
                            loop {
                                let key = &self.key;
                                let order = self.order.as_ref();
                                let same = match self.left.peek(key, order, &self.config)? {
                                    Some(next) => {
                                        key.is_bound_by(next)
                                            && order.compare(key, &run[0], next) == Ordering::Equal
                                    }
                                    None => false,
                                };
                                if !same {
                                    break;
                                }
                                run.push(self.pop_bound(JoinSide::Left)?);
                            }
                            self.stats.max_bucket = self.stats.max_bucket.max(run.len());

                            let right_row = self.pop_bound(JoinSide::Right)?;
                            self.stats.probes += 1;
                            self.config
                                .diagnostics
                                .probe("SortMergeJoin", &right_row, run.len());
                            self.state = MergeState::Group {
                                run,
                                right_row,
                                pos: 0,
                            };
                        }
                    }
                }

                MergeState::Group {
                    run,
                    right_row,
                    mut pos,
                } => {
                    while let Some(left_row) = run.get(pos) {
                        pos += 1;
                        if let Some(row) = merge(left_row, &right_row, &mut self.builder) {
                            self.stats.results += 1;
                            self.state = MergeState::Group {
                                run,
                                right_row,
                                pos,
                            };
                            return Ok(Some(row));
                        }
                    }

                    // Next right row of the same run, if any
                    let key = &self.key;
                    let order = self.order.as_ref();
                    let same = match (run.first(), self.right.peek(key, order, &self.config)?) {
                        (Some(anchor), Some(next)) => {
                            key.is_bound_by(next)
                                && order.compare(key, anchor, next) == Ordering::Equal
                        }
                        _ => false,
                    };
                    self.state = MergeState::Advance;
                    if same {
                        let next_right = self.pop_bound(JoinSide::Right)?;
                        self.stats.probes += 1;
                        self.state = MergeState::Group {
                            run,
                            right_row: next_right,
                            pos: 0,
                        };
                    }
                }
            }
        }
    }

    /// Move the head of `side` into its loose buffer when it leaves a key
    /// variable unbound. Returns false otherwise.
    fn take_loose(&mut self, side: JoinSide) -> Result<bool> {
        let input = match side {
            JoinSide::Left => &mut self.left,
            JoinSide::Right => &mut self.right,
        };
        let loose = match input.peek(&self.key, self.order.as_ref(), &self.config)? {
            Some(row) => !self.key.is_bound_by(row),
            None => false,
        };
        if !loose {
            return Ok(false);
        }

        let row = self.pop_bound(side)?;
        match side {
            JoinSide::Left => self.loose_left.push(row),
            JoinSide::Right => self.loose_right.push(row),
        }
        Ok(true)
    }

    /// Pop the head of `side`, pairing it with the other side's loose rows.
    fn pop_bound(&mut self, side: JoinSide) -> Result<Row<X>> {
        let input = match side {
            JoinSide::Left => &mut self.left,
            JoinSide::Right => &mut self.right,
        };
        let row = match input.pop(&self.key, self.order.as_ref(), &self.config)? {
            Some(row) => row,
            None => return Err(Error::internal("merge join lost an input head")),
        };

        let loose = match side {
            JoinSide::Left => {
                self.stats.left_rows += 1;
                &self.loose_right
            }
            JoinSide::Right => {
                self.stats.right_rows += 1;
                &self.loose_left
            }
        };
        for other in loose {
            let merged = match side {
                JoinSide::Left => merge(&row, other, &mut self.builder),
                JoinSide::Right => merge(other, &row, &mut self.builder),
            };
            if let Some(merged) = merged {
                self.stats.results += 1;
                self.pending.push_back(merged);
            }
        }
        Ok(row)
    }

    fn finish(&mut self) {
        self.state = MergeState::Done;
        self.config.diagnostics.report("SortMergeJoin", &self.stats);
    }
}

enum Strategy<X: TermValue> {
    Merge(Box<MergeCore<X>>),
    Fallback(HashJoin<X>),
}

/// Sort Merge Join Operator.
///
/// Both inputs must be ascending on the join key under the given
/// [`RowOrder`]. Out-of-order input is detected while reading: by default it
/// is logged once per side and the join carries on (rows may be missed);
/// with [`UnsortedPolicy::Fail`] it stops with [`Error::UnsortedInput`].
pub struct SortMergeJoin<X: TermValue> {
    strategy: Strategy<X>,
    vars: VarSet,
    opened: bool,
}

impl<X: TermValue> SortMergeJoin<X> {
    pub fn new(
        key: Option<JoinKey>,
        left: Box<dyn RowStream<X>>,
        right: Box<dyn RowStream<X>>,
        order: Box<dyn RowOrder<X>>,
        config: JoinConfig,
    ) -> Self {
        let vars = left.vars().union(right.vars());

        let usable = match &key {
            None => {
                warn!("merge join without a join key, using hash join");
                None
            }
            Some(key) if key.is_empty() => {
                debug!("merge join on an empty key is a cross product, using hash join");
                None
            }
            Some(key) if !key.is_covered_by(left.vars()) || !key.is_covered_by(right.vars()) => {
                warn!(
                    "merge join key {} not bound by both inputs ({} / {}), using hash join",
                    key,
                    left.vars(),
                    right.vars()
                );
                None
            }
            Some(key) => Some(key.clone()),
        };

        let strategy = match usable {
            Some(key) => Strategy::Merge(Box::new(MergeCore::new(left, right, key, order, config))),
            None => Strategy::Fallback(HashJoin::new(key, left, right, config)),
        };

        Self {
            strategy,
            vars,
            opened: false,
        }
    }

    /// True when the key did not allow a merge and a hash join runs instead.
    pub fn is_fallback(&self) -> bool {
        matches!(self.strategy, Strategy::Fallback(_))
    }

    /// Counters so far.
    pub fn stats(&self) -> JoinStats {
        match &self.strategy {
            Strategy::Merge(core) => core.stats,
            Strategy::Fallback(join) => join.stats(),
        }
    }
}

impl<X: TermValue> RowStream<X> for SortMergeJoin<X> {
    fn open(&mut self) -> Result<()> {
        match &mut self.strategy {
            Strategy::Merge(core) => {
                core.left.stream.open()?;
                core.right.stream.open()?;
                core.state = MergeState::Start;
            }
            Strategy::Fallback(join) => join.open()?,
        }
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Row<X>>> {
        if !self.opened {
            return Err(Error::internal("SortMergeJoin::next called before open"));
        }
        match &mut self.strategy {
            Strategy::Merge(core) => core.next_row(),
            Strategy::Fallback(join) => join.next(),
        }
    }

    fn close(&mut self) -> Result<()> {
        match &mut self.strategy {
            Strategy::Merge(core) => {
                core.state = MergeState::Done;
                core.pending.clear();
                core.left.stream.close()?;
                core.right.stream.close()
            }
            Strategy::Fallback(join) => join.close(),
        }
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn estimated_rows(&self) -> Option<usize> {
        match &self.strategy {
            Strategy::Merge(core) => {
                let left_est = core.left.stream.estimated_rows()?;
                let right_est = core.right.stream.estimated_rows()?;
                Some(left_est.min(right_est))
            }
            Strategy::Fallback(join) => join.estimated_rows(),
        }
    }

    fn name(&self) -> &str {
        match &self.strategy {
            Strategy::Merge(_) => "SortMergeJoin",
            Strategy::Fallback(_) => "SortMergeJoin (hash fallback)",
        }
    }
}

impl<X: TermValue> fmt::Debug for SortMergeJoin<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortMergeJoin")
            .field("fallback", &self.is_fallback())
            .field("vars", &self.vars)
            .field("stats", &self.stats())
            .finish()
    }
}
