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

//! Pipeline (symmetric) Hash Join Operator
//!
//! Neither input is materialized up front. Both sides keep a probe table that
//! fills as rows arrive; every new row is stored in its own table and probed
//! against the other one, so results flow before either input is exhausted.
//!
//! ```text
//!   left row ──put──▶ [left table]      [right table] ◀──put── right row
//!        │                 ▲                  ▲                  │
//!        └─────probe───────┼──────────────────┘                  │
//!                          └──────────────────probe──────────────┘
//! ```
//!
//! Once one side is exhausted, rows of the other side are only probed, never
//! stored, and the other side's table can be released.

use log::debug;

use crate::core::{merge, Error, JoinKey, JoinSide, Result, Row, RowBuilder, TermValue, VarSet};
use crate::executor::config::JoinConfig;
use crate::executor::diagnostics::JoinStats;
use crate::executor::hash_table::{CandidateCursor, HashProbeTable};
use crate::executor::operator::RowStream;

/// One input with its own probe table.
struct PipelineSide<X: TermValue> {
    stream: Box<dyn RowStream<X>>,
    table: HashProbeTable<X>,
    exhausted: bool,
    rows_read: usize,
}

impl<X: TermValue> PipelineSide<X> {
    fn new(stream: Box<dyn RowStream<X>>, key: Option<JoinKey>) -> Self {
        Self {
            stream,
            table: HashProbeTable::new(key),
            exhausted: false,
            rows_read: 0,
        }
    }
}

#[derive(Debug)]
enum PipelineState {
    /// Pick a side and pull one row from it
    NeedRow,
    /// Walking the other side's candidates for the current row
    HaveCandidates {
        probe_side: JoinSide,
        cursor: CandidateCursor,
    },
    /// Both inputs exhausted, or nothing can match any more
    Done,
}

/// Symmetric hash join.
///
/// Reads alternate between the inputs: the side with fewer rows read goes
/// next (left on ties), and a side that has run dry is skipped. A slow or
/// blocked input therefore never stops the other one from being consumed.
pub struct PipelineHashJoin<X: TermValue> {
    left: PipelineSide<X>,
    right: PipelineSide<X>,

    key: Option<JoinKey>,
    config: JoinConfig,
    vars: VarSet,
    builder: RowBuilder<X>,

    state: PipelineState,
    current_probe: Option<Row<X>>,

    stats: JoinStats,
    opened: bool,
}

impl<X: TermValue> PipelineHashJoin<X> {
    pub fn new(
        key: Option<JoinKey>,
        left: Box<dyn RowStream<X>>,
        right: Box<dyn RowStream<X>>,
        config: JoinConfig,
    ) -> Self {
        let vars = left.vars().union(right.vars());
        Self {
            left: PipelineSide::new(left, key.clone()),
            right: PipelineSide::new(right, key.clone()),
            key,
            config,
            vars,
            builder: RowBuilder::new(),
            state: PipelineState::Done,
            current_probe: None,
            stats: JoinStats::default(),
            opened: false,
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> JoinStats {
        self.stats
    }

    pub fn key(&self) -> Option<&JoinKey> {
        self.key.as_ref()
    }

    fn side(&self, side: JoinSide) -> &PipelineSide<X> {
        match side {
            JoinSide::Left => &self.left,
            JoinSide::Right => &self.right,
        }
    }

    fn side_mut(&mut self, side: JoinSide) -> &mut PipelineSide<X> {
        match side {
            JoinSide::Left => &mut self.left,
            JoinSide::Right => &mut self.right,
        }
    }

    /// Side to read next, or None when both are exhausted.
    fn pick_side(&self) -> Option<JoinSide> {
        match (self.left.exhausted, self.right.exhausted) {
            (true, true) => None,
            (false, true) => Some(JoinSide::Left),
            (true, false) => Some(JoinSide::Right),
            (false, false) => {
                if self.right.rows_read < self.left.rows_read {
                    Some(JoinSide::Right)
                } else {
                    Some(JoinSide::Left)
                }
            }
        }
    }

    /// Record that `side` ran dry. Returns true when the join can stop.
    fn side_exhausted(&mut self, side: JoinSide) -> bool {
        self.side_mut(side).exhausted = true;

        // Nothing was read on this side, so nothing can ever match
        if self.side(side).rows_read == 0 {
            return true;
        }

        // The other side's table is never probed again
        if self.config.release_exhausted {
            let other = self.side_mut(side.other());
            if !other.table.is_empty() {
                debug!(
                    "pipeline hash join: {} side exhausted, releasing {} rows of the {} table",
                    side,
                    other.table.len(),
                    side.other()
                );
                other.table.clear();
            }
        }

        self.left.exhausted && self.right.exhausted
    }

    fn finish(&mut self) {
        self.state = PipelineState::Done;
        self.current_probe = None;
        self.config.diagnostics.report(self.name(), &self.stats);
    }
}

impl<X: TermValue> RowStream<X> for PipelineHashJoin<X> {
    fn open(&mut self) -> Result<()> {
        self.left.stream.open()?;
        self.right.stream.open()?;
        self.state = PipelineState::NeedRow;
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Row<X>>> {
        if !self.opened {
            return Err(Error::internal("PipelineHashJoin::next called before open"));
        }

        loop {
            match &mut self.state {
                PipelineState::Done => return Ok(None),

                PipelineState::NeedRow => {
                    let side = match self.pick_side() {
                        Some(side) => side,
                        None => {
                            self.finish();
                            return Ok(None);
                        }
                    };

                    let row = match self.side_mut(side).stream.next()? {
                        Some(row) => row,
                        None => {
                            if self.side_exhausted(side) {
                                self.finish();
                                return Ok(None);
                            }
                            continue;
                        }
                    };

                    match side {
                        JoinSide::Left => self.stats.left_rows += 1,
                        JoinSide::Right => self.stats.right_rows += 1,
                    }

                    let other_exhausted = self.side(side.other()).exhausted;
                    let own = self.side_mut(side);
                    own.rows_read += 1;
                    if !other_exhausted {
                        own.table.put(row.clone());
                        let max_bucket = own.table.max_bucket();
                        self.stats.max_bucket = self.stats.max_bucket.max(max_bucket);
                    }

                    let other_table = &self.side(side.other()).table;
                    let cursor = other_table.cursor(&row);
                    if self.config.diagnostics.trace {
                        let candidates = other_table.candidate_count(&row);
                        self.config
                            .diagnostics
                            .probe("PipelineHashJoin", &row, candidates);
                    }
                    self.stats.probes += 1;

                    self.current_probe = Some(row);
                    self.state = PipelineState::HaveCandidates {
                        probe_side: side,
                        cursor,
                    };
                }

                PipelineState::HaveCandidates { probe_side, cursor } => {
                    let probe = match &self.current_probe {
                        Some(row) => row,
                        None => {
                            return Err(Error::internal("PipelineHashJoin lost its probe row"))
                        }
                    };
                    let (table, probe_is_left) = match probe_side {
                        JoinSide::Left => (&self.right.table, true),
                        JoinSide::Right => (&self.left.table, false),
                    };

                    while let Some(candidate) = cursor.next_row(table) {
                        let merged = if probe_is_left {
                            merge(probe, candidate, &mut self.builder)
                        } else {
                            merge(candidate, probe, &mut self.builder)
                        };
                        if let Some(row) = merged {
                            self.stats.results += 1;
                            return Ok(Some(row));
                        }
                    }

                    self.current_probe = None;
                    self.state = PipelineState::NeedRow;
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.left.table.clear();
        self.right.table.clear();
        self.left.stream.close()?;
        self.right.stream.close()
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn estimated_rows(&self) -> Option<usize> {
        let left_est = self.left.stream.estimated_rows()?;
        let right_est = self.right.stream.estimated_rows()?;
        Some(left_est.min(right_est))
    }

    fn name(&self) -> &str {
        "PipelineHashJoin"
    }
}
