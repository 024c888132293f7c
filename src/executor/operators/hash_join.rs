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

//! Hash Join Operator
//!
//! Materializes one input into a [`HashProbeTable`] and streams the other
//! input through it. O(N + M) for inputs with selective keys.
//!
//! The inner join builds the left side and probes with right rows. The
//! left-outer join builds the right side instead, so each left row is probed
//! exactly once and can be emitted unextended when nothing merges with it.

use log::{debug, warn};

use crate::core::{merge, Error, JoinKey, JoinSide, Result, Row, RowBuilder, TermValue, VarSet};
use crate::executor::config::JoinConfig;
use crate::executor::diagnostics::JoinStats;
use crate::executor::hash_table::{CandidateCursor, HashProbeTable};
use crate::executor::operator::RowStream;

/// Join semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    /// Only merged pairs
    #[default]
    Inner,
    /// Merged pairs, plus left rows that merged with nothing (OPTIONAL)
    LeftOuter,
}

impl JoinType {
    /// Which input is materialized by a hash join of this type.
    pub fn build_side(&self) -> JoinSide {
        match self {
            JoinType::Inner => JoinSide::Left,
            JoinType::LeftOuter => JoinSide::Right,
        }
    }
}

/// Probe loop state.
#[derive(Debug)]
enum ProbeState {
    /// Pull the next probe row
    NeedProbe,
    /// Walking the candidates of the current probe row
    HaveCandidates {
        cursor: CandidateCursor,
        matched: bool,
    },
    /// Probe side exhausted (or build side empty)
    Done,
}

/// Streaming hash join operator.
///
/// The join proceeds in two phases:
///
/// 1. **Build Phase** (in `open()`):
///    - Materialize the build side into the probe table
///    - An empty build side ends an inner join right away
///
/// 2. **Probe Phase** (in `next()`):
///    - Pull one probe row, get its candidates
///    - Merge candidates one at a time, emitting successful merges
///    - Pull the next probe row once the candidates run out
pub struct HashJoin<X: TermValue> {
    // Input streams
    left: Box<dyn RowStream<X>>,
    right: Box<dyn RowStream<X>>,

    // Join configuration
    join_type: JoinType,
    key: Option<JoinKey>,
    config: JoinConfig,
    vars: VarSet,

    // Build phase state (populated in open())
    table: HashProbeTable<X>,
    builder: RowBuilder<X>,

    // Probe phase state
    state: ProbeState,
    current_probe: Option<Row<X>>,

    stats: JoinStats,
    opened: bool,
}

impl<X: TermValue> HashJoin<X> {
    /// Create an inner hash join that builds `left` and streams `right`.
    pub fn new(
        key: Option<JoinKey>,
        left: Box<dyn RowStream<X>>,
        right: Box<dyn RowStream<X>>,
        config: JoinConfig,
    ) -> Self {
        Self::with_join_type(key, left, right, JoinType::Inner, config)
    }

    /// Create a left-outer hash join that builds `right` and streams `left`.
    pub fn left_outer(
        key: Option<JoinKey>,
        left: Box<dyn RowStream<X>>,
        right: Box<dyn RowStream<X>>,
        config: JoinConfig,
    ) -> Self {
        Self::with_join_type(key, left, right, JoinType::LeftOuter, config)
    }

    /// Create a hash join of the given type.
    pub fn with_join_type(
        key: Option<JoinKey>,
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
            table: HashProbeTable::new(key.clone()),
            key,
            config,
            vars,
            builder: RowBuilder::new(),
            state: ProbeState::Done,
            current_probe: None,
            stats: JoinStats::default(),
            opened: false,
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> JoinStats {
        self.stats
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    fn build_side(&self) -> JoinSide {
        self.join_type.build_side()
    }

    /// Count a row pulled from `side`.
    #[inline]
    fn count_input(stats: &mut JoinStats, side: JoinSide) {
        match side {
            JoinSide::Left => stats.left_rows += 1,
            JoinSide::Right => stats.right_rows += 1,
        }
    }

    /// Pull the next probe row.
    fn next_probe_row(&mut self) -> Result<Option<Row<X>>> {
        let probe_side = self.build_side().other();
        let probe = match probe_side {
            JoinSide::Left => &mut self.left,
            JoinSide::Right => &mut self.right,
        };
        let row = probe.next()?;
        if row.is_some() {
            Self::count_input(&mut self.stats, probe_side);
        }
        Ok(row)
    }

    fn finish(&mut self) {
        self.state = ProbeState::Done;
        self.current_probe = None;
        self.config.diagnostics.report(self.name(), &self.stats);
    }
}

impl<X: TermValue> RowStream<X> for HashJoin<X> {
    fn open(&mut self) -> Result<()> {
        self.left.open()?;
        self.right.open()?;

        if let Some(key) = &self.key {
            if key.len() > 1 {
                warn!("hash join on multi-variable key {}", key);
            }
        }

        // Materialize build side
        let build_side = self.build_side();
        let build = match build_side {
            JoinSide::Left => &mut self.left,
            JoinSide::Right => &mut self.right,
        };
        let mut table = HashProbeTable::new(self.key.clone());
        while let Some(row) = build.next()? {
            Self::count_input(&mut self.stats, build_side);
            table.put(row);
        }
        self.stats.max_bucket = table.max_bucket();

        debug!(
            "hash join build: {} rows, {} buckets, {} key-less, max bucket {}",
            table.len(),
            table.bucket_count(),
            table.no_key_len(),
            table.max_bucket()
        );

        self.state = if table.is_empty() && self.join_type == JoinType::Inner {
            ProbeState::Done
        } else {
            ProbeState::NeedProbe
        };
        self.table = table;
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Row<X>>> {
        if !self.opened {
            return Err(Error::internal("HashJoin::next called before open"));
        }

        let build_is_left = self.build_side() == JoinSide::Left;

        loop {
            match &mut self.state {
                ProbeState::Done => return Ok(None),

                ProbeState::NeedProbe => match self.next_probe_row()? {
                    Some(row) => {
                        self.stats.probes += 1;
                        if self.config.diagnostics.trace {
                            self.config.diagnostics.probe(
                                "HashJoin",
                                &row,
                                self.table.candidate_count(&row),
                            );
                        }
                        let cursor = self.table.cursor(&row);
                        self.current_probe = Some(row);
                        self.state = ProbeState::HaveCandidates {
                            cursor,
                            matched: false,
                        };
                    }
                    None => {
                        self.finish();
                        return Ok(None);
                    }
                },

                ProbeState::HaveCandidates { cursor, matched } => {
                    let probe = match &self.current_probe {
                        Some(row) => row,
                        None => return Err(Error::internal("HashJoin lost its probe row")),
                    };

                    while let Some(candidate) = cursor.next_row(&self.table) {
                        let merged = if build_is_left {
                            merge(candidate, probe, &mut self.builder)
                        } else {
                            merge(probe, candidate, &mut self.builder)
                        };
                        if let Some(row) = merged {
                            *matched = true;
                            self.stats.results += 1;
                            return Ok(Some(row));
                        }
                    }

                    // Candidates exhausted for this probe row
                    let unmatched = !*matched;
                    self.state = ProbeState::NeedProbe;
                    let probe = self.current_probe.take();
                    if unmatched && self.join_type == JoinType::LeftOuter {
                        if let Some(row) = probe {
                            self.stats.results += 1;
                            return Ok(Some(row));
                        }
                    }
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.table.clear();
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
            JoinType::Inner => left_est.min(right_est),
            JoinType::LeftOuter => left_est,
        })
    }

    fn name(&self) -> &str {
        match self.join_type {
            JoinType::Inner => "HashJoin",
            JoinType::LeftOuter => "HashJoin (LEFT)",
        }
    }
}
