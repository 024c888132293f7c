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

//! Substitution Join Operator.
//!
//! Index nested loop join for tuple patterns. For each left row, the values
//! it binds are substituted into the access pattern and the accessor is asked
//! for the matching rows only, avoiding a scan of the whole store.
//!
//! At any time the operator holds the current left row and at most one open
//! accessor stream.

use std::sync::Arc;

use log::{debug, trace};

use crate::core::{merge, Error, Result, Row, RowBuilder, TermValue, VarSet};
use crate::executor::access::{AccessPattern, AccessRows};
use crate::executor::config::JoinConfig;
use crate::executor::diagnostics::JoinStats;
use crate::executor::operator::RowStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubstitutionState {
    /// Pull the next left row and start an access
    NeedLeft,
    /// Draining the accessor stream for the current left row
    Accessing,
    Done,
}

/// Substitution Join Operator.
pub struct SubstitutionJoin<X: TermValue> {
    // Outer input
    left: Box<dyn RowStream<X>>,

    // Inner side, reached through the accessor
    pattern: AccessPattern<X>,
    accessor: Arc<dyn AccessRows<X>>,

    config: JoinConfig,
    vars: VarSet,
    builder: RowBuilder<X>,

    state: SubstitutionState,
    current_left: Option<Row<X>>,
    access: Option<Box<dyn RowStream<X>>>,

    stats: JoinStats,
    opened: bool,
}

impl<X: TermValue> SubstitutionJoin<X> {
    pub fn new(
        left: Box<dyn RowStream<X>>,
        pattern: AccessPattern<X>,
        accessor: Arc<dyn AccessRows<X>>,
        config: JoinConfig,
    ) -> Self {
        let vars = left.vars().union(&pattern.vars());
        Self {
            left,
            pattern,
            accessor,
            config,
            vars,
            builder: RowBuilder::new(),
            state: SubstitutionState::Done,
            current_left: None,
            access: None,
            stats: JoinStats::default(),
            opened: false,
        }
    }

    /// Counters so far. `right_rows` counts rows returned by the accessor,
    /// `probes` counts accessor calls.
    pub fn stats(&self) -> JoinStats {
        self.stats
    }

    pub fn pattern(&self) -> &AccessPattern<X> {
        &self.pattern
    }

    fn close_access(&mut self) -> Result<()> {
        if let Some(mut access) = self.access.take() {
            access.close()?;
        }
        Ok(())
    }

    /// Close the access stream after a failure and stop. The first error is
    /// the one returned; a close error is only logged.
    fn abandon_access(&mut self) {
        if let Some(mut access) = self.access.take() {
            if let Err(err) = access.close() {
                debug!("SubstitutionJoin: closing failed access stream: {}", err);
            }
        }
        self.current_left = None;
        self.state = SubstitutionState::Done;
    }
}

impl<X: TermValue> RowStream<X> for SubstitutionJoin<X> {
    fn open(&mut self) -> Result<()> {
        self.left.open()?;
        self.state = SubstitutionState::NeedLeft;
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Row<X>>> {
        if !self.opened {
            return Err(Error::internal("SubstitutionJoin::next called before open"));
        }

        loop {
            match self.state {
                SubstitutionState::Done => return Ok(None),

                SubstitutionState::NeedLeft => match self.left.next()? {
                    Some(row) => {
                        self.stats.left_rows += 1;
                        self.stats.probes += 1;

                        let bound = self.pattern.substitute(&row);
                        if self.config.diagnostics.trace {
                            trace!("SubstitutionJoin: access {:?}", bound);
                        }

                        let access = match self.accessor.access_rows(&bound) {
                            Ok(access) => access,
                            Err(err) => {
                                self.abandon_access();
                                return Err(err);
                            }
                        };
                        let access = self.access.insert(access);
                        if let Err(err) = access.open() {
                            self.abandon_access();
                            return Err(err);
                        }
                        self.current_left = Some(row);
                        self.state = SubstitutionState::Accessing;
                    }
                    None => {
                        self.state = SubstitutionState::Done;
                        self.config.diagnostics.report(self.name(), &self.stats);
                        return Ok(None);
                    }
                },

                SubstitutionState::Accessing => {
                    let (access, left_row) =
                        match (self.access.as_mut(), self.current_left.as_ref()) {
                            (Some(access), Some(row)) => (access, row),
                            _ => {
                                return Err(Error::internal(
                                    "SubstitutionJoin lost its access stream",
                                ))
                            }
                        };

                    loop {
                        let found = match access.next() {
                            Ok(Some(found)) => found,
                            Ok(None) => break,
                            Err(err) => {
                                self.abandon_access();
                                return Err(err);
                            }
                        };
                        self.stats.right_rows += 1;
                        if let Some(row) = merge(left_row, &found, &mut self.builder) {
                            self.stats.results += 1;
                            return Ok(Some(row));
                        }
                    }

                    self.close_access()?;
                    self.current_left = None;
                    self.state = SubstitutionState::NeedLeft;
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.state = SubstitutionState::Done;
        self.current_left = None;
        self.close_access()?;
        self.left.close()
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn estimated_rows(&self) -> Option<usize> {
        self.left.estimated_rows()
    }

    fn name(&self) -> &str {
        "SubstitutionJoin"
    }
}
