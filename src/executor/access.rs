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

//! Index access for substitution joins.
//!
//! An [`AccessPattern`] is a fixed-width tuple pattern (a triple or quad
//! pattern) whose slots are either variables or constants. An [`AccessRows`]
//! implementation answers a pattern with a lazy stream of rows binding the
//! pattern's variables.

use std::sync::Arc;

use crate::core::{Result, Row, TermValue, Var, VarSet};
use crate::executor::operator::{create_row_list, RowStream};

/// One position of an access pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<X> {
    Var(Var),
    Const(X),
}

impl<X> Slot<X> {
    pub fn var(name: &str) -> Self {
        Slot::Var(Var::new(name))
    }

    pub fn constant(value: X) -> Self {
        Slot::Const(value)
    }

    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Slot::Var(var) => Some(var),
            Slot::Const(_) => None,
        }
    }
}

/// Tuple pattern handed to an accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPattern<X> {
    slots: Vec<Slot<X>>,
}

impl<X: TermValue> AccessPattern<X> {
    pub fn new(slots: Vec<Slot<X>>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[Slot<X>] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Variables still open in the pattern, in slot order.
    pub fn vars(&self) -> VarSet {
        self.slots.iter().filter_map(Slot::as_var).cloned().collect()
    }

    /// True when no slot is a variable.
    pub fn is_ground(&self) -> bool {
        self.slots.iter().all(|slot| slot.as_var().is_none())
    }

    /// Replace every variable slot that `row` binds with its value.
    pub fn substitute(&self, row: &Row<X>) -> Self {
        let slots = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Var(var) => match row.get(var) {
                    Some(value) => Slot::Const(value.clone()),
                    None => slot.clone(),
                },
                Slot::Const(_) => slot.clone(),
            })
            .collect();
        Self { slots }
    }

    /// Match a stored tuple against the pattern.
    ///
    /// Constants must be equal, variables get bound, and a variable that
    /// occurs twice must see the same value both times.
    pub fn bind(&self, tuple: &[X]) -> Option<Row<X>> {
        if tuple.len() != self.slots.len() {
            return None;
        }

        let mut pairs: Vec<(Var, X)> = Vec::with_capacity(self.slots.len());
        for (slot, value) in self.slots.iter().zip(tuple) {
            match slot {
                Slot::Const(expected) => {
                    if expected != value {
                        return None;
                    }
                }
                Slot::Var(var) => match pairs.iter().find(|(bound, _)| bound == var) {
                    Some((_, existing)) => {
                        if existing != value {
                            return None;
                        }
                    }
                    None => pairs.push((var.clone(), value.clone())),
                },
            }
        }
        Some(Row::from_pairs(pairs))
    }
}

/// Index accessor: pattern in, lazy row stream out.
///
/// The returned stream is opened, drained (or abandoned) and closed by the
/// caller before the next call.
pub trait AccessRows<X: TermValue>: Send + Sync {
    fn access_rows(&self, pattern: &AccessPattern<X>) -> Result<Box<dyn RowStream<X>>>;
}

/// In-memory tuple store, scanned per access.
///
/// Tuples are shared with the streams it hands out, so a stream stays valid
/// while the index keeps growing.
#[derive(Debug, Clone)]
pub struct TupleIndex<X> {
    tuples: Arc<Vec<Vec<X>>>,
}

impl<X: TermValue> Default for TupleIndex<X> {
    fn default() -> Self {
        Self {
            tuples: Arc::new(Vec::new()),
        }
    }
}

impl<X: TermValue> TupleIndex<X> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tuples(tuples: impl IntoIterator<Item = Vec<X>>) -> Self {
        Self {
            tuples: Arc::new(tuples.into_iter().collect()),
        }
    }

    pub fn insert(&mut self, tuple: Vec<X>) {
        Arc::make_mut(&mut self.tuples).push(tuple);
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

impl<X: TermValue> AccessRows<X> for TupleIndex<X> {
    fn access_rows(&self, pattern: &AccessPattern<X>) -> Result<Box<dyn RowStream<X>>> {
        let tuples = Arc::clone(&self.tuples);
        let pattern = pattern.clone();
        let vars = pattern.vars();

        let matches = (0..tuples.len())
            .filter_map(move |idx| tuples.get(idx).and_then(|tuple| pattern.bind(tuple)))
            .map(Ok);
        Ok(create_row_list(vars, matches))
    }
}
