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

//! Row builder and the row merge / compatibility predicate
//!
//! Every join algorithm funnels candidate pairs through [`merge`]. Hashing,
//! sorting and index lookups only pre-filter; `merge` is the one place where
//! two rows are checked for agreement on all shared variables.

use super::row::Row;
use super::var::Var;

/// Reusable accumulator for building rows.
///
/// Join operators own one builder and `reset()` it before each merge, so the
/// scratch buffer is allocated once per operator.
#[derive(Debug)]
pub struct RowBuilder<X> {
    pairs: Vec<(Var, X)>,
}

impl<X> Default for RowBuilder<X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X> RowBuilder<X> {
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Clear for reuse, keeping the allocation.
    #[inline]
    pub fn reset(&mut self) {
        self.pairs.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<X: Clone> RowBuilder<X> {
    /// Add a binding. Ignored if `var` is already bound in the builder.
    pub fn add(&mut self, var: Var, value: X) -> &mut Self {
        if !self.pairs.iter().any(|(v, _)| *v == var) {
            self.pairs.push((var, value));
        }
        self
    }

    /// Add every binding of `row`.
    pub fn add_row(&mut self, row: &Row<X>) -> &mut Self {
        for (var, value) in row.iter() {
            self.add(var.clone(), value.clone());
        }
        self
    }

    /// Produce the row and leave the builder empty.
    pub fn build(&mut self) -> Row<X> {
        let pairs = std::mem::take(&mut self.pairs);
        Row::from_unique(pairs)
    }
}

/// True when `a` and `b` agree on every variable bound in both.
pub fn compatible<X: PartialEq>(a: &Row<X>, b: &Row<X>) -> bool {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().all(|(var, value)| match large.get(var) {
        Some(other) => other == value,
        None => true,
    })
}

/// Merge two rows.
///
/// Returns `None` when the rows disagree on a shared variable; otherwise the
/// combined row: all bindings of `a` followed by the bindings only in `b`.
pub fn merge<X: Clone + PartialEq>(
    a: &Row<X>,
    b: &Row<X>,
    builder: &mut RowBuilder<X>,
) -> Option<Row<X>> {
    if b.is_empty() {
        return Some(a.clone());
    }
    if a.is_empty() {
        return Some(b.clone());
    }
    if !compatible(a, b) {
        return None;
    }

    builder.reset();
    builder.add_row(a);
    for (var, value) in b.iter() {
        if !a.contains(var) {
            builder.pairs.push((var.clone(), value.clone()));
        }
    }
    Some(builder.build())
}
