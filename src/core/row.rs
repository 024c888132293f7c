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

//! Row type - a partial mapping from variables to terms

use std::fmt;
use std::sync::Arc;

use super::var::Var;

/// One intermediate solution: a partial mapping from variables to values.
///
/// Rows are immutable once built. Storage is an `Arc<[(Var, X)]>`, so cloning
/// a row is O(1) and the same row can sit in several probe-table buckets and
/// candidate lists without being copied.
#[derive(Debug)]
pub struct Row<X> {
    bindings: Arc<[(Var, X)]>,
}

impl<X> Clone for Row<X> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            bindings: Arc::clone(&self.bindings),
        }
    }
}

impl<X> Default for Row<X> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<X> Row<X> {
    /// The row binding nothing (the join identity).
    pub fn empty() -> Self {
        Self {
            bindings: Arc::from(Vec::new()),
        }
    }

    /// Create a row from (variable, value) pairs.
    ///
    /// When a variable appears more than once the first binding wins.
    pub fn from_pairs(pairs: Vec<(Var, X)>) -> Self {
        let mut deduped: Vec<(Var, X)> = Vec::with_capacity(pairs.len());
        for (var, value) in pairs {
            if !deduped.iter().any(|(v, _)| *v == var) {
                deduped.push((var, value));
            }
        }
        Self {
            bindings: Arc::from(deduped),
        }
    }

    /// Build from pairs already known to be duplicate-free.
    #[inline]
    pub(crate) fn from_unique(pairs: Vec<(Var, X)>) -> Self {
        Self {
            bindings: Arc::from(pairs),
        }
    }

    /// The value bound to `var`, if any.
    #[inline]
    pub fn get(&self, var: &Var) -> Option<&X> {
        self.bindings
            .iter()
            .find(|(v, _)| v == var)
            .map(|(_, value)| value)
    }

    #[inline]
    pub fn contains(&self, var: &Var) -> bool {
        self.bindings.iter().any(|(v, _)| v == var)
    }

    /// Variables bound in this row, in binding order.
    pub fn vars(&self) -> impl Iterator<Item = &Var> + '_ {
        self.bindings.iter().map(|(v, _)| v)
    }

    /// (variable, value) pairs in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&Var, &X)> + '_ {
        self.bindings.iter().map(|(v, x)| (v, x))
    }

    /// Number of bound variables
    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// True when both handles point at the same storage.
    #[inline]
    pub fn ptr_eq(&self, other: &Row<X>) -> bool {
        Arc::ptr_eq(&self.bindings, &other.bindings)
    }
}

/// Equality is on the set of bindings; binding order does not matter.
impl<X: PartialEq> PartialEq for Row<X> {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.bindings
            .iter()
            .all(|(var, value)| other.get(var) == Some(value))
    }
}

impl<X: Eq> Eq for Row<X> {}

impl<X> FromIterator<(Var, X)> for Row<X> {
    fn from_iter<I: IntoIterator<Item = (Var, X)>>(iter: I) -> Self {
        Row::from_pairs(iter.into_iter().collect())
    }
}

impl<X: fmt::Display> fmt::Display for Row<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, value)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", var, value)?;
        }
        write!(f, "}}")
    }
}
