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

//! Join keys
//!
//! A join key is the ordered set of variables a join hashes, sorts or probes
//! on. Operators accept `Option<JoinKey>`: `None` means no key was computed
//! upstream and behaves exactly like an empty key.

use std::fmt;

use smallvec::SmallVec;

use super::row::Row;
use super::var::{Var, VarSet};

/// Ordered, deduplicated sequence of join variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinKey {
    vars: SmallVec<[Var; 2]>,
}

impl JoinKey {
    /// Create a key; duplicates are dropped, first occurrence kept.
    pub fn new(vars: impl IntoIterator<Item = Var>) -> Self {
        let mut key = JoinKey::default();
        for var in vars {
            if !key.vars.contains(&var) {
                key.vars.push(var);
            }
        }
        key
    }

    /// Single-variable key
    pub fn single(var: Var) -> Self {
        let mut vars = SmallVec::new();
        vars.push(var);
        JoinKey { vars }
    }

    /// Key made of the variables both inputs may bind, in left order.
    pub fn shared(left: &VarSet, right: &VarSet) -> Self {
        JoinKey::new(left.intersection(right).iter().cloned())
    }

    /// True when every key variable appears in `vars`.
    pub fn is_covered_by(&self, vars: &VarSet) -> bool {
        vars.contains_all(self.vars.iter())
    }

    /// True when `row` binds every key variable.
    pub fn is_bound_by<X>(&self, row: &Row<X>) -> bool {
        self.vars.iter().all(|var| row.contains(var))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Var> {
        self.vars.iter()
    }

    /// First key variable, if any.
    pub fn first(&self) -> Option<&Var> {
        self.vars.first()
    }
}

impl<'a> IntoIterator for &'a JoinKey {
    type Item = &'a Var;
    type IntoIter = std::slice::Iter<'a, Var>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JoinKey(")?;
        for (i, var) in self.vars.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", var)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::var::vars;

    #[test]
    fn test_new_dedups() {
        let key = JoinKey::new(vec![Var::new("a"), Var::new("b"), Var::new("a")]);
        assert_eq!(key.len(), 2);
        assert_eq!(key.to_string(), "JoinKey(?a, ?b)");
        assert_eq!(key.first(), Some(&Var::new("a")));
    }

    #[test]
    fn test_shared_key() {
        let key = JoinKey::shared(&vars(&["s", "p", "o"]), &vars(&["o", "x", "s"]));
        assert_eq!(key, JoinKey::new(vec![Var::new("s"), Var::new("o")]));

        let none = JoinKey::shared(&vars(&["x"]), &vars(&["y"]));
        assert!(none.is_empty());
    }

    #[test]
    fn test_covered_by() {
        let key = JoinKey::single(Var::new("s"));
        assert!(key.is_covered_by(&vars(&["s", "p"])));
        assert!(!key.is_covered_by(&vars(&["p"])));
        assert!(JoinKey::default().is_covered_by(&VarSet::new()));
    }

    #[test]
    fn test_bound_by_row() {
        let key = JoinKey::new(vec![Var::new("k"), Var::new("a")]);
        let full: Row<i64> = Row::from_pairs(vec![(Var::new("k"), 1), (Var::new("a"), 2)]);
        let partial: Row<i64> = Row::from_pairs(vec![(Var::new("k"), 1)]);

        assert!(key.is_bound_by(&full));
        assert!(!key.is_bound_by(&partial));
        assert!(JoinKey::default().is_bound_by(&partial));
    }
}
