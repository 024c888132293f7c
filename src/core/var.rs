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

//! Query variables and variable sets

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

/// A query variable such as `?s`.
///
/// Cloning is O(1): the name is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(Arc<str>);

impl Var {
    /// Create a variable. A leading `?` or `$` is stripped.
    pub fn new(name: &str) -> Self {
        let name = name
            .strip_prefix('?')
            .or_else(|| name.strip_prefix('$'))
            .unwrap_or(name);
        Var(Arc::from(name))
    }

    /// The variable name without the `?` marker.
    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

impl From<&str> for Var {
    fn from(name: &str) -> Self {
        Var::new(name)
    }
}

/// Ordered, duplicate-free set of variables.
///
/// Streams expose the variables they may bind through a `VarSet`.
/// Insertion order is kept so derived keys are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarSet {
    vars: SmallVec<[Var; 4]>,
}

impl VarSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable; returns false when it was already present.
    pub fn insert(&mut self, var: Var) -> bool {
        if self.contains(&var) {
            return false;
        }
        self.vars.push(var);
        true
    }

    #[inline]
    pub fn contains(&self, var: &Var) -> bool {
        self.vars.iter().any(|v| v == var)
    }

    /// True when every variable of `vars` is in this set.
    pub fn contains_all<'a>(&self, mut vars: impl Iterator<Item = &'a Var>) -> bool {
        vars.all(|v| self.contains(v))
    }

    /// Variables of `self` followed by the ones only in `other`.
    pub fn union(&self, other: &VarSet) -> VarSet {
        let mut out = self.clone();
        for var in other.iter() {
            out.insert(var.clone());
        }
        out
    }

    /// Variables present in both sets, in `self` order.
    pub fn intersection(&self, other: &VarSet) -> VarSet {
        self.iter()
            .filter(|v| other.contains(v))
            .cloned()
            .collect()
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

    pub fn as_slice(&self) -> &[Var] {
        &self.vars
    }
}

impl FromIterator<Var> for VarSet {
    fn from_iter<I: IntoIterator<Item = Var>>(iter: I) -> Self {
        let mut set = VarSet::new();
        for var in iter {
            set.insert(var);
        }
        set
    }
}

impl<'a> IntoIterator for &'a VarSet {
    type Item = &'a Var;
    type IntoIter = std::slice::Iter<'a, Var>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}

impl fmt::Display for VarSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, var) in self.vars.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", var)?;
        }
        write!(f, "]")
    }
}

/// Build a [`VarSet`] from variable names.
pub fn vars(names: &[&str]) -> VarSet {
    names.iter().map(|n| Var::new(n)).collect()
}
