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

//! Term values bound to variables
//!
//! The join core is generic over the term type; anything satisfying
//! [`TermValue`] can be bound in a [`Row`](super::Row). [`Term`] is the
//! default RDF-style term used by the crate's tests and benchmarks.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Bounds required from a term type by the join operators.
pub trait TermValue: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> TermValue for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// An RDF-style term.
///
/// Ordering follows the SPARQL ORDER BY family order: blank nodes, then IRIs,
/// then literals. Integers order numerically among themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// Blank node label
    Blank(Arc<str>),
    /// IRI
    Iri(Arc<str>),
    /// xsd:integer literal
    Integer(i64),
    /// Plain string literal
    Literal(Arc<str>),
}

impl Term {
    pub fn iri(iri: &str) -> Self {
        Term::Iri(Arc::from(iri))
    }

    pub fn literal(lexical: &str) -> Self {
        Term::Literal(Arc::from(lexical))
    }

    pub fn integer(value: i64) -> Self {
        Term::Integer(value)
    }

    pub fn blank(label: &str) -> Self {
        Term::Blank(Arc::from(label))
    }

    /// Integer value, if this is an integer literal
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Term::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Integer(_) | Term::Literal(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Blank(label) => write!(f, "_:{}", label),
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Integer(i) => write!(f, "{}", i),
            Term::Literal(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Integer(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::literal(value)
    }
}
