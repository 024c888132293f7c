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

//! Error types for the join core
//!
//! Join operators never raise errors of their own for empty inputs, merge
//! conflicts or unusual join keys. What remains here are failures coming from
//! upstream sources, from the index accessor, protocol misuse, and the opt-in
//! fail-fast mode for unsorted merge join input.

use std::fmt;

use thiserror::Error;

/// Result type alias for join operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which input of a binary join an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinSide {
    Left,
    Right,
}

impl JoinSide {
    /// The opposite input.
    #[inline]
    pub fn other(self) -> Self {
        match self {
            JoinSide::Left => JoinSide::Right,
            JoinSide::Right => JoinSide::Left,
        }
    }
}

impl fmt::Display for JoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinSide::Left => write!(f, "left"),
            JoinSide::Right => write!(f, "right"),
        }
    }
}

/// Main error type for the join core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An upstream row source failed while being iterated
    #[error("row source failed: {0}")]
    Source(String),

    /// The external index accessor failed
    #[error("index access failed: {0}")]
    Access(String),

    /// Merge join input was not ordered by the join key
    #[error("{side} input of merge join is not sorted on the join key (row {position})")]
    UnsortedInput { side: JoinSide, position: usize },

    /// Internal error (operator protocol misuse)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Create an upstream source error
    pub fn source(msg: impl Into<String>) -> Self {
        Error::Source(msg.into())
    }

    /// Create an index access error
    pub fn access(msg: impl Into<String>) -> Self {
        Error::Access(msg.into())
    }

    /// Check if this error reports unsorted merge join input
    pub fn is_ordering_violation(&self) -> bool {
        matches!(self, Error::UnsortedInput { .. })
    }
}
