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

//! Join diagnostics: per-operator counters and explain/trace switches.
//!
//! Every operator carries its own [`Diagnostics`] value, handed in through
//! [`JoinConfig`](super::JoinConfig). The default does nothing beyond the
//! warnings that are always logged.

use std::fmt;

use log::{info, trace};

/// Counters kept by a join operator while it runs.
///
/// Not part of the functional contract; read them with `stats()` after the
/// operator is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Rows pulled from the left input
    pub left_rows: usize,
    /// Rows pulled from the right input
    pub right_rows: usize,
    /// Rows emitted
    pub results: usize,
    /// Probe / lookup operations performed
    pub probes: usize,
    /// Largest hash bucket or tie group seen
    pub max_bucket: usize,
}

impl fmt::Display for JoinStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "left={} right={} results={} probes={} max_bucket={}",
            self.left_rows, self.right_rows, self.results, self.probes, self.max_bucket
        )
    }
}

/// Explain / trace switches for one operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Log a stats summary when the operator is exhausted
    pub explain: bool,
    /// Log per-probe detail
    pub trace: bool,
}

impl Diagnostics {
    /// No explain or trace output.
    pub fn none() -> Self {
        Self::default()
    }

    /// Summary at exhaustion.
    pub fn explain() -> Self {
        Self {
            explain: true,
            trace: false,
        }
    }

    /// Summary plus per-probe detail.
    pub fn traced() -> Self {
        Self {
            explain: true,
            trace: true,
        }
    }

    /// Emit the end-of-stream summary for `operator`.
    pub fn report(&self, operator: &str, stats: &JoinStats) {
        if self.explain {
            info!("{}: {}", operator, stats);
        }
    }

    /// Emit per-probe detail.
    #[inline]
    pub fn probe(&self, operator: &str, probe: &dyn fmt::Debug, candidates: usize) {
        if self.trace {
            trace!("{}: probe {:?} -> {} candidates", operator, probe, candidates);
        }
    }
}
