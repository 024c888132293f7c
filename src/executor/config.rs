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

//! Join operator configuration
//!

use super::diagnostics::Diagnostics;

/// What a merge join does when an input turns out not to be sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsortedPolicy {
    /// Log a warning once per input and keep going; the result may be
    /// missing rows
    #[default]
    Warn,
    /// Stop with [`Error::UnsortedInput`](crate::core::Error::UnsortedInput)
    Fail,
}

/// Configuration shared by the join operators
#[derive(Debug, Clone)]
pub struct JoinConfig {
    /// Verify merge join inputs against the comparator
    /// Default: true
    pub check_order: bool,

    /// Reaction to unsorted merge join input (only when `check_order`)
    /// Default: Warn
    pub unsorted_policy: UnsortedPolicy,

    /// Pipeline hash join: drop the table of the still-running side once
    /// the other side is exhausted
    /// Default: true
    pub release_exhausted: bool,

    /// Explain / trace output
    /// Default: none
    pub diagnostics: Diagnostics,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            check_order: true,
            unsorted_policy: UnsortedPolicy::Warn,
            release_exhausted: true,
            diagnostics: Diagnostics::none(),
        }
    }
}

impl JoinConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on unsorted merge join input instead of warning
    pub fn strict() -> Self {
        Self::default().with_unsorted_policy(UnsortedPolicy::Fail)
    }

    pub fn with_check_order(mut self, enabled: bool) -> Self {
        self.check_order = enabled;
        self
    }

    pub fn with_unsorted_policy(mut self, policy: UnsortedPolicy) -> Self {
        self.unsorted_policy = policy;
        self
    }

    pub fn with_release_exhausted(mut self, enabled: bool) -> Self {
        self.release_exhausted = enabled;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}
