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

//! Core types shared by all join operators
//!
//! - [`Var`] / [`VarSet`] - Query variables
//! - [`Term`] - Default term type; any [`TermValue`] works
//! - [`Row`] - A partial variable → value mapping
//! - [`RowBuilder`], [`merge`], [`compatible`] - Row combination
//! - [`JoinKey`] - Variables a join hashes / sorts / probes on
//! - [`Error`] - Error types

pub mod error;
pub mod join_key;
pub mod row;
pub mod row_builder;
pub mod term;
pub mod var;

pub use error::{Error, JoinSide, Result};
pub use join_key::JoinKey;
pub use row::Row;
pub use row_builder::{compatible, merge, RowBuilder};
pub use term::{Term, TermValue};
pub use var::{vars, Var, VarSet};
