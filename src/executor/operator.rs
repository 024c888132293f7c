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

//! Volcano-style row stream interface.
//!
//! Every join operator consumes row streams and is itself a row stream, so
//! joins compose into pipelines where the consumer pulls one row at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ Consumer     │ ← Pulls rows via next()
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │ Join         │ ← One side materialized or both streamed
//! └──────┬───────┘
//!        │
//! ┌──────┴──────┐
//! │             │
//! ▼             ▼
//! ┌─────┐   ┌─────┐
//! │Rows │   │Rows │ ← Upstream row sources
//! └─────┘   └─────┘
//! ```
//!
//! Nothing here spawns threads or blocks. Between two `next()` calls an
//! operator is suspended with all of its position state held in fields;
//! a consumer cancels simply by not pulling again.

use crate::core::{Result, Row, TermValue, VarSet};

/// Pull-based stream of rows.
///
/// The lifecycle follows the open-next-close pattern:
///
/// 1. `open()` - Initialize the stream (called once)
/// 2. `next()` - Get the next row (called repeatedly until None)
/// 3. `close()` - Release resources (called once at end)
///
/// Streams are `Send` so a pipeline can be moved to another thread,
/// but a single stream is driven by one caller at a time.
pub trait RowStream<X: TermValue>: Send {
    /// Initialize the stream.
    ///
    /// Join operators open their inputs here; materializing joins also
    /// run their build phase here.
    fn open(&mut self) -> Result<()>;

    /// Get the next row.
    ///
    /// Returns:
    /// - `Ok(Some(row))` - A row is available
    /// - `Ok(None)` - No more rows (exhausted)
    /// - `Err(e)` - An error occurred
    ///
    /// After returning `None`, subsequent calls keep returning `None`.
    fn next(&mut self) -> Result<Option<Row<X>>>;

    /// Close the stream and its inputs.
    fn close(&mut self) -> Result<()>;

    /// Variables rows of this stream may bind.
    fn vars(&self) -> &VarSet;

    /// Row count estimate, if known.
    fn estimated_rows(&self) -> Option<usize> {
        None
    }

    /// Descriptive name (for explain output).
    fn name(&self) -> &str;
}

impl<X: TermValue> RowStream<X> for Box<dyn RowStream<X>> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn next(&mut self) -> Result<Option<Row<X>>> {
        (**self).next()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn vars(&self) -> &VarSet {
        (**self).vars()
    }

    fn estimated_rows(&self) -> Option<usize> {
        (**self).estimated_rows()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Drive a stream through open/next/close and collect every row.
pub fn collect_rows<X: TermValue>(stream: &mut dyn RowStream<X>) -> Result<Vec<Row<X>>> {
    let mut rows = Vec::new();
    stream.open()?;
    while let Some(row) = stream.next()? {
        rows.push(row);
    }
    stream.close()?;
    Ok(rows)
}

/// Pull every remaining row of an opened stream into a vector.
pub(crate) fn drain<X: TermValue>(stream: &mut dyn RowStream<X>) -> Result<Vec<Row<X>>> {
    let mut rows = Vec::new();
    while let Some(row) = stream.next()? {
        rows.push(row);
    }
    Ok(rows)
}

// ============================================================================
// Row Sources
// ============================================================================

/// A stream that produces no rows.
pub struct EmptyRows {
    vars: VarSet,
}

impl EmptyRows {
    pub fn new(vars: VarSet) -> Self {
        Self { vars }
    }
}

impl Default for EmptyRows {
    fn default() -> Self {
        Self::new(VarSet::new())
    }
}

impl<X: TermValue> RowStream<X> for EmptyRows {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Row<X>>> {
        Ok(None)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn estimated_rows(&self) -> Option<usize> {
        Some(0)
    }

    fn name(&self) -> &str {
        "Empty"
    }
}

/// A stream over a pre-materialized vector of rows.
pub struct MaterializedRows<X> {
    rows: Vec<Row<X>>,
    vars: VarSet,
    current_idx: usize,
}

impl<X: TermValue> MaterializedRows<X> {
    pub fn new(rows: Vec<Row<X>>, vars: VarSet) -> Self {
        Self {
            rows,
            vars,
            current_idx: 0,
        }
    }

    /// Create from rows, deriving the variable set from the rows themselves.
    pub fn from_rows(rows: Vec<Row<X>>) -> Self {
        let mut vars = VarSet::new();
        for row in &rows {
            for var in row.vars() {
                vars.insert(var.clone());
            }
        }
        Self::new(rows, vars)
    }
}

impl<X: TermValue> RowStream<X> for MaterializedRows<X> {
    fn open(&mut self) -> Result<()> {
        self.current_idx = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Row<X>>> {
        match self.rows.get(self.current_idx) {
            Some(row) => {
                self.current_idx += 1;
                // O(1): rows share their storage
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn estimated_rows(&self) -> Option<usize> {
        Some(self.rows.len())
    }

    fn name(&self) -> &str {
        "Materialized"
    }
}

/// A stream that pulls rows lazily from an iterator.
///
/// Errors produced by the iterator are passed through unchanged.
pub struct IterRows<X, I> {
    iter: I,
    vars: VarSet,
    exhausted: bool,
    _marker: std::marker::PhantomData<fn() -> X>,
}

impl<X, I> IterRows<X, I>
where
    X: TermValue,
    I: Iterator<Item = Result<Row<X>>> + Send,
{
    pub fn new(vars: VarSet, iter: I) -> Self {
        Self {
            iter,
            vars,
            exhausted: false,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<X, I> RowStream<X> for IterRows<X, I>
where
    X: TermValue,
    I: Iterator<Item = Result<Row<X>>> + Send,
{
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Row<X>>> {
        if self.exhausted {
            return Ok(None);
        }
        match self.iter.next() {
            Some(row) => row.map(Some),
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn name(&self) -> &str {
        "Iter"
    }
}

/// Wrap a row iterator as a stream with the given variable set.
pub fn create_row_list<X, I>(vars: VarSet, iter: I) -> Box<dyn RowStream<X>>
where
    X: TermValue,
    I: IntoIterator<Item = Result<Row<X>>>,
    I::IntoIter: Send + 'static,
{
    Box::new(IterRows::new(vars, iter.into_iter()))
}
