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

//! Hash probe table for join operations.
//!
//! The table indexes one side of a join by the hash of its join-key bindings.
//! Rows that bind none of the key variables cannot be hashed; they live in a
//! separate no-key bucket and are handed out as candidates for every probe.
//!
//! # Memory Layout
//!
//! ```text
//! HashProbeTable
//! ├── rows: Vec<Row>                  // Every stored row, insertion order
//! ├── buckets: FxHashMap<u64, Vec<usize>> // Keyed hash → indices into rows
//! └── no_key: Vec<usize>                // Rows binding no key variable
//! ```
//!
//! A bucket is only a pre-filter. Two different key values may share a hash;
//! the caller re-checks every candidate with the row merge.
//!
//! # Example
//!
//! ```
//! use sparql_join::core::{JoinKey, Row, Term, Var};
//! use sparql_join::executor::HashProbeTable;
//!
//! let key = JoinKey::single(Var::new("s"));
//! let mut table = HashProbeTable::new(Some(key));
//!
//! let stored: Row<Term> = Row::from_pairs(vec![(Var::new("s"), Term::iri("a"))]);
//! table.put(stored.clone());
//!
//! let probe: Row<Term> = Row::from_pairs(vec![(Var::new("s"), Term::iri("a"))]);
//! assert_eq!(table.get_candidates(&probe).count(), 1);
//! ```

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use crate::core::{JoinKey, Row, TermValue, Var};

/// Seed of a row's join hash.
const ROW_HASH_SEED: u64 = 31;

/// Seed of a single (variable, value) contribution.
const VAR_HASH_SEED: u64 = 17;

/// Stands in for the variable hash when no variable is given.
const NULL_VAR_CODE: u64 = 0x9e37_79b9_7f4a_7c15;

/// Stands in for the value hash when no value is given.
const NULL_VALUE_CODE: u64 = 0xc2b2_ae3d_27d4_eb4f;

/// Join hash of a row.
///
/// `NoKey` is a separate tag, not a reserved number, so no computed hash can
/// ever be mistaken for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinHash {
    /// Hash over the row's key bindings
    Keyed(u64),
    /// The row cannot be placed by its key bindings
    NoKey,
}

impl JoinHash {
    #[inline]
    pub fn is_keyed(&self) -> bool {
        matches!(self, JoinHash::Keyed(_))
    }
}

#[inline]
fn fx_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash contribution of one (variable, value) pair.
///
/// Either part may be absent; a fixed code is mixed in instead.
#[inline]
pub fn hash_var<X: TermValue>(var: Option<&Var>, value: Option<&X>) -> u64 {
    let mut h = VAR_HASH_SEED;
    h ^= var.map_or(NULL_VAR_CODE, fx_hash);
    h ^= value.map_or(NULL_VALUE_CODE, fx_hash);
    h
}

/// Join hash of `row` with respect to `key`.
///
/// The contributions of the key variables are combined with XOR, so the
/// result does not depend on key order. A row that binds none of the key
/// variables, or a missing / empty key, yields [`JoinHash::NoKey`].
///
/// A multi-variable key where the row binds only some of the variables also
/// yields `NoKey`: a partial hash cannot be compared with the hash of a row
/// binding all of them, while the no-key bucket is offered to every probe.
pub fn hash_row<X: TermValue>(key: Option<&JoinKey>, row: &Row<X>) -> JoinHash {
    let key = match key {
        Some(key) if !key.is_empty() => key,
        _ => return JoinHash::NoKey,
    };

    let mut h = ROW_HASH_SEED;
    for var in key {
        match row.get(var) {
            Some(value) => h ^= hash_var(Some(var), Some(value)),
            None => return JoinHash::NoKey,
        }
    }
    JoinHash::Keyed(h)
}

/// Build-then-probe index over one side of a join.
pub struct HashProbeTable<X> {
    key: Option<JoinKey>,

    /// All stored rows; buckets hold indices into this vector.
    rows: Vec<Row<X>>,

    /// Keyed hash → row indices, insertion order within a bucket.
    buckets: FxHashMap<u64, Vec<usize>>,

    /// Rows binding no key variable.
    no_key: Vec<usize>,

    /// Largest bucket seen (diagnostics only).
    max_bucket: usize,
}

impl<X: TermValue> HashProbeTable<X> {
    /// Create an empty table for the given key.
    pub fn new(key: Option<JoinKey>) -> Self {
        Self {
            key,
            rows: Vec::new(),
            buckets: FxHashMap::default(),
            no_key: Vec::new(),
            max_bucket: 0,
        }
    }

    /// Create a table with room for `row_count` rows.
    pub fn with_capacity(key: Option<JoinKey>, row_count: usize) -> Self {
        let mut table = Self::new(key);
        table.rows.reserve(row_count);
        table.buckets.reserve(row_count);
        table
    }

    /// Build a table from rows.
    pub fn build(key: Option<JoinKey>, rows: impl IntoIterator<Item = Row<X>>) -> Self {
        let mut table = Self::new(key);
        for row in rows {
            table.put(row);
        }
        table
    }

    /// The key this table hashes on.
    pub fn key(&self) -> Option<&JoinKey> {
        self.key.as_ref()
    }

    /// Join hash of `row` under this table's key.
    #[inline]
    pub fn hash(&self, row: &Row<X>) -> JoinHash {
        hash_row(self.key.as_ref(), row)
    }

    /// Insert a row into its hash bucket or into the no-key bucket.
    pub fn put(&mut self, row: Row<X>) {
        let idx = self.rows.len();
        match self.hash(&row) {
            JoinHash::Keyed(h) => {
                let bucket = self.buckets.entry(h).or_default();
                bucket.push(idx);
                self.max_bucket = self.max_bucket.max(bucket.len());
            }
            JoinHash::NoKey => {
                self.no_key.push(idx);
            }
        }
        self.rows.push(row);
    }

    /// Candidate partners for `probe`.
    ///
    /// - Keyed probe: rows of the matching bucket, then every no-key row.
    /// - No-key probe: every stored row.
    ///
    /// Candidates are not filtered; merge each one to confirm the match.
    pub fn get_candidates<'a>(&'a self, probe: &Row<X>) -> Candidates<'a, X> {
        Candidates {
            table: self,
            cursor: self.cursor(probe),
        }
    }

    /// Position-only candidate cursor for `probe`.
    ///
    /// Unlike [`get_candidates`](Self::get_candidates) it does not borrow the
    /// table, so an operator can keep it in a field between `next()` calls.
    /// Advance it with [`CandidateCursor::next_row`] against the same,
    /// unmodified table.
    pub fn cursor(&self, probe: &Row<X>) -> CandidateCursor {
        match self.hash(probe) {
            JoinHash::Keyed(h) => CandidateCursor::Keyed {
                hash: h,
                bucket_pos: 0,
                no_key_pos: 0,
            },
            JoinHash::NoKey => CandidateCursor::All { pos: 0 },
        }
    }

    /// Number of candidates `probe` would get.
    pub fn candidate_count(&self, probe: &Row<X>) -> usize {
        match self.hash(probe) {
            JoinHash::Keyed(h) => {
                self.buckets.get(&h).map_or(0, |b| b.len()) + self.no_key.len()
            }
            JoinHash::NoKey => self.rows.len(),
        }
    }

    /// Release all stored rows. The key is kept.
    pub fn clear(&mut self) {
        self.rows = Vec::new();
        self.buckets = FxHashMap::default();
        self.no_key = Vec::new();
    }

    /// Number of stored rows
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of keyed buckets
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of rows in the no-key bucket
    #[inline]
    pub fn no_key_len(&self) -> usize {
        self.no_key.len()
    }

    /// Size of the largest keyed bucket seen since creation.
    #[inline]
    pub fn max_bucket(&self) -> usize {
        self.max_bucket
    }
}

/// Position in a table's candidate sequence for one probe row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateCursor {
    /// Matching bucket first, then the no-key bucket
    Keyed {
        hash: u64,
        bucket_pos: usize,
        no_key_pos: usize,
    },
    /// Every stored row in insertion order
    All { pos: usize },
    /// No candidates left
    Done,
}

impl CandidateCursor {
    /// Advance and return the next candidate from `table`.
    pub fn next_row<'a, X: TermValue>(
        &mut self,
        table: &'a HashProbeTable<X>,
    ) -> Option<&'a Row<X>> {
        match self {
            CandidateCursor::Keyed {
                hash,
                bucket_pos,
                no_key_pos,
            } => {
                if let Some(bucket) = table.buckets.get(&*hash) {
                    if let Some(&idx) = bucket.get(*bucket_pos) {
                        *bucket_pos += 1;
                        return table.rows.get(idx);
                    }
                }
                if let Some(&idx) = table.no_key.get(*no_key_pos) {
                    *no_key_pos += 1;
                    return table.rows.get(idx);
                }
                *self = CandidateCursor::Done;
                None
            }
            CandidateCursor::All { pos } => match table.rows.get(*pos) {
                Some(row) => {
                    *pos += 1;
                    Some(row)
                }
                None => {
                    *self = CandidateCursor::Done;
                    None
                }
            },
            CandidateCursor::Done => None,
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, CandidateCursor::Done)
    }
}

/// Borrowing iterator over the candidates of one probe row.
pub struct Candidates<'a, X> {
    table: &'a HashProbeTable<X>,
    cursor: CandidateCursor,
}

impl<'a, X: TermValue> Iterator for Candidates<'a, X> {
    type Item = &'a Row<X>;

    #[inline]
    fn next(&mut self) -> Option<&'a Row<X>> {
        self.cursor.next_row(self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Term;

    fn make_row(pairs: &[(&str, i64)]) -> Row<Term> {
        pairs
            .iter()
            .map(|(v, n)| (Var::new(v), Term::integer(*n)))
            .collect()
    }

    fn key(names: &[&str]) -> Option<JoinKey> {
        Some(JoinKey::new(names.iter().map(|n| Var::new(n))))
    }

    #[test]
    fn test_basic_put_and_probe() {
        let mut table = HashProbeTable::new(key(&["k"]));
        table.put(make_row(&[("k", 1), ("a", 10)]));
        table.put(make_row(&[("k", 2), ("a", 20)]));
        table.put(make_row(&[("k", 1), ("a", 30)]));

        assert_eq!(table.len(), 3);
        assert_eq!(table.max_bucket(), 2);

        let matches: Vec<_> = table.get_candidates(&make_row(&[("k", 1)])).collect();
        assert_eq!(
            matches,
            vec![
                &make_row(&[("k", 1), ("a", 10)]),
                &make_row(&[("k", 1), ("a", 30)])
            ]
        );

        // No matching bucket and no no-key rows: empty, not an error
        assert_eq!(table.get_candidates(&make_row(&[("k", 9)])).count(), 0);
    }

    #[test]
    fn test_no_key_rows_follow_bucket() {
        let mut table = HashProbeTable::new(key(&["k"]));
        table.put(make_row(&[("a", 1)]));
        table.put(make_row(&[("k", 5), ("a", 2)]));

        assert_eq!(table.no_key_len(), 1);
        assert_eq!(table.bucket_count(), 1);

        let matches: Vec<_> = table.get_candidates(&make_row(&[("k", 5)])).collect();
        assert_eq!(
            matches,
            vec![&make_row(&[("k", 5), ("a", 2)]), &make_row(&[("a", 1)])]
        );

        // Unmatched key still sees the key-less row
        let matches: Vec<_> = table.get_candidates(&make_row(&[("k", 6)])).collect();
        assert_eq!(matches, vec![&make_row(&[("a", 1)])]);
    }

    #[test]
    fn test_no_key_probe_sees_everything() {
        let mut table = HashProbeTable::new(key(&["k"]));
        table.put(make_row(&[("k", 1)]));
        table.put(make_row(&[("b", 1)]));
        table.put(make_row(&[("k", 2)]));

        let probe = make_row(&[("z", 0)]);
        assert_eq!(table.hash(&probe), JoinHash::NoKey);
        assert_eq!(table.get_candidates(&probe).count(), 3);
        assert_eq!(table.candidate_count(&probe), 3);
    }

    #[test]
    fn test_missing_or_empty_key() {
        let row = make_row(&[("k", 1)]);
        assert_eq!(hash_row(None, &row), JoinHash::NoKey);
        assert_eq!(hash_row(Some(&JoinKey::default()), &row), JoinHash::NoKey);

        let mut table = HashProbeTable::new(None);
        table.put(row.clone());
        table.put(make_row(&[("k", 2)]));
        assert_eq!(table.no_key_len(), 2);
        assert_eq!(table.get_candidates(&row).count(), 2);
    }

    #[test]
    fn test_partial_multi_key_goes_to_no_key() {
        let key = key(&["a", "b"]);
        assert!(hash_row(key.as_ref(), &make_row(&[("a", 1), ("b", 2)])).is_keyed());
        assert_eq!(
            hash_row(key.as_ref(), &make_row(&[("a", 1)])),
            JoinHash::NoKey
        );
    }

    #[test]
    fn test_hash_ignores_non_key_and_key_order() {
        let k1 = key(&["a", "b"]);
        let k2 = key(&["b", "a"]);
        let r1 = make_row(&[("a", 1), ("b", 2), ("c", 3)]);
        let r2 = make_row(&[("b", 2), ("a", 1), ("c", 99)]);

        assert_eq!(hash_row(k1.as_ref(), &r1), hash_row(k1.as_ref(), &r2));
        assert_eq!(hash_row(k1.as_ref(), &r1), hash_row(k2.as_ref(), &r1));
    }

    #[test]
    fn test_hash_var_tolerates_absent_parts() {
        let v = Var::new("x");
        let t = Term::integer(1);
        let full = hash_var(Some(&v), Some(&t));
        assert_eq!(full, hash_var(Some(&v), Some(&t)));
        assert_ne!(full, hash_var::<Term>(Some(&v), None));
        assert_ne!(hash_var(None, Some(&t)), hash_var::<Term>(None, None));
    }

    #[test]
    fn test_cursor_survives_between_calls() {
        let table = HashProbeTable::build(
            key(&["k"]),
            vec![make_row(&[("k", 1), ("a", 1)]), make_row(&[("k", 1), ("a", 2)])],
        );
        let mut cursor = table.cursor(&make_row(&[("k", 1)]));

        assert_eq!(cursor.next_row(&table), Some(&make_row(&[("k", 1), ("a", 1)])));
        assert_eq!(cursor.next_row(&table), Some(&make_row(&[("k", 1), ("a", 2)])));
        assert!(cursor.next_row(&table).is_none());
        assert!(cursor.is_done());
        assert!(cursor.next_row(&table).is_none());
    }

    #[test]
    fn test_clear() {
        let mut table = HashProbeTable::with_capacity(key(&["k"]), 4);
        table.put(make_row(&[("k", 1)]));
        table.put(make_row(&[("x", 1)]));
        table.clear();

        assert!(table.is_empty());
        assert_eq!(table.no_key_len(), 0);
        assert_eq!(table.get_candidates(&make_row(&[("k", 1)])).count(), 0);
        assert!(table.key().is_some());
    }

    #[test]
    fn test_bucket_indices_point_at_stored_rows() {
        let mut table = HashProbeTable::new(key(&["k"]));
        for i in 0..1_000 {
            table.put(make_row(&[("k", i % 7), ("n", i)]));
        }
        table.put(make_row(&[("n", -1)]));

        for (&hash, bucket) in &table.buckets {
            for &idx in bucket {
                let row = &table.rows[idx];
                assert_eq!(table.hash(row), JoinHash::Keyed(hash));
            }
        }
        assert_eq!(table.no_key.len(), 1);
        assert_eq!(table.hash(&table.rows[table.no_key[0]]), JoinHash::NoKey);

        let candidates = table.get_candidates(&make_row(&[("k", 3)])).count();
        // 1000 / 7 rounded up for k=3, plus the no-key row
        assert_eq!(candidates, 143 + 1);
    }
}
