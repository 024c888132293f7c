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

//! Join algorithm comparison on the same inputs
//!
//! Run with: cargo bench --bench join_algorithms
//!
//! Both inputs bind ?k (sorted ascending, so the merge join runs without
//! falling back) plus one private variable each. The inner loop join only
//! runs on the small size.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use sparql_join::core::{JoinKey, Row, Term, Var};
use sparql_join::executor::{
    collect_rows, join, AccessPattern, JoinAlgorithm, JoinConfig, MaterializedRows, Slot,
    SubstitutionJoin, TupleIndex,
};

const SIZES: [usize; 2] = [1_000, 10_000];
const KEY_SPACE: usize = 500;

/// Rows {?k, ?<own>} with ?k cycling through KEY_SPACE values, sorted on ?k
fn make_rows(count: usize, own: &str) -> Vec<Row<Term>> {
    let mut rows: Vec<Row<Term>> = (0..count)
        .map(|i| {
            Row::from_pairs(vec![
                (Var::new("k"), Term::integer((i % KEY_SPACE) as i64)),
                (Var::new(own), Term::integer(i as i64)),
            ])
        })
        .collect();
    rows.sort_by_key(|row| row.get(&Var::new("k")).and_then(Term::as_integer));
    rows
}

fn bench_join_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_algorithms");
    let key = JoinKey::single(Var::new("k"));

    for size in SIZES {
        let left = make_rows(size, "a");
        let right = make_rows(size, "b");

        for algorithm in JoinAlgorithm::ALL {
            if algorithm == JoinAlgorithm::InnerLoop && size > SIZES[0] {
                continue;
            }
            group.bench_with_input(BenchmarkId::new(algorithm.as_str(), size), &size, |b, _| {
                b.iter(|| {
                    let mut op = join(
                        algorithm,
                        Some(key.clone()),
                        Box::new(MaterializedRows::from_rows(left.clone())),
                        Box::new(MaterializedRows::from_rows(right.clone())),
                        JoinConfig::default(),
                    );
                    black_box(collect_rows(&mut op).unwrap().len())
                });
            });
        }
    }

    group.finish();
}

fn bench_substitution_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("substitution_join");

    let index = Arc::new(TupleIndex::from_tuples((0..10_000i64).map(|i| {
        vec![
            Term::integer(i % 1_000),
            Term::iri("value"),
            Term::integer(i),
        ]
    })));
    let pattern = AccessPattern::new(vec![
        Slot::var("k"),
        Slot::constant(Term::iri("value")),
        Slot::var("v"),
    ]);
    let left: Vec<Row<Term>> = (0..100i64)
        .map(|i| Row::from_pairs(vec![(Var::new("k"), Term::integer(i))]))
        .collect();

    group.bench_function("lookup_100", |b| {
        b.iter(|| {
            let mut op = SubstitutionJoin::new(
                Box::new(MaterializedRows::from_rows(left.clone())),
                pattern.clone(),
                index.clone(),
                JoinConfig::default(),
            );
            black_box(collect_rows(&mut op).unwrap().len())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_join_algorithms, bench_substitution_join);
criterion_main!(benches);
