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

//! Join Scenario Tests
//!
//! End-to-end tests through the public API:
//! - Key joins, key-less cross products and tie groups for every algorithm
//! - Rows that bind no key variable
//! - Merge conflicts on non-key variables
//! - Empty inputs and upstream errors
//! - OPTIONAL (left outer) joins and substitution joins over an index

use std::sync::Arc;

use sparql_join::core::{vars, Error, JoinKey, Row, Term, Var, VarSet};
use sparql_join::executor::{
    collect_rows, create_row_list, inner_loop_join_all, join, AccessPattern, AccessRows, Diagnostics,
    HashJoin, InnerLoopJoin, JoinAlgorithm, JoinConfig, MaterializedRows, RowStream, Slot,
    SubstitutionJoin, TupleIndex,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn row(pairs: &[(&str, &str)]) -> Row<Term> {
    pairs
        .iter()
        .map(|(v, t)| (Var::new(v), Term::literal(t)))
        .collect()
}

fn stream(rows: &[Row<Term>]) -> Box<dyn RowStream<Term>> {
    Box::new(MaterializedRows::from_rows(rows.to_vec()))
}

fn key(names: &[&str]) -> Option<JoinKey> {
    Some(JoinKey::new(names.iter().map(|n| Var::new(n))))
}

/// Bindings of every row as sorted (var, term) strings, rows sorted too
fn canonical(rows: &[Row<Term>]) -> Vec<Vec<(String, String)>> {
    let mut out: Vec<Vec<(String, String)>> = rows
        .iter()
        .map(|r| {
            let mut pairs: Vec<(String, String)> = r
                .iter()
                .map(|(v, t)| (v.name().to_string(), t.to_string()))
                .collect();
            pairs.sort();
            pairs
        })
        .collect();
    out.sort();
    out
}

fn run(
    algorithm: JoinAlgorithm,
    key: Option<JoinKey>,
    left: &[Row<Term>],
    right: &[Row<Term>],
) -> Vec<Row<Term>> {
    let mut op = join(
        algorithm,
        key,
        stream(left),
        stream(right),
        JoinConfig::default().with_diagnostics(Diagnostics::traced()),
    );
    collect_rows(&mut op).unwrap()
}

// ============================================================================
// Scenarios shared by all algorithms
// ============================================================================

#[test]
fn test_single_key_join_all_algorithms() {
    init_logging();

    let left = vec![row(&[("s", "a"), ("p", "p1")])];
    let right = vec![row(&[("s", "a"), ("o", "o1")]), row(&[("s", "b"), ("o", "o2")])];
    let expected = vec![row(&[("s", "a"), ("p", "p1"), ("o", "o1")])];

    for algorithm in JoinAlgorithm::ALL {
        let results = run(algorithm, key(&["s"]), &left, &right);
        assert_eq!(results, expected, "{}", algorithm);
    }
}

#[test]
fn test_empty_key_cross_product_all_algorithms() {
    let left = vec![row(&[("x", "1")])];
    let right = vec![row(&[("y", "2")])];
    let expected = vec![row(&[("x", "1"), ("y", "2")])];

    for algorithm in JoinAlgorithm::ALL {
        let results = run(algorithm, Some(JoinKey::default()), &left, &right);
        assert_eq!(results, expected, "{}", algorithm);
    }
}

#[test]
fn test_tie_group_all_algorithms() {
    let left = vec![
        row(&[("k", "1"), ("a", "x")]),
        row(&[("k", "1"), ("a", "y")]),
    ];
    let right = vec![row(&[("k", "1"), ("b", "p")])];
    let expected = vec![
        row(&[("k", "1"), ("a", "x"), ("b", "p")]),
        row(&[("k", "1"), ("a", "y"), ("b", "p")]),
    ];

    for algorithm in JoinAlgorithm::ALL {
        let results = run(algorithm, key(&["k"]), &left, &right);
        assert_eq!(canonical(&results), canonical(&expected), "{}", algorithm);
    }
}

#[test]
fn test_merge_conflict_excluded_all_algorithms() {
    let left = vec![row(&[("k", "1"), ("a", "x")])];
    let right = vec![
        row(&[("k", "1"), ("a", "y")]),
        row(&[("k", "1"), ("a", "x"), ("b", "z")]),
    ];

    for algorithm in JoinAlgorithm::ALL {
        let results = run(algorithm, key(&["k"]), &left, &right);
        assert_eq!(
            results,
            vec![row(&[("k", "1"), ("a", "x"), ("b", "z")])],
            "{}",
            algorithm
        );
    }
}

#[test]
fn test_empty_inputs_all_algorithms() {
    let some = vec![row(&[("k", "1")])];

    for algorithm in JoinAlgorithm::ALL {
        assert!(run(algorithm, key(&["k"]), &[], &some).is_empty(), "{}", algorithm);
        assert!(run(algorithm, key(&["k"]), &some, &[]).is_empty(), "{}", algorithm);
        assert!(run(algorithm, key(&["k"]), &[], &[]).is_empty(), "{}", algorithm);
    }
}

#[test]
fn test_multi_variable_key() {
    let left = vec![
        row(&[("s", "a"), ("o", "1"), ("l", "x")]),
        row(&[("s", "a"), ("o", "2"), ("l", "y")]),
    ];
    let right = vec![
        row(&[("s", "a"), ("o", "2"), ("r", "z")]),
        row(&[("s", "b"), ("o", "1"), ("r", "w")]),
    ];
    let expected = vec![row(&[("s", "a"), ("o", "2"), ("l", "y"), ("r", "z")])];

    for algorithm in JoinAlgorithm::ALL {
        let results = run(algorithm, key(&["s", "o"]), &left, &right);
        assert_eq!(results, expected, "{}", algorithm);
    }
}

// ============================================================================
// Rows binding no key variable
// ============================================================================

#[test]
fn test_key_less_rows_pair_with_everything() {
    // The first left row leaves ?k unbound
    let left = vec![row(&[("a", "x")]), row(&[("k", "1"), ("a", "y")])];
    let right = vec![
        row(&[("k", "1"), ("b", "p")]),
        row(&[("k", "2"), ("b", "q")]),
        row(&[("k", "3"), ("a", "other")]),
    ];

    let expected = vec![
        row(&[("a", "x"), ("k", "1"), ("b", "p")]),
        row(&[("a", "x"), ("k", "2"), ("b", "q")]),
        row(&[("k", "1"), ("a", "y"), ("b", "p")]),
    ];

    let reference = inner_loop_join_all(stream(&left), stream(&right)).unwrap();
    assert_eq!(canonical(&reference), canonical(&expected));

    // Sorted on ?k already: the unbound row leads
    for algorithm in JoinAlgorithm::ALL {
        let results = run(algorithm, key(&["k"]), &left, &right);
        assert_eq!(canonical(&results), canonical(&expected), "{}", algorithm);
    }
}

#[test]
fn test_hash_join_is_commutative() {
    let left = vec![
        row(&[("k", "1"), ("a", "x")]),
        row(&[("a", "y")]),
        row(&[("k", "2")]),
    ];
    let right = vec![
        row(&[("k", "1"), ("b", "p")]),
        row(&[("k", "2"), ("a", "y")]),
        row(&[("b", "q")]),
    ];

    let forward = run(JoinAlgorithm::Hash, key(&["k"]), &left, &right);
    let backward = run(JoinAlgorithm::Hash, key(&["k"]), &right, &left);
    let reference = inner_loop_join_all(stream(&left), stream(&right)).unwrap();

    assert_eq!(canonical(&forward), canonical(&backward));
    assert_eq!(canonical(&forward), canonical(&reference));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_upstream_error_is_propagated() {
    for algorithm in JoinAlgorithm::ALL {
        let left = stream(&[row(&[("k", "1")])]);
        let right = create_row_list(
            vars(&["k"]),
            vec![Ok(row(&[("k", "1")])), Err(Error::source("connection reset"))],
        );

        let mut op = join(algorithm, key(&["k"]), left, right, JoinConfig::default());
        let err = collect_rows(&mut op).unwrap_err();
        assert_eq!(err, Error::source("connection reset"), "{}", algorithm);
    }
}

#[test]
fn test_strict_merge_join_rejects_unsorted_input() {
    let left = stream(&[row(&[("k", "2")]), row(&[("k", "1")])]);
    let right = stream(&[row(&[("k", "3")])]);

    let mut op = join(
        JoinAlgorithm::SortMerge,
        key(&["k"]),
        left,
        right,
        JoinConfig::strict(),
    );
    let err = collect_rows(&mut op).unwrap_err();
    assert!(err.is_ordering_violation());
}

// ============================================================================
// OPTIONAL
// ============================================================================

#[test]
fn test_left_outer_hash_and_loop_agree() {
    let left = vec![
        row(&[("s", "a"), ("name", "Alice")]),
        row(&[("s", "b"), ("name", "Bob")]),
    ];
    let right = vec![
        row(&[("s", "a"), ("mail", "alice@example.org")]),
        row(&[("s", "a"), ("mail", "al@example.org")]),
    ];

    let mut hash = HashJoin::left_outer(
        key(&["s"]),
        stream(&left),
        stream(&right),
        JoinConfig::default(),
    );
    let mut nested = InnerLoopJoin::left_outer(stream(&left), stream(&right), JoinConfig::default());

    let hash_rows = collect_rows(&mut hash).unwrap();
    let loop_rows = collect_rows(&mut nested).unwrap();

    assert_eq!(hash_rows.len(), 3);
    assert_eq!(canonical(&hash_rows), canonical(&loop_rows));
    assert!(hash_rows.contains(&row(&[("s", "b"), ("name", "Bob")])));
}

// ============================================================================
// Substitution join
// ============================================================================

#[test]
fn test_substitution_join_matches_hash_join_over_scan() {
    let triples = vec![
        vec![Term::iri("alice"), Term::iri("knows"), Term::iri("bob")],
        vec![Term::iri("bob"), Term::iri("knows"), Term::iri("carol")],
        vec![Term::iri("carol"), Term::iri("age"), Term::integer(41)],
    ];
    let index = Arc::new(TupleIndex::from_tuples(triples));
    let pattern = AccessPattern::new(vec![
        Slot::var("p"),
        Slot::constant(Term::iri("knows")),
        Slot::var("q"),
    ]);

    let people: Vec<Row<Term>> = ["alice", "bob", "dave"]
        .iter()
        .map(|p| Row::from_pairs(vec![(Var::new("p"), Term::iri(p))]))
        .collect();

    let mut substitution = SubstitutionJoin::new(
        Box::new(MaterializedRows::from_rows(people.clone())),
        pattern.clone(),
        index.clone(),
        JoinConfig::default(),
    );
    let via_index = collect_rows(&mut substitution).unwrap();

    // Same join with the full pattern scan as the right input
    let scan = index.access_rows(&pattern).unwrap();
    let mut hash = HashJoin::new(
        key(&["p"]),
        Box::new(MaterializedRows::from_rows(people)),
        scan,
        JoinConfig::default(),
    );
    let via_hash = collect_rows(&mut hash).unwrap();

    assert_eq!(via_index.len(), 2);
    assert_eq!(canonical(&via_index), canonical(&via_hash));
    assert_eq!(substitution.vars(), &vars(&["p", "q"]));
}

#[test]
fn test_stream_vars_union() {
    let left = Box::new(MaterializedRows::<Term>::new(vec![], vars(&["s", "p"])));
    let right = Box::new(MaterializedRows::<Term>::new(vec![], vars(&["s", "o"])));

    let op: HashJoin<Term> = HashJoin::new(key(&["s"]), left, right, JoinConfig::default());
    let expected: VarSet = vars(&["s", "p", "o"]);
    assert_eq!(op.vars(), &expected);
}
