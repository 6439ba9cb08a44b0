#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use serde_json::{json, Value};
use vepi::table::{Scalar, Table};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Printable ASCII plus newlines: exercises quoting, commas, quotes and
/// backslashes in CSV fields.
pub fn arb_cell() -> impl Strategy<Value = String> {
    "[ -~\n]{0,12}"
}

pub fn arb_column_names(max_cols: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[A-Za-z][A-Za-z0-9 _]{0,8}", 1..=max_cols)
        .prop_map(|names| names.into_iter().collect())
}

/// Non-empty text-only tables with unique column names.
pub fn arb_text_table(max_cols: usize, max_rows: usize) -> impl Strategy<Value = Table> {
    arb_column_names(max_cols).prop_flat_map(move |names| {
        let width = names.len();
        prop::collection::vec(prop::collection::vec(arb_cell(), width), 1..=max_rows).prop_map(
            move |rows| {
                Table::from_rows(
                    names.clone(),
                    rows.into_iter()
                        .map(|row| row.into_iter().map(Scalar::Text).collect()),
                )
                .expect("generated table is rectangular")
            },
        )
    })
}

/// Shape of a member tree; names are assigned in preorder.
#[derive(Clone, Debug)]
pub struct Tree {
    pub children: Vec<Tree>,
}

pub fn arb_tree() -> impl Strategy<Value = Tree> {
    let leaf = Just(Tree {
        children: Vec::new(),
    });
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(|children| Tree { children })
    })
}

/// Renders `tree` as nested hierarchy JSON and records the expected
/// `(name, parent)` pairs in preorder.
pub fn tree_to_json(
    tree: &Tree,
    dimension: &str,
    counter: &mut usize,
    parent: Option<&str>,
    expected: &mut Vec<(String, Option<String>)>,
) -> Value {
    let name = format!("{dimension}-{}", *counter);
    *counter += 1;
    expected.push((name.clone(), parent.map(str::to_string)));

    let children: Vec<Value> = tree
        .children
        .iter()
        .map(|child| tree_to_json(child, dimension, counter, Some(&name), expected))
        .collect();

    json!({"name": name, "operator": "+", "children": children})
}
