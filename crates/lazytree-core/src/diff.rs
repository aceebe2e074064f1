//! Structural diff between two virtual values under a configurable
//! strictness mode.

use serde::Serialize;

use crate::node::NodeType;
use crate::options::{DiffMode, NumberComparison};
use crate::tree::VirtualTree;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Difference {
    /// Present in `expected`, absent in `actual`.
    Less { path: String },
    /// Present in `actual` but not in `expected` (only reported when the
    /// enclosing container's mode forbids additional members/elements).
    More { path: String },
    /// Content matches but the positions disagree under strict ordering.
    Sort { path: String },
    /// A leaf value differs.
    Neq { path: String, message: String },
}

/// Compares `expected` against `actual` under `mode` and returns every
/// difference found, in traversal order.
pub fn diff(expected: &VirtualTree, actual: &VirtualTree, mode: &DiffMode) -> Vec<Difference> {
    let mut out = Vec::new();
    diff_into(expected, actual, mode, &mut out);
    out
}

fn diff_into(expected: &VirtualTree, actual: &VirtualTree, mode: &DiffMode, out: &mut Vec<Difference>) {
    let path = expected.path().canonical();

    match (expected.get_type(), actual.get_type()) {
        (Err(_), Err(_)) => {}
        (Ok(_), Err(_)) => out.push(Difference::Less { path }),
        (Err(_), Ok(_)) => out.push(Difference::More { path }),
        (Ok(expected_type), Ok(actual_type)) => {
            if expected_type != actual_type {
                out.push(Difference::Neq {
                    path,
                    message: format!("expected a {expected_type}, found a {actual_type}"),
                });
                return;
            }
            match expected_type {
                NodeType::Object => diff_object(expected, actual, mode, out),
                NodeType::Array => diff_array(expected, actual, mode, out),
                NodeType::Number => diff_number(expected, actual, mode, out),
                _ => diff_leaf(expected, actual, out),
            }
        }
    }
}

fn diff_leaf(expected: &VirtualTree, actual: &VirtualTree, out: &mut Vec<Difference>) {
    let path = expected.path().canonical();
    let (e, a) = match (expected.declaration(), actual.declaration()) {
        (Ok(e), Ok(a)) => (e, a),
        _ => return,
    };
    if e != a {
        out.push(Difference::Neq {
            path,
            message: format!("expected {e}, found {a}"),
        });
    }
}

fn diff_number(expected: &VirtualTree, actual: &VirtualTree, mode: &DiffMode, out: &mut Vec<Difference>) {
    let path = expected.path().canonical();
    match mode.numbers {
        NumberComparison::Textual => diff_leaf(expected, actual, out),
        NumberComparison::Numeric => {
            let (e, a) = match (expected.value(), actual.value()) {
                (Ok(Value::Number(e)), Ok(Value::Number(a))) => (e, a),
                _ => return,
            };
            if e != a {
                out.push(Difference::Neq {
                    path,
                    message: format!("expected {e}, found {a}"),
                });
            }
        }
    }
}

fn diff_object(expected: &VirtualTree, actual: &VirtualTree, mode: &DiffMode, out: &mut Vec<Difference>) {
    let (expected_node, actual_node) = match (
        expected.document().resolve(expected.path()),
        actual.document().resolve(actual.path()),
    ) {
        (Ok(e), Ok(a)) => (e, a),
        _ => return,
    };
    let expected_keys: Vec<String> = match expected.document().keys(&expected_node) {
        Ok(k) => k,
        Err(_) => return,
    };
    let actual_keys: Vec<String> = match actual.document().keys(&actual_node) {
        Ok(k) => k,
        Err(_) => return,
    };

    if !mode.objects.any_order {
        let common_len = expected_keys.len().min(actual_keys.len());
        for i in 0..common_len {
            if expected_keys[i] != actual_keys[i] {
                out.push(Difference::Sort {
                    path: format!("{}.{}", expected.path().canonical(), expected_keys[i]),
                });
            }
        }
    }

    for key in &expected_keys {
        diff_into(&expected.member(key), &actual.member(key), mode, out);
    }

    if !mode.objects.any_additional {
        for key in &actual_keys {
            if !expected_keys.contains(key) {
                out.push(Difference::More {
                    path: format!("{}.{}", expected.path().canonical(), key),
                });
            }
        }
    }
}

fn diff_array(expected: &VirtualTree, actual: &VirtualTree, mode: &DiffMode, out: &mut Vec<Difference>) {
    let expected_len = match expected.size() {
        Ok(n) => n,
        Err(_) => return,
    };
    let actual_len = match actual.size() {
        Ok(n) => n,
        Err(_) => return,
    };

    if !mode.arrays.any_order {
        diff_array_strict(expected, actual, expected_len, actual_len, mode, out);
        return;
    }
    diff_array_any_order(expected, actual, expected_len, actual_len, mode, out);
}

fn diff_array_strict(
    expected: &VirtualTree,
    actual: &VirtualTree,
    expected_len: usize,
    actual_len: usize,
    mode: &DiffMode,
    out: &mut Vec<Difference>,
) {
    let common_len = expected_len.min(actual_len);
    for i in 0..common_len {
        diff_into(&expected.element(i), &actual.element(i), mode, out);
    }

    for i in common_len..expected_len {
        out.push(Difference::Less {
            path: expected.element(i).path().canonical(),
        });
    }

    if !mode.arrays.any_additional {
        for i in common_len..actual_len {
            out.push(Difference::More {
                path: actual.element(i).path().canonical(),
            });
        }
    }
}

/// Elements that deep-compare equal (no differences under `mode`) are
/// considered a match regardless of position.
fn deep_equal(expected: &VirtualTree, actual: &VirtualTree, mode: &DiffMode) -> bool {
    let mut probe = Vec::new();
    diff_into(expected, actual, mode, &mut probe);
    probe.is_empty()
}

fn diff_array_any_order(
    expected: &VirtualTree,
    actual: &VirtualTree,
    expected_len: usize,
    actual_len: usize,
    mode: &DiffMode,
    out: &mut Vec<Difference>,
) {
    let mut actual_matched = vec![false; actual_len];

    // First pass: positional matches need no pairing search.
    let mut expected_unmatched = Vec::new();
    for i in 0..expected_len {
        if i < actual_len && deep_equal(&expected.element(i), &actual.element(i), mode) {
            actual_matched[i] = true;
        } else {
            expected_unmatched.push(i);
        }
    }

    for &i in &expected_unmatched {
        let found = (0..actual_len)
            .filter(|&j| !actual_matched[j])
            .find(|&j| deep_equal(&expected.element(i), &actual.element(j), mode));
        match found {
            Some(j) => actual_matched[j] = true,
            None => {
                let path = expected.element(i).path().canonical();
                if i < actual_len {
                    out.push(Difference::Neq {
                        path,
                        message: "no matching element found in actual".to_string(),
                    });
                } else {
                    out.push(Difference::Less { path });
                }
            }
        }
    }

    if !mode.arrays.any_additional {
        for (j, matched) in actual_matched.iter().enumerate() {
            if !matched {
                out.push(Difference::More {
                    path: actual.element(j).path().canonical(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn trees(expected_json: &str, actual_json: &str) -> (VirtualTree, VirtualTree) {
        let e = Document::parse(expected_json).unwrap();
        let a = Document::parse(actual_json).unwrap();
        (VirtualTree::root(e), VirtualTree::root(a))
    }

    #[test]
    fn strict_mode_flags_key_order() {
        let (e, a) = trees(r#"{"a":1,"b":2}"#, r#"{"b":2,"a":1}"#);
        let diffs = diff(&e, &a, &DiffMode::strict());
        assert_eq!(
            diffs.iter().filter(|d| matches!(d, Difference::Sort { .. })).count(),
            2
        );
    }

    #[test]
    fn any_order_mode_ignores_key_order() {
        let (e, a) = trees(r#"{"a":1,"b":2}"#, r#"{"b":2,"a":1}"#);
        let diffs = diff(&e, &a, &DiffMode::lenient());
        assert!(diffs.is_empty());
    }

    #[test]
    fn missing_key_is_less() {
        let (e, a) = trees(r#"{"a":1,"b":2}"#, r#"{"a":1}"#);
        let diffs = diff(&e, &a, &DiffMode::strict());
        assert!(diffs
            .iter()
            .any(|d| matches!(d, Difference::Less { path } if path == ".b")));
    }

    #[test]
    fn extra_key_is_more_unless_any_additional() {
        let (e, a) = trees(r#"{"a":1}"#, r#"{"a":1,"b":2}"#);
        let strict = diff(&e, &a, &DiffMode::strict());
        assert!(strict
            .iter()
            .any(|d| matches!(d, Difference::More { path } if path == ".b")));

        let mut lenient_mode = DiffMode::lenient();
        lenient_mode.objects.any_additional = true;
        let lenient = diff(&e, &a, &lenient_mode);
        assert!(lenient.is_empty());
    }

    #[test]
    fn numeric_mode_treats_1_0_and_1_as_equal() {
        let (e, a) = trees("1.0", "1");
        let diffs = diff(&e, &a, &DiffMode::lenient());
        assert!(diffs.is_empty());
    }

    #[test]
    fn textual_mode_treats_1_0_and_1_as_different() {
        let (e, a) = trees("1.0", "1");
        let diffs = diff(&e, &a, &DiffMode::strict());
        assert_eq!(diffs.len(), 1);
    }

    #[test]
    fn strict_order_suppresses_more_for_trailing_elements_when_any_additional() {
        let (e, a) = trees("[1, 2]", "[1, 2, 3]");
        let mut mode = DiffMode::strict();
        mode.arrays.any_additional = true;
        assert!(diff(&e, &a, &mode).is_empty());

        let strict = diff(&e, &a, &DiffMode::strict());
        assert!(strict
            .iter()
            .any(|d| matches!(d, Difference::More { path } if path == "[2]")));
    }

    #[test]
    fn any_order_array_matches_shuffled_elements() {
        let (e, a) = trees("[1, 2, 3]", "[3, 1, 2]");
        let mut mode = DiffMode::strict();
        mode.arrays.any_order = true;
        assert!(diff(&e, &a, &mode).is_empty());
    }
}
