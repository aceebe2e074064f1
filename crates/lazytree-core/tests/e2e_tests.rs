//! End-to-end tests that exercise parsing, navigation, validation, and
//! diffing together against fixture documents, mirroring the shape of a
//! real caller rather than one module in isolation.

use std::fs;
use std::path::Path;

use lazytree_core::document::Document;
use lazytree_core::options::DiffMode;
use lazytree_core::schema::from_json_schema;
use lazytree_core::tree::VirtualTree;
use lazytree_core::validation::validate;
use lazytree_core::Value;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn load_fixture(name: &str) -> String {
    let path = Path::new(FIXTURES_DIR).join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {name}: {e}"))
}

#[test]
fn navigates_nested_members_and_array_elements_lazily() {
    let text = load_fixture("catalog.json");
    let doc = Document::parse(&text).unwrap();
    let tree = VirtualTree::root(doc);

    assert_eq!(
        tree.member("owner").member("contact").member("email").value().unwrap(),
        Value::String("ada@example.com".to_string())
    );
    assert_eq!(
        tree.member("items").element(1).member("sku").value().unwrap(),
        Value::String("A2".to_string())
    );
    assert_eq!(tree.member("items").element(1).member("tags").size().unwrap(), 0);
    assert_eq!(tree.member("items").size().unwrap(), 3);
}

#[test]
fn missing_member_navigates_without_error_but_terminal_ops_fail() {
    let text = load_fixture("catalog.json");
    let doc = Document::parse(&text).unwrap();
    let tree = VirtualTree::root(doc);

    let missing = tree.member("does_not_exist");
    assert!(!missing.exists());
    assert!(missing.value().is_err());
}

#[test]
fn validates_catalog_against_its_schema() {
    let text = load_fixture("catalog.json");
    let schema_text = load_fixture("catalog_schema.json");
    let raw_schema: serde_json::Value = serde_json::from_str(&schema_text).unwrap();
    let schema = from_json_schema(&raw_schema).unwrap();

    let doc = Document::parse(&text).unwrap();
    let tree = VirtualTree::root(doc);
    assert!(validate(&tree, &schema).is_ok());
}

#[test]
fn validation_reports_element_level_violations() {
    let broken = r#"{
        "name": "broken catalog",
        "items": [
            {"sku": "", "price": -1}
        ]
    }"#;
    let schema_text = load_fixture("catalog_schema.json");
    let raw_schema: serde_json::Value = serde_json::from_str(&schema_text).unwrap();
    let schema = from_json_schema(&raw_schema).unwrap();

    let doc = Document::parse(broken).unwrap();
    let tree = VirtualTree::root(doc);
    let violation = validate(&tree, &schema).unwrap_err();

    let rules: Vec<&str> = violation.errors.iter().map(|e| e.rule.as_str()).collect();
    assert!(rules.contains(&"MIN_LENGTH"));
    assert!(rules.contains(&"MINIMUM"));
}

#[test]
fn diff_detects_leaf_and_structural_changes_under_strict_mode() {
    let expected = Document::parse(r#"{"a": 1, "b": [1, 2, 3]}"#).unwrap();
    let actual = Document::parse(r#"{"a": 2, "b": [1, 2]}"#).unwrap();

    let expected_tree = VirtualTree::root(expected);
    let actual_tree = VirtualTree::root(actual);

    let differences = lazytree_core::diff::diff(&expected_tree, &actual_tree, &DiffMode::strict());
    assert!(!differences.is_empty());
}

#[test]
fn diff_is_empty_for_reordered_array_under_lenient_mode() {
    let expected = Document::parse(r#"{"tags": ["a", "b", "c"]}"#).unwrap();
    let actual = Document::parse(r#"{"tags": ["c", "b", "a"]}"#).unwrap();

    let expected_tree = VirtualTree::root(expected);
    let actual_tree = VirtualTree::root(actual);

    let differences = lazytree_core::diff::diff(&expected_tree, &actual_tree, &DiffMode::lenient());
    assert!(differences.is_empty());
}
