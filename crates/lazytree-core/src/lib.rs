//! A lazy, path-addressable JSON tree: parse once, pay only for the paths
//! you actually navigate.
//!
//! - [`document::Document`] owns an immutable character buffer and the
//!   store of lazy nodes discovered in it so far.
//! - [`tree::VirtualTree`] is a cheap `(document, path)` handle; navigation
//!   never touches the scanner, only terminal operations do.
//! - [`schema`] and [`validation`] implement a JSON-Schema-flavored
//!   constraint engine over a virtual value.
//! - [`diff`] compares two virtual values under a configurable strictness
//!   mode.

pub mod buffer;
pub mod collections;
pub mod diff;
pub mod document;
pub mod edit;
pub mod error;
pub mod node;
pub mod options;
pub mod path;
pub mod scanner;
pub mod schema;
pub mod store;
pub mod tree;
pub mod validation;
pub mod value;

pub use document::Document;
pub use error::{ErrorCode, FormatError, LazyTreeError, PathError, Result, SchemaViolation, TreeError, ValidationError};
pub use node::{LazyNode, NodeType};
pub use options::{DiffMode, ParseOptions};
pub use path::Path;
pub use schema::{from_json_schema, SchemaInterface};
pub use tree::VirtualTree;
pub use validation::validate;
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_navigate_end_to_end() {
        let doc = Document::parse(r#"{"a": 1, "b": [2, 3], "c": "x"}"#).unwrap();
        let tree = VirtualTree::root(doc);
        assert_eq!(tree.member("b").element(1).value().unwrap(), Value::Number(3.0));
        assert_eq!(tree.size().unwrap(), 3);
    }
}
