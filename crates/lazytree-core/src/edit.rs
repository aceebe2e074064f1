//! Copy-on-write tree edits.
//!
//! Every operation here builds a brand new [`Document`] by splicing slices
//! of the source buffer with newly rendered JSON text, then parses that
//! text from scratch. The source document is never touched — `t'` and `t`
//! are always independent, satisfying the copy-on-write-independence
//! invariant.

use std::sync::Arc;

use crate::document::Document;
use crate::error::{FormatError, TreeError};
use crate::node::{LazyNode, NodeType};
use crate::value::Value;

fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => {
            if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        Value::String(s) => render_string(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(members) => {
            let parts: Vec<String> = members
                .iter()
                .map(|(k, v)| format!("{}:{}", render_string(k), render(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

fn render_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn require_object(node: &Arc<LazyNode>, op: &str) -> Result<(), TreeError> {
    if node.get_type() != NodeType::Object {
        return Err(TreeError::new(
            node.path().canonical(),
            node.get_type().as_str(),
            op,
        ));
    }
    Ok(())
}

fn require_array(node: &Arc<LazyNode>, op: &str) -> Result<(), TreeError> {
    if node.get_type() != NodeType::Array {
        return Err(TreeError::new(
            node.path().canonical(),
            node.get_type().as_str(),
            op,
        ));
    }
    Ok(())
}

/// Replace the declaration at `node`'s path with `replacement` and return
/// the new document's root.
pub fn replace_with(
    doc: &Arc<Document>,
    node: &Arc<LazyNode>,
    replacement: &Value,
) -> Result<Arc<Document>, FormatError> {
    let buf = doc.buffer();
    let end = node.end_index()?;
    let mut text = buf.slice(0, node.start_index());
    text.push_str(&render(replacement));
    text.push_str(&buf.slice(end, buf.len()));
    Document::parse(&text)
}

/// Append new members to an object node, last-write-position (appended just
/// before the closing `}`). Returns the new document's root.
pub fn add_members(
    doc: &Arc<Document>,
    node: &Arc<LazyNode>,
    new_members: &[(String, Value)],
) -> Result<Arc<Document>, TreeError> {
    require_object(node, "addMembers")?;
    let buf = doc.buffer();
    let end = node.end_index().map_err(|e| {
        TreeError::new(node.path().canonical(), node.get_type().as_str(), e.to_string())
    })?;
    let is_empty = doc.is_empty_object(node).unwrap_or(true);
    let insertion_point = end - 1; // just before '}'
    let mut text = buf.slice(0, insertion_point);
    if !is_empty {
        text.push(',');
    }
    let rendered: Vec<String> = new_members
        .iter()
        .map(|(k, v)| format!("{}:{}", render_string(k), render(v)))
        .collect();
    text.push_str(&rendered.join(","));
    text.push_str(&buf.slice(insertion_point, buf.len()));
    Document::parse(&text).map_err(|e| TreeError::new(node.path().canonical(), "string", e.to_string()))
}

/// Remove members by name from an object node. Returns the new document's
/// root. Names not present are silently ignored.
pub fn remove_members(
    doc: &Arc<Document>,
    node: &Arc<LazyNode>,
    names: &[String],
) -> Result<Arc<Document>, TreeError> {
    require_object(node, "removeMembers")?;
    let members = doc
        .members(node, false)
        .map_err(|e| TreeError::new(node.path().canonical(), "object", e.to_string()))?;
    let kept: Vec<(String, Value)> = members
        .into_iter()
        .filter(|(name, _)| !names.contains(name))
        .map(|(name, child)| {
            let value = child
                .value()
                .expect("children of a successfully materialized object always parse");
            (name, value)
        })
        .collect();
    replace_with(doc, node, &Value::Object(kept))
        .map_err(|e| TreeError::new(node.path().canonical(), "object", e.to_string()))
}

/// Append new elements to an array node. Returns the new document's root.
pub fn add_elements(
    doc: &Arc<Document>,
    node: &Arc<LazyNode>,
    new_elements: &[Value],
) -> Result<Arc<Document>, TreeError> {
    require_array(node, "addElements")?;
    let buf = doc.buffer();
    let end = node.end_index().map_err(|e| {
        TreeError::new(node.path().canonical(), node.get_type().as_str(), e.to_string())
    })?;
    let is_empty = doc.is_empty_array(node).unwrap_or(true);
    let insertion_point = end - 1; // just before ']'
    let mut text = buf.slice(0, insertion_point);
    if !is_empty {
        text.push(',');
    }
    let rendered: Vec<String> = new_elements.iter().map(render).collect();
    text.push_str(&rendered.join(","));
    text.push_str(&buf.slice(insertion_point, buf.len()));
    Document::parse(&text).map_err(|e| TreeError::new(node.path().canonical(), "string", e.to_string()))
}

/// Insert new elements at index `at`. Returns the new document's root.
pub fn put_elements(
    doc: &Arc<Document>,
    node: &Arc<LazyNode>,
    at: usize,
    new_elements: &[Value],
) -> Result<Arc<Document>, TreeError> {
    require_array(node, "putElements")?;
    let members = doc
        .elements(node, false)
        .map_err(|e| TreeError::new(node.path().canonical(), "array", e.to_string()))?;
    let mut values: Vec<Value> = members
        .into_iter()
        .map(|child| {
            child
                .value()
                .expect("children of a successfully materialized array always parse")
        })
        .collect();
    let at = at.min(values.len());
    for (offset, v) in new_elements.iter().enumerate() {
        values.insert(at + offset, v.clone());
    }
    replace_with(doc, node, &Value::Array(values))
        .map_err(|e| TreeError::new(node.path().canonical(), "array", e.to_string()))
}

/// Remove elements in `[from, to)`. Returns the new document's root.
pub fn remove_elements(
    doc: &Arc<Document>,
    node: &Arc<LazyNode>,
    from: usize,
    to: usize,
) -> Result<Arc<Document>, TreeError> {
    require_array(node, "removeElements")?;
    let members = doc
        .elements(node, false)
        .map_err(|e| TreeError::new(node.path().canonical(), "array", e.to_string()))?;
    let values: Vec<Value> = members
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i < from || *i >= to)
        .map(|(_, child)| {
            child
                .value()
                .expect("children of a successfully materialized array always parse")
        })
        .collect();
    replace_with(doc, node, &Value::Array(values))
        .map_err(|e| TreeError::new(node.path().canonical(), "array", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_on_write_add_member_leaves_original_untouched() {
        let doc = Document::parse(r#"{"a": 1}"#).unwrap();
        let root = doc.root();
        let new_doc = add_members(&doc, &root, &[("b".to_string(), Value::Number(2.0))]).unwrap();
        assert_eq!(doc.root().declaration().unwrap(), r#"{"a": 1}"#);
        let new_value = new_doc.root().value().unwrap();
        let obj = new_value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj[0].0, "a");
        assert_eq!(obj[1].0, "b");
    }

    #[test]
    fn remove_members_drops_named_keys() {
        let doc = Document::parse(r#"{"a": 1, "b": 2}"#).unwrap();
        let root = doc.root();
        let new_doc = remove_members(&doc, &root, &["a".to_string()]).unwrap();
        let v = new_doc.root().value().unwrap();
        assert_eq!(v.as_object().unwrap().len(), 1);
        assert_eq!(v.as_object().unwrap()[0].0, "b");
    }

    #[test]
    fn add_elements_appends_in_order() {
        let doc = Document::parse("[1, 2]").unwrap();
        let root = doc.root();
        let new_doc = add_elements(&doc, &root, &[Value::Number(3.0)]).unwrap();
        let v = new_doc.root().value().unwrap();
        assert_eq!(v.as_array().unwrap().len(), 3);
    }

    #[test]
    fn remove_elements_range() {
        let doc = Document::parse("[1, 2, 3, 4]").unwrap();
        let root = doc.root();
        let new_doc = remove_elements(&doc, &root, 1, 3).unwrap();
        let v = new_doc.root().value().unwrap();
        let arr = v.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0], Value::Number(1.0));
        assert_eq!(arr[1], Value::Number(4.0));
    }

    #[test]
    fn put_elements_inserts_at_index() {
        let doc = Document::parse("[1, 4]").unwrap();
        let root = doc.root();
        let new_doc = put_elements(&doc, &root, 1, &[Value::Number(2.0), Value::Number(3.0)]).unwrap();
        let v = new_doc.root().value().unwrap();
        let arr = v.as_array().unwrap();
        assert_eq!(
            arr,
            &[
                Value::Number(1.0),
                Value::Number(2.0),
                Value::Number(3.0),
                Value::Number(4.0)
            ]
        );
    }
}
