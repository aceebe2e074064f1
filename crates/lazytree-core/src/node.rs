//! Lazy nodes: cheap construction, on-demand completion.
//!
//! A [`LazyNode`] only ever stores what its existence already implies (a
//! buffer reference, its path, and a start offset) until a terminal
//! operation asks for more. `end` and the materialized [`Value`] are each
//! set at most once, via [`std::sync::OnceLock`] — this is the "mutated
//! exactly twice" lifecycle from the design notes.

use std::sync::{Arc, OnceLock};

use crate::buffer::CharBuffer;
use crate::error::FormatError;
use crate::path::Path;
use crate::scanner;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Object => "object",
            NodeType::Array => "array",
            NodeType::String => "string",
            NodeType::Number => "number",
            NodeType::Boolean => "boolean",
            NodeType::Null => "null",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, NodeType::Object | NodeType::Array)
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One JSON value in the context of a document: a variant tag, a start
/// offset, and caches for `end` and the materialized value.
#[derive(Debug)]
pub struct LazyNode {
    buffer: Arc<CharBuffer>,
    path: Path,
    node_type: NodeType,
    start: usize,
    end: OnceLock<usize>,
    parsed: OnceLock<Value>,
    /// Set once a container's `members()`/`elements()` walk has fully
    /// materialized its immediate children — after which `size()` is O(1).
    child_count: OnceLock<usize>,
}

impl LazyNode {
    pub fn new(buffer: Arc<CharBuffer>, path: Path, start: usize) -> Result<Self, FormatError> {
        let node_type = scanner::detect_type(&buffer, start)?;
        Ok(Self {
            buffer,
            path,
            node_type,
            start,
            end: OnceLock::new(),
            parsed: OnceLock::new(),
            child_count: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_type(&self) -> NodeType {
        self.node_type
    }

    pub fn start_index(&self) -> usize {
        self.start
    }

    pub fn buffer(&self) -> &Arc<CharBuffer> {
        &self.buffer
    }

    pub fn cached_child_count(&self) -> Option<usize> {
        self.child_count.get().copied()
    }

    pub fn set_child_count(&self, count: usize) {
        let _ = self.child_count.set(count);
    }

    /// Computed by invoking `skip_value` once and memoized. For the root
    /// node, any non-whitespace input following `end` is a format error
    /// (trailing garbage) — intermediate nodes are not checked this way,
    /// per the design notes' "trailing garbage" open question.
    pub fn end_index(&self) -> Result<usize, FormatError> {
        if let Some(&end) = self.end.get() {
            return Ok(end);
        }
        let end = scanner::skip_value(&self.buffer, self.start)?;
        if self.path.is_root() {
            let after = scanner::skip_whitespace(&self.buffer, end);
            if after != self.buffer.len() {
                return Err(FormatError::new(
                    after,
                    "end of input",
                    self.buffer.context_snippet(after, 20),
                ));
            }
        }
        // Benign race: if another reader already memoized `end`, adopt it.
        let _ = self.end.set(end);
        Ok(*self.end.get().unwrap())
    }

    /// The substring `[start, end)` of the buffer — byte/char-for-char what
    /// the document declared at this path.
    pub fn declaration(&self) -> Result<String, FormatError> {
        let end = self.end_index()?;
        Ok(self.buffer.slice(self.start, end))
    }

    /// Parses the node once and caches. A `NULL` node's parsed form is
    /// always "absent" (trivially `Value::Null`, never cached).
    pub fn value(&self) -> Result<Value, FormatError> {
        if self.node_type == NodeType::Null {
            return Ok(Value::Null);
        }
        if let Some(v) = self.parsed.get() {
            return Ok(v.clone());
        }
        let (value, end) = materialize(&self.buffer, self.start, 0)?;
        let _ = self.end.set(end);
        let _ = self.parsed.set(value.clone());
        Ok(value)
    }

    /// Depth-first pre-order visit, descending only into containers.
    /// `filter` restricts which node types the visitor is called for
    /// (containers are still descended into regardless of the filter).
    pub fn visit(
        &self,
        filter: Option<NodeType>,
        visitor: &mut dyn FnMut(&Path, &Value),
    ) -> Result<(), FormatError> {
        let value = self.value()?;
        visit_value(&self.path, &value, filter, visitor);
        Ok(())
    }

    /// First pre-order match for `predicate`, optionally restricted to
    /// `filter`.
    pub fn find(
        &self,
        filter: Option<NodeType>,
        predicate: &dyn Fn(&Value) -> bool,
    ) -> Result<Option<(Path, Value)>, FormatError> {
        let value = self.value()?;
        let mut found = None;
        find_value(&self.path, &value, filter, predicate, &mut found);
        Ok(found)
    }
}

fn node_type_of(value: &Value) -> NodeType {
    match value {
        Value::Null => NodeType::Null,
        Value::Boolean(_) => NodeType::Boolean,
        Value::Number(_) => NodeType::Number,
        Value::String(_) => NodeType::String,
        Value::Array(_) => NodeType::Array,
        Value::Object(_) => NodeType::Object,
    }
}

fn visit_value(
    path: &Path,
    value: &Value,
    filter: Option<NodeType>,
    visitor: &mut dyn FnMut(&Path, &Value),
) {
    if filter.map_or(true, |t| t == node_type_of(value)) {
        visitor(path, value);
    }
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                visit_value(&path.extend_with_index(i), item, filter, visitor);
            }
        }
        Value::Object(members) => {
            for (name, child) in members {
                visit_value(&path.extend_with_member(name), child, filter, visitor);
            }
        }
        _ => {}
    }
}

fn find_value(
    path: &Path,
    value: &Value,
    filter: Option<NodeType>,
    predicate: &dyn Fn(&Value) -> bool,
    found: &mut Option<(Path, Value)>,
) {
    if found.is_some() {
        return;
    }
    if filter.map_or(true, |t| t == node_type_of(value)) && predicate(value) {
        *found = Some((path.clone(), value.clone()));
        return;
    }
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                find_value(&path.extend_with_index(i), item, filter, predicate, found);
                if found.is_some() {
                    return;
                }
            }
        }
        Value::Object(members) => {
            for (name, child) in members {
                find_value(
                    &path.extend_with_member(name),
                    child,
                    filter,
                    predicate,
                    found,
                );
                if found.is_some() {
                    return;
                }
            }
        }
        _ => {}
    }
}

fn check_depth(buf: &CharBuffer, depth: usize, at: usize) -> Result<(), FormatError> {
    if let Some(max) = buf.max_depth() {
        if depth > max {
            return Err(FormatError::new(
                at,
                format!("nesting no deeper than {max} levels"),
                buf.context_snippet(at, 20),
            ));
        }
    }
    Ok(())
}

/// Recursive-descent materialization of the value starting at `start`.
/// Duplicate object keys resolve to their first occurrence (later
/// occurrences are still parsed, to correctly skip their bytes, but
/// discarded) — mirrors the dedup rule `members()` applies when interning.
///
/// `depth` counts container nesting entered so far; once
/// [`CharBuffer::max_depth`] is exceeded this bails out with a format error
/// rather than risking a stack overflow on pathological input (see the
/// concurrency & resource model's note on depth limits).
pub(crate) fn materialize(
    buf: &CharBuffer,
    start: usize,
    depth: usize,
) -> Result<(Value, usize), FormatError> {
    let i = scanner::skip_whitespace(buf, start);
    match buf.get(i) {
        Some('{') => {
            check_depth(buf, depth, i)?;
            materialize_object(buf, i, depth)
        }
        Some('[') => {
            check_depth(buf, depth, i)?;
            materialize_array(buf, i, depth)
        }
        Some('"') => {
            let (s, end) = scanner::parse_string(buf, i)?;
            Ok((Value::String(s), end))
        }
        Some('t') | Some('f') => {
            let (b, end) = scanner::parse_bool(buf, i)?;
            Ok((Value::Boolean(b), end))
        }
        Some('n') => {
            let end = scanner::parse_null(buf, i)?;
            Ok((Value::Null, end))
        }
        Some(c) if c == '-' || c.is_ascii_digit() => {
            let (n, end) = scanner::parse_number(buf, i)?;
            Ok((Value::Number(n), end))
        }
        _ => Err(FormatError::new(
            i,
            "a JSON value",
            buf.context_snippet(i, 20),
        )),
    }
}

fn materialize_object(
    buf: &CharBuffer,
    open: usize,
    depth: usize,
) -> Result<(Value, usize), FormatError> {
    let mut j = open + 1;
    j = scanner::skip_whitespace(buf, j);
    let mut members: Vec<(String, Value)> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    if buf.get(j) == Some('}') {
        return Ok((Value::Object(members), j + 1));
    }
    loop {
        j = scanner::skip_whitespace(buf, j);
        let (key, after_key) = scanner::parse_string(buf, j)?;
        j = scanner::skip_whitespace(buf, after_key);
        if buf.get(j) != Some(':') {
            return Err(FormatError::new(j, "':'", buf.context_snippet(j, 20)));
        }
        j = scanner::skip_whitespace(buf, j + 1);
        let (value, after_value) = materialize(buf, j, depth + 1)?;
        j = after_value;
        if seen.insert(key.clone()) {
            members.push((key, value));
        }
        j = scanner::skip_whitespace(buf, j);
        match buf.get(j) {
            Some(',') => j = scanner::skip_whitespace(buf, j + 1),
            Some('}') => return Ok((Value::Object(members), j + 1)),
            _ => return Err(FormatError::new(j, "',' or '}'", buf.context_snippet(j, 20))),
        }
    }
}

fn materialize_array(
    buf: &CharBuffer,
    open: usize,
    depth: usize,
) -> Result<(Value, usize), FormatError> {
    let mut j = open + 1;
    j = scanner::skip_whitespace(buf, j);
    let mut items = Vec::new();
    if buf.get(j) == Some(']') {
        return Ok((Value::Array(items), j + 1));
    }
    loop {
        j = scanner::skip_whitespace(buf, j);
        let (value, after_value) = materialize(buf, j, depth + 1)?;
        items.push(value);
        j = scanner::skip_whitespace(buf, after_value);
        match buf.get(j) {
            Some(',') => j = scanner::skip_whitespace(buf, j + 1),
            Some(']') => return Ok((Value::Array(items), j + 1)),
            _ => return Err(FormatError::new(j, "',' or ']'", buf.context_snippet(j, 20))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_index_is_memoized() {
        let buf = CharBuffer::new(r#"{"a": 1}"#);
        let node = LazyNode::new(buf, Path::root(), 0).unwrap();
        let e1 = node.end_index().unwrap();
        let e2 = node.end_index().unwrap();
        assert_eq!(e1, e2);
    }

    #[test]
    fn declaration_matches_buffer_slice() {
        let buf = CharBuffer::new(r#"{"a": [1, 2, 3]}"#);
        let node = LazyNode::new(buf.clone(), Path::root(), 0).unwrap();
        assert_eq!(node.declaration().unwrap(), buf.slice(0, buf.len()));
    }

    #[test]
    fn root_trailing_garbage_is_format_error() {
        let buf = CharBuffer::new(r#"{"a": 1} garbage"#);
        let node = LazyNode::new(buf, Path::root(), 0).unwrap();
        assert!(node.end_index().is_err());
    }

    #[test]
    fn value_bails_out_past_configured_max_depth() {
        use crate::options::ParseOptions;
        let nested = "[".repeat(5) + &"]".repeat(5);
        let opts = ParseOptions {
            guard_depth: true,
            max_depth: 3,
        };
        let buf = CharBuffer::new_with_options(&nested, opts);
        let node = LazyNode::new(buf, Path::root(), 0).unwrap();
        assert!(node.value().is_err());
    }

    #[test]
    fn value_unaffected_by_depth_guard_when_disabled() {
        use crate::options::ParseOptions;
        let nested = "[".repeat(5) + &"]".repeat(5);
        let opts = ParseOptions {
            guard_depth: false,
            max_depth: 3,
        };
        let buf = CharBuffer::new_with_options(&nested, opts);
        let node = LazyNode::new(buf, Path::root(), 0).unwrap();
        assert!(node.value().is_ok());
    }

    #[test]
    fn null_value_never_caches() {
        let buf = CharBuffer::new("null");
        let node = LazyNode::new(buf, Path::root(), 0).unwrap();
        assert_eq!(node.value().unwrap(), Value::Null);
        assert!(node.parsed.get().is_none());
    }

    #[test]
    fn integer_valued_number_detected() {
        let buf = CharBuffer::new("12.0");
        let node = LazyNode::new(buf, Path::root(), 0).unwrap();
        let v = node.value().unwrap();
        assert!(v.is_integer());

        let buf = CharBuffer::new("12.5");
        let node = LazyNode::new(buf, Path::root(), 0).unwrap();
        assert!(!node.value().unwrap().is_integer());
    }

    #[test]
    fn duplicate_keys_resolve_to_first_occurrence() {
        let buf = CharBuffer::new(r#"{"a": 1, "a": 2}"#);
        let node = LazyNode::new(buf, Path::root(), 0).unwrap();
        let v = node.value().unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj[0].1, Value::Number(1.0));
    }
}
