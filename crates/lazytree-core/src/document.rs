//! The document: immutable buffer + per-document node store + optional
//! path-access listener. Exclusively owns all [`LazyNode`]s derived from it.

use std::sync::Arc;

use crate::buffer::CharBuffer;
use crate::error::{FormatError, PathError, TreeError};
use crate::node::{LazyNode, NodeType};
use crate::options::ParseOptions;
use crate::path::{key_for_name, Path};
use crate::scanner;
use crate::store::NodeStore;

use tracing::{debug, trace, warn};

/// A single-argument callback invoked with every non-root path looked up.
/// Not required to be thread-safe by the spec; invocation here is always
/// synchronous with the lookup that triggered it.
pub type PathAccessListener = Box<dyn Fn(&Path) + Send + Sync>;

pub struct Document {
    buffer: Arc<CharBuffer>,
    store: NodeStore,
    listener: Option<PathAccessListener>,
}

impl Document {
    /// Parses `text` into a lazy document. Parsing here means constructing
    /// the root node only — no bytes beyond the root's first character are
    /// touched until a terminal operation fires.
    pub fn parse(text: &str) -> Result<Arc<Self>, FormatError> {
        Self::parse_with_listener(text, None)
    }

    pub fn parse_with_listener(
        text: &str,
        listener: Option<PathAccessListener>,
    ) -> Result<Arc<Self>, FormatError> {
        Self::parse_with_options(text, ParseOptions::default(), listener)
    }

    pub fn parse_with_options(
        text: &str,
        options: ParseOptions,
        listener: Option<PathAccessListener>,
    ) -> Result<Arc<Self>, FormatError> {
        let buffer = CharBuffer::new_with_options(text, options);
        // Constructing the root node only classifies its first character;
        // this can fail on empty input or input starting with junk.
        let root = LazyNode::new(buffer.clone(), Path::root(), 0)?;
        let store = NodeStore::new();
        store.get_or_intern("$", || Arc::new(root));
        Ok(Arc::new(Self {
            buffer,
            store,
            listener,
        }))
    }

    pub fn buffer(&self) -> &Arc<CharBuffer> {
        &self.buffer
    }

    pub fn root(&self) -> Arc<LazyNode> {
        self.store.get("$").expect("root is always interned")
    }

    pub fn interned_count(&self) -> usize {
        self.store.len()
    }

    fn notify(&self, path: &Path) {
        if !path.is_root() {
            if let Some(listener) = &self.listener {
                listener(path);
            }
        }
    }

    /// Resolve `path` against the node store: on a store hit, return
    /// directly; otherwise walk from the closest interned ancestor toward
    /// the target one segment at a time, verifying each parent's type
    /// matches the segment kind.
    pub fn resolve(&self, path: &Path) -> Result<Arc<LazyNode>, PathError> {
        if path.is_root() {
            return Ok(self.root());
        }
        if let Some(hit) = self.store.get(&path.canonical()) {
            trace!(path = %path.canonical(), "node store hit");
            return Ok(hit);
        }
        let ancestor_path = self.closest_interned_ancestor(path);
        debug!(
            path = %path.canonical(),
            ancestor = %ancestor_path.canonical(),
            "node store miss, walking from closest interned ancestor"
        );
        let mut current = self
            .store
            .get(&ancestor_path.canonical())
            .unwrap_or_else(|| self.root());
        let remaining = &path.segments()[ancestor_path.segments().len()..];
        for segment in remaining {
            current = match segment {
                crate::path::Segment::Member(name) => {
                    self.member(&current, name).map_err(|_| {
                        PathError::new(
                            path.canonical(),
                            format!("no member named \"{name}\" along this path"),
                        )
                    })?
                }
                crate::path::Segment::Index(index) => {
                    self.element(&current, *index).map_err(|_| {
                        PathError::new(
                            path.canonical(),
                            format!("index {index} out of range along this path"),
                        )
                    })?
                }
            };
        }
        Ok(current)
    }

    fn closest_interned_ancestor(&self, path: &Path) -> Path {
        let mut candidate = path.clone();
        loop {
            if self.store.get(&candidate.canonical()).is_some() {
                return candidate;
            }
            if candidate.is_root() {
                return candidate;
            }
            candidate = candidate.drop_last_segment();
        }
    }

    // -- Object operations ---------------------------------------------

    fn expect_object<'a>(&self, node: &'a Arc<LazyNode>, op: &str) -> Result<(), TreeError> {
        if node.get_type() != NodeType::Object {
            return Err(TreeError::new(
                node.path().canonical(),
                node.get_type().as_str(),
                op,
            ));
        }
        Ok(())
    }

    fn expect_array(&self, node: &Arc<LazyNode>, op: &str) -> Result<(), TreeError> {
        if node.get_type() != NodeType::Array {
            return Err(TreeError::new(
                node.path().canonical(),
                node.get_type().as_str(),
                op,
            ));
        }
        Ok(())
    }

    /// Returns the child at `.<name>`, creating and interning it on miss.
    /// The scan walks from the object's start until it finds `name` or
    /// reaches `}`; keys passed over along the way are skipped, never
    /// interned.
    pub fn member(&self, node: &Arc<LazyNode>, name: &str) -> Result<Arc<LazyNode>, PathError> {
        self.expect_object(node, "member")
            .map_err(|e| PathError::new(node.path().canonical(), e.to_string()))?;
        let buf = self.buffer.as_ref();
        let mut i = scanner::skip_whitespace(buf, node.start_index() + 1);
        loop {
            if buf.get(i) == Some('}') {
                debug!(path = %node.path().canonical(), member = name, "member lookup miss: object exhausted");
                return Err(PathError::new(
                    node.path().extend_with_member(name).canonical(),
                    format!("no member named \"{name}\""),
                ));
            }
            let (key, after_key) = scanner::parse_string(buf, i)
                .map_err(|e| PathError::new(node.path().canonical(), e.to_string()))?;
            i = scanner::skip_whitespace(buf, after_key);
            if buf.get(i) != Some(':') {
                return Err(PathError::new(
                    node.path().canonical(),
                    FormatError::new(i, "':'", buf.context_snippet(i, 20)).to_string(),
                ));
            }
            i = scanner::skip_whitespace(buf, i + 1);
            let value_start = i;
            if key == name {
                let child_path = node.path().extend_with_member(name);
                let child = self.store.get_or_intern(&child_path.canonical(), || {
                    trace!(path = %child_path.canonical(), "interning member node");
                    Arc::new(
                        LazyNode::new(self.buffer.clone(), child_path.clone(), value_start)
                            .expect("value_start was just classified by the scanner"),
                    )
                });
                self.notify(&child_path);
                return Ok(child);
            }
            let after_value = scanner::skip_value(buf, value_start)
                .map_err(|e| PathError::new(node.path().canonical(), e.to_string()))?;
            i = scanner::skip_whitespace(buf, after_value);
            match buf.get(i) {
                Some(',') => i = scanner::skip_whitespace(buf, i + 1),
                Some('}') => {
                    return Err(PathError::new(
                        node.path().extend_with_member(name).canonical(),
                        format!("no member named \"{name}\""),
                    ))
                }
                _ => {
                    return Err(PathError::new(
                        node.path().canonical(),
                        "malformed object while scanning for member",
                    ))
                }
            }
        }
    }

    /// All `(name, child)` pairs in source order. Duplicate keys are
    /// skipped once their first occurrence has already been yielded.
    /// `cache_nodes = false` yields children without interning them.
    pub fn members(
        &self,
        node: &Arc<LazyNode>,
        cache_nodes: bool,
    ) -> Result<Vec<(String, Arc<LazyNode>)>, FormatError> {
        self.expect_object(node, "members")
            .map_err(|e| FormatError::new(node.start_index(), e.to_string(), String::new()))?;
        let buf = self.buffer.as_ref();
        let mut i = scanner::skip_whitespace(buf, node.start_index() + 1);
        let mut out = Vec::new();
        let mut seen = std::collections::HashSet::new();
        if buf.get(i) == Some('}') {
            node.set_child_count(out.len());
            return Ok(out);
        }
        loop {
            i = scanner::skip_whitespace(buf, i);
            let (key, after_key) = scanner::parse_string(buf, i)?;
            i = scanner::skip_whitespace(buf, after_key);
            if buf.get(i) != Some(':') {
                return Err(FormatError::new(i, "':'", buf.context_snippet(i, 20)));
            }
            i = scanner::skip_whitespace(buf, i + 1);
            let value_start = i;
            let child_path = node.path().extend_with_member(&key);
            if seen.insert(key.clone()) {
                let child = if cache_nodes {
                    let child = self.store.get_or_intern(&child_path.canonical(), || {
                        trace!(path = %child_path.canonical(), "interning member node");
                        Arc::new(
                            LazyNode::new(self.buffer.clone(), child_path.clone(), value_start)
                                .expect("value_start was just classified by the scanner"),
                        )
                    });
                    self.notify(&child_path);
                    child
                } else {
                    Arc::new(LazyNode::new(
                        self.buffer.clone(),
                        child_path.clone(),
                        value_start,
                    )?)
                };
                out.push((key, child));
            } else {
                warn!(path = %node.path().canonical(), key = %key, "duplicate object key skipped");
            }
            i = scanner::skip_value(buf, value_start)?;
            i = scanner::skip_whitespace(buf, i);
            match buf.get(i) {
                Some(',') => i = scanner::skip_whitespace(buf, i + 1),
                Some('}') => {
                    node.set_child_count(out.len());
                    return Ok(out);
                }
                _ => {
                    return Err(FormatError::new(
                        i,
                        "',' or '}'",
                        buf.context_snippet(i, 20),
                    ))
                }
            }
        }
    }

    /// Member names only — cheaper than `members()`: child nodes are not
    /// auto-created.
    pub fn keys(&self, node: &Arc<LazyNode>) -> Result<Vec<String>, FormatError> {
        self.expect_object(node, "keys")
            .map_err(|e| FormatError::new(node.start_index(), e.to_string(), String::new()))?;
        let buf = self.buffer.as_ref();
        let mut i = scanner::skip_whitespace(buf, node.start_index() + 1);
        let mut out = Vec::new();
        let mut seen = std::collections::HashSet::new();
        if buf.get(i) == Some('}') {
            return Ok(out);
        }
        loop {
            i = scanner::skip_whitespace(buf, i);
            let (key, after_key) = scanner::parse_string(buf, i)?;
            i = scanner::skip_whitespace(buf, after_key);
            if buf.get(i) != Some(':') {
                return Err(FormatError::new(i, "':'", buf.context_snippet(i, 20)));
            }
            i = scanner::skip_whitespace(buf, i + 1);
            let after_value = scanner::skip_value(buf, i)?;
            if seen.insert(key.clone()) {
                out.push(key);
            } else {
                warn!(path = %node.path().canonical(), key = %key, "duplicate object key skipped");
            }
            i = scanner::skip_whitespace(buf, after_value);
            match buf.get(i) {
                Some(',') => i = scanner::skip_whitespace(buf, i + 1),
                Some('}') => return Ok(out),
                _ => {
                    return Err(FormatError::new(
                        i,
                        "',' or '}'",
                        buf.context_snippet(i, 20),
                    ))
                }
            }
        }
    }

    /// O(1) once fully parsed; otherwise iterates the member/element
    /// stream to count without interning.
    pub fn object_size(&self, node: &Arc<LazyNode>) -> Result<usize, FormatError> {
        if let Some(count) = node.cached_child_count() {
            return Ok(count);
        }
        let count = self.keys(node)?.len();
        node.set_child_count(count);
        Ok(count)
    }

    pub fn is_empty_object(&self, node: &Arc<LazyNode>) -> Result<bool, FormatError> {
        self.expect_object(node, "isEmpty")
            .map_err(|e| FormatError::new(node.start_index(), e.to_string(), String::new()))?;
        let buf = self.buffer.as_ref();
        let i = scanner::skip_whitespace(buf, node.start_index() + 1);
        Ok(buf.get(i) == Some('}'))
    }

    // -- Array operations -------------------------------------------------

    /// Locates index `i`, using any interned predecessor as a shortcut: if
    /// `[i-1]` is already known, scanning resumes from its `end`; otherwise
    /// scanning starts at `[` and skips `i` values.
    pub fn element(&self, node: &Arc<LazyNode>, index: usize) -> Result<Arc<LazyNode>, PathError> {
        self.expect_array(node, "element")
            .map_err(|e| PathError::new(node.path().canonical(), e.to_string()))?;
        let buf = self.buffer.as_ref();

        let (mut scan_from, mut remaining) =
            if let Some(prev) = self.store.get(&node.path().extend_with_index(
                index.checked_sub(1).unwrap_or(usize::MAX),
            ).canonical()) {
                if index > 0 {
                    let end = prev
                        .end_index()
                        .map_err(|e| PathError::new(node.path().canonical(), e.to_string()))?;
                    (end, 0usize)
                } else {
                    (node.start_index() + 1, index)
                }
            } else {
                (node.start_index() + 1, index)
            };

        let mut i = scanner::skip_whitespace(buf, scan_from);
        // Skip past the comma that follows the shortcut predecessor, if any.
        if scan_from != node.start_index() + 1 {
            if buf.get(i) == Some(',') {
                i = scanner::skip_whitespace(buf, i + 1);
            } else if buf.get(i) == Some(']') {
                return Err(PathError::new(
                    node.path().extend_with_index(index).canonical(),
                    format!("index {index} out of range"),
                ));
            }
        }

        while remaining > 0 {
            if buf.get(i) == Some(']') {
                return Err(PathError::new(
                    node.path().extend_with_index(index).canonical(),
                    format!("index {index} out of range"),
                ));
            }
            i = scanner::skip_value(buf, i)
                .map_err(|e| PathError::new(node.path().canonical(), e.to_string()))?;
            i = scanner::skip_whitespace(buf, i);
            match buf.get(i) {
                Some(',') => i = scanner::skip_whitespace(buf, i + 1),
                Some(']') => {
                    return Err(PathError::new(
                        node.path().extend_with_index(index).canonical(),
                        format!("index {index} out of range"),
                    ))
                }
                _ => {
                    return Err(PathError::new(
                        node.path().canonical(),
                        "malformed array while scanning for index",
                    ))
                }
            }
            remaining -= 1;
        }

        if buf.get(i) == Some(']') {
            debug!(path = %node.path().canonical(), index, "element lookup miss: array exhausted");
            return Err(PathError::new(
                node.path().extend_with_index(index).canonical(),
                format!("index {index} out of range"),
            ));
        }

        let child_path = node.path().extend_with_index(index);
        let value_start = i;
        let child = self.store.get_or_intern(&child_path.canonical(), || {
            trace!(path = %child_path.canonical(), "interning element node");
            Arc::new(
                LazyNode::new(self.buffer.clone(), child_path.clone(), value_start)
                    .expect("value_start was just classified by the scanner"),
            )
        });
        self.notify(&child_path);
        Ok(child)
    }

    pub fn elements(
        &self,
        node: &Arc<LazyNode>,
        cache_nodes: bool,
    ) -> Result<Vec<Arc<LazyNode>>, FormatError> {
        self.expect_array(node, "elements")
            .map_err(|e| FormatError::new(node.start_index(), e.to_string(), String::new()))?;
        let buf = self.buffer.as_ref();
        let mut i = scanner::skip_whitespace(buf, node.start_index() + 1);
        let mut out = Vec::new();
        if buf.get(i) == Some(']') {
            return Ok(out);
        }
        let mut index = 0usize;
        loop {
            i = scanner::skip_whitespace(buf, i);
            let value_start = i;
            let child_path = node.path().extend_with_index(index);
            let child = if cache_nodes {
                let child = self.store.get_or_intern(&child_path.canonical(), || {
                    trace!(path = %child_path.canonical(), "interning element node");
                    Arc::new(
                        LazyNode::new(self.buffer.clone(), child_path.clone(), value_start)
                            .expect("value_start was just classified by the scanner"),
                    )
                });
                self.notify(&child_path);
                child
            } else {
                Arc::new(LazyNode::new(
                    self.buffer.clone(),
                    child_path.clone(),
                    value_start,
                )?)
            };
            out.push(child);
            i = scanner::skip_value(buf, value_start)?;
            i = scanner::skip_whitespace(buf, i);
            match buf.get(i) {
                Some(',') => i = scanner::skip_whitespace(buf, i + 1),
                Some(']') => return Ok(out),
                _ => {
                    return Err(FormatError::new(
                        i,
                        "',' or ']'",
                        buf.context_snippet(i, 20),
                    ))
                }
            }
            index += 1;
        }
    }

    pub fn array_size(&self, node: &Arc<LazyNode>) -> Result<usize, FormatError> {
        if let Some(count) = node.cached_child_count() {
            return Ok(count);
        }
        let count = self.elements(node, false)?.len();
        node.set_child_count(count);
        Ok(count)
    }

    pub fn is_empty_array(&self, node: &Arc<LazyNode>) -> Result<bool, FormatError> {
        self.expect_array(node, "isEmpty")
            .map_err(|e| FormatError::new(node.start_index(), e.to_string(), String::new()))?;
        let buf = self.buffer.as_ref();
        let i = scanner::skip_whitespace(buf, node.start_index() + 1);
        Ok(buf.get(i) == Some(']'))
    }
}

/// The key a bare member name needs in a path expression, re-exported here
/// for callers that build paths from raw JSON member names.
pub fn member_key(name: &str) -> String {
    key_for_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_membership_only_interns_requested_path() {
        let doc = Document::parse(r#"{"a": 1, "b": [2, 3], "c": "x"}"#).unwrap();
        let leaf = doc.resolve(&Path::of(".b[1]")).unwrap();
        assert_eq!(leaf.declaration().unwrap(), "3");
        assert_eq!(doc.object_size(&doc.root()).unwrap(), 3);
        assert!(doc.store.get(".a").is_none());
        assert!(doc.store.get(".c").is_none());
    }

    #[test]
    fn duplicate_keys_tolerated_by_members_and_size() {
        let doc = Document::parse(r#"{"a": 1, "a": 2}"#).unwrap();
        let members = doc.members(&doc.root(), true).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].0, "a");
        assert_eq!(members[0].1.declaration().unwrap(), "1");
        assert_eq!(doc.object_size(&doc.root()).unwrap(), 1);
    }

    #[test]
    fn path_error_on_undefined_navigation() {
        let doc = Document::parse(r#"{"a": {"b": 1}}"#).unwrap();
        let err = doc.resolve(&Path::of(".a.c")).unwrap_err();
        assert_eq!(err.path, "$.a.c");
    }

    #[test]
    fn array_element_shortcut_from_predecessor() {
        let doc = Document::parse("[10, 20, 30, 40]").unwrap();
        let e1 = doc.resolve(&Path::of("[1]")).unwrap();
        assert_eq!(e1.declaration().unwrap(), "20");
        let e3 = doc.resolve(&Path::of("[3]")).unwrap();
        assert_eq!(e3.declaration().unwrap(), "40");
    }

    #[test]
    fn missing_colon_after_key_is_a_format_error_not_a_panic() {
        let doc = Document::parse(r#"{"a" 1}"#).unwrap();
        assert!(doc.member(&doc.root(), "a").is_err());

        let doc = Document::parse(r#"{"a" 1}"#).unwrap();
        assert!(doc.members(&doc.root(), true).is_err());

        let doc = Document::parse(r#"{"a" 1}"#).unwrap();
        assert!(doc.keys(&doc.root()).is_err());
    }

    #[test]
    fn listener_receives_non_root_paths_only() {
        use std::sync::{Arc as StdArc, Mutex};
        let seen = StdArc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let doc = Document::parse_with_listener(
            r#"{"a": 1, "b": [2, 3], "c": "x"}"#,
            Some(Box::new(move |p: &Path| {
                seen_clone.lock().unwrap().push(p.canonical());
            })),
        )
        .unwrap();
        doc.resolve(&Path::of(".b[1]")).unwrap();
        let log = seen.lock().unwrap();
        assert_eq!(*log, vec![".b".to_string(), ".b[1]".to_string()]);
    }
}
