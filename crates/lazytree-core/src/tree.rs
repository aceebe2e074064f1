//! Virtual tree handles and dynamic dispatch to typed accessors.
//!
//! A [`VirtualTree`] never owns a node: it is a `(document, path)` pair.
//! Navigation (`member`/`element`) produces a new handle instantly; the
//! node it addresses is only resolved — and the scanner only invoked — at
//! a terminal operation (`value`, `exists`, `size`, ...).

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::document::Document;
use crate::error::{PathError, TreeError};
use crate::node::NodeType;
use crate::path::Path;
use crate::value::Value;

/// Key identifying a target type for [`TypedAccessStore`] dispatch. Not a
/// closed set — callers register their own tags alongside the built-ins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeTag(pub String);

impl TypeTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! builtin_tags {
    ($($const_name:ident => $name:literal),* $(,)?) => {
        impl TypeTag {
            $(pub fn $const_name() -> TypeTag { TypeTag::new($name) })*
        }
    };
}

builtin_tags! {
    boolean => "bool",
    int64 => "i64",
    int32 => "i32",
    float64 => "f64",
    float32 => "f32",
    char_ => "char",
    string => "string",
    instant => "instant",
    date => "date",
    time => "time",
    uuid => "uuid",
    url => "url",
    list => "list",
    map => "map",
    multimap => "multimap",
    optional => "optional",
}

/// `(parent, member-name, generic-target-tag, store) -> host-value`.
///
/// Returns a boxed value the caller downcasts to the concrete host type
/// registered for that tag. Errors surface as [`TreeError`] (wrong shape
/// at that path).
pub type AccessorFn = Arc<
    dyn Fn(&VirtualTree, &str, &TypeTag, &TypedAccessStore) -> Result<Box<dyn Any + Send + Sync>, TreeError>
        + Send
        + Sync,
>;

/// Lookup table from target-type tag to accessor function. Looked up at
/// dispatch time — not a fixed, hard-coded table.
#[derive(Clone, Default)]
pub struct TypedAccessStore {
    accessors: HashMap<TypeTag, AccessorFn>,
}

impl TypedAccessStore {
    pub fn new() -> Self {
        Self {
            accessors: HashMap::new(),
        }
    }

    /// The default store, seeded with the built-in primitive/collection
    /// accessors. Prefer constructing and passing this explicitly; use
    /// [`TypedAccessStore::new`] and `register` for a from-scratch store.
    pub fn with_builtins() -> Self {
        let mut store = Self::new();
        store.register(TypeTag::boolean(), Arc::new(accessor_bool));
        store.register(TypeTag::int64(), Arc::new(accessor_i64));
        store.register(TypeTag::float64(), Arc::new(accessor_f64));
        store.register(TypeTag::string(), Arc::new(accessor_string));
        store
    }

    pub fn register(&mut self, tag: TypeTag, accessor: AccessorFn) {
        self.accessors.insert(tag, accessor);
    }

    pub fn accessor(&self, tag: &TypeTag) -> Option<AccessorFn> {
        self.accessors.get(tag).cloned()
    }
}

fn accessor_bool(
    tree: &VirtualTree,
    _member: &str,
    _tag: &TypeTag,
    _store: &TypedAccessStore,
) -> Result<Box<dyn Any + Send + Sync>, TreeError> {
    let value = tree.value().map_err(|e| {
        TreeError::new(tree.path.canonical(), "unparseable", e.to_string())
    })?;
    value
        .as_bool()
        .map(|b| Box::new(b) as Box<dyn Any + Send + Sync>)
        .ok_or_else(|| TreeError::new(tree.path.canonical(), value_type_name(&value), "as bool"))
}

fn accessor_i64(
    tree: &VirtualTree,
    _member: &str,
    _tag: &TypeTag,
    _store: &TypedAccessStore,
) -> Result<Box<dyn Any + Send + Sync>, TreeError> {
    let value = tree.value().map_err(|e| {
        TreeError::new(tree.path.canonical(), "unparseable", e.to_string())
    })?;
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0)
        .map(|f| Box::new(f as i64) as Box<dyn Any + Send + Sync>)
        .ok_or_else(|| TreeError::new(tree.path.canonical(), value_type_name(&value), "as i64"))
}

fn accessor_f64(
    tree: &VirtualTree,
    _member: &str,
    _tag: &TypeTag,
    _store: &TypedAccessStore,
) -> Result<Box<dyn Any + Send + Sync>, TreeError> {
    let value = tree.value().map_err(|e| {
        TreeError::new(tree.path.canonical(), "unparseable", e.to_string())
    })?;
    value
        .as_f64()
        .map(|f| Box::new(f) as Box<dyn Any + Send + Sync>)
        .ok_or_else(|| TreeError::new(tree.path.canonical(), value_type_name(&value), "as f64"))
}

fn accessor_string(
    tree: &VirtualTree,
    _member: &str,
    _tag: &TypeTag,
    _store: &TypedAccessStore,
) -> Result<Box<dyn Any + Send + Sync>, TreeError> {
    let value = tree.value().map_err(|e| {
        TreeError::new(tree.path.canonical(), "unparseable", e.to_string())
    })?;
    value
        .as_str()
        .map(|s| Box::new(s.to_string()) as Box<dyn Any + Send + Sync>)
        .ok_or_else(|| TreeError::new(tree.path.canonical(), value_type_name(&value), "as string"))
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Per-document cache keyed by `(path, member-name, type-tag)`, populated
/// only by handles created through [`VirtualTree::with_access_cached`].
/// Streams/iterators are never stored here — they are single-use.
#[derive(Default)]
pub struct TypedResultCache {
    entries: RwLock<HashMap<(String, String, String), Arc<dyn Any + Send + Sync>>>,
}

impl TypedResultCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, key: &(String, String, String)) -> Option<Arc<dyn Any + Send + Sync>> {
        self.entries.read().unwrap().get(key).cloned()
    }

    fn put(&self, key: (String, String, String), value: Arc<dyn Any + Send + Sync>) {
        self.entries.write().unwrap().insert(key, value);
    }
}

/// A view that addresses one location in a document without yet resolving
/// it. Cloning is cheap (an `Arc` clone plus a `Path` clone).
#[derive(Clone)]
pub struct VirtualTree {
    doc: Arc<Document>,
    path: Path,
    cache: Option<Arc<TypedResultCache>>,
}

impl VirtualTree {
    pub fn root(doc: Arc<Document>) -> Self {
        Self {
            doc,
            path: Path::root(),
            cache: None,
        }
    }

    pub fn at(doc: Arc<Document>, path: Path) -> Self {
        Self {
            doc,
            path,
            cache: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.doc
    }

    /// Returns a handle identical to this one but backed by a shared
    /// typed-result cache — subsequent `access` calls on it (and handles
    /// derived from it) memoize by `(path, member, tag)`.
    pub fn with_access_cached(&self) -> Self {
        Self {
            doc: self.doc.clone(),
            path: self.path.clone(),
            cache: Some(Arc::new(TypedResultCache::new())),
        }
    }

    pub fn member(&self, name: &str) -> VirtualTree {
        VirtualTree {
            doc: self.doc.clone(),
            path: self.path.extend_with_member(name),
            cache: self.cache.clone(),
        }
    }

    pub fn element(&self, index: usize) -> VirtualTree {
        VirtualTree {
            doc: self.doc.clone(),
            path: self.path.extend_with_index(index),
            cache: self.cache.clone(),
        }
    }

    /// Definitive presence check: swallows *path error*, never *format
    /// error* (a malformed ancestor along the way is a real failure).
    pub fn exists(&self) -> bool {
        self.doc.resolve(&self.path).is_ok()
    }

    pub fn is_undefined(&self) -> bool {
        !self.exists()
    }

    pub fn get_type(&self) -> Result<NodeType, PathError> {
        Ok(self.doc.resolve(&self.path)?.get_type())
    }

    pub fn value(&self) -> Result<Value, PathError> {
        let node = self.doc.resolve(&self.path)?;
        node.value()
            .map_err(|e| PathError::new(self.path.canonical(), e.to_string()))
    }

    pub fn declaration(&self) -> Result<String, PathError> {
        let node = self.doc.resolve(&self.path)?;
        node.declaration()
            .map_err(|e| PathError::new(self.path.canonical(), e.to_string()))
    }

    pub fn size(&self) -> Result<usize, TreeError> {
        let node = self
            .doc
            .resolve(&self.path)
            .map_err(|e| TreeError::new(self.path.canonical(), "undefined", e.to_string()))?;
        match node.get_type() {
            NodeType::Object => self
                .doc
                .object_size(&node)
                .map_err(|e| TreeError::new(self.path.canonical(), "object", e.to_string())),
            NodeType::Array => self
                .doc
                .array_size(&node)
                .map_err(|e| TreeError::new(self.path.canonical(), "array", e.to_string())),
            other => Err(TreeError::new(
                self.path.canonical(),
                other.as_str(),
                "size",
            )),
        }
    }

    pub fn is_empty(&self) -> Result<bool, TreeError> {
        let node = self
            .doc
            .resolve(&self.path)
            .map_err(|e| TreeError::new(self.path.canonical(), "undefined", e.to_string()))?;
        match node.get_type() {
            NodeType::Object => self
                .doc
                .is_empty_object(&node)
                .map_err(|e| TreeError::new(self.path.canonical(), "object", e.to_string())),
            NodeType::Array => self
                .doc
                .is_empty_array(&node)
                .map_err(|e| TreeError::new(self.path.canonical(), "array", e.to_string())),
            other => Err(TreeError::new(
                self.path.canonical(),
                other.as_str(),
                "isEmpty",
            )),
        }
    }

    /// Dispatches `member` to the registered accessor for `tag`, applying
    /// the per-handle cache if this handle was created via
    /// [`VirtualTree::with_access_cached`].
    pub fn access(
        &self,
        member: &str,
        tag: &TypeTag,
        store: &TypedAccessStore,
    ) -> Result<Arc<dyn Any + Send + Sync>, TreeError> {
        let key = (self.path.canonical(), member.to_string(), tag.0.clone());
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                return Ok(hit);
            }
        }
        let accessor = store.accessor(tag).ok_or_else(|| {
            TreeError::new(self.path.canonical(), "unregistered", tag.to_string())
        })?;
        let child = self.member(member);
        let result: Arc<dyn Any + Send + Sync> = accessor(&child, member, tag, store)?.into();
        if let Some(cache) = &self.cache {
            cache.put(key, result.clone());
        }
        Ok(result)
    }
}

/// Applies the "assumed getter" naming rule: `getX`/`isX` accessor names
/// default to the JSON member name `x` (first letter lowered); anything
/// else is used verbatim as the member name.
pub fn assumed_member_name(accessor_name: &str) -> String {
    for prefix in ["get", "is"] {
        if let Some(rest) = accessor_name.strip_prefix(prefix) {
            if rest.chars().next().is_some_and(|c| c.is_uppercase()) {
                let mut chars = rest.chars();
                let first = chars.next().unwrap().to_ascii_lowercase();
                return format!("{first}{}", chars.as_str());
            }
        }
    }
    accessor_name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_never_fails_only_terminals_do() {
        let doc = Document::parse(r#"{"a": 1}"#).unwrap();
        let tree = VirtualTree::root(doc).member("missing").element(4);
        assert!(tree.is_undefined());
        assert!(tree.value().is_err());
    }

    #[test]
    fn exists_is_the_definitive_check() {
        let doc = Document::parse(r#"{"a": {"b": 1}}"#).unwrap();
        let tree = VirtualTree::root(doc);
        assert!(tree.member("a").member("b").exists());
        assert!(!tree.member("a").member("c").exists());
    }

    #[test]
    fn builtin_string_accessor_round_trips() {
        let doc = Document::parse(r#"{"name": "ada"}"#).unwrap();
        let tree = VirtualTree::root(doc);
        let store = TypedAccessStore::with_builtins();
        let boxed = tree.access("name", &TypeTag::string(), &store).unwrap();
        assert_eq!(boxed.downcast_ref::<String>().unwrap(), "ada");
    }

    #[test]
    fn access_cache_reuses_result_for_same_key() {
        let doc = Document::parse(r#"{"n": 7}"#).unwrap();
        let tree = VirtualTree::root(doc).with_access_cached();
        let store = TypedAccessStore::with_builtins();
        let first = tree.access("n", &TypeTag::int64(), &store).unwrap();
        let second = tree.access("n", &TypeTag::int64(), &store).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn assumed_getter_names_strip_prefix_and_lowercase() {
        assert_eq!(assumed_member_name("getName"), "name");
        assert_eq!(assumed_member_name("isActive"), "active");
        assert_eq!(assumed_member_name("rawField"), "rawField");
        // "is" + lowercase rest is not a recognized getter form
        assert_eq!(assumed_member_name("get"), "get");
    }
}
