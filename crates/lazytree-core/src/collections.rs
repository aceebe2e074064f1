//! Collection views: thin retyping wrappers over a [`VirtualTree`].
//!
//! None of these copy anything — each accessor composes with the
//! underlying tree's own laziness. Iteration order for objects and their
//! views is insertion order, per the document's source order.

use crate::error::TreeError;
use crate::tree::VirtualTree;

/// Retypes an array's elements as `T` via `extract`.
pub struct ListView<'a, T> {
    tree: VirtualTree,
    extract: Box<dyn Fn(&VirtualTree) -> Result<T, TreeError> + 'a>,
}

impl<'a, T> ListView<'a, T> {
    pub fn new(tree: VirtualTree, extract: impl Fn(&VirtualTree) -> Result<T, TreeError> + 'a) -> Self {
        Self {
            tree,
            extract: Box::new(extract),
        }
    }

    pub fn len(&self) -> Result<usize, TreeError> {
        self.tree.size()
    }

    pub fn is_empty(&self) -> Result<bool, TreeError> {
        self.tree.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<T, TreeError> {
        (self.extract)(&self.tree.element(index))
    }

    pub fn iter(&self) -> Result<Vec<T>, TreeError> {
        let len = self.len()?;
        (0..len).map(|i| self.get(i)).collect()
    }
}

/// Retypes an object's values as `T` via `extract`, keyed by member name.
pub struct MapView<'a, T> {
    tree: VirtualTree,
    extract: Box<dyn Fn(&VirtualTree) -> Result<T, TreeError> + 'a>,
}

impl<'a, T> MapView<'a, T> {
    pub fn new(tree: VirtualTree, extract: impl Fn(&VirtualTree) -> Result<T, TreeError> + 'a) -> Self {
        Self {
            tree,
            extract: Box::new(extract),
        }
    }

    pub fn get(&self, key: &str) -> Result<T, TreeError> {
        (self.extract)(&self.tree.member(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.tree.member(key).exists()
    }

    /// `(key, value)` pairs in source order. Requires resolving the
    /// underlying object's members, which interns a node per key.
    pub fn entries(&self) -> Result<Vec<(String, T)>, TreeError> {
        let node = self
            .tree
            .document()
            .resolve(self.tree.path())
            .map_err(|e| TreeError::new(self.tree.path().canonical(), "undefined", e.to_string()))?;
        let members = self
            .tree
            .document()
            .members(&node, true)
            .map_err(|e| TreeError::new(self.tree.path().canonical(), "object", e.to_string()))?;
        members
            .into_iter()
            .map(|(name, _)| {
                let value = (self.extract)(&self.tree.member(&name))?;
                Ok((name, value))
            })
            .collect()
    }
}

/// An object whose values are arrays: `get(k)` returns a [`ListView`] over
/// `O[k]` rather than a single `T`.
pub struct MultimapView<'a, T> {
    tree: VirtualTree,
    extract: std::rc::Rc<dyn Fn(&VirtualTree) -> Result<T, TreeError> + 'a>,
}

impl<'a, T: 'a> MultimapView<'a, T> {
    pub fn new(tree: VirtualTree, extract: impl Fn(&VirtualTree) -> Result<T, TreeError> + 'a) -> Self {
        Self {
            tree,
            extract: std::rc::Rc::new(extract),
        }
    }

    pub fn get(&self, key: &str) -> ListView<'a, T> {
        let extract = self.extract.clone();
        ListView::new(self.tree.member(key), move |t| extract(t))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.tree.member(key).exists()
    }
}

/// Lazily composes a unary transform `f: A -> B` over an existing
/// `ListView`/`entries()`-style source. Size is preserved; nothing runs
/// until the projected element is actually requested.
pub struct Projection<I, F> {
    source: I,
    f: F,
}

impl<I, F> Projection<I, F> {
    pub fn new(source: I, f: F) -> Self {
        Self { source, f }
    }
}

impl<I, A, B, F> Iterator for Projection<I, F>
where
    I: Iterator<Item = A>,
    F: FnMut(A) -> B,
{
    type Item = B;

    fn next(&mut self) -> Option<B> {
        self.source.next().map(|a| (self.f)(a))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.source.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::value::Value;

    fn as_i64(tree: &VirtualTree) -> Result<i64, TreeError> {
        let v = tree
            .value()
            .map_err(|e| TreeError::new(tree.path().canonical(), "undefined", e.to_string()))?;
        match v {
            Value::Number(n) if n.fract() == 0.0 => Ok(n as i64),
            other => Err(TreeError::new(
                tree.path().canonical(),
                format!("{other:?}"),
                "as i64",
            )),
        }
    }

    fn as_string(tree: &VirtualTree) -> Result<String, TreeError> {
        let v = tree
            .value()
            .map_err(|e| TreeError::new(tree.path().canonical(), "undefined", e.to_string()))?;
        v.as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| TreeError::new(tree.path().canonical(), "not a string", "as string"))
    }

    #[test]
    fn list_view_iterates_in_order() {
        let doc = Document::parse("[1, 2, 3]").unwrap();
        let view = ListView::new(VirtualTree::root(doc), as_i64);
        assert_eq!(view.iter().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn map_view_entries_preserve_source_order() {
        let doc = Document::parse(r#"{"b": 2, "a": 1}"#).unwrap();
        let view = MapView::new(VirtualTree::root(doc), as_i64);
        let entries = view.entries().unwrap();
        assert_eq!(entries, vec![("b".to_string(), 2), ("a".to_string(), 1)]);
    }

    #[test]
    fn multimap_view_lists_per_key() {
        let doc = Document::parse(r#"{"tags": ["x", "y"]}"#).unwrap();
        let view = MultimapView::new(VirtualTree::root(doc), as_string);
        let list = view.get("tags");
        assert_eq!(list.iter().unwrap(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn projection_transforms_lazily() {
        let doc = Document::parse("[1, 2, 3]").unwrap();
        let view = ListView::new(VirtualTree::root(doc), as_i64);
        let projected: Vec<i64> = Projection::new(view.iter().unwrap().into_iter(), |n| n * 10).collect();
        assert_eq!(projected, vec![10, 20, 30]);
    }
}
