use crate::core::{Document, IndexError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A point-in-time, shareable snapshot of a collection's committed state.
///
/// Views are handed out by a resource and stay readable after they have
/// been superseded, until the disposal grace delay closes them. Cloning is
/// cheap; every clone shares the same underlying snapshot and closed flag.
#[derive(Debug, Clone)]
pub struct SearchView {
    inner: Arc<ViewInner>,
}

#[derive(Debug)]
struct ViewInner {
    collection: String,
    docs: Arc<HashMap<String, Document>>,
    closed: AtomicBool,
}

impl SearchView {
    pub fn new(collection: impl Into<String>, docs: Arc<HashMap<String, Document>>) -> Self {
        Self {
            inner: Arc::new(ViewInner {
                collection: collection.into(),
                docs,
                closed: AtomicBool::new(false),
            }),
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(IndexError::ViewClosed(self.inner.collection.clone()));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Document>> {
        self.check_open()?;
        Ok(self.inner.docs.get(id).cloned())
    }

    /// Linear scan over documents whose `field` equals `value`. Query
    /// execution proper lives in the collaborating query layer; this is
    /// just enough surface to serve point reads.
    pub fn find(&self, field: &str, value: &Value) -> Result<Vec<Document>> {
        self.check_open()?;
        Ok(self
            .inner
            .docs
            .values()
            .filter(|doc| doc.get(field) == Some(value))
            .cloned()
            .collect())
    }

    pub fn len(&self) -> Result<usize> {
        self.check_open()?;
        Ok(self.inner.docs.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Mark the view closed; subsequent reads through any clone fail.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    /// True when both views share the same underlying snapshot.
    pub fn same_instance(&self, other: &SearchView) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> SearchView {
        let mut docs = HashMap::new();
        docs.insert(
            "a1".to_string(),
            Document::new("a1").field("kind", "article"),
        );
        docs.insert(
            "a2".to_string(),
            Document::new("a2").field("kind", "article"),
        );
        docs.insert("u1".to_string(), Document::new("u1").field("kind", "user"));
        SearchView::new("docs", Arc::new(docs))
    }

    #[test]
    fn test_get_and_find() {
        let v = view();
        assert!(v.get("a1").unwrap().is_some());
        assert!(v.get("zz").unwrap().is_none());
        assert_eq!(v.find("kind", &Value::from("article")).unwrap().len(), 2);
        assert_eq!(v.len().unwrap(), 3);
    }

    #[test]
    fn test_close_fails_reads_through_clones() {
        let v = view();
        let clone = v.clone();
        v.close();
        assert!(clone.is_closed());
        assert!(matches!(
            clone.get("a1"),
            Err(IndexError::ViewClosed(name)) if name == "docs"
        ));
    }

    #[test]
    fn test_same_instance() {
        let v = view();
        let clone = v.clone();
        assert!(v.same_instance(&clone));
        assert!(!v.same_instance(&view()));
    }
}
