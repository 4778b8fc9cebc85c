//! Ordered collection of the session's documents.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::core::document::Document;
use crate::core::ids::DocumentId;

/// Documents owned by the current session, in server order then arrival order.
#[derive(Default)]
pub struct DocumentRegistry {
    documents: RwLock<Vec<Document>>,
}

impl DocumentRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Document>> {
        self.documents.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Document>> {
        self.documents.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the contents with a freshly fetched list.
    pub fn replace_all(&self, documents: Vec<Document>) {
        debug!(count = documents.len(), "document registry replaced");
        *self.write() = documents;
    }

    /// Append a document. Colliding ids are not deduplicated.
    pub fn add(&self, document: Document) {
        debug!(id = %document.id, "document added");
        self.write().push(document);
    }

    /// Remove every entry with `id`, returning the first one removed.
    pub fn remove(&self, id: &DocumentId) -> Option<Document> {
        let mut documents = self.write();
        let position = documents.iter().position(|doc| &doc.id == id)?;
        let removed = documents.remove(position);
        documents.retain(|doc| &doc.id != id);
        debug!(%id, "document removed");
        Some(removed)
    }

    /// Drop every document.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Snapshot of all documents.
    #[must_use]
    pub fn list(&self) -> Vec<Document> {
        self.read().clone()
    }

    /// Look up a document.
    #[must_use]
    pub fn get(&self, id: &DocumentId) -> Option<Document> {
        self.read().iter().find(|doc| &doc.id == id).cloned()
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.read().iter().any(|doc| &doc.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(id: &str) -> Document {
        Document::new(id, format!("{id}.pdf"), Utc::now())
    }

    #[test]
    fn replace_then_append_keeps_order() {
        let registry = DocumentRegistry::new();
        registry.replace_all(vec![doc("d1"), doc("d2")]);
        registry.add(doc("d3"));

        let ids: Vec<DocumentId> = registry.list().into_iter().map(|d| d.id).collect();
        let expected: Vec<DocumentId> = vec!["d1".into(), "d2".into(), "d3".into()];
        assert_eq!(ids, expected);
    }

    #[test]
    fn add_does_not_deduplicate() {
        let registry = DocumentRegistry::new();
        registry.add(doc("d1"));
        registry.add(doc("d1"));
        assert_eq!(registry.list().len(), 2);

        assert!(registry.remove(&"d1".into()).is_some());
        assert!(registry.list().is_empty());
    }

    #[test]
    fn remove_missing_is_none() {
        let registry = DocumentRegistry::new();
        registry.add(doc("d1"));
        assert!(registry.remove(&"nope".into()).is_none());
        assert!(registry.contains(&"d1".into()));
        assert_eq!(registry.get(&"d1".into()).unwrap().filename, "d1.pdf");
    }
}
