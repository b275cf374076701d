use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::StoreError;
use crate::models::*;

/// Session-scoped document tree with selection state.
///
/// Documents are kept in insertion order. Every `parent_id` refers to a
/// document in the store and the parent graph has no cycles.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
    selected_id: Option<Uuid>,
    root_id: Option<Uuid>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Direct children of `parent_id`, in insertion order.
    pub fn children(&self, parent_id: Uuid) -> Vec<&Document> {
        self.documents
            .iter()
            .filter(|d| d.parent_id == Some(parent_id))
            .collect()
    }

    pub fn selected_id(&self) -> Option<Uuid> {
        self.selected_id
    }

    pub fn root_id(&self) -> Option<Uuid> {
        self.root_id
    }

    /// Insert a draft, assigning id and timestamps. Returns the new id.
    pub fn add(&mut self, draft: DocumentDraft) -> Result<Uuid, StoreError> {
        if let Some(parent_id) = draft.parent_id {
            if self.get(parent_id).is_none() {
                return Err(StoreError::not_found("Parent document", parent_id));
            }
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        self.documents.push(Document {
            id,
            parent_id: draft.parent_id,
            title: draft.title,
            doc_type: draft.doc_type,
            content: draft.content,
            status: draft.status,
            score: None,
            adr: None,
            children_ids: Vec::new(),
            version: draft.version,
            created_at: now,
            updated_at: now,
        });

        if let Some(parent_id) = draft.parent_id {
            self.link_child(parent_id, id);
        }

        Ok(id)
    }

    /// Merge `input` into the document and bump `updated_at`.
    pub fn update(&mut self, id: Uuid, input: UpdateDocumentInput) -> Result<&Document, StoreError> {
        let existing = self
            .get(id)
            .ok_or_else(|| StoreError::not_found("Document", id))?;
        let old_parent = existing.parent_id;

        if let Some(new_parent) = input.parent_id {
            if self.get(new_parent).is_none() {
                return Err(StoreError::not_found("Parent document", new_parent));
            }
            if new_parent == id || self.is_ancestor(id, new_parent) {
                return Err(StoreError::Cycle {
                    id,
                    parent_id: new_parent,
                });
            }
        }

        if let Some(new_parent) = input.parent_id.filter(|p| Some(*p) != old_parent) {
            if let Some(old) = old_parent {
                self.unlink_child(old, id);
            }
            self.link_child(new_parent, id);
        }

        let doc = self
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::not_found("Document", id))?;
        if let Some(parent_id) = input.parent_id {
            doc.parent_id = Some(parent_id);
        }
        if let Some(title) = input.title {
            doc.title = title;
        }
        if let Some(content) = input.content {
            doc.content = content;
        }
        if let Some(status) = input.status {
            doc.status = status;
        }
        if let Some(score) = input.score {
            doc.score = Some(score);
        }
        if let Some(adr) = input.adr {
            doc.adr = Some(adr);
        }
        if let Some(version) = input.version {
            doc.version = version;
        }
        doc.updated_at = Utc::now();

        Ok(doc)
    }

    /// Remove a document together with all of its descendants.
    ///
    /// Returns the removed ids. Selection and root are cleared when they
    /// point into the removed subtree.
    pub fn delete(&mut self, id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let doc = self
            .get(id)
            .ok_or_else(|| StoreError::not_found("Document", id))?;
        let parent_id = doc.parent_id;

        let mut removed = vec![id];
        let mut i = 0;
        while i < removed.len() {
            let current = removed[i];
            removed.extend(
                self.documents
                    .iter()
                    .filter(|d| d.parent_id == Some(current))
                    .map(|d| d.id),
            );
            i += 1;
        }

        self.documents.retain(|d| !removed.contains(&d.id));
        if let Some(parent_id) = parent_id {
            self.unlink_child(parent_id, id);
        }
        if self.selected_id.is_some_and(|s| removed.contains(&s)) {
            self.selected_id = None;
        }
        if self.root_id.is_some_and(|r| removed.contains(&r)) {
            self.root_id = None;
        }

        Ok(removed)
    }

    /// Change the selection. `None` clears it.
    pub fn select(&mut self, id: Option<Uuid>) -> Result<(), StoreError> {
        if let Some(id) = id {
            if self.get(id).is_none() {
                return Err(StoreError::not_found("Document", id));
            }
        }
        self.selected_id = id;
        Ok(())
    }

    /// Designate the session's root document.
    pub fn set_root(&mut self, id: Uuid) -> Result<(), StoreError> {
        if self.get(id).is_none() {
            return Err(StoreError::not_found("Document", id));
        }
        self.root_id = Some(id);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.selected_id = None;
        self.root_id = None;
    }

    /// Nested view of every document, starting from parentless documents.
    pub fn tree(&self) -> Vec<DocumentTreeNode> {
        let mut children_map: HashMap<Option<Uuid>, Vec<&Document>> = HashMap::new();
        for doc in &self.documents {
            children_map.entry(doc.parent_id).or_default().push(doc);
        }

        fn build_subtree(
            parent_id: Option<Uuid>,
            children_map: &HashMap<Option<Uuid>, Vec<&Document>>,
        ) -> Vec<DocumentTreeNode> {
            children_map
                .get(&parent_id)
                .map(|docs| {
                    docs.iter()
                        .map(|d| DocumentTreeNode {
                            document: (*d).clone(),
                            children: build_subtree(Some(d.id), children_map),
                        })
                        .collect()
                })
                .unwrap_or_default()
        }

        build_subtree(None, &children_map)
    }

    /// Whether `ancestor` lies on the parent chain of `id`.
    fn is_ancestor(&self, ancestor: Uuid, id: Uuid) -> bool {
        let mut current = self.get(id).and_then(|d| d.parent_id);
        // The chain can be no longer than the store.
        for _ in 0..self.documents.len() {
            match current {
                Some(p) if p == ancestor => return true,
                Some(p) => current = self.get(p).and_then(|d| d.parent_id),
                None => return false,
            }
        }
        false
    }

    fn link_child(&mut self, parent_id: Uuid, child_id: Uuid) {
        if let Some(parent) = self.documents.iter_mut().find(|d| d.id == parent_id) {
            if !parent.children_ids.contains(&child_id) {
                parent.children_ids.push(child_id);
            }
        }
    }

    fn unlink_child(&mut self, parent_id: Uuid, child_id: Uuid) {
        if let Some(parent) = self.documents.iter_mut().find(|d| d.id == parent_id) {
            parent.children_ids.retain(|c| *c != child_id);
        }
    }
}
