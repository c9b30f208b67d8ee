//! Collection operations: insert, find, update, delete and index management.

use std::collections::HashSet;

use serde_json::Value;
use sled::{Batch, Tree};

use crate::database::Database;
use crate::document::{compare_values, describe, get_path, set_path, Document, ID_FIELD};
use crate::error::{Error, Result, WriteError};
use crate::filter::Filter;
use crate::index::{encode_primary, IndexSpec, SortOrder};

/// Options for [`Collection::find`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Fields to keep (plus `_id`). None keeps the whole document.
    pub projection: Option<Vec<String>>,
    /// Sort keys applied after filtering.
    pub sort: Vec<(String, SortOrder)>,
    /// Name of an index to drive the scan.
    pub hint: Option<String>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    pub fn hint(mut self, index: impl Into<String>) -> Self {
        self.hint = Some(index.into());
        self
    }
}

/// Field assignments applied by [`Collection::update_many`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Vec<(String, Value)>,
}

impl Update {
    /// Assign a single field.
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            set: vec![(field.into(), value.into())],
        }
    }

    fn apply(&self, doc: &mut Document) -> Result<()> {
        for (field, value) in &self.set {
            if field == ID_FIELD {
                return Err(Error::InvalidDocument("_id cannot be modified".into()));
            }
            set_path(doc, field, value.clone());
        }
        Ok(())
    }
}

/// Outcome of an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents matching the filter.
    pub matched: u64,
    /// Documents whose content changed.
    pub modified: u64,
}

/// A named set of documents with its secondary indexes.
pub struct Collection {
    name: String,
    db: Database,
    docs: Tree,
    indexes: Vec<(IndexSpec, Tree)>,
}

impl Collection {
    pub(crate) fn new(
        name: String,
        db: Database,
        docs: Tree,
        indexes: Vec<(IndexSpec, Tree)>,
    ) -> Self {
        Self {
            name,
            db,
            docs,
            indexes,
        }
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// True if the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Declared indexes.
    pub fn indexes(&self) -> Vec<IndexSpec> {
        self.indexes.iter().map(|(spec, _)| spec.clone()).collect()
    }

    pub(crate) fn index_on(&self, field: &str) -> Option<&(IndexSpec, Tree)> {
        self.indexes
            .iter()
            .find(|(spec, _)| spec.first_field() == Some(field))
    }

    // -------------------------------------------------------------------------
    // Index management
    // -------------------------------------------------------------------------

    /// Declare an index and build it from existing documents.
    ///
    /// Re-declaring an identical index is a no-op.
    pub fn create_index(&mut self, spec: IndexSpec) -> Result<()> {
        if let Some((existing, _)) = self.indexes.iter().find(|(s, _)| s.name == spec.name) {
            if *existing == spec {
                return Ok(());
            }
            return Err(Error::IndexConflict {
                collection: self.name.clone(),
                index: spec.name,
            });
        }

        let tree = self.db.open_index_tree(&self.name, &spec)?;
        let mut batch = Batch::default();
        let mut seen = HashSet::new();
        for entry in self.docs.iter() {
            let (primary, bytes) = entry?;
            let doc = decode(&bytes)?;
            let key = spec.entry_key(&doc, &primary);
            if spec.unique && !seen.insert(key.clone()) {
                return Err(self.duplicate(&spec.name, &doc, &spec));
            }
            batch.insert(key, primary.to_vec());
        }
        tree.apply_batch(batch)?;
        self.db.store_index_spec(&self.name, &spec)?;

        tracing::debug!(collection = %self.name, index = %spec.name, "index created");
        self.indexes.push((spec, tree));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Insert many documents without stopping at the first failure.
    ///
    /// Documents that collide with `_id` or a unique index are skipped and
    /// reported in [`Error::BulkWrite`]; every other document is committed.
    pub fn insert_many<I>(&self, docs: I) -> Result<u64>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut doc_batch = Batch::default();
        let mut index_batches: Vec<Batch> = self.indexes.iter().map(|_| Batch::default()).collect();
        let mut pending_primary: HashSet<Vec<u8>> = HashSet::new();
        let mut pending_unique: Vec<HashSet<Vec<u8>>> =
            self.indexes.iter().map(|_| HashSet::new()).collect();
        let mut errors = Vec::new();
        let mut inserted = 0u64;

        'docs: for (position, mut doc) in docs.into_iter().enumerate() {
            let id = self.ensure_id(&mut doc)?;
            if id.is_array() || id.is_object() {
                errors.push(WriteError::invalid(position, "_id must be a scalar"));
                continue;
            }

            let primary = encode_primary(&id);
            if pending_primary.contains(&primary) || self.docs.contains_key(&primary)? {
                errors.push(WriteError::duplicate(
                    position,
                    format!("{}: _id {}", self.name, describe(&id)),
                ));
                continue;
            }

            let keys: Vec<Vec<u8>> = self
                .indexes
                .iter()
                .map(|(spec, _)| spec.entry_key(&doc, &primary))
                .collect();

            for (slot, (spec, tree)) in self.indexes.iter().enumerate() {
                if spec.unique
                    && (pending_unique[slot].contains(&keys[slot])
                        || tree.contains_key(&keys[slot])?)
                {
                    errors.push(WriteError::duplicate(
                        position,
                        format!("{}: {} {}", self.name, spec.name, describe_key(&doc, spec)),
                    ));
                    continue 'docs;
                }
            }

            for (slot, key) in keys.into_iter().enumerate() {
                if self.indexes[slot].0.unique {
                    pending_unique[slot].insert(key.clone());
                }
                index_batches[slot].insert(key, primary.clone());
            }
            doc_batch.insert(primary.clone(), serde_json::to_vec(&doc)?);
            pending_primary.insert(primary);
            inserted += 1;
        }

        self.docs.apply_batch(doc_batch)?;
        for ((_, tree), batch) in self.indexes.iter().zip(index_batches) {
            tree.apply_batch(batch)?;
        }

        if errors.is_empty() {
            Ok(inserted)
        } else {
            Err(Error::BulkWrite { inserted, errors })
        }
    }

    /// Apply an update to every matching document.
    ///
    /// Unique constraints are checked for the whole update before anything
    /// is written, so a conflict leaves the collection untouched.
    pub fn update_many(&self, filter: &Filter, update: &Update) -> Result<UpdateResult> {
        let mut result = UpdateResult::default();
        let mut changes = Vec::new();
        for (primary, old) in self.scan_matching(filter)? {
            result.matched += 1;
            let mut new = old.clone();
            update.apply(&mut new)?;
            if new != old {
                changes.push((primary, old, new));
            }
        }

        let mut index_batches = Vec::with_capacity(self.indexes.len());
        for (spec, tree) in &self.indexes {
            let moves: Vec<(Vec<u8>, Vec<u8>, &Vec<u8>, &Document)> = changes
                .iter()
                .map(|(primary, old, new)| {
                    (spec.entry_key(old, primary), spec.entry_key(new, primary), primary, new)
                })
                .filter(|(old_key, new_key, _, _)| old_key != new_key)
                .collect();

            if spec.unique {
                let vacated: HashSet<&[u8]> = moves.iter().map(|(old_key, ..)| old_key.as_slice()).collect();
                let mut claimed = HashSet::new();
                for (_, new_key, primary, new) in &moves {
                    let taken = match tree.get(new_key)? {
                        Some(owner) => {
                            owner.as_ref() != primary.as_slice() && !vacated.contains(new_key.as_slice())
                        }
                        None => false,
                    };
                    if taken || !claimed.insert(new_key.as_slice()) {
                        return Err(self.duplicate(&spec.name, new, spec));
                    }
                }
            }

            let mut batch = Batch::default();
            for (old_key, ..) in &moves {
                batch.remove(old_key.as_slice());
            }
            for (_, new_key, primary, _) in &moves {
                batch.insert(new_key.as_slice(), primary.as_slice());
            }
            index_batches.push(batch);
        }

        let mut doc_batch = Batch::default();
        for (primary, _, new) in &changes {
            doc_batch.insert(primary.as_slice(), serde_json::to_vec(new)?);
        }
        self.docs.apply_batch(doc_batch)?;
        for ((_, tree), batch) in self.indexes.iter().zip(index_batches) {
            tree.apply_batch(batch)?;
        }

        result.modified = changes.len() as u64;
        Ok(result)
    }

    /// Remove every matching document, returning how many were removed.
    pub fn delete_many(&self, filter: &Filter) -> Result<u64> {
        let mut removed = 0u64;
        for (primary, doc) in self.scan_matching(filter)? {
            for (spec, tree) in &self.indexes {
                tree.remove(spec.entry_key(&doc, &primary))?;
            }
            self.docs.remove(primary)?;
            removed += 1;
        }
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Find matching documents.
    pub fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>> {
        let (mut docs, ordered_by) = self.candidates(filter, options.hint.as_deref())?;
        docs.retain(|doc| filter.matches(doc));

        let presorted = ordered_by
            .map(|spec| spec.keys == options.sort)
            .unwrap_or(false);
        if !options.sort.is_empty() && !presorted {
            sort_documents(&mut docs, &options.sort);
        }

        if let Some(fields) = &options.projection {
            docs = docs.into_iter().map(|doc| project(doc, fields)).collect();
        }

        Ok(docs)
    }

    /// Fetch documents whose `field` equals any of `values`, using an index
    /// on that field when one exists.
    pub(crate) fn lookup_by(&self, field: &str, values: &[Value]) -> Result<Vec<Document>> {
        match self.index_on(field) {
            Some((spec, tree)) => {
                let mut docs = Vec::new();
                for value in values {
                    for entry in tree.scan_prefix(spec.leading_prefix(value)) {
                        let (_, primary) = entry?;
                        if let Some(doc) = self.get_by_primary(&primary)? {
                            docs.push(doc);
                        }
                    }
                }
                Ok(docs)
            }
            None => {
                let filter = Filter::is_in(field, values.iter().cloned());
                Ok(self
                    .scan_matching(&filter)?
                    .into_iter()
                    .map(|(_, doc)| doc)
                    .collect())
            }
        }
    }

    /// All documents in primary key order.
    pub(crate) fn scan_all(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::with_capacity(self.docs.len());
        for entry in self.docs.iter() {
            let (_, bytes) = entry?;
            docs.push(decode(&bytes)?);
        }
        Ok(docs)
    }

    /// Resolve the access path. Returns candidate documents and, when the
    /// candidates come from a full index scan, the index that orders them.
    pub(crate) fn candidates(
        &self,
        filter: &Filter,
        hint: Option<&str>,
    ) -> Result<(Vec<Document>, Option<&IndexSpec>)> {
        let Some(hint) = hint else {
            return Ok((self.scan_all()?, None));
        };

        let (spec, tree) = self
            .indexes
            .iter()
            .find(|(spec, _)| spec.name == hint)
            .ok_or_else(|| Error::IndexNotFound {
                collection: self.name.clone(),
                index: hint.to_string(),
            })?;

        let leading = spec.first_field().unwrap_or(ID_FIELD);
        let mut docs = Vec::new();
        match filter.equality_values(leading) {
            Some(values) => {
                for value in values {
                    for entry in tree.scan_prefix(spec.leading_prefix(&value)) {
                        let (_, primary) = entry?;
                        if let Some(doc) = self.get_by_primary(&primary)? {
                            docs.push(doc);
                        }
                    }
                }
                Ok((docs, None))
            }
            None => {
                for entry in tree.iter() {
                    let (_, primary) = entry?;
                    if let Some(doc) = self.get_by_primary(&primary)? {
                        docs.push(doc);
                    }
                }
                Ok((docs, Some(spec)))
            }
        }
    }

    fn scan_matching(&self, filter: &Filter) -> Result<Vec<(Vec<u8>, Document)>> {
        let mut matches = Vec::new();
        for entry in self.docs.iter() {
            let (primary, bytes) = entry?;
            let doc = decode(&bytes)?;
            if filter.matches(&doc) {
                matches.push((primary.to_vec(), doc));
            }
        }
        Ok(matches)
    }

    fn get_by_primary(&self, primary: &[u8]) -> Result<Option<Document>> {
        match self.docs.get(primary)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn ensure_id(&self, doc: &mut Document) -> Result<Value> {
        if let Some(id) = doc.get(ID_FIELD) {
            return Ok(id.clone());
        }
        let id = Value::from(self.db.generate_id()?);
        doc.insert(ID_FIELD.to_string(), id.clone());
        Ok(id)
    }

    fn duplicate(&self, index: &str, doc: &Document, spec: &IndexSpec) -> Error {
        Error::DuplicateKey {
            collection: self.name.clone(),
            index: index.to_string(),
            key: describe_key(doc, spec),
        }
    }
}

/// Sort documents by the given keys; missing fields sort as `null`.
pub(crate) fn sort_documents(docs: &mut [Document], keys: &[(String, SortOrder)]) {
    docs.sort_by(|a, b| {
        for (field, order) in keys {
            let left = get_path(a, field).unwrap_or(&Value::Null);
            let right = get_path(b, field).unwrap_or(&Value::Null);
            let ord = match order {
                SortOrder::Asc => compare_values(left, right),
                SortOrder::Desc => compare_values(right, left),
            };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
}

fn project(doc: Document, fields: &[String]) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for field in fields {
        if let Some(value) = get_path(&doc, field) {
            set_path(&mut out, field, value.clone());
        }
    }
    out
}

fn describe_key(doc: &Document, spec: &IndexSpec) -> String {
    spec.keys
        .iter()
        .map(|(field, _)| {
            let value = get_path(doc, field).unwrap_or(&Value::Null);
            format!("{}={}", field, describe(value))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn decode(bytes: &[u8]) -> Result<Document> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriteErrorKind;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn seeded_posts(db: &Database) -> Collection {
        let posts = db.collection("posts").unwrap();
        posts
            .insert_many(vec![
                doc(json!({"_id": 1, "status": "active", "created_at": 30, "title": "b"})),
                doc(json!({"_id": 2, "status": "draft", "created_at": 10, "title": "a"})),
                doc(json!({"_id": 3, "status": "active", "created_at": 30, "title": "a"})),
                doc(json!({"_id": 4, "status": "archived", "created_at": 20, "title": "c"})),
            ])
            .unwrap();
        posts
    }

    #[test]
    fn test_insert_many_skips_duplicates_and_commits_rest() {
        let db = Database::temporary().unwrap();
        let mut likes = db.collection("likes").unwrap();
        likes
            .create_index(IndexSpec::new("post_user").asc("post_id").asc("user_id").unique())
            .unwrap();

        let err = likes
            .insert_many(vec![
                doc(json!({"post_id": 1, "user_id": 1})),
                doc(json!({"post_id": 1, "user_id": 2})),
                doc(json!({"post_id": 1, "user_id": 1})),
                doc(json!({"post_id": 2, "user_id": 1})),
            ])
            .unwrap_err();

        match &err {
            Error::BulkWrite { inserted, errors } => {
                assert_eq!(*inserted, 3);
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].index, 2);
                assert_eq!(errors[0].kind, WriteErrorKind::DuplicateKey);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_duplicate_key());
        assert_eq!(likes.len(), 3);
    }

    #[test]
    fn test_duplicate_primary_key_rejected() {
        let db = Database::temporary().unwrap();
        let users = db.collection("users").unwrap();
        users.insert_many(vec![doc(json!({"_id": 1, "username": "a"}))]).unwrap();
        let err = users
            .insert_many(vec![doc(json!({"_id": 1, "username": "b"}))])
            .unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_generated_ids() {
        let db = Database::temporary().unwrap();
        let likes = db.collection("likes").unwrap();
        likes.insert_many(vec![doc(json!({"post_id": 1}))]).unwrap();
        likes.insert_many(vec![doc(json!({"post_id": 1}))]).unwrap();
        let found = likes.find(&Filter::All, &FindOptions::new()).unwrap();
        assert_eq!(found.len(), 2);
        assert_ne!(found[0]["_id"], found[1]["_id"]);
    }

    #[test]
    fn test_find_filter_sort_project() {
        let db = Database::temporary().unwrap();
        let posts = seeded_posts(&db);

        let options = FindOptions::new()
            .sort_by("created_at", SortOrder::Desc)
            .sort_by("title", SortOrder::Asc)
            .project(["title"]);
        let found = posts.find(&Filter::eq("status", "active"), &options).unwrap();
        let ids: Vec<_> = found.iter().map(|d| d["_id"].clone()).collect();
        assert_eq!(ids, vec![json!(3), json!(1)]);
        assert!(found[0].get("status").is_none());
        assert_eq!(found[0]["title"], json!("a"));
    }

    #[test]
    fn test_hint_uses_index_and_matches_scan() {
        let db = Database::temporary().unwrap();
        let mut posts = seeded_posts(&db);
        posts
            .create_index(IndexSpec::new("status").asc("status"))
            .unwrap();

        let filter = Filter::eq("status", "active");
        let mut hinted = posts.find(&filter, &FindOptions::new().hint("status")).unwrap();
        let mut scanned = posts.find(&filter, &FindOptions::new()).unwrap();
        sort_documents(&mut hinted, &[("_id".into(), SortOrder::Asc)]);
        sort_documents(&mut scanned, &[("_id".into(), SortOrder::Asc)]);
        assert_eq!(hinted, scanned);
        assert_eq!(hinted.len(), 2);
    }

    #[test]
    fn test_hint_with_sort_index_returns_sorted() {
        let db = Database::temporary().unwrap();
        let mut posts = seeded_posts(&db);
        posts
            .create_index(IndexSpec::new("created_title").desc("created_at").asc("title"))
            .unwrap();

        let options = FindOptions::new()
            .sort_by("created_at", SortOrder::Desc)
            .sort_by("title", SortOrder::Asc)
            .hint("created_title");
        let found = posts.find(&Filter::All, &options).unwrap();
        let ids: Vec<_> = found.iter().map(|d| d["_id"].clone()).collect();
        assert_eq!(ids, vec![json!(3), json!(1), json!(4), json!(2)]);
    }

    #[test]
    fn test_unknown_hint_is_an_error() {
        let db = Database::temporary().unwrap();
        let posts = seeded_posts(&db);
        let err = posts
            .find(&Filter::All, &FindOptions::new().hint("nope"))
            .unwrap_err();
        assert!(matches!(err, Error::IndexNotFound { .. }));
    }

    #[test]
    fn test_update_many_maintains_index() {
        let db = Database::temporary().unwrap();
        let mut posts = seeded_posts(&db);
        posts
            .create_index(IndexSpec::new("status").asc("status"))
            .unwrap();

        let result = posts
            .update_many(&Filter::eq("status", "active"), &Update::set("status", "trending"))
            .unwrap();
        assert_eq!(result, UpdateResult { matched: 2, modified: 2 });

        let hinted = |status: &str| {
            posts
                .find(&Filter::eq("status", status), &FindOptions::new().hint("status"))
                .unwrap()
                .len()
        };
        assert_eq!(hinted("active"), 0);
        assert_eq!(hinted("trending"), 2);
    }

    #[test]
    fn test_update_with_no_matches() {
        let db = Database::temporary().unwrap();
        let posts = seeded_posts(&db);
        let result = posts
            .update_many(&Filter::eq("status", "missing"), &Update::set("status", "x"))
            .unwrap();
        assert_eq!(result, UpdateResult::default());
    }

    #[test]
    fn test_update_rejects_id_change() {
        let db = Database::temporary().unwrap();
        let posts = seeded_posts(&db);
        let err = posts
            .update_many(&Filter::All, &Update::set("_id", 9))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDocument(_)));
    }

    #[test]
    fn test_delete_many_maintains_index() {
        let db = Database::temporary().unwrap();
        let mut posts = seeded_posts(&db);
        posts
            .create_index(IndexSpec::new("status").asc("status"))
            .unwrap();

        assert_eq!(posts.delete_many(&Filter::eq("status", "archived")).unwrap(), 1);
        assert_eq!(posts.len(), 3);
        let archived = posts
            .find(&Filter::eq("status", "archived"), &FindOptions::new().hint("status"))
            .unwrap();
        assert!(archived.is_empty());
    }

    #[test]
    fn test_update_unique_conflict_leaves_collection_untouched() {
        let db = Database::temporary().unwrap();
        let mut posts = seeded_posts(&db);
        posts
            .create_index(IndexSpec::new("title").asc("title").asc("created_at").unique())
            .unwrap();

        let err = posts
            .update_many(&Filter::All, &Update::set("title", "same"))
            .unwrap_err();
        assert!(err.is_duplicate_key());

        let found = posts
            .find(&Filter::All, &FindOptions::new().sort_by("_id", SortOrder::Asc))
            .unwrap();
        let titles: Vec<_> = found.iter().map(|d| d["title"].clone()).collect();
        assert_eq!(titles, vec![json!("b"), json!("a"), json!("a"), json!("c")]);

        let by_index = |title: &str| {
            posts
                .find(&Filter::eq("title", title), &FindOptions::new().hint("title"))
                .unwrap()
                .len()
        };
        assert_eq!(by_index("same"), 0);
        assert_eq!(by_index("a"), 2);
        assert_eq!(by_index("b"), 1);
    }

    #[test]
    fn test_delete_many_with_large_in_filter() {
        let db = Database::temporary().unwrap();
        let likes = db.collection("likes").unwrap();
        likes
            .insert_many((0..30_000).map(|i| doc(json!({"_id": i, "post_id": i % 15_000}))))
            .unwrap();

        let removed = likes
            .delete_many(&Filter::is_in("post_id", 0..7_500))
            .unwrap();
        assert_eq!(removed, 15_000);
        assert_eq!(likes.len(), 15_000);
    }

    #[test]
    fn test_create_unique_index_over_duplicates_fails() {
        let db = Database::temporary().unwrap();
        let mut posts = seeded_posts(&db);
        let err = posts
            .create_index(IndexSpec::new("status").asc("status").unique())
            .unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn test_conflicting_index_definition() {
        let db = Database::temporary().unwrap();
        let mut posts = seeded_posts(&db);
        posts.create_index(IndexSpec::new("s").asc("status")).unwrap();
        posts.create_index(IndexSpec::new("s").asc("status")).unwrap();
        let err = posts
            .create_index(IndexSpec::new("s").desc("status"))
            .unwrap_err();
        assert!(matches!(err, Error::IndexConflict { .. }));
    }
}
