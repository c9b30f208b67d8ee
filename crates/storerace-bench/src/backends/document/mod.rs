//! Document store backend.
//!
//! A single [`Database`] handle serves all three variants. Writes, updates
//! and deletes are shared; reads dispatch to a per-variant strategy:
//! flat finds stitched in the application ([`basic`]), lookup pipelines
//! ([`relational`]) and the same pipelines steered by declared indexes
//! ([`indexed`]).

mod basic;
mod indexed;
mod relational;

use std::path::PathBuf;

use serde_json::{json, Value};
use storerace_docstore::{
    Collection, Database, Document, Filter, FindOptions, IndexSpec, StoreConfig, Update, ID_FIELD,
};

use crate::error::{Error, Result};
use crate::fixtures::{Dataset, PostStatus, Variant};

use super::rows::{AggregateRow, AuthorView, PostSummary, PostView};
use super::{
    AggregationQuery, BackendAdapter, BackendKind, DeleteScenario, EntityCounts, UpdateScenario,
    WriteSummary, RETITLED_TITLE,
};

pub(crate) const USERS: &str = "users";
pub(crate) const POSTS: &str = "posts";
pub(crate) const LIKES: &str = "likes";
pub(crate) const FOLLOWS: &str = "follows";

const COLLECTIONS: [&str; 4] = [USERS, POSTS, LIKES, FOLLOWS];

/// Document store backend for benchmarks.
pub struct DocumentBackend {
    config: StoreConfig,
    db: Option<Database>,
}

impl DocumentBackend {
    /// A backend over a temporary store removed on disconnect.
    pub fn temporary() -> Self {
        Self {
            config: StoreConfig::temporary(),
            db: None,
        }
    }

    /// A backend over a store directory, created if missing.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config: StoreConfig::new(path),
            db: None,
        }
    }

    fn db(&self) -> Result<&Database> {
        self.db.as_ref().ok_or(Error::NotConnected {
            backend: BackendKind::Document.as_str(),
        })
    }

    fn collection(&self, name: &str) -> Result<Collection> {
        Ok(self.db()?.collection(name)?)
    }

    /// Unique constraints present in every variant.
    fn ensure_base_indexes(&self) -> Result<()> {
        self.collection(USERS)?
            .create_index(IndexSpec::new("users_username").asc("username").unique())?;
        self.collection(LIKES)?.create_index(
            IndexSpec::new("likes_post_user")
                .asc("post_id")
                .asc("user_id")
                .unique(),
        )?;
        Ok(())
    }
}

impl BackendAdapter for DocumentBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    fn supports(&self, _variant: Variant) -> bool {
        true
    }

    fn connect(&mut self) -> Result<()> {
        if self.db.is_some() {
            return Ok(());
        }
        let db = Database::open(&self.config).map_err(|e| Error::Connection {
            backend: BackendKind::Document.as_str(),
            message: e.to_string(),
        })?;
        db.ping()?;
        self.db = Some(db);
        self.ensure_base_indexes()?;

        tracing::info!(
            path = %self.config.path.display(),
            temporary = self.config.temporary,
            "document store connected"
        );
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(db) = self.db.take() {
            db.flush()?;
            tracing::info!("document store disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.db.is_some()
    }

    fn reset_state(&mut self) -> Result<()> {
        let db = self.db()?;
        for name in COLLECTIONS {
            db.drop_collection(name)?;
        }
        self.ensure_base_indexes()
    }

    fn entity_counts(&self) -> Result<EntityCounts> {
        Ok(EntityCounts {
            users: self.collection(USERS)?.len() as u64,
            posts: self.collection(POSTS)?.len() as u64,
            likes: self.collection(LIKES)?.len() as u64,
            follows: self.collection(FOLLOWS)?.len() as u64,
        })
    }

    fn configure_indexes(&mut self, variant: Variant) -> Result<()> {
        match variant {
            Variant::Indexed => indexed::create_indexes(self.db()?),
            Variant::Basic | Variant::Relational => Ok(()),
        }
    }

    fn write_dataset(&mut self, variant: Variant, dataset: &Dataset) -> Result<WriteSummary> {
        let users = dataset.users.iter().map(|u| {
            to_document(json!({
                "_id": u.id,
                "username": u.username,
                "role": u.role.as_str(),
                "created_at": u.created_at.timestamp_millis(),
            }))
        });
        let posts = dataset.posts.iter().map(|p| {
            to_document(json!({
                "_id": p.id,
                "title": p.title,
                "body": p.body,
                "status": p.status.as_str(),
                "created_at": p.created_at.timestamp_millis(),
                "user_id": p.user_id,
            }))
        });
        let likes = dataset
            .likes
            .iter()
            .map(|l| to_document(json!({"post_id": l.post_id, "user_id": l.user_id})));

        let mut summary = WriteSummary {
            users: self.collection(USERS)?.insert_many(users)?,
            posts: self.collection(POSTS)?.insert_many(posts)?,
            ..Default::default()
        };

        match self.collection(LIKES)?.insert_many(likes) {
            Ok(inserted) => summary.likes = inserted,
            Err(storerace_docstore::Error::BulkWrite { inserted, errors })
                if errors.iter().all(|e| e.kind == storerace_docstore::WriteErrorKind::DuplicateKey) =>
            {
                for rejected in &errors {
                    tracing::debug!(index = rejected.index, message = %rejected.message, "duplicate like skipped");
                }
                tracing::warn!(
                    backend = "document",
                    variant = %variant,
                    skipped = errors.len(),
                    "duplicate likes skipped"
                );
                summary.likes = inserted;
                summary.duplicates_skipped = errors.len() as u64;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(summary)
    }

    fn read_posts(&mut self, variant: Variant, filtered: bool) -> Result<Vec<PostView>> {
        let db = self.db()?;
        match variant {
            Variant::Basic => basic::read_posts(db, filtered),
            Variant::Relational => relational::read_posts(db, filtered, &relational::Hints::NONE),
            Variant::Indexed => relational::read_posts(db, filtered, &indexed::HINTS),
        }
    }

    fn read_summaries(&mut self, variant: Variant, sorted: bool) -> Result<Vec<PostSummary>> {
        let db = self.db()?;
        match variant {
            Variant::Basic => basic::read_summaries(db, sorted),
            Variant::Relational => {
                relational::read_summaries(db, sorted, &relational::Hints::NONE)
            }
            Variant::Indexed => relational::read_summaries(db, sorted, &indexed::HINTS),
        }
    }

    fn update_posts(&mut self, _variant: Variant, scenario: UpdateScenario) -> Result<u64> {
        let posts = self.collection(POSTS)?;
        let result = match scenario {
            UpdateScenario::PromoteActive => posts.update_many(
                &Filter::eq("status", PostStatus::Active.as_str()),
                &Update::set("status", PostStatus::Trending.as_str()),
            )?,
            UpdateScenario::RetitleAll => {
                posts.update_many(&Filter::All, &Update::set("title", RETITLED_TITLE))?
            }
        };
        Ok(result.matched)
    }

    fn delete_posts(&mut self, variant: Variant, scenario: DeleteScenario) -> Result<u64> {
        let posts = self.collection(POSTS)?;
        let likes = self.collection(LIKES)?;
        match scenario {
            DeleteScenario::ArchivedPosts => {
                let archived = Filter::eq("status", PostStatus::Archived.as_str());
                let mut options = FindOptions::new().project([ID_FIELD]);
                if variant == Variant::Indexed {
                    options = options.hint(indexed::POSTS_STATUS);
                }
                let ids: Vec<Value> = posts
                    .find(&archived, &options)?
                    .into_iter()
                    .filter_map(|doc| doc.get(ID_FIELD).cloned())
                    .collect();
                if ids.is_empty() {
                    return Ok(0);
                }
                likes.delete_many(&Filter::is_in("post_id", ids))?;
                Ok(posts.delete_many(&archived)?)
            }
            DeleteScenario::Everything => {
                likes.delete_many(&Filter::All)?;
                Ok(posts.delete_many(&Filter::All)?)
            }
        }
    }

    fn aggregate(&mut self, query: AggregationQuery) -> Result<Vec<AggregateRow>> {
        relational::aggregate(self.db()?, query)
    }
}

fn to_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

pub(crate) fn int_field(doc: &Document, field: &str) -> i64 {
    storerace_docstore::document::get_path(doc, field)
        .and_then(Value::as_i64)
        .unwrap_or_default()
}

pub(crate) fn str_field(doc: &Document, field: &str) -> String {
    storerace_docstore::document::get_path(doc, field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Build a post view from a post document, its author and its likes.
pub(crate) fn post_view(post: &Document, author: &Document, likes: &[Document]) -> PostView {
    let mut liked_by: Vec<i64> = likes.iter().map(|l| int_field(l, "user_id")).collect();
    liked_by.sort_unstable();
    PostView {
        id: int_field(post, ID_FIELD),
        title: str_field(post, "title"),
        body: str_field(post, "body"),
        status: str_field(post, "status"),
        created_at: int_field(post, "created_at"),
        author: AuthorView {
            id: int_field(author, ID_FIELD),
            username: str_field(author, "username"),
            role: str_field(author, "role"),
        },
        likes: liked_by,
    }
}

/// Render an analytic row key (a user or post id).
pub(crate) fn key_string(doc: &Document) -> String {
    match doc.get(ID_FIELD) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DatasetGenerator, Scale};

    fn connected() -> DocumentBackend {
        let mut backend = DocumentBackend::temporary();
        backend.connect().unwrap();
        backend
    }

    #[test]
    fn test_reset_keeps_base_indexes() {
        let mut backend = connected();
        let dataset = DatasetGenerator::new().generate(Scale::Small, Variant::Indexed);
        backend.configure_indexes(Variant::Indexed).unwrap();
        backend.write_dataset(Variant::Indexed, &dataset).unwrap();
        assert_eq!(backend.entity_counts().unwrap().posts, 100);

        backend.reset_state().unwrap();
        assert!(backend.entity_counts().unwrap().is_empty());

        let posts = backend.collection(POSTS).unwrap();
        assert!(posts.indexes().is_empty());
        let likes = backend.collection(LIKES).unwrap();
        assert_eq!(likes.indexes().len(), 1);
        assert!(likes.indexes()[0].unique);
    }

    #[test]
    fn test_duplicate_likes_are_skipped() {
        let mut backend = connected();
        let mut dataset = DatasetGenerator::new().generate(Scale::Small, Variant::Relational);
        let first = dataset.likes[0];
        dataset.likes.push(first);

        let summary = backend.write_dataset(Variant::Relational, &dataset).unwrap();
        assert_eq!(summary.duplicates_skipped, 1);
        assert_eq!(
            backend.entity_counts().unwrap().likes as usize,
            dataset.likes.len() - 1
        );
    }

    #[test]
    fn test_variants_read_the_same_posts() {
        let mut backend = connected();
        let dataset = DatasetGenerator::new().generate(Scale::Small, Variant::Relational);
        backend.configure_indexes(Variant::Indexed).unwrap();
        backend.write_dataset(Variant::Indexed, &dataset).unwrap();

        for filtered in [false, true] {
            let basic = backend.read_posts(Variant::Basic, filtered).unwrap();
            let relational = backend.read_posts(Variant::Relational, filtered).unwrap();
            let indexed = backend.read_posts(Variant::Indexed, filtered).unwrap();
            let mut basic_ids: Vec<i64> = basic.iter().map(|p| p.id).collect();
            let mut relational_ids: Vec<i64> = relational.iter().map(|p| p.id).collect();
            let mut indexed_ids: Vec<i64> = indexed.iter().map(|p| p.id).collect();
            basic_ids.sort_unstable();
            relational_ids.sort_unstable();
            indexed_ids.sort_unstable();
            assert_eq!(basic_ids, relational_ids);
            assert_eq!(relational_ids, indexed_ids);
        }

        for sorted in [false, true] {
            let basic = backend.read_summaries(Variant::Basic, sorted).unwrap();
            let relational = backend.read_summaries(Variant::Relational, sorted).unwrap();
            let indexed = backend.read_summaries(Variant::Indexed, sorted).unwrap();
            assert_eq!(basic.len(), relational.len());
            assert_eq!(relational.len(), indexed.len());
            if sorted {
                assert_eq!(basic, relational);
                assert_eq!(relational, indexed);
            }
        }
    }

    #[test]
    fn test_delete_archived_removes_their_likes() {
        let mut backend = connected();
        let dataset = DatasetGenerator::new().generate(Scale::Small, Variant::Relational);
        backend.write_dataset(Variant::Relational, &dataset).unwrap();

        let archived: Vec<i64> = dataset
            .posts
            .iter()
            .filter(|p| p.status == PostStatus::Archived)
            .map(|p| p.id)
            .collect();
        let surviving_likes = dataset
            .likes
            .iter()
            .filter(|l| !archived.contains(&l.post_id))
            .count();

        let deleted = backend
            .delete_posts(Variant::Relational, DeleteScenario::ArchivedPosts)
            .unwrap();
        assert_eq!(deleted as usize, archived.len());
        assert_eq!(
            backend.entity_counts().unwrap().likes as usize,
            surviving_likes
        );
    }

    #[test]
    fn test_update_with_no_matches() {
        let mut backend = connected();
        let matched = backend
            .update_posts(Variant::Basic, UpdateScenario::PromoteActive)
            .unwrap();
        assert_eq!(matched, 0);
    }
}
