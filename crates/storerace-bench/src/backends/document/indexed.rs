//! Declared indexes for the indexed variant and the hints that select them.

use storerace_docstore::{Database, IndexSpec};

use super::relational::Hints;
use super::{LIKES, POSTS};
use crate::error::Result;

pub(crate) const POSTS_STATUS: &str = "posts_status";
pub(crate) const POSTS_USER: &str = "posts_user";
pub(crate) const POSTS_CREATED_TITLE: &str = "posts_created_title";
pub(crate) const LIKES_POST: &str = "likes_post";

pub(crate) const HINTS: Hints = Hints {
    status: Some(POSTS_STATUS),
    sort: Some(POSTS_CREATED_TITLE),
};

fn post_indexes() -> [IndexSpec; 3] {
    [
        IndexSpec::new(POSTS_STATUS).asc("status"),
        IndexSpec::new(POSTS_USER).asc("user_id"),
        IndexSpec::new(POSTS_CREATED_TITLE)
            .desc("created_at")
            .asc("title"),
    ]
}

/// Declare the indexed-variant indexes. Idempotent.
pub(crate) fn create_indexes(db: &Database) -> Result<()> {
    let mut posts = db.collection(POSTS)?;
    for spec in post_indexes() {
        posts.create_index(spec)?;
    }
    db.collection(LIKES)?
        .create_index(IndexSpec::new(LIKES_POST).asc("post_id"))?;

    tracing::debug!(
        posts = ?posts.indexes().iter().map(|s| s.name.clone()).collect::<Vec<_>>(),
        "indexed variant indexes declared"
    );
    Ok(())
}
