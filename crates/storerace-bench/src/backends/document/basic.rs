//! Flat access: one find per collection, stitched together in memory.

use std::collections::HashMap;

use serde_json::Value;
use storerace_docstore::{Database, Document, Filter, FindOptions, SortOrder, ID_FIELD};

use super::{int_field, post_view, str_field, LIKES, POSTS, USERS};
use crate::backends::rows::{PostSummary, PostView};
use crate::error::Result;
use crate::fixtures::PostStatus;

struct Stitched {
    posts: Vec<Document>,
    authors: HashMap<i64, Document>,
    likes: HashMap<i64, Vec<Document>>,
}

impl Stitched {
    /// Fetch posts, then only the likes and authors they reference.
    fn load(db: &Database, filter: &Filter, options: &FindOptions) -> Result<Self> {
        let posts = db.collection(POSTS)?.find(filter, options)?;

        let post_ids: Vec<Value> = posts.iter().filter_map(|p| p.get(ID_FIELD).cloned()).collect();
        let mut likes: HashMap<i64, Vec<Document>> = HashMap::new();
        for like in db
            .collection(LIKES)?
            .find(&Filter::is_in("post_id", post_ids), &FindOptions::new())?
        {
            likes.entry(int_field(&like, "post_id")).or_default().push(like);
        }

        let mut author_ids: Vec<i64> = posts.iter().map(|p| int_field(p, "user_id")).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors = db
            .collection(USERS)?
            .find(&Filter::is_in(ID_FIELD, author_ids), &FindOptions::new())?
            .into_iter()
            .map(|u| (int_field(&u, ID_FIELD), u))
            .collect();

        Ok(Self {
            posts,
            authors,
            likes,
        })
    }

    fn likes_of(&self, post: &Document) -> &[Document] {
        self.likes
            .get(&int_field(post, ID_FIELD))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Posts paired with their author, dropping posts whose author is gone.
    fn joined(&self) -> impl Iterator<Item = (&Document, &Document, &[Document])> {
        self.posts.iter().filter_map(|post| {
            let author = self.authors.get(&int_field(post, "user_id"))?;
            Some((post, author, self.likes_of(post)))
        })
    }
}

fn active() -> Filter {
    Filter::eq("status", PostStatus::Active.as_str())
}

pub(super) fn read_posts(db: &Database, filtered: bool) -> Result<Vec<PostView>> {
    let filter = if filtered { active() } else { Filter::All };
    let stitched = Stitched::load(db, &filter, &FindOptions::new())?;
    Ok(stitched
        .joined()
        .filter(|(_, _, likes)| !filtered || !likes.is_empty())
        .map(|(post, author, likes)| post_view(post, author, likes))
        .collect())
}

pub(super) fn read_summaries(db: &Database, sorted: bool) -> Result<Vec<PostSummary>> {
    let mut options = FindOptions::new().project(["title", "created_at", "user_id"]);
    if sorted {
        options = options
            .sort_by("created_at", SortOrder::Desc)
            .sort_by("title", SortOrder::Asc);
    }
    let stitched = Stitched::load(db, &active(), &options)?;
    Ok(stitched
        .joined()
        .filter(|(_, _, likes)| !likes.is_empty())
        .map(|(post, author, likes)| PostSummary {
            title: str_field(post, "title"),
            created_at: int_field(post, "created_at"),
            author: str_field(author, "username"),
            like_count: likes.len() as u64,
        })
        .collect())
}
