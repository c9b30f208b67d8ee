//! Join-based access through `Lookup` pipelines.

use storerace_docstore::{
    Accumulator, AggregateOptions, Database, Document, Filter, Projection, SortOrder, Stage,
};

use super::{int_field, key_string, post_view, str_field, LIKES, POSTS, USERS};
use crate::backends::rows::{AggregateRow, PostSummary, PostView};
use crate::backends::{AggregationQuery, TOP_N};
use crate::error::Result;
use crate::fixtures::PostStatus;

/// Index names steering the read pipelines. `None` leaves the access path
/// to a collection scan.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Hints {
    /// Drives the leading status match.
    pub status: Option<&'static str>,
    /// Drives the sorted read.
    pub sort: Option<&'static str>,
}

impl Hints {
    pub const NONE: Hints = Hints {
        status: None,
        sort: None,
    };
}

fn options(hint: Option<&'static str>) -> AggregateOptions {
    hint.map(AggregateOptions::hint).unwrap_or_default()
}

fn active() -> Stage {
    Stage::Match(Filter::eq("status", PostStatus::Active.as_str()))
}

fn join_likes() -> Stage {
    Stage::lookup(LIKES, "_id", "post_id", "likes")
}

fn join_author() -> [Stage; 2] {
    [
        Stage::lookup(USERS, "user_id", "_id", "author"),
        Stage::unwind("author"),
    ]
}

fn liked_active_posts() -> Vec<Stage> {
    let mut pipeline = vec![active(), join_likes(), Stage::Match(Filter::not_empty("likes"))];
    pipeline.extend(join_author());
    pipeline
}

fn documents(value: Option<&serde_json::Value>) -> Vec<Document> {
    value
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_object().cloned())
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn read_posts(db: &Database, filtered: bool, hints: &Hints) -> Result<Vec<PostView>> {
    let (pipeline, hint) = if filtered {
        (liked_active_posts(), hints.status)
    } else {
        let mut pipeline = vec![join_likes()];
        pipeline.extend(join_author());
        (pipeline, None)
    };

    let docs = db.collection(POSTS)?.aggregate(&pipeline, &options(hint))?;
    Ok(docs
        .iter()
        .map(|post| {
            let author = post
                .get("author")
                .and_then(serde_json::Value::as_object)
                .cloned()
                .unwrap_or_default();
            post_view(post, &author, &documents(post.get("likes")))
        })
        .collect())
}

pub(crate) fn read_summaries(db: &Database, sorted: bool, hints: &Hints) -> Result<Vec<PostSummary>> {
    let mut pipeline = liked_active_posts();
    pipeline.push(Stage::Project(vec![
        ("title".into(), Projection::Field("title".into())),
        ("created_at".into(), Projection::Field("created_at".into())),
        ("author".into(), Projection::Field("author.username".into())),
        ("like_count".into(), Projection::Size("likes".into())),
    ]));
    let hint = if sorted {
        pipeline.push(Stage::Sort(vec![
            ("created_at".into(), SortOrder::Desc),
            ("title".into(), SortOrder::Asc),
        ]));
        hints.sort
    } else {
        hints.status
    };

    let docs = db.collection(POSTS)?.aggregate(&pipeline, &options(hint))?;
    Ok(docs
        .iter()
        .map(|doc| PostSummary {
            title: str_field(doc, "title"),
            created_at: int_field(doc, "created_at"),
            author: str_field(doc, "author"),
            like_count: int_field(doc, "like_count") as u64,
        })
        .collect())
}

/// Users with their post count, highest first when `ranked`.
fn post_counts(ranked: bool) -> Vec<Stage> {
    let mut pipeline = vec![
        Stage::lookup(POSTS, "_id", "user_id", "posts"),
        Stage::Project(vec![("count".into(), Projection::Size("posts".into()))]),
    ];
    if ranked {
        pipeline.push(Stage::Sort(vec![
            ("count".into(), SortOrder::Desc),
            ("_id".into(), SortOrder::Asc),
        ]));
        pipeline.push(Stage::Limit(TOP_N));
    } else {
        pipeline.push(Stage::Sort(vec![("_id".into(), SortOrder::Asc)]));
    }
    pipeline
}

/// Run an analytic query. Keys are user or post ids.
pub(crate) fn aggregate(db: &Database, query: AggregationQuery) -> Result<Vec<AggregateRow>> {
    let none = AggregateOptions::default();
    let (collection, pipeline, metric) = match query {
        AggregationQuery::PostsPerUser => (USERS, post_counts(false), "count"),
        AggregationQuery::MostActiveUsers => (USERS, post_counts(true), "count"),
        AggregationQuery::AvgLikesPerPost => (
            POSTS,
            vec![
                join_likes(),
                Stage::Project(vec![("count".into(), Projection::Size("likes".into()))]),
                Stage::Group {
                    key: None,
                    accumulators: vec![("avg".into(), Accumulator::Avg("count".into()))],
                },
            ],
            "avg",
        ),
        AggregationQuery::MostLikedPosts => (
            POSTS,
            vec![
                join_likes(),
                Stage::Project(vec![("count".into(), Projection::Size("likes".into()))]),
                Stage::Match(Filter::gt("count", 0)),
                Stage::Sort(vec![
                    ("count".into(), SortOrder::Desc),
                    ("_id".into(), SortOrder::Asc),
                ]),
                Stage::Limit(TOP_N),
            ],
            "count",
        ),
        AggregationQuery::UserEngagement => (
            LIKES,
            vec![
                Stage::lookup(POSTS, "post_id", "_id", "post"),
                Stage::unwind("post"),
                Stage::Group {
                    key: Some("post.user_id".into()),
                    accumulators: vec![("count".into(), Accumulator::Count)],
                },
                Stage::Sort(vec![
                    ("count".into(), SortOrder::Desc),
                    ("_id".into(), SortOrder::Asc),
                ]),
                Stage::Limit(TOP_N),
            ],
            "count",
        ),
    };

    let docs = db.collection(collection)?.aggregate(&pipeline, &none)?;

    if query == AggregationQuery::AvgLikesPerPost {
        let value = docs
            .first()
            .and_then(|d| d.get(metric))
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.0);
        return Ok(vec![AggregateRow {
            key: "all".into(),
            value,
        }]);
    }

    Ok(docs
        .iter()
        .map(|doc| AggregateRow {
            key: key_string(doc),
            value: doc
                .get(metric)
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(0.0),
        })
        .collect())
}
