//! Storage backends under comparison.
//!
//! Every backend implements [`BackendAdapter`], a uniform surface over one
//! store: lifecycle (connect, reset, disconnect), the seven timed
//! operations and the five analytic queries. Query strategies per variant
//! live inside each adapter.

pub mod document;
pub mod sql;
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use document::DocumentBackend;
pub use sqlite::SqliteBackend;

#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;

use std::fmt;
use std::hint::black_box;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fixtures::{Dataset, Variant};

/// Identifies a backend in results and reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Postgres,
    Document,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Postgres => "postgres",
            BackendKind::Document => "document",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The seven timed operations, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Writes,
    SimpleRead,
    FilteredRead,
    ProjectedRead,
    SortedRead,
    Update,
    Delete,
}

impl Operation {
    /// Execution order within a phase. Reads need the written data; update
    /// and delete mutate it.
    pub const ALL: [Operation; 7] = [
        Operation::Writes,
        Operation::SimpleRead,
        Operation::FilteredRead,
        Operation::ProjectedRead,
        Operation::SortedRead,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Writes => "writes",
            Operation::SimpleRead => "simpleRead",
            Operation::FilteredRead => "filteredRead",
            Operation::ProjectedRead => "projectedRead",
            Operation::SortedRead => "sortedRead",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub(crate) fn index(&self) -> usize {
        Self::ALL.iter().position(|op| op == self).unwrap_or(0)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five analytic queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregationQuery {
    /// Post count for every user.
    PostsPerUser,
    /// Mean like count over all posts.
    AvgLikesPerPost,
    /// Ten users with the most posts.
    MostActiveUsers,
    /// Ten posts with the most likes.
    MostLikedPosts,
    /// Ten authors who received the most likes.
    UserEngagement,
}

impl AggregationQuery {
    pub const ALL: [AggregationQuery; 5] = [
        AggregationQuery::PostsPerUser,
        AggregationQuery::AvgLikesPerPost,
        AggregationQuery::MostActiveUsers,
        AggregationQuery::MostLikedPosts,
        AggregationQuery::UserEngagement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationQuery::PostsPerUser => "postsPerUser",
            AggregationQuery::AvgLikesPerPost => "avgLikesPerPost",
            AggregationQuery::MostActiveUsers => "mostActiveUsers",
            AggregationQuery::MostLikedPosts => "mostLikedPosts",
            AggregationQuery::UserEngagement => "userEngagement",
        }
    }

    pub(crate) fn index(&self) -> usize {
        Self::ALL.iter().position(|q| q == self).unwrap_or(0)
    }
}

impl fmt::Display for AggregationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows limit of the ranked analytic queries.
pub const TOP_N: usize = 10;

/// What the `update` operation changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdateScenario {
    /// Move every `active` post to `trending`.
    #[default]
    PromoteActive,
    /// Overwrite the title of every post.
    RetitleAll,
}

/// Title written by [`UpdateScenario::RetitleAll`].
pub const RETITLED_TITLE: &str = "Updated post title";

impl FromStr for UpdateScenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "promote-active" => Ok(UpdateScenario::PromoteActive),
            "retitle-all" => Ok(UpdateScenario::RetitleAll),
            other => Err(Error::Config(format!(
                "unknown update scenario {other:?}, expected promote-active or retitle-all"
            ))),
        }
    }
}

/// What the `delete` operation removes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeleteScenario {
    /// Delete `archived` posts and their likes.
    #[default]
    ArchivedPosts,
    /// Delete all likes, then all posts.
    Everything,
}

impl FromStr for DeleteScenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "archived-posts" => Ok(DeleteScenario::ArchivedPosts),
            "everything" => Ok(DeleteScenario::Everything),
            other => Err(Error::Config(format!(
                "unknown delete scenario {other:?}, expected archived-posts or everything"
            ))),
        }
    }
}

/// Everything an adapter needs to run one phase.
#[derive(Clone, Copy, Debug)]
pub struct Workload<'a> {
    pub variant: Variant,
    pub dataset: &'a Dataset,
    pub update: UpdateScenario,
    pub delete: DeleteScenario,
}

/// Row and document counts held by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub users: u64,
    pub posts: u64,
    pub likes: u64,
    pub follows: u64,
}

impl EntityCounts {
    pub fn is_empty(&self) -> bool {
        self.users == 0 && self.posts == 0 && self.likes == 0 && self.follows == 0
    }
}

impl fmt::Display for EntityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "users={} posts={} likes={} follows={}",
            self.users, self.posts, self.likes, self.follows
        )
    }
}

/// Outcome of [`BackendAdapter::write_dataset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub users: u64,
    pub posts: u64,
    pub likes: u64,
    /// Likes rejected as duplicates and skipped.
    pub duplicates_skipped: u64,
}

/// Common row types returned by every backend.
pub mod rows {
    /// Author embedded in a [`PostView`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct AuthorView {
        pub id: i64,
        pub username: String,
        pub role: String,
    }

    /// A post with its author and the ids of users who liked it.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PostView {
        pub id: i64,
        pub title: String,
        pub body: String,
        pub status: String,
        /// Epoch milliseconds.
        pub created_at: i64,
        pub author: AuthorView,
        /// Liking user ids, ascending.
        pub likes: Vec<i64>,
    }

    /// Projected read row.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PostSummary {
        pub title: String,
        /// Epoch milliseconds.
        pub created_at: i64,
        pub author: String,
        pub like_count: u64,
    }

    /// One row of an analytic query: a user or post id and a metric.
    #[derive(Debug, Clone, PartialEq)]
    pub struct AggregateRow {
        pub key: String,
        pub value: f64,
    }
}

use rows::{AggregateRow, PostSummary, PostView};

/// Uniform surface over one backing store.
///
/// Connections are opened once by [`connect`](Self::connect) and reused
/// for every phase. Data methods return `Error::NotConnected` before that.
pub trait BackendAdapter {
    /// Backend identity used in results.
    fn kind(&self) -> BackendKind;

    /// Whether this backend takes part in the given phase.
    fn supports(&self, variant: Variant) -> bool;

    fn connect(&mut self) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Remove all data. Schema and base indexes survive.
    fn reset_state(&mut self) -> Result<()>;

    fn entity_counts(&self) -> Result<EntityCounts>;

    /// Prepare variant-specific indexes before a phase.
    fn configure_indexes(&mut self, variant: Variant) -> Result<()>;

    /// Insert users, posts and likes. Duplicate likes are skipped.
    fn write_dataset(&mut self, variant: Variant, dataset: &Dataset) -> Result<WriteSummary>;

    /// Posts with author and likes. `filtered` keeps active posts with at
    /// least one like.
    fn read_posts(&mut self, variant: Variant, filtered: bool) -> Result<Vec<PostView>>;

    /// Title, date, author name and like count of active liked posts.
    /// `sorted` orders by `created_at` descending, then title ascending.
    fn read_summaries(&mut self, variant: Variant, sorted: bool) -> Result<Vec<PostSummary>>;

    /// Apply an update scenario, returning the number of posts matched.
    fn update_posts(&mut self, variant: Variant, scenario: UpdateScenario) -> Result<u64>;

    /// Apply a delete scenario, returning the number of posts removed.
    fn delete_posts(&mut self, variant: Variant, scenario: DeleteScenario) -> Result<u64>;

    fn aggregate(&mut self, query: AggregationQuery) -> Result<Vec<AggregateRow>>;

    /// Run one operation and return its wall-clock duration in milliseconds.
    /// The operation's output is discarded.
    fn execute(&mut self, operation: Operation, workload: &Workload<'_>) -> Result<f64> {
        let variant = workload.variant;
        let start = Instant::now();
        match operation {
            Operation::Writes => {
                black_box(self.write_dataset(variant, workload.dataset)?);
            }
            Operation::SimpleRead => {
                black_box(self.read_posts(variant, false)?);
            }
            Operation::FilteredRead => {
                black_box(self.read_posts(variant, true)?);
            }
            Operation::ProjectedRead => {
                black_box(self.read_summaries(variant, false)?);
            }
            Operation::SortedRead => {
                black_box(self.read_summaries(variant, true)?);
            }
            Operation::Update => {
                black_box(self.update_posts(variant, workload.update)?);
            }
            Operation::Delete => {
                black_box(self.delete_posts(variant, workload.delete)?);
            }
        }
        Ok(elapsed_ms(start))
    }

    /// Run one analytic query and return its duration in milliseconds.
    fn execute_aggregation(&mut self, query: AggregationQuery) -> Result<f64> {
        let start = Instant::now();
        black_box(self.aggregate(query)?);
        Ok(elapsed_ms(start))
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_order() {
        let names: Vec<&str> = Operation::ALL.iter().map(Operation::as_str).collect();
        assert_eq!(
            names,
            vec![
                "writes",
                "simpleRead",
                "filteredRead",
                "projectedRead",
                "sortedRead",
                "update",
                "delete"
            ]
        );
        assert_eq!(Operation::Delete.index(), 6);
        assert_eq!(AggregationQuery::UserEngagement.index(), 4);
    }

    #[test]
    fn test_scenario_parsing() {
        assert_eq!(
            "retitle-all".parse::<UpdateScenario>().unwrap(),
            UpdateScenario::RetitleAll
        );
        assert_eq!(
            "everything".parse::<DeleteScenario>().unwrap(),
            DeleteScenario::Everything
        );
        assert!("drop-tables".parse::<DeleteScenario>().is_err());
    }

    #[test]
    fn test_entity_counts_empty() {
        assert!(EntityCounts::default().is_empty());
        let counts = EntityCounts {
            likes: 1,
            ..Default::default()
        };
        assert!(!counts.is_empty());
        assert_eq!(counts.to_string(), "users=0 posts=0 likes=1 follows=0");
    }
}
