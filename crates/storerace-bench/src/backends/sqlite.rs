//! SQLite backend.
//!
//! One connection, opened on `connect`, serves every phase. Basic and
//! relational variants share the same normalized schema and joined queries.

use std::path::PathBuf;

use rusqlite::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::fixtures::{Dataset, PostStatus, Variant};

use super::rows::{AggregateRow, PostSummary, PostView};
use super::sql::{self, FlatPostRow};
use super::{
    AggregationQuery, BackendAdapter, BackendKind, DeleteScenario, EntityCounts, UpdateScenario,
    WriteSummary, RETITLED_TITLE,
};

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS likes (
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        PRIMARY KEY (post_id, user_id)
    );

    CREATE TABLE IF NOT EXISTS follows (
        following_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        followed_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (following_id, followed_id)
    );
"#;

/// SQLite backend for benchmarks.
pub struct SqliteBackend {
    path: Option<PathBuf>,
    conn: Option<Connection>,
}

impl SqliteBackend {
    /// A backend over a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            conn: None,
        }
    }

    /// A backend over a database file, created if missing.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            conn: None,
        }
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::NotConnected {
            backend: BackendKind::Sqlite.as_str(),
        })
    }

    fn conn_mut(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or(Error::NotConnected {
            backend: BackendKind::Sqlite.as_str(),
        })
    }

    fn count(&self, statement: &str) -> Result<u64> {
        let n: i64 = self.conn()?.query_row(statement, [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn id_metric_rows(&self, statement: &str) -> Result<Vec<AggregateRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(statement)?;
        let rows = stmt.query_map([], |row| {
            Ok(AggregateRow {
                key: row.get::<_, i64>(0)?.to_string(),
                value: row.get::<_, i64>(1)? as f64,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn flat_post_row(row: &Row<'_>) -> rusqlite::Result<FlatPostRow> {
    Ok(FlatPostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        author_id: row.get(5)?,
        username: row.get(6)?,
        role: row.get(7)?,
        liked_by: row.get(8)?,
    })
}

impl BackendAdapter for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn supports(&self, variant: Variant) -> bool {
        matches!(variant, Variant::Basic | Variant::Relational)
    }

    fn connect(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let opened = match &self.path {
            Some(path) => Connection::open(path),
            None => Connection::open_in_memory(),
        };
        let conn = opened.map_err(|e| Error::Connection {
            backend: BackendKind::Sqlite.as_str(),
            message: e.to_string(),
        })?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!(
            path = %self.path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| ":memory:".into()),
            "sqlite connected"
        );
        self.conn = Some(conn);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| Error::Connection {
                backend: BackendKind::Sqlite.as_str(),
                message: e.to_string(),
            })?;
            tracing::info!("sqlite disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn reset_state(&mut self) -> Result<()> {
        let tx = self.conn_mut()?.transaction()?;
        for statement in sql::RESET {
            tx.execute(statement, [])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn entity_counts(&self) -> Result<EntityCounts> {
        Ok(EntityCounts {
            users: self.count(sql::COUNT_USERS)?,
            posts: self.count(sql::COUNT_POSTS)?,
            likes: self.count(sql::COUNT_LIKES)?,
            follows: self.count(sql::COUNT_FOLLOWS)?,
        })
    }

    fn configure_indexes(&mut self, _variant: Variant) -> Result<()> {
        // Primary keys and the username constraint are declared with the schema.
        Ok(())
    }

    fn write_dataset(&mut self, variant: Variant, dataset: &Dataset) -> Result<WriteSummary> {
        let mut summary = WriteSummary::default();
        let tx = self.conn_mut()?.transaction()?;
        {
            let mut stmt = tx.prepare(sql::INSERT_USER)?;
            for user in &dataset.users {
                stmt.execute(params![
                    user.id,
                    &user.username,
                    user.role.as_str(),
                    user.created_at.timestamp_millis()
                ])?;
                summary.users += 1;
            }

            let mut stmt = tx.prepare(sql::INSERT_POST)?;
            for post in &dataset.posts {
                stmt.execute(params![
                    post.id,
                    &post.title,
                    &post.body,
                    post.status.as_str(),
                    post.created_at.timestamp_millis(),
                    post.user_id
                ])?;
                summary.posts += 1;
            }

            let mut stmt = tx.prepare(sql::INSERT_LIKE)?;
            for like in &dataset.likes {
                match stmt.execute(params![like.post_id, like.user_id]) {
                    Ok(_) => summary.likes += 1,
                    Err(e) => {
                        let err = Error::from(e);
                        if !err.is_recoverable() {
                            return Err(err);
                        }
                        tracing::debug!(post_id = like.post_id, user_id = like.user_id, "duplicate like skipped");
                        summary.duplicates_skipped += 1;
                    }
                }
            }
        }
        tx.commit()?;

        if summary.duplicates_skipped > 0 {
            tracing::warn!(
                backend = "sqlite",
                variant = %variant,
                skipped = summary.duplicates_skipped,
                "duplicate likes skipped"
            );
        }
        Ok(summary)
    }

    fn read_posts(&mut self, _variant: Variant, filtered: bool) -> Result<Vec<PostView>> {
        let conn = self.conn()?;
        let rows = if filtered {
            let mut stmt = conn.prepare_cached(sql::SELECT_LIKED_ACTIVE_POSTS)?;
            let rows = stmt.query_map(params![PostStatus::Active.as_str()], flat_post_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = conn.prepare_cached(sql::SELECT_POSTS)?;
            let rows = stmt.query_map([], flat_post_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(sql::fold_post_rows(rows))
    }

    fn read_summaries(&mut self, _variant: Variant, sorted: bool) -> Result<Vec<PostSummary>> {
        let statement = if sorted {
            sql::SELECT_SORTED_SUMMARIES
        } else {
            sql::SELECT_SUMMARIES
        };
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(statement)?;
        let rows = stmt.query_map(params![PostStatus::Active.as_str()], |row| {
            Ok(PostSummary {
                title: row.get(0)?,
                created_at: row.get(1)?,
                author: row.get(2)?,
                like_count: row.get::<_, i64>(3)? as u64,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn update_posts(&mut self, _variant: Variant, scenario: UpdateScenario) -> Result<u64> {
        let conn = self.conn()?;
        let changed = match scenario {
            UpdateScenario::PromoteActive => conn.execute(
                sql::UPDATE_STATUS,
                params![PostStatus::Trending.as_str(), PostStatus::Active.as_str()],
            )?,
            UpdateScenario::RetitleAll => conn.execute(sql::UPDATE_TITLES, params![RETITLED_TITLE])?,
        };
        Ok(changed as u64)
    }

    fn delete_posts(&mut self, _variant: Variant, scenario: DeleteScenario) -> Result<u64> {
        let tx = self.conn_mut()?.transaction()?;
        let deleted = match scenario {
            DeleteScenario::ArchivedPosts => {
                tx.execute(sql::DELETE_POSTS_BY_STATUS, params![PostStatus::Archived.as_str()])?
            }
            DeleteScenario::Everything => {
                tx.execute(sql::DELETE_ALL_LIKES, [])?;
                tx.execute(sql::DELETE_ALL_POSTS, [])?
            }
        };
        tx.commit()?;
        Ok(deleted as u64)
    }

    fn aggregate(&mut self, query: AggregationQuery) -> Result<Vec<AggregateRow>> {
        match query {
            AggregationQuery::PostsPerUser => self.id_metric_rows(sql::POSTS_PER_USER),
            AggregationQuery::AvgLikesPerPost => {
                let value: f64 =
                    self.conn()?
                        .query_row(sql::AVG_LIKES_PER_POST, [], |row| row.get(0))?;
                Ok(vec![AggregateRow {
                    key: "all".into(),
                    value,
                }])
            }
            AggregationQuery::MostActiveUsers => self.id_metric_rows(sql::MOST_ACTIVE_USERS),
            AggregationQuery::MostLikedPosts => self.id_metric_rows(sql::MOST_LIKED_POSTS),
            AggregationQuery::UserEngagement => self.id_metric_rows(sql::USER_ENGAGEMENT),
        }
    }
}
