//! PostgreSQL backend.
//!
//! Requires a running PostgreSQL instance. Enable with `--features postgres`.
//! The pool is driven from a private Tokio runtime so the adapter keeps the
//! same blocking surface as the other backends.

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tokio::runtime::Runtime;

use crate::error::{Error, Result};
use crate::fixtures::{Dataset, PostStatus, Variant};

use super::rows::{AggregateRow, PostSummary, PostView};
use super::sql::{self, FlatPostRow};
use super::{
    AggregationQuery, BackendAdapter, BackendKind, DeleteScenario, EntityCounts, UpdateScenario,
    WriteSummary, RETITLED_TITLE,
};

const SCHEMA: [&str; 4] = [
    r#"CREATE TABLE IF NOT EXISTS users (
        id BIGINT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL,
        created_at BIGINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS posts (
        id BIGINT PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at BIGINT NOT NULL,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS likes (
        post_id BIGINT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        PRIMARY KEY (post_id, user_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS follows (
        following_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        followed_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at BIGINT NOT NULL,
        PRIMARY KEY (following_id, followed_id)
    )"#,
];

const INSERT_USERS: &str = r#"
    INSERT INTO users (id, username, role, created_at)
    SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[], $4::BIGINT[])
"#;

const INSERT_POSTS: &str = r#"
    INSERT INTO posts (id, title, body, status, created_at, user_id)
    SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[], $4::TEXT[], $5::BIGINT[], $6::BIGINT[])
"#;

const INSERT_LIKES: &str = r#"
    INSERT INTO likes (post_id, user_id)
    SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[])
    ON CONFLICT DO NOTHING
"#;

/// PostgreSQL backend for benchmarks.
pub struct PostgresBackend {
    url: String,
    max_connections: u32,
    pool: Option<PgPool>,
    rt: Runtime,
}

impl PostgresBackend {
    /// Create a backend for the given connection URL. Nothing is opened
    /// until `connect`.
    ///
    /// Queries run on a current-thread runtime, so no worker threads run
    /// alongside a timed call.
    pub fn new(database_url: impl Into<String>) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            url: database_url.into(),
            max_connections: 10,
            pool: None,
            rt,
        })
    }

    fn pool(&self) -> Result<&PgPool> {
        self.pool.as_ref().ok_or(Error::NotConnected {
            backend: BackendKind::Postgres.as_str(),
        })
    }

    fn count(&self, statement: &str) -> Result<u64> {
        let pool = self.pool()?;
        let n: i64 = self
            .rt
            .block_on(sqlx::query_scalar(statement).fetch_one(pool))?;
        Ok(n as u64)
    }

    fn id_metric_rows(&self, statement: &str) -> Result<Vec<AggregateRow>> {
        let pool = self.pool()?;
        let rows = self.rt.block_on(sqlx::query(statement).fetch_all(pool))?;
        rows.iter()
            .map(|row| {
                Ok(AggregateRow {
                    key: row.try_get::<i64, _>(0)?.to_string(),
                    value: row.try_get::<i64, _>(1)? as f64,
                })
            })
            .collect()
    }
}

fn flat_post_row(row: &PgRow) -> std::result::Result<FlatPostRow, sqlx::Error> {
    Ok(FlatPostRow {
        id: row.try_get(0)?,
        title: row.try_get(1)?,
        body: row.try_get(2)?,
        status: row.try_get(3)?,
        created_at: row.try_get(4)?,
        author_id: row.try_get(5)?,
        username: row.try_get(6)?,
        role: row.try_get(7)?,
        liked_by: row.try_get(8)?,
    })
}

impl BackendAdapter for PostgresBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn supports(&self, variant: Variant) -> bool {
        matches!(variant, Variant::Basic | Variant::Relational)
    }

    fn connect(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }
        let pool = self
            .rt
            .block_on(
                PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&self.url),
            )
            .map_err(|e| Error::Connection {
                backend: BackendKind::Postgres.as_str(),
                message: e.to_string(),
            })?;

        self.rt.block_on(async {
            for statement in SCHEMA {
                sqlx::query(statement).execute(&pool).await?;
            }
            Ok::<_, sqlx::Error>(())
        })?;

        tracing::info!(max_connections = self.max_connections, "postgres connected");
        self.pool = Some(pool);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            self.rt.block_on(pool.close());
            tracing::info!("postgres disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    fn reset_state(&mut self) -> Result<()> {
        let pool = self.pool()?;
        self.rt.block_on(async {
            let mut tx = pool.begin().await?;
            for statement in sql::RESET {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            tx.commit().await
        })?;
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
        Ok(())
    }

    fn write_dataset(&mut self, variant: Variant, dataset: &Dataset) -> Result<WriteSummary> {
        let users = &dataset.users;
        let posts = &dataset.posts;
        let likes = &dataset.likes;
        let pool = self.pool()?;

        let inserted_likes = self.rt.block_on(async {
            let mut tx = pool.begin().await?;

            sqlx::query(INSERT_USERS)
                .bind(users.iter().map(|u| u.id).collect::<Vec<_>>())
                .bind(users.iter().map(|u| u.username.clone()).collect::<Vec<_>>())
                .bind(users.iter().map(|u| u.role.as_str().to_string()).collect::<Vec<_>>())
                .bind(users.iter().map(|u| u.created_at.timestamp_millis()).collect::<Vec<_>>())
                .execute(&mut *tx)
                .await?;

            sqlx::query(INSERT_POSTS)
                .bind(posts.iter().map(|p| p.id).collect::<Vec<_>>())
                .bind(posts.iter().map(|p| p.title.clone()).collect::<Vec<_>>())
                .bind(posts.iter().map(|p| p.body.clone()).collect::<Vec<_>>())
                .bind(posts.iter().map(|p| p.status.as_str().to_string()).collect::<Vec<_>>())
                .bind(posts.iter().map(|p| p.created_at.timestamp_millis()).collect::<Vec<_>>())
                .bind(posts.iter().map(|p| p.user_id).collect::<Vec<_>>())
                .execute(&mut *tx)
                .await?;

            let result = sqlx::query(INSERT_LIKES)
                .bind(likes.iter().map(|l| l.post_id).collect::<Vec<_>>())
                .bind(likes.iter().map(|l| l.user_id).collect::<Vec<_>>())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(result.rows_affected())
        })?;

        let summary = WriteSummary {
            users: users.len() as u64,
            posts: posts.len() as u64,
            likes: inserted_likes,
            duplicates_skipped: (likes.len() as u64).saturating_sub(inserted_likes),
        };
        if summary.duplicates_skipped > 0 {
            tracing::warn!(
                backend = "postgres",
                variant = %variant,
                skipped = summary.duplicates_skipped,
                "duplicate likes skipped"
            );
        }
        Ok(summary)
    }

    fn read_posts(&mut self, _variant: Variant, filtered: bool) -> Result<Vec<PostView>> {
        let pool = self.pool()?;
        let rows = if filtered {
            self.rt.block_on(
                sqlx::query(sql::SELECT_LIKED_ACTIVE_POSTS)
                    .bind(PostStatus::Active.as_str())
                    .fetch_all(pool),
            )?
        } else {
            self.rt
                .block_on(sqlx::query(sql::SELECT_POSTS).fetch_all(pool))?
        };
        let flat = rows
            .iter()
            .map(flat_post_row)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sql::fold_post_rows(flat))
    }

    fn read_summaries(&mut self, _variant: Variant, sorted: bool) -> Result<Vec<PostSummary>> {
        let statement = if sorted {
            sql::SELECT_SORTED_SUMMARIES
        } else {
            sql::SELECT_SUMMARIES
        };
        let pool = self.pool()?;
        let rows = self.rt.block_on(
            sqlx::query(statement)
                .bind(PostStatus::Active.as_str())
                .fetch_all(pool),
        )?;
        rows.iter()
            .map(|row| {
                Ok(PostSummary {
                    title: row.try_get(0)?,
                    created_at: row.try_get(1)?,
                    author: row.try_get(2)?,
                    like_count: row.try_get::<i64, _>(3)? as u64,
                })
            })
            .collect()
    }

    fn update_posts(&mut self, _variant: Variant, scenario: UpdateScenario) -> Result<u64> {
        let pool = self.pool()?;
        let query = match scenario {
            UpdateScenario::PromoteActive => sqlx::query(sql::UPDATE_STATUS)
                .bind(PostStatus::Trending.as_str())
                .bind(PostStatus::Active.as_str()),
            UpdateScenario::RetitleAll => sqlx::query(sql::UPDATE_TITLES).bind(RETITLED_TITLE),
        };
        let result = self.rt.block_on(query.execute(pool))?;
        Ok(result.rows_affected())
    }

    fn delete_posts(&mut self, _variant: Variant, scenario: DeleteScenario) -> Result<u64> {
        let pool = self.pool()?;
        let deleted = self.rt.block_on(async {
            let mut tx = pool.begin().await?;
            let result = match scenario {
                DeleteScenario::ArchivedPosts => {
                    sqlx::query(sql::DELETE_POSTS_BY_STATUS)
                        .bind(PostStatus::Archived.as_str())
                        .execute(&mut *tx)
                        .await?
                }
                DeleteScenario::Everything => {
                    sqlx::query(sql::DELETE_ALL_LIKES).execute(&mut *tx).await?;
                    sqlx::query(sql::DELETE_ALL_POSTS).execute(&mut *tx).await?
                }
            };
            tx.commit().await?;
            Ok::<_, sqlx::Error>(result.rows_affected())
        })?;
        Ok(deleted)
    }

    fn aggregate(&mut self, query: AggregationQuery) -> Result<Vec<AggregateRow>> {
        match query {
            AggregationQuery::PostsPerUser => self.id_metric_rows(sql::POSTS_PER_USER),
            AggregationQuery::AvgLikesPerPost => {
                let pool = self.pool()?;
                let value: f64 = self
                    .rt
                    .block_on(sqlx::query_scalar(sql::AVG_LIKES_PER_POST).fetch_one(pool))?;
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
