//! SQL shared by the SQLite and PostgreSQL backends.
//!
//! Statements use `$n` placeholders, which SQLite accepts as positional
//! parameters as well.

use super::rows::{AuthorView, PostView};

pub const RESET: [&str; 4] = [
    "DELETE FROM likes",
    "DELETE FROM follows",
    "DELETE FROM posts",
    "DELETE FROM users",
];

pub const COUNT_USERS: &str = "SELECT COUNT(*) FROM users";
pub const COUNT_POSTS: &str = "SELECT COUNT(*) FROM posts";
pub const COUNT_LIKES: &str = "SELECT COUNT(*) FROM likes";
pub const COUNT_FOLLOWS: &str = "SELECT COUNT(*) FROM follows";

pub const INSERT_USER: &str =
    "INSERT INTO users (id, username, role, created_at) VALUES ($1, $2, $3, $4)";
pub const INSERT_POST: &str = "INSERT INTO posts (id, title, body, status, created_at, user_id) \
     VALUES ($1, $2, $3, $4, $5, $6)";
pub const INSERT_LIKE: &str = "INSERT INTO likes (post_id, user_id) VALUES ($1, $2)";

/// Posts joined with their author and likes, one row per like.
pub const SELECT_POSTS: &str = r#"
    SELECT p.id, p.title, p.body, p.status, p.created_at,
           u.id, u.username, u.role, l.user_id
    FROM posts p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN likes l ON l.post_id = p.id
    ORDER BY p.id, l.user_id
"#;

/// Active posts with at least one like. Binds the active status.
pub const SELECT_LIKED_ACTIVE_POSTS: &str = r#"
    SELECT p.id, p.title, p.body, p.status, p.created_at,
           u.id, u.username, u.role, l.user_id
    FROM posts p
    JOIN users u ON u.id = p.user_id
    JOIN likes l ON l.post_id = p.id
    WHERE p.status = $1
    ORDER BY p.id, l.user_id
"#;

/// Projection of active liked posts. Binds the active status.
pub const SELECT_SUMMARIES: &str = r#"
    SELECT p.title, p.created_at, u.username, COUNT(l.user_id) AS like_count
    FROM posts p
    JOIN users u ON u.id = p.user_id
    JOIN likes l ON l.post_id = p.id
    WHERE p.status = $1
    GROUP BY p.id, p.title, p.created_at, u.username
"#;

/// [`SELECT_SUMMARIES`] ordered newest first, ties by title.
pub const SELECT_SORTED_SUMMARIES: &str = r#"
    SELECT p.title, p.created_at, u.username, COUNT(l.user_id) AS like_count
    FROM posts p
    JOIN users u ON u.id = p.user_id
    JOIN likes l ON l.post_id = p.id
    WHERE p.status = $1
    GROUP BY p.id, p.title, p.created_at, u.username
    ORDER BY p.created_at DESC, p.title ASC
"#;

pub const UPDATE_STATUS: &str = "UPDATE posts SET status = $1 WHERE status = $2";
pub const UPDATE_TITLES: &str = "UPDATE posts SET title = $1";

/// Likes go with their posts through `ON DELETE CASCADE`.
pub const DELETE_POSTS_BY_STATUS: &str = "DELETE FROM posts WHERE status = $1";
pub const DELETE_ALL_LIKES: &str = "DELETE FROM likes";
pub const DELETE_ALL_POSTS: &str = "DELETE FROM posts";

pub const POSTS_PER_USER: &str = r#"
    SELECT u.id, COUNT(p.id) AS post_count
    FROM users u
    LEFT JOIN posts p ON p.user_id = u.id
    GROUP BY u.id
    ORDER BY u.id
"#;

pub const AVG_LIKES_PER_POST: &str = r#"
    SELECT COALESCE(CAST(AVG(c.like_count) AS DOUBLE PRECISION), 0.0)
    FROM (
        SELECT COUNT(l.user_id) AS like_count
        FROM posts p
        LEFT JOIN likes l ON l.post_id = p.id
        GROUP BY p.id
    ) AS c
"#;

pub const MOST_ACTIVE_USERS: &str = r#"
    SELECT u.id, COUNT(p.id) AS post_count
    FROM users u
    LEFT JOIN posts p ON p.user_id = u.id
    GROUP BY u.id
    ORDER BY post_count DESC, u.id ASC
    LIMIT 10
"#;

pub const MOST_LIKED_POSTS: &str = r#"
    SELECT p.id, COUNT(l.user_id) AS like_count
    FROM posts p
    JOIN likes l ON l.post_id = p.id
    GROUP BY p.id
    ORDER BY like_count DESC, p.id ASC
    LIMIT 10
"#;

pub const USER_ENGAGEMENT: &str = r#"
    SELECT p.user_id, COUNT(*) AS likes_received
    FROM likes l
    JOIN posts p ON p.id = l.post_id
    GROUP BY p.user_id
    ORDER BY likes_received DESC, p.user_id ASC
    LIMIT 10
"#;

/// One row of [`SELECT_POSTS`] before folding.
#[derive(Debug, Clone)]
pub struct FlatPostRow {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub status: String,
    pub created_at: i64,
    pub author_id: i64,
    pub username: String,
    pub role: String,
    pub liked_by: Option<i64>,
}

/// Fold join rows ordered by post id into one view per post.
pub fn fold_post_rows<I>(rows: I) -> Vec<PostView>
where
    I: IntoIterator<Item = FlatPostRow>,
{
    let mut posts: Vec<PostView> = Vec::new();
    for row in rows {
        match posts.last_mut() {
            Some(last) if last.id == row.id => last.likes.extend(row.liked_by),
            _ => posts.push(PostView {
                id: row.id,
                title: row.title,
                body: row.body,
                status: row.status,
                created_at: row.created_at,
                author: AuthorView {
                    id: row.author_id,
                    username: row.username,
                    role: row.role,
                },
                likes: row.liked_by.into_iter().collect(),
            }),
        }
    }
    posts
}
