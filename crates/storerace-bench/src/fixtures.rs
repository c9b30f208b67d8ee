//! Synthetic dataset generation.
//!
//! Datasets are drawn from `rand::thread_rng()` and are therefore not
//! reproducible between runs: two runs at the same scale produce different
//! records with the same shape and counts.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Span of the generated creation timestamps, ending at generation time.
const TIMESTAMP_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;

/// Upper bound (exclusive) of the numeric username suffix.
const USERNAME_SUFFIX_RANGE: u32 = 100_000;

const NAMES: [&str; 12] = [
    "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy", "mallory",
    "oscar",
];

const TITLE_WORDS: [&str; 16] = [
    "rust", "latency", "index", "query", "join", "document", "table", "cache", "scale", "shard",
    "commit", "replica", "cursor", "pipeline", "schema", "vacuum",
];

/// Benchmark size: the number of posts in a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// 100 posts, 10 users.
    Small,
    /// 1,000 posts, 100 users.
    Medium,
    /// 30,000 posts, 3,000 users.
    Large,
}

impl Scale {
    /// Every benchmark size, smallest first.
    pub const ALL: [Scale; 3] = [Scale::Small, Scale::Medium, Scale::Large];

    /// Number of posts.
    pub fn count(&self) -> usize {
        match self {
            Scale::Small => 100,
            Scale::Medium => 1_000,
            Scale::Large => 30_000,
        }
    }

    /// Number of users: one per ten posts.
    pub fn users(&self) -> usize {
        self.count() / 10
    }

    /// Number of like insert attempts before deduplication.
    pub fn like_attempts(&self, variant: Variant) -> usize {
        match variant {
            Variant::Basic => self.count() / 2,
            Variant::Relational | Variant::Indexed => self.count() * 5,
        }
    }

    /// Look up the scale with the given post count.
    pub fn from_count(count: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.count() == count)
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

impl FromStr for Scale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(Scale::Small),
            "medium" => Ok(Scale::Medium),
            "large" => Ok(Scale::Large),
            other => other
                .parse::<usize>()
                .ok()
                .and_then(Scale::from_count)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "unknown scale {other:?}, expected one of 100, 1000, 30000"
                    ))
                }),
        }
    }
}

/// Dataset shape paired with a backend configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Sparse likes, flat access.
    Basic,
    /// Dense likes, join-based access.
    Relational,
    /// Dense likes, join-based access over declared indexes.
    Indexed,
}

impl Variant {
    /// Phases in execution order.
    pub const ALL: [Variant; 3] = [Variant::Basic, Variant::Relational, Variant::Indexed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Basic => "basic",
            Variant::Relational => "relational",
            Variant::Indexed => "indexed",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

/// Post lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Active,
    Draft,
    Archived,
    Trending,
}

impl PostStatus {
    pub const ALL: [PostStatus; 4] = [
        PostStatus::Active,
        PostStatus::Draft,
        PostStatus::Archived,
        PostStatus::Trending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Active => "active",
            PostStatus::Draft => "draft",
            PostStatus::Archived => "archived",
            PostStatus::Trending => "trending",
        }
    }
}

/// A user account.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A post owned by a user.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
}

/// A like, identified by its (post, user) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Like {
    pub post_id: i64,
    pub user_id: i64,
}

/// A follow edge between two users.
#[derive(Clone, Debug, PartialEq)]
pub struct Follow {
    pub following_id: i64,
    pub followed_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Entity sets generated for one scale and variant.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub scale: Scale,
    pub variant: Variant,
    pub users: Vec<User>,
    pub posts: Vec<Post>,
    pub likes: Vec<Like>,
    pub follows: Vec<Follow>,
    /// Likes drawn before deduplication.
    pub like_attempts: usize,
}

impl Dataset {
    /// Check referential integrity and like uniqueness.
    pub fn validate(&self) -> Result<()> {
        let user_ids: HashSet<i64> = self.users.iter().map(|u| u.id).collect();
        let post_ids: HashSet<i64> = self.posts.iter().map(|p| p.id).collect();

        if let Some(post) = self.posts.iter().find(|p| !user_ids.contains(&p.user_id)) {
            return Err(Error::InvalidDataset(format!(
                "post {} references missing user {}",
                post.id, post.user_id
            )));
        }

        let mut seen = HashSet::with_capacity(self.likes.len());
        for like in &self.likes {
            if !post_ids.contains(&like.post_id) || !user_ids.contains(&like.user_id) {
                return Err(Error::InvalidDataset(format!(
                    "like ({}, {}) references a missing post or user",
                    like.post_id, like.user_id
                )));
            }
            if !seen.insert(*like) {
                return Err(Error::InvalidDataset(format!(
                    "duplicate like ({}, {})",
                    like.post_id, like.user_id
                )));
            }
        }

        let usernames: HashSet<&str> = self.users.iter().map(|u| u.username.as_str()).collect();
        if usernames.len() != self.users.len() {
            return Err(Error::InvalidDataset("usernames are not unique".into()));
        }

        Ok(())
    }
}

/// Produces datasets with referential integrity.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatasetGenerator;

impl DatasetGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate users, posts, likes (and follows for dense variants).
    ///
    /// Parents are always generated before children, so every reference
    /// resolves inside the returned dataset.
    pub fn generate(&self, scale: Scale, variant: Variant) -> Dataset {
        let mut rng = rand::thread_rng();
        let now = Utc::now().timestamp();

        let users = generate_users(&mut rng, scale.users(), now);
        let posts = generate_posts(&mut rng, scale.count(), &users, now);
        let like_attempts = scale.like_attempts(variant);
        let likes = generate_likes(&mut rng, like_attempts, &posts, &users);
        let follows = match variant {
            Variant::Basic => Vec::new(),
            Variant::Relational | Variant::Indexed => {
                generate_follows(&mut rng, users.len() * 2, &users, now)
            }
        };

        tracing::debug!(
            scale = scale.count(),
            variant = %variant,
            users = users.len(),
            posts = posts.len(),
            likes = likes.len(),
            like_attempts,
            "dataset generated"
        );

        Dataset {
            scale,
            variant,
            users,
            posts,
            likes,
            follows,
            like_attempts,
        }
    }
}

fn random_timestamp<R: Rng>(rng: &mut R, now: i64) -> DateTime<Utc> {
    let secs = now - rng.gen_range(0..TIMESTAMP_WINDOW_SECS);
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

fn random_text<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

/// Generate users with unique usernames, retrying on collision.
fn generate_users<R: Rng>(rng: &mut R, count: usize, now: i64) -> Vec<User> {
    let mut taken: HashSet<String> = HashSet::with_capacity(count);
    let mut users = Vec::with_capacity(count);

    for i in 0..count {
        let username = loop {
            let name = NAMES.choose(rng).copied().unwrap_or("user");
            let candidate = format!("{}_{}", name, rng.gen_range(0..USERNAME_SUFFIX_RANGE));
            if taken.insert(candidate.clone()) {
                break candidate;
            }
        };
        users.push(User {
            id: i as i64 + 1,
            username,
            role: Role::ALL[rng.gen_range(0..Role::ALL.len())],
            created_at: random_timestamp(rng, now),
        });
    }

    users
}

fn generate_posts<R: Rng>(rng: &mut R, count: usize, users: &[User], now: i64) -> Vec<Post> {
    if users.is_empty() {
        return Vec::new();
    }

    (0..count)
        .map(|i| {
            let words: Vec<&str> = (0..rng.gen_range(2..=5))
                .map(|_| TITLE_WORDS[rng.gen_range(0..TITLE_WORDS.len())])
                .collect();
            let body_len = rng.gen_range(80..=240);
            Post {
                id: i as i64 + 1,
                title: words.join(" "),
                body: random_text(rng, body_len),
                status: PostStatus::ALL[rng.gen_range(0..PostStatus::ALL.len())],
                created_at: random_timestamp(rng, now),
                user_id: users[rng.gen_range(0..users.len())].id,
            }
        })
        .collect()
}

/// Draw `attempts` random (post, user) pairs, keeping the first of each.
fn generate_likes<R: Rng>(rng: &mut R, attempts: usize, posts: &[Post], users: &[User]) -> Vec<Like> {
    if posts.is_empty() || users.is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::with_capacity(attempts);
    let mut likes = Vec::with_capacity(attempts);
    for _ in 0..attempts {
        let like = Like {
            post_id: posts[rng.gen_range(0..posts.len())].id,
            user_id: users[rng.gen_range(0..users.len())].id,
        };
        if seen.insert(like) {
            likes.push(like);
        }
    }
    likes
}

fn generate_follows<R: Rng>(rng: &mut R, attempts: usize, users: &[User], now: i64) -> Vec<Follow> {
    if users.len() < 2 {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut follows = Vec::new();
    for _ in 0..attempts {
        let following_id = users[rng.gen_range(0..users.len())].id;
        let followed_id = users[rng.gen_range(0..users.len())].id;
        if following_id == followed_id || !seen.insert((following_id, followed_id)) {
            continue;
        }
        follows.push(Follow {
            following_id,
            followed_id,
            created_at: random_timestamp(rng, now),
        });
    }
    follows
}
