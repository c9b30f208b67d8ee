//! Timing records and their aggregation into the nested result structure.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backends::{AggregationQuery, BackendKind, Operation};
use crate::error::{Error, Result};
use crate::fixtures::{Scale, Variant};

fn check(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidResult(format!(
            "{name} must be a finite non-negative duration, got {value}"
        )))
    }
}

/// Durations in milliseconds for the seven operations of one backend in one
/// phase. Construction rejects negative and non-finite values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawOperationResults")]
pub struct OperationResults {
    writes: f64,
    simple_read: f64,
    filtered_read: f64,
    projected_read: f64,
    sorted_read: f64,
    update: f64,
    delete: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOperationResults {
    writes: f64,
    simple_read: f64,
    filtered_read: f64,
    projected_read: f64,
    sorted_read: f64,
    update: f64,
    delete: f64,
}

impl TryFrom<RawOperationResults> for OperationResults {
    type Error = Error;

    fn try_from(raw: RawOperationResults) -> Result<Self> {
        Ok(Self {
            writes: check("writes", raw.writes)?,
            simple_read: check("simpleRead", raw.simple_read)?,
            filtered_read: check("filteredRead", raw.filtered_read)?,
            projected_read: check("projectedRead", raw.projected_read)?,
            sorted_read: check("sortedRead", raw.sorted_read)?,
            update: check("update", raw.update)?,
            delete: check("delete", raw.delete)?,
        })
    }
}

impl OperationResults {
    /// Duration of one operation.
    pub fn get(&self, operation: Operation) -> f64 {
        match operation {
            Operation::Writes => self.writes,
            Operation::SimpleRead => self.simple_read,
            Operation::FilteredRead => self.filtered_read,
            Operation::ProjectedRead => self.projected_read,
            Operation::SortedRead => self.sorted_read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

/// Collects operation timings as they arrive.
#[derive(Debug, Clone, Default)]
pub struct OperationTimings {
    values: [Option<f64>; 7],
}

impl OperationTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, operation: Operation, millis: f64) {
        self.values[operation.index()] = Some(millis);
    }

    /// Validate and freeze. Every operation must have been recorded.
    pub fn finish(self) -> Result<OperationResults> {
        let value = |op: Operation| {
            self.values[op.index()]
                .ok_or_else(|| Error::InvalidResult(format!("{op} was not timed")))
        };
        OperationResults::try_from(RawOperationResults {
            writes: value(Operation::Writes)?,
            simple_read: value(Operation::SimpleRead)?,
            filtered_read: value(Operation::FilteredRead)?,
            projected_read: value(Operation::ProjectedRead)?,
            sorted_read: value(Operation::SortedRead)?,
            update: value(Operation::Update)?,
            delete: value(Operation::Delete)?,
        })
    }
}

/// Durations in milliseconds for the five analytic queries of one backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawAggregationResults")]
pub struct AggregationResults {
    posts_per_user: f64,
    avg_likes_per_post: f64,
    most_active_users: f64,
    most_liked_posts: f64,
    user_engagement: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAggregationResults {
    posts_per_user: f64,
    avg_likes_per_post: f64,
    most_active_users: f64,
    most_liked_posts: f64,
    user_engagement: f64,
}

impl TryFrom<RawAggregationResults> for AggregationResults {
    type Error = Error;

    fn try_from(raw: RawAggregationResults) -> Result<Self> {
        Ok(Self {
            posts_per_user: check("postsPerUser", raw.posts_per_user)?,
            avg_likes_per_post: check("avgLikesPerPost", raw.avg_likes_per_post)?,
            most_active_users: check("mostActiveUsers", raw.most_active_users)?,
            most_liked_posts: check("mostLikedPosts", raw.most_liked_posts)?,
            user_engagement: check("userEngagement", raw.user_engagement)?,
        })
    }
}

impl AggregationResults {
    pub fn get(&self, query: AggregationQuery) -> f64 {
        match query {
            AggregationQuery::PostsPerUser => self.posts_per_user,
            AggregationQuery::AvgLikesPerPost => self.avg_likes_per_post,
            AggregationQuery::MostActiveUsers => self.most_active_users,
            AggregationQuery::MostLikedPosts => self.most_liked_posts,
            AggregationQuery::UserEngagement => self.user_engagement,
        }
    }
}

/// Collects analytic query timings as they arrive.
#[derive(Debug, Clone, Default)]
pub struct AggregationTimings {
    values: [Option<f64>; 5],
}

impl AggregationTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, query: AggregationQuery, millis: f64) {
        self.values[query.index()] = Some(millis);
    }

    pub fn finish(self) -> Result<AggregationResults> {
        let value = |q: AggregationQuery| {
            self.values[q.index()]
                .ok_or_else(|| Error::InvalidResult(format!("{q} was not timed")))
        };
        AggregationResults::try_from(RawAggregationResults {
            posts_per_user: value(AggregationQuery::PostsPerUser)?,
            avg_likes_per_post: value(AggregationQuery::AvgLikesPerPost)?,
            most_active_users: value(AggregationQuery::MostActiveUsers)?,
            most_liked_posts: value(AggregationQuery::MostLikedPosts)?,
            user_engagement: value(AggregationQuery::UserEngagement)?,
        })
    }
}

/// Results of one backend in one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseResult {
    pub variant: Variant,
    pub backend: BackendKind,
    pub operations: OperationResults,
}

/// Variant, then backend, then operation timings.
pub type PhaseMatrix = BTreeMap<Variant, BTreeMap<BackendKind, OperationResults>>;

/// All phase results for one scale.
#[derive(Debug, Clone, PartialEq)]
pub struct TestResults {
    pub scale: Scale,
    pub phases: PhaseMatrix,
}

impl TestResults {
    /// `(backend_variant, results)` columns in phase order.
    pub fn columns(&self) -> Vec<(String, &OperationResults)> {
        self.phases
            .iter()
            .flat_map(|(variant, backends)| {
                backends
                    .iter()
                    .map(move |(backend, results)| (format!("{backend}_{variant}"), results))
            })
            .collect()
    }
}

/// Merges per-adapter records into the nested structure.
pub struct ResultAggregator;

impl ResultAggregator {
    /// Group phase results by variant and backend. A backend may appear
    /// under a variant at most once.
    pub fn merge<I>(scale: Scale, results: I) -> Result<TestResults>
    where
        I: IntoIterator<Item = PhaseResult>,
    {
        let mut phases = PhaseMatrix::new();
        for result in results {
            let backends = phases.entry(result.variant).or_default();
            if backends.insert(result.backend, result.operations).is_some() {
                return Err(Error::DuplicateResult(format!(
                    "{}_{} at scale {}",
                    result.backend, result.variant, scale
                )));
            }
        }
        Ok(TestResults { scale, phases })
    }

    /// Key analytic timings by backend.
    pub fn merge_aggregation<I>(results: I) -> Result<BTreeMap<BackendKind, AggregationResults>>
    where
        I: IntoIterator<Item = (BackendKind, AggregationResults)>,
    {
        let mut merged = BTreeMap::new();
        for (backend, timings) in results {
            if merged.insert(backend, timings).is_some() {
                return Err(Error::DuplicateResult(format!("{backend} aggregation")));
            }
        }
        Ok(merged)
    }
}

/// The exported artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    pub generated_at: DateTime<Utc>,
    /// Keyed by post count.
    pub scales: BTreeMap<usize, PhaseMatrix>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aggregation: BTreeMap<BackendKind, AggregationResults>,
}

impl BenchmarkReport {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            scales: BTreeMap::new(),
            aggregation: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, results: TestResults) {
        self.scales.insert(results.scale.count(), results.phases);
    }

    /// Per-scale results, smallest scale first.
    pub fn test_results(&self) -> Vec<TestResults> {
        self.scales
            .iter()
            .filter_map(|(count, phases)| {
                Some(TestResults {
                    scale: Scale::from_count(*count)?,
                    phases: phases.clone(),
                })
            })
            .collect()
    }
}

impl Default for BenchmarkReport {
    fn default() -> Self {
        Self::new()
    }
}
