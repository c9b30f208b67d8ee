//! Benchmark configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::backends::{
    BackendAdapter, DeleteScenario, DocumentBackend, SqliteBackend, UpdateScenario,
};
use crate::error::{Error, Result};
use crate::fixtures::Scale;

/// Default location of the exported results.
pub const DEFAULT_OUTPUT_PATH: &str = "results/benchmark_results.json";

/// Relational engine compared against the document store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationalEngine {
    #[default]
    Sqlite,
    /// Requires the `postgres` feature.
    Postgres,
}

impl fmt::Display for RelationalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationalEngine::Sqlite => f.write_str("sqlite"),
            RelationalEngine::Postgres => f.write_str("postgres"),
        }
    }
}

impl FromStr for RelationalEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sqlite" => Ok(RelationalEngine::Sqlite),
            "postgres" | "postgresql" => Ok(RelationalEngine::Postgres),
            other => Err(Error::Config(format!(
                "unknown relational engine {other:?}, expected sqlite or postgres"
            ))),
        }
    }
}

/// Benchmark run configuration.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Scales to run, in order.
    pub scales: Vec<Scale>,

    /// Relational engine under comparison.
    pub relational: RelationalEngine,

    /// SQLite database file. None uses an in-memory database.
    pub sqlite_path: Option<PathBuf>,

    /// PostgreSQL connection URL.
    pub postgres_url: Option<String>,

    /// Document store directory. None uses a temporary store.
    pub document_path: Option<PathBuf>,

    /// Where the JSON results are written.
    pub output_path: PathBuf,

    /// Behavior of the `update` operation.
    pub update: UpdateScenario,

    /// Behavior of the `delete` operation.
    pub delete: DeleteScenario,

    /// Dataset size for the analytic pass. None skips the pass.
    pub aggregation_scale: Option<Scale>,
}

impl BenchConfig {
    /// Create a configuration running the given scales.
    pub fn new(scales: impl IntoIterator<Item = Scale>) -> Self {
        Self {
            scales: scales.into_iter().collect(),
            relational: RelationalEngine::Sqlite,
            sqlite_path: None,
            postgres_url: None,
            document_path: None,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            update: UpdateScenario::default(),
            delete: DeleteScenario::default(),
            aggregation_scale: Some(Scale::Medium),
        }
    }

    /// Use a SQLite database file.
    pub fn with_sqlite_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.relational = RelationalEngine::Sqlite;
        self.sqlite_path = Some(path.into());
        self
    }

    /// Compare against PostgreSQL instead of SQLite.
    pub fn with_postgres(mut self, url: impl Into<String>) -> Self {
        self.relational = RelationalEngine::Postgres;
        self.postgres_url = Some(url.into());
        self
    }

    /// Keep the document store in a directory.
    pub fn with_document_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.document_path = Some(path.into());
        self
    }

    /// Set the results file.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Set the update scenario.
    pub fn with_update(mut self, scenario: UpdateScenario) -> Self {
        self.update = scenario;
        self
    }

    /// Set the delete scenario.
    pub fn with_delete(mut self, scenario: DeleteScenario) -> Self {
        self.delete = scenario;
        self
    }

    /// Set the analytic pass dataset size.
    pub fn with_aggregation_scale(mut self, scale: Scale) -> Self {
        self.aggregation_scale = Some(scale);
        self
    }

    /// Skip the analytic pass.
    pub fn without_aggregation(mut self) -> Self {
        self.aggregation_scale = None;
        self
    }

    /// Check if the analytic pass runs.
    pub fn has_aggregation(&self) -> bool {
        self.aggregation_scale.is_some()
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.scales.is_empty() {
            return Err(Error::Config("at least one scale is required".into()));
        }
        let mut seen = self.scales.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.scales.len() {
            return Err(Error::Config("scales must not repeat".into()));
        }
        if self.relational == RelationalEngine::Postgres && self.postgres_url.is_none() {
            return Err(Error::Config(
                "postgres requires a connection URL (--database-url or DATABASE_URL)".into(),
            ));
        }
        Ok(())
    }

    /// Build the relational and document adapters, unconnected.
    pub fn build_adapters(&self) -> Result<Vec<Box<dyn BackendAdapter>>> {
        let relational: Box<dyn BackendAdapter> = match self.relational {
            RelationalEngine::Sqlite => Box::new(match &self.sqlite_path {
                Some(path) => SqliteBackend::with_path(path),
                None => SqliteBackend::in_memory(),
            }),
            RelationalEngine::Postgres => self.postgres_adapter()?,
        };
        let document: Box<dyn BackendAdapter> = Box::new(match &self.document_path {
            Some(path) => DocumentBackend::with_path(path),
            None => DocumentBackend::temporary(),
        });
        Ok(vec![relational, document])
    }

    #[cfg(feature = "postgres")]
    fn postgres_adapter(&self) -> Result<Box<dyn BackendAdapter>> {
        let url = self
            .postgres_url
            .as_deref()
            .ok_or_else(|| Error::Config("postgres requires a connection URL".into()))?;
        Ok(Box::new(crate::backends::PostgresBackend::new(url)?))
    }

    #[cfg(not(feature = "postgres"))]
    fn postgres_adapter(&self) -> Result<Box<dyn BackendAdapter>> {
        Err(Error::Config(
            "postgres support is not compiled in; rebuild with --features postgres".into(),
        ))
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::new(Scale::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::BackendKind;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.scales, vec![Scale::Small, Scale::Medium, Scale::Large]);
        assert_eq!(config.relational, RelationalEngine::Sqlite);
        assert_eq!(config.output_path, PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert_eq!(config.aggregation_scale, Some(Scale::Medium));
        config.validate().unwrap();
    }

    #[test]
    fn test_builder() {
        let config = BenchConfig::new([Scale::Small])
            .with_sqlite_path("/tmp/race.db")
            .with_update(UpdateScenario::RetitleAll)
            .with_delete(DeleteScenario::Everything)
            .without_aggregation();

        assert_eq!(config.sqlite_path, Some(PathBuf::from("/tmp/race.db")));
        assert_eq!(config.update, UpdateScenario::RetitleAll);
        assert_eq!(config.delete, DeleteScenario::Everything);
        assert!(!config.has_aggregation());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            BenchConfig::new(Vec::new()).validate(),
            Err(Error::Config(_))
        ));
        assert!(BenchConfig::new([Scale::Small, Scale::Small])
            .validate()
            .is_err());

        let mut config = BenchConfig::new([Scale::Small]);
        config.relational = RelationalEngine::Postgres;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_adapters() {
        let adapters = BenchConfig::new([Scale::Small]).build_adapters().unwrap();
        let kinds: Vec<BackendKind> = adapters.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![BackendKind::Sqlite, BackendKind::Document]);
        assert!(adapters.iter().all(|a| !a.is_connected()));
    }

    #[test]
    fn test_engine_parsing() {
        assert_eq!(
            "postgresql".parse::<RelationalEngine>().unwrap(),
            RelationalEngine::Postgres
        );
        assert!("mysql".parse::<RelationalEngine>().is_err());
    }
}
