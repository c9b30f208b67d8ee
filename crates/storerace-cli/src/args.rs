//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use storerace_bench::config::DEFAULT_OUTPUT_PATH;
use storerace_bench::{BenchConfig, DeleteScenario, RelationalEngine, Scale, UpdateScenario};

/// How results are printed once the run completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII tables
    Table,
    /// The exported JSON document
    Json,
}

/// Relational vs document store benchmark
#[derive(Parser, Debug)]
#[command(name = "storerace")]
#[command(version, about = "Relational vs document store benchmark", long_about = None)]
pub struct Args {
    /// Scales to run (post counts: 100, 1000, 30000). Repeat for several.
    #[arg(short, long = "scale", value_name = "POSTS")]
    pub scales: Vec<Scale>,

    /// Relational engine (sqlite or postgres).
    #[arg(long, default_value = "sqlite")]
    pub relational: RelationalEngine,

    /// SQLite database file. In-memory when omitted.
    #[arg(long)]
    pub sqlite_path: Option<PathBuf>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Document store directory. Temporary when omitted.
    #[arg(long)]
    pub document_path: Option<PathBuf>,

    /// Results file.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Update scenario (promote-active or retitle-all).
    #[arg(long, default_value = "promote-active")]
    pub update: UpdateScenario,

    /// Delete scenario (archived-posts or everything).
    #[arg(long, default_value = "archived-posts")]
    pub delete: DeleteScenario,

    /// Dataset size for the analytic queries.
    #[arg(long, default_value = "1000")]
    pub aggregation_scale: Scale,

    /// Skip the analytic queries.
    #[arg(long)]
    pub skip_aggregation: bool,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,
}

impl Args {
    /// Convert command-line arguments to a benchmark configuration.
    pub fn into_config(self) -> BenchConfig {
        let scales = if self.scales.is_empty() {
            Scale::ALL.to_vec()
        } else {
            self.scales
        };

        let mut config = BenchConfig::new(scales)
            .with_output_path(self.output)
            .with_update(self.update)
            .with_delete(self.delete)
            .with_aggregation_scale(self.aggregation_scale);

        config.relational = self.relational;
        config.sqlite_path = self.sqlite_path;
        config.postgres_url = self.database_url;
        config.document_path = self.document_path;

        if self.skip_aggregation {
            config = config.without_aggregation();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["storerace"]);
        assert_eq!(args.format, OutputFormat::Table);
        let config = args.into_config();
        assert_eq!(config.scales, Scale::ALL.to_vec());
        assert_eq!(config.relational, RelationalEngine::Sqlite);
        assert_eq!(config.update, UpdateScenario::PromoteActive);
        assert_eq!(config.delete, DeleteScenario::ArchivedPosts);
        assert_eq!(config.aggregation_scale, Some(Scale::Medium));
        assert_eq!(config.output_path, PathBuf::from(DEFAULT_OUTPUT_PATH));
    }

    #[test]
    fn test_scales_and_scenarios() {
        let config = Args::parse_from([
            "storerace",
            "--scale",
            "100",
            "-s",
            "1000",
            "--update",
            "retitle-all",
            "--delete",
            "everything",
            "--skip-aggregation",
            "--output",
            "/tmp/out.json",
        ])
        .into_config();

        assert_eq!(config.scales, vec![Scale::Small, Scale::Medium]);
        assert_eq!(config.update, UpdateScenario::RetitleAll);
        assert_eq!(config.delete, DeleteScenario::Everything);
        assert!(!config.has_aggregation());
        assert_eq!(config.output_path, PathBuf::from("/tmp/out.json"));
    }

    #[test]
    fn test_postgres_selection() {
        let config = Args::parse_from([
            "storerace",
            "--relational",
            "postgres",
            "--database-url",
            "postgres://localhost/race",
        ])
        .into_config();
        assert_eq!(config.relational, RelationalEngine::Postgres);
        assert_eq!(
            config.postgres_url.as_deref(),
            Some("postgres://localhost/race")
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_unknown_scale() {
        assert!(Args::try_parse_from(["storerace", "--scale", "42"]).is_err());
    }
}
