//! Storerace benchmark suite.
//!
//! Compares a relational store (SQLite, or PostgreSQL with the `postgres`
//! feature) against the embedded document store on a social-media workload
//! of users, posts and likes.
//!
//! # Running
//!
//! ```bash
//! # Default comparison
//! cargo run --release -p storerace-cli
//!
//! # Single scale, PostgreSQL instead of SQLite
//! DATABASE_URL=postgres://localhost/race \
//!     cargo run --release -p storerace-cli --features postgres -- --scale 1000 --relational postgres
//!
//! # Micro benchmarks of single operations
//! cargo bench -p storerace-bench
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod report;
pub mod reporter;
pub mod results;

pub use backends::{BackendAdapter, BackendKind, DeleteScenario, Operation, UpdateScenario};
pub use config::{BenchConfig, RelationalEngine};
pub use error::{Error, ErrorKind, Result};
pub use fixtures::{Dataset, DatasetGenerator, Scale, Variant};
pub use harness::{BenchmarkRunner, RunState};
pub use report::{render_report, ResultExporter};
pub use reporter::{MemoryReporter, ProgressEvent, Reporter, TracingReporter};
pub use results::{BenchmarkReport, ResultAggregator, TestResults};
