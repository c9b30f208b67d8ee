use std::cell::Cell;
use std::rc::Rc;

use storerace_bench::backends::rows::{AggregateRow, PostSummary, PostView};
use storerace_bench::backends::{
    AggregationQuery, DocumentBackend, EntityCounts, SqliteBackend, Workload, WriteSummary,
};
use storerace_bench::fixtures::PostStatus;
use storerace_bench::{
    BackendAdapter, BackendKind, BenchConfig, BenchmarkRunner, DeleteScenario, ErrorKind,
    MemoryReporter, Operation, ProgressEvent, ResultExporter, RunState, Scale, UpdateScenario,
    Variant,
};

fn small_config() -> BenchConfig {
    BenchConfig::new([Scale::Small]).with_aggregation_scale(Scale::Small)
}

fn adapters() -> Vec<Box<dyn BackendAdapter>> {
    vec![
        Box::new(SqliteBackend::in_memory()),
        Box::new(DocumentBackend::temporary()),
    ]
}

#[test]
fn test_full_run_at_smallest_scale() {
    let mut runner = BenchmarkRunner::new(small_config(), adapters(), MemoryReporter::new());
    let report = runner.run().unwrap();
    assert_eq!(runner.state(), RunState::Done);

    let phases = &report.scales[&100];
    assert_eq!(phases.len(), 3);
    assert_eq!(
        phases[&Variant::Basic].keys().copied().collect::<Vec<_>>(),
        vec![BackendKind::Sqlite, BackendKind::Document]
    );
    assert_eq!(
        phases[&Variant::Relational].keys().copied().collect::<Vec<_>>(),
        vec![BackendKind::Sqlite, BackendKind::Document]
    );
    assert_eq!(
        phases[&Variant::Indexed].keys().copied().collect::<Vec<_>>(),
        vec![BackendKind::Document]
    );

    for backends in phases.values() {
        for timings in backends.values() {
            assert!(timings.get(Operation::Writes) > 0.0);
            for op in Operation::ALL {
                assert!(timings.get(op).is_finite() && timings.get(op) >= 0.0);
            }
        }
    }

    assert_eq!(report.aggregation.len(), 2);
}

#[test]
fn test_operations_run_in_fixed_order() {
    let mut runner = BenchmarkRunner::new(
        small_config().without_aggregation(),
        adapters(),
        MemoryReporter::new(),
    );
    runner.run().unwrap();
    let reporter = runner.into_reporter();

    for (variant, backend) in [
        (Variant::Basic, BackendKind::Sqlite),
        (Variant::Basic, BackendKind::Document),
        (Variant::Relational, BackendKind::Sqlite),
        (Variant::Indexed, BackendKind::Document),
    ] {
        assert_eq!(reporter.operations(variant, backend), Operation::ALL.to_vec());
    }
    assert!(reporter
        .operations(Variant::Indexed, BackendKind::Sqlite)
        .is_empty());

    let phases: Vec<Variant> = reporter
        .events()
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::PhaseStarted { variant, .. } => Some(*variant),
            _ => None,
        })
        .collect();
    assert_eq!(phases, Variant::ALL.to_vec());
    assert_eq!(reporter.events().last(), Some(&ProgressEvent::RunFinished));
}

#[test]
fn test_relational_dataset_density() {
    let mut runner = BenchmarkRunner::new(
        small_config().without_aggregation(),
        adapters(),
        MemoryReporter::new(),
    );
    runner.run().unwrap();

    let relational = runner
        .reporter()
        .events()
        .iter()
        .find_map(|e| match e {
            ProgressEvent::DatasetGenerated {
                variant: Variant::Relational,
                users,
                posts,
                likes,
                like_attempts,
                ..
            } => Some((*users, *posts, *likes, *like_attempts)),
            _ => None,
        })
        .unwrap();
    assert_eq!(relational.0, 10);
    assert_eq!(relational.1, 100);
    assert_eq!(relational.3, 500);
    assert!(relational.2 <= 500);
}

#[test]
fn test_alternate_scenarios() {
    let config = small_config()
        .without_aggregation()
        .with_update(UpdateScenario::RetitleAll)
        .with_delete(DeleteScenario::Everything);
    let mut runner = BenchmarkRunner::new(config, adapters(), MemoryReporter::new());
    let report = runner.run().unwrap();
    assert_eq!(report.scales[&100].len(), 3);
}

#[test]
fn test_export_writes_nested_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config()
        .without_aggregation()
        .with_output_path(dir.path().join("results/benchmark_results.json"));
    let exporter = ResultExporter::new(&config.output_path);

    let mut runner = BenchmarkRunner::new(config, adapters(), MemoryReporter::new());
    let report = runner.run().unwrap();
    exporter.export(&report).unwrap();

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(exporter.path()).unwrap()).unwrap();
    let cell = &json["scales"]["100"]["relational"]["sqlite"];
    for key in [
        "writes",
        "simpleRead",
        "filteredRead",
        "projectedRead",
        "sortedRead",
        "update",
        "delete",
    ] {
        assert!(cell[key].as_f64().unwrap() >= 0.0, "{key}");
    }
    assert!(json["scales"]["100"]["indexed"].get("sqlite").is_none());
}

#[test]
fn test_sqlite_and_document_aggregates_agree() {
    let dataset = storerace_bench::DatasetGenerator::new().generate(Scale::Small, Variant::Relational);
    let mut sqlite = SqliteBackend::in_memory();
    let mut document = DocumentBackend::temporary();
    for backend in [
        &mut sqlite as &mut dyn BackendAdapter,
        &mut document as &mut dyn BackendAdapter,
    ] {
        backend.connect().unwrap();
        backend.write_dataset(Variant::Relational, &dataset).unwrap();
    }

    for query in AggregationQuery::ALL {
        let from_sql = sqlite.aggregate(query).unwrap();
        let from_docs = document.aggregate(query).unwrap();
        assert_eq!(from_sql.len(), from_docs.len(), "{query}");
        for (a, b) in from_sql.iter().zip(&from_docs) {
            assert_eq!(a.key, b.key, "{query}");
            assert!((a.value - b.value).abs() < 1e-9, "{query}");
        }
    }
}

fn by_id(mut posts: Vec<PostView>) -> Vec<PostView> {
    posts.sort_by_key(|p| p.id);
    posts
}

fn summary_order(rows: &[PostSummary]) -> Vec<(i64, String)> {
    rows.iter().map(|r| (r.created_at, r.title.clone())).collect()
}

fn summary_set(mut rows: Vec<PostSummary>) -> Vec<PostSummary> {
    rows.sort_by(|a, b| {
        (a.created_at, &a.title, &a.author, a.like_count)
            .cmp(&(b.created_at, &b.title, &b.author, b.like_count))
    });
    rows
}

#[test]
fn test_sqlite_and_document_variants_read_identically() {
    let dataset = storerace_bench::DatasetGenerator::new().generate(Scale::Medium, Variant::Relational);

    let mut sqlite = SqliteBackend::in_memory();
    sqlite.connect().unwrap();
    sqlite.write_dataset(Variant::Relational, &dataset).unwrap();

    let mut document = DocumentBackend::temporary();
    document.connect().unwrap();
    document.configure_indexes(Variant::Indexed).unwrap();
    document.write_dataset(Variant::Relational, &dataset).unwrap();

    let all_posts = by_id(sqlite.read_posts(Variant::Relational, false).unwrap());
    let filtered_posts = by_id(sqlite.read_posts(Variant::Relational, true).unwrap());
    let projected = summary_set(sqlite.read_summaries(Variant::Relational, false).unwrap());
    let sorted = sqlite.read_summaries(Variant::Relational, true).unwrap();
    assert_eq!(all_posts.len(), 1000);
    assert!(!filtered_posts.is_empty());

    for variant in Variant::ALL {
        assert_eq!(
            by_id(document.read_posts(variant, false).unwrap()),
            all_posts,
            "{variant} simple read"
        );
        assert_eq!(
            by_id(document.read_posts(variant, true).unwrap()),
            filtered_posts,
            "{variant} filtered read"
        );
        assert_eq!(
            summary_set(document.read_summaries(variant, false).unwrap()),
            projected,
            "{variant} projected read"
        );

        let doc_sorted = document.read_summaries(variant, true).unwrap();
        assert_eq!(summary_order(&doc_sorted), summary_order(&sorted), "{variant} sort order");
        assert_eq!(summary_set(doc_sorted), summary_set(sorted.clone()), "{variant} sorted read");
    }
}

#[test]
fn test_update_without_active_posts_is_still_timed() {
    let mut dataset = storerace_bench::DatasetGenerator::new().generate(Scale::Small, Variant::Relational);
    for post in &mut dataset.posts {
        if post.status == PostStatus::Active {
            post.status = PostStatus::Draft;
        }
    }

    let variant = Variant::Relational;
    for mut backend in adapters() {
        backend.connect().unwrap();
        backend.write_dataset(variant, &dataset).unwrap();
        let workload = Workload {
            variant,
            dataset: &dataset,
            update: UpdateScenario::PromoteActive,
            delete: DeleteScenario::ArchivedPosts,
        };

        let millis = backend.execute(Operation::Update, &workload).unwrap();
        assert!(millis.is_finite() && millis >= 0.0, "{}", backend.kind());

        let posts = backend.read_posts(variant, false).unwrap();
        assert_eq!(posts.len(), 100);
        assert!(posts.iter().all(|p| p.status != "active"), "{}", backend.kind());
    }
}

/// Wraps an adapter and reports leftover rows after every reset.
struct LeakyBackend {
    inner: SqliteBackend,
    disconnected: Rc<Cell<bool>>,
}

impl BackendAdapter for LeakyBackend {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }
    fn supports(&self, variant: Variant) -> bool {
        self.inner.supports(variant)
    }
    fn connect(&mut self) -> storerace_bench::Result<()> {
        self.inner.connect()
    }
    fn disconnect(&mut self) -> storerace_bench::Result<()> {
        self.disconnected.set(true);
        self.inner.disconnect()
    }
    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }
    fn reset_state(&mut self) -> storerace_bench::Result<()> {
        self.inner.reset_state()
    }
    fn entity_counts(&self) -> storerace_bench::Result<EntityCounts> {
        Ok(EntityCounts {
            posts: 1,
            ..Default::default()
        })
    }
    fn configure_indexes(&mut self, variant: Variant) -> storerace_bench::Result<()> {
        self.inner.configure_indexes(variant)
    }
    fn write_dataset(
        &mut self,
        variant: Variant,
        dataset: &storerace_bench::Dataset,
    ) -> storerace_bench::Result<WriteSummary> {
        self.inner.write_dataset(variant, dataset)
    }
    fn read_posts(&mut self, variant: Variant, filtered: bool) -> storerace_bench::Result<Vec<PostView>> {
        self.inner.read_posts(variant, filtered)
    }
    fn read_summaries(
        &mut self,
        variant: Variant,
        sorted: bool,
    ) -> storerace_bench::Result<Vec<PostSummary>> {
        self.inner.read_summaries(variant, sorted)
    }
    fn update_posts(&mut self, variant: Variant, scenario: UpdateScenario) -> storerace_bench::Result<u64> {
        self.inner.update_posts(variant, scenario)
    }
    fn delete_posts(&mut self, variant: Variant, scenario: DeleteScenario) -> storerace_bench::Result<u64> {
        self.inner.delete_posts(variant, scenario)
    }
    fn aggregate(&mut self, query: AggregationQuery) -> storerace_bench::Result<Vec<AggregateRow>> {
        self.inner.aggregate(query)
    }
}

#[test]
fn test_cleanup_failure_aborts_and_disconnects() {
    let disconnected = Rc::new(Cell::new(false));
    let leaky = LeakyBackend {
        inner: SqliteBackend::in_memory(),
        disconnected: Rc::clone(&disconnected),
    };
    let mut runner = BenchmarkRunner::new(small_config(), vec![Box::new(leaky)], MemoryReporter::new());

    let err = runner.run().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CleanupFailure);
    assert_eq!(runner.state(), RunState::Aborted);
    assert!(disconnected.get());

    let timed = runner
        .reporter()
        .events()
        .iter()
        .any(|e| matches!(e, ProgressEvent::OperationTimed { .. }));
    assert!(!timed);
}

#[test]
fn test_runner_is_single_use() {
    let mut runner = BenchmarkRunner::new(
        small_config().without_aggregation(),
        adapters(),
        MemoryReporter::new(),
    );
    runner.run().unwrap();
    assert!(runner.run().is_err());
}
