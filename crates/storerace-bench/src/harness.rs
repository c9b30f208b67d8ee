//! Benchmark runner.
//!
//! For each scale the runner generates one dataset per variant, then runs
//! the basic, relational and indexed phases in order. A phase starts and
//! ends with a verified reset of every backend, and times the seven
//! operations on each backend that supports the variant. After the last
//! scale an untimed seed is followed by the timed analytic queries.

use std::collections::BTreeMap;
use std::fmt;

use crate::backends::{AggregationQuery, BackendAdapter, BackendKind, Operation, Workload};
use crate::config::BenchConfig;
use crate::error::{Error, Result};
use crate::fixtures::{Dataset, DatasetGenerator, Scale, Variant};
use crate::reporter::{ProgressEvent, Reporter};
use crate::results::{
    AggregationResults, AggregationTimings, BenchmarkReport, OperationTimings, PhaseResult,
    ResultAggregator, TestResults,
};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    DataGenerated,
    PhaseRunning(Variant),
    AggregationRunning,
    Done,
    Aborted,
}

impl RunState {
    fn can_move_to(&self, next: RunState) -> bool {
        use RunState::*;
        match (*self, next) {
            (_, Aborted) => true,
            (Idle, DataGenerated) => true,
            (DataGenerated, PhaseRunning(Variant::Basic)) => true,
            (PhaseRunning(Variant::Basic), PhaseRunning(Variant::Relational)) => true,
            (PhaseRunning(Variant::Relational), PhaseRunning(Variant::Indexed)) => true,
            (PhaseRunning(Variant::Indexed), DataGenerated | AggregationRunning | Done) => true,
            (AggregationRunning, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::DataGenerated => f.write_str("data-generated"),
            RunState::PhaseRunning(variant) => write!(f, "phase-running({variant})"),
            RunState::AggregationRunning => f.write_str("aggregation-running"),
            RunState::Done => f.write_str("done"),
            RunState::Aborted => f.write_str("aborted"),
        }
    }
}

/// Drives adapters through scales and phases.
pub struct BenchmarkRunner<R: Reporter> {
    config: BenchConfig,
    generator: DatasetGenerator,
    adapters: Vec<Box<dyn BackendAdapter>>,
    reporter: R,
    state: RunState,
}

impl<R: Reporter> BenchmarkRunner<R> {
    pub fn new(config: BenchConfig, adapters: Vec<Box<dyn BackendAdapter>>, reporter: R) -> Self {
        Self {
            config,
            generator: DatasetGenerator::new(),
            adapters,
            reporter,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Run every configured scale and the analytic pass.
    ///
    /// Connections are opened once at the start and closed once at the end,
    /// also when the run aborts.
    pub fn run(&mut self) -> Result<BenchmarkReport> {
        if self.state != RunState::Idle {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: RunState::DataGenerated.to_string(),
            });
        }
        self.config.validate()?;

        let outcome = self.connect_all().and_then(|()| self.run_all());
        let closed = self.disconnect_all();

        match outcome {
            Ok(report) => {
                closed?;
                self.reporter.report(ProgressEvent::RunFinished);
                Ok(report)
            }
            Err(e) => {
                self.state = RunState::Aborted;
                tracing::error!(error = %e, kind = ?e.kind(), "benchmark aborted");
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_move_to(next) {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(from = %self.state, to = %next, "run state");
        self.state = next;
        Ok(())
    }

    fn connect_all(&mut self) -> Result<()> {
        for adapter in &mut self.adapters {
            adapter.connect()?;
        }
        Ok(())
    }

    fn disconnect_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for adapter in &mut self.adapters {
            if let Err(e) = adapter.disconnect() {
                tracing::warn!(backend = %adapter.kind(), error = %e, "disconnect failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn run_all(&mut self) -> Result<BenchmarkReport> {
        let mut report = BenchmarkReport::new();
        for scale in self.config.scales.clone() {
            report.insert(self.run_scale(scale)?);
        }

        if let Some(scale) = self.config.aggregation_scale {
            self.transition(RunState::AggregationRunning)?;
            report.aggregation = self.run_aggregation(scale)?;
        }

        self.transition(RunState::Done)?;
        Ok(report)
    }

    /// Generate the three datasets and run the phases for one scale.
    fn run_scale(&mut self, scale: Scale) -> Result<TestResults> {
        self.reporter.report(ProgressEvent::ScaleStarted { scale });

        let mut datasets = Vec::with_capacity(Variant::ALL.len());
        for variant in Variant::ALL {
            let dataset = self.generator.generate(scale, variant);
            dataset.validate()?;
            self.reporter.report(ProgressEvent::DatasetGenerated {
                scale,
                variant,
                users: dataset.users.len(),
                posts: dataset.posts.len(),
                likes: dataset.likes.len(),
                like_attempts: dataset.like_attempts,
            });
            datasets.push(dataset);
        }
        self.transition(RunState::DataGenerated)?;

        let mut records = Vec::new();
        for dataset in &datasets {
            records.extend(self.run_phase(dataset)?);
        }
        ResultAggregator::merge(scale, records)
    }

    fn run_phase(&mut self, dataset: &Dataset) -> Result<Vec<PhaseResult>> {
        let (scale, variant) = (dataset.scale, dataset.variant);
        self.transition(RunState::PhaseRunning(variant))?;
        self.reset_verified()?;
        self.reporter
            .report(ProgressEvent::PhaseStarted { scale, variant });

        let workload = Workload {
            variant,
            dataset,
            update: self.config.update,
            delete: self.config.delete,
        };

        let mut records = Vec::new();
        for adapter in self.adapters.iter_mut() {
            if !adapter.supports(variant) {
                continue;
            }
            adapter.configure_indexes(variant)?;

            let backend = adapter.kind();
            let mut timings = OperationTimings::new();
            for operation in Operation::ALL {
                let millis = adapter.execute(operation, &workload)?;
                timings.record(operation, millis);
                self.reporter.report(ProgressEvent::OperationTimed {
                    scale,
                    variant,
                    backend,
                    operation,
                    millis,
                });
            }
            records.push(PhaseResult {
                variant,
                backend,
                operations: timings.finish()?,
            });
        }

        self.reset_verified()?;
        self.reporter
            .report(ProgressEvent::PhaseFinished { scale, variant });
        Ok(records)
    }

    /// Seed a relational dataset untimed, then time each analytic query.
    fn run_aggregation(&mut self, scale: Scale) -> Result<BTreeMap<BackendKind, AggregationResults>> {
        let dataset = self.generator.generate(scale, Variant::Relational);
        dataset.validate()?;
        self.reset_verified()?;

        let mut results = Vec::new();
        for adapter in self.adapters.iter_mut() {
            let backend = adapter.kind();
            adapter.configure_indexes(Variant::Relational)?;
            let seeded = adapter.write_dataset(Variant::Relational, &dataset)?;
            tracing::debug!(backend = %backend, posts = seeded.posts, likes = seeded.likes, "aggregation data seeded");

            let mut timings = AggregationTimings::new();
            for query in AggregationQuery::ALL {
                let millis = adapter.execute_aggregation(query)?;
                timings.record(query, millis);
                self.reporter.report(ProgressEvent::AggregationTimed {
                    backend,
                    query,
                    millis,
                });
            }
            results.push((backend, timings.finish()?));
        }

        self.reset_verified()?;
        ResultAggregator::merge_aggregation(results)
    }

    /// Reset every backend and fail if anything survived.
    fn reset_verified(&mut self) -> Result<()> {
        for adapter in self.adapters.iter_mut() {
            adapter.reset_state()?;
            let counts = adapter.entity_counts()?;
            if !counts.is_empty() {
                return Err(Error::Cleanup {
                    backend: adapter.kind().as_str(),
                    remaining: counts.to_string(),
                });
            }
        }
        Ok(())
    }
}
