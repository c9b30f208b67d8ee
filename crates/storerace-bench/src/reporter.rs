//! Progress reporting.

use crate::backends::{AggregationQuery, BackendKind, Operation};
use crate::fixtures::{Scale, Variant};

/// A milestone of a benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    ScaleStarted {
        scale: Scale,
    },
    DatasetGenerated {
        scale: Scale,
        variant: Variant,
        users: usize,
        posts: usize,
        likes: usize,
        like_attempts: usize,
    },
    PhaseStarted {
        scale: Scale,
        variant: Variant,
    },
    OperationTimed {
        scale: Scale,
        variant: Variant,
        backend: BackendKind,
        operation: Operation,
        millis: f64,
    },
    PhaseFinished {
        scale: Scale,
        variant: Variant,
    },
    AggregationTimed {
        backend: BackendKind,
        query: AggregationQuery,
        millis: f64,
    },
    RunFinished,
}

/// Receives progress events from the runner.
pub trait Reporter {
    fn report(&mut self, event: ProgressEvent);
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, event: ProgressEvent) {
        (**self).report(event);
    }
}

/// Emits every event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::ScaleStarted { scale } => {
                tracing::info!(scale = scale.count(), "starting scale");
            }
            ProgressEvent::DatasetGenerated {
                scale,
                variant,
                users,
                posts,
                likes,
                like_attempts,
            } => {
                tracing::info!(
                    scale = scale.count(),
                    variant = %variant,
                    users,
                    posts,
                    likes,
                    like_attempts,
                    "dataset generated"
                );
            }
            ProgressEvent::PhaseStarted { scale, variant } => {
                tracing::info!(scale = scale.count(), variant = %variant, "phase started");
            }
            ProgressEvent::OperationTimed {
                scale,
                variant,
                backend,
                operation,
                millis,
            } => {
                tracing::info!(
                    scale = scale.count(),
                    variant = %variant,
                    backend = %backend,
                    operation = %operation,
                    millis = format_args!("{millis:.2}"),
                    "operation timed"
                );
            }
            ProgressEvent::PhaseFinished { scale, variant } => {
                tracing::info!(scale = scale.count(), variant = %variant, "phase finished");
            }
            ProgressEvent::AggregationTimed {
                backend,
                query,
                millis,
            } => {
                tracing::info!(
                    backend = %backend,
                    query = %query,
                    millis = format_args!("{millis:.2}"),
                    "aggregation timed"
                );
            }
            ProgressEvent::RunFinished => tracing::info!("benchmark complete"),
        }
    }
}

/// Keeps events in memory for inspection.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    events: Vec<ProgressEvent>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    /// Operations timed for one backend in one phase, in the order reported.
    pub fn operations(&self, variant: Variant, backend: BackendKind) -> Vec<Operation> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::OperationTimed {
                    variant: v,
                    backend: b,
                    operation,
                    ..
                } if *v == variant && *b == backend => Some(*operation),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn report(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }
}
