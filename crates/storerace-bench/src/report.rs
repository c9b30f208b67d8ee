//! Console tables and the JSON results file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use comfy_table::{Cell, CellAlignment, Table};

use crate::backends::{AggregationQuery, BackendKind, Operation};
use crate::error::Result;
use crate::results::{AggregationResults, BenchmarkReport, TestResults};

fn millis_cell(value: f64) -> Cell {
    Cell::new(format!("{value:.2}")).set_alignment(CellAlignment::Right)
}

/// One row per operation, one column per `backend_variant`.
pub fn operations_table(results: &TestResults) -> Table {
    let columns = results.columns();

    let mut table = Table::new();
    let mut header = vec![Cell::new("operation (ms)")];
    header.extend(columns.iter().map(|(name, _)| Cell::new(name)));
    table.set_header(header);

    for operation in Operation::ALL {
        let mut row = vec![Cell::new(operation.as_str())];
        row.extend(
            columns
                .iter()
                .map(|(_, timings)| millis_cell(timings.get(operation))),
        );
        table.add_row(row);
    }
    table
}

/// One row per analytic query, one column per backend.
pub fn aggregation_table(results: &BTreeMap<BackendKind, AggregationResults>) -> Table {
    let mut table = Table::new();
    let mut header = vec![Cell::new("query (ms)")];
    header.extend(results.keys().map(|backend| Cell::new(backend.as_str())));
    table.set_header(header);

    for query in AggregationQuery::ALL {
        let mut row = vec![Cell::new(query.as_str())];
        row.extend(results.values().map(|timings| millis_cell(timings.get(query))));
        table.add_row(row);
    }
    table
}

/// Render every scale and the analytic pass.
pub fn render_report(report: &BenchmarkReport) -> String {
    let mut output = String::new();
    for results in report.test_results() {
        output.push_str(&format!("Scale: {} posts\n", results.scale.count()));
        output.push_str(&operations_table(&results).to_string());
        output.push_str("\n\n");
    }
    if !report.aggregation.is_empty() {
        output.push_str("Analytic queries\n");
        output.push_str(&aggregation_table(&report.aggregation).to_string());
        output.push('\n');
    }
    output
}

/// Writes reports as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct ResultExporter {
    path: PathBuf,
}

impl ResultExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the report, creating parent directories. The file is replaced
    /// atomically through a sibling temporary file.
    pub fn export(&self, report: &BenchmarkReport) -> Result<&Path> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(report)?)?;
        fs::rename(&staging, &self.path)?;

        tracing::info!(path = %self.path.display(), "results written");
        Ok(&self.path)
    }

    /// Read back a previously exported report.
    pub fn load(&self) -> Result<BenchmarkReport> {
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
