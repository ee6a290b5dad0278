//! Coverage analysis report over a table registry

use crate::error::Result;
use crate::graph::{build_graph, Connection};
use crate::planner::{plan_merges, MergePlan};
use crate::registry::TableRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Snapshot of how the registry's tables relate and whether they can merge.
///
/// Computed on demand and serializable for export; never reloaded as state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// When the analysis ran
    pub generated_at: DateTime<Utc>,
    /// Number of tables analyzed
    pub table_count: usize,
    /// Distinct column names across all tables
    pub total_columns: usize,
    /// Every pairwise connection with its shared columns
    pub connections: Vec<Connection>,
    /// Shared column name -> tables carrying it on some connection
    pub shared_columns: BTreeMap<String, Vec<String>>,
    /// Tables with no path to the root's component
    pub isolated: Vec<String>,
    /// True when a single plan covers every table
    pub mergeable: bool,
    /// The computed merge plan
    pub plan: MergePlan,
}

/// Analyze the registry: build the graph, compute the plan, and summarize
/// connectivity in one serializable value.
pub fn analyze(registry: &TableRegistry) -> Result<AnalysisReport> {
    let graph = build_graph(registry)?;
    let plan = plan_merges(&graph);

    let mut all_columns: BTreeSet<&str> = BTreeSet::new();
    for table in registry.tables() {
        all_columns.extend(table.column_names());
    }

    let shared_columns = graph
        .shared_column_map()
        .into_iter()
        .map(|(col, tables)| (col, tables.into_iter().collect()))
        .collect();

    Ok(AnalysisReport {
        generated_at: Utc::now(),
        table_count: registry.len(),
        total_columns: all_columns.len(),
        connections: graph.edges,
        shared_columns,
        isolated: plan.isolated.clone(),
        mergeable: !registry.is_empty() && plan.isolated.is_empty(),
        plan,
    })
}
