//! merge-core: Core library for analyzing and merging related CSV tables
//!
//! This library provides functionality to:
//! - Scan directories for CSV files and load them into a registry
//! - Build a connection graph from columns shared between tables
//! - Plan a deterministic merge order over the graph's spanning tree
//! - Execute the plan as a sequence of conflict-avoiding outer joins
//! - Diagnose duplicate join keys and localize row fan-out before merging

pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod graph;
pub mod parser;
pub mod planner;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod table;

pub use diagnostics::{
    diagnose_column, simulate_steps, ColumnReport, DuplicateValue, MatchingRow, ProblemKey,
    StepReport,
};
pub use error::{Error, Result};
pub use executor::{execute_plan, DroppedColumns, MergeOutcome};
pub use graph::{build_graph, Connection, ConnectionGraph, GraphBuilder};
pub use parser::{parse_csv, parse_csv_str};
pub use planner::{plan_merges, MergePlan, Step, StepLeft};
pub use registry::TableRegistry;
pub use report::{analyze, AnalysisReport};
pub use scanner::{load_tables, scan_directory, DiscoveredFile, ScanResult};
pub use table::{CellValue, Column, Row, Table};
