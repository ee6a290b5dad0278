//! CSV Merge Analyzer CLI
//!
//! Command-line tool for discovering related CSV files, planning and
//! executing merges, and diagnosing duplicate join keys.

use clap::{Parser, Subcommand};
use merge_core::{
    analyze, build_graph, diagnose_column, execute_plan, load_tables, plan_merges, scan_directory,
    simulate_steps, StepLeft, Table,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "merge-cli")]
#[command(about = "Graph-based CSV merge analyzer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories for CSV files
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,
    },

    /// Analyze connections between tables and show whether they can merge
    Analyze {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Write the full report as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Show the computed merge plan
    Plan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,
    },

    /// Execute the merge plan and write the merged table
    Merge {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: String,
    },

    /// Report duplicate values of a join column across all tables
    Diagnose {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Join column to inspect
        #[arg(short, long)]
        column: String,
    },

    /// Simulate merging tables pairwise to localize row fan-out
    Simulate {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Join column to simulate on
        #[arg(short, long)]
        column: String,

        /// Merge order (comma-separated table names); defaults to every
        /// table containing the column, in name order
        #[arg(long)]
        order: Option<String>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> merge_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { root } => cmd_scan(&root),
        Commands::Analyze { root, json } => cmd_analyze(&root, json.as_deref()),
        Commands::Plan { root } => cmd_plan(&root),
        Commands::Merge {
            root,
            output,
            format,
        } => cmd_merge(&root, &output, &format),
        Commands::Diagnose { root, column } => cmd_diagnose(&root, &column),
        Commands::Simulate {
            root,
            column,
            order,
        } => cmd_simulate(&root, &column, order.as_deref()),
    }
}

fn cmd_scan(roots: &[PathBuf]) -> merge_core::Result<()> {
    let scan = scan_directory(roots)?;

    println!("Scanned {} root(s):", scan.roots.len());
    for root in &scan.roots {
        println!("  {}", root.display());
    }
    println!();
    println!("Found {} CSV files:", scan.file_count());

    for file in &scan.files {
        let table = merge_core::parse_csv(&file.path)?;
        println!(
            "  {} ({} columns, {} rows) - {}",
            table.name,
            table.column_count(),
            table.row_count(),
            file.path.display()
        );
    }

    Ok(())
}

fn cmd_analyze(roots: &[PathBuf], json: Option<&Path>) -> merge_core::Result<()> {
    let registry = load_tables(roots)?;
    let report = analyze(&registry)?;

    println!("Tables: {}", report.table_count);
    println!("Distinct columns: {}", report.total_columns);
    println!("Connections: {}", report.connections.len());
    println!();

    if !report.connections.is_empty() {
        println!("Connections found:");
        for conn in &report.connections {
            println!(
                "  {} <-> {} via: {}",
                conn.left,
                conn.right,
                conn.shared_columns.join(", ")
            );
        }
        println!();
    }

    if !report.shared_columns.is_empty() {
        println!("Shared columns:");
        for (col, tables) in &report.shared_columns {
            println!("  {} ({})", col, tables.join(", "));
        }
        println!();
    }

    if !report.isolated.is_empty() {
        println!("Isolated tables (no shared columns): {}", report.isolated.join(", "));
    }
    println!("Can merge all tables: {}", report.mergeable);

    if let Some(path) = json {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        println!();
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn cmd_plan(roots: &[PathBuf]) -> merge_core::Result<()> {
    let registry = load_tables(roots)?;
    let graph = build_graph(&registry)?;
    let plan = plan_merges(&graph);

    match &plan.root {
        Some(root) => println!("Root table: {}", root),
        None => {
            println!("No tables found.");
            return Ok(());
        }
    }

    println!();
    if plan.steps.is_empty() {
        println!("Nothing to merge (single table).");
    } else {
        println!("Merge plan ({} steps):", plan.steps.len());
        for (i, step) in plan.steps.iter().enumerate() {
            let left = match &step.left {
                StepLeft::Table(name) => name.as_str(),
                StepLeft::Accumulated => "result",
            };
            println!(
                "  {}. {} + {} on: {}",
                i + 1,
                left,
                step.right,
                step.join_columns.join(", ")
            );
        }
    }

    if !plan.isolated.is_empty() {
        println!();
        println!("Excluded (isolated): {}", plan.isolated.join(", "));
    }

    Ok(())
}

fn cmd_merge(roots: &[PathBuf], output: &Path, format: &str) -> merge_core::Result<()> {
    let registry = load_tables(roots)?;
    let graph = build_graph(&registry)?;
    let plan = plan_merges(&graph);

    if plan.root.is_none() {
        println!("No tables found, nothing to merge.");
        return Ok(());
    }

    if !plan.isolated.is_empty() {
        println!(
            "Warning: {} isolated table(s) excluded from the merge: {}",
            plan.isolated.len(),
            plan.isolated.join(", ")
        );
    }

    let outcome = execute_plan(&plan, &registry)?;

    for dropped in &outcome.dropped_columns {
        if !dropped.columns.is_empty() {
            println!(
                "Step {}: dropped {} conflicting column(s) from '{}': {}",
                dropped.step_index + 1,
                dropped.columns.len(),
                dropped.table,
                dropped.columns.join(", ")
            );
        }
    }

    let result = &outcome.result;
    if result.row_count() == 0 {
        println!("Note: merged result is empty.");
    }

    write_table(result, output, format)?;

    println!(
        "Merged {} table(s) into {} ({} rows x {} columns)",
        plan.merged_tables().len(),
        output.display(),
        result.row_count(),
        result.column_count()
    );

    Ok(())
}

fn cmd_diagnose(roots: &[PathBuf], column: &str) -> merge_core::Result<()> {
    let registry = load_tables(roots)?;
    let reports = diagnose_column(&registry, column);

    if reports.is_empty() {
        println!("No table contains column '{}'.", column);
        return Ok(());
    }

    println!("Checking column '{}':", column);
    println!();

    for report in &reports {
        if report.duplicate_count == 0 {
            println!("  {}: no duplicates ({} rows)", report.table, report.row_count);
        } else {
            println!(
                "  {}: {} duplicate(s) ({} rows, {} distinct values)",
                report.table, report.duplicate_count, report.row_count, report.distinct_count
            );
            for dup in &report.duplicates {
                println!("    value '{}' in {} rows:", dup.value, dup.rows.len());
                for row in &dup.rows {
                    let rendered: Vec<String> = row
                        .cells
                        .iter()
                        .map(|(name, value)| format!("{}={}", name, value))
                        .collect();
                    println!("      row {}: {}", row.index, rendered.join(", "));
                }
            }
        }

        if report.formatting_inconsistency {
            println!(
                "    warning: case/whitespace differences found in '{}' - normalize before merging",
                report.table
            );
        }
    }

    Ok(())
}

fn cmd_simulate(roots: &[PathBuf], column: &str, order: Option<&str>) -> merge_core::Result<()> {
    let registry = load_tables(roots)?;

    let order: Vec<String> = match order {
        Some(spec) => spec.split(',').map(|s| s.trim().to_string()).collect(),
        None => registry
            .tables()
            .filter(|t| t.find_column(column).is_some())
            .map(|t| t.name.clone())
            .collect(),
    };

    if order.len() < 2 {
        println!("Need at least two tables with column '{}' to simulate.", column);
        return Ok(());
    }

    let reports = simulate_steps(&registry, &order, column)?;

    println!("Step-by-step merge simulation on '{}':", column);
    println!();

    for report in &reports {
        println!(
            "  Step {}: {} ({} rows) + {} ({} rows) -> {} rows",
            report.step_index + 1,
            report.left,
            report.left_rows,
            report.right,
            report.right_rows,
            report.result_rows
        );

        if report.fan_out {
            println!("    warning: result outgrew both inputs (duplicate join keys)");
        }
        for key in &report.problem_keys {
            println!(
                "    value '{}': {} x {} = {} result rows",
                key.value,
                key.left_count,
                key.right_count,
                key.result_rows()
            );
        }
    }

    Ok(())
}

fn write_table(table: &Table, output: &Path, format: &str) -> merge_core::Result<()> {
    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);

    match format.to_lowercase().as_str() {
        "csv" => {
            let header: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
            writeln!(writer, "{}", header.join(","))?;

            for row in &table.rows {
                let values: Vec<String> = row
                    .cells
                    .iter()
                    .map(|c| escape_csv(&c.to_string_value()))
                    .collect();
                writeln!(writer, "{}", values.join(","))?;
            }
        }
        "json" => {
            let json = serde_json::to_string_pretty(table)?;
            writeln!(writer, "{}", json)?;
        }
        _ => {
            eprintln!("Unknown format: {}. Supported formats: csv, json", format);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Escape a value for CSV output
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
