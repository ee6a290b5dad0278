//! Merge executor: applies a plan step-by-step with conflict avoidance

use crate::error::{Error, Result};
use crate::planner::MergePlan;
use crate::registry::TableRegistry;
use crate::table::{CellValue, Column, Row, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Columns dropped from the right table at one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroppedColumns {
    /// Index of the step in the plan (0-based)
    pub step_index: usize,
    /// Table the columns were dropped from
    pub table: String,
    /// Dropped column names, sorted
    pub columns: Vec<String>,
}

/// Result of executing a merge plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// The merged table
    pub result: Table,
    /// Per-step record of right-table columns dropped by the smart merge
    pub dropped_columns: Vec<DroppedColumns>,
}

/// Execute a merge plan against the registry, producing a new merged table.
///
/// Each step performs a full outer join of the accumulated result with the
/// step's right table on the step's join columns. The "smart merge" policy
/// takes from the right table only its join columns and columns whose name
/// is not already present in the result; every other right column is dropped
/// and recorded in the outcome. This trades information loss for a result
/// with no suffixed or duplicated column names.
///
/// The registry is never mutated; the result is a freshly built table.
pub fn execute_plan(plan: &MergePlan, registry: &TableRegistry) -> Result<MergeOutcome> {
    let root = match &plan.root {
        Some(root) => registry.expect(root)?,
        None => {
            return Ok(MergeOutcome {
                result: Table::new("merged", PathBuf::from("merged")),
                dropped_columns: Vec::new(),
            })
        }
    };

    let mut result = Table::new("merged", PathBuf::from("merged"));
    result.columns = root.columns.clone();
    result.rows = root.rows.clone();

    let mut dropped_columns = Vec::new();

    for (step_index, step) in plan.steps.iter().enumerate() {
        let right = registry.expect(&step.right)?;
        let dropped = merge_step(&mut result, right, &step.join_columns)?;
        dropped_columns.push(DroppedColumns {
            step_index,
            table: right.name.clone(),
            columns: dropped,
        });
    }

    Ok(MergeOutcome {
        result,
        dropped_columns,
    })
}

/// Outer-join `right` into `acc` on `join_columns`, returning dropped columns
fn merge_step(acc: &mut Table, right: &Table, join_columns: &[String]) -> Result<Vec<String>> {
    let mut acc_key_indices = Vec::with_capacity(join_columns.len());
    let mut right_key_indices = Vec::with_capacity(join_columns.len());

    for col in join_columns {
        acc_key_indices.push(acc.column_index(col).ok_or_else(|| {
            Error::JoinColumnMissing {
                column: col.clone(),
                table: "accumulated result".to_string(),
            }
        })?);
        right_key_indices.push(right.column_index(col).ok_or_else(|| {
            Error::JoinColumnMissing {
                column: col.clone(),
                table: right.name.clone(),
            }
        })?);
    }

    // Partition right columns: join columns map onto existing result columns,
    // novel columns are appended, everything else is dropped
    let mut dropped = Vec::new();
    let mut new_cols: Vec<&Column> = Vec::new();
    for col in &right.columns {
        if join_columns.contains(&col.name) {
            continue;
        }
        if acc.find_column(&col.name).is_some() {
            dropped.push(col.name.clone());
        } else {
            new_cols.push(col);
        }
    }
    dropped.sort();

    let old_width = acc.columns.len();
    for col in &new_cols {
        let index = acc.columns.len();
        acc.columns.push(Column::new(col.name.clone(), index));
    }

    // Index right rows by join key, preserving right row order per key
    let mut right_by_key: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
    for (i, row) in right.rows.iter().enumerate() {
        let key = key_of(row, &right_key_indices);
        right_by_key.entry(key).or_default().push(i);
    }

    let mut matched_right = vec![false; right.rows.len()];
    let mut rows = Vec::with_capacity(acc.rows.len());

    // Left side of the outer join: one output row per matching right row,
    // or a single Empty-padded row when nothing matches
    for acc_row in &acc.rows {
        let key = key_of(acc_row, &acc_key_indices);
        match right_by_key.get(&key) {
            Some(indices) => {
                for &ri in indices {
                    matched_right[ri] = true;
                    let mut cells = acc_row.cells.clone();
                    for col in &new_cols {
                        cells.push(
                            right.rows[ri]
                                .get(col.index)
                                .cloned()
                                .unwrap_or(CellValue::Empty),
                        );
                    }
                    rows.push(Row::new(cells));
                }
            }
            None => {
                let mut cells = acc_row.cells.clone();
                cells.resize(acc.columns.len(), CellValue::Empty);
                rows.push(Row::new(cells));
            }
        }
    }

    // Right side of the outer join: unmatched right rows, with join-column
    // and novel-column values filled in and everything else Empty
    for (ri, right_row) in right.rows.iter().enumerate() {
        if matched_right[ri] {
            continue;
        }
        let mut cells = vec![CellValue::Empty; acc.columns.len()];
        for (k, &acc_idx) in acc_key_indices.iter().enumerate() {
            cells[acc_idx] = right_row
                .get(right_key_indices[k])
                .cloned()
                .unwrap_or(CellValue::Empty);
        }
        for (n, col) in new_cols.iter().enumerate() {
            cells[old_width + n] = right_row.get(col.index).cloned().unwrap_or(CellValue::Empty);
        }
        rows.push(Row::new(cells));
    }

    acc.rows = rows;
    Ok(dropped)
}

fn key_of(row: &Row, indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .map(|&i| row.get(i).map(CellValue::key_string).unwrap_or_default())
        .collect()
}
