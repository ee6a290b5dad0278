//! Duplicate diagnostics for join columns
//!
//! This module explains row fan-out before it happens: it finds duplicate
//! key values per table, distinguishes genuine duplicates from formatting
//! inconsistencies (case/whitespace), and simulates pairwise merges to
//! localize which step of a merge sequence multiplies rows. Everything here
//! is a pure function over the registry; the real merge is never touched.

use crate::error::{Error, Result};
use crate::registry::TableRegistry;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Duplicate report for one column in one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnReport {
    /// Table identifier
    pub table: String,
    /// Column that was inspected
    pub column: String,
    /// Total rows in the table
    pub row_count: usize,
    /// Distinct values of the column
    pub distinct_count: usize,
    /// Number of surplus rows: row_count - distinct_count
    pub duplicate_count: usize,
    /// Each value occurring more than once, with its full rows
    pub duplicates: Vec<DuplicateValue>,
    /// True when trimming and case-folding values reveals extra duplicates;
    /// these need cleanup, not deduplication
    pub formatting_inconsistency: bool,
}

/// One duplicated value and every row carrying it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateValue {
    /// The duplicated value (canonical string form)
    pub value: String,
    /// All rows sharing the value
    pub rows: Vec<MatchingRow>,
}

/// A full row included in a duplicate report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingRow {
    /// 0-based row index in the source table
    pub index: usize,
    /// (column name, rendered value) pairs in column order
    pub cells: Vec<(String, String)>,
}

/// Report for one pairwise step of a simulated merge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// 0-based index of the pairwise step
    pub step_index: usize,
    /// Left side: the first table's name, then "accumulated result"
    pub left: String,
    /// Table merged in at this step
    pub right: String,
    /// Rows on the left side before the step
    pub left_rows: usize,
    /// Rows in the right table
    pub right_rows: usize,
    /// Rows after the outer join
    pub result_rows: usize,
    /// True when the result outgrew both inputs
    pub fan_out: bool,
    /// Keys responsible for the growth: present on both sides with a
    /// multiplicity above one on at least one side
    pub problem_keys: Vec<ProblemKey>,
}

/// A join-key value that multiplies rows at one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemKey {
    /// The key value (canonical string form)
    pub value: String,
    /// Occurrences on the left side
    pub left_count: usize,
    /// Occurrences in the right table
    pub right_count: usize,
}

impl ProblemKey {
    /// Rows this key alone contributes to the join result
    pub fn result_rows(&self) -> usize {
        self.left_count * self.right_count
    }
}

/// Inspect a candidate join column across every table that has it.
///
/// For each such table, every value occurring more than once is reported
/// with all of its rows, so the fan-out a join would produce is visible up
/// front. The duplicate count always equals row count minus distinct count.
pub fn diagnose_column(registry: &TableRegistry, column: &str) -> Vec<ColumnReport> {
    let mut reports = Vec::new();

    for table in registry.tables() {
        let Some(col_idx) = table.column_index(column) else {
            continue;
        };

        let mut by_value: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, row) in table.rows.iter().enumerate() {
            let value = row
                .get(col_idx)
                .map(|c| c.key_string())
                .unwrap_or_default();
            by_value.entry(value).or_default().push(i);
        }

        let distinct_count = by_value.len();
        let duplicate_count = table.row_count() - distinct_count;

        let duplicates: Vec<DuplicateValue> = by_value
            .iter()
            .filter(|(_, rows)| rows.len() > 1)
            .map(|(value, rows)| DuplicateValue {
                value: value.clone(),
                rows: rows.iter().map(|&i| full_row(table, i)).collect(),
            })
            .collect();

        // Re-count after normalization: if folding case and whitespace
        // merges values that were distinct before, the data has formatting
        // drift rather than (or on top of) genuine duplicates
        let normalized_distinct = by_value
            .keys()
            .map(|v| v.trim().to_lowercase())
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        let normalized_duplicates = table.row_count() - normalized_distinct;

        reports.push(ColumnReport {
            table: table.name.clone(),
            column: column.to_string(),
            row_count: table.row_count(),
            distinct_count,
            duplicate_count,
            duplicates,
            formatting_inconsistency: normalized_duplicates > duplicate_count,
        });
    }

    reports
}

/// Simulate merging `order`'s tables pairwise on `column`, without touching
/// the registry, and report the row count after every step.
///
/// The simulation carries only the multiset of key values, which is enough
/// to reproduce outer-join row counts exactly: a key present on both sides
/// contributes left x right rows, a one-sided key contributes its own count.
pub fn simulate_steps(
    registry: &TableRegistry,
    order: &[String],
    column: &str,
) -> Result<Vec<StepReport>> {
    let mut tables = Vec::with_capacity(order.len());
    for name in order {
        let table = registry.expect(name)?;
        if table.column_index(column).is_none() {
            return Err(Error::JoinColumnMissing {
                column: column.to_string(),
                table: name.clone(),
            });
        }
        tables.push(table);
    }

    let mut reports = Vec::new();
    let Some((first, rest)) = tables.split_first() else {
        return Ok(reports);
    };

    let mut acc_counts = key_counts(first, column);
    let mut left_label = first.name.clone();

    for (step_index, right) in rest.iter().enumerate() {
        let right_counts = key_counts(right, column);
        let left_rows: usize = acc_counts.values().sum();
        let right_rows: usize = right_counts.values().sum();

        let mut result_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut problem_keys = Vec::new();

        for (key, &left_count) in &acc_counts {
            match right_counts.get(key) {
                Some(&right_count) => {
                    result_counts.insert(key.clone(), left_count * right_count);
                    if left_count > 1 || right_count > 1 {
                        problem_keys.push(ProblemKey {
                            value: key.clone(),
                            left_count,
                            right_count,
                        });
                    }
                }
                None => {
                    result_counts.insert(key.clone(), left_count);
                }
            }
        }
        for (key, &right_count) in &right_counts {
            result_counts.entry(key.clone()).or_insert(right_count);
        }

        let result_rows: usize = result_counts.values().sum();

        reports.push(StepReport {
            step_index,
            left: left_label,
            right: right.name.clone(),
            left_rows,
            right_rows,
            result_rows,
            fan_out: result_rows > left_rows && result_rows > right_rows,
            problem_keys,
        });

        acc_counts = result_counts;
        left_label = "accumulated result".to_string();
    }

    Ok(reports)
}

fn full_row(table: &Table, index: usize) -> MatchingRow {
    let cells = table
        .columns
        .iter()
        .map(|col| {
            let value = table
                .cell(index, col.index)
                .map(|c| c.to_string_value())
                .unwrap_or_default();
            (col.name.clone(), value)
        })
        .collect();
    MatchingRow { index, cells }
}

fn key_counts(table: &Table, column: &str) -> BTreeMap<String, usize> {
    let idx = table.column_index(column).expect("caller checked column");
    let mut counts = BTreeMap::new();
    for row in &table.rows {
        let key = row.get(idx).map(|c| c.key_string()).unwrap_or_default();
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    fn registry(specs: &[(&str, &str)]) -> TableRegistry {
        let tables = specs
            .iter()
            .map(|(name, csv)| parse_csv_str(csv, name).unwrap())
            .collect();
        TableRegistry::from_tables(tables).unwrap()
    }

    #[test]
    fn test_diagnose_reports_duplicates_with_rows() {
        let registry = registry(&[(
            "a",
            "customer_id,amount\n1,100\n1,150\n2,200\n",
        )]);

        let reports = diagnose_column(&registry, "customer_id");

        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.row_count, 3);
        assert_eq!(report.distinct_count, 2);
        assert_eq!(report.duplicate_count, 1);
        assert_eq!(report.duplicates.len(), 1);

        let dup = &report.duplicates[0];
        assert_eq!(dup.value, "1");
        assert_eq!(dup.rows.len(), 2);
        assert_eq!(dup.rows[0].index, 0);
        assert_eq!(dup.rows[1].index, 1);
        assert_eq!(dup.rows[1].cells[1], ("amount".to_string(), "150".to_string()));
    }

    #[test]
    fn test_diagnose_count_identity() {
        let registry = registry(&[("a", "k,v\nx,1\nx,2\nx,3\ny,4\n")]);

        let report = &diagnose_column(&registry, "k")[0];

        assert_eq!(
            report.duplicate_count,
            report.row_count - report.distinct_count
        );
        assert_eq!(report.duplicate_count, 2);
    }

    #[test]
    fn test_diagnose_skips_tables_without_column() {
        let registry = registry(&[
            ("a", "customer_id,amount\n1,100\n"),
            ("c", "product_id,label\n1,z\n"),
        ]);

        let reports = diagnose_column(&registry, "customer_id");

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].table, "a");
    }

    #[test]
    fn test_diagnose_flags_formatting_inconsistency() {
        // "Foo" and "foo " are distinct raw but collide after normalization
        let registry = registry(&[("a", "name,v\nFoo,1\nfoo ,2\n")]);

        let report = &diagnose_column(&registry, "name")[0];

        assert_eq!(report.duplicate_count, 0);
        assert!(report.duplicates.is_empty());
        assert!(report.formatting_inconsistency);
    }

    #[test]
    fn test_diagnose_whitespace_drift_is_formatting_not_duplicate() {
        // "foo" and "foo " are distinct values, not a genuine duplicate;
        // only the normalized re-count reveals they would collide
        let registry = registry(&[("a", "name,v\nfoo,1\nfoo ,2\n")]);

        let report = &diagnose_column(&registry, "name")[0];

        assert_eq!(report.duplicate_count, 0);
        assert!(report.duplicates.is_empty());
        assert!(report.formatting_inconsistency);
    }

    #[test]
    fn test_diagnose_genuine_duplicates_not_flagged_as_formatting() {
        let registry = registry(&[("a", "name,v\nfoo,1\nfoo,2\n")]);

        let report = &diagnose_column(&registry, "name")[0];

        assert_eq!(report.duplicate_count, 1);
        assert!(!report.formatting_inconsistency);
    }

    #[test]
    fn test_simulate_clean_join_no_fan_out() {
        let registry = registry(&[
            ("a", "id,x\n1,1\n2,2\n"),
            ("b", "id,y\n1,7\n2,8\n"),
        ]);

        let reports =
            simulate_steps(&registry, &["a".to_string(), "b".to_string()], "id").unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].left, "a");
        assert_eq!(reports[0].result_rows, 2);
        assert!(!reports[0].fan_out);
        assert!(reports[0].problem_keys.is_empty());
    }

    #[test]
    fn test_simulate_localizes_fan_out_step() {
        let registry = registry(&[
            ("a", "id,x\n1,1\n2,2\n"),
            ("b", "id,y\n1,7\n2,8\n"),
            ("c", "id,z\n1,5\n1,6\n1,9\n"),
        ]);

        let order = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let reports = simulate_steps(&registry, &order, "id").unwrap();

        assert_eq!(reports.len(), 2);
        assert!(!reports[0].fan_out);

        // Second step triples key 1: 1 left x 3 right, plus key 2 unmatched
        let second = &reports[1];
        assert_eq!(second.left, "accumulated result");
        assert_eq!(second.right, "c");
        assert_eq!(second.result_rows, 4);
        assert!(second.fan_out);
        assert_eq!(second.problem_keys.len(), 1);
        assert_eq!(second.problem_keys[0].value, "1");
        assert_eq!(second.problem_keys[0].left_count, 1);
        assert_eq!(second.problem_keys[0].right_count, 3);
        assert_eq!(second.problem_keys[0].result_rows(), 3);
    }

    #[test]
    fn test_simulate_outer_join_counts_unmatched_keys() {
        let registry = registry(&[
            ("a", "id,x\n1,1\n2,2\n"),
            ("b", "id,y\n2,8\n3,9\n"),
        ]);

        let reports =
            simulate_steps(&registry, &["a".to_string(), "b".to_string()], "id").unwrap();

        // Keys 1 and 3 are one-sided but an outer join keeps them
        assert_eq!(reports[0].result_rows, 3);
        assert!(!reports[0].fan_out);
    }

    #[test]
    fn test_simulate_missing_column_fails() {
        let registry = registry(&[
            ("a", "id,x\n1,1\n"),
            ("b", "other,y\n1,2\n"),
        ]);

        let result = simulate_steps(&registry, &["a".to_string(), "b".to_string()], "id");

        assert!(matches!(
            result,
            Err(Error::JoinColumnMissing { table, .. }) if table == "b"
        ));
    }

    #[test]
    fn test_simulate_does_not_mutate_registry() {
        let registry = registry(&[
            ("a", "id,x\n1,1\n1,2\n"),
            ("b", "id,y\n1,7\n"),
        ]);

        let before = registry.get("a").unwrap().row_count();
        simulate_steps(&registry, &["a".to_string(), "b".to_string()], "id").unwrap();
        assert_eq!(registry.get("a").unwrap().row_count(), before);
    }
}
