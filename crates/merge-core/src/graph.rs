//! Connection graph over tables that share column names

use crate::error::{Error, Result};
use crate::registry::TableRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// An undirected edge between two tables.
///
/// `left` is always lexicographically smaller than `right`, and
/// `shared_columns` is sorted, so a graph built from the same tables is
/// identical regardless of input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Smaller table identifier
    pub left: String,
    /// Larger table identifier
    pub right: String,
    /// Column names present in both tables, sorted
    pub shared_columns: Vec<String>,
}

impl Connection {
    /// Whether this edge touches the given table
    pub fn touches(&self, name: &str) -> bool {
        self.left == name || self.right == name
    }

    /// The endpoint opposite to `name`, if this edge touches it
    pub fn other(&self, name: &str) -> Option<&str> {
        if self.left == name {
            Some(&self.right)
        } else if self.right == name {
            Some(&self.left)
        } else {
            None
        }
    }
}

/// Undirected graph of tables connected by shared columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionGraph {
    /// All table identifiers, sorted
    pub nodes: Vec<String>,
    /// Edges, sorted by (left, right)
    pub edges: Vec<Connection>,
}

impl ConnectionGraph {
    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of edges touching a table
    pub fn degree(&self, name: &str) -> usize {
        self.edges.iter().filter(|e| e.touches(name)).count()
    }

    /// Map of shared column name -> tables that carry it on some edge
    pub fn shared_column_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for edge in &self.edges {
            for col in &edge.shared_columns {
                let entry = map.entry(col.clone()).or_default();
                entry.insert(edge.left.clone());
                entry.insert(edge.right.clone());
            }
        }
        map
    }
}

/// Builder for a ConnectionGraph, with optional column exclusions
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    exclude_columns: BTreeSet<String>,
}

impl GraphBuilder {
    /// Create a builder with the default policy (no excluded columns)
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a column as non-joinable; it never forms an edge
    pub fn exclude_column(mut self, name: impl Into<String>) -> Self {
        self.exclude_columns.insert(name.into());
        self
    }

    /// Build the graph from all tables in the registry.
    ///
    /// Every unordered pair of tables is checked for a non-empty column
    /// intersection. All edges carry uniform weight: the planner optimizes
    /// for fewest merges, so no secondary cost metric is attached.
    pub fn build(&self, registry: &TableRegistry) -> Result<ConnectionGraph> {
        let mut nodes: Vec<String> = Vec::new();
        let mut column_sets: Vec<BTreeSet<&str>> = Vec::new();

        // Registry iteration is already in name order
        for table in registry.tables() {
            if table.columns.is_empty() {
                return Err(Error::MalformedTable {
                    table: table.name.clone(),
                    message: "table has no columns".to_string(),
                });
            }
            nodes.push(table.name.clone());
            column_sets.push(table.column_name_set());
        }

        let mut edges = Vec::new();
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let shared: Vec<String> = column_sets[i]
                    .intersection(&column_sets[j])
                    .filter(|c| !self.exclude_columns.contains(**c))
                    .map(|c| c.to_string())
                    .collect();

                if !shared.is_empty() {
                    edges.push(Connection {
                        left: nodes[i].clone(),
                        right: nodes[j].clone(),
                        shared_columns: shared,
                    });
                }
            }
        }

        Ok(ConnectionGraph { nodes, edges })
    }
}

/// Build a connection graph with the default policy
pub fn build_graph(registry: &TableRegistry) -> Result<ConnectionGraph> {
    GraphBuilder::new().build(registry)
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
    fn test_build_graph_single_edge() {
        let registry = registry(&[
            ("a", "customer_id,amount\n1,100\n2,200\n"),
            ("b", "customer_id,name\n1,x\n2,y\n"),
        ]);

        let graph = build_graph(&registry).unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges[0].left, "a");
        assert_eq!(graph.edges[0].right, "b");
        assert_eq!(graph.edges[0].shared_columns, vec!["customer_id"]);
    }

    #[test]
    fn test_build_graph_no_self_edges_one_edge_per_pair() {
        let registry = registry(&[
            ("a", "id,code,amount\n1,x,100\n"),
            ("b", "id,code,name\n1,x,foo\n"),
        ]);

        let graph = build_graph(&registry).unwrap();

        // Multiple shared columns collapse into one edge carrying both
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges[0].shared_columns, vec!["code", "id"]);
    }

    #[test]
    fn test_build_graph_isolated_node_has_no_edges() {
        let registry = registry(&[
            ("a", "customer_id,amount\n1,100\n"),
            ("b", "customer_id,name\n1,x\n"),
            ("c", "product_id,name2\n1,z\n"),
        ]);

        let graph = build_graph(&registry).unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.degree("c"), 0);
    }

    #[test]
    fn test_build_graph_rejects_empty_columns() {
        let mut table = crate::table::Table::new("empty", "empty.csv".into());
        table.rows = Vec::new();
        let registry = TableRegistry::from_tables(vec![table]).unwrap();

        let result = build_graph(&registry);
        assert!(matches!(
            result,
            Err(Error::MalformedTable { table, .. }) if table == "empty"
        ));
    }

    #[test]
    fn test_build_graph_requires_exact_column_name_equality() {
        // "id " and "id" are different columns; near-misses form no edge
        let registry = registry(&[
            ("a", "id ,x\n1,1\n"),
            ("b", "id,y\n1,2\n"),
        ]);

        let graph = build_graph(&registry).unwrap();

        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_build_graph_excluded_column_forms_no_edge() {
        let registry = registry(&[
            ("a", "notes,amount\n1,100\n"),
            ("b", "notes,name\n1,x\n"),
        ]);

        let graph = GraphBuilder::new()
            .exclude_column("notes")
            .build(&registry)
            .unwrap();

        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_shared_column_map() {
        let registry = registry(&[
            ("a", "id,amount\n1,100\n"),
            ("b", "id,name\n1,x\n"),
            ("c", "id,size\n1,9\n"),
        ]);

        let graph = build_graph(&registry).unwrap();
        let map = graph.shared_column_map();

        let tables: Vec<&str> = map["id"].iter().map(|s| s.as_str()).collect();
        assert_eq!(tables, vec!["a", "b", "c"]);
    }
}
