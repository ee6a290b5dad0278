//! Merge planner: connectivity analysis and join-order computation

use crate::graph::ConnectionGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// The left side of a merge step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepLeft {
    /// A named table (only ever the root, on the first step)
    Table(String),
    /// The accumulated result of all previous steps
    Accumulated,
}

/// One join in the merge plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Left side of the join
    pub left: StepLeft,
    /// Table being merged in; each table appears here exactly once
    pub right: String,
    /// Columns to join on, sorted
    pub join_columns: Vec<String>,
}

/// Ordered merge plan for the root's connected component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePlan {
    /// Root table the plan starts from (None for an empty graph)
    pub root: Option<String>,
    /// Join steps in execution order
    pub steps: Vec<Step>,
    /// Tables outside the root's component, sorted; excluded from the plan
    pub isolated: Vec<String>,
}

impl MergePlan {
    /// Whether every table participates in the plan
    pub fn is_fully_connected(&self) -> bool {
        self.isolated.is_empty()
    }

    /// Identifiers of all tables the plan merges, in merge order
    pub fn merged_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        if let Some(root) = &self.root {
            names.push(root.as_str());
        }
        names.extend(self.steps.iter().map(|s| s.right.as_str()));
        names
    }
}

/// Compute a merge plan for the graph.
///
/// The root is the lexicographically smallest table of the largest connected
/// component (ties between equally sized components go to the one with the
/// smallest member). A spanning tree is selected by scanning edges in
/// lexicographic (left, right) order with a union-find, then linearized by a
/// breadth-first traversal from the root: each newly reached table becomes
/// the right side of a step, joined on that tree edge's shared columns.
///
/// Disconnection is not an error: tables outside the root's component are
/// returned in `isolated` and never silently dropped.
pub fn plan_merges(graph: &ConnectionGraph) -> MergePlan {
    if graph.nodes.is_empty() {
        return MergePlan {
            root: None,
            steps: Vec::new(),
            isolated: Vec::new(),
        };
    }

    // Sort a local edge view so the plan never depends on input ordering
    let mut edges: Vec<&crate::graph::Connection> = graph.edges.iter().collect();
    edges.sort_by(|a, b| (&a.left, &a.right).cmp(&(&b.left, &b.right)));

    // Union-find over all edges to identify components
    let index: BTreeMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();
    let mut components = UnionFind::new(graph.nodes.len());
    for edge in &edges {
        components.union(index[edge.left.as_str()], index[edge.right.as_str()]);
    }

    // Pick the largest component; ties go to the one containing the
    // lexicographically smallest node. Nodes are sorted, so the first node
    // of each component is its smallest member.
    let mut members: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for (i, node) in graph.nodes.iter().enumerate() {
        members.entry(components.find(i)).or_default().push(node);
    }
    let component = members
        .values()
        .max_by(|a, b| a.len().cmp(&b.len()).then(b[0].cmp(a[0])))
        .expect("graph has nodes");
    let root = component[0].to_string();

    // Canonical spanning tree: keep each edge that connects two previously
    // unconnected nodes, scanning in the sorted order established above
    let mut tree = UnionFind::new(graph.nodes.len());
    let mut adjacency: BTreeMap<&str, Vec<&crate::graph::Connection>> = BTreeMap::new();
    for &edge in &edges {
        if tree.union(index[edge.left.as_str()], index[edge.right.as_str()]) {
            adjacency.entry(edge.left.as_str()).or_default().push(edge);
            adjacency.entry(edge.right.as_str()).or_default().push(edge);
        }
    }

    // Linearize by BFS from the root. Neighbor lists hold edges in sorted
    // order already, so the traversal order is canonical.
    let mut steps = Vec::new();
    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    visited.insert(root.as_str());
    queue.push_back(root.as_str());

    while let Some(current) = queue.pop_front() {
        for edge in adjacency.get(current).into_iter().flatten() {
            let neighbor = edge.other(current).expect("edge touches current");
            if visited.insert(neighbor) {
                let left = if steps.is_empty() {
                    StepLeft::Table(root.clone())
                } else {
                    StepLeft::Accumulated
                };
                steps.push(Step {
                    left,
                    right: neighbor.to_string(),
                    join_columns: edge.shared_columns.clone(),
                });
                queue.push_back(neighbor);
            }
        }
    }

    let isolated: Vec<String> = graph
        .nodes
        .iter()
        .filter(|n| !visited.contains(n.as_str()))
        .cloned()
        .collect();

    MergePlan {
        root: Some(root),
        steps,
        isolated,
    }
}

/// Union-find with path compression
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Returns true if the two sets were previously disjoint
    fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        self.parent[rb] = ra;
        true
    }
}
