use std::fmt::{Display, Formatter};

use itertools::Itertools;
use petgraph::graphmap::UnGraphMap;
use unordered_pair::UnorderedPair;

use crate::error::MalformedGraph;
use crate::moves::{Move, MoveKind};

/// Dense index of a node, valid in `[0, graph.len())`.
pub type NodeHandle = u32;
/// Amount held by a node; negative values are debt.
pub type NodeValue = i32;
/// An undirected connection between two distinct nodes.
pub type Edge = UnorderedPair<NodeHandle>;

/// A chip-firing graph: per-node values over a fixed undirected, simple topology.
///
/// The topology is decided once by [`Graph::build`]; afterwards only the values change, through [`Graph::give`] and [`Graph::take`].
/// Both preserve the sum of all values.
///
/// Cloning yields a fully independent graph; nothing is shared with the source.
#[derive(Clone, Debug)]
pub struct Graph {
    values: Vec<NodeValue>,
    // every handle in 0..values.len() is present as a node, connected or not
    topology: UnGraphMap<NodeHandle, ()>,
}

impl Graph {
    /// Build a graph with one node per entry of `values`, connected by `edges`.
    ///
    /// Duplicate edges collapse into one. Each node lists its neighbors in the order the edges touching it were first seen.
    ///
    /// Fails with [`MalformedGraph::NodeOutOfRange`] if an edge references a node past the end of `values`,
    /// or with [`MalformedGraph::SelfLoop`] if an edge connects a node to itself.
    /// Nodes without any edge are accepted here; they are rejected later, right before solving.
    pub fn build<I>(values: Vec<NodeValue>, edges: I) -> Result<Self, MalformedGraph>
    where
        I: IntoIterator<Item = Edge>,
    {
        let node_count = values.len();
        let edges = edges.into_iter();

        let mut topology = UnGraphMap::with_capacity(node_count, edges.size_hint().0);
        for node in 0..node_count {
            topology.add_node(node as NodeHandle);
        }

        for UnorderedPair(a, b) in edges {
            for node in [a, b] {
                if node as usize >= node_count {
                    return Err(MalformedGraph::NodeOutOfRange { node, node_count });
                }
            }

            if a == b {
                return Err(MalformedGraph::SelfLoop { node: a });
            }

            topology.add_edge(a, b, ());
        }

        Ok(Self { values, topology })
    }

    #[inline]
    fn check_handle(&self, node: NodeHandle) {
        assert!((node as usize) < self.values.len(), "node {} out of range for a graph of {} nodes", node, self.values.len());
    }

    /// `node` pays one unit to each of its neighbors, losing its degree in value.
    ///
    /// # Panics
    /// If `node` is out of range.
    pub fn give(&mut self, node: NodeHandle) {
        self.check_handle(node);
        let mut degree = 0;
        for neighbor in self.topology.neighbors(node) {
            self.values[neighbor as usize] += 1;
            degree += 1;
        }
        self.values[node as usize] -= degree;
    }

    /// `node` collects one unit from each of its neighbors, gaining its degree in value. The exact inverse of [`Self::give`].
    ///
    /// # Panics
    /// If `node` is out of range.
    pub fn take(&mut self, node: NodeHandle) {
        self.check_handle(node);
        let mut degree = 0;
        for neighbor in self.topology.neighbors(node) {
            self.values[neighbor as usize] -= 1;
            degree += 1;
        }
        self.values[node as usize] += degree;
    }

    /// Dispatch `mv` to [`Self::give`] or [`Self::take`].
    pub fn apply(&mut self, mv: Move) {
        match mv.kind {
            MoveKind::Give => self.give(mv.node),
            MoveKind::Take => self.take(mv.node),
        }
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the graph has no nodes at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of distinct edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.topology.edge_count()
    }

    /// All node values, indexed by [`NodeHandle`].
    #[inline]
    pub fn values(&self) -> &[NodeValue] {
        &self.values
    }

    /// Value held by `node`.
    ///
    /// # Panics
    /// If `node` is out of range.
    #[inline]
    pub fn value(&self, node: NodeHandle) -> NodeValue {
        self.values[node as usize]
    }

    /// Neighbors of `node`, in edge insertion order.
    pub fn neighbors(&self, node: NodeHandle) -> impl Iterator<Item = NodeHandle> + '_ {
        self.topology.neighbors(node)
    }

    /// Number of neighbors of `node`.
    pub fn degree(&self, node: NodeHandle) -> usize {
        self.topology.neighbors(node).count()
    }

    /// Nodes with no connection at all, in handle order.
    pub fn dangling_nodes(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        (0..self.len() as NodeHandle).filter(|node| self.topology.neighbors(*node).next().is_none())
    }

    /// Sum of all node values. Invariant under every move.
    pub fn total(&self) -> i64 {
        self.values.iter().map(|v| *v as i64).sum()
    }

    /// `edge_count - node_count + 1`, the first Betti number of a connected graph.
    pub fn genus(&self) -> i64 {
        self.edge_count() as i64 - self.len() as i64 + 1
    }

    /// Whether the total value reaches the genus.
    ///
    /// This is a necessary condition for a winning sequence of moves to exist; it does not promise one of bounded length.
    /// Connectivity is assumed, not checked.
    pub fn is_solvable(&self) -> bool {
        self.total() >= self.genus()
    }

    /// Whether every node is out of debt.
    pub fn is_solved(&self) -> bool {
        self.values.iter().all(|v| *v >= 0)
    }
}

impl Display for Graph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (node, value) in self.values.iter().enumerate() {
            writeln!(f, "{}: {} -> [{}]", node, value, self.neighbors(node as NodeHandle).join(", "))?;
        }
        Ok(())
    }
}
