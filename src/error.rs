use std::path::PathBuf;

use thiserror::Error;

use crate::graph::NodeHandle;

/// Reasons a graph may be rejected as ill-formed, either while building it or right before solving it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum MalformedGraph {
    /// An edge references a node handle outside `[0, node_count)`.
    #[error("edge endpoint {node} is out of range for a graph of {node_count} nodes")]
    NodeOutOfRange {
        /// The offending handle.
        node: NodeHandle,
        /// Number of nodes the graph was built with.
        node_count: usize,
    },
    /// An edge connects a node to itself.
    #[error("node {node} is connected to itself")]
    SelfLoop {
        /// The looping node.
        node: NodeHandle,
    },
    /// A node has no connections, which leaves the game ill-defined.
    #[error("node {node} has no connections")]
    DanglingNode {
        /// The isolated node.
        node: NodeHandle,
    },
}

/// Everything that can go wrong while loading plugins, generating graphs or preparing a solver run.
///
/// A solver that times out or hits its move limit is not an error; see [`SolveOutcome`](crate::SolveOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// The graph is structurally invalid.
    #[error("malformed graph: {0}")]
    MalformedGraph(#[from] MalformedGraph),

    /// The sum of node values is below the genus of the graph.
    #[error("graph is unsolvable: total value {total} is below genus {genus}")]
    UnsolvableGraph {
        /// Sum of all node values.
        total: i64,
        /// `edge_count - node_count + 1`.
        genus: i64,
    },

    /// A module was opened but lacks one of the entry points its kind requires.
    #[error("module {} does not export `{entry_point}`", path.display())]
    UnsupportedModule {
        /// Path of the module.
        path: PathBuf,
        /// Name of the first missing entry point.
        entry_point: &'static str,
    },

    /// The shared library could not be opened at all.
    #[error("failed to load module {}: {source}", path.display())]
    Load {
        /// Path of the module.
        path: PathBuf,
        /// Error reported by the platform loader.
        #[source]
        source: libloading::Error,
    },

    /// A generator returned without building a graph.
    #[error("generator `{name}` did not produce a graph")]
    NoGraphProduced {
        /// Name of the generator.
        name: String,
    },

    /// A plugin panicked; the panic was caught on the plugin's side of the boundary.
    #[error("plugin `{name}` panicked")]
    PluginPanicked {
        /// Name of the plugin.
        name: String,
    },

    /// The solver thread could not be started.
    #[error("failed to spawn solver thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Filesystem or output failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
