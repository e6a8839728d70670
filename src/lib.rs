#![warn(missing_docs)]

//! # `dollargame`
//!
//! An engine for the [chip-firing game](https://en.wikipedia.org/wiki/Chip-firing_game), also known as the dollar game,
//! with pluggable graph generators and solvers.
//!
//! Every node of an undirected graph holds some value, possibly negative (debt).
//! A node may *give*, paying one unit to each of its neighbors, or *take*, collecting one unit from each of them.
//! The game is won once no node is in debt.
//!
//! Start from a [`Graph`], built directly with [`Graph::build`] or by a [`Generator`] through [`generate_graph`].
//! Hand it to a [`Supervisor`] together with a [`Solver`] to obtain a [`SolveOutcome`].
//!
//! # Plugins
//! Generators and solvers implement the [`Generator`] and [`Solver`] traits.
//! They may be compiled into the host, like the [`samples`], or built as separate `cdylib` crates exposing a fixed set of entry points
//! through [`export_generator!`] and [`export_solver!`], then loaded at runtime with [`Plugin::load`] or [`Registry::discover`].
//!
//! # Supervision
//! Solvers are untrusted: they may never finish.
//! The [`Supervisor`] runs each one on its own thread, on a private copy of the graph, bounded by a move limit and a timeout.
//! Stopping is cooperative; a solver is told to stop through the same [`SolverContext::is_solved`] it polls to detect a win.
//! A solver which never polls cannot be stopped, only abandoned.
//!
//! # Solvability
//! A graph is considered playable if the sum of its values is at least its genus, `edges - nodes + 1`.
//! This is a necessary condition for a winning sequence to exist, and the one the engine checks before starting any solver.

pub use bench::{benchmark, compare, BenchmarkTable, Comparison, RetryPolicy};
pub use context::{GeneratorContext, GeneratorParams, SolverContext};
pub use error::{Error, MalformedGraph, Result};
pub use generation::{generate_graph, GraphSource};
pub use graph::{Edge, Graph, NodeHandle, NodeValue};
pub use loader::{DynamicGenerator, DynamicSolver};
pub use moves::{Move, MoveKind};
pub use plugin::{check_preconditions, BuiltinGenerator, BuiltinSolver, Generator, Plugin, Solver};
pub use registry::Registry;
pub use supervisor::{SolveFailure, SolveOutcome, Supervisor, SupervisorConfig};

pub use rand;
pub use unordered_pair::UnorderedPair;

pub mod bench;
pub(crate) mod context;
pub(crate) mod error;
pub(crate) mod generation;
pub(crate) mod graph;
pub(crate) mod loader;
pub(crate) mod moves;
pub mod plugin;
pub mod registry;
pub mod samples;
pub(crate) mod supervisor;
mod tests;
