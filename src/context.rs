use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use tracing::warn;

use crate::error::MalformedGraph;
use crate::graph::{Edge, Graph, NodeHandle, NodeValue};
use crate::moves::Move;

/// Shape of the graphs a [`Generator`](crate::Generator) is asked for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GeneratorParams {
    /// Number of nodes.
    pub size: usize,
    /// Smallest value a node may start with.
    pub min_value: NodeValue,
    /// Largest value a node may start with.
    pub max_value: NodeValue,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self::new(10, -5, 10)
    }
}

impl GeneratorParams {
    /// Params for graphs of `size` nodes with starting values in `[min_value, max_value]`.
    pub fn new(size: usize, min_value: NodeValue, max_value: NodeValue) -> Self {
        Self { size, min_value, max_value }
    }

    /// Same value range, different size.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }
}

/// What a generator gets to work with: a slot for the graph it must build and the shared random source.
///
/// A generator is expected to call [`Self::build`] exactly once.
pub struct GeneratorContext<'a> {
    built: Option<Result<Graph, MalformedGraph>>,
    rng: &'a mut StdRng,
}

impl<'a> GeneratorContext<'a> {
    /// An empty context drawing randomness from `rng`.
    pub fn new(rng: &'a mut StdRng) -> Self {
        Self { built: None, rng }
    }

    /// The random source shared by every generation round.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }

    /// Build the graph for this round from `values` and `edges`; see [`Graph::build`].
    ///
    /// The outcome is kept in the context either way. Calling this again replaces the previous outcome.
    pub fn build<I>(&mut self, values: Vec<NodeValue>, edges: I) -> Result<&Graph, MalformedGraph>
    where
        I: IntoIterator<Item = Edge>,
    {
        if self.built.is_some() {
            warn!("generator built more than one graph in a single round; keeping the last");
        }

        match self.built.insert(Graph::build(values, edges)) {
            Ok(graph) => Ok(&*graph),
            Err(e) => Err(*e),
        }
    }

    /// The graph built so far, if [`Self::build`] succeeded.
    pub fn graph(&self) -> Option<&Graph> {
        self.built.as_ref().and_then(|built| built.as_ref().ok())
    }

    pub(crate) fn into_built(self) -> Option<Result<Graph, MalformedGraph>> {
        self.built
    }
}

/// A solver's private sandbox: its own copy of the graph, the log of moves it made and the stop signal.
///
/// Moves registered here apply immediately to the private copy and never touch the graph the run started from.
/// The solver learns when to quit only through [`Self::is_solved`], which also turns true once the run is asked to stop.
pub struct SolverContext {
    graph: Graph,
    moves: Vec<Move>,
    move_limit: usize,
    stop: Arc<AtomicBool>,
}

impl SolverContext {
    /// A context playing on a copy of `graph`, stopping once more than `move_limit` moves have been registered.
    pub fn new(graph: &Graph, move_limit: usize) -> Self {
        Self::with_stop_flag(graph, move_limit, Arc::new(AtomicBool::new(false)))
    }

    pub(crate) fn with_stop_flag(graph: &Graph, move_limit: usize, stop: Arc<AtomicBool>) -> Self {
        Self {
            graph: graph.clone(),
            moves: Vec::new(),
            move_limit,
            stop,
        }
    }

    /// Read-only view of the private graph, reflecting every move registered so far.
    #[inline]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Record `mv` and apply it to the private graph.
    ///
    /// # Panics
    /// If the move references a node out of range.
    pub fn register_move(&mut self, mv: Move) {
        self.moves.push(mv);
        self.graph.apply(mv);
    }

    /// Shorthand for registering [`Move::give`].
    pub fn give(&mut self, node: NodeHandle) {
        self.register_move(Move::give(node))
    }

    /// Shorthand for registering [`Move::take`].
    pub fn take(&mut self, node: NodeHandle) {
        self.register_move(Move::take(node))
    }

    /// Whether the solver should stop: the graph is solved, or the run was asked to stop.
    ///
    /// Exceeding the move limit raises the stop signal, so this may return `true` on a graph which is not actually solved.
    /// Check [`Graph::is_solved`] on [`Self::graph`] to tell the two apart.
    pub fn is_solved(&self) -> bool {
        if self.moves.len() > self.move_limit {
            self.stop();
        }

        self.was_stopped() || self.graph.is_solved()
    }

    #[inline]
    pub(crate) fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Whether the stop signal has been raised, by the move limit or by a supervisor.
    #[inline]
    pub fn was_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Moves registered so far, in order.
    #[inline]
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Consume the context, keeping only the move log.
    pub fn into_moves(self) -> Vec<Move> {
        self.moves
    }
}
