//! Simple reference generators and solvers.
//!
//! These are baselines for benchmarking, not serious strategies; [`give_richest`] and [`take_poorest`] often never finish.
//! Each one is also packaged as a loadable plugin under `plugins/`.

use std::collections::HashSet;
use std::sync::Arc;

use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use strum::VariantArray;
use unordered_pair::UnorderedPair;

use crate::context::{GeneratorContext, GeneratorParams, SolverContext};
use crate::error::MalformedGraph;
use crate::graph::{Edge, NodeHandle, NodeValue};
use crate::moves::{Move, MoveKind};
use crate::plugin::{BuiltinGenerator, BuiltinSolver, Generator, Solver};

/// Ring: node `i` is connected to `i + 1`, the last node back to the first.
pub const CIRCULAR: BuiltinGenerator = BuiltinGenerator::new("Circular", "Generates a circular graph.", circular);
/// Every node is connected to node 0.
pub const STAR: BuiltinGenerator = BuiltinGenerator::new(
    "Star",
    "Generates a graph where all nodes are connected to one common (center) node.",
    star,
);
/// Every node picks up to two new random neighbors.
pub const UNIFORM: BuiltinGenerator = BuiltinGenerator::new("Uniform", "Simple generator.", uniform);

/// Always gives from the node holding the most.
pub const GIVE_RICHEST: BuiltinSolver =
    BuiltinSolver::new("GiveRichest", "Finds the richest node and gives to its neighbors.", give_richest);
/// Always takes into the node holding the least.
pub const TAKE_POOREST: BuiltinSolver =
    BuiltinSolver::new("TakePoorest", "Finds the poorest node and takes from its neighbors.", take_poorest);
/// Random moves.
pub const BOGO: BuiltinSolver =
    BuiltinSolver::new("BogoSolver", "Performs random moves. Probably not going to solve any graph ever.", bogo);

/// Every sample generator, ready for a [`Registry`](crate::Registry).
pub fn generators() -> Vec<Arc<dyn Generator>> {
    vec![Arc::new(CIRCULAR), Arc::new(STAR), Arc::new(UNIFORM)]
}

/// Every sample solver, ready for a [`Registry`](crate::Registry).
pub fn solvers() -> Vec<Arc<dyn Solver>> {
    vec![Arc::new(GIVE_RICHEST), Arc::new(TAKE_POOREST), Arc::new(BOGO)]
}

fn random_values(ctx: &mut GeneratorContext<'_>, params: &GeneratorParams) -> Vec<NodeValue> {
    (0..params.size)
        .map(|_| ctx.rng().gen_range(params.min_value..=params.max_value))
        .collect_vec()
}

/// See [`CIRCULAR`].
pub fn circular(ctx: &mut GeneratorContext<'_>, params: &GeneratorParams) -> Result<(), MalformedGraph> {
    let values = random_values(ctx, params);
    let size = params.size as NodeHandle;

    let mut edges: Vec<Edge> = (1..size).map(|node| UnorderedPair(node - 1, node)).collect();
    // close the loop
    if size > 2 {
        edges.push(UnorderedPair(size - 1, 0));
    }

    ctx.build(values, edges).map(|_| ())
}

/// See [`STAR`].
pub fn star(ctx: &mut GeneratorContext<'_>, params: &GeneratorParams) -> Result<(), MalformedGraph> {
    let values = random_values(ctx, params);
    let edges = (1..params.size as NodeHandle).map(|node| UnorderedPair(0, node));

    ctx.build(values, edges).map(|_| ())
}

/// See [`UNIFORM`].
pub fn uniform(ctx: &mut GeneratorContext<'_>, params: &GeneratorParams) -> Result<(), MalformedGraph> {
    let values = random_values(ctx, params);
    let size = params.size as NodeHandle;

    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    let mut offsets = (1..size).collect_vec();
    for node in 0..size {
        offsets.shuffle(ctx.rng());
        // small graphs may not have two fresh partners left for this node
        let fresh = offsets.iter()
            .map(|offset| UnorderedPair(node, (node + offset) % size))
            .filter(|edge| seen.insert(*edge))
            .take(2)
            .collect_vec();
        edges.extend(fresh);
    }

    ctx.build(values, edges).map(|_| ())
}

/// See [`GIVE_RICHEST`].
pub fn give_richest(ctx: &mut SolverContext) {
    while !ctx.is_solved() {
        let Some(richest) = ctx.graph().values().iter().position_max() else { return };
        ctx.give(richest as NodeHandle);
    }
}

/// See [`TAKE_POOREST`].
pub fn take_poorest(ctx: &mut SolverContext) {
    while !ctx.is_solved() {
        let Some(poorest) = ctx.graph().values().iter().position_min() else { return };
        ctx.take(poorest as NodeHandle);
    }
}

/// See [`BOGO`].
pub fn bogo(ctx: &mut SolverContext) {
    let mut rng = rand::thread_rng();
    let size = ctx.graph().len() as NodeHandle;

    while !ctx.is_solved() {
        let node = rng.gen_range(0..size);
        let kind = *MoveKind::VARIANTS.choose(&mut rng).unwrap_or(&MoveKind::Give);
        ctx.register_move(Move { kind, node });
    }
}
