use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::trace;

use crate::context::{GeneratorContext, GeneratorParams};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::plugin::Generator;

/// Ask `generator` for graphs until one is solvable and not already solved.
///
/// There is no cap on the number of attempts; a generator that only ever yields degenerate graphs keeps this looping.
/// Fails only when the generator breaks its contract: it errors, or returns without building a graph.
pub fn generate_graph(generator: &dyn Generator, rng: &mut StdRng, params: &GeneratorParams) -> Result<Graph> {
    let mut attempt = 0usize;
    loop {
        attempt += 1;

        let mut ctx = GeneratorContext::new(rng);
        generator.generate(&mut ctx, params)?;

        let graph = match ctx.into_built() {
            Some(built) => built?,
            None => return Err(Error::NoGraphProduced { name: generator.name().to_owned() }),
        };

        if !graph.is_solvable() {
            trace!(generator = generator.name(), attempt, total = graph.total(), genus = graph.genus(), "discarding unsolvable graph");
            continue;
        }

        if graph.is_solved() {
            trace!(generator = generator.name(), attempt, "discarding already solved graph");
            continue;
        }

        return Ok(graph);
    }
}

/// A generator bundled with its params and its own random source, handing out playable graphs on demand.
pub struct GraphSource {
    generator: Arc<dyn Generator>,
    params: GeneratorParams,
    rng: StdRng,
}

impl GraphSource {
    /// A source seeded from `seed`, so the same seed yields the same sequence of graphs.
    pub fn seeded(generator: Arc<dyn Generator>, params: GeneratorParams, seed: u64) -> Self {
        Self::with_rng(generator, params, StdRng::seed_from_u64(seed))
    }

    /// A source drawing from `rng`.
    pub fn with_rng(generator: Arc<dyn Generator>, params: GeneratorParams, rng: StdRng) -> Self {
        Self { generator, params, rng }
    }

    /// The generator being driven.
    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    /// The params every graph is generated with.
    pub fn params(&self) -> &GeneratorParams {
        &self.params
    }

    /// The next playable graph; see [`generate_graph`].
    pub fn next_graph(&mut self) -> Result<Graph> {
        generate_graph(self.generator.as_ref(), &mut self.rng, &self.params)
    }
}
