//! Drivers measuring how many moves solvers need, on graphs drawn from generators.

use std::fmt::{Display, Formatter};
use std::io::Write;
use std::sync::Arc;

use itertools::Itertools;
use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::context::GeneratorParams;
use crate::error::Result;
use crate::generation::{generate_graph, GraphSource};
use crate::graph::Graph;
use crate::plugin::{Generator, Solver};
use crate::supervisor::Supervisor;

/// How hard to try for a graph every solver of a sample can handle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Graphs drawn per sample before giving up on it. `None` keeps drawing forever.
    pub max_attempts: Option<usize>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: Some(100) }
    }
}

impl RetryPolicy {
    /// Replace the attempt cap.
    pub fn with_max_attempts(mut self, max_attempts: Option<usize>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    fn allows(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }
}

/// Draw graphs until every solver succeeds on the same one, returning each solver's move count.
/// `None` once the policy runs out of attempts.
fn sample<F>(mut next_graph: F, solvers: &[Arc<dyn Solver>], supervisor: &Supervisor, policy: RetryPolicy) -> Result<Option<Vec<usize>>>
where
    F: FnMut() -> Result<Graph>,
{
    let mut attempt = 1;
    while policy.allows(attempt) {
        let graph = next_graph()?;

        let mut counts = Vec::with_capacity(solvers.len());
        for solver in solvers {
            match supervisor.run(Arc::clone(solver), &graph) {
                Ok(outcome) => match outcome.moves() {
                    Some(moves) => counts.push(moves.len()),
                    None => {
                        debug!(solver = solver.name(), attempt, ?outcome, "solver failed, drawing another graph");
                        break;
                    }
                },
                Err(e) => {
                    warn!(solver = solver.name(), attempt, error = %e, "graph rejected, drawing another");
                    break;
                }
            }
        }

        if counts.len() == solvers.len() {
            return Ok(Some(counts));
        }
        attempt += 1;
    }

    Ok(None)
}

/// Move counts of several solvers on the same graphs.
#[derive(Clone, Debug)]
pub struct Comparison {
    solver_names: Vec<String>,
    // one row per sample, one column per solver
    samples: Array2<usize>,
    skipped: usize,
}

impl Comparison {
    /// Names of the compared solvers, in column order.
    pub fn solver_names(&self) -> &[String] {
        &self.solver_names
    }

    /// Move counts, one row per successful sample and one column per solver.
    pub fn samples(&self) -> &Array2<usize> {
        &self.samples
    }

    /// Number of samples dropped because some solver kept failing.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Mean move count per solver, or `None` if no sample succeeded.
    pub fn averages(&self) -> Option<Array1<f64>> {
        self.samples.mapv(|moves| moves as f64).mean_axis(Axis(0))
    }

    fn write_row<T: Display>(&self, f: &mut Formatter<'_>, cells: impl Iterator<Item = T>) -> std::fmt::Result {
        write!(f, "| ")?;
        for (name, cell) in self.solver_names.iter().zip(cells) {
            write!(f, "{:>width$} | ", cell, width = name.len())?;
        }
        writeln!(f)
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write_row(f, self.solver_names.iter())?;
        for row in self.samples.rows() {
            self.write_row(f, row.iter())?;
        }

        writeln!(f, "#")?;
        writeln!(f, "# AVERAGE NUM MOVES")?;
        writeln!(f, "#")?;
        self.write_row(f, self.solver_names.iter())?;
        match self.averages() {
            Some(averages) => self.write_row(f, averages.iter().map(|avg| format!("{:.2}", avg))),
            None => self.write_row(f, self.solver_names.iter().map(|_| "-")),
        }
    }
}

/// Run every solver on `iterations` graphs from `source`, each sample using one graph all of them solved.
pub fn compare(
    source: &mut GraphSource,
    solvers: &[Arc<dyn Solver>],
    iterations: usize,
    supervisor: &Supervisor,
    policy: RetryPolicy,
) -> Result<Comparison> {
    let mut samples = Array2::zeros((iterations, solvers.len()));
    let mut filled = 0;

    for iteration in 0..iterations {
        match sample(|| source.next_graph(), solvers, supervisor, policy)? {
            Some(counts) => {
                for (cell, count) in samples.row_mut(filled).iter_mut().zip(counts) {
                    *cell = count;
                }
                filled += 1;
            }
            None => warn!(iteration, generator = source.generator().name(), "no graph solved by every solver, skipping sample"),
        }
    }

    Ok(Comparison {
        solver_names: solvers.iter().map(|s| s.name().to_owned()).collect_vec(),
        samples: samples.slice(s![..filled, ..]).to_owned(),
        skipped: iterations - filled,
    })
}

/// Average move counts of one solver, one row per graph size and one column per generator.
#[derive(Clone, Debug)]
pub struct BenchmarkTable {
    generator_names: Vec<String>,
    sizes: Vec<usize>,
    averages: Array2<f64>,
}

impl BenchmarkTable {
    /// Column labels.
    pub fn generator_names(&self) -> &[String] {
        &self.generator_names
    }

    /// Row labels.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Mean move counts; `NaN` where no sample succeeded.
    pub fn averages(&self) -> &Array2<f64> {
        &self.averages
    }

    /// Write the table as `;`-separated values: a header of generator names after an empty corner cell, then one row per size.
    /// Cells without data are left empty.
    pub fn write_csv<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, ";{}", self.generator_names.iter().join(";"))?;
        for (size, row) in self.sizes.iter().zip(self.averages.rows()) {
            let cells = row.iter()
                .map(|avg| if avg.is_nan() { String::new() } else { format!("{:.2}", avg) })
                .join(";");
            writeln!(w, "{};{}", size, cells)?;
        }
        Ok(())
    }
}

/// Measure `solver` on every combination of graph size and generator, averaging over `iterations` samples each.
///
/// `params` supplies the value range; its size is replaced by each entry of `sizes`.
#[allow(clippy::too_many_arguments)]
pub fn benchmark(
    solver: Arc<dyn Solver>,
    generators: &[Arc<dyn Generator>],
    sizes: &[usize],
    iterations: usize,
    params: GeneratorParams,
    rng: &mut StdRng,
    supervisor: &Supervisor,
    policy: RetryPolicy,
) -> Result<BenchmarkTable> {
    let solvers = [solver];
    let mut averages = Array2::from_elem((sizes.len(), generators.len()), f64::NAN);

    for (row, size) in sizes.iter().enumerate() {
        let params = params.with_size(*size);
        for (column, generator) in generators.iter().enumerate() {
            let mut total = 0usize;
            let mut solved = 0usize;
            for _ in 0..iterations {
                if let Some(counts) = sample(|| generate_graph(generator.as_ref(), &mut *rng, &params), &solvers, supervisor, policy)? {
                    total += counts[0];
                    solved += 1;
                }
            }

            if solved > 0 {
                averages[[row, column]] = total as f64 / solved as f64;
            }
            debug!(generator = generator.name(), size, solved, iterations, "benchmark cell done");
        }
    }

    Ok(BenchmarkTable {
        generator_names: generators.iter().map(|g| g.name().to_owned()).collect_vec(),
        sizes: sizes.to_vec(),
        averages,
    })
}
