//! Command-line front end: compare solvers on one generator, or benchmark one solver across generators and sizes.
//!
//! Plugins are discovered under `<plugin-dir>/generators` and `<plugin-dir>/solvers`; the plugin directory defaults to the one holding this executable.
//! The built-in samples are always available and are shadowed by plugins of the same name.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dollargame::rand::rngs::StdRng;
use dollargame::rand::SeedableRng;
use dollargame::{GeneratorParams, GraphSource, NodeValue, Registry, RetryPolicy, Solver, Supervisor, SupervisorConfig};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "dollargame")]
#[command(about = "Compare and benchmark dollar game solvers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding `generators/` and `solvers/` plugin subdirectories
    #[arg(long, global = true, value_name = "DIR")]
    plugin_dir: Option<PathBuf>,

    /// Milliseconds a solver gets per graph before it is asked to stop
    #[arg(long, global = true, default_value = "1000")]
    timeout_ms: u64,

    /// Moves a solver may make per graph
    #[arg(long, global = true, default_value = "100000000")]
    move_limit: usize,

    /// Graphs drawn per sample before the sample is skipped; 0 means no limit
    #[arg(long, global = true, default_value = "100")]
    max_attempts: usize,

    /// Smallest starting value of a node
    #[arg(long, global = true, default_value = "-5", allow_hyphen_values = true)]
    min_value: NodeValue,

    /// Largest starting value of a node
    #[arg(long, global = true, default_value = "10", allow_hyphen_values = true)]
    max_value: NodeValue,

    /// Seed for graph generation; random if omitted
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run several solvers on the same graphs and print their move counts
    Compare {
        /// Solvers to run
        #[arg(long, required = true, num_args = 1..)]
        solvers: Vec<String>,

        /// Generator producing the graphs
        #[arg(long)]
        generator: String,

        /// Number of nodes per graph
        #[arg(long)]
        graph_size: usize,

        /// Number of graphs to compare on
        #[arg(long)]
        iterations: usize,
    },
    /// Average one solver's move counts per generator and graph size, written as CSV
    Benchmark {
        /// Solver to measure
        #[arg(long)]
        solver: String,

        /// Generators producing the graphs
        #[arg(long, required = true, num_args = 1..)]
        generators: Vec<String>,

        /// Graph sizes to measure
        #[arg(long, required = true, num_args = 1..)]
        graph_sizes: Vec<usize>,

        /// Number of graphs per generator and size
        #[arg(long)]
        iterations: usize,

        /// Where to write the CSV table
        #[arg(long, default_value = "result.csv")]
        output: PathBuf,
    },
    /// List available generators and solvers
    List,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn default_plugin_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the running executable")?;
    Ok(exe.parent().map(PathBuf::from).unwrap_or_default())
}

fn find_solver(registry: &Registry, name: &str) -> Result<Arc<dyn Solver>> {
    registry.solver(name).with_context(|| format!("solver \"{}\" not found", name))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if cli.min_value > cli.max_value {
        bail!("--min-value {} is larger than --max-value {}", cli.min_value, cli.max_value);
    }

    let plugin_dir = match cli.plugin_dir.clone() {
        Some(dir) => dir,
        None => default_plugin_dir()?,
    };
    let mut registry = Registry::with_builtins();
    registry.discover(&plugin_dir)
        .with_context(|| format!("failed to scan plugin directory {}", plugin_dir.display()))?;

    let supervisor = Supervisor::new(SupervisorConfig::default()
        .with_timeout(Duration::from_millis(cli.timeout_ms))
        .with_move_limit(cli.move_limit));
    let policy = RetryPolicy::default().with_max_attempts(Some(cli.max_attempts).filter(|max| *max > 0));
    let seed = cli.seed.unwrap_or_else(rand_seed);
    let params = GeneratorParams::new(0, cli.min_value, cli.max_value);
    info!(seed, plugin_dir = %plugin_dir.display(), "starting");

    match cli.command {
        Commands::List => {
            let generators = registry.generators();
            let solvers = registry.solvers();
            let width = generators.iter().map(|g| g.name().len())
                .chain(solvers.iter().map(|s| s.name().len()))
                .max()
                .unwrap_or(0);

            println!("Available generators:");
            for generator in generators {
                println!("  {:>width$} - {}", generator.name(), generator.description(), width = width);
            }
            println!("\nAvailable solvers:");
            for solver in solvers {
                println!("  {:>width$} - {}", solver.name(), solver.description(), width = width);
            }
        }
        Commands::Compare { solvers, generator, graph_size, iterations } => {
            let generator = registry.generator(&generator)
                .with_context(|| format!("generator \"{}\" not found", generator))?;
            let solvers = solvers.iter()
                .map(|name| find_solver(&registry, name))
                .collect::<Result<Vec<_>>>()?;

            let mut source = GraphSource::seeded(generator, params.with_size(graph_size), seed);
            let comparison = dollargame::compare(&mut source, &solvers, iterations, &supervisor, policy)?;

            println!("{} nodes", graph_size);
            println!("values [{}, {}]", cli.min_value, cli.max_value);
            print!("{}", comparison);
            if comparison.skipped() > 0 {
                println!("({} of {} samples skipped)", comparison.skipped(), iterations);
            }
        }
        Commands::Benchmark { solver, generators, graph_sizes, iterations, output } => {
            let solver = find_solver(&registry, &solver)?;
            let generators = generators.iter()
                .map(|name| registry.generator(name).with_context(|| format!("generator \"{}\" not found", name)))
                .collect::<Result<Vec<_>>>()?;

            let mut rng = StdRng::seed_from_u64(seed);
            let table = dollargame::benchmark(solver, &generators, &graph_sizes, iterations, params, &mut rng, &supervisor, policy)?;

            let file = File::create(&output).with_context(|| format!("cannot create {}", output.display()))?;
            let mut writer = BufWriter::new(file);
            table.write_csv(&mut writer)
                .and_then(|_| writer.flush())
                .with_context(|| format!("cannot write {}", output.display()))?;
            println!("Wrote {}", output.display());
        }
    }

    Ok(())
}

fn rand_seed() -> u64 {
    use dollargame::rand::Rng;
    dollargame::rand::thread_rng().gen()
}
