//! The generator and solver interfaces, shared by built-in and dynamically loaded implementations.

use std::path::Path;
use std::sync::Arc;

use crate::context::{GeneratorContext, GeneratorParams, SolverContext};
use crate::error::{Error, MalformedGraph, Result};
use crate::graph::Graph;
use crate::loader;

/// Entry points a generator module must export, in the order they are bound.
pub const GENERATOR_ENTRY_POINTS: [&str; 3] = ["GENERATOR_getName", "GENERATOR_getDescription", "GENERATOR_generate"];
/// Entry points a solver module must export, in the order they are bound.
pub const SOLVER_ENTRY_POINTS: [&str; 3] = ["SOLVER_getName", "SOLVER_getDescription", "SOLVER_solve"];

/// Signature of the function behind a generator; see [`export_generator!`](crate::export_generator).
pub type GenerateFn = fn(&mut GeneratorContext<'_>, &GeneratorParams) -> std::result::Result<(), MalformedGraph>;
/// Signature of the function behind a solver; see [`export_solver!`](crate::export_solver).
pub type SolveFn = fn(&mut SolverContext);

/// Something that populates graphs.
pub trait Generator: Send + Sync {
    /// Short unique name, used to select the generator.
    fn name(&self) -> &str;
    /// One-line human readable description.
    fn description(&self) -> &str;
    /// Build one graph into `ctx` according to `params`.
    ///
    /// Implementations call [`GeneratorContext::build`] exactly once.
    /// An `Err` means the generator itself failed; a graph that is merely unwanted is not an error.
    fn generate(&self, ctx: &mut GeneratorContext<'_>, params: &GeneratorParams) -> Result<()>;
}

/// Something that plays the game.
pub trait Solver: Send + Sync {
    /// Short unique name, used to select the solver.
    fn name(&self) -> &str;
    /// One-line human readable description.
    fn description(&self) -> &str;
    /// Make moves on `ctx` until [`SolverContext::is_solved`] returns `true`.
    ///
    /// This is the only way a solver learns it should stop; a solver which never asks cannot be stopped.
    fn solve(&self, ctx: &mut SolverContext) -> Result<()>;
}

/// A loaded extension, either kind.
#[derive(Clone)]
pub enum Plugin {
    /// A module exporting the generator entry points.
    Generator(Arc<dyn Generator>),
    /// A module exporting the solver entry points.
    Solver(Arc<dyn Solver>),
}

impl Plugin {
    /// Open the shared library at `path` and bind it as whichever kind it exports symbols for.
    ///
    /// A module exporting any generator entry point is bound as a generator, otherwise as a solver.
    /// Fails with [`Error::UnsupportedModule`] naming the first missing entry point of that kind.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        loader::load(path.as_ref())
    }

    /// Name reported by the plugin.
    pub fn name(&self) -> &str {
        match self {
            Plugin::Generator(generator) => generator.name(),
            Plugin::Solver(solver) => solver.name(),
        }
    }
}

/// A generator backed by a plain function compiled into the host.
#[derive(Copy, Clone)]
pub struct BuiltinGenerator {
    name: &'static str,
    description: &'static str,
    generate: GenerateFn,
}

impl BuiltinGenerator {
    /// Wrap `generate` under `name`.
    pub const fn new(name: &'static str, description: &'static str, generate: GenerateFn) -> Self {
        Self { name, description, generate }
    }
}

impl Generator for BuiltinGenerator {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn generate(&self, ctx: &mut GeneratorContext<'_>, params: &GeneratorParams) -> Result<()> {
        (self.generate)(ctx, params).map_err(Error::from)
    }
}

/// A solver backed by a plain function compiled into the host.
#[derive(Copy, Clone)]
pub struct BuiltinSolver {
    name: &'static str,
    description: &'static str,
    solve: SolveFn,
}

impl BuiltinSolver {
    /// Wrap `solve` under `name`.
    pub const fn new(name: &'static str, description: &'static str, solve: SolveFn) -> Self {
        Self { name, description, solve }
    }
}

impl Solver for BuiltinSolver {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn solve(&self, ctx: &mut SolverContext) -> Result<()> {
        (self.solve)(ctx);
        Ok(())
    }
}

/// Check that `graph` may be handed to a solver: no node without connections, and enough total value to cover the genus.
pub fn check_preconditions(graph: &Graph) -> Result<()> {
    if let Some(node) = graph.dangling_nodes().next() {
        return Err(MalformedGraph::DanglingNode { node }.into());
    }

    if !graph.is_solvable() {
        return Err(Error::UnsolvableGraph { total: graph.total(), genus: graph.genus() });
    }

    Ok(())
}

/// Export a generator function from a `cdylib` crate under the generator entry points.
///
/// ```ignore
/// dollargame::export_generator! {
///     name: "Circular",
///     description: "Generates a circular graph.",
///     generate: dollargame::samples::circular,
/// }
/// ```
///
/// A panic inside the function is caught before it reaches the host and reported as a failed call.
/// The plugin must be built with the same compiler and `dollargame` version as the host, as the contexts are passed by reference.
///
/// The plugin links its own copy of `dollargame` and `tracing`, with no subscriber installed.
/// Anything logged on the plugin's side, such as the warning for building twice in one round, is dropped.
#[macro_export]
macro_rules! export_generator {
    (name: $name:literal, description: $description:literal, generate: $generate:path $(,)?) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn GENERATOR_getName() -> *const ::std::os::raw::c_char {
            concat!($name, "\0").as_ptr().cast()
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn GENERATOR_getDescription() -> *const ::std::os::raw::c_char {
            concat!($description, "\0").as_ptr().cast()
        }

        #[no_mangle]
        #[allow(non_snake_case, improper_ctypes_definitions)]
        pub extern "C" fn GENERATOR_generate(
            ctx: &mut $crate::GeneratorContext<'_>,
            params: &$crate::GeneratorParams,
        ) -> bool {
            // a failed build is recorded in ctx, only unwinding needs reporting
            ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
                let _ = $generate(ctx, params);
            }))
            .is_ok()
        }
    };
}

/// Export a solver function from a `cdylib` crate under the solver entry points.
///
/// ```ignore
/// dollargame::export_solver! {
///     name: "GiveRichest",
///     description: "Finds the richest node and gives to its neighbors.",
///     solve: dollargame::samples::give_richest,
/// }
/// ```
///
/// Same caveats as [`export_generator!`](crate::export_generator).
#[macro_export]
macro_rules! export_solver {
    (name: $name:literal, description: $description:literal, solve: $solve:path $(,)?) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn SOLVER_getName() -> *const ::std::os::raw::c_char {
            concat!($name, "\0").as_ptr().cast()
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn SOLVER_getDescription() -> *const ::std::os::raw::c_char {
            concat!($description, "\0").as_ptr().cast()
        }

        #[no_mangle]
        #[allow(non_snake_case, improper_ctypes_definitions)]
        pub extern "C" fn SOLVER_solve(ctx: &mut $crate::SolverContext) -> bool {
            ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| $solve(ctx))).is_ok()
        }
    };
}
