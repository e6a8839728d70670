//! Name-indexed collections of generators and solvers, filled from the built-in samples and plugin directories.

use std::env::consts::DLL_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::loader::{DynamicGenerator, DynamicSolver};
use crate::plugin::{Generator, Plugin, Solver};
use crate::samples;

/// Subdirectory of a plugin directory holding generator modules.
pub const GENERATORS_DIR: &str = "generators";
/// Subdirectory of a plugin directory holding solver modules.
pub const SOLVERS_DIR: &str = "solvers";

/// Known generators and solvers, looked up by name.
///
/// When two entries share a name, the one registered last wins.
#[derive(Clone, Default)]
pub struct Registry {
    generators: Vec<Arc<dyn Generator>>,
    solvers: Vec<Arc<dyn Solver>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the in-process [`samples`].
    pub fn with_builtins() -> Self {
        Self {
            generators: samples::generators(),
            solvers: samples::solvers(),
        }
    }

    /// Register a generator.
    pub fn add_generator(&mut self, generator: Arc<dyn Generator>) -> &mut Self {
        self.generators.push(generator);
        self
    }

    /// Register a solver.
    pub fn add_solver(&mut self, solver: Arc<dyn Solver>) -> &mut Self {
        self.solvers.push(solver);
        self
    }

    /// Register a plugin under whichever kind it is.
    pub fn add(&mut self, plugin: Plugin) -> &mut Self {
        match plugin {
            Plugin::Generator(generator) => self.add_generator(generator),
            Plugin::Solver(solver) => self.add_solver(solver),
        }
    }

    /// Load every module in `dir/generators` and `dir/solvers`, returning how many were registered.
    ///
    /// Only files with the platform's shared library extension are considered.
    /// A module that fails to load is logged and skipped; a missing subdirectory is not an error.
    pub fn discover(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut loaded = 0;

        for path in module_files(&dir.join(GENERATORS_DIR))? {
            match DynamicGenerator::load(&path) {
                Ok(generator) => {
                    self.add_generator(Arc::new(generator));
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping generator module"),
            }
        }

        for path in module_files(&dir.join(SOLVERS_DIR))? {
            match DynamicSolver::load(&path) {
                Ok(solver) => {
                    self.add_solver(Arc::new(solver));
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping solver module"),
            }
        }

        info!(dir = %dir.display(), loaded, "plugin discovery finished");
        Ok(loaded)
    }

    /// The generator registered last under `name`.
    pub fn generator(&self, name: &str) -> Option<Arc<dyn Generator>> {
        self.generators.iter().rev().find(|g| g.name() == name).cloned()
    }

    /// The solver registered last under `name`.
    pub fn solver(&self, name: &str) -> Option<Arc<dyn Solver>> {
        self.solvers.iter().rev().find(|s| s.name() == name).cloned()
    }

    /// Every reachable generator, one per name, in registration order.
    pub fn generators(&self) -> Vec<Arc<dyn Generator>> {
        self.generators.iter()
            .map(|g| g.name())
            .unique()
            .filter_map(|name| self.generator(name))
            .collect_vec()
    }

    /// Every reachable solver, one per name, in registration order.
    pub fn solvers(&self) -> Vec<Arc<dyn Solver>> {
        self.solvers.iter()
            .map(|s| s.name())
            .unique()
            .filter_map(|name| self.solver(name))
            .collect_vec()
    }
}

fn module_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "no plugin directory");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == DLL_EXTENSION) {
            files.push(path);
        }
    }
    // directory order is unspecified
    files.sort();
    Ok(files)
}
