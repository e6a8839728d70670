//! Binding of shared-library plugins. All `unsafe` code on the host side lives here.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use tracing::debug;

use crate::context::{GeneratorContext, GeneratorParams, SolverContext};
use crate::error::{Error, Result};
use crate::plugin::{Generator, Plugin, Solver, GENERATOR_ENTRY_POINTS, SOLVER_ENTRY_POINTS};

type NameEntry = unsafe extern "C" fn() -> *const c_char;
type GenerateEntry = unsafe extern "C" fn(&mut GeneratorContext<'_>, &GeneratorParams) -> bool;
type SolveEntry = unsafe extern "C" fn(&mut SolverContext) -> bool;

/// An open shared library. Entry points copied out of it stay valid for as long as this is alive.
struct Module {
    path: PathBuf,
    library: Library,
}

impl Module {
    fn open(path: &Path) -> Result<Self> {
        // SAFETY: running a module's initializers is inherent to loading plugins; modules are trusted to be well-behaved libraries.
        let library = unsafe { Library::new(path) }.map_err(|source| Error::Load { path: path.to_path_buf(), source })?;
        Ok(Self { path: path.to_path_buf(), library })
    }

    fn exports(&self, symbol: &str) -> bool {
        // SAFETY: the symbol is only looked up, never called, and the type is irrelevant for that.
        unsafe { self.library.get::<*const ()>(symbol.as_bytes()) }.is_ok()
    }

    /// # Safety
    /// `T` must be the actual type of the exported symbol.
    unsafe fn entry<T: Copy>(&self, symbol: &'static str) -> Result<T> {
        self.library.get::<T>(symbol.as_bytes())
            .map(|sym| *sym)
            .map_err(|_| Error::UnsupportedModule { path: self.path.clone(), entry_point: symbol })
    }

    fn read_string(&self, entry: NameEntry) -> String {
        // SAFETY: the export macros return pointers to static nul-terminated strings.
        unsafe {
            let ptr = entry();
            if ptr.is_null() {
                return String::new();
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

/// A generator living in a shared library.
pub struct DynamicGenerator {
    name: String,
    description: String,
    generate: GenerateEntry,
    module: Module,
}

impl DynamicGenerator {
    /// Open `path` and bind the three generator entry points.
    ///
    /// Fails with [`Error::UnsupportedModule`] if any of them is missing; nothing is kept in that case.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind(Module::open(path.as_ref())?)
    }

    fn bind(module: Module) -> Result<Self> {
        let [name, description, generate] = GENERATOR_ENTRY_POINTS;
        // SAFETY: the types match the functions emitted by `export_generator!`.
        let (get_name, get_description, generate) = unsafe {
            (
                module.entry::<NameEntry>(name)?,
                module.entry::<NameEntry>(description)?,
                module.entry::<GenerateEntry>(generate)?,
            )
        };

        let generator = Self {
            name: module.read_string(get_name),
            description: module.read_string(get_description),
            generate,
            module,
        };
        debug!(name = %generator.name, path = %generator.module.path.display(), "bound generator module");
        Ok(generator)
    }

    /// Where the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.module.path
    }
}

impl Generator for DynamicGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn generate(&self, ctx: &mut GeneratorContext<'_>, params: &GeneratorParams) -> Result<()> {
        // SAFETY: `self.module` keeps the code alive; the entry catches its own panics.
        let completed = unsafe { (self.generate)(ctx, params) };
        if completed {
            Ok(())
        } else {
            Err(Error::PluginPanicked { name: self.name.clone() })
        }
    }
}

/// A solver living in a shared library.
pub struct DynamicSolver {
    name: String,
    description: String,
    solve: SolveEntry,
    module: Module,
}

impl DynamicSolver {
    /// Open `path` and bind the three solver entry points.
    ///
    /// Fails with [`Error::UnsupportedModule`] if any of them is missing; nothing is kept in that case.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind(Module::open(path.as_ref())?)
    }

    fn bind(module: Module) -> Result<Self> {
        let [name, description, solve] = SOLVER_ENTRY_POINTS;
        // SAFETY: the types match the functions emitted by `export_solver!`.
        let (get_name, get_description, solve) = unsafe {
            (
                module.entry::<NameEntry>(name)?,
                module.entry::<NameEntry>(description)?,
                module.entry::<SolveEntry>(solve)?,
            )
        };

        let solver = Self {
            name: module.read_string(get_name),
            description: module.read_string(get_description),
            solve,
            module,
        };
        debug!(name = %solver.name, path = %solver.module.path.display(), "bound solver module");
        Ok(solver)
    }

    /// Where the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.module.path
    }
}

impl Solver for DynamicSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn solve(&self, ctx: &mut SolverContext) -> Result<()> {
        // SAFETY: `self.module` keeps the code alive; the entry catches its own panics.
        let completed = unsafe { (self.solve)(ctx) };
        if completed {
            Ok(())
        } else {
            Err(Error::PluginPanicked { name: self.name.clone() })
        }
    }
}

pub(crate) fn load(path: &Path) -> Result<Plugin> {
    let module = Module::open(path)?;
    if GENERATOR_ENTRY_POINTS.iter().any(|symbol| module.exports(symbol)) {
        Ok(Plugin::Generator(Arc::new(DynamicGenerator::bind(module)?)))
    } else {
        Ok(Plugin::Solver(Arc::new(DynamicSolver::bind(module)?)))
    }
}
