use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use tracing::{debug, error, warn};

use crate::context::SolverContext;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::moves::Move;
use crate::plugin::{check_preconditions, Solver};

/// Limits applied to every solver run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SupervisorConfig {
    /// Wall-clock time a solver gets before it is asked to stop.
    pub timeout: Duration,
    /// Number of moves after which [`SolverContext::is_solved`] starts returning `true`.
    pub move_limit: usize,
    /// How long to wait for a solver to exit once it has been asked to stop.
    /// `None` waits for as long as it takes.
    pub grace: Option<Duration>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(1000),
            move_limit: 100_000_000,
            grace: Some(Duration::from_millis(1000)),
        }
    }
}

impl SupervisorConfig {
    /// Replace the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the move limit.
    pub fn with_move_limit(mut self, move_limit: usize) -> Self {
        self.move_limit = move_limit;
        self
    }

    /// Replace the grace period.
    pub fn with_grace(mut self, grace: Option<Duration>) -> Self {
        self.grace = grace;
        self
    }
}

/// Why a run did not count as a success.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SolveFailure {
    /// The solver registered more moves than allowed.
    MoveLimit,
    /// The timeout elapsed; the solver noticed the stop signal and exited.
    TimedOut,
    /// The timeout elapsed and the solver did not exit within the grace period.
    /// Its thread was abandoned and keeps running until it polls the stop signal, if ever.
    Unresponsive,
    /// The solver panicked or reported an error.
    Crashed(String),
}

/// Result of a supervised run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SolveOutcome {
    /// The solver returned in time without being stopped.
    Solved {
        /// Every move the solver made, in order.
        moves: Vec<Move>,
    },
    /// Moves made during a failed run are discarded.
    Failed(SolveFailure),
}

impl SolveOutcome {
    /// The recorded moves of a successful run.
    pub fn moves(&self) -> Option<&[Move]> {
        match self {
            SolveOutcome::Solved { moves } => Some(moves),
            SolveOutcome::Failed(_) => None,
        }
    }

    /// Whether the run succeeded.
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveOutcome::Solved { .. })
    }
}

enum Exit {
    Returned(SolverContext),
    Crashed(String),
}

/// Runs solvers on their own thread, bounded by a [`SupervisorConfig`].
///
/// Cancellation is cooperative: a timed out solver is asked to stop through the same [`SolverContext::is_solved`] it polls anyway.
/// A solver that never polls cannot be stopped; with a finite grace period its thread is abandoned and the caller still gets control back.
#[derive(Clone, Debug, Default)]
pub struct Supervisor {
    config: SupervisorConfig,
}

impl Supervisor {
    /// A supervisor applying `config` to every run.
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    /// The limits in effect.
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Let `solver` play on a private copy of `graph`.
    ///
    /// Fails before the solver is started if the graph has a node without connections ([`Error::MalformedGraph`])
    /// or is not solvable ([`Error::UnsolvableGraph`]).
    /// Everything that happens once the solver runs, including panics, is reported through [`SolveOutcome`].
    pub fn run(&self, solver: Arc<dyn Solver>, graph: &Graph) -> Result<SolveOutcome> {
        check_preconditions(graph)?;

        let stop = Arc::new(AtomicBool::new(false));
        let ctx = SolverContext::with_stop_flag(graph, self.config.move_limit, Arc::clone(&stop));
        let (tx, rx) = bounded(1);
        let name = solver.name().to_owned();

        let started = Instant::now();
        let handle = thread::Builder::new()
            // thread names may not contain NUL
            .name(format!("solver-{}", name.replace('\0', "")))
            .spawn(move || {
                let mut ctx = ctx;
                let exit = match panic::catch_unwind(AssertUnwindSafe(|| solver.solve(&mut ctx))) {
                    Ok(Ok(())) => Exit::Returned(ctx),
                    Ok(Err(e)) => Exit::Crashed(e.to_string()),
                    Err(payload) => Exit::Crashed(panic_message(payload.as_ref())),
                };
                // the receiver is gone only if the supervisor gave up on us
                let _ = tx.send(exit);
            })
            .map_err(Error::Spawn)?;

        let outcome = match rx.recv_timeout(self.config.timeout) {
            Ok(exit) => {
                let _ = handle.join();
                match exit {
                    Exit::Returned(ctx) if ctx.moves().len() > self.config.move_limit => {
                        debug!(solver = %name, moves = ctx.moves().len(), "stopped by move limit");
                        SolveOutcome::Failed(SolveFailure::MoveLimit)
                    }
                    Exit::Returned(ctx) => {
                        if !ctx.graph().is_solved() {
                            warn!(solver = %name, "solver returned without solving the graph");
                        }
                        SolveOutcome::Solved { moves: ctx.into_moves() }
                    }
                    Exit::Crashed(message) => {
                        error!(solver = %name, reason = %message, "solver crashed");
                        SolveOutcome::Failed(SolveFailure::Crashed(message))
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(solver = %name, timeout = ?self.config.timeout, "solver timed out, requesting stop");
                stop.store(true, Ordering::SeqCst);
                match self.wait_for_exit(&rx) {
                    Some(exit) => {
                        let _ = handle.join();
                        if let Exit::Crashed(message) = exit {
                            error!(solver = %name, reason = %message, "solver crashed after being asked to stop");
                        }
                        SolveOutcome::Failed(SolveFailure::TimedOut)
                    }
                    None => {
                        error!(solver = %name, "solver ignored the stop request, abandoning its thread");
                        SolveOutcome::Failed(SolveFailure::Unresponsive)
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                SolveOutcome::Failed(SolveFailure::Crashed("solver thread exited without reporting".to_owned()))
            }
        };

        debug!(solver = %name, elapsed = ?started.elapsed(), solved = outcome.is_solved(), "run finished");
        Ok(outcome)
    }

    fn wait_for_exit(&self, rx: &Receiver<Exit>) -> Option<Exit> {
        match self.config.grace {
            Some(grace) => rx.recv_timeout(grace).ok(),
            None => rx.recv().ok(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "solver panicked".to_owned()
    }
}
