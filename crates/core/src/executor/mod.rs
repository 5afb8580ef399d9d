//! Dry-run executor.
//!
//! Every mutating operation hands its [`Plan`](crate::planner::Plan) to a
//! [`DryRunExecutor`]. With dry-run on, the plan is simulated, shown to a
//! [`Confirmer`] and only executed after a yes:
//!
//! ```text
//! Idle -> Simulated -> AwaitingConfirmation -> Executed
//!                                           \-> Aborted
//! Idle -> Executed                  (dry-run off)
//! ```
//!
//! Execution is best-effort: a failed step is reported to the observer and
//! the remaining steps still run, except those depending on it.

mod apply;
mod confirm;
mod error;
mod runner;
mod simulation;
mod state;

pub use apply::{ActionApplier, AppliedStep};
pub use confirm::{AutoConfirm, Confirmer};
pub use error::{ActionError, ExecutorError};
pub use runner::{
    AssetSettings, DryRunExecutor, ExecutionContext, ExecutionObserver, ExecutionOutcome,
    ExecutionReport, NoopObserver,
};
pub use simulation::Simulation;
pub use state::ExecutorState;
