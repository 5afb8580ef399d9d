//! Confirmation of simulated plans.

use async_trait::async_trait;

use super::simulation::Simulation;

/// Asks whether a simulated plan should be executed.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, simulation: &Simulation) -> bool;
}

/// Answers every confirmation with a fixed value (`--yes`, tests).
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, _simulation: &Simulation) -> bool {
        self.0
    }
}
