//! Simulated plans.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::planner::{ActionKind, Plan};

/// What a plan would do, built without touching disk or network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulation {
    /// One line per step, in plan order, then one per note.
    pub lines: Vec<String>,
    pub counts: BTreeMap<ActionKind, usize>,
}

impl Simulation {
    /// Describes `plan`. `notes` are changes outside the plan steps, such
    /// as catalog entries recorded for files already in place.
    pub fn of(plan: &Plan, notes: &[String]) -> Self {
        let mut lines: Vec<String> = plan
            .steps()
            .iter()
            .enumerate()
            .map(|(i, step)| match step.depends_on {
                Some(dep) => format!("[{}] {} (after {})", i, step.action, dep),
                None => format!("[{}] {}", i, step.action),
            })
            .collect();
        lines.extend(notes.iter().map(|n| format!("NOTE {}", n)));

        Self {
            lines,
            counts: plan.counts(),
        }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// "2 move, 1 download" style summary.
    pub fn summary(&self) -> String {
        if self.counts.is_empty() {
            return "no actions".to_string();
        }
        self.counts
            .iter()
            .map(|(kind, n)| format!("{} {}", n, kind))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
