//! Query -> preview -> confirm -> mutate control flow.
//!
//! ```text
//! Init -> Queried -> Empty -> Done
//!                 -> AwaitingConfirmation -> Declined -> Done
//!                                         -> Confirmed -> Mutating -> Done
//! ```
//!
//! Every path ends in `Done`; nothing is retried or re-entered. The mutation
//! batch runs at most once and only after an affirmative decision.
use crate::batch::{BatchMode, BatchOperation};
use crate::confirm::Confirmer;
use crate::report::{Phase, Reporter, WorkflowSummary};
use anyhow::{Context, Result};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Init,
    Queried,
    Empty,
    AwaitingConfirmation,
    Declined,
    Confirmed,
    Mutating,
    Done,
}

impl WorkflowState {
    fn can_advance_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        matches!(
            (self, next),
            (Init, Queried)
                | (Queried, Empty)
                | (Queried, AwaitingConfirmation)
                | (AwaitingConfirmation, Declined)
                | (AwaitingConfirmation, Confirmed)
                | (Confirmed, Mutating)
                | (Empty, Done)
                | (Declined, Done)
                | (Mutating, Done)
        )
    }
}

/// Result of one run.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub summary: WorkflowSummary,
    /// Set only when the mutation changed at least one login.
    pub org_id: Option<String>,
    /// Every state visited, starting with `Init` and ending with `Done`.
    pub states: Vec<WorkflowState>,
}

struct StateTrail {
    states: Vec<WorkflowState>,
}

impl StateTrail {
    fn new() -> Self {
        Self {
            states: vec![WorkflowState::Init],
        }
    }

    fn advance(&mut self, next: WorkflowState) {
        let current = self.current();
        debug_assert!(
            current.can_advance_to(next),
            "illegal workflow transition {current:?} -> {next:?}"
        );
        tracing::debug!(from = ?current, to = ?next, "workflow transition");
        self.states.push(next);
    }

    fn current(&self) -> WorkflowState {
        self.states
            .last()
            .copied()
            .unwrap_or(WorkflowState::Init)
    }
}

/// Drive one freeze/unfreeze run to completion.
///
/// Human-readable progress goes to `out`; the returned outcome carries the
/// structured summary.
pub fn run_workflow(
    batch: &BatchOperation<'_>,
    confirmer: &mut dyn Confirmer,
    out: &mut dyn Write,
) -> Result<WorkflowOutcome> {
    let action = batch.action();
    let reporter = Reporter::new(action, batch.filter());
    let mut trail = StateTrail::new();

    let preview = batch.run(BatchMode::Preview)?;
    trail.advance(WorkflowState::Queried);

    if preview.is_empty() {
        trail.advance(WorkflowState::Empty);
        let summary = reporter.report(preview, Phase::Empty);
        emit(out, &summary.message)?;
        trail.advance(WorkflowState::Done);
        return Ok(finish(summary, None, trail));
    }

    let preview_summary = reporter.report(preview, Phase::Preview);
    emit(out, &preview_summary.message)?;
    trail.advance(WorkflowState::AwaitingConfirmation);

    let prompt = format!(
        "Are you sure you want to {} this list of records in {}?",
        action.verb(),
        batch.identity().target_org()
    );
    if !confirmer.confirm(&prompt, true)? {
        trail.advance(WorkflowState::Declined);
        let summary = reporter.report(Vec::new(), Phase::Declined);
        emit(out, &summary.message)?;
        trail.advance(WorkflowState::Done);
        return Ok(finish(summary, None, trail));
    }
    trail.advance(WorkflowState::Confirmed);

    trail.advance(WorkflowState::Mutating);
    let updated = batch.run(BatchMode::Mutate)?;
    let summary = reporter.report(updated, Phase::Final);
    emit(out, &summary.message)?;

    let org_id = if summary.changed_anything() {
        match batch.executor().org_id(batch.identity()) {
            Ok(org_id) => Some(org_id),
            Err(err) => {
                tracing::warn!(error = %err, "could not resolve org id");
                None
            }
        }
    } else {
        None
    };
    trail.advance(WorkflowState::Done);
    Ok(finish(summary, org_id, trail))
}

fn finish(summary: WorkflowSummary, org_id: Option<String>, trail: StateTrail) -> WorkflowOutcome {
    tracing::info!(
        phase = ?summary.phase,
        records = summary.records.len(),
        updated = summary.updated_count,
        "workflow done"
    );
    WorkflowOutcome {
        summary,
        org_id,
        states: trail.states,
    }
}

fn emit(out: &mut dyn Write, message: &str) -> Result<()> {
    writeln!(out, "{message}").context("write workflow output")
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
