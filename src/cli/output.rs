//! CLI output formatting

use crate::core::{ExecutionStatus, RunSummary, Step, StepState};
use crate::execution::{ExecutionEvent, PlannedStep};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::Pending => style("PENDING").dim().to_string(),
        StepState::Skipped => style("SKIPPED").dim().to_string(),
        StepState::Running { .. } => style("RUNNING").yellow().to_string(),
        StepState::Completed {
            started_at,
            completed_at,
        } => {
            let secs = (*completed_at - *started_at).num_seconds().max(0) as u64;
            format!(
                "{} {}",
                style("COMPLETED").green(),
                style(format!("({})", format_duration(secs))).dim()
            )
        }
        StepState::Failed { .. } => style("FAILED").red().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
        ExecutionStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RunStarted {
            run_id,
            project,
            run_group,
        } => format!(
            "{} Starting run {} of {} (group {})",
            ROCKET,
            style(&run_id.to_string()[..8]).dim(),
            style(project).bold(),
            style(run_group).cyan()
        ),
        ExecutionEvent::StepsResolved { steps } => {
            let ids: Vec<&str> = steps.iter().map(|s| s.id()).collect();
            if ids.is_empty() {
                format!("{} No steps selected", WARN)
            } else {
                format!("{} Steps: {}", INFO, style(ids.join(", ")).cyan())
            }
        }
        ExecutionEvent::WorkspaceAcquired { path } => {
            format!("{} Workspace {}", INFO, style(path.display()).dim())
        }
        ExecutionEvent::StepSkipped { step } => {
            format!("{} {}", SKIP, style(step).dim())
        }
        ExecutionEvent::StepStarted { step, ordinal } => format!(
            "{} {} {}",
            SPINNER,
            style(format!("[{}]", ordinal)).dim(),
            style(step).cyan()
        ),
        ExecutionEvent::StepCompleted { step } => {
            format!("{} {}", CHECK, style(step).green())
        }
        ExecutionEvent::StepFailed { step, error } => {
            format!("{} {}: {}", CROSS, style(step).red(), style(error).dim())
        }
        ExecutionEvent::RunFinished { run_id, status } => {
            let status_str = match status {
                ExecutionStatus::Completed => format!("completed {}", style("successfully").green()),
                ExecutionStatus::Failed => style("failed").red().to_string(),
                ExecutionStatus::Cancelled => style("was interrupted").yellow().to_string(),
                other => format_status(*other),
            };
            format!(
                "{} Run ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// Format the per-step table of a finished run
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut lines = vec![format!(
        "{} {} {} ({}/{} steps)",
        INFO,
        style(&summary.run_id.to_string()[..8]).dim(),
        format_status(summary.status),
        summary.completed_steps(),
        summary.selected_steps()
    )];

    for record in &summary.steps {
        lines.push(format!(
            "  {:>2}. {:<24} {}",
            record.ordinal,
            record.step.id(),
            format_step_state(&record.state)
        ));
    }

    if let Some(finished) = summary.finished_at {
        let secs = (finished - summary.started_at).num_seconds().max(0) as u64;
        lines.push(format!(
            "  Duration: {}",
            style(format_duration(secs)).dim()
        ));
    }

    lines.join("\n")
}

/// Format one planned step with its bound parameters
pub fn format_planned_step(planned: &PlannedStep) -> String {
    let mut lines = vec![format!(
        "{} {} {}{}",
        style(format!("{:>2}.", planned.ordinal)).dim(),
        style(planned.step).cyan().bold(),
        style(&planned.entry_point).dim(),
        planned
            .version
            .as_ref()
            .map(|v| format!(" @ {}", v))
            .unwrap_or_default()
    )];

    for hook in &planned.hooks {
        lines.push(format!("      {} {}", style("before:").yellow(), hook));
    }
    for (name, value) in &planned.parameters {
        lines.push(format!("      {} = {}", style(name).bold(), value));
    }
    if let Some(note) = &planned.note {
        lines.push(format!("      {} {}", WARN, style(note).yellow()));
    }

    lines.join("\n")
}

/// Format a catalog entry for the `steps` listing
pub fn format_catalog_step(step: &Step) -> String {
    let marker = if step.is_default_active {
        style("all").green().to_string()
    } else {
        style("opt-in").yellow().to_string()
    };
    let mut line = format!(
        "  {:>2}. {:<24} {:<40} [{}]",
        step.ordinal,
        step.id(),
        step.entry_point.to_string(),
        marker
    );
    if let Some(note) = &step.note {
        line.push_str(&format!("\n      {}", style(note).dim()));
    }
    line
}

pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
