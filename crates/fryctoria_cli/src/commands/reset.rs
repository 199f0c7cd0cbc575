//! Reset command implementation.

use super::{CliError, CliResult, StateDir};
use tracing::info;

/// What a reset removes.
#[derive(Debug, PartialEq, Eq)]
pub struct ResetPlan {
    /// Pending jobs that would be dropped.
    pub jobs: usize,
    /// Id mappings that would be dropped.
    pub mappings: usize,
    /// Shadowed types that would be emptied.
    pub shadow_types: Vec<String>,
}

/// Discards pending jobs, id mappings and shadow records.
///
/// Unreplayed local writes are lost, so `confirmed` must be set unless
/// this is a dry run.
pub async fn execute(state: &StateDir, confirmed: bool, dry_run: bool) -> CliResult<ResetPlan> {
    let plan = ResetPlan {
        jobs: state.queue.len(),
        mappings: state.id_map.len(),
        shadow_types: state.shadow.types().await?,
    };
    if dry_run {
        return Ok(plan);
    }
    if !confirmed {
        return Err(CliError::NotConfirmed("reset sync state"));
    }

    state.queue.clear_all().await?;
    state.id_map.clear_all().await?;
    state.shadow.clear_all().await?;
    info!(jobs = plan.jobs, mappings = plan.mappings, "sync state reset");
    Ok(plan)
}

/// Runs the reset command.
pub async fn run(
    state: &StateDir,
    confirmed: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let plan = execute(state, confirmed, dry_run).await?;
    if dry_run {
        println!("(dry run - no changes will be made)");
    }
    println!("Jobs:         {}", plan.jobs);
    println!("Id mappings:  {}", plan.mappings);
    println!("Shadow types: {}", plan.shadow_types.join(", "));
    Ok(())
}
