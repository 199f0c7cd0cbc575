//! Inspect command implementation.

use super::{print_json, CliResult, StateDir};
use serde::Serialize;

/// Summary of a sync state directory.
#[derive(Debug, Serialize, PartialEq)]
pub struct InspectResult {
    /// State directory path.
    pub path: String,
    /// Namespace of the persisted keys.
    pub namespace: String,
    /// Number of pending jobs.
    pub pending_jobs: usize,
    /// Number of id mappings awaiting a full drain.
    pub id_mappings: usize,
    /// Creation time of the oldest pending job, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_job_at: Option<u64>,
    /// Shadow record counts per type.
    pub shadow_types: Vec<TypeStats>,
}

/// Shadow statistics for one record type.
#[derive(Debug, Serialize, PartialEq)]
pub struct TypeStats {
    /// Record type.
    pub type_name: String,
    /// Number of shadowed records.
    pub records: usize,
    /// How many of them still carry a local id.
    pub local_ids: usize,
}

/// Collects the summary of `state`.
pub async fn collect(state: &StateDir) -> CliResult<InspectResult> {
    let prefix = state.config.local_id_prefix.as_str();
    let mut shadow_types = Vec::new();
    for type_name in state.shadow.types().await? {
        let records = state.shadow.find_all(&type_name).await?;
        let local_ids = records
            .iter()
            .filter(|r| r.id().is_some_and(|id| id.starts_with(prefix)))
            .count();
        shadow_types.push(TypeStats {
            type_name,
            records: records.len(),
            local_ids,
        });
    }

    Ok(InspectResult {
        path: state.path.display().to_string(),
        namespace: state.config.namespace.clone(),
        pending_jobs: state.queue.len(),
        id_mappings: state.id_map.len(),
        oldest_job_at: state.queue.sorted().first().map(|j| j.created_at),
        shadow_types,
    })
}

/// Runs the inspect command.
pub async fn run(state: &StateDir, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(state).await?;
    match format {
        "json" => print_json(&result)?,
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Fryctoria Sync State");
    println!("====================");
    println!();
    println!("Path:      {}", result.path);
    println!("Namespace: {}", result.namespace);
    println!();
    println!("Queue:");
    println!("  Pending jobs: {}", result.pending_jobs);
    if let Some(at) = result.oldest_job_at {
        println!("  Oldest job:   {at} ms");
    }
    println!("  Id mappings:  {}", result.id_mappings);

    if !result.shadow_types.is_empty() {
        println!();
        println!("Shadow store:");
        for stats in &result.shadow_types {
            println!(
                "  {:<16} {} records ({} unsynced)",
                stats.type_name, stats.records, stats.local_ids
            );
        }
    }
}
