//! Jobs command implementation.

use super::{print_json, StateDir};
use fryctoria_sync::{id_of, Job};

/// Runs the jobs command, listing pending jobs in replay order.
pub fn run(
    state: &StateDir,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = select(state, limit);
    match format {
        "json" => print_json(&jobs)?,
        _ => {
            if jobs.is_empty() {
                println!("No pending jobs");
            }
            for (position, job) in jobs.iter().enumerate() {
                println!("{}", describe(position, job));
            }
        }
    }
    Ok(())
}

/// Returns at most `limit` jobs in replay order.
pub fn select(state: &StateDir, limit: Option<usize>) -> Vec<Job> {
    let mut jobs = state.queue.sorted();
    if let Some(limit) = limit {
        jobs.truncate(limit);
    }
    jobs
}

fn describe(position: usize, job: &Job) -> String {
    let record_id = id_of(&job.record).unwrap_or_else(|| "-".to_string());
    format!(
        "#{:<4} {:?} {} {} (job {}, at {} ms)",
        position, job.operation, job.type_name, record_id, job.id, job.created_at
    )
}
