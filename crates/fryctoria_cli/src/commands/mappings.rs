//! Mappings command implementation.

use super::{print_json, StateDir};

/// Runs the mappings command, listing local to remote id records.
pub fn run(state: &StateDir, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let entries = state.id_map.entries();
    match format {
        "json" => print_json(&entries)?,
        _ => {
            if entries.is_empty() {
                println!("No id mappings");
            }
            for entry in &entries {
                println!(
                    "{:<16} {} -> {}",
                    entry.type_name, entry.local_id, entry.remote_id
                );
            }
        }
    }
    Ok(())
}
