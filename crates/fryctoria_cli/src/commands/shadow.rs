//! Shadow command implementation.

use super::{print_json, CliResult, StateDir};
use fryctoria_sync::Record;

/// Returns the shadowed records of `type_name`, or of every type.
pub async fn collect(state: &StateDir, type_name: Option<&str>) -> CliResult<Vec<Record>> {
    let types = match type_name {
        Some(name) => vec![name.to_string()],
        None => state.shadow.types().await?,
    };

    let mut records = Vec::new();
    for name in &types {
        records.extend(state.shadow.find_all(name).await?);
    }
    Ok(records)
}

/// Runs the shadow command.
pub async fn run(
    state: &StateDir,
    type_name: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = collect(state, type_name).await?;
    match format {
        "json" => print_json(&records)?,
        _ => {
            if records.is_empty() {
                println!("No shadow records");
            }
            for record in &records {
                println!(
                    "{:<16} {}",
                    record.type_name,
                    serde_json::Value::Object(record.fields.clone())
                );
            }
        }
    }
    Ok(())
}
