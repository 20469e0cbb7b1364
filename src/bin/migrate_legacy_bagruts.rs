// Small maintenance utility: migrate every 3-presentation bagrut document to the 4-presentation layout.
//
// Usage:
//   cargo run --bin migrate_legacy_bagruts -- [db_path]
//
// Idempotent: documents already in the current layout are left untouched.

use bagrut_core::app::{get_default_db_path, AppState};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    bagrut_core::logging::init();

    let db_path = std::env::args()
        .nth(1)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path);

    let state = AppState::new(db_path)?;
    let report = state.bagrut_api.migrate_all_legacy()?;

    println!("scanned={}", report.scanned);
    println!("migrated={}", report.migrated.len());
    for id in &report.migrated {
        println!("  {}", id);
    }
    if !report.failed.is_empty() {
        println!("failed={}", report.failed.len());
        for (id, reason) in &report.failed {
            println!("  {}: {}", id, reason);
        }
        return Err(format!("{} document(s) failed to migrate", report.failed.len()).into());
    }
    Ok(())
}
