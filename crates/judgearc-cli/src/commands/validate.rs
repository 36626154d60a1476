//! The `judgearc validate` command.

use std::path::PathBuf;

use anyhow::Result;

use judgearc_core::batch::TrialBatch;
use judgearc_core::catalog::MemoryCatalog;
use judgearc_core::model::JudgLevel;
use judgearc_core::traits::ContentCatalog;

pub fn execute(batch_path: PathBuf, catalog_path: Option<PathBuf>) -> Result<()> {
    let batch = TrialBatch::load_json(&batch_path)?;
    println!(
        "Batch: {} ({} trials, competency {}, task {}, {})",
        batch.scenario.title,
        batch.len(),
        batch.comp_num,
        batch.task_num,
        batch.judg_type()
    );

    batch.validate()?;

    let mut warnings = 0;
    if let Some(path) = catalog_path {
        let catalog = MemoryCatalog::load_json(&path)?;
        for &id in &batch.resp_ids {
            if catalog.title_of(id).is_none() {
                println!("  [{id}] WARNING: response id not in catalog");
                warnings += 1;
            }
        }
    }
    if batch.competency.definitions.len() != JudgLevel::ALL.len() {
        println!(
            "  WARNING: expected {} rubric definitions, found {}",
            JudgLevel::ALL.len(),
            batch.competency.definitions.len()
        );
        warnings += 1;
    }

    if warnings == 0 {
        println!("Batch valid.");
    } else {
        println!("\n{warnings} warning(s) found.");
    }

    Ok(())
}
