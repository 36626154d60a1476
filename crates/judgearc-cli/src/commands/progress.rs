//! The `judgearc progress` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use comfy_table::{Cell, Table};

use judgearc_core::catalog::MemoryCatalog;
use judgearc_core::progress::{ProgressAggregator, ProgressReport};
use judgearc_core::store::SqliteStore;
use judgearc_report::html::generate_html;
use judgearc_report::text::render_text;

use super::Sources;

pub async fn execute(format: String, output: Option<PathBuf>, sources: Sources) -> Result<()> {
    let config = sources.load()?;
    let catalog = MemoryCatalog::load_json(&config.catalog)?;
    let store = SqliteStore::open(&config.database)?;

    let report = ProgressAggregator::new(Arc::new(catalog), Arc::new(store))
        .report()
        .await?;

    let rendered = match format.as_str() {
        "table" => render_table(&report),
        "text" => render_text(&report),
        "markdown" => report.to_markdown(),
        "json" => serde_json::to_string_pretty(&report)?,
        "html" => generate_html(&report),
        other => bail!("unknown format: {other} (expected table, text, markdown, json, html)"),
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn render_table(report: &ProgressReport) -> String {
    let mut table = Table::new();
    table.set_header(vec![
        "Competency",
        "Task",
        "Scenario",
        "Responses",
        "Coded",
        "Reviewed",
    ]);

    for comp in &report.competencies {
        if comp.rows.is_empty() {
            table.add_row(vec![
                Cell::new(&comp.comp_name),
                Cell::new("-"),
                Cell::new("(no published responses)"),
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
            ]);
        }
        for row in &comp.rows {
            table.add_row(vec![
                Cell::new(&comp.comp_name),
                Cell::new(row.task_num.as_deref().unwrap_or("?")),
                Cell::new(row.task_name.as_deref().unwrap_or("")),
                Cell::new(row.total_responses),
                Cell::new(row.coded),
                Cell::new(row.reviewed),
            ]);
        }
    }

    format!(
        "{table}\n{} responses, {} coded, {} reviewed.",
        report.total_responses(),
        report.total_coded(),
        report.total_reviewed()
    )
}
