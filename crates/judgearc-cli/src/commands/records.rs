//! The `judgearc records` command.

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use judgearc_core::model::JudgType;
use judgearc_core::store::SqliteStore;
use judgearc_core::traits::{JudgmentQuery, JudgmentStore};

use super::Sources;

pub async fn execute(
    user: Option<u64>,
    title_prefix: Option<String>,
    judg_type: Option<String>,
    format: String,
    sources: Sources,
) -> Result<()> {
    let config = sources.load()?;
    let store = SqliteStore::open(&config.database)?;

    let mut query = JudgmentQuery::all();
    if let Some(user) = user {
        query = query.user(user);
    }
    if let Some(prefix) = title_prefix {
        query = query.title_prefix(prefix);
    }
    if let Some(kind) = judg_type {
        let kind = kind
            .parse::<JudgType>()
            .map_err(anyhow::Error::msg)
            .context("invalid --type")?;
        query = query.judg_type(kind);
    }

    let records = store.query_all(&query).await?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        "table" => {
            let mut table = Table::new();
            table.set_header(vec![
                "Id", "Rater", "Response", "Type", "Level", "Judg", "Ration", "Rationale",
            ]);
            for r in &records {
                let j = &r.judgment;
                table.add_row(vec![
                    Cell::new(r.id),
                    Cell::new(j.user_id),
                    Cell::new(&j.resp_title),
                    Cell::new(j.judg_type),
                    Cell::new(j.judg_level.label()),
                    Cell::new(&j.judg_time),
                    Cell::new(&j.ration_time),
                    Cell::new(&j.rationale),
                ]);
            }
            println!("{table}");
            println!("{} record(s).", records.len());
        }
        other => anyhow::bail!("unknown format: {other} (expected table, json)"),
    }
    Ok(())
}
