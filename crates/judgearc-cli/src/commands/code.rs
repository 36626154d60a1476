//! The `judgearc code` command: an interactive coding session on stdin.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

use judgearc_client::config::load_config_from;
use judgearc_client::{create_submitter, JudgearcConfig};
use judgearc_core::batch::TrialBatch;
use judgearc_core::catalog::MemoryCatalog;
use judgearc_core::model::JudgLevel;
use judgearc_core::review::{seed_comparisons, Comparison};
use judgearc_core::store::SqliteStore;
use judgearc_core::trial::{SubmissionOutcome, SystemClock, TrialRunner};

type Input = Lines<BufReader<Stdin>>;

pub async fn execute(
    batch_path: PathBuf,
    user: Option<u64>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if user.is_some() {
        config.rater = user;
    }

    let batch = TrialBatch::load_json(&batch_path)?;
    let comparisons = if batch.review.is_some() {
        load_comparisons(&config, &batch).await
    } else {
        HashMap::new()
    };

    let submitter = create_submitter(&config)?;
    let mut runner = TrialRunner::new(batch, submitter, Arc::new(SystemClock))?;
    let total = runner.batch().len();

    print_context(runner.batch());
    println!("Session {} ({total} trials)", runner.session_id());

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while !runner.is_done() {
        report_failures(&runner);
        let trial = runner.state().trial;
        println!("\n--- Response {trial} of {total} ---");
        println!(
            "{}",
            runner
                .current_response()
                .unwrap_or("(response text unavailable)")
        );
        if let Some(comparison) = comparisons.get(&runner.state().resp_id) {
            print_comparison(comparison);
        }

        if !choose(&mut runner, &mut input).await? || !rationale(&mut runner, &mut input).await? {
            break;
        }
        runner.advance()?;
    }

    if runner.is_done() {
        println!("\nAll responses coded.");
    } else {
        println!(
            "\nInput ended at response {} of {total}; finished responses were submitted.",
            runner.state().trial
        );
    }

    let outcomes = runner.flush().await;
    print_outcomes(&outcomes);

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    anyhow::ensure!(failed == 0, "{failed} submission(s) failed");
    Ok(())
}

fn report_failures(runner: &TrialRunner) {
    for failed in runner.take_failures() {
        eprintln!(
            "Warning: submission for response {} failed: {}",
            failed.trial, failed.error
        );
    }
}

async fn prompt(input: &mut Input, text: &str) -> Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}

/// Returns `false` when input ends.
async fn choose(runner: &mut TrialRunner, input: &mut Input) -> Result<bool> {
    let menu = JudgLevel::ALL
        .iter()
        .map(|l| format!("[{}] {}", l.number(), l.label()))
        .collect::<Vec<_>>()
        .join("  ");
    loop {
        let Some(line) = prompt(input, &format!("Judgment {menu}: ")).await? else {
            return Ok(false);
        };
        let Ok(number) = line.trim().parse::<u8>() else {
            println!("Enter a judgment number.");
            continue;
        };
        let label = JudgLevel::try_from(number).map_or("", |l| l.label());
        match runner.choose_judgment(number, label) {
            Ok(()) => return Ok(true),
            Err(e) => println!("{e}"),
        }
    }
}

/// Returns `false` when input ends.
async fn rationale(runner: &mut TrialRunner, input: &mut Input) -> Result<bool> {
    loop {
        let Some(line) = prompt(input, "Rationale: ").await? else {
            return Ok(false);
        };
        match runner.submit_rationale(Some(&line)) {
            Ok(()) => return Ok(true),
            Err(e) if e.is_validation() => println!("{e}"),
            Err(e) => return Err(e.into()),
        }
    }
}

async fn load_comparisons(config: &JudgearcConfig, batch: &TrialBatch) -> HashMap<u64, Comparison> {
    let seeded = async {
        let store = SqliteStore::open(&config.database)?;
        let catalog = MemoryCatalog::load_json(&config.catalog)?;
        seed_comparisons(&store, &catalog, batch).await
    };
    match seeded.await {
        Ok(seeds) => seeds.into_iter().map(|c| (c.resp_id, c)).collect(),
        Err(e) => {
            warn!("review comparisons unavailable: {e:#}");
            HashMap::new()
        }
    }
}

fn print_context(batch: &TrialBatch) {
    println!("Scenario: {}", batch.scenario.title);
    if !batch.scenario.content.is_empty() {
        println!("{}", batch.scenario.content);
    }
    if let Some(heading) = batch.competency.heading() {
        println!("\nCompetency: {heading}");
    }
    for (level, definition) in JudgLevel::ALL.iter().zip(&batch.competency.definitions) {
        println!("  {} - {}: {definition}", level.number(), level.label());
    }
}

fn print_comparison(comparison: &Comparison) {
    for (name, record) in [("Judge 1", &comparison.judge1), ("Judge 2", &comparison.judge2)] {
        match record {
            Some(r) => println!(
                "{name}: {} ({})",
                r.judgment.judg_level.label(),
                r.judgment.rationale
            ),
            None => println!("{name}: not coded"),
        }
    }
}

fn print_outcomes(outcomes: &[SubmissionOutcome]) {
    if outcomes.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Response", "Sub", "Level", "Judg s", "Ration s", "Status"]);
    for o in outcomes {
        let status = match &o.result {
            Ok(response) => match &response.data {
                Some(record) => format!("saved #{}", record.id),
                None => "saved".to_string(),
            },
            Err(e) => format!("FAILED: {e}"),
        };
        table.add_row(vec![
            Cell::new(o.trial),
            Cell::new(o.submission.sub_num),
            Cell::new(o.submission.judg_level.label()),
            Cell::new(o.submission.judg_time),
            Cell::new(o.submission.ration_time),
            Cell::new(status),
        ]);
    }
    println!("\n{table}");
}
