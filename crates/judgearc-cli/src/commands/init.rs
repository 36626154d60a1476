//! The `judgearc init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing("judgearc.toml", SAMPLE_CONFIG)?;
    write_if_missing("catalog.json", SAMPLE_CATALOG)?;

    std::fs::create_dir_all("batches")?;
    write_if_missing("batches/example.json", EXAMPLE_BATCH)?;

    println!("\nNext steps:");
    println!("  1. Edit judgearc.toml with your rater id or endpoint");
    println!("  2. Run: judgearc validate --batch batches/example.json --catalog catalog.json");
    println!("  3. Run: judgearc code --batch batches/example.json");
    println!("  4. Run: judgearc progress");

    Ok(())
}

fn write_if_missing(path: &str, content: &str) -> Result<()> {
    if Path::new(path).exists() {
        println!("{path} already exists, skipping.");
    } else {
        std::fs::write(path, content)?;
        println!("Created {path}");
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# judgearc configuration

database = "judgearc.db"
catalog = "catalog.json"
rater = 1

# Judgments are written to the local database by default. To send them to a
# remote endpoint instead:
#
# [submitter]
# type = "http"
# base_url = "https://assess.example.org/wp-json/arc/v1"
# auth_token = "${JUDGEARC_TOKEN}"
# nonce = "${JUDGEARC_NONCE}"
# timeout_secs = 30

[submitter]
type = "local"
"#;

const SAMPLE_CATALOG: &str = r#"{
  "entries": [
    { "id": 1, "kind": "competency", "title": "1-Less Skilled" },
    { "id": 2, "kind": "competency", "title": "1-Proficient" },
    { "id": 3, "kind": "competency", "title": "1-Master" },
    { "id": 4, "kind": "competency", "title": "1-Overall" },
    { "id": 5, "kind": "scenario", "title": "0-Practice" },
    { "id": 6, "kind": "scenario", "title": "1-Customer escalation",
      "content": "A long-standing customer calls, upset that a shipment is three weeks late." },
    { "id": 7, "kind": "response", "title": "c1-t1-sub1",
      "content": "I would apologise and promise a refund straight away." },
    { "id": 8, "kind": "response", "title": "c1-t1-sub2",
      "content": "I would listen first, confirm the order details, then check the carrier before offering options." }
  ]
}
"#;

const EXAMPLE_BATCH: &str = r#"{
  "respIds": [7, 8],
  "subNums": [1, 2],
  "responses": {
    "7": "I would apologise and promise a refund straight away.",
    "8": "I would listen first, confirm the order details, then check the carrier before offering options."
  },
  "scenario": {
    "title": "1-Customer escalation",
    "content": "A long-standing customer calls, upset that a shipment is three weeks late."
  },
  "competency": {
    "titles": ["1-Less Skilled", "1-Proficient", "1-Master", "1-Overall"],
    "definitions": [
      "Reacts to the complaint without understanding it.",
      "Gathers the facts and resolves the immediate problem.",
      "Resolves the problem and rebuilds the customer's trust."
    ]
  },
  "compNum": 1,
  "taskNum": 1
}
"#;
