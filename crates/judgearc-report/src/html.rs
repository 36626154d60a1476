//! HTML progress report.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use judgearc_core::progress::{ProgressReport, TaskProgress};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Generate an HTML page from a progress report.
pub fn generate_html(report: &ProgressReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>judgearc coding progress</title>\n");
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str("<h1>Coding progress</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">{} competencies | {} responses | {} coded | {} reviewed | {}</p>\n",
        report.competencies.len(),
        report.total_responses(),
        report.total_coded(),
        report.total_reviewed(),
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    for (idx, comp) in report.competencies.iter().enumerate() {
        html.push_str("<section class=\"competency\">\n");
        html.push_str(&format!(
            "<h2>Competency {}</h2>\n",
            html_escape(&comp.comp_name)
        ));

        if comp.rows.is_empty() {
            html.push_str("<p class=\"meta\">No published responses.</p>\n</section>\n");
            continue;
        }

        html.push_str(&format!(
            "<table class=\"progress-table\" id=\"comp-{idx}\">\n"
        ));
        html.push_str(&format!(
            "<thead><tr><th onclick=\"sortTable('comp-{idx}', 0)\">Task</th><th onclick=\"sortTable('comp-{idx}', 1)\">Scenario</th><th>Responses</th><th>Coded</th><th>Reviewed</th><th>Coverage</th></tr></thead>\n"
        ));
        html.push_str("<tbody>\n");
        for row in &comp.rows {
            html.push_str(&task_row(row));
        }
        html.push_str("</tbody></table>\n");
        html.push_str("</section>\n");
    }

    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

fn task_row(row: &TaskProgress) -> String {
    let complete = row.total_responses > 0 && row.coded >= row.total_responses;
    let class = if complete { "done" } else { "open" };
    let scenario = match &row.task_name {
        Some(name) => html_escape(name),
        None => "<em>unpublished</em>".to_string(),
    };
    format!(
        "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        class,
        html_escape(row.task_num.as_deref().unwrap_or("?")),
        scenario,
        row.total_responses,
        row.coded,
        row.reviewed,
        coverage_bar(
            percent(row.coded, row.total_responses),
            percent(row.reviewed, row.total_responses)
        ),
    )
}

/// Stacked SVG bar: coded share behind reviewed share.
fn coverage_bar(coded: f64, reviewed: f64) -> String {
    let max_width = 160.0;
    let coded_width = (coded.min(1.0) * max_width) as usize;
    let reviewed_width = (reviewed.min(1.0) * max_width) as usize;
    format!(
        "<svg width=\"{w}\" height=\"14\" xmlns=\"http://www.w3.org/2000/svg\">\
<rect width=\"{w}\" height=\"14\" fill=\"var(--border)\" rx=\"3\"/>\
<rect width=\"{coded_width}\" height=\"14\" fill=\"#eab308\" rx=\"3\"/>\
<rect width=\"{reviewed_width}\" height=\"14\" fill=\"#22c55e\" rx=\"3\"/>\
</svg> {pct:.0}%",
        w = max_width as usize,
        pct = coded * 100.0,
    )
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &ProgressReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --done: #dcfce7; --open: transparent; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --done: #064e3b; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.done { background: var(--done); }
.open { background: var(--open); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { vertical-align: middle; }
"#;

const JS: &str = r#"
function sortTable(id, col) {
  const table = document.getElementById(id);
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    return asc ? va.localeCompare(vb, undefined, {numeric: true}) : vb.localeCompare(va, undefined, {numeric: true});
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
