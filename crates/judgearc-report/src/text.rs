//! Plain-text progress listing, one block per scenario.

use std::fmt::Write;

use judgearc_core::progress::ProgressReport;

/// Render the report the way the coordinators' progress page reads.
pub fn render_text(report: &ProgressReport) -> String {
    let mut out = String::new();
    for comp in &report.competencies {
        let _ = writeln!(out, "Competency {}", comp.comp_name);
        for row in &comp.rows {
            let scenario = row
                .task_name
                .as_deref()
                .unwrap_or(row.ct_pair.as_str());
            let _ = writeln!(out, "Scenario {scenario}");
            let _ = writeln!(out, "{} responses to code.", row.total_responses);
            let _ = writeln!(out, "{} coded responses.", row.coded);
            let _ = writeln!(out, "{} reviewed responses.", row.reviewed);
            out.push('\n');
        }
    }
    out
}
