//! Key derivation from catalog titles.
//!
//! Competencies, scenarios, responses and judgments are associated by parsing
//! their titles rather than through relational keys. Response titles look like
//! `c<comp>-t<task>-<marker>`; competency titles like `<comp>-Overall`; scenario
//! titles like `<task>-<name>`. Positions are byte offsets and titles are
//! expected to be ASCII.

/// Separator between title segments.
pub const SEPARATOR: char = '-';

/// Suffix marking the overall row of a competency.
pub const OVERALL_SUFFIX: &str = "-Overall";

/// Scenario titles with this prefix are practice material.
pub const PRACTICE_PREFIX: &str = "0-";

/// Response titles containing this marker are submissions.
pub const SUBMISSION_MARKER: &str = "sub";

/// The ct-pair separator search starts at this offset, past the `c<comp>-`
/// segment of a single-digit competency.
const CT_PAIR_SEARCH_FROM: usize = 4;

/// Display name of a competency: the title before the first `-Overall`.
pub fn competency_name(title: &str) -> Option<&str> {
    title.find(OVERALL_SUFFIX).map(|idx| &title[..idx])
}

/// Competency number: the title before the first separator.
pub fn competency_number(title: &str) -> Option<&str> {
    leading_segment(title)
}

/// Task number of a scenario title: the text before the first separator.
pub fn task_number(title: &str) -> Option<&str> {
    leading_segment(title)
}

/// Human-readable task name: the scenario title after its number.
pub fn task_name(title: &str) -> &str {
    match title.find(SEPARATOR) {
        Some(idx) => &title[idx + 1..],
        None => title,
    }
}

/// Competency number of a response title: from offset 1 to the first separator.
///
/// `c12-t3-sub4` yields `12`.
pub fn response_comp_number(title: &str) -> Option<&str> {
    let idx = title.find(SEPARATOR)?;
    title.get(1..idx).filter(|s| !s.is_empty())
}

/// The ct-pair of a response title: everything up to the first separator at
/// or after offset 4.
///
/// `c1-t1-sub1` yields `c1-t1`; `c10-t2-sub1` yields `c10-t2`.
pub fn ct_pair(title: &str) -> Option<&str> {
    let rest = title.get(CT_PAIR_SEARCH_FROM..)?;
    let idx = rest.find(SEPARATOR)?;
    Some(&title[..CT_PAIR_SEARCH_FROM + idx])
}

/// Task number of a ct-pair: everything after the first `t`, possibly empty.
pub fn ct_pair_task_number(ct_pair: &str) -> Option<&str> {
    let idx = ct_pair.find('t')?;
    Some(&ct_pair[idx + 1..])
}

/// Title prefix shared by every response of a ct-pair.
pub fn response_prefix(ct_pair: &str) -> String {
    format!("{ct_pair}{SEPARATOR}")
}

/// Title prefix of judgments recorded for a competency/task pair.
pub fn judgment_prefix(comp_num: &str, task_num: &str) -> String {
    format!("c{comp_num}-t{task_num}-")
}

fn leading_segment(title: &str) -> Option<&str> {
    title.find(SEPARATOR).map(|idx| &title[..idx])
}
