//! Check command - validate the mapping file without touching the host

use std::collections::BTreeMap;

use clap::Args;
use uidsync_core::desired::{load_desired_state, DesiredRow};

use crate::error::{CliError, CliResult};
use crate::settings::Settings;

/// Arguments for the check command
#[derive(Args, Debug, Default)]
pub struct CheckArgs {}

/// Findings of one mapping-file check.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub records: usize,
    pub active: usize,
    pub commented: usize,
    /// One line per problem, ready to print.
    pub problems: Vec<String>,
}

/// Broken rows, plus uids or names claimed by more than one row.
pub fn summarize(rows: &[DesiredRow]) -> CheckSummary {
    let mut summary = CheckSummary::default();
    let mut by_uid: BTreeMap<u32, Vec<(u64, String)>> = BTreeMap::new();
    let mut by_name: BTreeMap<String, Vec<u64>> = BTreeMap::new();

    for row in rows {
        match row {
            DesiredRow::Broken(broken) => summary.problems.push(broken.to_string()),
            DesiredRow::Record(record) => {
                summary.records += 1;
                if record.wants_account() {
                    summary.active += 1;
                }
                if record.is_commented() {
                    summary.commented += 1;
                }
                by_uid
                    .entry(record.uid)
                    .or_default()
                    .push((record.line, record.account_name().to_string()));
                by_name
                    .entry(record.account_name().to_string())
                    .or_default()
                    .push(record.line);
            }
        }
    }

    for (uid, owners) in by_uid.iter().filter(|(_, o)| o.len() > 1) {
        let owners: Vec<String> = owners
            .iter()
            .map(|(line, name)| format!("{name} (line {line})"))
            .collect();
        summary
            .problems
            .push(format!("uid {uid} is used by {}", owners.join(", ")));
    }
    for (name, lines) in by_name.iter().filter(|(_, l)| l.len() > 1) {
        let lines: Vec<String> = lines.iter().map(u64::to_string).collect();
        summary.problems.push(format!(
            "username {name} appears on lines {}",
            lines.join(", ")
        ));
    }
    summary
}

pub async fn execute(_args: CheckArgs, settings: Settings) -> CliResult<()> {
    let rows = load_desired_state(&settings.config.mapping_file)?;
    let summary = summarize(&rows);

    for problem in &summary.problems {
        println!("{problem}");
    }
    println!(
        "{} records ({} active, {} commented out), {} problem(s)",
        summary.records,
        summary.active,
        summary.commented,
        summary.problems.len()
    );

    if summary.problems.is_empty() {
        Ok(())
    } else {
        Err(CliError::InvalidMapping(summary.problems.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uidsync_core::desired::parse_desired_state;

    fn check(csv: &str) -> CheckSummary {
        summarize(&parse_desired_state(csv.as_bytes()).unwrap())
    }

    #[test]
    fn test_clean_file() {
        let summary = check("username,uid,active,comment\nalice,1001,1\n#bob,1002,1\ncarol,1003,0\n");
        assert_eq!(summary.records, 3);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.commented, 1);
        assert!(summary.problems.is_empty());
    }

    #[test]
    fn test_duplicate_uid_reported() {
        let summary = check("username,uid,active,comment\nalice,1001,1\ndave,1001,1\n");
        assert_eq!(
            summary.problems,
            vec!["uid 1001 is used by alice (line 2), dave (line 3)".to_string()]
        );
    }

    #[test]
    fn test_duplicate_name_across_comment_marker() {
        let summary = check("username,uid,active,comment\nbob,1002,1\n#bob,1002,1\n");
        assert_eq!(summary.problems.len(), 2);
        assert!(summary.problems[1].starts_with("username bob appears on lines 2, 3"));
    }

    #[test]
    fn test_broken_rows_are_problems() {
        let summary = check("username,uid,active,comment\nalice,1001\nbob,x,1\n");
        assert_eq!(summary.records, 0);
        assert_eq!(summary.problems.len(), 2);
        assert!(summary.problems.iter().all(|p| p.starts_with("broken row")));
    }
}
