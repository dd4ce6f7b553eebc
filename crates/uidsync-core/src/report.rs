//! Run report types
//!
//! Per-record outcomes of one reconciliation pass, with counters for the
//! closing summary line.

use std::fmt;
use std::path::PathBuf;

use crate::desired::BrokenRow;

/// What the driver did with one record of the desired-state set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Account was missing and has been provisioned.
    Created { username: String, uid: u32 },
    /// Account exists; `repaired` links or directories were (re)created.
    Found { username: String, repaired: usize },
    /// Account removed after confirmation.
    Deleted {
        username: String,
        removed_dirs: Vec<PathBuf>,
        kept_dirs: Vec<PathBuf>,
    },
    /// Operator declined removal; re-evaluated next run.
    DeleteDeclined { username: String },
    /// Backend cannot remove accounts; left for manual removal.
    RetainedManual { username: String },
    /// Inactive and absent, nothing to do.
    InactiveAbsent { username: String },
    /// Row failed validation.
    Broken(BrokenRow),
}

/// Local-storage provisioning applied to an account absent from the
/// desired-state set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanOutcome {
    pub username: String,
    pub repaired: usize,
}

/// Summary counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub created: usize,
    pub found: usize,
    pub repaired: usize,
    pub deleted: usize,
    pub declined: usize,
    pub manual: usize,
    pub inactive: usize,
    pub broken: usize,
    pub orphans: usize,
}

/// Result of a complete reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub records: Vec<RecordOutcome>,
    pub orphans: Vec<OrphanOutcome>,
    /// Whether the shared group had to be created this run.
    pub group_created: bool,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: RecordOutcome) {
        self.records.push(outcome);
    }

    pub fn push_orphan(&mut self, outcome: OrphanOutcome) {
        self.orphans.push(outcome);
    }

    pub fn counts(&self) -> RunCounts {
        let mut counts = RunCounts::default();
        for outcome in &self.records {
            match outcome {
                RecordOutcome::Created { .. } => counts.created += 1,
                RecordOutcome::Found { repaired, .. } => {
                    counts.found += 1;
                    counts.repaired += repaired;
                }
                RecordOutcome::Deleted { .. } => counts.deleted += 1,
                RecordOutcome::DeleteDeclined { .. } => counts.declined += 1,
                RecordOutcome::RetainedManual { .. } => counts.manual += 1,
                RecordOutcome::InactiveAbsent { .. } => counts.inactive += 1,
                RecordOutcome::Broken(_) => counts.broken += 1,
            }
        }
        counts.orphans = self.orphans.len();
        counts.repaired += self.orphans.iter().map(|o| o.repaired).sum::<usize>();
        counts
    }

    /// Broken rows in file order.
    pub fn broken_rows(&self) -> impl Iterator<Item = &BrokenRow> {
        self.records.iter().filter_map(|o| match o {
            RecordOutcome::Broken(row) => Some(row),
            _ => None,
        })
    }

    /// Whether this run changed anything on the host.
    pub fn changed_host(&self) -> bool {
        let c = self.counts();
        self.group_created || c.created > 0 || c.deleted > 0 || c.repaired > 0
    }
}

impl fmt::Display for RunCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} found, {} repaired, {} deleted, {} declined, {} manual, {} inactive, {} broken, {} orphans",
            self.created,
            self.found,
            self.repaired,
            self.deleted,
            self.declined,
            self.manual,
            self.inactive,
            self.broken,
            self.orphans
        )
    }
}
