//! Reconciliation driver.
//!
//! One pass over the desired-state rows, followed by one pass over host
//! accounts the rows never mention. Per record:
//!
//! | wants account | exists | action                                  |
//! |---------------|--------|-----------------------------------------|
//! | yes           | no     | create + seed home + links + quota      |
//! | yes           | yes    | self-heal links and local storage       |
//! | no            | yes    | deprovision (confirmation-gated)        |
//! | no            | no     | nothing                                 |
//!
//! A record "wants" its account when its active flag is `1` and its
//! username has no comment marker. Any error from an action aborts the
//! whole run; a broken row only skips itself.

use std::collections::HashSet;
use std::sync::Arc;

use crate::actions::{DeprovisionOutcome, Deprovisioner, GroupStatus, Provisioner};
use crate::config::SyncConfig;
use crate::desired::{DesiredAccountRecord, DesiredRow};
use crate::error::CoreResult;
use crate::report::{OrphanOutcome, RecordOutcome, RunReport};
use crate::services::HostServices;

/// Orchestrates a reconciliation run.
pub struct Reconciler {
    config: Arc<SyncConfig>,
    services: HostServices,
    provisioner: Provisioner,
    deprovisioner: Deprovisioner,
}

impl Reconciler {
    pub fn new(config: Arc<SyncConfig>, services: HostServices) -> Self {
        Self {
            provisioner: Provisioner::new(config.clone(), services.clone()),
            deprovisioner: Deprovisioner::new(config.clone(), services.clone()),
            config,
            services,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reconcile the host against `rows`.
    pub async fn run(&self, rows: &[DesiredRow]) -> CoreResult<RunReport> {
        let mut report = RunReport::new();
        report.group_created = self.provisioner.ensure_group().await? == GroupStatus::Created;

        let mut declared: HashSet<String> = HashSet::new();
        for row in rows {
            match row {
                DesiredRow::Broken(broken) => {
                    self.services.console.say(&broken.to_string());
                    report.push(RecordOutcome::Broken(broken.clone()));
                }
                DesiredRow::Record(record) => {
                    declared.insert(record.username.clone());
                    declared.insert(record.account_name().to_string());
                    let outcome = self.reconcile_record(record).await?;
                    report.push(outcome);
                }
            }
        }

        if self.config.orphan_links {
            self.reconcile_orphans(&declared, &mut report).await?;
        }

        tracing::info!(counts = %report.counts(), "Reconciliation finished");
        Ok(report)
    }

    /// Classify one record and dispatch to the matching action.
    pub async fn reconcile_record(&self, record: &DesiredAccountRecord) -> CoreResult<RecordOutcome> {
        let console = &self.services.console;
        let username = record.account_name().to_string();

        if record.is_commented() {
            console.say(&format!("{username} is commented out, treating as inactive"));
        }

        let exists = self
            .services
            .oracle
            .account_exists(&record.identity())
            .await?;
        tracing::debug!(
            username = %username,
            uid = record.uid,
            wants = record.wants_account(),
            exists,
            "Classified record"
        );

        match (record.wants_account(), exists) {
            (true, false) => {
                console.say(&format!("creating user {username} with uid {}", record.uid));
                self.provision(record).await?;
                Ok(RecordOutcome::Created {
                    username,
                    uid: record.uid,
                })
            }
            (true, true) => {
                console.say(&format!("{username} is found"));
                let repaired = self.self_heal(&username).await?;
                if repaired > 0 {
                    console.say(&format!("fixed {repaired} link(s) for {username}"));
                }
                Ok(RecordOutcome::Found { username, repaired })
            }
            (false, true) => {
                console.say(&format!("{username} exists but is not active"));
                Ok(match self.deprovisioner.deprovision(&username).await? {
                    DeprovisionOutcome::Deleted {
                        removed_dirs,
                        kept_dirs,
                    } => RecordOutcome::Deleted {
                        username,
                        removed_dirs,
                        kept_dirs,
                    },
                    DeprovisionOutcome::Declined => RecordOutcome::DeleteDeclined { username },
                    DeprovisionOutcome::Manual => RecordOutcome::RetainedManual { username },
                })
            }
            (false, false) => {
                tracing::debug!(username = %username, "Inactive and absent");
                Ok(RecordOutcome::InactiveAbsent { username })
            }
        }
    }

    /// Full provisioning sequence for a new account. Order matters: links
    /// point into the home the account creation made.
    async fn provision(&self, record: &DesiredAccountRecord) -> CoreResult<()> {
        let username = record.account_name();
        let group = self.config.shared_group();

        self.provisioner.create_account(record).await?;
        self.provisioner.populate_home(username).await?;
        self.provisioner.ensure_symlinks(username, &group).await?;
        self.provisioner.ensure_local_storage(username, &group).await?;
        self.provisioner.set_quota(record.uid).await?;
        Ok(())
    }

    /// Re-run the full link set for an account that already exists.
    async fn self_heal(&self, username: &str) -> CoreResult<usize> {
        let group = self.config.shared_group();
        let links = self.provisioner.ensure_symlinks(username, &group).await?;
        let local = self.provisioner.ensure_local_storage(username, &group).await?;
        Ok(links + local)
    }

    /// Local-only provisioning for host accounts the desired state never
    /// named, using each account's own primary group.
    async fn reconcile_orphans(
        &self,
        declared: &HashSet<String>,
        report: &mut RunReport,
    ) -> CoreResult<()> {
        let oracle = &self.services.oracle;
        for username in oracle.host_usernames().await? {
            if declared.contains(&username) {
                continue;
            }
            let Some(group) = oracle.primary_group(&username).await? else {
                tracing::debug!(username = %username, "Orphan vanished before processing");
                continue;
            };
            let repaired = self
                .provisioner
                .ensure_local_storage(&username, &group)
                .await?;
            if repaired > 0 {
                self.services
                    .console
                    .say(&format!("created local link for {username}"));
            }
            report.push_orphan(OrphanOutcome { username, repaired });
        }
        Ok(())
    }
}
