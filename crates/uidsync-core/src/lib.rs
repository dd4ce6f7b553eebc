//! # uidsync reconciliation engine
//!
//! Brings a host's accounts in line with a declarative uid mapping file.
//!
//! The engine is built around capability traits, in the manner of an
//! identity connector framework:
//!
//! - [`AccountOracle`](traits::AccountOracle) - read-only account and group queries
//! - [`AccountAdmin`](traits::AccountAdmin) - account and group mutation
//! - [`QuotaOp`](traits::QuotaOp) - optional storage quota capability
//! - [`HostFs`](traits::HostFs) - directories, links, ownership
//! - [`CommandRunner`](traits::CommandRunner) - privileged external commands
//! - [`Console`](traits::Console) - operator output and yes/no confirmation
//!
//! Concrete backends live in the `uidsync-host` crate.
//!
//! ## Example
//!
//! ```ignore
//! use uidsync_core::prelude::*;
//!
//! let config = Arc::new(SyncConfig::for_profile(Profile::Workstation));
//! let rows = load_desired_state(&config.mapping_file)?;
//! let reconciler = Reconciler::new(config, services);
//! let report = reconciler.run(&rows).await?;
//! println!("{}", report.counts());
//! ```
//!
//! ## Crate Organization
//!
//! - [`desired`] - desired-state loader
//! - [`actions`] - provisioning and deprovisioning actions
//! - [`driver`] - the reconciliation driver
//! - [`config`] - configuration and deployment profiles
//! - [`report`] - per-run outcomes
//! - [`error`] - error taxonomy

pub mod actions;
pub mod config;
pub mod desired;
pub mod driver;
pub mod error;
pub mod report;
pub mod services;
pub mod traits;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::actions::{DeprovisionOutcome, Deprovisioner, GroupStatus, Provisioner};
    pub use crate::config::{
        GroupConfig, LinkTemplate, LocalStorageConfig, PasswordPolicy, Profile, QuotaConfig,
        SyncConfig,
    };
    pub use crate::desired::{
        load_desired_state, parse_desired_state, BrokenReason, BrokenRow, DesiredAccountRecord,
        DesiredRow,
    };
    pub use crate::driver::Reconciler;
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::report::{OrphanOutcome, RecordOutcome, RunCounts, RunReport};
    pub use crate::services::HostServices;
    pub use crate::traits::{AccountAdmin, AccountOracle, CommandRunner, Console, HostFs, QuotaOp};
    pub use crate::types::{
        AccountIdentity, ChownMode, CommandOutput, CommandSpec, GroupRef, LinkPolicy, LinkSpec,
        LocalMount, NewAccount, Owner, PathState,
    };
}

// Re-export async_trait for backend implementors
pub use async_trait::async_trait;
