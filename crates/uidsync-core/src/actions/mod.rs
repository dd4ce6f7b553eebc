//! Provisioning and deprovisioning actions the driver dispatches to.

pub mod deprovision;
pub mod provision;

pub use deprovision::{DeprovisionOutcome, Deprovisioner};
pub use provision::{GroupStatus, Provisioner};
