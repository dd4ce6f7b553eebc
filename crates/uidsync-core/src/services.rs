//! Bundle of capability handles shared by the actions and the driver.

use std::sync::Arc;

use crate::traits::{AccountAdmin, AccountOracle, Console, HostFs, QuotaOp};

/// Capability handles for one host.
#[derive(Clone)]
pub struct HostServices {
    pub oracle: Arc<dyn AccountOracle>,
    pub admin: Arc<dyn AccountAdmin>,
    pub fs: Arc<dyn HostFs>,
    /// Present only on backends that can set storage quotas.
    pub quota: Option<Arc<dyn QuotaOp>>,
    pub console: Arc<dyn Console>,
}

impl HostServices {
    pub fn new(
        oracle: Arc<dyn AccountOracle>,
        admin: Arc<dyn AccountAdmin>,
        fs: Arc<dyn HostFs>,
        console: Arc<dyn Console>,
    ) -> Self {
        Self {
            oracle,
            admin,
            fs,
            quota: None,
            console,
        }
    }

    pub fn with_quota(mut self, quota: Arc<dyn QuotaOp>) -> Self {
        self.quota = Some(quota);
        self
    }
}
