//! Command runner double that records every invocation.

#![allow(dead_code)]

use std::sync::Mutex;

use uidsync_core::async_trait;
use uidsync_core::error::CoreResult;
use uidsync_core::traits::CommandRunner;
use uidsync_core::types::{CommandOutput, CommandSpec};

/// Records specs and answers every command with a fixed status.
#[derive(Default)]
pub struct RecordingRunner {
    pub specs: Mutex<Vec<CommandSpec>>,
    pub status: i32,
}

impl RecordingRunner {
    pub fn with_status(status: i32) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.specs.lock().unwrap().clone()
    }

    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.specs()
            .iter()
            .map(|s| s.argv().into_iter().map(str::to_string).collect())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec) -> CoreResult<CommandOutput> {
        self.specs.lock().unwrap().push(spec.clone());
        Ok(CommandOutput { code: self.status })
    }
}
