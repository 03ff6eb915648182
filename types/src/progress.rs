//! Migration progress as reported by a migration controller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Point-in-time view of a running migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Monitor-supplied iteration counter at the time of sampling.
    pub iteration: i64,
    pub data_total: u64,
    pub data_processed: u64,
    pub data_remaining: u64,
    #[serde(with = "crate::interval::wire")]
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Share of data transferred, clamped to `0..=100`.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        if self.data_total == 0 {
            return 0;
        }
        let processed = u128::from(self.data_processed.min(self.data_total));
        (processed * 100 / u128::from(self.data_total)) as u8
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.data_total > 0 && self.data_remaining == 0
    }
}
