// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry with exponential backoff for the single-record detail view.
//!
//! Unlike a transport retry, the operation here never fails: it returns a
//! best-effort value, and the caller decides from that value whether another
//! attempt is worthwhile.

use std::future::Future;
use std::time::Duration;

use panelkeep_config::model::DecryptConfig;
use tokio::time::sleep;
use tracing::debug;

/// Retry budget and backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for every subsequent one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(600),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DecryptConfig) -> Self {
        Self {
            max_retries: config.detail_max_retries,
            base_delay: Duration::from_millis(config.detail_base_delay_ms),
        }
    }

    /// A policy that runs the operation exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }

    /// Run `operation` until `should_retry` rejects its output or the budget is spent.
    ///
    /// Returns the last output either way.
    pub async fn run<T, F, Fut, P>(&self, mut operation: F, should_retry: P) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        P: Fn(&T) -> bool,
    {
        let mut output = operation().await;
        let mut retry = 0;
        while retry < self.max_retries && should_retry(&output) {
            retry += 1;
            let delay = self.delay_for(retry);
            debug!(retry, max_retries = self.max_retries, ?delay, "retrying detail decrypt");
            sleep(delay).await;
            output = operation().await;
        }
        output
    }
}
