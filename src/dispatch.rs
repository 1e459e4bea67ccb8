// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command dispatch with bounded retries.
//!
//! The dispatcher delivers one [`WriteOp`] at a time over the device link.
//! Transport failures and per-attempt timeouts each consume one attempt from
//! the retry budget; an explicit refusal by the stove short-circuits
//! immediately, since resending a value the stove does not accept cannot
//! succeed.

use std::time::Duration;

use tracing::{debug, warn};

use crate::command::WriteOp;
use crate::config::RetryPolicy;
use crate::error::{DispatchError, TransportError, WriteError};
use crate::link::DeviceLink;

/// Default cap on a single delivery attempt.
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers parameter writes with retry and backoff.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    retry: RetryPolicy,
    attempt_timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher with the given retry policy.
    #[must_use]
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry, attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT }
    }

    /// Overrides the per-attempt timeout.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Delivers `op`, retrying transport failures up to the policy's budget.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Rejected`] if the stove refused the value, without
    /// further attempts. [`DispatchError::Exhausted`] when every attempt in
    /// the budget failed, carrying the final transport error.
    pub async fn send<L: DeviceLink>(
        &self,
        link: &mut L,
        op: &WriteOp,
    ) -> Result<(), DispatchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = tokio::time::timeout(self.attempt_timeout, link.write(&op.path, op.value))
                .await
                .unwrap_or_else(|_| {
                    Err(WriteError::Transport(TransportError::Timeout(
                        u64::try_from(self.attempt_timeout.as_millis()).unwrap_or(u64::MAX),
                    )))
                });

            match result {
                Ok(()) => {
                    debug!(op = %op, attempt, "write delivered");
                    return Ok(());
                }
                Err(WriteError::Rejected(reason)) => {
                    warn!(op = %op, %reason, "write rejected by stove");
                    return Err(DispatchError::Rejected { path: op.path.clone(), reason });
                }
                Err(WriteError::Transport(err)) => {
                    if self.retry.should_retry(attempt) {
                        let delay = self.retry.delay_for_attempt(attempt);
                        debug!(op = %op, attempt, error = %err, delay_ms = delay.as_millis() as u64,
                            "write failed, retrying");
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(op = %op, attempts = attempt, error = %err, "write exhausted retries");
                        return Err(DispatchError::Exhausted {
                            path: op.path.clone(),
                            attempts: attempt,
                            last: err,
                        });
                    }
                }
            }
        }
    }
}
