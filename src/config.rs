// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stove controller configuration.
//!
//! All tunables ship with defaults matching the stove's factory behavior, so
//! `StoveConfig::default()` is a working configuration. Validation happens
//! once, when the controller is spawned; an out-of-range setting refuses to
//! start rather than running with it.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use aduro_lib::config::StoveConfig;
//!
//! let config = StoveConfig::new("living room")
//!     .with_pellet_capacity_kg(12.0)
//!     .with_high_smoke_threshold(390.0)
//!     .with_normal_poll_interval(Duration::from_secs(30));
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use crate::alert::{AlertConfig, AlertDirection};
use crate::error::ConfigError;
use crate::types::StateClasses;

/// Polling cadence of the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingSettings {
    /// Interval between polls when nothing is pending.
    pub normal_interval: Duration,
    /// Interval while a change is being tracked or a timer is running.
    pub fast_interval: Duration,
    /// Number of fast cycles to keep after a command before slowing down.
    pub fast_cycles_after_command: u32,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            normal_interval: Duration::from_secs(20),
            fast_interval: Duration::from_secs(5),
            fast_cycles_after_command: 8,
        }
    }
}

/// Retry behavior for parameter writes.
///
/// Attempts are counted from 1. The delay grows geometrically from
/// `initial_delay` up to `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total delivery attempts before giving up.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failure.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempt` failures.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// The delay to wait before the attempt following `attempt` failures.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.backoff_multiplier.powi(exponent.min(16).cast_signed());
        let delay = self.initial_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }
}

/// Timeouts and budgets for tracked state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionSettings {
    /// How long to wait for telemetry to reflect a command before resending.
    pub resend_after: Duration,
    /// Overall deadline for a change to become observable.
    pub overall_timeout: Duration,
    /// How many resends are allowed before the transition fails.
    pub max_resends: u32,
    /// Duration of the ignition phase timers.
    pub startup_timer: Duration,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            resend_after: Duration::from_secs(30),
            overall_timeout: Duration::from_secs(120),
            max_resends: 3,
            startup_timer: Duration::from_secs(870),
        }
    }
}

/// Pellet hopper bookkeeping settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PelletSettings {
    /// Hopper capacity in kg, assumed full after each refill.
    pub capacity_kg: f64,
    /// Remaining-fraction below which a low pellet warning fires, in percent.
    pub notify_level_pct: f64,
    /// Remaining-fraction below which an automatic shutdown is requested,
    /// in percent.
    pub shutdown_level_pct: f64,
    /// Whether crossing the shutdown level actually requests a stop.
    pub auto_shutdown: bool,
}

impl Default for PelletSettings {
    fn default() -> Self {
        Self {
            capacity_kg: 9.1,
            notify_level_pct: 10.0,
            shutdown_level_pct: 5.0,
            auto_shutdown: false,
        }
    }
}

const SMOKE_THRESHOLD_MIN_C: f64 = 300.0;
const SMOKE_THRESHOLD_MAX_C: f64 = 450.0;
const WOOD_THRESHOLD_MIN_C: f64 = 20.0;
const WOOD_THRESHOLD_MAX_C: f64 = 200.0;
const ALERT_DURATION_MIN: Duration = Duration::from_secs(1);
const ALERT_DURATION_MAX: Duration = Duration::from_secs(1800);
const CAPACITY_MIN_KG: f64 = 8.0;
const CAPACITY_MAX_KG: f64 = 25.0;

/// Complete configuration for one stove controller.
#[derive(Debug, Clone, PartialEq)]
pub struct StoveConfig {
    /// Human-readable stove name, used in logging.
    pub name: String,
    /// Polling cadence.
    pub polling: PollingSettings,
    /// Write retry behavior.
    pub retry: RetryPolicy,
    /// Transition tracking budgets.
    pub transition: TransitionSettings,
    /// Pellet bookkeeping settings.
    pub pellets: PelletSettings,
    /// High smoke temperature alert, active in every mode.
    pub high_smoke_threshold_c: f64,
    /// Debounce window for the high smoke alert.
    pub high_smoke_duration: Duration,
    /// Low wood temperature alert, active in wood burning only.
    pub low_wood_threshold_c: f64,
    /// Debounce window for the low wood alert.
    pub low_wood_duration: Duration,
    /// Whether pellet operation resumes automatically after wood burns out.
    pub auto_resume_after_wood: bool,
    /// State code classification tables.
    pub classes: StateClasses,
}

impl Default for StoveConfig {
    fn default() -> Self {
        Self {
            name: "stove".to_string(),
            polling: PollingSettings::default(),
            retry: RetryPolicy::default(),
            transition: TransitionSettings::default(),
            pellets: PelletSettings::default(),
            high_smoke_threshold_c: 370.0,
            high_smoke_duration: Duration::from_secs(30),
            low_wood_threshold_c: 175.0,
            low_wood_duration: Duration::from_secs(300),
            auto_resume_after_wood: false,
            classes: StateClasses::default(),
        }
    }
}

impl StoveConfig {
    /// Creates a configuration with factory defaults for the named stove.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Sets the poll interval used when no change is pending.
    #[must_use]
    pub fn with_normal_poll_interval(mut self, interval: Duration) -> Self {
        self.polling.normal_interval = interval;
        self
    }

    /// Sets the poll interval used while changes are being tracked.
    #[must_use]
    pub fn with_fast_poll_interval(mut self, interval: Duration) -> Self {
        self.polling.fast_interval = interval;
        self
    }

    /// Sets the write retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the hopper capacity in kg.
    #[must_use]
    pub fn with_pellet_capacity_kg(mut self, capacity_kg: f64) -> Self {
        self.pellets.capacity_kg = capacity_kg;
        self
    }

    /// Enables or disables the automatic low-pellet shutdown.
    #[must_use]
    pub fn with_auto_shutdown(mut self, enabled: bool) -> Self {
        self.pellets.auto_shutdown = enabled;
        self
    }

    /// Sets the high smoke temperature alert threshold in °C.
    #[must_use]
    pub fn with_high_smoke_threshold(mut self, threshold_c: f64) -> Self {
        self.high_smoke_threshold_c = threshold_c;
        self
    }

    /// Sets the low wood temperature alert threshold in °C.
    #[must_use]
    pub fn with_low_wood_threshold(mut self, threshold_c: f64) -> Self {
        self.low_wood_threshold_c = threshold_c;
        self
    }

    /// Enables or disables automatic resume of pellet operation after wood
    /// burning ends.
    #[must_use]
    pub fn with_auto_resume_after_wood(mut self, enabled: bool) -> Self {
        self.auto_resume_after_wood = enabled;
        self
    }

    /// The high smoke alert settings in monitor form.
    #[must_use]
    pub fn high_smoke_alert(&self) -> AlertConfig {
        AlertConfig {
            threshold: self.high_smoke_threshold_c,
            min_duration: chrono::Duration::from_std(self.high_smoke_duration)
                .unwrap_or(chrono::Duration::MAX),
            direction: AlertDirection::Above,
        }
    }

    /// The low wood alert settings in monitor form.
    #[must_use]
    pub fn low_wood_alert(&self) -> AlertConfig {
        AlertConfig {
            threshold: self.low_wood_threshold_c,
            min_duration: chrono::Duration::from_std(self.low_wood_duration)
                .unwrap_or(chrono::Duration::MAX),
            direction: AlertDirection::Below,
        }
    }

    /// Validates every setting, returning the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold(
            "high_smoke_threshold",
            self.high_smoke_threshold_c,
            SMOKE_THRESHOLD_MIN_C,
            SMOKE_THRESHOLD_MAX_C,
        )?;
        check_threshold(
            "low_wood_threshold",
            self.low_wood_threshold_c,
            WOOD_THRESHOLD_MIN_C,
            WOOD_THRESHOLD_MAX_C,
        )?;
        check_duration("high_smoke_duration", self.high_smoke_duration)?;
        check_duration("low_wood_duration", self.low_wood_duration)?;
        check_percentage("notify_level_pct", self.pellets.notify_level_pct)?;
        check_percentage("shutdown_level_pct", self.pellets.shutdown_level_pct)?;
        if !(CAPACITY_MIN_KG..=CAPACITY_MAX_KG).contains(&self.pellets.capacity_kg) {
            return Err(ConfigError::InvalidCapacity(self.pellets.capacity_kg));
        }
        if self.polling.normal_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("normal_interval"));
        }
        if self.polling.fast_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("fast_interval"));
        }
        if self.transition.resend_after.is_zero() {
            return Err(ConfigError::ZeroDuration("resend_after"));
        }
        if self.transition.overall_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("overall_timeout"));
        }
        Ok(())
    }
}

fn check_threshold(
    name: &'static str,
    actual: f64,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&actual) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { name, min, max, actual })
    }
}

fn check_duration(name: &'static str, actual: Duration) -> Result<(), ConfigError> {
    if (ALERT_DURATION_MIN..=ALERT_DURATION_MAX).contains(&actual) {
        Ok(())
    } else {
        Err(ConfigError::DurationOutOfRange {
            name,
            min_secs: ALERT_DURATION_MIN.as_secs(),
            max_secs: ALERT_DURATION_MAX.as_secs(),
            actual_secs: actual.as_secs(),
        })
    }
}

fn check_percentage(name: &'static str, actual: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&actual) {
        Ok(())
    } else {
        Err(ConfigError::InvalidPercentage { name, actual })
    }
}
