// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hysteresis alert engine.
//!
//! An [`AlertMonitor`] watches one telemetry value against a threshold. The
//! raise side is debounced: the condition must hold continuously for the
//! configured duration before the alert trips. The clear side is immediate.
//! Timing uses the wall-clock timestamps carried by snapshots, so a missed
//! poll neither extends nor resets the debounce window.

use chrono::{DateTime, Utc};

/// Identifies one of the built-in alert monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Smoke temperature too high for too long.
    HighSmokeTemperature,
    /// Wood burn temperature dropped too low for too long.
    LowWoodTemperature,
}

/// Which side of the threshold is the alarming one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertDirection {
    /// Alert when the value rises above the threshold.
    Above,
    /// Alert when the value falls below the threshold.
    Below,
}

/// Threshold and debounce settings for one monitored value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertConfig {
    /// Threshold in the value's own unit.
    pub threshold: f64,
    /// How long the condition must hold before the alert raises.
    pub min_duration: chrono::Duration,
    /// Which side of the threshold raises the alert.
    pub direction: AlertDirection,
}

impl AlertConfig {
    /// Whether `value` is on the alarming side of the threshold.
    #[must_use]
    pub fn is_breaching(&self, value: f64) -> bool {
        match self.direction {
            AlertDirection::Above => value > self.threshold,
            AlertDirection::Below => value < self.threshold,
        }
    }
}

/// A state change produced by [`AlertMonitor::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEdge {
    /// The condition held for the full debounce window.
    Raised,
    /// The value returned to the safe side.
    Cleared,
}

/// Debounced threshold monitor for a single telemetry value.
///
/// # Examples
///
/// ```
/// use aduro_lib::alert::{AlertConfig, AlertDirection, AlertEdge, AlertMonitor};
/// use chrono::{Duration, Utc};
///
/// let mut monitor = AlertMonitor::new(AlertConfig {
///     threshold: 370.0,
///     min_duration: Duration::seconds(30),
///     direction: AlertDirection::Above,
/// });
///
/// let t0 = Utc::now();
/// assert_eq!(monitor.evaluate(380.0, t0), None);
/// assert_eq!(
///     monitor.evaluate(380.0, t0 + Duration::seconds(30)),
///     Some(AlertEdge::Raised),
/// );
/// assert_eq!(monitor.evaluate(350.0, t0 + Duration::seconds(40)),
///     Some(AlertEdge::Cleared));
/// ```
#[derive(Debug, Clone)]
pub struct AlertMonitor {
    config: AlertConfig,
    active: bool,
    breaching_since: Option<DateTime<Utc>>,
}

impl AlertMonitor {
    /// Creates an inactive monitor with the given settings.
    #[must_use]
    pub fn new(config: AlertConfig) -> Self {
        Self { config, active: false, breaching_since: None }
    }

    /// Whether the alert is currently raised.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Since when the monitored value has been on the alarming side, if it is.
    #[must_use]
    pub fn breaching_since(&self) -> Option<DateTime<Utc>> {
        self.breaching_since
    }

    /// Feeds one sample into the monitor.
    ///
    /// Returns an edge only on the poll where the state actually flips, so
    /// each breach produces exactly one `Raised` and each recovery exactly
    /// one `Cleared`.
    pub fn evaluate(&mut self, value: f64, now: DateTime<Utc>) -> Option<AlertEdge> {
        if self.config.is_breaching(value) {
            let since = *self.breaching_since.get_or_insert(now);
            if !self.active && now - since >= self.config.min_duration {
                self.active = true;
                return Some(AlertEdge::Raised);
            }
            None
        } else {
            self.breaching_since = None;
            if self.active {
                self.active = false;
                return Some(AlertEdge::Cleared);
            }
            None
        }
    }

    /// Drops any pending debounce and clears the alert without an edge.
    ///
    /// Used when the monitor's precondition goes away, e.g. the low wood
    /// temperature monitor when the stove leaves wood burning.
    pub fn reset(&mut self) {
        self.active = false;
        self.breaching_since = None;
    }
}
