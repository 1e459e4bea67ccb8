// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Aggregate stove model published on the controller's watch channel.
//!
//! The model is a plain value: the latest telemetry snapshot plus everything
//! the controller derives from it. Observers receive a complete fresh model
//! per poll cycle and never see a partially updated one.

use chrono::{DateTime, Utc};

use crate::command::ChangeRequest;
use crate::consumption::ConsumptionLedger;
use crate::event::StoveId;
use crate::telemetry::TelemetrySnapshot;
use crate::transition::TransitionPhase;
use crate::types::StateClass;

/// Published view of one alert monitor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct AlertView {
    /// Whether the alert is raised.
    pub active: bool,
    /// Since when the monitored value has been on the alarming side.
    pub breaching_since: Option<DateTime<Utc>>,
    /// The configured threshold, for display.
    pub threshold: f64,
    /// The configured debounce window in seconds, for display.
    pub min_duration_secs: i64,
}

/// Complete published state of one stove.
#[derive(Debug, Clone, PartialEq)]
pub struct StoveModel {
    /// Identifier of the stove this model describes.
    pub stove_id: StoveId,
    /// Human-readable stove name.
    pub name: String,
    /// Whether the last poll succeeded.
    pub online: bool,
    /// Latest successfully polled telemetry, if any poll has succeeded.
    pub snapshot: Option<TelemetrySnapshot>,
    /// Classification of the current state code.
    pub state_class: StateClass,
    /// Where the transition machine currently is.
    pub phase: TransitionPhase,
    /// The change currently being tracked, if any.
    pub pending: Option<ChangeRequest>,
    /// High smoke temperature alert.
    pub high_smoke_alert: AlertView,
    /// Low wood temperature alert.
    pub low_wood_alert: AlertView,
    /// Consumption totals.
    pub ledger: ConsumptionLedger,
    /// Pellets remaining in the hopper, in kg.
    pub pellet_remaining_kg: f64,
    /// Pellets remaining as a percentage of hopper capacity.
    pub pellet_remaining_pct: f64,
    /// Seconds left on the ignition phase timer, if one is armed.
    pub ignition_timer_secs: Option<i64>,
    /// When the last successful poll completed.
    pub last_seen: Option<DateTime<Utc>>,
}

impl StoveModel {
    /// Creates the initial model for a stove that has not been polled yet.
    #[must_use]
    pub fn initial(stove_id: StoveId, name: impl Into<String>) -> Self {
        Self {
            stove_id,
            name: name.into(),
            online: false,
            snapshot: None,
            state_class: StateClass::Unclassified,
            phase: TransitionPhase::Idle,
            pending: None,
            high_smoke_alert: AlertView::default(),
            low_wood_alert: AlertView::default(),
            ledger: ConsumptionLedger::default(),
            pellet_remaining_kg: 0.0,
            pellet_remaining_pct: 0.0,
            ignition_timer_secs: None,
            last_seen: None,
        }
    }

    /// Display label for the current state, falling back to the raw code.
    #[must_use]
    pub fn state_display(&self) -> String {
        match &self.snapshot {
            Some(s) => s
                .state
                .label()
                .map_or_else(|| format!("State {}", s.state), str::to_string),
            None => "Unavailable".to_string(),
        }
    }

    /// Display label for the current substate, falling back to the raw code.
    #[must_use]
    pub fn substate_display(&self) -> String {
        match &self.snapshot {
            Some(s) => s
                .substate
                .label()
                .map_or_else(|| format!("Substate {}", s.substate), str::to_string),
            None => "Unavailable".to_string(),
        }
    }

    /// Whether the pellet burner is running.
    #[must_use]
    pub fn is_burning(&self) -> bool {
        self.state_class == StateClass::Startup
    }
}
