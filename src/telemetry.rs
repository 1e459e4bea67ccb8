// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Telemetry snapshot read from the stove on each poll cycle.

use chrono::{DateTime, Utc};

use crate::types::{HeatLevel, OperationMode, StateCode, SubstateCode};

/// A complete reading of the stove's observable state.
///
/// One snapshot is produced per successful poll and fed through the alert
/// monitors, the consumption accountant and the transition state machine
/// before being published in the aggregate model.
///
/// A snapshot is never partially updated: either the device link yields a
/// complete new snapshot or the reconciliation loop retains the prior one.
/// All fields therefore carry last-known-good values.
///
/// # Examples
///
/// ```
/// use aduro_lib::telemetry::TelemetrySnapshot;
/// use aduro_lib::types::{OperationMode, StateCode};
///
/// let snapshot = TelemetrySnapshot {
///     state: StateCode(5),
///     operation_mode: OperationMode::Temperature,
///     ..TelemetrySnapshot::default()
/// };
/// assert_eq!(snapshot.state, StateCode(5));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    /// Burner state code.
    pub state: StateCode,
    /// Burner substate code.
    pub substate: SubstateCode,
    /// Current heat level, decoded from the reported power percentage.
    pub heat_level: HeatLevel,
    /// Target temperature reference in °C.
    pub target_temperature: f64,
    /// Measured room temperature in °C.
    pub room_temperature: f64,
    /// Smoke (exhaust) temperature in °C.
    pub smoke_temperature: f64,
    /// Shaft temperature in °C.
    pub shaft_temperature: f64,
    /// Current regulation mode.
    pub operation_mode: OperationMode,
    /// Current power output in kW.
    pub power_output_kw: f64,
    /// Current power output as a percentage of maximum.
    pub power_output_pct: f64,
    /// Pellets remaining in the hopper as reported by the stove, if the
    /// controller model reports it at all.
    pub pellets_remaining_kg: Option<f64>,
    /// Lifetime pellet consumption counter in kg. Monotonic except on a
    /// hardware reset.
    pub total_consumed_kg: f64,
    /// Lifetime stove operating time counter in seconds.
    pub total_operating_seconds: u64,
    /// Lifetime auger operating time counter in seconds.
    pub auger_seconds: u64,
    /// Lifetime ignition element operating time counter in seconds.
    pub ignition_seconds: u64,
    /// Network details, refreshed less frequently than operating data.
    pub network: NetworkInfo,
    /// Firmware version string, if reported.
    pub firmware: Option<String>,
    /// When this snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            state: StateCode(6),
            substate: SubstateCode(0),
            heat_level: HeatLevel::MIN,
            target_temperature: 20.0,
            room_temperature: 20.0,
            smoke_temperature: 20.0,
            shaft_temperature: 20.0,
            operation_mode: OperationMode::HeatLevel,
            power_output_kw: 0.0,
            power_output_pct: 0.0,
            pellets_remaining_kg: None,
            total_consumed_kg: 0.0,
            total_operating_seconds: 0,
            auger_seconds: 0,
            ignition_seconds: 0,
            network: NetworkInfo::default(),
            firmware: None,
            taken_at: DateTime::<Utc>::MIN_UTC,
        }
    }
}

/// Network details of the stove's WiFi module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct NetworkInfo {
    /// SSID of the router the stove is associated with.
    pub router_ssid: Option<String>,
    /// IP address of the stove.
    pub stove_ip: Option<String>,
    /// IP address of the router.
    pub router_ip: Option<String>,
    /// Received signal strength in dBm.
    pub rssi: Option<i32>,
    /// MAC address of the stove.
    pub mac: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_a_stopped_stove() {
        let snapshot = TelemetrySnapshot::default();
        assert_eq!(snapshot.state, StateCode(6));
        assert_eq!(snapshot.operation_mode, OperationMode::HeatLevel);
        assert!(snapshot.pellets_remaining_kg.is_none());
    }

    #[test]
    fn snapshot_serde_round_trip() {
        let snapshot = TelemetrySnapshot {
            state: StateCode(5),
            smoke_temperature: 180.5,
            total_consumed_kg: 123.4,
            firmware: Some("7.0.12".to_string()),
            ..TelemetrySnapshot::default()
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TelemetrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
