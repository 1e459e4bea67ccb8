// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change requests and the parameter writes they expand into.
//!
//! A [`ChangeRequest`] is the unit callers submit through a handle. The
//! transition state machine expands each request into an ordered write plan
//! (mode switches come before dependent value writes) and later confirms it
//! against polled telemetry with [`ChangeRequest::is_satisfied_by`].

use std::fmt;

use crate::link::ParamValue;
use crate::telemetry::TelemetrySnapshot;
use crate::types::{HeatLevel, OperationMode, StateClasses, TargetTemperature};

/// Key path that triggers a start sequence.
pub const PATH_START: &str = "misc.start";
/// Key path that triggers a stop sequence.
pub const PATH_STOP: &str = "misc.stop";
/// Key path of the regulation mode selector.
pub const PATH_OPERATION_MODE: &str = "regulation.operation_mode";
/// Key path of the fixed power setting, in percent.
pub const PATH_FIXED_POWER: &str = "regulation.fixed_power";
/// Key path of the target temperature setting.
pub const PATH_BOILER_TEMP: &str = "boiler.temp";
/// Key path that forces a single auger run.
pub const PATH_FORCED_AUGER: &str = "auger.forced_run";

/// Temperatures within this margin of the requested value count as applied.
pub(crate) const TEMP_CONFIRM_MARGIN_C: f64 = 0.5;

/// A single parameter write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    /// Key path of the parameter.
    pub path: String,
    /// Value to write.
    pub value: ParamValue,
}

impl WriteOp {
    /// Creates a write operation for `path`.
    pub fn new(path: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self { path: path.into(), value: value.into() }
    }
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.path, self.value)
    }
}

/// A desired change to the stove's operating state.
///
/// # Examples
///
/// ```
/// use aduro_lib::command::ChangeRequest;
/// use aduro_lib::types::HeatLevel;
///
/// let request = ChangeRequest::SetHeatLevel(HeatLevel::MAX);
/// assert!(!request.is_stop());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRequest {
    /// Ignite the stove.
    Start,
    /// Shut the stove down.
    Stop,
    /// Switch to heat-level regulation at the given level.
    SetHeatLevel(HeatLevel),
    /// Switch to temperature regulation at the given target.
    SetTemperature(TargetTemperature),
    /// Switch regulation mode without changing the associated value.
    SetMode(OperationMode),
    /// Flip between heat-level and temperature regulation.
    ///
    /// Resolved against the current snapshot before tracking begins; see
    /// [`ChangeRequest::resolve`].
    ToggleMode,
    /// Reignite the pellet burner after wood burning. Only admissible while
    /// the stove is in a wood-eligible state.
    ResumeAfterWood,
}

impl ChangeRequest {
    /// Whether this request shuts the stove down.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }

    /// Resolves context-dependent requests against the current snapshot.
    ///
    /// `ToggleMode` becomes a concrete `SetMode`; every other variant is
    /// returned unchanged.
    #[must_use]
    pub fn resolve(self, current: &TelemetrySnapshot) -> Self {
        match self {
            Self::ToggleMode => Self::SetMode(current.operation_mode.toggled()),
            other => other,
        }
    }

    /// Expands the request into an ordered write plan.
    ///
    /// Value writes that only take effect in a particular regulation mode
    /// are preceded by the mode switch when the stove is not already in that
    /// mode. Call [`resolve`](Self::resolve) first; a `ToggleMode` plan is
    /// empty.
    #[must_use]
    pub fn plan(&self, current: &TelemetrySnapshot) -> Vec<WriteOp> {
        match self {
            Self::Start | Self::ResumeAfterWood => vec![WriteOp::new(PATH_START, 1)],
            Self::Stop => vec![WriteOp::new(PATH_STOP, 1)],
            Self::SetHeatLevel(level) => {
                let mut ops = Vec::with_capacity(2);
                if current.operation_mode != OperationMode::HeatLevel {
                    ops.push(WriteOp::new(
                        PATH_OPERATION_MODE,
                        i64::from(OperationMode::HeatLevel.code()),
                    ));
                }
                ops.push(WriteOp::new(PATH_FIXED_POWER, i64::from(level.power_pct())));
                ops
            }
            Self::SetTemperature(target) => {
                let mut ops = Vec::with_capacity(2);
                if current.operation_mode != OperationMode::Temperature {
                    ops.push(WriteOp::new(
                        PATH_OPERATION_MODE,
                        i64::from(OperationMode::Temperature.code()),
                    ));
                }
                ops.push(WriteOp::new(PATH_BOILER_TEMP, target.celsius()));
                ops
            }
            Self::SetMode(mode) => {
                vec![WriteOp::new(PATH_OPERATION_MODE, i64::from(mode.code()))]
            }
            Self::ToggleMode => Vec::new(),
        }
    }

    /// Whether polled telemetry shows the request has taken effect.
    #[must_use]
    pub fn is_satisfied_by(&self, snapshot: &TelemetrySnapshot, classes: &StateClasses) -> bool {
        match self {
            Self::Start | Self::ResumeAfterWood => classes.is_startup(snapshot.state),
            Self::Stop => classes.is_shutdown(snapshot.state),
            Self::SetHeatLevel(level) => {
                snapshot.operation_mode == OperationMode::HeatLevel
                    && snapshot.heat_level == *level
            }
            Self::SetTemperature(target) => {
                snapshot.operation_mode == OperationMode::Temperature
                    && (snapshot.target_temperature - target.celsius()).abs()
                        <= TEMP_CONFIRM_MARGIN_C
            }
            Self::SetMode(mode) => snapshot.operation_mode == *mode,
            Self::ToggleMode => false,
        }
    }
}

impl fmt::Display for ChangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::SetHeatLevel(level) => write!(f, "set heat level {level}"),
            Self::SetTemperature(target) => write!(f, "set target {target}"),
            Self::SetMode(mode) => write!(f, "set mode {mode}"),
            Self::ToggleMode => write!(f, "toggle mode"),
            Self::ResumeAfterWood => write!(f, "resume after wood"),
        }
    }
}

/// A write applied outside the reconciliation state machine.
///
/// These are momentary actions with no observable confirmation in
/// telemetry, so they bypass tracking entirely and run with dispatcher
/// retries only.
#[derive(Debug, Clone, PartialEq)]
pub enum MaintenanceOp {
    /// Force a single auger feed run.
    ForceAugerRun,
    /// Write an arbitrary key path.
    SetRaw {
        /// Key path of the parameter.
        path: String,
        /// Value to write.
        value: ParamValue,
    },
}

impl MaintenanceOp {
    /// The parameter write this operation performs.
    #[must_use]
    pub fn write_op(&self) -> WriteOp {
        match self {
            Self::ForceAugerRun => WriteOp::new(PATH_FORCED_AUGER, 1),
            Self::SetRaw { path, value } => WriteOp::new(path.clone(), *value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StateCode;

    fn snapshot_in(mode: OperationMode) -> TelemetrySnapshot {
        TelemetrySnapshot { operation_mode: mode, ..TelemetrySnapshot::default() }
    }

    #[test]
    fn heat_level_plan_switches_mode_first() {
        let current = snapshot_in(OperationMode::Temperature);
        let plan = ChangeRequest::SetHeatLevel(HeatLevel::MAX).plan(&current);
        assert_eq!(
            plan,
            vec![
                WriteOp::new(PATH_OPERATION_MODE, 0),
                WriteOp::new(PATH_FIXED_POWER, 100),
            ]
        );
    }

    #[test]
    fn heat_level_plan_skips_mode_when_already_set() {
        let current = snapshot_in(OperationMode::HeatLevel);
        let plan = ChangeRequest::SetHeatLevel(HeatLevel::MIN).plan(&current);
        assert_eq!(plan, vec![WriteOp::new(PATH_FIXED_POWER, 10)]);
    }

    #[test]
    fn temperature_plan_switches_mode_first() {
        let current = snapshot_in(OperationMode::HeatLevel);
        let target = TargetTemperature::new(22.0).unwrap();
        let plan = ChangeRequest::SetTemperature(target).plan(&current);
        assert_eq!(
            plan,
            vec![
                WriteOp::new(PATH_OPERATION_MODE, 1),
                WriteOp::new(PATH_BOILER_TEMP, 22.0),
            ]
        );
    }

    #[test]
    fn toggle_resolves_against_current_mode() {
        let current = snapshot_in(OperationMode::HeatLevel);
        let resolved = ChangeRequest::ToggleMode.resolve(&current);
        assert_eq!(resolved, ChangeRequest::SetMode(OperationMode::Temperature));
    }

    #[test]
    fn start_confirmed_by_startup_state() {
        let classes = StateClasses::default();
        let snapshot = TelemetrySnapshot { state: StateCode(2), ..TelemetrySnapshot::default() };
        assert!(ChangeRequest::Start.is_satisfied_by(&snapshot, &classes));
        assert!(!ChangeRequest::Stop.is_satisfied_by(&snapshot, &classes));
    }

    #[test]
    fn temperature_confirmed_within_margin() {
        let classes = StateClasses::default();
        let target = TargetTemperature::new(21.0).unwrap();
        let request = ChangeRequest::SetTemperature(target);
        let snapshot = TelemetrySnapshot {
            operation_mode: OperationMode::Temperature,
            target_temperature: 21.4,
            ..TelemetrySnapshot::default()
        };
        assert!(request.is_satisfied_by(&snapshot, &classes));

        let off = TelemetrySnapshot { target_temperature: 22.0, ..snapshot };
        assert!(!request.is_satisfied_by(&off, &classes));
    }

    #[test]
    fn maintenance_op_write() {
        assert_eq!(
            MaintenanceOp::ForceAugerRun.write_op(),
            WriteOp::new(PATH_FORCED_AUGER, 1)
        );
    }
}
