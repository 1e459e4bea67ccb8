// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for Aduro stove control.
//!
//! This module provides type-safe representations of values exchanged with
//! the stove. Each constrained type validates its range at construction time.
//!
//! # Types
//!
//! - [`HeatLevel`] - Fixed-power heat level (1-3) with power-percentage mapping
//! - [`TargetTemperature`] - Target room temperature (5-35 °C)
//! - [`OperationMode`] - Heat level / temperature / wood regulation mode
//! - [`StateCode`] / [`SubstateCode`] - Raw burner phase codes with partial
//!   display labels
//! - [`StateClasses`] - Configurable startup/shutdown/wood classification

mod heat_level;
mod operation_mode;
mod state_code;
mod target_temperature;

pub use heat_level::HeatLevel;
pub use operation_mode::OperationMode;
pub use state_code::{StateClass, StateClasses, StateCode, SubstateCode};
pub use target_temperature::TargetTemperature;
