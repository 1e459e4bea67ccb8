// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Target temperature type for temperature-regulated operation.

use std::fmt;

use crate::error::ValueError;

/// Target room temperature in °C (5-35).
///
/// # Examples
///
/// ```
/// use aduro_lib::types::TargetTemperature;
///
/// let temp = TargetTemperature::new(22.0).unwrap();
/// assert_eq!(temp.celsius(), 22.0);
///
/// assert!(TargetTemperature::new(40.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TargetTemperature(f64);

impl TargetTemperature {
    /// Minimum settable temperature in °C.
    pub const MIN_C: f64 = 5.0;

    /// Maximum settable temperature in °C.
    pub const MAX_C: f64 = 35.0;

    /// Creates a new target temperature.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TemperatureOutOfRange`] if the value is outside
    /// 5-35 °C.
    pub fn new(celsius: f64) -> Result<Self, ValueError> {
        if (Self::MIN_C..=Self::MAX_C).contains(&celsius) {
            Ok(Self(celsius))
        } else {
            Err(ValueError::TemperatureOutOfRange {
                min: Self::MIN_C,
                max: Self::MAX_C,
                actual: celsius,
            })
        }
    }

    /// Creates a target temperature, clamping to the valid range.
    #[must_use]
    pub fn clamped(celsius: f64) -> Self {
        Self(celsius.clamp(Self::MIN_C, Self::MAX_C))
    }

    /// Returns the temperature in °C.
    #[must_use]
    pub const fn celsius(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for TargetTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} °C", self.0)
    }
}

impl TryFrom<f64> for TargetTemperature {
    type Error = ValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
