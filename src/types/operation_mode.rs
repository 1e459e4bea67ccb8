// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stove operation mode.

use std::fmt;

use crate::error::ValueError;

/// Regulation mode of the stove.
///
/// The burner firmware identifies modes by a numeric code: 0 for fixed heat
/// level, 1 for temperature regulation, 2 for manual wood burning.
///
/// Wood is not a peer of the other two: it is a distinct physical-fuel mode
/// entered and exited only by dedicated interactions with the stove, which is
/// why [`OperationMode::toggled`] cycles only between heat level and
/// temperature.
///
/// # Examples
///
/// ```
/// use aduro_lib::types::OperationMode;
///
/// assert_eq!(OperationMode::from_code(1).unwrap(), OperationMode::Temperature);
/// assert_eq!(OperationMode::HeatLevel.toggled(), OperationMode::Temperature);
/// assert_eq!(OperationMode::Wood.toggled(), OperationMode::Wood);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Fixed-power operation at one of three heat levels (code 0).
    HeatLevel,
    /// Temperature-regulated operation toward a target room temperature (code 1).
    Temperature,
    /// Manual wood burning; pellet automation is suspended (code 2).
    Wood,
}

impl OperationMode {
    /// Decodes an operation mode from its wire code.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidOperationMode`] for codes other than 0-2.
    pub fn from_code(code: u8) -> Result<Self, ValueError> {
        match code {
            0 => Ok(Self::HeatLevel),
            1 => Ok(Self::Temperature),
            2 => Ok(Self::Wood),
            other => Err(ValueError::InvalidOperationMode(other)),
        }
    }

    /// Returns the wire code for this mode.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::HeatLevel => 0,
            Self::Temperature => 1,
            Self::Wood => 2,
        }
    }

    /// Returns the other pellet mode.
    ///
    /// Toggling cycles only between [`HeatLevel`](Self::HeatLevel) and
    /// [`Temperature`](Self::Temperature); wood mode toggles to itself.
    #[must_use]
    pub const fn toggled(&self) -> Self {
        match self {
            Self::HeatLevel => Self::Temperature,
            Self::Temperature => Self::HeatLevel,
            Self::Wood => Self::Wood,
        }
    }

    /// Returns `true` for the two pellet-fuelled modes.
    #[must_use]
    pub const fn is_pellet(&self) -> bool {
        matches!(self, Self::HeatLevel | Self::Temperature)
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HeatLevel => "heat level",
            Self::Temperature => "temperature",
            Self::Wood => "wood",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_codes_round_trip() {
        for code in 0..=2 {
            let mode = OperationMode::from_code(code).unwrap();
            assert_eq!(mode.code(), code);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(matches!(
            OperationMode::from_code(3),
            Err(ValueError::InvalidOperationMode(3))
        ));
    }

    #[test]
    fn toggle_never_reaches_wood() {
        assert_eq!(OperationMode::HeatLevel.toggled(), OperationMode::Temperature);
        assert_eq!(OperationMode::Temperature.toggled(), OperationMode::HeatLevel);
        assert_eq!(OperationMode::Wood.toggled(), OperationMode::Wood);
    }

    #[test]
    fn pellet_classification() {
        assert!(OperationMode::HeatLevel.is_pellet());
        assert!(OperationMode::Temperature.is_pellet());
        assert!(!OperationMode::Wood.is_pellet());
    }
}
