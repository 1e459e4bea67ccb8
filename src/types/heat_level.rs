// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heat level type for fixed-power operation.
//!
//! This module provides a type-safe representation of the stove's three heat
//! levels, including the mapping to and from the burner's fixed-power
//! percentage.

use std::fmt;

use crate::error::ValueError;

/// Heat level of the stove in fixed-power mode (1-3).
///
/// Aduro stoves expose three discrete heat levels. On the wire the level is
/// expressed as a fixed-power percentage (level 1 = 10%, level 2 = 50%,
/// level 3 = 100%), and the stove reports back approximate percentages, so
/// decoding is tolerance-based rather than exact.
///
/// # Examples
///
/// ```
/// use aduro_lib::types::HeatLevel;
///
/// let level = HeatLevel::new(2).unwrap();
/// assert_eq!(level.value(), 2);
/// assert_eq!(level.power_pct(), 50);
///
/// // Reported percentages are approximate
/// assert_eq!(HeatLevel::from_power_pct(48.0), HeatLevel::new(2).unwrap());
///
/// // Invalid values return error
/// assert!(HeatLevel::new(4).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct HeatLevel(u8);

impl HeatLevel {
    /// Lowest heat level.
    pub const MIN: Self = Self(1);

    /// Highest heat level.
    pub const MAX: Self = Self(3);

    /// Creates a new heat level.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidHeatLevel`] if the value is not 1, 2 or 3.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if (1..=3).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValueError::InvalidHeatLevel(value))
        }
    }

    /// Returns the heat level (1-3).
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns the fixed-power percentage sent to the burner for this level.
    #[must_use]
    pub const fn power_pct(&self) -> u8 {
        match self.0 {
            1 => 10,
            2 => 50,
            _ => 100,
        }
    }

    /// Decodes a heat level from a reported power percentage.
    ///
    /// The burner reports approximate values, not exactly 10, 50 or 100, so
    /// decoding uses tolerance bands: up to 30% is level 1, up to 75% is
    /// level 2, anything above is level 3.
    #[must_use]
    pub fn from_power_pct(pct: f64) -> Self {
        if pct <= 30.0 {
            Self(1)
        } else if pct <= 75.0 {
            Self(2)
        } else {
            Self(3)
        }
    }

    /// Returns the roman-numeral display form used on the stove's own panel.
    #[must_use]
    pub const fn display(&self) -> &'static str {
        match self.0 {
            1 => "I",
            2 => "II",
            _ => "III",
        }
    }
}

impl fmt::Display for HeatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl TryFrom<u8> for HeatLevel {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_level_valid_values() {
        for v in 1..=3 {
            assert_eq!(HeatLevel::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn heat_level_invalid_values() {
        assert!(HeatLevel::new(0).is_err());
        assert!(HeatLevel::new(4).is_err());
    }

    #[test]
    fn heat_level_power_mapping() {
        assert_eq!(HeatLevel::new(1).unwrap().power_pct(), 10);
        assert_eq!(HeatLevel::new(2).unwrap().power_pct(), 50);
        assert_eq!(HeatLevel::new(3).unwrap().power_pct(), 100);
    }

    #[test]
    fn heat_level_from_reported_pct_uses_tolerance_bands() {
        assert_eq!(HeatLevel::from_power_pct(8.0).value(), 1);
        assert_eq!(HeatLevel::from_power_pct(30.0).value(), 1);
        assert_eq!(HeatLevel::from_power_pct(48.0).value(), 2);
        assert_eq!(HeatLevel::from_power_pct(75.0).value(), 2);
        assert_eq!(HeatLevel::from_power_pct(76.0).value(), 3);
        assert_eq!(HeatLevel::from_power_pct(97.0).value(), 3);
    }

    #[test]
    fn heat_level_display() {
        assert_eq!(HeatLevel::new(1).unwrap().to_string(), "I");
        assert_eq!(HeatLevel::new(3).unwrap().to_string(), "III");
    }

    #[test]
    fn heat_level_ordering() {
        assert!(HeatLevel::MIN < HeatLevel::MAX);
    }
}
