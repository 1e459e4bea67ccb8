// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numeric burner state codes and their classification.
//!
//! The burner firmware reports its operating phase as a numeric state code
//! plus a substate code. The set of codes grows with firmware revisions, so
//! the display-label tables here are deliberately partial: an unknown code is
//! not an error, the raw number stays available and label lookup simply
//! returns `None`.
//!
//! Control logic never branches on whether a code is "known" — only on its
//! [`StateClass`], a small closed classification populated from
//! [`StateClasses`] configuration data.

use std::collections::BTreeSet;
use std::fmt;

/// Raw burner state code as reported by the stove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StateCode(pub u16);

impl StateCode {
    /// Returns the display label for known codes.
    ///
    /// Returns `None` for codes absent from the mapping; presentation layers
    /// fall back to a generic placeholder while the numeric code remains
    /// exposed.
    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        match self.0 {
            0 | 2 | 4 | 5 => Some("Operating"),
            6 | 13 | 20 | 28 | 34 => Some("Stopped"),
            9 | 14 => Some("Off"),
            32 => Some("Operating III"),
            _ => None,
        }
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for StateCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

/// Raw burner substate code as reported by the stove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SubstateCode(pub u16);

impl SubstateCode {
    /// Returns the display label for known substate codes, `None` otherwise.
    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        match self.0 {
            0 => Some("Waiting"),
            2 => Some("Ignition 1"),
            4 => Some("Ignition 2"),
            5 => Some("Normal"),
            6 => Some("Room temperature reached"),
            9 => Some("Wood burning"),
            13 => Some("Failed ignition - check burner for pellet accumulation"),
            14 => Some("By button"),
            20 => Some("No fuel"),
            32 => Some("Heating up"),
            34 => Some("Check burn cup"),
            _ => None,
        }
    }
}

impl fmt::Display for SubstateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for SubstateCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

/// Classification of a state code for control decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    /// The stove is starting or running on pellets.
    Startup,
    /// The stove is stopped or shutting down.
    Shutdown,
    /// The stove is in manual wood burning.
    Wood,
    /// The code belongs to none of the configured sets.
    Unclassified,
}

/// Configurable sets assigning state codes to classifications.
///
/// The defaults match the Aduro H-series firmware; deployments tracking a
/// newer firmware can extend the sets without touching control logic.
///
/// # Examples
///
/// ```
/// use aduro_lib::types::{StateClass, StateClasses, StateCode};
///
/// let classes = StateClasses::default();
/// assert_eq!(classes.classify(StateCode(2)), StateClass::Startup);
/// assert_eq!(classes.classify(StateCode(9)), StateClass::Wood);
/// assert_eq!(classes.classify(StateCode(99)), StateClass::Unclassified);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct StateClasses {
    /// Codes meaning the stove is starting or operating.
    pub startup: BTreeSet<u16>,
    /// Codes meaning the stove is stopped or stopping.
    pub shutdown: BTreeSet<u16>,
    /// Codes meaning manual wood burning.
    pub wood: BTreeSet<u16>,
}

impl StateClasses {
    /// Classifies a state code.
    ///
    /// Wood wins over shutdown: the firmware lists wood-burning states among
    /// the "off" codes because the pellet burner is idle, but for control
    /// purposes wood mode is its own regime.
    #[must_use]
    pub fn classify(&self, code: StateCode) -> StateClass {
        if self.wood.contains(&code.0) {
            StateClass::Wood
        } else if self.startup.contains(&code.0) {
            StateClass::Startup
        } else if self.shutdown.contains(&code.0) {
            StateClass::Shutdown
        } else {
            StateClass::Unclassified
        }
    }

    /// Returns `true` if the code means the pellet burner is running.
    #[must_use]
    pub fn is_startup(&self, code: StateCode) -> bool {
        self.classify(code) == StateClass::Startup
    }

    /// Returns `true` if the code means the stove is stopped or stopping.
    #[must_use]
    pub fn is_shutdown(&self, code: StateCode) -> bool {
        self.classify(code) == StateClass::Shutdown
    }

    /// Returns `true` if the code means manual wood burning.
    #[must_use]
    pub fn is_wood(&self, code: StateCode) -> bool {
        self.classify(code) == StateClass::Wood
    }
}

impl Default for StateClasses {
    fn default() -> Self {
        Self {
            startup: BTreeSet::from([0, 2, 4, 5, 32]),
            shutdown: BTreeSet::from([6, 13, 20, 28, 34]),
            wood: BTreeSet::from([9, 14]),
        }
    }
}
