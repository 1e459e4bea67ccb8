// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the Aduro library.
//!
//! This module provides the error hierarchy for failures across the library:
//! configuration validation, value constraints, link transport failures, and
//! command dispatch outcomes.
//!
//! Only [`DispatchError::Rejected`] and [`DispatchError::Exhausted`] are
//! actionable failures for callers. Transport failures during polling are
//! absorbed by the reconciliation loop, which retains the last-known-good
//! model and retries at the current cadence.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration was invalid at construction time.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while communicating with the stove link.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A command could not be delivered to the stove.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// The controller task for this stove has stopped.
    #[error("stove controller is no longer running")]
    ControllerStopped,
}

/// Errors in the stove configuration, detected at startup.
///
/// These are the only fatal errors in the library: a controller refuses to
/// start with an out-of-range threshold rather than running with it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A temperature threshold is outside its allowed range.
    #[error("{name}: {actual} °C is out of range [{min}, {max}] °C")]
    ThresholdOutOfRange {
        /// Name of the offending setting.
        name: &'static str,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
        /// The actual value that was provided.
        actual: f64,
    },

    /// A duration threshold is outside its allowed range.
    #[error("{name}: {actual_secs} s is out of range [{min_secs}, {max_secs}] s")]
    DurationOutOfRange {
        /// Name of the offending setting.
        name: &'static str,
        /// Minimum allowed value in seconds.
        min_secs: u64,
        /// Maximum allowed value in seconds.
        max_secs: u64,
        /// The actual value that was provided, in seconds.
        actual_secs: u64,
    },

    /// A percentage setting is outside 0-100.
    #[error("{name}: {actual}% is not a valid percentage")]
    InvalidPercentage {
        /// Name of the offending setting.
        name: &'static str,
        /// The actual value that was provided.
        actual: f64,
    },

    /// The pellet hopper capacity is outside the supported hopper sizes.
    #[error("pellet capacity {0} kg is out of range [8, 25] kg")]
    InvalidCapacity(f64),

    /// A polling interval or timeout is zero.
    #[error("{0} must be a non-zero duration")]
    ZeroDuration(&'static str),
}

/// Errors related to value validation and constraints.
///
/// These errors occur when attempting to create constrained types
/// with invalid values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A heat level outside 1-3 was provided.
    #[error("heat level {0} is out of range [1, 3]")]
    InvalidHeatLevel(u8),

    /// A target temperature outside the supported range was provided.
    #[error("target temperature {actual} °C is out of range [{min}, {max}] °C")]
    TemperatureOutOfRange {
        /// Minimum allowed temperature.
        min: f64,
        /// Maximum allowed temperature.
        max: f64,
        /// The actual value that was provided.
        actual: f64,
    },

    /// An unknown operation mode code was provided.
    #[error("invalid operation mode code: {0}")]
    InvalidOperationMode(u8),
}

/// Errors reported by the device link.
///
/// Transport failures are never fatal: a failed poll skips the cycle and the
/// loop retries at the current cadence, and a failed write counts as one
/// attempt toward the dispatcher's retry budget.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The stove could not be reached on the network.
    #[error("stove unreachable: {0}")]
    Unreachable(String),

    /// The request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The link reported a failure it could not classify further.
    #[error("link failure: {0}")]
    Link(String),
}

/// Errors returned by [`DeviceLink::write`](crate::link::DeviceLink::write).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// The write could not be delivered.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The stove explicitly refused the value.
    #[error("command rejected by stove: {0}")]
    Rejected(String),
}

/// Terminal outcome of a failed command dispatch.
///
/// The caller can distinguish a semantic refusal (no point retrying) from an
/// exhausted retry budget, and via [`DispatchError::is_unreachable`] whether
/// the budget was spent on an unreachable stove rather than slow responses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The stove explicitly refused the command. Not retried.
    #[error("command {path} rejected by stove: {reason}")]
    Rejected {
        /// The key-path of the refused command.
        path: String,
        /// The stove's refusal message.
        reason: String,
    },

    /// All delivery attempts failed.
    #[error("command {path} failed after {attempts} attempts: {last}")]
    Exhausted {
        /// The key-path of the failed command.
        path: String,
        /// Number of attempts made.
        attempts: u32,
        /// The transport error from the final attempt.
        last: TransportError,
    },
}

impl DispatchError {
    /// Returns `true` if the final failure was an unreachable stove.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Exhausted {
                last: TransportError::Unreachable(_),
                ..
            }
        )
    }

    /// Returns `true` if the stove refused the command.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::InvalidHeatLevel(4);
        assert_eq!(err.to_string(), "heat level 4 is out of range [1, 3]");
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::ThresholdOutOfRange {
            name: "high_smoke_threshold",
            min: 300.0,
            max: 450.0,
            actual: 500.0,
        };
        assert_eq!(
            err.to_string(),
            "high_smoke_threshold: 500 °C is out of range [300, 450] °C"
        );
    }

    #[test]
    fn error_from_value_error() {
        let value_err = ValueError::InvalidHeatLevel(0);
        let err: Error = value_err.into();
        assert!(matches!(err, Error::Value(ValueError::InvalidHeatLevel(0))));
    }

    #[test]
    fn dispatch_error_unreachable_classification() {
        let exhausted = DispatchError::Exhausted {
            path: "misc.start".to_string(),
            attempts: 3,
            last: TransportError::Unreachable("no route".to_string()),
        };
        assert!(exhausted.is_unreachable());
        assert!(!exhausted.is_rejected());

        let timed_out = DispatchError::Exhausted {
            path: "misc.start".to_string(),
            attempts: 3,
            last: TransportError::Timeout(5000),
        };
        assert!(!timed_out.is_unreachable());

        let rejected = DispatchError::Rejected {
            path: "boiler.temp".to_string(),
            reason: "out of range".to_string(),
        };
        assert!(rejected.is_rejected());
        assert!(!rejected.is_unreachable());
    }

    #[test]
    fn write_error_from_transport() {
        let err: WriteError = TransportError::Timeout(1000).into();
        assert!(matches!(err, WriteError::Transport(_)));
    }
}
