// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device link abstraction.
//!
//! The reconciliation loop never talks to a transport directly. It drives a
//! [`DeviceLink`], which a transport crate (or a test double) implements.
//! Reads yield a complete [`TelemetrySnapshot`]; writes set one parameter at
//! a time by key path.

use std::fmt;
use std::future::Future;

use crate::error::{TransportError, WriteError};
use crate::telemetry::TelemetrySnapshot;

/// Connection to a single stove.
///
/// Implementations are expected to be cheap to call repeatedly: the loop
/// polls [`read`](DeviceLink::read) every few seconds. Transient failures
/// should surface as [`TransportError`] rather than being retried inside the
/// link; retry policy lives in the dispatcher.
pub trait DeviceLink: Send + 'static {
    /// Read a complete telemetry snapshot from the stove.
    fn read(&mut self) -> impl Future<Output = Result<TelemetrySnapshot, TransportError>> + Send;

    /// Write a single parameter identified by its key path, e.g.
    /// `"regulation.fixed_power"`.
    fn write(
        &mut self,
        path: &str,
        value: ParamValue,
    ) -> impl Future<Output = Result<(), WriteError>> + Send;
}

/// A value written to a stove parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer parameter, e.g. an operation mode code.
    Int(i64),
    /// Floating point parameter, e.g. a target temperature.
    Float(f64),
}

impl ParamValue {
    /// The value as an integer, truncating floats.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Int(v) => *v,
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(v) => *v as i64,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
