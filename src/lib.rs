// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # aduro_lib
//!
//! An async Rust library for supervising Aduro pellet stoves.
//!
//! The stove's controller offers no request acknowledgements and no push
//! notifications: you write parameters, poll telemetry and infer what
//! happened. This library wraps that into a reconciliation loop per stove
//! that owns the device link, tracks requested changes until they become
//! observable, watches for alert conditions, accounts pellet consumption
//! and publishes one coherent model per poll cycle.
//!
//! ## Features
//!
//! - **Change tracking**: commands confirm against polled telemetry, resend
//!   on silence and fail on a hard deadline
//! - **External change detection**: wall panel and vendor app changes are
//!   adopted and reported, never fought
//! - **Hysteresis alerts**: debounced high smoke and low wood temperature
//!   monitors with immediate clearing
//! - **Consumption accounting**: daily, monthly and yearly totals plus a
//!   hopper gauge derived from the lifetime counter, tolerant of counter
//!   resets
//! - **Wood mode**: entry and exit reporting, with optional automatic
//!   resume of the saved pellet operating point
//! - **Single-owner concurrency**: one task per stove, no shared locks;
//!   observers get a watch channel and a broadcast event bus
//!
//! ## Quick Start
//!
//! ```no_run
//! use aduro_lib::config::StoveConfig;
//! use aduro_lib::reconcile::StoveController;
//! use aduro_lib::types::HeatLevel;
//! # use aduro_lib::link::{DeviceLink, ParamValue};
//! # use aduro_lib::telemetry::TelemetrySnapshot;
//! # use aduro_lib::error::{TransportError, WriteError};
//! # struct UdpLink;
//! # impl DeviceLink for UdpLink {
//! #     async fn read(&mut self) -> Result<TelemetrySnapshot, TransportError> { todo!() }
//! #     async fn write(&mut self, _: &str, _: ParamValue) -> Result<(), WriteError> { todo!() }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> aduro_lib::Result<()> {
//!     let config = StoveConfig::new("living room").with_auto_resume_after_wood(true);
//!     let (stove, _task) = StoveController::spawn(config, UdpLink)?;
//!
//!     let mut events = stove.subscribe();
//!     stove.start().await?;
//!     stove.set_heat_level(HeatLevel::new(2)?).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! [`reconcile::StoveController`] runs the loop and owns every mutable
//! piece: the [`link::DeviceLink`], the [`transition::TransitionMachine`],
//! the [`alert::AlertMonitor`]s and the [`consumption::Accountant`]. The
//! cloneable [`reconcile::StoveHandle`] is the only public surface; it
//! speaks to the loop over channels. The decision logic itself is pure and
//! clock-free, which is what the unit tests exercise.

pub mod alert;
pub mod command;
pub mod config;
pub mod consumption;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod link;
pub mod model;
pub mod reconcile;
pub mod telemetry;
pub mod transition;
pub mod types;

pub use command::ChangeRequest;
pub use config::StoveConfig;
pub use error::{Error, Result};
pub use event::{EventBus, StoveEvent, StoveId};
pub use link::{DeviceLink, ParamValue};
pub use model::StoveModel;
pub use reconcile::{StoveController, StoveHandle};
pub use telemetry::TelemetrySnapshot;
pub use types::{HeatLevel, OperationMode, StateClass, StateCode, TargetTemperature};
