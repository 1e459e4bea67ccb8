// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stove identifiers, event types and the broadcast bus.

mod event_bus;
mod stove_event;
mod stove_id;

pub use event_bus::EventBus;
pub use stove_event::StoveEvent;
pub use stove_id::StoveId;
