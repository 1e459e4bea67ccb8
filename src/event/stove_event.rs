// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events emitted by a stove controller.

use crate::alert::AlertKind;
use crate::command::ChangeRequest;
use crate::event::StoveId;
use crate::types::StateCode;

/// Something noteworthy happened on a stove.
///
/// Events cover edge-triggered occurrences only: one event per occurrence,
/// never repeated while a condition merely persists. Continuous state lives
/// in the model published on the controller's watch channel.
#[derive(Debug, Clone, PartialEq)]
pub enum StoveEvent {
    /// A requested change was confirmed in polled telemetry.
    TransitionConfirmed {
        /// The stove this event belongs to.
        stove_id: StoveId,
        /// The confirmed request.
        request: ChangeRequest,
    },

    /// A requested change did not become observable in time, or its
    /// delivery failed terminally.
    TransitionFailed {
        /// The stove this event belongs to.
        stove_id: StoveId,
        /// The failed request.
        request: ChangeRequest,
        /// Human-readable failure description.
        reason: String,
    },

    /// Telemetry diverged from the tracked expectation without a local
    /// request explaining it. The observed state has been adopted.
    ExternalChangeDetected {
        /// The stove this event belongs to.
        stove_id: StoveId,
    },

    /// The stove entered wood burning.
    WoodModeEntered {
        /// The stove this event belongs to.
        stove_id: StoveId,
    },

    /// The stove left wood burning.
    WoodModeExited {
        /// The stove this event belongs to.
        stove_id: StoveId,
    },

    /// Pellet operation was resumed automatically after wood burned out.
    AutoResumeTriggered {
        /// The stove this event belongs to.
        stove_id: StoveId,
    },

    /// An alert condition held for its full debounce window.
    AlertRaised {
        /// The stove this event belongs to.
        stove_id: StoveId,
        /// Which monitor raised.
        alert: AlertKind,
    },

    /// A raised alert condition went away.
    AlertCleared {
        /// The stove this event belongs to.
        stove_id: StoveId,
        /// Which monitor cleared.
        alert: AlertKind,
    },

    /// The hopper gauge crossed the notification level.
    LowPelletWarning {
        /// The stove this event belongs to.
        stove_id: StoveId,
        /// Pellets remaining, as a percentage of capacity.
        remaining_pct: f64,
    },

    /// The hopper gauge crossed the shutdown level and an automatic stop
    /// was enqueued.
    AutoShutdownRequested {
        /// The stove this event belongs to.
        stove_id: StoveId,
    },

    /// The lifetime consumption counter moved backwards and was rebased.
    CounterReset {
        /// The stove this event belongs to.
        stove_id: StoveId,
    },

    /// The consumption ledger changed. Embedders persisting the ledger can
    /// read the new one from the model on this signal.
    LedgerChanged {
        /// The stove this event belongs to.
        stove_id: StoveId,
    },

    /// The stove reported a state code outside the classification tables.
    UnknownStateCode {
        /// The stove this event belongs to.
        stove_id: StoveId,
        /// The raw state code.
        code: StateCode,
    },

    /// An ignition phase timer ran out.
    StartupTimerFinished {
        /// The stove this event belongs to.
        stove_id: StoveId,
    },
}

impl StoveEvent {
    /// The stove this event belongs to.
    #[must_use]
    pub fn stove_id(&self) -> StoveId {
        match self {
            Self::TransitionConfirmed { stove_id, .. }
            | Self::TransitionFailed { stove_id, .. }
            | Self::ExternalChangeDetected { stove_id }
            | Self::WoodModeEntered { stove_id }
            | Self::WoodModeExited { stove_id }
            | Self::AutoResumeTriggered { stove_id }
            | Self::AlertRaised { stove_id, .. }
            | Self::AlertCleared { stove_id, .. }
            | Self::LowPelletWarning { stove_id, .. }
            | Self::AutoShutdownRequested { stove_id }
            | Self::CounterReset { stove_id }
            | Self::LedgerChanged { stove_id }
            | Self::UnknownStateCode { stove_id, .. }
            | Self::StartupTimerFinished { stove_id } => *stove_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stove_id_accessor_covers_variants() {
        let id = StoveId::new();
        let events = [
            StoveEvent::ExternalChangeDetected { stove_id: id },
            StoveEvent::AlertRaised { stove_id: id, alert: AlertKind::HighSmokeTemperature },
            StoveEvent::UnknownStateCode { stove_id: id, code: StateCode(47) },
        ];
        for event in events {
            assert_eq!(event.stove_id(), id);
        }
    }
}
