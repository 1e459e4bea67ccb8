// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mode transition tracking.
//!
//! The stove acknowledges nothing: a parameter write either shows up in a
//! later telemetry snapshot or it silently did not take. The
//! [`TransitionMachine`] tracks one in-flight [`ChangeRequest`] at a time,
//! confirms it against polled snapshots, resends on silence, fails on the
//! overall deadline and adopts the observed state when someone changes the
//! stove behind our back (wall panel, vendor app).
//!
//! The machine performs no IO and reads no clock. The reconciliation loop
//! feeds it snapshots and timestamps and executes the [`Effect`]s it
//! returns, which keeps every timing rule unit-testable.

use chrono::{DateTime, Utc};

use crate::command::{ChangeRequest, WriteOp};
use crate::config::TransitionSettings;
use crate::types::{
    HeatLevel, OperationMode, StateClass, StateClasses, StateCode, TargetTemperature,
};
use crate::telemetry::TelemetrySnapshot;

/// State codes whose entry arms the ignition phase timer.
const IGNITION_TIMER_STATES: [u16; 2] = [2, 4];

/// Where the machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPhase {
    /// Nothing pending; telemetry is authoritative.
    Idle,
    /// A change was delivered and awaits confirmation in telemetry.
    AwaitingObservable,
    /// The last change failed terminally. Cleared by the next request or by
    /// an external change.
    Failed,
    /// Telemetry diverged without a local request. Resolves back to idle on
    /// the next poll that shows a stable state.
    ExternalChangeDetected,
}

/// Outcome of submitting a request to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPlan {
    /// Telemetry already shows the requested state; nothing to send.
    AlreadySatisfied(ChangeRequest),
    /// The request is inadmissible in the stove's current state. Nothing
    /// was sent and nothing is tracked.
    Rejected(crate::error::DispatchError),
    /// The ordered writes to dispatch for this request.
    Dispatch {
        /// The resolved request now being tracked.
        request: ChangeRequest,
        /// Writes to deliver, in order.
        ops: Vec<WriteOp>,
    },
}

/// Side effect for the reconciliation loop to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// The tracked request is now visible in telemetry.
    Confirmed(ChangeRequest),
    /// The tracked request failed terminally.
    Failed {
        /// The request that failed.
        request: ChangeRequest,
        /// Why it failed.
        reason: String,
    },
    /// The tracked request was abandoned because the stove shut down
    /// externally while it was pending.
    Aborted(ChangeRequest),
    /// The tracked request went unconfirmed long enough to resend.
    Resend(Vec<WriteOp>),
    /// Telemetry diverged without a local request; observed state adopted.
    ExternalChange,
    /// The stove entered wood burning.
    WoodEntered,
    /// The stove left wood burning.
    WoodExited,
    /// Pellet operation should be restored after wood burnout. The
    /// requests are to be enqueued in order.
    AutoResume(Vec<ChangeRequest>),
    /// A state code outside the classification tables was reported.
    UnknownState(StateCode),
    /// The ignition phase timer ran out.
    StartupTimerFinished,
}

/// The pellet-mode operating point saved before wood burning.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SavedOperation {
    mode: OperationMode,
    heat_level: HeatLevel,
    target_temperature: f64,
}

/// The externally visible settings of the last adopted snapshot. A change in
/// any of them without a local request means someone else (wall panel,
/// vendor app) reconfigured the stove.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ObservedSettings {
    mode: OperationMode,
    heat_level: HeatLevel,
    target_temperature: f64,
}

impl ObservedSettings {
    fn of(snapshot: &TelemetrySnapshot) -> Self {
        Self {
            mode: snapshot.operation_mode,
            heat_level: snapshot.heat_level,
            target_temperature: snapshot.target_temperature,
        }
    }

    fn diverges_from(&self, snapshot: &TelemetrySnapshot) -> bool {
        self.mode != snapshot.operation_mode
            || self.heat_level != snapshot.heat_level
            || (self.target_temperature - snapshot.target_temperature).abs()
                > crate::command::TEMP_CONFIRM_MARGIN_C
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveTransition {
    request: ChangeRequest,
    ops: Vec<WriteOp>,
    requested_at: DateTime<Utc>,
    last_sent_at: DateTime<Utc>,
    resends: u32,
}

/// Tracks in-flight changes and classifies observed state movement.
#[derive(Debug, Clone)]
pub struct TransitionMachine {
    settings: TransitionSettings,
    classes: StateClasses,
    auto_resume: bool,
    phase: TransitionPhase,
    active: Option<ActiveTransition>,
    last_class: Option<StateClass>,
    last_state: Option<StateCode>,
    last_settings: Option<ObservedSettings>,
    unknown_reported: Option<StateCode>,
    saved_operation: Option<SavedOperation>,
    resume_armed: bool,
    ignition_deadline: Option<DateTime<Utc>>,
}

impl TransitionMachine {
    /// Creates an idle machine.
    #[must_use]
    pub fn new(settings: TransitionSettings, classes: StateClasses, auto_resume: bool) -> Self {
        Self {
            settings,
            classes,
            auto_resume,
            phase: TransitionPhase::Idle,
            active: None,
            last_class: None,
            last_state: None,
            last_settings: None,
            unknown_reported: None,
            saved_operation: None,
            resume_armed: false,
            ignition_deadline: None,
        }
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    /// The request currently being tracked, if any.
    #[must_use]
    pub fn pending_request(&self) -> Option<&ChangeRequest> {
        self.active.as_ref().map(|a| &a.request)
    }

    /// Time left on the ignition phase timer, if one is armed.
    #[must_use]
    pub fn ignition_timer_remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.ignition_deadline
            .map(|deadline| (deadline - now).max(chrono::Duration::zero()))
    }

    /// Whether the loop should poll at the fast cadence.
    #[must_use]
    pub fn wants_fast_polling(&self) -> bool {
        self.active.is_some() || self.ignition_deadline.is_some()
    }

    /// Submits a new request, cancelling any prior tracked request.
    ///
    /// Context-dependent requests are resolved against `current` first. The
    /// returned plan is dispatched by the caller, which then reports the
    /// outcome through [`on_dispatched`](Self::on_dispatched).
    pub fn request(
        &mut self,
        request: ChangeRequest,
        current: &TelemetrySnapshot,
        now: DateTime<Utc>,
    ) -> RequestPlan {
        // A newer request supersedes whatever was pending.
        self.active = None;

        // Wood mode is entered by loading wood, never by a mode write.
        if request == ChangeRequest::ToggleMode
            && current.operation_mode == OperationMode::Wood
        {
            return RequestPlan::Rejected(crate::error::DispatchError::Rejected {
                path: crate::command::PATH_OPERATION_MODE.to_string(),
                reason: "mode toggling is unavailable while burning wood".to_string(),
            });
        }

        let request = request.resolve(current);
        if request == ChangeRequest::ResumeAfterWood
            && !self.classes.is_wood(current.state)
        {
            return RequestPlan::Rejected(crate::error::DispatchError::Rejected {
                path: crate::command::PATH_START.to_string(),
                reason: format!(
                    "resume is only admissible from a wood burning state, stove reports {}",
                    current.state
                ),
            });
        }
        if request.is_satisfied_by(current, &self.classes) {
            self.phase = TransitionPhase::Idle;
            return RequestPlan::AlreadySatisfied(request);
        }

        let ops = request.plan(current);
        self.active = Some(ActiveTransition {
            request: request.clone(),
            ops: ops.clone(),
            requested_at: now,
            last_sent_at: now,
            resends: 0,
        });
        self.phase = TransitionPhase::AwaitingObservable;
        RequestPlan::Dispatch { request, ops }
    }

    /// Reports the dispatch outcome for the tracked request.
    ///
    /// A delivery failure ends the transition immediately; confirmation
    /// tracking only begins once every write in the plan was delivered.
    pub fn on_dispatched(
        &mut self,
        result: Result<(), crate::error::DispatchError>,
    ) -> Option<Effect> {
        let Err(err) = result else {
            return None;
        };
        let active = self.active.take()?;
        self.phase = TransitionPhase::Failed;
        Some(Effect::Failed { request: active.request, reason: err.to_string() })
    }

    /// Feeds one polled snapshot into the machine.
    ///
    /// Effects come back in occurrence order and each occurrence is
    /// reported exactly once.
    pub fn observe(&mut self, snapshot: &TelemetrySnapshot, now: DateTime<Utc>) -> Vec<Effect> {
        let mut effects = Vec::new();
        let class = self.classes.classify(snapshot.state);
        let state_changed = self.last_state != Some(snapshot.state);

        if class == StateClass::Unclassified {
            if state_changed && self.unknown_reported != Some(snapshot.state) {
                self.unknown_reported = Some(snapshot.state);
                effects.push(Effect::UnknownState(snapshot.state));
            }
        } else {
            self.unknown_reported = None;
        }

        self.observe_wood(class, &mut effects);
        let had_active = self.active.is_some();
        self.observe_active(snapshot, class, now, &mut effects);
        // A class change while a request was pending is explained by that
        // request (confirmed, aborted or failed), never by a third party.
        if !had_active {
            self.observe_external(snapshot, class, &mut effects);
        }
        self.observe_ignition(snapshot.state, class, state_changed, now, &mut effects);

        if snapshot.operation_mode.is_pellet() && class != StateClass::Wood {
            self.saved_operation = Some(SavedOperation {
                mode: snapshot.operation_mode,
                heat_level: snapshot.heat_level,
                target_temperature: snapshot.target_temperature,
            });
        }

        self.last_class = Some(class);
        self.last_state = Some(snapshot.state);
        self.last_settings = Some(ObservedSettings::of(snapshot));
        effects
    }

    fn observe_wood(&mut self, class: StateClass, effects: &mut Vec<Effect>) {
        let was_wood = self.last_class == Some(StateClass::Wood);
        if class == StateClass::Wood && !was_wood {
            effects.push(Effect::WoodEntered);
            // One auto resume per wood session.
            self.resume_armed = true;
        } else if class != StateClass::Wood && was_wood {
            effects.push(Effect::WoodExited);
            if self.auto_resume && self.resume_armed {
                self.resume_armed = false;
                effects.push(Effect::AutoResume(self.resume_requests()));
            }
        }
    }

    fn resume_requests(&self) -> Vec<ChangeRequest> {
        let mut requests = vec![ChangeRequest::Start];
        if let Some(saved) = self.saved_operation {
            let restore = match saved.mode {
                OperationMode::Temperature => TargetTemperature::new(saved.target_temperature)
                    .map(ChangeRequest::SetTemperature)
                    .ok(),
                _ => Some(ChangeRequest::SetHeatLevel(saved.heat_level)),
            };
            requests.extend(restore);
        }
        requests
    }

    fn observe_active(
        &mut self,
        snapshot: &TelemetrySnapshot,
        class: StateClass,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) {
        enum Verdict {
            Confirmed,
            Aborted,
            TimedOut,
            Resend,
            Exhausted,
            Pending,
        }

        let Some(active) = self.active.as_ref() else {
            return;
        };

        // An external stop invalidates a pending change to a running stove.
        let entered_shutdown = class == StateClass::Shutdown
            && self.last_class.is_some_and(|c| c != StateClass::Shutdown);

        let verdict = if active.request.is_satisfied_by(snapshot, &self.classes) {
            Verdict::Confirmed
        } else if entered_shutdown && !active.request.is_stop() {
            Verdict::Aborted
        } else if now - active.requested_at >= to_chrono(self.settings.overall_timeout) {
            Verdict::TimedOut
        } else if now - active.last_sent_at >= to_chrono(self.settings.resend_after) {
            if active.resends < self.settings.max_resends {
                Verdict::Resend
            } else {
                Verdict::Exhausted
            }
        } else {
            Verdict::Pending
        };

        match verdict {
            Verdict::Pending => {}
            Verdict::Resend => {
                if let Some(active) = self.active.as_mut() {
                    active.resends += 1;
                    active.last_sent_at = now;
                    effects.push(Effect::Resend(active.ops.clone()));
                }
            }
            Verdict::Confirmed | Verdict::Aborted | Verdict::TimedOut | Verdict::Exhausted => {
                if let Some(active) = self.active.take() {
                    match verdict {
                        Verdict::Confirmed => {
                            self.phase = TransitionPhase::Idle;
                            effects.push(Effect::Confirmed(active.request));
                        }
                        Verdict::Aborted => {
                            self.phase = TransitionPhase::Idle;
                            effects.push(Effect::Aborted(active.request));
                        }
                        Verdict::TimedOut => {
                            self.phase = TransitionPhase::Failed;
                            effects.push(Effect::Failed {
                                request: active.request,
                                reason: format!(
                                    "no observable change within {} s",
                                    self.settings.overall_timeout.as_secs()
                                ),
                            });
                        }
                        _ => {
                            self.phase = TransitionPhase::Failed;
                            effects.push(Effect::Failed {
                                request: active.request,
                                reason: "resend budget exhausted without confirmation"
                                    .to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    fn observe_external(
        &mut self,
        snapshot: &TelemetrySnapshot,
        class: StateClass,
        effects: &mut Vec<Effect>,
    ) {
        if self.active.is_some() || class == StateClass::Unclassified {
            return;
        }
        // Wood entry and exit are reported through their own events, and
        // the settings flip they carry is no third party either.
        let wood_boundary =
            class == StateClass::Wood || self.last_class == Some(StateClass::Wood);
        let diverged = !wood_boundary
            && (self.last_class.is_some_and(|last| last != class)
                || self.last_settings.is_some_and(|last| last.diverges_from(snapshot)));
        if diverged {
            if self.phase != TransitionPhase::ExternalChangeDetected {
                effects.push(Effect::ExternalChange);
            }
            self.phase = TransitionPhase::ExternalChangeDetected;
        } else if self.phase == TransitionPhase::ExternalChangeDetected {
            // State held steady for one poll; the adopted state is now ours.
            self.phase = TransitionPhase::Idle;
        }
    }

    fn observe_ignition(
        &mut self,
        state: StateCode,
        class: StateClass,
        state_changed: bool,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) {
        if state_changed && IGNITION_TIMER_STATES.contains(&state.0) {
            self.ignition_deadline = Some(now + to_chrono(self.settings.startup_timer));
        } else if class != StateClass::Startup {
            self.ignition_deadline = None;
        } else if let Some(deadline) = self.ignition_deadline
            && now >= deadline
        {
            self.ignition_deadline = None;
            effects.push(Effect::StartupTimerFinished);
        }
    }
}

fn to_chrono(duration: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}
