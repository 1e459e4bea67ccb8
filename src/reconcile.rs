// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-stove reconciliation loop.
//!
//! Every stove is driven by exactly one [`StoveController`] task that owns
//! the device link, the alert monitors, the consumption accountant and the
//! transition machine. Nothing else touches the link, so no state in the
//! library is shared under a lock. Callers interact through a cloneable
//! [`StoveHandle`]: commands go in over a channel, the aggregate model comes
//! back on a watch channel and edge-triggered events on a broadcast bus.
//!
//! A failed poll skips the cycle: the model flips to offline but keeps its
//! last-known-good telemetry, and the loop simply tries again at the current
//! cadence. Commands are the only operations that report errors to callers.
//!
//! # Examples
//!
//! ```no_run
//! use aduro_lib::config::StoveConfig;
//! use aduro_lib::reconcile::StoveController;
//! # use aduro_lib::link::{DeviceLink, ParamValue};
//! # use aduro_lib::telemetry::TelemetrySnapshot;
//! # use aduro_lib::error::{TransportError, WriteError};
//! # struct MyLink;
//! # impl DeviceLink for MyLink {
//! #     async fn read(&mut self) -> Result<TelemetrySnapshot, TransportError> { todo!() }
//! #     async fn write(&mut self, _: &str, _: ParamValue) -> Result<(), WriteError> { todo!() }
//! # }
//!
//! # async fn demo() -> aduro_lib::Result<()> {
//! let (handle, _task) = StoveController::spawn(StoveConfig::new("hall"), MyLink)?;
//! handle.start().await?;
//! let model = handle.model();
//! println!("stove is {}", model.state_display());
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::alert::{AlertEdge, AlertKind, AlertMonitor};
use crate::command::{ChangeRequest, MaintenanceOp, WriteOp};
use crate::config::StoveConfig;
use crate::consumption::{Accountant, ConsumptionLedger};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::event::{EventBus, StoveEvent, StoveId};
use crate::link::{DeviceLink, ParamValue};
use crate::model::{AlertView, StoveModel};
use crate::telemetry::TelemetrySnapshot;
use crate::transition::{Effect, RequestPlan, TransitionMachine};
use crate::types::{HeatLevel, OperationMode, StateClass, TargetTemperature};

/// Cap on a single poll read.
const POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between the steps of a multi-write plan. The controller applies a
/// mode switch internally before it accepts the dependent value.
const INTER_STEP_DELAY: Duration = Duration::from_secs(1);

/// Command queue depth per stove.
const COMMAND_QUEUE_DEPTH: usize = 16;

enum HandleCommand {
    Change {
        request: ChangeRequest,
        reply: oneshot::Sender<Result<()>>,
    },
    Maintenance {
        op: MaintenanceOp,
        reply: oneshot::Sender<Result<()>>,
    },
    Refill {
        reply: oneshot::Sender<Result<()>>,
    },
    Clean {
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

/// Cloneable front door to one stove controller.
#[derive(Debug, Clone)]
pub struct StoveHandle {
    stove_id: StoveId,
    commands: mpsc::Sender<HandleCommand>,
    model: watch::Receiver<StoveModel>,
    events: EventBus,
}

impl StoveHandle {
    /// The identifier of the stove behind this handle.
    #[must_use]
    pub fn stove_id(&self) -> StoveId {
        self.stove_id
    }

    /// The current aggregate model.
    #[must_use]
    pub fn model(&self) -> StoveModel {
        self.model.borrow().clone()
    }

    /// A watch receiver that yields a fresh model after every poll cycle.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<StoveModel> {
        self.model.clone()
    }

    /// Subscribes to edge-triggered events for this stove.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoveEvent> {
        self.events.subscribe()
    }

    /// Submits a change request and waits for its delivery outcome.
    ///
    /// A returned `Ok` means the command was delivered (or telemetry already
    /// matched); confirmation that the stove actually followed arrives later
    /// as a [`StoveEvent::TransitionConfirmed`].
    ///
    /// # Errors
    ///
    /// [`Error::Dispatch`] when delivery failed terminally and
    /// [`Error::ControllerStopped`] when the controller task is gone.
    pub async fn change(&self, request: ChangeRequest) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(HandleCommand::Change { request, reply })
            .await
            .map_err(|_| Error::ControllerStopped)?;
        rx.await.map_err(|_| Error::ControllerStopped)?
    }

    /// Ignites the stove.
    pub async fn start(&self) -> Result<()> {
        self.change(ChangeRequest::Start).await
    }

    /// Shuts the stove down.
    pub async fn stop(&self) -> Result<()> {
        self.change(ChangeRequest::Stop).await
    }

    /// Switches to heat-level regulation at the given level.
    pub async fn set_heat_level(&self, level: HeatLevel) -> Result<()> {
        self.change(ChangeRequest::SetHeatLevel(level)).await
    }

    /// Switches to temperature regulation at the given target.
    pub async fn set_temperature(&self, target: TargetTemperature) -> Result<()> {
        self.change(ChangeRequest::SetTemperature(target)).await
    }

    /// Switches the regulation mode without changing the associated value.
    pub async fn set_mode(&self, mode: OperationMode) -> Result<()> {
        self.change(ChangeRequest::SetMode(mode)).await
    }

    /// Flips between heat-level and temperature regulation.
    pub async fn toggle_mode(&self) -> Result<()> {
        self.change(ChangeRequest::ToggleMode).await
    }

    /// Forces a single auger feed run. Fire and forget: delivery is retried
    /// but no confirmation is tracked.
    pub async fn force_auger_run(&self) -> Result<()> {
        self.maintenance(MaintenanceOp::ForceAugerRun).await
    }

    /// Writes an arbitrary key path outside the tracked state machine.
    pub async fn set_raw(&self, path: impl Into<String>, value: ParamValue) -> Result<()> {
        self.maintenance(MaintenanceOp::SetRaw { path: path.into(), value }).await
    }

    async fn maintenance(&self, op: MaintenanceOp) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(HandleCommand::Maintenance { op, reply })
            .await
            .map_err(|_| Error::ControllerStopped)?;
        rx.await.map_err(|_| Error::ControllerStopped)?
    }

    /// Reignites the pellet burner after wood burning. Inadmissible unless
    /// the stove is in a wood-eligible state.
    pub async fn resume_after_wood(&self) -> Result<()> {
        self.change(ChangeRequest::ResumeAfterWood).await
    }

    /// Records a hopper refill: the gauge returns to full.
    pub async fn refill_hopper(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(HandleCommand::Refill { reply })
            .await
            .map_err(|_| Error::ControllerStopped)?;
        rx.await.map_err(|_| Error::ControllerStopped)?
    }

    /// Records a stove cleaning: the since-cleaning total restarts.
    pub async fn clean_stove(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(HandleCommand::Clean { reply })
            .await
            .map_err(|_| Error::ControllerStopped)?;
        rx.await.map_err(|_| Error::ControllerStopped)?
    }

    /// Asks the controller task to stop. Pending model and event receivers
    /// see no further updates.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(HandleCommand::Shutdown).await;
    }
}

/// The reconciliation task for one stove.
pub struct StoveController<L: DeviceLink> {
    stove_id: StoveId,
    config: StoveConfig,
    link: L,
    dispatcher: Dispatcher,
    machine: TransitionMachine,
    accountant: Accountant,
    high_smoke: AlertMonitor,
    low_wood: AlertMonitor,
    events: EventBus,
    commands: mpsc::Receiver<HandleCommand>,
    model: watch::Sender<StoveModel>,
    snapshot: Option<TelemetrySnapshot>,
    online: bool,
    last_seen: Option<chrono::DateTime<Utc>>,
    fast_cycles_left: u32,
    followups: VecDeque<ChangeRequest>,
}

impl<L: DeviceLink> StoveController<L> {
    /// Validates the configuration and spawns the controller task.
    ///
    /// The task runs until every [`StoveHandle`] clone is dropped.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when a setting is out of range.
    pub fn spawn(config: StoveConfig, link: L) -> Result<(StoveHandle, JoinHandle<()>)> {
        Self::spawn_with_ledger(config, link, ConsumptionLedger::default())
    }

    /// Like [`spawn`](Self::spawn), resuming consumption totals from a
    /// ledger persisted by a previous run.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when a setting is out of range.
    pub fn spawn_with_ledger(
        config: StoveConfig,
        link: L,
        ledger: ConsumptionLedger,
    ) -> Result<(StoveHandle, JoinHandle<()>)> {
        config.validate().map_err(Error::Config)?;

        let stove_id = StoveId::new();
        let events = EventBus::new();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (model_tx, model_rx) = watch::channel(StoveModel::initial(stove_id, &config.name));

        let controller = Self {
            stove_id,
            dispatcher: Dispatcher::new(config.retry),
            machine: TransitionMachine::new(
                config.transition,
                config.classes.clone(),
                config.auto_resume_after_wood,
            ),
            accountant: Accountant::with_ledger(config.pellets, ledger),
            high_smoke: AlertMonitor::new(config.high_smoke_alert()),
            low_wood: AlertMonitor::new(config.low_wood_alert()),
            events: events.clone(),
            commands: command_rx,
            model: model_tx,
            snapshot: None,
            online: false,
            last_seen: None,
            fast_cycles_left: 0,
            followups: VecDeque::new(),
            config,
            link,
        };

        let handle = StoveHandle {
            stove_id,
            commands: command_tx,
            model: model_rx,
            events,
        };
        let task = tokio::spawn(controller.run());
        Ok((handle, task))
    }

    async fn run(mut self) {
        info!(stove = %self.config.name, stove_id = %self.stove_id, "controller started");
        self.cycle().await;

        loop {
            let interval = self.current_interval();
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(HandleCommand::Shutdown) => {
                            info!(stove = %self.config.name, "shutdown requested");
                            break;
                        }
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                () = tokio::time::sleep(interval) => {
                    self.cycle().await;
                }
            }
        }
        info!(stove = %self.config.name, "all handles dropped, controller stopping");
    }

    fn current_interval(&self) -> Duration {
        if self.machine.wants_fast_polling() || self.fast_cycles_left > 0 {
            self.config.polling.fast_interval
        } else {
            self.config.polling.normal_interval
        }
    }

    async fn handle_command(&mut self, command: HandleCommand) {
        match command {
            HandleCommand::Change { request, reply } => {
                let result = self.submit(request).await;
                let _ = reply.send(result);
            }
            HandleCommand::Maintenance { op, reply } => {
                let write = op.write_op();
                debug!(stove = %self.config.name, op = %write, "maintenance write");
                let result = self
                    .dispatcher
                    .send(&mut self.link, &write)
                    .await
                    .map_err(Error::Dispatch);
                let _ = reply.send(result);
            }
            HandleCommand::Refill { reply } => {
                self.accountant.refill();
                info!(stove = %self.config.name, "hopper refilled");
                self.events.publish(StoveEvent::LedgerChanged { stove_id: self.stove_id });
                self.publish_model();
                let _ = reply.send(Ok(()));
            }
            HandleCommand::Clean { reply } => {
                self.accountant.clean();
                info!(stove = %self.config.name, "stove cleaned");
                self.events.publish(StoveEvent::LedgerChanged { stove_id: self.stove_id });
                self.publish_model();
                let _ = reply.send(Ok(()));
            }
            HandleCommand::Shutdown => {}
        }
    }

    /// Submits a change, dispatching its plan and starting tracking.
    async fn submit(&mut self, request: ChangeRequest) -> Result<()> {
        // Commands need a current picture of the stove to plan against.
        if self.snapshot.is_none() {
            self.cycle().await;
        }
        let Some(snapshot) = self.snapshot.clone() else {
            return Err(Error::Transport(crate::error::TransportError::Unreachable(
                "stove has never been reachable".to_string(),
            )));
        };

        info!(stove = %self.config.name, %request, "change requested");
        match self.machine.request(request, &snapshot, Utc::now()) {
            RequestPlan::AlreadySatisfied(request) => {
                debug!(stove = %self.config.name, %request, "already satisfied");
                Ok(())
            }
            RequestPlan::Rejected(err) => {
                warn!(stove = %self.config.name, error = %err, "request inadmissible");
                Err(Error::Dispatch(err))
            }
            RequestPlan::Dispatch { request, ops } => {
                let result = self.dispatch_plan(&ops).await;
                if let Some(effect) = self.machine.on_dispatched(result.clone()) {
                    self.apply_effect(effect).await;
                }
                self.fast_cycles_left = self.config.polling.fast_cycles_after_command;
                self.publish_model();
                result.map_err(Error::Dispatch).map(|()| {
                    debug!(stove = %self.config.name, %request, "delivered, awaiting confirmation");
                })
            }
        }
    }

    async fn dispatch_plan(
        &mut self,
        ops: &[WriteOp],
    ) -> std::result::Result<(), crate::error::DispatchError> {
        for (index, op) in ops.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(INTER_STEP_DELAY).await;
            }
            self.dispatcher.send(&mut self.link, op).await?;
        }
        Ok(())
    }

    async fn cycle(&mut self) {
        let read = tokio::time::timeout(POLL_TIMEOUT, self.link.read()).await;
        let snapshot = match read {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => {
                warn!(stove = %self.config.name, error = %err, "poll failed");
                self.online = false;
                self.publish_model();
                return;
            }
            Err(_) => {
                warn!(stove = %self.config.name, "poll timed out");
                self.online = false;
                self.publish_model();
                return;
            }
        };

        let now = Utc::now();
        self.online = true;
        self.last_seen = Some(now);

        self.evaluate_alerts(&snapshot, now);
        self.account(&snapshot);

        let effects = self.machine.observe(&snapshot, now);
        self.snapshot = Some(snapshot);
        for effect in effects {
            self.apply_effect(effect).await;
        }
        self.drive_followups().await;

        self.fast_cycles_left = self.fast_cycles_left.saturating_sub(1);
        self.publish_model();
    }

    fn evaluate_alerts(&mut self, snapshot: &TelemetrySnapshot, now: chrono::DateTime<Utc>) {
        if let Some(edge) = self.high_smoke.evaluate(snapshot.smoke_temperature, now) {
            self.publish_alert_edge(AlertKind::HighSmokeTemperature, edge);
        }

        // The low wood monitor only means anything while burning wood.
        if self.config.classes.is_wood(snapshot.state) {
            if let Some(edge) = self.low_wood.evaluate(snapshot.smoke_temperature, now) {
                self.publish_alert_edge(AlertKind::LowWoodTemperature, edge);
            }
        } else if self.low_wood.is_active() || self.low_wood.breaching_since().is_some() {
            self.low_wood.reset();
        }
    }

    fn publish_alert_edge(&self, alert: AlertKind, edge: AlertEdge) {
        let event = match edge {
            AlertEdge::Raised => {
                warn!(stove = %self.config.name, ?alert, "alert raised");
                StoveEvent::AlertRaised { stove_id: self.stove_id, alert }
            }
            AlertEdge::Cleared => {
                info!(stove = %self.config.name, ?alert, "alert cleared");
                StoveEvent::AlertCleared { stove_id: self.stove_id, alert }
            }
        };
        self.events.publish(event);
    }

    fn account(&mut self, snapshot: &TelemetrySnapshot) {
        let outcome = self
            .accountant
            .update(snapshot.total_consumed_kg, Utc::now().date_naive());

        if outcome.counter_reset {
            info!(stove = %self.config.name, "consumption counter moved backwards, rebased");
            self.events.publish(StoveEvent::CounterReset { stove_id: self.stove_id });
        }
        if outcome.credited_kg > 0.0 || outcome.counter_reset {
            self.events.publish(StoveEvent::LedgerChanged { stove_id: self.stove_id });
        }
        if outcome.low_pellet_warning {
            let remaining_pct = self.accountant.remaining_pct();
            warn!(stove = %self.config.name, remaining_pct, "pellet level low");
            self.events.publish(StoveEvent::LowPelletWarning {
                stove_id: self.stove_id,
                remaining_pct,
            });
        }
        if outcome.auto_shutdown {
            warn!(stove = %self.config.name, "pellet level critical, requesting shutdown");
            self.events
                .publish(StoveEvent::AutoShutdownRequested { stove_id: self.stove_id });
            self.followups.push_back(ChangeRequest::Stop);
        }
    }

    async fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Confirmed(request) => {
                info!(stove = %self.config.name, %request, "change confirmed");
                self.events.publish(StoveEvent::TransitionConfirmed {
                    stove_id: self.stove_id,
                    request,
                });
            }
            Effect::Failed { request, reason } => {
                warn!(stove = %self.config.name, %request, %reason, "change failed");
                self.followups.clear();
                self.events.publish(StoveEvent::TransitionFailed {
                    stove_id: self.stove_id,
                    request,
                    reason,
                });
            }
            Effect::Aborted(request) => {
                warn!(stove = %self.config.name, %request, "change aborted by external stop");
                self.followups.clear();
                self.events.publish(StoveEvent::TransitionFailed {
                    stove_id: self.stove_id,
                    request,
                    reason: "stove stopped externally while the change was pending".to_string(),
                });
            }
            Effect::Resend(ops) => {
                debug!(stove = %self.config.name, "no observable change yet, resending");
                let result = self.dispatch_plan(&ops).await;
                if let Some(effect) = self.machine.on_dispatched(result) {
                    Box::pin(self.apply_effect(effect)).await;
                }
            }
            Effect::ExternalChange => {
                info!(stove = %self.config.name, "external change detected, adopting");
                self.events
                    .publish(StoveEvent::ExternalChangeDetected { stove_id: self.stove_id });
            }
            Effect::WoodEntered => {
                info!(stove = %self.config.name, "wood burning started");
                self.events.publish(StoveEvent::WoodModeEntered { stove_id: self.stove_id });
            }
            Effect::WoodExited => {
                info!(stove = %self.config.name, "wood burning ended");
                self.low_wood.reset();
                self.events.publish(StoveEvent::WoodModeExited { stove_id: self.stove_id });
            }
            Effect::AutoResume(requests) => {
                info!(stove = %self.config.name, "resuming pellet operation after wood");
                self.events
                    .publish(StoveEvent::AutoResumeTriggered { stove_id: self.stove_id });
                self.followups.extend(requests);
            }
            Effect::UnknownState(code) => {
                warn!(stove = %self.config.name, %code, "unknown state code reported");
                self.events
                    .publish(StoveEvent::UnknownStateCode { stove_id: self.stove_id, code });
            }
            Effect::StartupTimerFinished => {
                info!(stove = %self.config.name, "ignition phase timer finished");
                self.events
                    .publish(StoveEvent::StartupTimerFinished { stove_id: self.stove_id });
            }
        }
    }

    /// Submits the next queued follow-up request, if the machine is free.
    async fn drive_followups(&mut self) {
        if self.machine.pending_request().is_some() {
            return;
        }
        while let Some(request) = self.followups.pop_front() {
            match Box::pin(self.submit(request.clone())).await {
                Ok(()) => {
                    // A tracked request stays pending until confirmed; stop
                    // here and let its confirmation pull the next one.
                    if self.machine.pending_request().is_some() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(stove = %self.config.name, %request, error = %err,
                        "follow-up request failed");
                    self.followups.clear();
                    break;
                }
            }
        }
    }

    fn publish_model(&mut self) {
        let now = Utc::now();
        let state_class = self
            .snapshot
            .as_ref()
            .map_or(StateClass::Unclassified, |s| self.config.classes.classify(s.state));

        let model = StoveModel {
            stove_id: self.stove_id,
            name: self.config.name.clone(),
            online: self.online,
            snapshot: self.snapshot.clone(),
            state_class,
            phase: self.machine.phase(),
            pending: self.machine.pending_request().cloned(),
            high_smoke_alert: AlertView {
                active: self.high_smoke.is_active(),
                breaching_since: self.high_smoke.breaching_since(),
                threshold: self.config.high_smoke_threshold_c,
                min_duration_secs: i64::try_from(self.config.high_smoke_duration.as_secs())
                    .unwrap_or(i64::MAX),
            },
            low_wood_alert: AlertView {
                active: self.low_wood.is_active(),
                breaching_since: self.low_wood.breaching_since(),
                threshold: self.config.low_wood_threshold_c,
                min_duration_secs: i64::try_from(self.config.low_wood_duration.as_secs())
                    .unwrap_or(i64::MAX),
            },
            ledger: self.accountant.ledger().clone(),
            pellet_remaining_kg: self.accountant.remaining_kg(),
            pellet_remaining_pct: self.accountant.remaining_pct(),
            ignition_timer_secs: self
                .machine
                .ignition_timer_remaining(now)
                .map(|d| d.num_seconds()),
            last_seen: self.last_seen,
        };
        self.model.send_replace(model);
    }
}
