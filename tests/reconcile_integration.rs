// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests driving a controller against a simulated stove.
//!
//! The simulator applies parameter writes to its own telemetry the way the
//! real controller board does, so confirmation, abort and follow-up logic
//! run against realistic feedback. All tests run on a paused tokio clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use aduro_lib::command::{ChangeRequest, PATH_BOILER_TEMP, PATH_OPERATION_MODE, PATH_START, PATH_STOP};
use aduro_lib::config::StoveConfig;
use aduro_lib::error::{Error, TransportError, WriteError};
use aduro_lib::event::StoveEvent;
use aduro_lib::link::{DeviceLink, ParamValue};
use aduro_lib::reconcile::StoveController;
use aduro_lib::telemetry::TelemetrySnapshot;
use aduro_lib::transition::TransitionPhase;
use aduro_lib::types::{HeatLevel, OperationMode, StateCode, TargetTemperature};

/// How the simulator responds to writes.
#[derive(Clone, Copy, PartialEq)]
enum WriteMode {
    /// Apply the write to the simulated telemetry and succeed.
    Apply,
    /// Succeed without applying anything.
    Silent,
    /// Fail with a transport error.
    FailTransport,
    /// Refuse the value.
    Reject,
}

struct Sim {
    snapshot: TelemetrySnapshot,
    writes: Vec<(String, ParamValue)>,
    write_mode: WriteMode,
    fail_reads: bool,
}

impl Sim {
    fn apply(&mut self, path: &str, value: ParamValue) {
        match path {
            PATH_START => self.snapshot.state = StateCode(5),
            PATH_STOP => self.snapshot.state = StateCode(6),
            PATH_OPERATION_MODE => {
                if let Ok(code) = u8::try_from(value.as_i64())
                    && let Ok(mode) = OperationMode::from_code(code)
                {
                    self.snapshot.operation_mode = mode;
                }
            }
            PATH_BOILER_TEMP => {
                if let ParamValue::Float(celsius) = value {
                    self.snapshot.target_temperature = celsius;
                }
            }
            "regulation.fixed_power" => {
                #[allow(clippy::cast_precision_loss)]
                let pct = value.as_i64() as f64;
                self.snapshot.heat_level = HeatLevel::from_power_pct(pct);
            }
            _ => {}
        }
    }
}

#[derive(Clone)]
struct SimLink(Arc<Mutex<Sim>>);

impl SimLink {
    fn new(snapshot: TelemetrySnapshot) -> Self {
        Self(Arc::new(Mutex::new(Sim {
            snapshot,
            writes: Vec::new(),
            write_mode: WriteMode::Apply,
            fail_reads: false,
        })))
    }

    fn set_state(&self, code: u16) {
        self.0.lock().unwrap().snapshot.state = StateCode(code);
    }

    fn set_total_consumed(&self, kg: f64) {
        self.0.lock().unwrap().snapshot.total_consumed_kg = kg;
    }

    fn set_heat_level(&self, level: u8) {
        self.0.lock().unwrap().snapshot.heat_level = HeatLevel::new(level).unwrap();
    }

    fn set_write_mode(&self, mode: WriteMode) {
        self.0.lock().unwrap().write_mode = mode;
    }

    fn set_fail_reads(&self, fail: bool) {
        self.0.lock().unwrap().fail_reads = fail;
    }

    fn writes(&self) -> Vec<(String, ParamValue)> {
        self.0.lock().unwrap().writes.clone()
    }
}

impl DeviceLink for SimLink {
    async fn read(&mut self) -> Result<TelemetrySnapshot, TransportError> {
        let sim = self.0.lock().unwrap();
        if sim.fail_reads {
            return Err(TransportError::Unreachable("simulated outage".to_string()));
        }
        let mut snapshot = sim.snapshot.clone();
        snapshot.taken_at = Utc::now();
        Ok(snapshot)
    }

    async fn write(&mut self, path: &str, value: ParamValue) -> Result<(), WriteError> {
        let mut sim = self.0.lock().unwrap();
        sim.writes.push((path.to_string(), value));
        match sim.write_mode {
            WriteMode::Apply => {
                sim.apply(path, value);
                Ok(())
            }
            WriteMode::Silent => Ok(()),
            WriteMode::FailTransport => Err(WriteError::Transport(TransportError::Unreachable(
                "simulated outage".to_string(),
            ))),
            WriteMode::Reject => Err(WriteError::Rejected("value refused".to_string())),
        }
    }
}

fn stopped_stove() -> TelemetrySnapshot {
    TelemetrySnapshot {
        state: StateCode(6),
        smoke_temperature: 20.0,
        ..TelemetrySnapshot::default()
    }
}

fn running_stove() -> TelemetrySnapshot {
    TelemetrySnapshot {
        state: StateCode(5),
        operation_mode: OperationMode::HeatLevel,
        heat_level: HeatLevel::new(2).unwrap(),
        smoke_temperature: 180.0,
        ..TelemetrySnapshot::default()
    }
}

async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<StoveEvent>) -> StoveEvent {
    tokio::time::timeout(Duration::from_secs(600), rx.recv())
        .await
        .expect("no event within virtual timeout")
        .expect("event stream closed")
}

/// Skips ledger bookkeeping noise and returns the first event matching the
/// predicate.
async fn event_matching(
    rx: &mut tokio::sync::broadcast::Receiver<StoveEvent>,
    matches: impl Fn(&StoveEvent) -> bool,
) -> StoveEvent {
    loop {
        let event = next_event(rx).await;
        if matches(&event) {
            return event;
        }
        assert!(
            matches!(event, StoveEvent::LedgerChanged { .. }),
            "unexpected event before the awaited one: {event:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn initial_poll_populates_the_model() {
    let link = SimLink::new(running_stove());
    let (stove, task) = StoveController::spawn(StoveConfig::new("test"), link).unwrap();

    let mut watch = stove.watch();
    let model = watch
        .wait_for(|m| m.online)
        .await
        .expect("controller gone")
        .clone();

    assert_eq!(model.state_display(), "Operating");
    assert_eq!(model.phase, TransitionPhase::Idle);
    assert!(model.last_seen.is_some());

    drop(stove);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn start_is_delivered_and_confirmed() {
    let link = SimLink::new(stopped_stove());
    let (stove, _task) = StoveController::spawn(StoveConfig::new("test"), link.clone()).unwrap();
    let mut events = stove.subscribe();

    stove.start().await.unwrap();
    assert_eq!(
        link.writes(),
        vec![(PATH_START.to_string(), ParamValue::Int(1))]
    );

    assert_eq!(
        next_event(&mut events).await,
        StoveEvent::TransitionConfirmed {
            stove_id: stove.stove_id(),
            request: ChangeRequest::Start,
        }
    );

    let model = stove
        .watch()
        .wait_for(|m| m.phase == TransitionPhase::Idle && m.is_burning())
        .await
        .unwrap()
        .clone();
    assert!(model.pending.is_none());
}

#[tokio::test(start_paused = true)]
async fn set_temperature_switches_mode_first_and_rounds_trip() {
    let link = SimLink::new(running_stove());
    let (stove, _task) = StoveController::spawn(StoveConfig::new("test"), link.clone()).unwrap();

    let target = TargetTemperature::new(22.0).unwrap();
    stove.set_temperature(target).await.unwrap();

    assert_eq!(
        link.writes(),
        vec![
            (PATH_OPERATION_MODE.to_string(), ParamValue::Int(1)),
            (PATH_BOILER_TEMP.to_string(), ParamValue::Float(22.0)),
        ]
    );

    let model = stove
        .watch()
        .wait_for(|m| m.phase == TransitionPhase::Idle && m.pending.is_none())
        .await
        .unwrap()
        .clone();
    let snapshot = model.snapshot.unwrap();
    assert_eq!(snapshot.operation_mode, OperationMode::Temperature);
    assert!((snapshot.target_temperature - 22.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn exhausted_delivery_surfaces_after_three_attempts() {
    let link = SimLink::new(stopped_stove());
    let (stove, _task) = StoveController::spawn(StoveConfig::new("test"), link.clone()).unwrap();
    link.set_write_mode(WriteMode::FailTransport);

    let err = stove.start().await.unwrap_err();
    match err {
        Error::Dispatch(dispatch) => {
            assert!(dispatch.is_unreachable());
            assert!(!dispatch.is_rejected());
        }
        other => panic!("expected dispatch error, got {other}"),
    }
    assert_eq!(link.writes().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn rejection_is_immediate_and_final() {
    let link = SimLink::new(running_stove());
    let (stove, _task) = StoveController::spawn(StoveConfig::new("test"), link.clone()).unwrap();
    let mut events = stove.subscribe();
    link.set_write_mode(WriteMode::Reject);

    let err = stove
        .set_temperature(TargetTemperature::new(25.0).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Dispatch(d) if d.is_rejected()));
    // No retries after a refusal.
    assert_eq!(link.writes().len(), 1);

    assert!(matches!(
        next_event(&mut events).await,
        StoveEvent::TransitionFailed { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn external_stop_is_reported_once_and_adopted() {
    let link = SimLink::new(running_stove());
    let (stove, _task) = StoveController::spawn(StoveConfig::new("test"), link.clone()).unwrap();
    let mut events = stove.subscribe();

    stove.watch().wait_for(|m| m.online).await.unwrap();
    link.set_state(6);

    assert_eq!(
        next_event(&mut events).await,
        StoveEvent::ExternalChangeDetected { stove_id: stove.stove_id() }
    );

    // The next consistent poll adopts the observed state without repeating
    // the event.
    stove
        .watch()
        .wait_for(|m| m.phase == TransitionPhase::Idle && !m.is_burning())
        .await
        .unwrap();
    assert!(matches!(
        events.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test(start_paused = true)]
async fn external_heat_level_change_is_reported_and_adopted() {
    let link = SimLink::new(running_stove());
    let (stove, _task) = StoveController::spawn(StoveConfig::new("test"), link.clone()).unwrap();
    let mut events = stove.subscribe();

    stove.watch().wait_for(|m| m.online).await.unwrap();

    // Wall panel bumps the level; the state code never moves.
    link.set_heat_level(3);
    assert_eq!(
        next_event(&mut events).await,
        StoveEvent::ExternalChangeDetected { stove_id: stove.stove_id() }
    );

    stove
        .watch()
        .wait_for(|m| {
            m.phase == TransitionPhase::Idle
                && m.snapshot.as_ref().is_some_and(|s| s.heat_level.value() == 3)
        })
        .await
        .unwrap();
    assert!(matches!(
        events.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test(start_paused = true)]
async fn consumption_counter_credits_and_absorbs_resets() {
    let link = SimLink::new(running_stove());
    link.set_total_consumed(10.0);
    let (stove, _task) = StoveController::spawn(StoveConfig::new("test"), link.clone()).unwrap();
    let mut events = stove.subscribe();
    let mut watch = stove.watch();

    for total in [12.0, 15.0, 3.0, 5.0] {
        watch
            .wait_for(|m| m.ledger.last_total_kg.is_some_and(|t| (t - total).abs() > 0.5))
            .await
            .unwrap();
        link.set_total_consumed(total);
        watch
            .wait_for(|m| m.ledger.last_total_kg == Some(total))
            .await
            .unwrap();
    }

    let model = stove.model();
    assert!((model.ledger.daily_kg - 7.0).abs() < f64::EPSILON);

    assert_eq!(
        event_matching(&mut events, |e| matches!(e, StoveEvent::CounterReset { .. })).await,
        StoveEvent::CounterReset { stove_id: stove.stove_id() }
    );
}

#[tokio::test(start_paused = true)]
async fn low_pellets_warn_then_shut_down_when_enabled() {
    let link = SimLink::new(running_stove());
    let config = StoveConfig::new("test")
        .with_pellet_capacity_kg(10.0)
        .with_auto_shutdown(true);
    let (stove, _task) = StoveController::spawn(config, link.clone()).unwrap();
    let mut events = stove.subscribe();

    stove.watch().wait_for(|m| m.online).await.unwrap();
    link.set_total_consumed(9.2);
    assert!(matches!(
        event_matching(&mut events, |e| matches!(e, StoveEvent::LowPelletWarning { .. })).await,
        StoveEvent::LowPelletWarning { .. }
    ));

    link.set_total_consumed(9.6);
    assert_eq!(
        event_matching(&mut events, |e| matches!(e, StoveEvent::AutoShutdownRequested { .. }))
            .await,
        StoveEvent::AutoShutdownRequested { stove_id: stove.stove_id() }
    );

    // The automatic stop goes through the normal tracked path.
    stove.watch().wait_for(|m| !m.is_burning()).await.unwrap();
    assert!(link
        .writes()
        .iter()
        .any(|(path, _)| path == PATH_STOP));

    // Refilling restores the gauge and re-arms the warning.
    stove.refill_hopper().await.unwrap();
    let model = stove.model();
    assert!((model.pellet_remaining_pct - 100.0).abs() < f64::EPSILON);
    assert_eq!(model.ledger.refill_count, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_poll_keeps_last_known_good_telemetry() {
    let link = SimLink::new(running_stove());
    let (stove, _task) = StoveController::spawn(StoveConfig::new("test"), link.clone()).unwrap();

    let mut watch = stove.watch();
    watch.wait_for(|m| m.online).await.unwrap();

    link.set_fail_reads(true);
    let model = watch.wait_for(|m| !m.online).await.unwrap().clone();
    // Telemetry survives the outage.
    assert!(model.snapshot.is_some());
    assert_eq!(model.state_display(), "Operating");

    link.set_fail_reads(false);
    watch.wait_for(|m| m.online).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn wood_burnout_resumes_saved_pellet_operation() {
    let link = SimLink::new(running_stove());
    let config = StoveConfig::new("test").with_auto_resume_after_wood(true);
    let (stove, _task) = StoveController::spawn(config, link.clone()).unwrap();
    let mut events = stove.subscribe();

    stove.watch().wait_for(|m| m.online).await.unwrap();

    // Someone loads wood; the firmware flips into a wood burning state.
    link.set_state(9);
    assert_eq!(
        next_event(&mut events).await,
        StoveEvent::WoodModeEntered { stove_id: stove.stove_id() }
    );

    // The wood burns out and the stove drops to stopped.
    link.set_state(6);
    assert_eq!(
        next_event(&mut events).await,
        StoveEvent::WoodModeExited { stove_id: stove.stove_id() }
    );
    assert_eq!(
        next_event(&mut events).await,
        StoveEvent::AutoResumeTriggered { stove_id: stove.stove_id() }
    );

    // The controller restarts pellet operation on its own.
    stove.watch().wait_for(|m| m.is_burning()).await.unwrap();
    assert!(link.writes().iter().any(|(path, _)| path == PATH_START));
}

#[tokio::test(start_paused = true)]
async fn invalid_config_refuses_to_spawn() {
    let link = SimLink::new(stopped_stove());
    let config = StoveConfig::new("test").with_high_smoke_threshold(1000.0);
    let err = StoveController::spawn(config, link).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test(start_paused = true)]
async fn controller_stops_once_every_handle_is_dropped() {
    let link = SimLink::new(stopped_stove());
    let (stove, task) = StoveController::spawn(StoveConfig::new("test"), link).unwrap();

    let stove2 = stove.clone();
    drop(stove);
    drop(stove2.watch());
    // The task only exits once every handle is gone.
    let events = stove2.subscribe();
    drop(events);
    drop(stove2);
    task.await.unwrap();
}
