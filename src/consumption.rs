// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pellet consumption accounting.
//!
//! The stove reports a lifetime consumption counter. The accountant turns
//! that counter into calendar totals and a hopper gauge by crediting the
//! positive delta between consecutive readings. A counter that moves
//! backwards (controller replacement, factory reset) credits nothing for
//! that cycle and rebases, so totals never jump or go negative.

use chrono::{Datelike, NaiveDate};

use crate::config::PelletSettings;

/// Persistent consumption totals.
///
/// Serializable so a host application can carry totals across restarts;
/// a fresh ledger starts all totals at zero and rebases on the first sample.
#[derive(Debug, Clone, PartialEq, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ConsumptionLedger {
    /// Last lifetime counter value seen, in kg.
    pub last_total_kg: Option<f64>,
    /// Consumption credited today.
    pub daily_kg: f64,
    /// Consumption credited this calendar month.
    pub monthly_kg: f64,
    /// Consumption credited this calendar year.
    pub yearly_kg: f64,
    /// Consumption credited since the hopper was last refilled.
    pub since_refill_kg: f64,
    /// Consumption credited since the stove was last cleaned.
    pub since_clean_kg: f64,
    /// Number of refills recorded.
    pub refill_count: u32,
    /// Date the ledger was last updated, for calendar rollovers.
    pub last_update: Option<NaiveDate>,
}

/// What one accounting cycle produced.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccountingOutcome {
    /// Amount credited this cycle, in kg.
    pub credited_kg: f64,
    /// The lifetime counter moved backwards and the ledger rebased.
    pub counter_reset: bool,
    /// The hopper gauge crossed the notification level this cycle.
    pub low_pellet_warning: bool,
    /// The hopper gauge crossed the shutdown level this cycle and the
    /// automatic shutdown is enabled.
    pub auto_shutdown: bool,
}

/// Tracks pellet consumption and the derived hopper gauge.
///
/// The gauge is derived purely from the ledger: capacity minus consumption
/// since the last refill, floored at zero. Level crossings latch until the
/// next [`refill`](Accountant::refill), so each crossing warns exactly once.
#[derive(Debug, Clone)]
pub struct Accountant {
    settings: PelletSettings,
    ledger: ConsumptionLedger,
    low_warned: bool,
    shutdown_requested: bool,
}

impl Accountant {
    /// Creates an accountant over a fresh ledger.
    #[must_use]
    pub fn new(settings: PelletSettings) -> Self {
        Self::with_ledger(settings, ConsumptionLedger::default())
    }

    /// Creates an accountant resuming from a persisted ledger.
    #[must_use]
    pub fn with_ledger(settings: PelletSettings, ledger: ConsumptionLedger) -> Self {
        let remaining_pct = remaining_pct(&settings, &ledger);
        Self {
            low_warned: remaining_pct < settings.notify_level_pct,
            shutdown_requested: remaining_pct < settings.shutdown_level_pct,
            settings,
            ledger,
        }
    }

    /// The current ledger, for persistence.
    #[must_use]
    pub fn ledger(&self) -> &ConsumptionLedger {
        &self.ledger
    }

    /// Pellets remaining in the hopper, in kg.
    #[must_use]
    pub fn remaining_kg(&self) -> f64 {
        (self.settings.capacity_kg - self.ledger.since_refill_kg).max(0.0)
    }

    /// Pellets remaining as a percentage of hopper capacity.
    #[must_use]
    pub fn remaining_pct(&self) -> f64 {
        remaining_pct(&self.settings, &self.ledger)
    }

    /// Feeds one lifetime counter reading into the ledger.
    pub fn update(&mut self, total_kg: f64, today: NaiveDate) -> AccountingOutcome {
        self.roll_calendar(today);

        let mut outcome = AccountingOutcome::default();
        match self.ledger.last_total_kg {
            None => {
                // First reading is the baseline, nothing to credit.
                self.ledger.last_total_kg = Some(total_kg);
            }
            Some(last) if total_kg < last => {
                outcome.counter_reset = true;
                self.ledger.last_total_kg = Some(total_kg);
            }
            Some(last) => {
                let delta = total_kg - last;
                self.ledger.daily_kg += delta;
                self.ledger.monthly_kg += delta;
                self.ledger.yearly_kg += delta;
                self.ledger.since_refill_kg += delta;
                self.ledger.since_clean_kg += delta;
                self.ledger.last_total_kg = Some(total_kg);
                outcome.credited_kg = delta;
            }
        }
        self.ledger.last_update = Some(today);

        let pct = self.remaining_pct();
        if pct < self.settings.notify_level_pct && !self.low_warned {
            self.low_warned = true;
            outcome.low_pellet_warning = true;
        }
        if pct < self.settings.shutdown_level_pct && !self.shutdown_requested {
            self.shutdown_requested = true;
            outcome.auto_shutdown = self.settings.auto_shutdown;
        }
        outcome
    }

    /// Records a hopper refill: the gauge returns to full and the level
    /// latches re-arm.
    pub fn refill(&mut self) {
        self.ledger.since_refill_kg = 0.0;
        self.ledger.refill_count += 1;
        self.low_warned = false;
        self.shutdown_requested = false;
    }

    /// Records a stove cleaning: the since-cleaning total restarts and the
    /// refill counter starts over.
    pub fn clean(&mut self) {
        self.ledger.since_clean_kg = 0.0;
        self.ledger.refill_count = 0;
    }

    fn roll_calendar(&mut self, today: NaiveDate) {
        let Some(last) = self.ledger.last_update else {
            return;
        };
        if today == last {
            return;
        }
        self.ledger.daily_kg = 0.0;
        if (today.year(), today.month()) != (last.year(), last.month()) {
            self.ledger.monthly_kg = 0.0;
        }
        if today.year() != last.year() {
            self.ledger.yearly_kg = 0.0;
        }
    }
}

fn remaining_pct(settings: &PelletSettings, ledger: &ConsumptionLedger) -> f64 {
    let remaining = (settings.capacity_kg - ledger.since_refill_kg).max(0.0);
    remaining / settings.capacity_kg * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn accountant() -> Accountant {
        Accountant::new(PelletSettings {
            capacity_kg: 10.0,
            ..PelletSettings::default()
        })
    }

    #[test]
    fn credits_positive_deltas_and_absorbs_resets() {
        let mut acc = accountant();
        let today = day(2026, 1, 15);

        let credits: Vec<f64> = [10.0, 12.0, 15.0, 3.0, 5.0]
            .iter()
            .map(|&total| acc.update(total, today).credited_kg)
            .collect();

        assert_eq!(credits, vec![0.0, 2.0, 3.0, 0.0, 2.0]);
        assert!((acc.ledger().daily_kg - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_is_flagged_once_per_decrease() {
        let mut acc = accountant();
        let today = day(2026, 1, 15);

        assert!(!acc.update(15.0, today).counter_reset);
        let reset = acc.update(3.0, today);
        assert!(reset.counter_reset);
        assert!((reset.credited_kg).abs() < f64::EPSILON);
        assert!(!acc.update(5.0, today).counter_reset);
    }

    #[test]
    fn daily_total_rolls_at_midnight() {
        let mut acc = accountant();
        acc.update(100.0, day(2026, 1, 31));
        acc.update(103.0, day(2026, 1, 31));
        assert!((acc.ledger().daily_kg - 3.0).abs() < f64::EPSILON);

        let outcome = acc.update(104.0, day(2026, 2, 1));
        assert!((outcome.credited_kg - 1.0).abs() < f64::EPSILON);
        assert!((acc.ledger().daily_kg - 1.0).abs() < f64::EPSILON);
        // January's total does not leak into February.
        assert!((acc.ledger().monthly_kg - 1.0).abs() < f64::EPSILON);
        assert!((acc.ledger().yearly_kg - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn yearly_total_rolls_on_new_year() {
        let mut acc = accountant();
        acc.update(100.0, day(2025, 12, 31));
        acc.update(105.0, day(2025, 12, 31));
        acc.update(106.0, day(2026, 1, 1));
        assert!((acc.ledger().yearly_kg - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gauge_floors_at_empty() {
        let mut acc = accountant();
        let today = day(2026, 1, 15);
        acc.update(0.0, today);
        acc.update(25.0, today);
        assert!(acc.remaining_kg().abs() < f64::EPSILON);
        assert!(acc.remaining_pct().abs() < f64::EPSILON);
    }

    #[test]
    fn low_pellet_warning_fires_once_until_refill() {
        let mut acc = Accountant::new(PelletSettings {
            capacity_kg: 10.0,
            notify_level_pct: 10.0,
            shutdown_level_pct: 5.0,
            auto_shutdown: true,
        });
        let today = day(2026, 1, 15);

        acc.update(0.0, today);
        assert!(acc.update(9.2, today).low_pellet_warning);
        assert!(!acc.update(9.3, today).low_pellet_warning);

        let shutdown = acc.update(9.6, today);
        assert!(shutdown.auto_shutdown);
        assert!(!acc.update(9.7, today).auto_shutdown);

        acc.refill();
        assert!((acc.remaining_pct() - 100.0).abs() < f64::EPSILON);
        assert_eq!(acc.ledger().refill_count, 1);
        // Latches re-arm after a refill.
        assert!(acc.update(18.8, today).low_pellet_warning);
    }

    #[test]
    fn shutdown_not_requested_when_disabled() {
        let mut acc = Accountant::new(PelletSettings {
            capacity_kg: 10.0,
            notify_level_pct: 10.0,
            shutdown_level_pct: 5.0,
            auto_shutdown: false,
        });
        let today = day(2026, 1, 15);
        acc.update(0.0, today);
        assert!(!acc.update(9.8, today).auto_shutdown);
    }

    #[test]
    fn cleaning_restarts_the_clean_total_and_refill_counter() {
        let mut acc = accountant();
        let today = day(2026, 1, 15);
        acc.update(10.0, today);
        acc.update(13.0, today);
        acc.refill();
        assert!((acc.ledger().since_clean_kg - 3.0).abs() < f64::EPSILON);
        assert_eq!(acc.ledger().refill_count, 1);

        acc.clean();
        assert!(acc.ledger().since_clean_kg.abs() < f64::EPSILON);
        assert_eq!(acc.ledger().refill_count, 0);
        // Cleaning does not touch the hopper gauge or the calendar totals.
        assert!(acc.ledger().since_refill_kg.abs() < f64::EPSILON);
        assert!((acc.ledger().daily_kg - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ledger_round_trips_through_serde() {
        let mut acc = accountant();
        acc.update(10.0, day(2026, 1, 15));
        acc.update(12.5, day(2026, 1, 15));

        let json = serde_json::to_string(acc.ledger()).unwrap();
        let back: ConsumptionLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, acc.ledger());
    }
}
