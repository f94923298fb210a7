//! # Sale Sequence
//!
//! Per-outlet, per-day counters for sale numbers.
//!
//! A number is only consumed when the sale it was issued for is actually
//! built, so a rejected checkout never leaves a gap in the day's sequence.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{CheckoutError, CheckoutResult};

#[derive(Debug, Default)]
pub struct SaleSequence {
    counters: Mutex<HashMap<(String, NaiveDate), u32>>,
}

impl SaleSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last sequence issued for `outlet_id` on `date` (0 if none).
    pub fn current(&self, outlet_id: &str, date: NaiveDate) -> CheckoutResult<u32> {
        let counters = self.counters.lock().map_err(poisoned)?;
        Ok(counters
            .get(&(outlet_id.to_string(), date))
            .copied()
            .unwrap_or(0))
    }

    /// Resumes a day's sequence after a restart, e.g. from the highest
    /// sequence found in stored sales. Never moves a counter backwards.
    pub fn resume(&self, outlet_id: &str, date: NaiveDate, last_issued: u32) -> CheckoutResult<()> {
        let mut counters = self.counters.lock().map_err(poisoned)?;
        let counter = counters.entry((outlet_id.to_string(), date)).or_insert(0);
        *counter = (*counter).max(last_issued);
        Ok(())
    }

    /// Issues and commits the next sequence number.
    pub fn next(&self, outlet_id: &str, date: NaiveDate) -> CheckoutResult<u32> {
        self.issue_with(outlet_id, date, Ok)
    }

    /// Runs `f` with the next sequence number and commits it only if `f`
    /// succeeds.
    ///
    /// The counter lock is held while `f` runs, so concurrent callers for the
    /// same outlet see strictly increasing numbers.
    pub fn issue_with<T, F>(&self, outlet_id: &str, date: NaiveDate, f: F) -> CheckoutResult<T>
    where
        F: FnOnce(u32) -> CheckoutResult<T>,
    {
        let mut counters = self.counters.lock().map_err(poisoned)?;
        let key = (outlet_id.to_string(), date);
        let candidate = counters.get(&key).copied().unwrap_or(0).checked_add(1).ok_or_else(|| {
            CheckoutError::Config(format!("sale sequence exhausted for outlet {}", outlet_id))
        })?;

        let value = f(candidate)?;
        counters.insert(key, candidate);
        debug!(outlet_id, %date, sequence = candidate, "Sale sequence issued");
        Ok(value)
    }
}

fn poisoned<E: std::fmt::Display>(err: E) -> CheckoutError {
    CheckoutError::LockPoisoned(err.to_string())
}
