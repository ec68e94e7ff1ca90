//! Application-level mutex keyed by `(employee_id, date)`.
//!
//! Held across "read the day's entries, validate, insert" so two concurrent
//! requests for the same employee and day cannot both pass validation against
//! the same snapshot. Acquire before opening the storage transaction.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};

type DayKey = (i32, NaiveDate);

/// Proof that the caller owns a day slot. Released on drop.
#[derive(Debug)]
pub struct DayGuard {
    pub employee_id: i32,
    pub date: NaiveDate,
    _guard: OwnedMutexGuard<()>,
}

#[derive(Debug, Clone, Default)]
pub struct DayLocks {
    slots: Arc<Mutex<HashMap<DayKey, Arc<Mutex<()>>>>>,
}

impl DayLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, key: DayKey) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().await;
        // Slots referenced only by the map are idle.
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        Arc::clone(slots.entry(key).or_default())
    }

    pub async fn acquire(&self, employee_id: i32, date: NaiveDate) -> DayGuard {
        let slot = self.slot((employee_id, date)).await;
        DayGuard {
            employee_id,
            date,
            _guard: slot.lock_owned().await,
        }
    }

    /// Acquires several days in ascending date order.
    pub async fn acquire_all<I>(&self, employee_id: i32, dates: I) -> Vec<DayGuard>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();

        let mut guards = Vec::with_capacity(dates.len());
        for date in dates {
            guards.push(self.acquire(employee_id, date).await);
        }
        guards
    }

    #[cfg(test)]
    async fn live_slots(&self) -> usize {
        let mut slots = self.slots.lock().await;
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        slots.len()
    }
}
