//! Last-fired bookkeeping.
//!
//! Weekly schedules remember the local date they fired on; intervals remember
//! the exact instant. The store is written first and the in-memory habit
//! only follows on success, so both always agree.

use crate::clock::Tick;
use crate::error::Result;
use crate::habit::Habit;
use crate::recurrence::Recurrence;

use super::HabitStore;

pub fn record_firing<S: HabitStore + ?Sized>(
    store: &S,
    habit: &mut Habit,
    tick: &Tick,
) -> Result<()> {
    let id = habit.id;
    match &mut habit.recurrence {
        Some(Recurrence::Weekly(schedule)) => {
            store.record_weekly_fired(id, tick.date())?;
            schedule.last_fired_date = Some(tick.date());
        }
        Some(Recurrence::Interval(interval)) => {
            store.record_interval_fired(id, tick.at)?;
            interval.last_fired_at = Some(tick.at);
        }
        None => {}
    }
    Ok(())
}
