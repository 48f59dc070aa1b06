use chrono::{Days, Local, NaiveDate};
use log::info;
use serde::Serialize;

use crate::error::{Result, TrackerError};
use crate::models::Interval;
use crate::store::{lapsed_recurring, TaskStore, Transaction};

/// One recurring task moved forward.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollover {
    pub id: u64,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Next due date for a recurring task whose anchor has lapsed.
///
/// The result is `today` plus the days overdue modulo the cycle length, so it
/// always lands in `today..today + cycle`. Returns `Ok(None)` when the task does
/// not recur or is not yet overdue.
pub fn next_due_date(anchor: NaiveDate, interval: Interval, today: NaiveDate) -> Result<Option<NaiveDate>, String> {
    let Some(cycle) = interval.cycle_days() else {
        return Ok(None);
    };
    if anchor >= today {
        return Ok(None);
    }
    let days_overdue = (today - anchor).num_days().unsigned_abs();
    let offset = days_overdue % cycle;
    today
        .checked_add_days(Days::new(offset))
        .map(Some)
        .ok_or_else(|| format!("{today} + {offset} days is out of range"))
}

/// Rolls every lapsed recurring task in `txn` forward to its next occurrence.
///
/// Nothing is committed here. On error the caller drops the transaction, so a
/// batch is applied completely or not at all.
pub fn reschedule<S: TaskStore + ?Sized>(txn: &mut Transaction<'_, S>, today: NaiveDate) -> Result<Vec<Rollover>> {
    let lapsed: Vec<(u64, Interval, NaiveDate)> = lapsed_recurring(txn.tasks(), today)
        .into_iter()
        .filter_map(|t| t.due_date.map(|due| (t.id, t.recurring_interval, due)))
        .collect();

    let mut rolled = Vec::with_capacity(lapsed.len());
    for (id, interval, due) in lapsed {
        let next = next_due_date(due, interval, today)
            .map_err(|reason| TrackerError::TransactionAborted { id, reason })?;
        let Some(next) = next else {
            continue;
        };
        let task = txn.get_mut(id).ok_or(TrackerError::TaskNotFound(id))?;
        task.due_date = Some(next);
        task.created = Local::now();
        info!("task {} ({}) rolled forward from {} to {}", id, interval, due, next);
        rolled.push(Rollover { id, from: due, to: next });
    }
    Ok(rolled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use crate::store::MemoryStore;

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap() + chrono::Duration::days(offset)
    }

    fn recurring(id: u64, interval: Interval, due: i64) -> Task {
        let mut t = Task::new(format!("r{id}"), 10);
        t.id = id;
        t.recurring_interval = interval;
        t.due_date = Some(d(due));
        t
    }

    #[test]
    fn weekly_rollover_uses_overdue_modulo_cycle() {
        assert_eq!(next_due_date(d(-10), Interval::Weekly, d(0)), Ok(Some(d(3))));
    }

    #[test]
    fn daily_rollover_lands_on_today() {
        assert_eq!(next_due_date(d(-4), Interval::Daily, d(0)), Ok(Some(d(0))));
    }

    #[test]
    fn monthly_uses_thirty_day_cycle() {
        assert_eq!(next_due_date(d(-45), Interval::Monthly, d(0)), Ok(Some(d(15))));
    }

    #[test]
    fn current_and_one_off_tasks_do_not_move() {
        assert_eq!(next_due_date(d(0), Interval::Weekly, d(0)), Ok(None));
        assert_eq!(next_due_date(d(-3), Interval::Never, d(0)), Ok(None));
    }

    #[test]
    fn rolled_dates_stay_within_one_cycle() {
        for interval in [Interval::Daily, Interval::Weekly, Interval::Monthly] {
            let cycle = interval.cycle_days().unwrap() as i64;
            for overdue in 1..100 {
                let next = next_due_date(d(-overdue), interval, d(0)).unwrap().unwrap();
                assert!(next >= d(0), "{interval} overdue {overdue}");
                assert!(next < d(cycle), "{interval} overdue {overdue}");
            }
        }
    }

    #[test]
    fn overflow_is_reported() {
        let today = NaiveDate::MAX;
        let err = next_due_date(today - chrono::Duration::days(10), Interval::Weekly, today).unwrap_err();
        assert!(err.contains("out of range"));
    }

    #[test]
    fn reschedule_updates_only_lapsed_recurring() {
        let mut done = recurring(3, Interval::Daily, -2);
        done.completed = true;
        let mut store = MemoryStore::new(vec![
            recurring(1, Interval::Weekly, -10),
            recurring(2, Interval::Daily, 2),
            done,
            recurring(4, Interval::Never, -1),
        ]);
        let mut txn = Transaction::begin(&mut store).unwrap();
        let rolled = reschedule(&mut txn, d(0)).unwrap();
        txn.commit().unwrap();

        assert_eq!(rolled, vec![Rollover { id: 1, from: d(-10), to: d(3) }]);
        let tasks = store.load().unwrap();
        assert_eq!(tasks[0].due_date, Some(d(3)));
        assert_eq!(tasks[1].due_date, Some(d(2)));
        assert_eq!(tasks[2].due_date, Some(d(-2)));
        assert_eq!(tasks[3].due_date, Some(d(-1)));
    }

    #[test]
    fn rollover_refreshes_updated_timestamp() {
        let stamp = Local::now() - chrono::Duration::days(30);
        let mut lapsed = recurring(1, Interval::Weekly, -10);
        lapsed.created = stamp;
        let mut current = recurring(2, Interval::Daily, 1);
        current.created = stamp;
        let mut store = MemoryStore::new(vec![lapsed, current]);

        let mut txn = Transaction::begin(&mut store).unwrap();
        reschedule(&mut txn, d(0)).unwrap();
        txn.commit().unwrap();

        let tasks = store.load().unwrap();
        assert!(tasks[0].created > stamp);
        assert_eq!(tasks[1].created, stamp);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut store = MemoryStore::new(vec![recurring(1, Interval::Weekly, -10), recurring(2, Interval::Daily, -1)]);
        for expected in [2, 0] {
            let mut txn = Transaction::begin(&mut store).unwrap();
            assert_eq!(reschedule(&mut txn, d(0)).unwrap().len(), expected);
            txn.commit().unwrap();
        }
        assert_eq!(store.commits(), 1);
    }

    #[test]
    fn failure_leaves_whole_batch_unapplied() {
        let today = NaiveDate::MAX;
        let mut fine = Task::new("fine", 5);
        fine.id = 1;
        fine.recurring_interval = Interval::Daily;
        fine.due_date = Some(today - chrono::Duration::days(1));
        let mut broken = Task::new("broken", 5);
        broken.id = 2;
        broken.recurring_interval = Interval::Weekly;
        broken.due_date = Some(today - chrono::Duration::days(10));
        let mut store = MemoryStore::new(vec![fine.clone(), broken.clone()]);

        let mut txn = Transaction::begin(&mut store).unwrap();
        let err = reschedule(&mut txn, today).unwrap_err();
        drop(txn);

        assert!(matches!(err, TrackerError::TransactionAborted { id: 2, .. }));
        assert_eq!(store.load().unwrap(), vec![fine, broken]);
        assert_eq!(store.commits(), 0);
    }
}
