//! Reach-out schedule arithmetic.
//!
//! Due dates are always computed as `last + k units` from the original
//! last-reached-out instant, never by repeated addition, so month-end
//! clamping (Jan 31 → Feb 29) does not drift later cycles.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};

use crate::models::contact::{Contact, Frequency};
use crate::models::settings::NotificationTime;

/// `start + k` units of `frequency`, saturating at the maximum representable instant.
pub fn add_units(start: DateTime<Utc>, frequency: Frequency, k: u32) -> DateTime<Utc> {
    let shifted = match frequency {
        Frequency::Daily => start.checked_add_signed(Duration::days(i64::from(k))),
        Frequency::Weekly => start.checked_add_signed(Duration::weeks(i64::from(k))),
        Frequency::Monthly => start.checked_add_months(Months::new(k)),
    };
    shifted.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Lower bound for the first `k` whose candidate could be after `now`.
fn first_candidate_step(last: DateTime<Utc>, frequency: Frequency, now: DateTime<Utc>) -> u32 {
    if now < last {
        return 1;
    }
    let steps = match frequency {
        Frequency::Daily => (now - last).num_days(),
        Frequency::Weekly => (now - last).num_weeks(),
        Frequency::Monthly => {
            let months = (i64::from(now.year()) - i64::from(last.year())) * 12
                + i64::from(now.month())
                - i64::from(last.month());
            // Day-of-month clamping can make `last + months` land after `now`.
            months - 1
        }
    };
    u32::try_from(steps.max(1)).unwrap_or(u32::MAX)
}

/// Smallest `k >= 1` with `last + k units > now`, and that instant.
fn first_future_step(
    last: DateTime<Utc>,
    frequency: Frequency,
    now: DateTime<Utc>,
) -> (u32, DateTime<Utc>) {
    let mut k = first_candidate_step(last, frequency, now);
    loop {
        let candidate = add_units(last, frequency, k);
        if candidate > now || candidate == DateTime::<Utc>::MAX_UTC || k == u32::MAX {
            return (k, candidate);
        }
        k += 1;
    }
}

/// Next due date of a contact: the first `last + k units` strictly after `now`.
pub fn next_due_date(last: DateTime<Utc>, frequency: Frequency, now: DateTime<Utc>) -> DateTime<Utc> {
    first_future_step(last, frequency, now).1
}

/// Instant the next reminder should fire: the next due date with the
/// notification time of day applied in `tz`. If that instant is not after
/// `now` (the due date is today but the time already passed), further units
/// are added until it is.
pub fn next_reminder_at<Tz: TimeZone>(
    last: DateTime<Utc>,
    frequency: Frequency,
    time: NotificationTime,
    now: DateTime<Utc>,
    tz: &Tz,
) -> DateTime<Utc> {
    let (mut k, _) = first_future_step(last, frequency, now);
    loop {
        let due = add_units(last, frequency, k);
        if due == DateTime::<Utc>::MAX_UTC {
            return due;
        }
        let local = due
            .with_timezone(tz)
            .date_naive()
            .and_time(time.as_naive_time());
        // A wall-clock time skipped by a DST jump fires an hour later.
        let fire_at = tz
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
            .map(|dt| dt.with_timezone(&Utc));

        match fire_at {
            Some(at) if at > now => return at,
            _ if k == u32::MAX => return DateTime::<Utc>::MAX_UTC,
            _ => k += 1,
        }
    }
}

/// Countdown label shown next to a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachOutStatus {
    Overdue,
    Today,
    Tomorrow,
    InDays(i64),
}

impl ReachOutStatus {
    /// Status from whole days between one unit after `last` and `now`.
    pub fn compute(last: DateTime<Utc>, frequency: Frequency, now: DateTime<Utc>) -> Self {
        let days = (add_units(last, frequency, 1) - now).num_days();
        match days {
            d if d < 0 => ReachOutStatus::Overdue,
            0 => ReachOutStatus::Today,
            1 => ReachOutStatus::Tomorrow,
            d => ReachOutStatus::InDays(d),
        }
    }

    pub fn of(contact: &Contact, now: DateTime<Utc>) -> Self {
        Self::compute(contact.last_reached_out, contact.frequency, now)
    }

    pub fn is_overdue(&self) -> bool {
        matches!(self, ReachOutStatus::Overdue)
    }
}

impl std::fmt::Display for ReachOutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReachOutStatus::Overdue => f.write_str("Overdue"),
            ReachOutStatus::Today => f.write_str("Today"),
            ReachOutStatus::Tomorrow => f.write_str("Tomorrow"),
            ReachOutStatus::InDays(n) => write!(f, "In {n} days"),
        }
    }
}

/// Ordering of the contact summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Alphabetical, case-insensitive.
    Name,
    /// Overdue contacts first, then by due date.
    #[default]
    NextReachOut,
}

impl SortOrder {
    pub fn compare(&self, a: &Contact, b: &Contact, now: DateTime<Utc>) -> Ordering {
        match self {
            SortOrder::Name => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id)),
            SortOrder::NextReachOut => {
                let overdue_a = ReachOutStatus::of(a, now).is_overdue();
                let overdue_b = ReachOutStatus::of(b, now).is_overdue();
                overdue_b
                    .cmp(&overdue_a)
                    .then_with(|| {
                        add_units(a.last_reached_out, a.frequency, 1)
                            .cmp(&add_units(b.last_reached_out, b.frequency, 1))
                    })
                    .then_with(|| a.name.cmp(&b.name))
            }
        }
    }

    /// Sort a list of contacts in place.
    pub fn sort(&self, contacts: &mut [Contact], now: DateTime<Utc>) {
        contacts.sort_by(|a, b| self.compare(a, b, now));
    }
}
