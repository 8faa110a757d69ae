//! When a job fires next.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed period, measured from the previous fire time.
    Every(StdDuration),
    /// Wall-clock times in a fixed-offset local zone.
    DailyAt {
        times: Vec<NaiveTime>,
        offset: FixedOffset,
    },
}

impl Schedule {
    pub fn daily_at(mut times: Vec<NaiveTime>, offset: FixedOffset) -> Self {
        times.sort();
        times.dedup();
        Schedule::DailyAt { times, offset }
    }

    /// First fire time strictly after `now`. `None` if the schedule never
    /// fires (no wall-clock times, or a period that overflows).
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Every(period) => {
                let period = Duration::from_std(*period).ok()?;
                now.checked_add_signed(period)
            }
            Schedule::DailyAt { times, offset } => {
                let today = now.with_timezone(offset).date_naive();
                (0..=1)
                    .flat_map(|days| times.iter().map(move |t| (days, *t)))
                    .filter_map(|(days, time)| {
                        let date = today + Duration::days(days);
                        offset
                            .from_local_datetime(&date.and_time(time))
                            .single()
                            .map(|local| local.with_timezone(&Utc))
                    })
                    .filter(|at| *at > now)
                    .min()
            }
        }
    }
}
