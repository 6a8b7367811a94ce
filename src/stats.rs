use crate::bucketing::date_key;
use crate::models::{DailyPoint, DayBucket, WeeklyAveragePoint, WeeklyPoint};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

const DAY_COUNT: i64 = 7;
const WEEK_COUNT: i64 = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySeries {
    pub totals: Vec<WeeklyPoint>,
    pub averages: Vec<WeeklyAveragePoint>,
}

/// The last seven days ending at `today`, oldest first. Days without records
/// are reported with zero entries.
pub fn history<M, F>(
    buckets: &BTreeMap<NaiveDate, DayBucket<M>>,
    today: NaiveDate,
    satisfies: F,
) -> Vec<DailyPoint>
where
    F: Fn(&DayBucket<M>) -> bool,
{
    (0..DAY_COUNT)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            match buckets.get(&date) {
                Some(bucket) => DailyPoint {
                    date: date_key(date),
                    entries: bucket.len(),
                    total: bucket.total,
                    qualified: satisfies(bucket),
                },
                None => DailyPoint {
                    date: date_key(date),
                    entries: 0,
                    total: 0.0,
                    qualified: false,
                },
            }
        })
        .collect()
}

pub fn weekly<M>(buckets: &BTreeMap<NaiveDate, DayBucket<M>>, today: NaiveDate) -> WeeklySeries {
    let current_week_start = week_start(today);
    let mut totals = Vec::with_capacity(WEEK_COUNT as usize);
    let mut averages = Vec::with_capacity(WEEK_COUNT as usize);

    for offset in (0..WEEK_COUNT).rev() {
        let start = current_week_start - Duration::weeks(offset);
        let end = start + Duration::days(6);

        let (entries, total) = buckets
            .range(start..=end)
            .fold((0usize, 0.0f64), |(entries, total), (_, bucket)| {
                (entries + bucket.len(), total + bucket.total)
            });

        let days_counted = if today < start {
            0
        } else if today > end {
            7
        } else {
            (today - start).num_days() as u8 + 1
        };
        let denom = if days_counted == 0 { 1.0 } else { f64::from(days_counted) };

        totals.push(WeeklyPoint {
            week: week_label(start),
            start_date: date_key(start),
            end_date: date_key(end),
            entries,
            total,
        });
        averages.push(WeeklyAveragePoint {
            week: week_label(start),
            days_counted,
            avg_entries: entries as f64 / denom,
            avg_total: total / denom,
        });
    }

    WeeklySeries { totals, averages }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}
