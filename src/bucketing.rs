use crate::models::{DayBucket, EventId, EventRecord};
use chrono::{DateTime, NaiveDate, Offset, TimeZone, Utc};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// A record that could not be placed on a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataError {
    pub id: EventId,
    pub reason: DataErrorReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataErrorReason {
    MissingTimestamp,
    InvalidTimestamp(i64),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            DataErrorReason::MissingTimestamp => write!(f, "record {} has no timestamp", self.id),
            DataErrorReason::InvalidTimestamp(raw) => {
                write!(f, "record {} has invalid timestamp {raw}", self.id)
            }
        }
    }
}

/// Sparse day map plus the records that were excluded from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucketed<M> {
    pub days: BTreeMap<NaiveDate, DayBucket<M>>,
    pub rejected: Vec<DataError>,
}

impl<M> Bucketed<M> {
    pub fn get(&self, date: NaiveDate) -> Option<&DayBucket<M>> {
        self.days.get(&date)
    }
}

pub fn bucket<M, Tz>(events: &[EventRecord<M>], zone: &Tz) -> Bucketed<M>
where
    M: Clone,
    Tz: TimeZone,
{
    let mut placed: Vec<(i64, NaiveDate, &EventRecord<M>)> = Vec::with_capacity(events.len());
    let mut rejected = Vec::new();

    for record in events {
        let Some(raw) = record.timestamp else {
            rejected.push(DataError {
                id: record.id.clone(),
                reason: DataErrorReason::MissingTimestamp,
            });
            continue;
        };
        let Some(date) = record.instant().and_then(|instant| local_date(instant, zone)) else {
            rejected.push(DataError {
                id: record.id.clone(),
                reason: DataErrorReason::InvalidTimestamp(raw),
            });
            continue;
        };
        placed.push((raw, date, record));
    }

    for err in &rejected {
        warn!("excluding record from day buckets: {err}");
    }

    // stable: records sharing a timestamp keep their log order
    placed.sort_by_key(|(millis, _, _)| *millis);

    let mut days: BTreeMap<NaiveDate, DayBucket<M>> = BTreeMap::new();
    for (_, date, record) in placed {
        let entry = days.entry(date).or_insert_with(|| DayBucket::new(date));
        entry.total += record.amount.unwrap_or(0.0);
        entry.records.push(record.clone());
    }

    Bucketed { days, rejected }
}

/// The local calendar date of `instant` in `zone`, or `None` when shifting by
/// the zone offset leaves chrono's date range.
pub fn local_date<Tz: TimeZone>(instant: DateTime<Utc>, zone: &Tz) -> Option<NaiveDate> {
    let utc = instant.naive_utc();
    let offset = zone.offset_from_utc_datetime(&utc).fix();
    utc.checked_add_offset(offset).map(|local| local.date())
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
