use crate::models::{DayBucket, StreakState};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

/// Upper bound on how many days a streak walk inspects.
pub const MAX_STREAK_DAYS: u32 = 365;

/// Counts consecutive qualifying days ending at today, or at yesterday when
/// today has not qualified yet.
pub fn compute_streak<M, F>(
    buckets: &BTreeMap<NaiveDate, DayBucket<M>>,
    satisfies: F,
    today: NaiveDate,
) -> StreakState
where
    F: Fn(&DayBucket<M>) -> bool,
{
    let qualifies = |date: NaiveDate| buckets.get(&date).is_some_and(&satisfies);

    let yesterday = today - Duration::days(1);
    let anchor = if qualifies(today) {
        today
    } else if qualifies(yesterday) {
        yesterday
    } else {
        return StreakState::default();
    };

    let mut streak = 0;
    let mut date = anchor;
    while streak < MAX_STREAK_DAYS && qualifies(date) {
        streak += 1;
        date -= Duration::days(1);
    }

    StreakState {
        current_streak: streak,
        anchor_date: Some(anchor),
        capped: streak == MAX_STREAK_DAYS,
    }
}

/// Longest run of consecutive qualifying days anywhere in the history, capped
/// at [`MAX_STREAK_DAYS`].
pub fn longest_streak<M, F>(buckets: &BTreeMap<NaiveDate, DayBucket<M>>, satisfies: F) -> u32
where
    F: Fn(&DayBucket<M>) -> bool,
{
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;

    for (date, bucket) in buckets {
        if !satisfies(bucket) {
            current = 0;
            previous = None;
            continue;
        }
        current = match previous {
            Some(prev) if *date - prev == Duration::days(1) => current + 1,
            _ => 1,
        };
        longest = longest.max(current.min(MAX_STREAK_DAYS));
        previous = Some(*date);
    }

    longest
}

/// Predicate for binary trackers: any entry counts.
pub fn has_any_entry<M>(bucket: &DayBucket<M>) -> bool {
    !bucket.is_empty()
}

/// Predicate for quantity trackers: the day's total reaches `goal`.
pub fn total_at_least<M>(goal: f64) -> impl Fn(&DayBucket<M>) -> bool {
    move |bucket: &DayBucket<M>| !bucket.is_empty() && bucket.total >= goal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventRecord;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn buckets(days: &[(NaiveDate, f64)]) -> BTreeMap<NaiveDate, DayBucket<()>> {
        days.iter()
            .map(|(date, total)| {
                let mut bucket = DayBucket::new(*date);
                bucket.records.push(EventRecord {
                    id: format!("{date}").into(),
                    timestamp: Some(0),
                    amount: Some(*total),
                    metadata: (),
                });
                bucket.total = *total;
                (*date, bucket)
            })
            .collect()
    }

    #[test]
    fn gap_day_resets_the_streak() {
        let map = buckets(&[
            (day(2024, 1, 1), 1.0),
            (day(2024, 1, 2), 1.0),
            (day(2024, 1, 4), 1.0),
        ]);
        let state = compute_streak(&map, has_any_entry, day(2024, 1, 4));
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.anchor_date, Some(day(2024, 1, 4)));
        assert!(!state.capped);
    }

    #[test]
    fn grace_period_anchors_at_yesterday() {
        let map = buckets(&[(day(2024, 5, 8), 1.0), (day(2024, 5, 9), 1.0)]);
        let state = compute_streak(&map, has_any_entry, day(2024, 5, 10));
        assert_eq!(state.current_streak, 2);
        assert_eq!(state.anchor_date, Some(day(2024, 5, 9)));
    }

    #[test]
    fn streak_is_zero_after_a_full_missed_day() {
        let map = buckets(&[(day(2024, 5, 7), 1.0), (day(2024, 5, 8), 1.0)]);
        let state = compute_streak(&map, has_any_entry, day(2024, 5, 10));
        assert_eq!(state, StreakState::default());
    }

    #[test]
    fn unmet_goal_today_falls_back_to_yesterday() {
        let map = buckets(&[
            (day(2024, 6, 1), 2000.0),
            (day(2024, 6, 2), 2100.0),
            (day(2024, 6, 3), 500.0),
        ]);
        let state = compute_streak(&map, total_at_least(2000.0), day(2024, 6, 3));
        assert_eq!(state.current_streak, 2);
        assert_eq!(state.anchor_date, Some(day(2024, 6, 2)));
    }

    #[test]
    fn empty_day_never_meets_a_goal() {
        let mut map = buckets(&[]);
        map.insert(day(2024, 6, 3), DayBucket::new(day(2024, 6, 3)));
        let zero_goal = total_at_least(0.0);
        assert!(!zero_goal(&map[&day(2024, 6, 3)]));
        assert_eq!(compute_streak(&map, zero_goal, day(2024, 6, 3)).current_streak, 0);
    }

    #[test]
    fn binary_entry_qualifies_regardless_of_amount() {
        let map = buckets(&[(day(2024, 6, 3), 0.0)]);
        assert_eq!(compute_streak(&map, has_any_entry, day(2024, 6, 3)).current_streak, 1);
    }

    #[test]
    fn walk_stops_at_the_cap() {
        let today = day(2024, 12, 31);
        let days: Vec<_> = (0..500).map(|i| (today - Duration::days(i), 1.0)).collect();
        let map = buckets(&days);

        let state = compute_streak(&map, has_any_entry, today);
        assert_eq!(state.current_streak, MAX_STREAK_DAYS);
        assert!(state.capped);
    }

    #[test]
    fn longest_streak_spans_history() {
        let map = buckets(&[
            (day(2024, 1, 1), 1.0),
            (day(2024, 1, 2), 1.0),
            (day(2024, 1, 3), 1.0),
            (day(2024, 1, 5), 1.0),
            (day(2024, 1, 6), 0.0),
            (day(2024, 1, 7), 1.0),
        ]);
        assert_eq!(longest_streak(&map, total_at_least(1.0)), 3);
        assert_eq!(longest_streak(&map, has_any_entry), 3);
    }

    #[test]
    #[should_panic(expected = "predicate bug")]
    fn predicate_panics_propagate() {
        let map = buckets(&[(day(2024, 1, 1), 1.0)]);
        compute_streak(&map, |_: &DayBucket<()>| panic!("predicate bug"), day(2024, 1, 1));
    }
}
