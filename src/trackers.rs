use crate::errors::TrackerError;
use crate::models::{DayBucket, Draft};
use crate::streak::{has_any_entry, total_at_least};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// What a concrete widget contributes on top of the shared panel machinery.
pub trait Tracker: Send + Sync + 'static {
    type Metadata: Serialize
        + DeserializeOwned
        + Default
        + Clone
        + PartialEq
        + Debug
        + Send
        + Sync
        + 'static;

    /// Snapshot file name and route segment.
    const KEY: &'static str;
    /// REST envelope names, e.g. `("intake", "intakes")`.
    const RESOURCE: (&'static str, &'static str);
    /// Daily goal for quantity trackers; `None` for binary ones.
    const DEFAULT_GOAL: Option<f64>;

    fn validate(draft: &Draft<Self::Metadata>) -> Result<(), TrackerError>;

    fn qualifies(bucket: &DayBucket<Self::Metadata>, goal: Option<f64>) -> bool;
}

fn require_positive_amount(amount: Option<f64>, unit: &str) -> Result<(), TrackerError> {
    match amount {
        Some(value) if value.is_finite() && value > 0.0 => Ok(()),
        Some(value) => Err(TrackerError::validation(format!(
            "amount must be a positive number of {unit}, got {value}"
        ))),
        None => Err(TrackerError::validation(format!("amount in {unit} is required"))),
    }
}

fn require_text(value: &str, field: &str) -> Result<(), TrackerError> {
    if value.trim().is_empty() {
        return Err(TrackerError::validation(format!("{field} is required")));
    }
    Ok(())
}

fn goal_predicate<M>(bucket: &DayBucket<M>, goal: Option<f64>, fallback: Option<f64>) -> bool {
    match goal.or(fallback) {
        Some(goal) => total_at_least(goal)(bucket),
        None => has_any_entry(bucket),
    }
}

pub struct Water;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WaterMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drink: Option<String>,
}

impl Tracker for Water {
    type Metadata = WaterMeta;

    const KEY: &'static str = "water";
    const RESOURCE: (&'static str, &'static str) = ("intake", "intakes");
    const DEFAULT_GOAL: Option<f64> = Some(2500.0);

    fn validate(draft: &Draft<WaterMeta>) -> Result<(), TrackerError> {
        require_positive_amount(draft.amount, "ml")
    }

    fn qualifies(bucket: &DayBucket<WaterMeta>, goal: Option<f64>) -> bool {
        goal_predicate(bucket, goal, Self::DEFAULT_GOAL)
    }
}

pub struct Journal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JournalMeta {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Tracker for Journal {
    type Metadata = JournalMeta;

    const KEY: &'static str = "journal";
    const RESOURCE: (&'static str, &'static str) = ("entry", "entries");
    const DEFAULT_GOAL: Option<f64> = None;

    fn validate(draft: &Draft<JournalMeta>) -> Result<(), TrackerError> {
        require_text(&draft.metadata.text, "entry text")
    }

    fn qualifies(bucket: &DayBucket<JournalMeta>, _goal: Option<f64>) -> bool {
        has_any_entry(bucket)
    }
}

pub struct DeepWork;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Tracker for DeepWork {
    type Metadata = SessionMeta;

    const KEY: &'static str = "deep-work";
    const RESOURCE: (&'static str, &'static str) = ("session", "sessions");
    const DEFAULT_GOAL: Option<f64> = Some(240.0);

    fn validate(draft: &Draft<SessionMeta>) -> Result<(), TrackerError> {
        require_positive_amount(draft.amount, "minutes")
    }

    fn qualifies(bucket: &DayBucket<SessionMeta>, goal: Option<f64>) -> bool {
        goal_predicate(bucket, goal, Self::DEFAULT_GOAL)
    }
}

pub struct Habit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CheckInMeta {
    pub habit: String,
}

impl Tracker for Habit {
    type Metadata = CheckInMeta;

    const KEY: &'static str = "habits";
    const RESOURCE: (&'static str, &'static str) = ("checkin", "checkins");
    const DEFAULT_GOAL: Option<f64> = None;

    fn validate(draft: &Draft<CheckInMeta>) -> Result<(), TrackerError> {
        require_text(&draft.metadata.habit, "habit name")
    }

    fn qualifies(bucket: &DayBucket<CheckInMeta>, _goal: Option<f64>) -> bool {
        has_any_entry(bucket)
    }
}
