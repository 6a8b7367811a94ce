use crate::errors::TrackerError;
use crate::models::{DayBucket, GoalProgress};

pub fn progress<M>(bucket: Option<&DayBucket<M>>, goal_amount: f64) -> Result<GoalProgress, TrackerError> {
    validate_goal(goal_amount)?;

    let current_amount = bucket.map_or(0.0, |bucket| bucket.total);
    let ratio = (current_amount / goal_amount * 100.0).round();
    let percentage = ratio.clamp(0.0, 100.0) as u8;
    let remaining = (goal_amount - current_amount).clamp(0.0, goal_amount);

    Ok(GoalProgress {
        goal_amount,
        current_amount,
        percentage,
        remaining,
    })
}

pub fn validate_goal(goal_amount: f64) -> Result<(), TrackerError> {
    if !goal_amount.is_finite() || goal_amount <= 0.0 {
        return Err(TrackerError::configuration(format!(
            "goal must be a positive number, got {goal_amount}"
        )));
    }
    Ok(())
}
