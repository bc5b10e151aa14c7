//! Domain Models
//!
//! A trainee's profile and the workout sessions they log.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TrainerError};

/// Self-reported training experience
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl FitnessLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for FitnessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gym user's profile, used to tailor workouts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub age: u32,
    pub fitness_level: FitnessLevel,

    /// e.g. "lose weight", "build muscle", "improve endurance"
    pub goals: Vec<String>,

    /// e.g. "dumbbells", "barbell", "bodyweight only"
    pub equipment: Vec<String>,

    /// Injuries or physical limitations, e.g. "lower back"
    #[serde(default)]
    pub injuries: Vec<String>,

    pub sessions_per_week: u32,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, age: u32, fitness_level: FitnessLevel) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            name: name.into(),
            age,
            fitness_level,
            goals: Vec::new(),
            equipment: Vec::new(),
            injuries: Vec::new(),
            sessions_per_week: 3,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One completed workout, as logged by the user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkoutSession {
    #[serde(default = "today")]
    pub date: NaiveDate,

    pub focus_area: String,
    pub duration_minutes: u32,

    /// Free-form exercise entries, e.g. `{"name": "Push-ups", "sets_done": 3}`
    #[serde(default)]
    pub exercises_completed: Vec<Value>,

    /// 1 = exhausted, 5 = energised
    #[schemars(range(min = 1, max = 5))]
    pub energy_level: u8,

    /// 1 = too easy, 5 = too hard
    #[schemars(range(min = 1, max = 5))]
    pub difficulty_rating: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WorkoutSession {
    /// Reject ratings outside 1..=5
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("energy_level", self.energy_level),
            ("difficulty_rating", self.difficulty_rating),
        ] {
            if !(1..=5).contains(&value) {
                return Err(TrainerError::InvalidRecord(format!(
                    "{field} must be between 1 and 5, got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Count consecutive training days ending at `today`.
///
/// Zero when nothing was logged on `today`. Multiple sessions on one day
/// count once.
pub fn streak_ending(sessions: &[WorkoutSession], today: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = sessions.iter().map(|s| s.date).collect();
    days.sort_unstable();
    days.dedup();

    let mut streak = 0;
    let mut expected = today;
    for day in days.iter().rev() {
        if *day > expected {
            continue;
        }
        if *day != expected {
            break;
        }
        streak += 1;
        match expected.pred_opt() {
            Some(prev) => expected = prev,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_on(date: NaiveDate) -> WorkoutSession {
        WorkoutSession {
            date,
            focus_area: "full_body".into(),
            duration_minutes: 30,
            exercises_completed: Vec::new(),
            energy_level: 3,
            difficulty_rating: 3,
            notes: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_streak_counts_consecutive_days() {
        let sessions: Vec<_> = [8, 9, 10, 10].into_iter().map(|d| session_on(day(d))).collect();
        assert_eq!(streak_ending(&sessions, day(10)), 3);
    }

    #[test]
    fn test_streak_breaks_on_gap() {
        let sessions: Vec<_> = [5, 7, 8].into_iter().map(|d| session_on(day(d))).collect();
        assert_eq!(streak_ending(&sessions, day(8)), 2);
    }

    #[test]
    fn test_streak_zero_without_session_today() {
        let sessions = vec![session_on(day(8)), session_on(day(9))];
        assert_eq!(streak_ending(&sessions, day(11)), 0);
        assert_eq!(streak_ending(&[], day(11)), 0);
    }

    #[test]
    fn test_session_defaults_and_validation() {
        let session: WorkoutSession = serde_json::from_value(serde_json::json!({
            "focus_area": "core",
            "duration_minutes": 20,
            "energy_level": 4,
            "difficulty_rating": 6
        }))
        .unwrap();

        assert_eq!(session.date, Utc::now().date_naive());
        assert!(session.exercises_completed.is_empty());
        assert!(matches!(session.validate(), Err(TrainerError::InvalidRecord(_))));
    }

    #[test]
    fn test_fitness_level_serializes_lowercase() {
        let value = serde_json::to_value(FitnessLevel::Intermediate).unwrap();
        assert_eq!(value, "intermediate");
    }
}
