//! Study content for the Daily and Learn screens, embedded from `content.ron`.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, Deserialize)]
pub struct Example {
  pub text: String,
  pub translation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyWord {
  pub word: String,
  pub part_of_speech: String,
  pub level: String,
  pub meaning: String,
  pub translation: String,
  pub examples: Vec<Example>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyGoal {
  pub current: u32,
  pub target: u32,
  pub unit: String,
}

impl DailyGoal {
  /// Fraction of the goal reached, clamped to `0.0..=1.0`.
  pub fn ratio(&self) -> f64 {
    if self.target == 0 {
      return 1.0;
    }
    (f64::from(self.current) / f64::from(self.target)).clamp(0.0, 1.0)
  }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Stats {
  pub words_learned: u32,
  pub videos_completed: u32,
}

/// A recently opened course. Serialized for the grid's structural item key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
  pub id: String,
  pub title: String,
  pub category: String,
  pub last_seen: String,
  /// Percent complete. Out-of-range values are clamped when drawn.
  pub progress: i32,
}

impl Course {
  pub fn progress_ratio(&self) -> f64 {
    f64::from(self.progress.clamp(0, 100)) / 100.0
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Learning {
  pub daily_goal: DailyGoal,
  pub streak_days: u32,
  pub stats: Stats,
  pub recent_courses: Vec<Course>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
  pub daily: DailyWord,
  pub learning: Learning,
}

static CONTENT: LazyLock<Content> = LazyLock::new(|| {
  // Safety: embedded at compile time, like constants.ron.
  ron::from_str(include_str!("../content.ron")).expect("content.ron must be valid RON (embedded at compile time)")
});

pub fn content() -> &'static Content {
  &CONTENT
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_content_parses() {
    let c = content();
    assert_eq!(c.daily.word, "Serendipity");
    assert!(!c.daily.examples.is_empty());
    assert!(c.learning.recent_courses.len() > 4, "enough courses for more than one grid page");
  }

  #[test]
  fn goal_ratio_is_clamped() {
    let goal = DailyGoal { current: 18, target: 30, unit: "min".into() };
    assert!((goal.ratio() - 0.6).abs() < 1e-9);
    assert_eq!(DailyGoal { current: 45, target: 30, unit: "min".into() }.ratio(), 1.0);
    assert_eq!(DailyGoal { current: 3, target: 0, unit: "min".into() }.ratio(), 1.0);
  }

  #[test]
  fn course_progress_is_clamped() {
    let mut course = content().learning.recent_courses[0].clone();
    course.progress = 140;
    assert_eq!(course.progress_ratio(), 1.0);
    course.progress = -5;
    assert_eq!(course.progress_ratio(), 0.0);
  }
}
