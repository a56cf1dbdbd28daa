use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CourseId;

/// Aggregate rating a course carries before anyone has rated it.
pub const DEFAULT_COURSE_RATING: f64 = 70.0;

/// Courses created by the startup seed step.
pub const SEED_COURSES: &[&str] = &[
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "Computer Science",
];

/// A course students can enroll in.
///
/// `rating` is the arithmetic mean of every rating students have given the
/// course. Until the first rating arrives it holds [`DEFAULT_COURSE_RATING`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoursesResponse {
    pub courses: Vec<Course>,
}

/// Mean of `count` ratings summing to `sum`, or `None` when nothing was rated.
pub fn mean_rating(sum: i64, count: i64) -> Option<f64> {
    (count > 0).then(|| sum as f64 / count as f64)
}
