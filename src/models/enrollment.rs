use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CourseId, EnrollmentId, StudentId};
use crate::Error;

/// A student's rating of a course, between [`Score::MIN`] and [`Score::MAX`]
/// inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 100;

    pub fn new(value: i64) -> Result<Self, Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or_else(|| {
                Error::validation(format!(
                    "Rating must be between {} and {}",
                    Self::MIN,
                    Self::MAX
                ))
            })
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for i64 {
    fn from(score: Score) -> Self {
        i64::from(score.0)
    }
}

/// The link between a student and a course.
///
/// There is at most one enrollment per (student, course) pair. `rating` is
/// `None` until the student rates the course and is never changed after that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub rating: Option<Score>,
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn is_rated(&self) -> bool {
        self.rating.is_some()
    }
}

/// An enrollment as listed to its student, with the course's current state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentView {
    pub course_id: CourseId,
    pub course_name: String,
    /// The student's own rating, if given.
    pub rating: Option<Score>,
    /// The course's aggregate rating across all students.
    pub course_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentsResponse {
    pub enrollments: Vec<EnrollmentView>,
}

/// Input for enrolling the current student in a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollInput {
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollResponse {
    pub message: String,
    pub enrollment: Enrollment,
}

/// Input for rating a course. `rating` is range-checked by [`Score::new`]
/// rather than at deserialization so out-of-range values get a clear message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateInput {
    pub course_id: CourseId,
    pub rating: i64,
}

/// Result of a successful rating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingOutcome {
    pub course_id: CourseId,
    pub rating: Score,
    /// The course aggregate after this rating was counted.
    pub course_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: RatingOutcome,
}
