//! Domain models for the enrollment service.
//!
//! # Core Concepts
//!
//! - [`Student`]: A registered identity. The password hash is held only by the
//!   storage layer and never appears on this type.
//! - [`Course`]: A seeded course with an aggregate rating. The aggregate starts
//!   at [`DEFAULT_COURSE_RATING`] and is replaced by the mean of student
//!   ratings once the first rating arrives.
//! - [`Enrollment`]: The link between one student and one course. A student can
//!   enroll in a course at most once, and rate that enrollment at most once.

mod course;
mod enrollment;
mod student;

pub use course::*;
pub use enrollment::*;
pub use student::*;

use serde::{Deserialize, Serialize};

/// Plain acknowledgement body, e.g. `{"message": "Enrolled successfully"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

row_id!(
    /// Database id of a [`Student`].
    StudentId
);
row_id!(
    /// Database id of a [`Course`].
    CourseId
);
row_id!(EnrollmentId);
