//! SQLite storage for students, courses and enrollments.
//!
//! The two check-then-act operations, enrolling and rating, run inside
//! `BEGIN IMMEDIATE` transactions. SQLite grants one such transaction at a
//! time per database file, so concurrent enrollments or ratings are
//! serialized even across separate [`Database`] handles or processes sharing
//! the file. The UNIQUE index on `(student_id, course_id)` backs the
//! enrollment check independently of the transaction.

mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, ToSql, TransactionBehavior};

use crate::config::DEFAULT_STORAGE_TIMEOUT;
use crate::models::*;
use crate::Error;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_STORAGE_TIMEOUT)
    }

    /// Open a database file, waiting up to `busy_timeout` whenever another
    /// connection holds the write lock.
    pub fn open_with_timeout(path: PathBuf, busy_timeout: Duration) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::configure(conn, busy_timeout)
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(conn, DEFAULT_STORAGE_TIMEOUT)
    }

    fn configure(conn: Connection, busy_timeout: Duration) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(busy_timeout)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        schema::run_migrations(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.conn
            .lock()
            .map_err(|_| Error::Worker("database lock poisoned".to_string()))
    }

    // ============================================================
    // Student operations
    // ============================================================

    /// Insert a student with an already-hashed password.
    ///
    /// Email uniqueness is left to the UNIQUE constraint so that two
    /// concurrent registrations for one address cannot both succeed.
    pub fn create_student(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Student, Error> {
        let conn = self.lock()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO students (name, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
            (name, email, password_hash, now.to_rfc3339()),
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::DuplicateIdentity
            } else {
                Error::Storage(e)
            }
        })?;

        Ok(Student {
            id: StudentId::new(conn.last_insert_rowid()),
            name: name.to_string(),
            email: email.to_string(),
            created_at: now,
        })
    }

    pub fn get_student(&self, id: StudentId) -> Result<Option<Student>, Error> {
        let conn = self.lock()?;
        let student = conn
            .query_row(
                "SELECT id, name, email, created_at FROM students WHERE id = ?",
                [id],
                |row| {
                    Ok(Student {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        created_at: parse_datetime(row.get::<_, String>(3)?),
                    })
                },
            )
            .optional()?;
        Ok(student)
    }

    /// Look up a student and their password hash by exact email.
    pub fn find_credentials(&self, email: &str) -> Result<Option<(Student, String)>, Error> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT id, name, email, created_at, password_hash FROM students WHERE email = ?",
                [email],
                |row| {
                    Ok((
                        Student {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            email: row.get(2)?,
                            created_at: parse_datetime(row.get::<_, String>(3)?),
                        },
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        Ok(found)
    }

    // ============================================================
    // Course operations
    // ============================================================

    /// Insert each seed course that does not exist yet. Returns how many
    /// were created.
    pub fn seed_courses(&self) -> Result<usize, Error> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let mut created = 0;

        for name in SEED_COURSES {
            created += conn.execute(
                "INSERT OR IGNORE INTO courses (name, rating, created_at) VALUES (?, ?, ?)",
                (name, DEFAULT_COURSE_RATING, &now),
            )?;
        }

        Ok(created)
    }

    pub fn get_all_courses(&self) -> Result<Vec<Course>, Error> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, name, rating, created_at FROM courses ORDER BY id")?;

        let courses = stmt
            .query_map([], course_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(courses)
    }

    pub fn get_course(&self, id: CourseId) -> Result<Option<Course>, Error> {
        let conn = self.lock()?;
        let course = conn
            .query_row(
                "SELECT id, name, rating, created_at FROM courses WHERE id = ?",
                [id],
                course_from_row,
            )
            .optional()?;
        Ok(course)
    }

    // ============================================================
    // Enrollment operations
    // ============================================================

    /// Enroll a student in a course.
    ///
    /// The duplicate check runs before the course lookup, so enrolling twice
    /// in a course that has since vanished still reports `AlreadyEnrolled`.
    pub fn create_enrollment(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Enrollment, Error> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<EnrollmentId> = tx
            .query_row(
                "SELECT id FROM enrollments WHERE student_id = ? AND course_id = ?",
                (student_id, course_id),
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(Error::AlreadyEnrolled);
        }

        let course_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?)",
            [course_id],
            |row| row.get(0),
        )?;
        if !course_exists {
            return Err(Error::CourseNotFound);
        }

        let now = Utc::now();
        tx.execute(
            "INSERT INTO enrollments (student_id, course_id, created_at) VALUES (?, ?, ?)",
            (student_id, course_id, now.to_rfc3339()),
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::AlreadyEnrolled
            } else {
                Error::Storage(e)
            }
        })?;
        let id = EnrollmentId::new(tx.last_insert_rowid());
        tx.commit()?;

        Ok(Enrollment {
            id,
            student_id,
            course_id,
            rating: None,
            created_at: now,
        })
    }

    pub fn get_enrollment(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, Error> {
        let conn = self.lock()?;
        let enrollment = conn
            .query_row(
                "SELECT id, student_id, course_id, rating, created_at
                 FROM enrollments WHERE student_id = ? AND course_id = ?",
                (student_id, course_id),
                enrollment_from_row,
            )
            .optional()?;
        Ok(enrollment)
    }

    /// All of a student's enrollments with each course's current state, in
    /// the order they were created.
    pub fn get_enrollments_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<EnrollmentView>, Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, e.rating, c.rating
             FROM enrollments e JOIN courses c ON c.id = e.course_id
             WHERE e.student_id = ? ORDER BY e.id",
        )?;

        let views = stmt
            .query_map([student_id], |row| {
                Ok(EnrollmentView {
                    course_id: row.get(0)?,
                    course_name: row.get(1)?,
                    rating: row.get(2)?,
                    course_rating: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(views)
    }

    pub fn count_enrollments(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<i64, Error> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM enrollments WHERE student_id = ? AND course_id = ?",
            (student_id, course_id),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ============================================================
    // Rating operations
    // ============================================================

    /// Record a student's rating for a course and recompute the course mean.
    ///
    /// Everything from the enrollment lookup to the aggregate write happens
    /// in one IMMEDIATE transaction, so the mean always covers every rating
    /// committed before it.
    pub fn rate_course(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        score: Score,
    ) -> Result<RatingOutcome, Error> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let enrollment = tx
            .query_row(
                "SELECT id, student_id, course_id, rating, created_at
                 FROM enrollments WHERE student_id = ? AND course_id = ?",
                (student_id, course_id),
                enrollment_from_row,
            )
            .optional()?
            .ok_or(Error::NotEnrolled)?;
        if enrollment.is_rated() {
            return Err(Error::AlreadyRated);
        }

        tx.execute(
            "UPDATE enrollments SET rating = ? WHERE id = ? AND rating IS NULL",
            (score, enrollment.id),
        )?;

        let (sum, count): (i64, i64) = tx.query_row(
            "SELECT COALESCE(SUM(rating), 0), COUNT(rating)
             FROM enrollments WHERE course_id = ? AND rating IS NOT NULL",
            [course_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        // The rating written above guarantees count >= 1
        let course_rating = mean_rating(sum, count).unwrap_or(f64::from(score.get()));

        tx.execute(
            "UPDATE courses SET rating = ? WHERE id = ?",
            (course_rating, course_id),
        )?;
        tx.commit()?;

        Ok(RatingOutcome {
            course_id,
            rating: score,
            course_rating,
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "enrollment-service")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("enrollment.db"))
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn course_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        rating: row.get(2)?,
        created_at: parse_datetime(row.get::<_, String>(3)?),
    })
}

fn enrollment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        id: row.get(0)?,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        rating: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

macro_rules! sql_id {
    ($($name:ident),*) => {$(
        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.get()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map($name::new)
            }
        }
    )*};
}

sql_id!(StudentId, CourseId, EnrollmentId);

impl ToSql for Score {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(*self)))
    }
}

impl FromSql for Score {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        Score::new(raw).map_err(|_| rusqlite::types::FromSqlError::OutOfRange(raw))
    }
}
