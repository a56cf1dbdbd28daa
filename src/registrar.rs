//! The registrar: every operation the HTTP layer exposes, independent of HTTP.
//!
//! SQLite calls and bcrypt work block, so they run on tokio's blocking pool.
//! Storage calls are additionally bounded by the configured operation
//! timeout; a call that overruns fails with [`Error::StorageTimeout`].

use std::time::Duration;

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::config::{AuthConfig, StorageConfig};
use crate::db::Database;
use crate::models::*;
use crate::Error;

#[derive(Clone, Debug)]
pub struct Registrar {
    db: Database,
    passwords: PasswordHasher,
    tokens: TokenIssuer,
    storage_timeout: Duration,
}

impl Registrar {
    /// Build a registrar. Hashes a dummy password once, so this takes as long
    /// as a single bcrypt round at the configured cost.
    pub fn new(db: Database, auth: &AuthConfig, storage: &StorageConfig) -> anyhow::Result<Self> {
        Ok(Self {
            db,
            passwords: PasswordHasher::new(auth.hash_cost())?,
            tokens: TokenIssuer::new(auth)?,
            storage_timeout: storage.operation_timeout,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    // ============================================================
    // Credentials
    // ============================================================

    pub async fn register(&self, input: RegisterInput) -> Result<Student, Error> {
        let new_student = NewStudent::try_from(input)?;

        let passwords = self.passwords.clone();
        let password = new_student.password;
        let hash = blocking(move || passwords.hash(&password)).await?;

        let (name, email) = (new_student.name, new_student.email);
        let student = self
            .with_db(move |db| db.create_student(&name, &email, &hash))
            .await?;

        tracing::info!("Registered student {}", student.id);
        Ok(student)
    }

    /// Check an email and password pair.
    ///
    /// An unknown email and a wrong password both yield
    /// [`Error::InvalidCredentials`] after the same amount of hashing work.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Student, Error> {
        if password.is_empty() {
            return Err(Error::InvalidCredentials);
        }

        let lookup = email.trim().to_string();
        let found = self
            .with_db(move |db| db.find_credentials(&lookup))
            .await?;

        let passwords = self.passwords.clone();
        let password = zeroize::Zeroizing::new(password.to_string());
        blocking(move || {
            let (student, hash) = found.unzip();
            passwords.verify(&password, hash.as_deref())?;
            student.ok_or(Error::InvalidCredentials)
        })
        .await
    }

    pub async fn login(&self, input: LoginInput) -> Result<LoginResponse, Error> {
        let student = self.verify_credentials(&input.email, &input.password).await?;
        let token = self.tokens.issue(student.id)?;
        tracing::info!("Student {} logged in", student.id);
        Ok(LoginResponse { token })
    }

    // ============================================================
    // Sessions
    // ============================================================

    /// Resolve a bearer token to the student it was issued for.
    pub fn authenticate(&self, token: &str) -> Result<StudentId, Error> {
        self.tokens.validate(token)
    }

    // ============================================================
    // Courses and enrollments
    // ============================================================

    pub async fn list_courses(&self) -> Result<Vec<Course>, Error> {
        self.with_db(|db| db.get_all_courses()).await
    }

    pub async fn enroll(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Enrollment, Error> {
        let enrollment = self
            .with_db(move |db| db.create_enrollment(student_id, course_id))
            .await?;
        tracing::info!("Student {} enrolled in course {}", student_id, course_id);
        Ok(enrollment)
    }

    pub async fn list_enrollments(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<EnrollmentView>, Error> {
        self.with_db(move |db| db.get_enrollments_by_student(student_id))
            .await
    }

    // ============================================================
    // Ratings
    // ============================================================

    pub async fn rate(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        rating: i64,
    ) -> Result<RatingOutcome, Error> {
        let score = Score::new(rating)?;
        let outcome = self
            .with_db(move |db| db.rate_course(student_id, course_id, score))
            .await?;
        tracing::info!(
            "Student {} rated course {} with {}; course rating is now {:.2}",
            student_id,
            course_id,
            score.get(),
            outcome.course_rating
        );
        Ok(outcome)
    }

    async fn with_db<T, F>(&self, op: F) -> Result<T, Error>
    where
        F: FnOnce(&Database) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        match tokio::time::timeout(self.storage_timeout, blocking(move || op(&db))).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Storage operation exceeded {:?}", self.storage_timeout);
                Err(Error::StorageTimeout)
            }
        }
    }
}

async fn blocking<T, F>(op: F) -> Result<T, Error>
where
    F: FnOnce() -> Result<T, Error> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| Error::Worker(e.to_string()))?
}
