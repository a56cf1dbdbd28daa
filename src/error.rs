use thiserror::Error;

/// Every way a registrar operation can fail.
///
/// Most variants are expected outcomes of a well-formed request (a duplicate
/// email, a second rating) and are reported back to the caller. The last four
/// are infrastructure faults; see [`Error::is_client_fault`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("Email already exists")]
    DuplicateIdentity,

    /// Unknown email and wrong password both map here.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Course not found")]
    CourseNotFound,

    #[error("Already enrolled")]
    AlreadyEnrolled,

    #[error("Not enrolled in course")]
    NotEnrolled,

    #[error("Already rated")]
    AlreadyRated,

    #[error("Password hashing failed: {0}")]
    HashingFailure(#[from] bcrypt::BcryptError),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Storage operation timed out")]
    StorageTimeout,

    #[error("Background worker failed: {0}")]
    Worker(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True when the request itself was at fault and retrying it unchanged
    /// will fail the same way.
    pub fn is_client_fault(&self) -> bool {
        !matches!(
            self,
            Self::HashingFailure(_) | Self::Storage(_) | Self::StorageTimeout | Self::Worker(_)
        )
    }
}
