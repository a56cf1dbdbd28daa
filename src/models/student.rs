use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::StudentId;
use crate::Error;

/// Passwords are fed to bcrypt, which only reads the first 72 bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// A registered student.
///
/// Students are created once at registration and never edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    /// Stored exactly as registered; lookups are case-sensitive.
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a new student.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for RegisterInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterInput")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration input after validation.
///
/// ## Invariants
/// - `name` is trimmed and non-empty.
/// - `email` is trimmed, non-empty and contains a single `@` with text on
///   both sides.
/// - `password` is non-empty and at most [`MAX_PASSWORD_BYTES`] long. It keeps
///   caller whitespace and is wiped from memory on drop.
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub password: Zeroizing<String>,
}

impl TryFrom<RegisterInput> for NewStudent {
    type Error = Error;

    fn try_from(input: RegisterInput) -> Result<Self, Self::Error> {
        let password = Zeroizing::new(input.password);

        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::validation("Name must not be empty"));
        }

        let email = input.email.trim();
        if !is_plausible_email(email) {
            return Err(Error::validation("Email address is not valid"));
        }

        validate_password(&password)?;

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            password,
        })
    }
}

pub(crate) fn validate_password(password: &str) -> Result<(), Error> {
    if password.is_empty() {
        return Err(Error::validation("Password must not be empty"));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(Error::validation(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Input for logging in.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginInput")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response to a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Response to a successful registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub student: Student,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn trims_name_and_email() {
        let student = NewStudent::try_from(input("  Ada ", " ada@example.com ", " pw "))
            .expect("valid input");
        assert_eq!(student.name, "Ada");
        assert_eq!(student.email, "ada@example.com");
        assert_eq!(student.password.as_str(), " pw ");
    }

    #[test]
    fn keeps_email_case() {
        let student =
            NewStudent::try_from(input("Ada", "Ada@Example.com", "pw")).expect("valid input");
        assert_eq!(student.email, "Ada@Example.com");
    }

    #[test]
    fn rejects_blank_name() {
        let err = NewStudent::try_from(input("   ", "ada@example.com", "pw")).err();
        assert!(matches!(err, Some(Error::Validation(_))));
    }

    #[test]
    fn rejects_malformed_emails() {
        for email in ["", "ada", "@example.com", "ada@", "a@b@c", "ada @example.com"] {
            let err = NewStudent::try_from(input("Ada", email, "pw")).err();
            assert!(
                matches!(err, Some(Error::Validation(_))),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_empty_password() {
        let err = NewStudent::try_from(input("Ada", "ada@example.com", "")).err();
        assert!(matches!(err, Some(Error::Validation(_))));
    }

    #[test]
    fn rejects_password_beyond_bcrypt_limit() {
        let long = "x".repeat(MAX_PASSWORD_BYTES + 1);
        let err = NewStudent::try_from(input("Ada", "ada@example.com", &long)).err();
        assert!(matches!(err, Some(Error::Validation(_))));

        let exact = "x".repeat(MAX_PASSWORD_BYTES);
        assert!(NewStudent::try_from(input("Ada", "ada@example.com", &exact)).is_ok());
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", input("Ada", "ada@example.com", "hunter2"));
        assert!(!rendered.contains("hunter2"));
        let rendered = format!(
            "{:?}",
            LoginInput {
                email: "ada@example.com".into(),
                password: "hunter2".into(),
            }
        );
        assert!(!rendered.contains("hunter2"));
    }
}
