//! Credential hashing and bearer-token sessions.

mod password;
mod token;

pub use password::PasswordHasher;
pub use token::{Claims, TokenIssuer};
