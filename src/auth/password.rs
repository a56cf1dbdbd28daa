use std::sync::Arc;

use crate::Error;

/// Placeholder verified against when an email is unknown, so that a login for
/// a missing account costs the same bcrypt work as one with a wrong password.
const DUMMY_PASSWORD: &str = "enrollment-service/no-such-account";

/// bcrypt hashing with a fixed work factor.
///
/// All methods block for the duration of the bcrypt computation; callers on an
/// async runtime run them on the blocking pool.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, Error> {
        let dummy_hash = bcrypt::hash(DUMMY_PASSWORD, cost)?;
        Ok(Self {
            cost,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, password: &str) -> Result<String, Error> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    /// Check `password` against a stored hash.
    ///
    /// With `stored_hash` of `None` the check runs against the dummy hash and
    /// always fails, so unknown accounts and wrong passwords are
    /// indistinguishable in both result and timing.
    pub fn verify(&self, password: &str, stored_hash: Option<&str>) -> Result<(), Error> {
        let (hash, known) = match stored_hash {
            Some(hash) => (hash, true),
            None => (&*self.dummy_hash, false),
        };

        if bcrypt::verify(password, hash)? && known {
            Ok(())
        } else {
            Err(Error::InvalidCredentials)
        }
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}
