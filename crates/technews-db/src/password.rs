//! Password hashing stage of the user write path.
//!
//! Store functions that write the `password` column take a [`HashedPassword`],
//! and the only way to build one is [`hash`]. A plaintext can therefore never
//! reach the database, and an existing hash is never fed back through [`hash`].

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use rusqlite::types::{ToSql, ToSqlOutput};
use tracing::warn;

use crate::{StoreError, StoreResult};

/// Argon2id cost: memory in KiB, iterations, lanes.
const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

/// A PHC-format Argon2id hash, ready to be stored.
#[derive(Debug, Clone)]
pub struct HashedPassword(String);

impl HashedPassword {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ToSql for HashedPassword {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

fn hasher() -> StoreResult<Argon2<'static>> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .map_err(|e| StoreError::Hashing(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Salt and hash a plaintext password. CPU-bound; call from a blocking context.
pub fn hash(plaintext: &str) -> StoreResult<HashedPassword> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| StoreError::Hashing(e.to_string()))?
        .to_string();
    Ok(HashedPassword(hash))
}

/// Check a candidate plaintext against a stored hash. An unparseable stored
/// value never matches.
pub fn verify(candidate: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is not valid PHC: {}", e);
            return false;
        }
    };

    // Parameters come from the stored hash, so this also verifies hashes
    // written with different cost settings.
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}
