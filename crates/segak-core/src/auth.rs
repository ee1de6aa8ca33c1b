//! Password hashing with argon2.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand_core::OsRng;

use crate::{Error, Result};

/// Hash `password` into an argon2 PHC string, e.g. `$argon2id$v=19$…`.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Use `secret` as is when it already is an argon2 PHC string (as printed by
/// `segak-server --hash-password`), otherwise hash it.
pub fn hash_unless_phc(secret: &str) -> Result<String> {
  if secret.starts_with("$argon2") && PasswordHash::new(secret).is_ok() {
    Ok(secret.to_owned())
  } else {
    hash_password(secret)
  }
}

/// `false` for a wrong password and for an unparseable hash alike.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}
