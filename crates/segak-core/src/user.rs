//! User accounts and roles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, auth};

/// Id of the account created on first start; it can never be deleted.
pub const SEED_ADMIN_ID: &str = "admin-1";
pub const SEED_ADMIN_LOGIN: &str = "admin";
pub const SEED_ADMIN_NAME: &str = "PENTADBIR SISTEM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
  Admin,
  #[default]
  #[serde(rename = "Guru")]
  Teacher,
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Admin => f.write_str("Admin"),
      Self::Teacher => f.write_str("Guru"),
    }
  }
}

/// A stored account. The password is kept only as an argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:            String,
  #[serde(rename = "userId")]
  pub login_id:      String,
  pub name:          String,
  #[serde(rename = "passwordHash", default)]
  pub password_hash: String,
  pub role:          Role,
  /// Plaintext password as kept by the browser application; hashed and
  /// dropped on first load.
  #[serde(rename = "password", default, skip_serializing)]
  pub(crate) legacy_password: Option<String>,
}

/// The public face of a [`User`]; what sessions and API responses carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub id:       String,
  #[serde(rename = "userId")]
  pub login_id: String,
  pub name:     String,
  pub role:     Role,
}

impl User {
  pub fn profile(&self) -> UserProfile {
    UserProfile {
      id:       self.id.clone(),
      login_id: self.login_id.clone(),
      name:     self.name.clone(),
      role:     self.role,
    }
  }

  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  /// Replace a legacy plaintext password with its hash. Returns whether the
  /// record changed.
  pub(crate) fn upgrade_password(&mut self) -> Result<bool> {
    let Some(plain) = self.legacy_password.take() else {
      return Ok(false);
    };
    if self.password_hash.is_empty() {
      self.password_hash = auth::hash_password(&plain)?;
    }
    Ok(true)
  }

  /// `password` may be plaintext or a ready argon2 PHC string.
  pub(crate) fn seed_admin(password: &str) -> Result<Self> {
    Ok(Self {
      id:              SEED_ADMIN_ID.into(),
      login_id:        SEED_ADMIN_LOGIN.into(),
      name:            SEED_ADMIN_NAME.into(),
      password_hash:   auth::hash_unless_phc(password)?,
      role:            Role::Admin,
      legacy_password: None,
    })
  }
}

impl UserProfile {
  /// Typed authorization check for restricted operations.
  pub fn require(&self, role: Role) -> Result<()> {
    if self.role == role {
      Ok(())
    } else {
      Err(Error::Forbidden { required: role })
    }
  }
}

/// Fields an Admin supplies when creating an account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
  pub name:     String,
  #[serde(rename = "userId")]
  pub login_id: String,
  pub password: String,
  #[serde(default)]
  pub role:     Role,
}

impl NewUser {
  pub(crate) fn into_user(self) -> Result<User> {
    let name = self.name.trim().to_uppercase();
    let login_id = self.login_id.trim().to_lowercase();
    if name.is_empty() {
      return Err(Error::MissingField("name"));
    }
    if login_id.is_empty() {
      return Err(Error::MissingField("userId"));
    }
    if self.password.is_empty() {
      return Err(Error::MissingField("password"));
    }
    Ok(User {
      id: uuid::Uuid::new_v4().to_string(),
      login_id,
      name,
      password_hash: auth::hash_password(&self.password)?,
      role: self.role,
      legacy_password: None,
    })
  }
}
