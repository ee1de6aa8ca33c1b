//! The `KvStore` trait and the fixed keys the application persists under.
//!
//! Every collection is saved as one JSON blob and replaced whole on each
//! write. Backends (e.g. `segak-store-sqlite`) implement this trait; the
//! [`Segak`](crate::app::Segak) controller depends only on the abstraction.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{Mutex, PoisonError},
};

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Storage keys. The strings match those of the browser application so a
/// copied local-storage dump can be loaded as is.
pub mod keys {
  pub const USERS: &str = "segak_users";
  pub const STUDENTS: &str = "segak_data_v3";
  pub const ACTIVE_YEAR: &str = "segak_active_year";
  pub const SETTINGS: &str = "segak_settings";
  pub const SESSION: &str = "segak_session";
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A string-keyed store of string blobs.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait KvStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the blob under `key`. Returns `None` if absent.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Replace the blob under `key`.
  fn put<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete the blob under `key`; a missing key is not an error.
  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── In-memory backend ───────────────────────────────────────────────────────

/// A process-local store — useful for testing.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Snapshot of the raw blob under `key`.
  pub fn raw(&self, key: &str) -> Option<String> {
    self
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get(key)
      .cloned()
  }
}

impl KvStore for MemoryStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> { Ok(self.raw(key)) }

  async fn put(&self, key: &str, value: String) -> Result<(), Infallible> {
    self
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key.to_owned(), value);
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), Infallible> {
    self
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(key);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn put_get_remove() {
    let store = MemoryStore::new();
    assert_eq!(store.get(keys::SETTINGS).await.unwrap(), None);
    store.put(keys::SETTINGS, "{}".into()).await.unwrap();
    assert_eq!(store.get(keys::SETTINGS).await.unwrap().as_deref(), Some("{}"));
    store.remove(keys::SETTINGS).await.unwrap();
    store.remove(keys::SETTINGS).await.unwrap();
    assert_eq!(store.raw(keys::SETTINGS), None);
  }
}
