//! Integration tests for `SqliteStore` against an in-memory database.

use segak_core::{
  Policy, Segak,
  store::{KvStore, keys},
  student::{NewStudent, Phase, TestResultInput},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Raw key-value access ────────────────────────────────────────────────────

#[tokio::test]
async fn missing_key_returns_none() {
  let s = store().await;
  assert_eq!(s.get(keys::STUDENTS).await.unwrap(), None);
}

#[tokio::test]
async fn put_replaces_previous_value() {
  let s = store().await;
  s.put(keys::ACTIVE_YEAR, "2025".into()).await.unwrap();
  s.put(keys::ACTIVE_YEAR, "2026".into()).await.unwrap();
  assert_eq!(s.get(keys::ACTIVE_YEAR).await.unwrap().as_deref(), Some("2026"));
  assert_eq!(s.keys().await.unwrap(), [keys::ACTIVE_YEAR]);
}

#[tokio::test]
async fn remove_is_idempotent() {
  let s = store().await;
  s.put(keys::SESSION, "{}".into()).await.unwrap();
  s.remove(keys::SESSION).await.unwrap();
  s.remove(keys::SESSION).await.unwrap();
  assert_eq!(s.get(keys::SESSION).await.unwrap(), None);
}

#[tokio::test]
async fn file_store_survives_reopen() {
  let path = std::env::temp_dir().join(format!("segak-test-{}.db", std::process::id()));
  let _ = std::fs::remove_file(&path);
  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.put(keys::SETTINGS, r#"{"namaGuru":"CIKGU RAZAK"}"#.into()).await.unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(
    s.get(keys::SETTINGS).await.unwrap().as_deref(),
    Some(r#"{"namaGuru":"CIKGU RAZAK"}"#)
  );
  drop(s);
  let _ = std::fs::remove_file(&path);
}

// ─── Through the controller ──────────────────────────────────────────────────

#[tokio::test]
async fn controller_persists_through_sqlite() {
  let s = store().await;
  let mut app = Segak::open(s.clone(), Policy::default()).await.unwrap();
  app.set_active_year("2025").await.unwrap();
  let student = app
    .add_student(NewStudent {
      name: "Ahmad bin Ali".into(),
      ic: "080101015543".into(),
      form: "3".into(),
      class: "A".into(),
      year: "2025".into(),
      ..Default::default()
    })
    .await
    .unwrap();
  app
    .record_result(&student.id, Phase::One, TestResultInput {
      height_cm: 165.0,
      weight_kg: 55.0,
      ..Default::default()
    })
    .await
    .unwrap();

  let reopened = Segak::open(s.clone(), Policy::default()).await.unwrap();
  let loaded = reopened.student(&student.id).unwrap();
  assert_eq!(loaded.name, "AHMAD BIN ALI");
  assert_eq!(loaded.phase1.as_ref().map(|r| r.bmi), Some(20.2));
  assert_eq!(reopened.active_year(), "2025");

  let raw = s.get(keys::STUDENTS).await.unwrap().unwrap();
  let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
  assert_eq!(json[0]["nama"], "AHMAD BIN ALI");
  assert_eq!(json[0]["fasa1"]["tinggi"], 165.0);
}
