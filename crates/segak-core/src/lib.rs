//! Core types and logic for the SEGAK fitness-test record keeper.
//!
//! This crate has no HTTP or database dependencies.
//! Persistence goes through the [`store::KvStore`] trait; all application
//! state is owned by the [`app::Segak`] controller.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod app;
pub mod auth;
pub mod backup;
pub mod bmi;
pub mod dashboard;
pub mod error;
pub mod report;
pub mod roster;
pub mod settings;
pub mod status;
pub mod store;
pub mod student;
pub mod user;

pub use app::{Policy, Segak};
pub use error::{Error, Result};
