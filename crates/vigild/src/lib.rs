//! vigild - remote progression store.
//!
//! Key-value service holding one whole `UserProgress` record per account,
//! addressed by user id. Guest progression never reaches it.

pub mod routes;
pub mod server;

pub use server::{app, run, AppState};
