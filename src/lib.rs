//! Receives GitHub `push` and `pull_request` webhooks, normalizes them into
//! [`event::EventRecord`]s, stores them and serves them back for display.

pub mod config;
pub mod error;
pub mod event;
pub mod server;
pub mod signature;
pub mod store;

pub use config::Config;
pub use event::{EventAction, EventKind, EventRecord, Normalized, normalize};
pub use server::{AppState, router};
pub use store::EventStore;
