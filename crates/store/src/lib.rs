//! Persistence for triggers, execution history, and the company directory.
//!
//! One storage interface ([`TriggerStore`] + [`CompanyDirectory`]), one
//! implementation per backend behind it:
//! - [`PgStore`]: PostgreSQL via sqlx, schema bootstrapped at connect
//! - [`MemoryStore`]: in-memory backend for tests and storeless runs
//!
//! The engine crates never see SQL; they only depend on the traits here.

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use traits::{CompanyDirectory, TriggerStore};
