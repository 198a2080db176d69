//! Infrastructure adapters: Postgres persistence and the email provider.

pub mod database;
pub mod email;

pub use database::{PostgresConfig, PostgresStore};
pub use email::{ResendClient, ResendConfig};
