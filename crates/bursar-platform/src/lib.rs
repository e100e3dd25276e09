pub mod config;
pub mod db;
pub mod pg_store;

pub use config::ServiceConfig;
pub use db::{connect_database, run_migrations};
pub use pg_store::PgStore;
