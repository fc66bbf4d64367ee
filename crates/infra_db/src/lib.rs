//! Infrastructure Database Layer
//!
//! PostgreSQL storage for quotes and the rating catalog, built on SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: [`repositories`] holds the SQL
//! and row types, and [`adapters`] implements the domain's `QuotePort` on
//! top of them, translating rows into domain models and database errors
//! into `PortError`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresQuoteAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/quotes")).await?;
//! run_migrations(&pool).await?;
//! let adapter = PostgresQuoteAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use repositories::QuoteRepository;
pub use adapters::{PostgresQuoteAdapter, PostgresQuoteUnitOfWork};
