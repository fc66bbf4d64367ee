//! Repository implementations for domain entities
//!
//! Repositories encapsulate SQL queries and map between database rows and
//! plain row structs. Queries are built at runtime with `sqlx::query_as`, so
//! the crate compiles without a live database.

pub mod quote;

pub use quote::QuoteRepository;
