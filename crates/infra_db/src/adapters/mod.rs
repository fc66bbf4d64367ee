//! Domain Adapters
//!
//! Adapter implementations for domain ports, connecting the quoting
//! domain's port traits to the PostgreSQL database layer.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresQuoteAdapter;
//! use domain_quote::QuotePort;
//!
//! let adapter = PostgresQuoteAdapter::new(pool);
//! let quote = adapter.get_quote(quote_id).await?;
//! ```

pub mod quote;

pub use quote::{PostgresQuoteAdapter, PostgresQuoteUnitOfWork};
