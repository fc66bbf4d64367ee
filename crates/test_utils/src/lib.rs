//! Test Utilities Crate
//!
//! Shared test infrastructure, fixtures, and helpers for the quoting
//! workspace.
//!
//! # Modules
//!
//! - `fixtures`: Fixed rating rules, modifiers and timestamps
//! - `builders`: Builders for rules, modifier definitions and in-memory quotes
//! - `database`: PostgreSQL testcontainer and catalog seeding
//! - `assertions`: Assertions over premium breakdowns
//! - `generators`: Proptest strategies and `fake` insured details

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
