//! Core Kernel - Foundational types shared by the quoting crates
//!
//! This crate provides the building blocks used by the domain, storage and API layers:
//! - Strongly-typed identifiers for catalog and quote entities
//! - Currency codes and percentage rates with exact decimal arithmetic
//! - The port error taxonomy and marker traits for storage adapters

pub mod money;
pub mod identifiers;
pub mod ports;

pub use money::{Currency, MoneyError, Rate};
pub use identifiers::{
    QuoteId, QuoteCoverId, QuoteModifierId, CoverId, PremiumRuleId, ModifierId,
    ProductId, BrokerId, UnderwriterId, UserId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
