//! Quoting Domain
//!
//! This crate implements the quote lifecycle and the premium calculation
//! engine, following the same ports-and-adapters layout as the rest of the
//! workspace: storage is reached only through [`ports::QuotePort`].
//!
//! # Quote Lifecycle
//!
//! ```text
//! Draft --submit--> Submitted --bind--> Bound
//!   ^                  |                  |
//!   +------revise------+                  |
//!   +-----------revise_binding------------+
//! ```
//!
//! Only draft quotes can be edited. Premium calculation is allowed in any
//! status and can be repeated; it always yields the same breakdown for the
//! same inputs.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_quote::{QuoteService, MockQuotePort};
//!
//! let port = Arc::new(MockQuotePort::new());
//! let service = QuoteService::new(port);
//!
//! let snapshot = service.calculate(quote_id).await?;
//! println!("total premium: {:?}", snapshot.total_premium);
//! ```

pub mod rating;
pub mod quote;
pub mod calculation;
pub mod snapshot;
pub mod ports;
pub mod services;
pub mod error;

pub use rating::{PremiumRule, PremiumType, ModifierDefinition, ModifierType, ValueType};
pub use quote::{Quote, QuoteCover, QuoteModifier, QuoteStatus};
pub use calculation::{
    compute_breakdown, CoverPremium, ModifierImpact, PremiumBreakdown, PremiumCalculationEngine,
};
pub use snapshot::{QuoteSnapshot, CoverLine, ModifierLine, QuoteSummary};
pub use ports::{
    QuotePort, QuoteUnitOfWork, NewQuote, QuoteCoverInput, QuoteModifierInput, QuoteUpdate,
    QuoteFilter,
};
pub use services::QuoteService;
pub use error::QuoteError;

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockQuotePort;
