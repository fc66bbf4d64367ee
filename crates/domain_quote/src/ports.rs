//! Quote Domain Ports
//!
//! The quoting domain reaches storage only through [`QuotePort`]. Every
//! mutation happens inside a [`QuoteUnitOfWork`], which is the atomicity
//! boundary: a quote loaded through it stays locked against concurrent
//! units of work until the unit is committed or dropped, and dropping it
//! without `commit` discards every write.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut uow = port.begin().await?;
//! let mut quote = uow.load_quote(id).await?.ok_or(QuoteError::QuoteNotFound(id))?;
//! quote.submit(Utc::now())?;
//! uow.save_quote(&quote).await?;
//! uow.commit().await?;
//! ```
//!
//! Adapters:
//!
//! - **Postgres Adapter**: `infra_db::PostgresQuoteAdapter`, one transaction per unit
//! - **Mock Adapter**: [`mock::MockQuotePort`], for tests without a database

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{
    BrokerId, CoverId, Currency, DomainPort, HealthCheckable, ModifierId, PortError, ProductId,
    QuoteId, UnderwriterId, UserId,
};

use crate::error::QuoteError;
use crate::quote::{Quote, QuoteStatus};
use crate::snapshot::QuoteSummary;

/// A cover selection supplied when creating or editing a quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCoverInput {
    pub cover_id: CoverId,
    pub is_selected: bool,
    pub selected_limit: Option<Decimal>,
    pub selected_deductible: Option<Decimal>,
    pub basis_value: Option<Decimal>,
}

impl QuoteCoverInput {
    /// A selected cover with the given basis and no limit or deductible
    pub fn selected(cover_id: CoverId, basis_value: Option<Decimal>) -> Self {
        Self {
            cover_id,
            is_selected: true,
            selected_limit: None,
            selected_deductible: None,
            basis_value,
        }
    }
}

/// A modifier application supplied when creating a quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteModifierInput {
    pub modifier_id: ModifierId,
    pub applied_value: Decimal,
}

/// Request for creating a new quote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewQuote {
    pub product_id: ProductId,
    pub broker_id: Option<BrokerId>,
    pub underwriter_id: Option<UnderwriterId>,
    pub insured_name: String,
    pub insured_email: Option<String>,
    pub insured_phone: Option<String>,
    pub currency: Currency,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub covers: Vec<QuoteCoverInput>,
    pub modifiers: Vec<QuoteModifierInput>,
}

impl NewQuote {
    /// Checks the fields storage cannot check
    pub fn validate(&self) -> Result<(), QuoteError> {
        validate_insured_name(&self.insured_name)?;
        validate_cover_inputs(&self.covers)
    }
}

/// Request for editing a draft quote
///
/// Header fields replace the stored values, including clearing them when
/// `None`. Modifier applications cannot be changed through an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteUpdate {
    pub broker_id: Option<BrokerId>,
    pub underwriter_id: Option<UnderwriterId>,
    pub insured_name: String,
    pub insured_email: Option<String>,
    pub insured_phone: Option<String>,
    pub currency: Currency,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub covers: Vec<QuoteCoverInput>,
}

impl QuoteUpdate {
    /// Checks the fields storage cannot check
    pub fn validate(&self) -> Result<(), QuoteError> {
        validate_insured_name(&self.insured_name)?;
        validate_cover_inputs(&self.covers)
    }
}

fn validate_insured_name(name: &str) -> Result<(), QuoteError> {
    if name.trim().is_empty() {
        return Err(QuoteError::validation("Insured name is required"));
    }
    Ok(())
}

fn validate_cover_inputs(covers: &[QuoteCoverInput]) -> Result<(), QuoteError> {
    for input in covers {
        let negative = [input.basis_value, input.selected_limit, input.selected_deductible]
            .into_iter()
            .flatten()
            .any(|value| value.is_sign_negative() && !value.is_zero());
        if negative {
            return Err(QuoteError::validation(format!(
                "Cover {} has a negative basis, limit or deductible",
                input.cover_id
            )));
        }
    }
    Ok(())
}

/// Query parameters for listing quotes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFilter {
    pub status: Option<QuoteStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl QuoteFilter {
    /// Creates a filter on status
    pub fn by_status(status: QuoteStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Adds pagination to the filter
    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// Storage port for the quoting domain
#[async_trait]
pub trait QuotePort: DomainPort + HealthCheckable {
    /// Opens a unit of work
    async fn begin(&self) -> Result<Box<dyn QuoteUnitOfWork>, PortError>;

    /// Reads a hydrated quote without taking a lock
    async fn get_quote(&self, id: QuoteId) -> Result<Option<Quote>, PortError>;

    /// Lists quote headers, newest first
    async fn list_quotes(&self, filter: QuoteFilter) -> Result<Vec<QuoteSummary>, PortError>;
}

/// One atomic read-modify-write over quote storage
#[async_trait]
pub trait QuoteUnitOfWork: Send {
    /// Loads a hydrated quote and locks it for the rest of the unit
    ///
    /// Each cover carries its active premium rule, if any, and each modifier
    /// carries its definition's type and value type. A cover or modifier
    /// whose definition is missing yields `PortError::Integrity`.
    async fn load_quote(&mut self, id: QuoteId) -> Result<Option<Quote>, PortError>;

    /// Inserts a draft quote with its cover selections and modifier applications
    async fn insert_quote(
        &mut self,
        quote: &NewQuote,
        created_by: Option<UserId>,
    ) -> Result<QuoteId, PortError>;

    /// Writes header fields, status and cover inputs
    async fn save_quote(&mut self, quote: &Quote) -> Result<(), PortError>;

    /// Writes premiums: quote totals, cover premiums and modifier impacts
    async fn save_breakdown(&mut self, quote: &Quote) -> Result<(), PortError>;

    /// Makes every write of this unit visible
    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}

/// Mock adapter for testing
///
/// This adapter keeps the catalog and quotes in memory. A unit of work holds
/// the store's lock for its whole life and works on a staged copy, so
/// concurrent units serialize and an uncommitted unit leaves no trace.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use chrono::Utc;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    use core_kernel::{AdapterHealth, HealthCheckResult, QuoteCoverId, QuoteModifierId};

    use crate::quote::{QuoteCover, QuoteModifier};
    use crate::rating::{ModifierDefinition, PremiumRule};

    #[derive(Debug, Clone)]
    struct MockCover {
        name: String,
        rules: Vec<PremiumRule>,
    }

    #[derive(Debug, Clone, Default)]
    struct MockState {
        products: HashMap<ProductId, String>,
        brokers: HashMap<BrokerId, String>,
        underwriters: HashMap<UnderwriterId, String>,
        covers: HashMap<CoverId, MockCover>,
        modifiers: HashMap<ModifierId, ModifierDefinition>,
        quotes: HashMap<QuoteId, Quote>,
    }

    impl MockState {
        /// Refreshes names and rating data from the catalog
        fn hydrate(&self, stored: &Quote) -> Result<Quote, PortError> {
            let mut quote = stored.clone();

            quote.product_name = self
                .products
                .get(&quote.product_id)
                .cloned()
                .ok_or_else(|| {
                    PortError::integrity(format!(
                        "Quote {} references missing product {}",
                        quote.id, quote.product_id
                    ))
                })?;
            quote.broker_name = quote.broker_id.and_then(|id| self.brokers.get(&id).cloned());
            quote.underwriter_name = quote
                .underwriter_id
                .and_then(|id| self.underwriters.get(&id).cloned());

            for cover in &mut quote.covers {
                let definition = self.covers.get(&cover.cover_id).ok_or_else(|| {
                    PortError::integrity(format!(
                        "Quote cover {} references missing cover {}",
                        cover.id, cover.cover_id
                    ))
                })?;
                cover.cover_name = definition.name.clone();
                cover.premium_rule = PremiumRule::select_active(&definition.rules).cloned();
            }

            for modifier in &mut quote.modifiers {
                let definition = self.modifiers.get(&modifier.modifier_id).ok_or_else(|| {
                    PortError::integrity(format!(
                        "Quote modifier {} references missing modifier {}",
                        modifier.id, modifier.modifier_id
                    ))
                })?;
                modifier.modifier_name = definition.name.clone();
                modifier.modifier_type = definition.modifier_type;
                modifier.value_type = definition.value_type;
            }

            Ok(quote)
        }

        fn build_quote(
            &self,
            request: &NewQuote,
            created_by: Option<UserId>,
        ) -> Result<Quote, PortError> {
            if !self.products.contains_key(&request.product_id) {
                return Err(PortError::validation_field("Unknown product", "product_id"));
            }
            if let Some(id) = request.broker_id {
                if !self.brokers.contains_key(&id) {
                    return Err(PortError::validation_field("Unknown broker", "broker_id"));
                }
            }
            if let Some(id) = request.underwriter_id {
                if !self.underwriters.contains_key(&id) {
                    return Err(PortError::validation_field("Unknown underwriter", "underwriter_id"));
                }
            }

            let id = QuoteId::new_v7();
            let now = Utc::now();

            let covers = request
                .covers
                .iter()
                .map(|input| {
                    if !self.covers.contains_key(&input.cover_id) {
                        return Err(PortError::validation_field("Unknown cover", "cover_id"));
                    }
                    Ok(QuoteCover {
                        id: QuoteCoverId::new_v7(),
                        quote_id: id,
                        cover_id: input.cover_id,
                        cover_name: String::new(),
                        is_selected: input.is_selected,
                        selected_limit: input.selected_limit,
                        selected_deductible: input.selected_deductible,
                        basis_value: input.basis_value,
                        calculated_premium: None,
                        premium_rule: None,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let modifiers = request
                .modifiers
                .iter()
                .map(|input| {
                    let definition = self
                        .modifiers
                        .get(&input.modifier_id)
                        .ok_or_else(|| PortError::validation_field("Unknown modifier", "modifier_id"))?;
                    Ok(QuoteModifier {
                        id: QuoteModifierId::new_v7(),
                        quote_id: id,
                        modifier_id: input.modifier_id,
                        modifier_name: String::new(),
                        modifier_type: definition.modifier_type,
                        value_type: definition.value_type,
                        applied_value: input.applied_value,
                        premium_impact: None,
                    })
                })
                .collect::<Result<Vec<_>, PortError>>()?;

            Ok(Quote {
                id,
                product_id: request.product_id,
                product_name: String::new(),
                broker_id: request.broker_id,
                broker_name: None,
                underwriter_id: request.underwriter_id,
                underwriter_name: None,
                insured_name: request.insured_name.clone(),
                insured_email: request.insured_email.clone(),
                insured_phone: request.insured_phone.clone(),
                status: QuoteStatus::Draft,
                currency: request.currency,
                base_premium: None,
                total_premium: None,
                valid_until: request.valid_until,
                notes: request.notes.clone(),
                created_by,
                created_at: now,
                updated_at: now,
                covers,
                modifiers,
            })
        }
    }

    /// In-memory mock implementation of QuotePort
    #[derive(Debug, Default, Clone)]
    pub struct MockQuotePort {
        state: Arc<Mutex<MockState>>,
        fail_next_commit: Arc<AtomicBool>,
    }

    impl MockQuotePort {
        /// Creates an empty mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Adds a product to the catalog
        pub async fn add_product(&self, name: impl Into<String>) -> ProductId {
            let id = ProductId::new();
            self.state.lock().await.products.insert(id, name.into());
            id
        }

        /// Adds a broker
        pub async fn add_broker(&self, company_name: impl Into<String>) -> BrokerId {
            let id = BrokerId::new();
            self.state.lock().await.brokers.insert(id, company_name.into());
            id
        }

        /// Adds an underwriter
        pub async fn add_underwriter(&self, full_name: impl Into<String>) -> UnderwriterId {
            let id = UnderwriterId::new();
            self.state.lock().await.underwriters.insert(id, full_name.into());
            id
        }

        /// Adds a cover with its premium rule history
        pub async fn add_cover(&self, name: impl Into<String>, rules: Vec<PremiumRule>) -> CoverId {
            let id = CoverId::new();
            self.state.lock().await.covers.insert(
                id,
                MockCover {
                    name: name.into(),
                    rules,
                },
            );
            id
        }

        /// Appends a premium rule to an existing cover
        pub async fn add_premium_rule(&self, cover_id: CoverId, rule: PremiumRule) -> Result<(), PortError> {
            let mut state = self.state.lock().await;
            let cover = state
                .covers
                .get_mut(&cover_id)
                .ok_or_else(|| PortError::not_found("Cover", cover_id))?;
            cover.rules.push(rule);
            Ok(())
        }

        /// Deactivates every rule of a cover
        pub async fn deactivate_rules(&self, cover_id: CoverId) -> Result<(), PortError> {
            let mut state = self.state.lock().await;
            let cover = state
                .covers
                .get_mut(&cover_id)
                .ok_or_else(|| PortError::not_found("Cover", cover_id))?;
            for rule in &mut cover.rules {
                rule.is_active = false;
            }
            Ok(())
        }

        /// Adds a modifier definition
        pub async fn add_modifier(&self, definition: ModifierDefinition) -> ModifierId {
            let id = definition.id;
            self.state.lock().await.modifiers.insert(id, definition);
            id
        }

        /// Drops a cover definition, leaving quotes that reference it dangling
        pub async fn remove_cover(&self, cover_id: CoverId) {
            self.state.lock().await.covers.remove(&cover_id);
        }

        /// Drops a modifier definition, leaving quotes that reference it dangling
        pub async fn remove_modifier(&self, modifier_id: ModifierId) {
            self.state.lock().await.modifiers.remove(&modifier_id);
        }

        /// Returns the committed state of a quote as stored
        pub async fn stored_quote(&self, id: QuoteId) -> Option<Quote> {
            self.state.lock().await.quotes.get(&id).cloned()
        }

        /// Makes the next unit of work opened fail on commit
        pub fn fail_next_commit(&self) {
            self.fail_next_commit.store(true, Ordering::SeqCst);
        }
    }

    impl DomainPort for MockQuotePort {}

    #[async_trait]
    impl HealthCheckable for MockQuotePort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-quote-port".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl QuotePort for MockQuotePort {
        async fn begin(&self) -> Result<Box<dyn QuoteUnitOfWork>, PortError> {
            let guard = self.state.clone().lock_owned().await;
            let staged = guard.clone();
            let fail_commit = self.fail_next_commit.swap(false, Ordering::SeqCst);
            Ok(Box::new(MockUnitOfWork {
                guard,
                staged,
                fail_commit,
            }))
        }

        async fn get_quote(&self, id: QuoteId) -> Result<Option<Quote>, PortError> {
            let state = self.state.lock().await;
            state.quotes.get(&id).map(|stored| state.hydrate(stored)).transpose()
        }

        async fn list_quotes(&self, filter: QuoteFilter) -> Result<Vec<QuoteSummary>, PortError> {
            let state = self.state.lock().await;
            let mut quotes = state
                .quotes
                .values()
                .filter(|q| filter.status.map_or(true, |status| q.status == status))
                .map(|q| state.hydrate(q))
                .collect::<Result<Vec<_>, _>>()?;

            quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

            Ok(quotes
                .iter()
                .skip(filter.offset.unwrap_or(0) as usize)
                .take(filter.limit.map_or(usize::MAX, |limit| limit as usize))
                .map(QuoteSummary::from)
                .collect())
        }
    }

    /// Unit of work over the mock store
    pub struct MockUnitOfWork {
        guard: OwnedMutexGuard<MockState>,
        staged: MockState,
        fail_commit: bool,
    }

    #[async_trait]
    impl QuoteUnitOfWork for MockUnitOfWork {
        async fn load_quote(&mut self, id: QuoteId) -> Result<Option<Quote>, PortError> {
            self.staged
                .quotes
                .get(&id)
                .map(|stored| self.staged.hydrate(stored))
                .transpose()
        }

        async fn insert_quote(
            &mut self,
            quote: &NewQuote,
            created_by: Option<UserId>,
        ) -> Result<QuoteId, PortError> {
            let built = self.staged.build_quote(quote, created_by)?;
            let id = built.id;
            self.staged.quotes.insert(id, built);
            Ok(id)
        }

        async fn save_quote(&mut self, quote: &Quote) -> Result<(), PortError> {
            let stored = self
                .staged
                .quotes
                .get_mut(&quote.id)
                .ok_or_else(|| PortError::not_found("Quote", quote.id))?;

            stored.broker_id = quote.broker_id;
            stored.underwriter_id = quote.underwriter_id;
            stored.insured_name = quote.insured_name.clone();
            stored.insured_email = quote.insured_email.clone();
            stored.insured_phone = quote.insured_phone.clone();
            stored.status = quote.status;
            stored.currency = quote.currency;
            stored.valid_until = quote.valid_until;
            stored.notes = quote.notes.clone();
            stored.updated_at = quote.updated_at;

            for cover in &quote.covers {
                if let Some(row) = stored.covers.iter_mut().find(|c| c.id == cover.id) {
                    row.is_selected = cover.is_selected;
                    row.basis_value = cover.basis_value;
                    row.selected_limit = cover.selected_limit;
                    row.selected_deductible = cover.selected_deductible;
                    row.calculated_premium = cover.calculated_premium;
                }
            }
            Ok(())
        }

        async fn save_breakdown(&mut self, quote: &Quote) -> Result<(), PortError> {
            let stored = self
                .staged
                .quotes
                .get_mut(&quote.id)
                .ok_or_else(|| PortError::not_found("Quote", quote.id))?;

            stored.base_premium = quote.base_premium;
            stored.total_premium = quote.total_premium;
            stored.updated_at = quote.updated_at;

            for cover in &quote.covers {
                if let Some(row) = stored.covers.iter_mut().find(|c| c.id == cover.id) {
                    row.calculated_premium = cover.calculated_premium;
                }
            }
            for modifier in &quote.modifiers {
                if let Some(row) = stored.modifiers.iter_mut().find(|m| m.id == modifier.id) {
                    row.premium_impact = modifier.premium_impact;
                }
            }
            Ok(())
        }

        async fn commit(self: Box<Self>) -> Result<(), PortError> {
            let MockUnitOfWork {
                mut guard,
                staged,
                fail_commit,
            } = *self;

            if fail_commit {
                return Err(PortError::Conflict {
                    message: "Simulated commit failure".to_string(),
                });
            }

            *guard = staged;
            Ok(())
        }
    }
}
