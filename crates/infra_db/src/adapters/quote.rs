//! PostgreSQL Quote Adapter
//!
//! Implements `QuotePort` over the `QuoteRepository`. Each unit of work owns
//! one database transaction; `load_quote` takes a row lock on the quote so
//! concurrent calculations and edits of the same quote serialize, and
//! dropping the unit without committing rolls the transaction back.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::PostgresQuoteAdapter;
//! use domain_quote::{QuotePort, PremiumCalculationEngine};
//! use std::sync::Arc;
//!
//! let port: Arc<dyn QuotePort> = Arc::new(PostgresQuoteAdapter::new(pool));
//! let engine = PremiumCalculationEngine::new(port);
//! let snapshot = engine.calculate(quote_id).await?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, BrokerId, CoverId, Currency, DomainPort, HealthCheckResult, HealthCheckable,
    ModifierId, PortError, PremiumRuleId, ProductId, QuoteCoverId, QuoteId, QuoteModifierId,
    UnderwriterId, UserId,
};
use domain_quote::{
    ModifierType, NewQuote, PremiumRule, PremiumType, Quote, QuoteCover, QuoteFilter,
    QuoteModifier, QuotePort, QuoteStatus, QuoteSummary, QuoteUnitOfWork, ValueType,
};

use crate::error::DatabaseError;
use crate::repositories::quote::{
    BreakdownUpdate, ModifierType as DbModifierType, NewQuoteCoverRow, NewQuoteModifierRow,
    NewQuoteRow, PremiumType as DbPremiumType, QuoteCoverRow, QuoteCoverUpdate,
    QuoteHeaderUpdate, QuoteModifierRow, QuoteRepository, QuoteRow,
    QuoteStatus as DbQuoteStatus, ValueType as DbValueType,
};

/// PostgreSQL-backed implementation of the QuotePort trait
#[derive(Debug, Clone)]
pub struct PostgresQuoteAdapter {
    repository: QuoteRepository,
    pool: PgPool,
}

impl PostgresQuoteAdapter {
    /// Creates a new PostgreSQL quote adapter
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: QuoteRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &QuoteRepository {
        &self.repository
    }
}

impl DomainPort for PostgresQuoteAdapter {}

#[async_trait]
impl HealthCheckable for PostgresQuoteAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-quote-adapter".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-quote-adapter".to_string(),
                // A reachable database that rejects the health query still serves other queries
                status: if DatabaseError::from(&e).is_connection_error() {
                    AdapterHealth::Unhealthy
                } else {
                    AdapterHealth::Degraded
                },
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl QuotePort for PostgresQuoteAdapter {
    async fn begin(&self) -> Result<Box<dyn QuoteUnitOfWork>, PortError> {
        let tx = self.repository.begin().await?;
        Ok(Box::new(PostgresQuoteUnitOfWork {
            repository: self.repository.clone(),
            tx,
        }))
    }

    #[instrument(skip(self), fields(quote_id = %id))]
    async fn get_quote(&self, id: QuoteId) -> Result<Option<Quote>, PortError> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        let quote = load(&self.repository, &mut conn, id, false).await?;
        Ok(quote)
    }

    async fn list_quotes(&self, filter: QuoteFilter) -> Result<Vec<QuoteSummary>, PortError> {
        let rows = self
            .repository
            .list_quotes(
                filter.status.map(status_to_db),
                filter.limit.map(i64::from),
                filter.offset.map_or(0, i64::from),
            )
            .await?;

        debug!(count = rows.len(), "Listed quotes");

        rows.into_iter()
            .map(|row| row_to_quote(row, Vec::new(), Vec::new()).map(|quote| QuoteSummary::from(&quote)))
            .collect::<Result<Vec<_>, DatabaseError>>()
            .map_err(PortError::from)
    }
}

/// One transaction over quote storage
pub struct PostgresQuoteUnitOfWork {
    repository: QuoteRepository,
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl QuoteUnitOfWork for PostgresQuoteUnitOfWork {
    #[instrument(skip(self), fields(quote_id = %id))]
    async fn load_quote(&mut self, id: QuoteId) -> Result<Option<Quote>, PortError> {
        let quote = load(&self.repository, &mut self.tx, id, true).await?;
        Ok(quote)
    }

    async fn insert_quote(
        &mut self,
        quote: &NewQuote,
        created_by: Option<UserId>,
    ) -> Result<QuoteId, PortError> {
        let id = QuoteId::new_v7();
        let row = NewQuoteRow {
            id: id.into(),
            product_id: quote.product_id.into(),
            broker_id: quote.broker_id.map(Into::into),
            underwriter_id: quote.underwriter_id.map(Into::into),
            insured_name: quote.insured_name.clone(),
            insured_email: quote.insured_email.clone(),
            insured_phone: quote.insured_phone.clone(),
            currency: quote.currency.code().to_string(),
            valid_until: quote.valid_until,
            notes: quote.notes.clone(),
            created_by: created_by.map(Into::into),
            created_at: Utc::now(),
            covers: quote
                .covers
                .iter()
                .map(|input| NewQuoteCoverRow {
                    id: QuoteCoverId::new_v7().into(),
                    cover_id: input.cover_id.into(),
                    is_selected: input.is_selected,
                    selected_limit: input.selected_limit,
                    selected_deductible: input.selected_deductible,
                    basis_value: input.basis_value,
                })
                .collect(),
            modifiers: quote
                .modifiers
                .iter()
                .map(|input| NewQuoteModifierRow {
                    id: QuoteModifierId::new_v7().into(),
                    modifier_id: input.modifier_id.into(),
                    applied_value: input.applied_value,
                })
                .collect(),
        };

        self.repository.insert_quote(&mut self.tx, &row).await?;
        debug!(quote_id = %id, covers = row.covers.len(), "Inserted quote");
        Ok(id)
    }

    async fn save_quote(&mut self, quote: &Quote) -> Result<(), PortError> {
        let header = QuoteHeaderUpdate {
            id: quote.id.into(),
            broker_id: quote.broker_id.map(Into::into),
            underwriter_id: quote.underwriter_id.map(Into::into),
            insured_name: quote.insured_name.clone(),
            insured_email: quote.insured_email.clone(),
            insured_phone: quote.insured_phone.clone(),
            status: status_to_db(quote.status),
            currency: quote.currency.code().to_string(),
            valid_until: quote.valid_until,
            notes: quote.notes.clone(),
            updated_at: quote.updated_at,
        };
        let covers: Vec<QuoteCoverUpdate> = quote
            .covers
            .iter()
            .map(|cover| QuoteCoverUpdate {
                id: cover.id.into(),
                is_selected: cover.is_selected,
                selected_limit: cover.selected_limit,
                selected_deductible: cover.selected_deductible,
                basis_value: cover.basis_value,
                calculated_premium: cover.calculated_premium,
            })
            .collect();

        self.repository
            .update_quote(&mut self.tx, &header, &covers)
            .await?;
        Ok(())
    }

    async fn save_breakdown(&mut self, quote: &Quote) -> Result<(), PortError> {
        let breakdown = BreakdownUpdate {
            quote_id: quote.id.into(),
            base_premium: quote.base_premium,
            total_premium: quote.total_premium,
            updated_at: quote.updated_at,
            covers: quote
                .covers
                .iter()
                .map(|cover| (*cover.id.as_uuid(), cover.calculated_premium))
                .collect(),
            modifiers: quote
                .modifiers
                .iter()
                .map(|modifier| (*modifier.id.as_uuid(), modifier.premium_impact))
                .collect(),
        };

        self.repository
            .update_breakdown(&mut self.tx, &breakdown)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx
            .commit()
            .await
            .map_err(|e| PortError::from(DatabaseError::from(e)))
    }
}

// ============================================================================
// Row mapping
// ============================================================================

async fn load(
    repository: &QuoteRepository,
    conn: &mut PgConnection,
    id: QuoteId,
    lock: bool,
) -> Result<Option<Quote>, DatabaseError> {
    let quote_id = *id.as_uuid();
    let header = if lock {
        repository.lock_quote(conn, quote_id).await?
    } else {
        repository.find_quote(conn, quote_id).await?
    };

    let Some(header) = header else {
        return Ok(None);
    };

    let covers = repository.load_covers(conn, quote_id).await?;
    let modifiers = repository.load_modifiers(conn, quote_id).await?;

    row_to_quote(header, covers, modifiers).map(Some)
}

fn row_to_quote(
    row: QuoteRow,
    covers: Vec<QuoteCoverRow>,
    modifiers: Vec<QuoteModifierRow>,
) -> Result<Quote, DatabaseError> {
    let product_name = row.product_name.ok_or_else(|| {
        DatabaseError::IntegrityViolation(format!(
            "Quote {} references missing product {}",
            row.id, row.product_id
        ))
    })?;
    let currency: Currency = row.currency.parse().map_err(|e| {
        DatabaseError::SerializationError(format!("Quote {} currency: {}", row.id, e))
    })?;

    Ok(Quote {
        id: QuoteId::from_uuid(row.id),
        product_id: ProductId::from_uuid(row.product_id),
        product_name,
        broker_id: row.broker_id.map(BrokerId::from_uuid),
        broker_name: row.broker_name,
        underwriter_id: row.underwriter_id.map(UnderwriterId::from_uuid),
        underwriter_name: row.underwriter_name,
        insured_name: row.insured_name,
        insured_email: row.insured_email,
        insured_phone: row.insured_phone,
        status: status_from_db(row.status),
        currency,
        base_premium: row.base_premium,
        total_premium: row.total_premium,
        valid_until: row.valid_until,
        notes: row.notes,
        created_by: row.created_by.map(UserId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
        covers: covers
            .into_iter()
            .map(row_to_cover)
            .collect::<Result<Vec<_>, _>>()?,
        modifiers: modifiers
            .into_iter()
            .map(row_to_modifier)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

fn row_to_cover(row: QuoteCoverRow) -> Result<QuoteCover, DatabaseError> {
    let cover_name = row.cover_name.ok_or_else(|| {
        DatabaseError::IntegrityViolation(format!(
            "Quote cover {} references missing cover {}",
            row.id, row.cover_id
        ))
    })?;

    // The lateral join yields all rule columns or none of them
    let premium_rule = match (row.rule_id, row.rule_premium_type, row.rule_created_at) {
        (Some(id), Some(premium_type), Some(created_at)) => Some(PremiumRule {
            id: PremiumRuleId::from_uuid(id),
            premium_type: premium_type_from_db(premium_type),
            base_rate: row.rule_base_rate,
            flat_amount: row.rule_flat_amount,
            min_premium: row.rule_min_premium,
            is_active: true,
            created_at,
        }),
        _ => None,
    };

    Ok(QuoteCover {
        id: QuoteCoverId::from_uuid(row.id),
        quote_id: QuoteId::from_uuid(row.quote_id),
        cover_id: CoverId::from_uuid(row.cover_id),
        cover_name,
        is_selected: row.is_selected,
        selected_limit: row.selected_limit,
        selected_deductible: row.selected_deductible,
        basis_value: row.basis_value,
        calculated_premium: row.calculated_premium,
        premium_rule,
    })
}

fn row_to_modifier(row: QuoteModifierRow) -> Result<QuoteModifier, DatabaseError> {
    let missing = || {
        DatabaseError::IntegrityViolation(format!(
            "Quote modifier {} references missing modifier {}",
            row.id, row.modifier_id
        ))
    };
    let (Some(modifier_name), Some(modifier_type), Some(value_type)) =
        (row.modifier_name.clone(), row.modifier_type, row.value_type)
    else {
        return Err(missing());
    };

    Ok(QuoteModifier {
        id: QuoteModifierId::from_uuid(row.id),
        quote_id: QuoteId::from_uuid(row.quote_id),
        modifier_id: ModifierId::from_uuid(row.modifier_id),
        modifier_name,
        modifier_type: modifier_type_from_db(modifier_type),
        value_type: value_type_from_db(value_type),
        applied_value: row.applied_value,
        premium_impact: row.premium_impact,
    })
}

fn status_to_db(status: QuoteStatus) -> DbQuoteStatus {
    match status {
        QuoteStatus::Draft => DbQuoteStatus::Draft,
        QuoteStatus::Submitted => DbQuoteStatus::Submitted,
        QuoteStatus::Bound => DbQuoteStatus::Bound,
    }
}

fn status_from_db(status: DbQuoteStatus) -> QuoteStatus {
    match status {
        DbQuoteStatus::Draft => QuoteStatus::Draft,
        DbQuoteStatus::Submitted => QuoteStatus::Submitted,
        DbQuoteStatus::Bound => QuoteStatus::Bound,
    }
}

fn premium_type_from_db(premium_type: DbPremiumType) -> PremiumType {
    match premium_type {
        DbPremiumType::Flat => PremiumType::Flat,
        DbPremiumType::RateBased => PremiumType::RateBased,
        DbPremiumType::PerUnit => PremiumType::PerUnit,
    }
}

fn modifier_type_from_db(modifier_type: DbModifierType) -> ModifierType {
    match modifier_type {
        DbModifierType::Loading => ModifierType::Loading,
        DbModifierType::Discount => ModifierType::Discount,
        DbModifierType::Adjustment => ModifierType::Adjustment,
    }
}

fn value_type_from_db(value_type: DbValueType) -> ValueType {
    match value_type {
        DbValueType::Percentage => ValueType::Percentage,
        DbValueType::Fixed => ValueType::Fixed,
    }
}
