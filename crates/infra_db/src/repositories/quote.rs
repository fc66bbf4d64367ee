//! Quote repository implementation
//!
//! Every read is an explicit join that returns exactly the shape rating
//! needs: the quote header with display names, each quote cover with its
//! cover name and earliest active premium rule, and each quote modifier with
//! its definition. Lookups of parent rows use `LEFT JOIN` so a dangling
//! reference shows up as a `NULL` name instead of a silently missing row.
//!
//! Methods take a `&mut PgConnection` so the same queries serve both a
//! unit-of-work transaction and a plain pooled connection.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::DatabaseError;

const QUOTE_HEADER: &str = r#"
    SELECT
        q.id,
        q.product_id,
        p.name AS product_name,
        q.broker_id,
        b.company_name AS broker_name,
        q.underwriter_id,
        u.full_name AS underwriter_name,
        q.insured_name,
        q.insured_email,
        q.insured_phone,
        q.status,
        q.currency,
        q.base_premium,
        q.total_premium,
        q.valid_until,
        q.notes,
        q.created_by,
        q.created_at,
        q.updated_at
    FROM quotes q
    LEFT JOIN products p ON p.id = q.product_id
    LEFT JOIN brokers b ON b.id = q.broker_id
    LEFT JOIN underwriters u ON u.id = q.underwriter_id
"#;

/// Repository for quotes and the rating data attached to them
#[derive(Debug, Clone)]
pub struct QuoteRepository {
    pool: PgPool,
}

impl QuoteRepository {
    /// Creates a new QuoteRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Opens a transaction for one unit of work
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        self.pool
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }

    /// Reads a quote header and locks the quote row until the transaction ends
    pub async fn lock_quote(
        &self,
        conn: &mut PgConnection,
        quote_id: Uuid,
    ) -> Result<Option<QuoteRow>, DatabaseError> {
        let sql = format!("{QUOTE_HEADER} WHERE q.id = $1 FOR UPDATE OF q");
        let row = sqlx::query_as::<_, QuoteRow>(&sql)
            .bind(quote_id)
            .fetch_optional(conn)
            .await?;
        Ok(row)
    }

    /// Reads a quote header without locking
    pub async fn find_quote(
        &self,
        conn: &mut PgConnection,
        quote_id: Uuid,
    ) -> Result<Option<QuoteRow>, DatabaseError> {
        let sql = format!("{QUOTE_HEADER} WHERE q.id = $1");
        let row = sqlx::query_as::<_, QuoteRow>(&sql)
            .bind(quote_id)
            .fetch_optional(conn)
            .await?;
        Ok(row)
    }

    /// Reads a quote's covers joined to their cover and active premium rule
    ///
    /// When several rules are active the earliest created one is used.
    pub async fn load_covers(
        &self,
        conn: &mut PgConnection,
        quote_id: Uuid,
    ) -> Result<Vec<QuoteCoverRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, QuoteCoverRow>(
            r#"
            SELECT
                qc.id,
                qc.quote_id,
                qc.cover_id,
                c.name AS cover_name,
                qc.is_selected,
                qc.selected_limit,
                qc.selected_deductible,
                qc.basis_value,
                qc.calculated_premium,
                r.id AS rule_id,
                r.premium_type AS rule_premium_type,
                r.base_rate AS rule_base_rate,
                r.flat_amount AS rule_flat_amount,
                r.min_premium AS rule_min_premium,
                r.created_at AS rule_created_at
            FROM quote_covers qc
            LEFT JOIN covers c ON c.id = qc.cover_id
            LEFT JOIN LATERAL (
                SELECT pr.id, pr.premium_type, pr.base_rate, pr.flat_amount,
                       pr.min_premium, pr.created_at
                FROM premiums pr
                WHERE pr.cover_id = qc.cover_id AND pr.is_active
                ORDER BY pr.created_at, pr.id
                LIMIT 1
            ) r ON TRUE
            WHERE qc.quote_id = $1
            ORDER BY qc.position
            "#,
        )
        .bind(quote_id)
        .fetch_all(conn)
        .await?;

        Ok(rows)
    }

    /// Reads a quote's modifiers joined to their definitions
    pub async fn load_modifiers(
        &self,
        conn: &mut PgConnection,
        quote_id: Uuid,
    ) -> Result<Vec<QuoteModifierRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, QuoteModifierRow>(
            r#"
            SELECT
                qm.id,
                qm.quote_id,
                qm.modifier_id,
                m.name AS modifier_name,
                m.modifier_type,
                m.value_type,
                qm.applied_value,
                qm.premium_impact
            FROM quote_modifiers qm
            LEFT JOIN modifiers m ON m.id = qm.modifier_id
            WHERE qm.quote_id = $1
            ORDER BY qm.position
            "#,
        )
        .bind(quote_id)
        .fetch_all(conn)
        .await?;

        Ok(rows)
    }

    /// Inserts a draft quote with its covers and modifiers
    pub async fn insert_quote(
        &self,
        conn: &mut PgConnection,
        quote: &NewQuoteRow,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO quotes (
                id, product_id, broker_id, underwriter_id,
                insured_name, insured_email, insured_phone,
                status, currency, valid_until, notes, created_by,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft', $8, $9, $10, $11, $12, $12)
            "#,
        )
        .bind(quote.id)
        .bind(quote.product_id)
        .bind(quote.broker_id)
        .bind(quote.underwriter_id)
        .bind(&quote.insured_name)
        .bind(&quote.insured_email)
        .bind(&quote.insured_phone)
        .bind(&quote.currency)
        .bind(quote.valid_until)
        .bind(&quote.notes)
        .bind(quote.created_by)
        .bind(quote.created_at)
        .execute(&mut *conn)
        .await?;

        for (position, cover) in quote.covers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO quote_covers (
                    id, quote_id, cover_id, position, is_selected,
                    selected_limit, selected_deductible, basis_value
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(cover.id)
            .bind(quote.id)
            .bind(cover.cover_id)
            .bind(position as i32)
            .bind(cover.is_selected)
            .bind(cover.selected_limit)
            .bind(cover.selected_deductible)
            .bind(cover.basis_value)
            .execute(&mut *conn)
            .await?;
        }

        for (position, modifier) in quote.modifiers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO quote_modifiers (id, quote_id, modifier_id, position, applied_value)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(modifier.id)
            .bind(quote.id)
            .bind(modifier.modifier_id)
            .bind(position as i32)
            .bind(modifier.applied_value)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Writes header fields, status and cover inputs
    pub async fn update_quote(
        &self,
        conn: &mut PgConnection,
        quote: &QuoteHeaderUpdate,
        covers: &[QuoteCoverUpdate],
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE quotes SET
                broker_id = $2,
                underwriter_id = $3,
                insured_name = $4,
                insured_email = $5,
                insured_phone = $6,
                status = $7,
                currency = $8,
                valid_until = $9,
                notes = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(quote.id)
        .bind(quote.broker_id)
        .bind(quote.underwriter_id)
        .bind(&quote.insured_name)
        .bind(&quote.insured_email)
        .bind(&quote.insured_phone)
        .bind(quote.status)
        .bind(&quote.currency)
        .bind(quote.valid_until)
        .bind(&quote.notes)
        .bind(quote.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Quote", quote.id));
        }

        for cover in covers {
            sqlx::query(
                r#"
                UPDATE quote_covers SET
                    is_selected = $3,
                    selected_limit = $4,
                    selected_deductible = $5,
                    basis_value = $6,
                    calculated_premium = $7
                WHERE id = $1 AND quote_id = $2
                "#,
            )
            .bind(cover.id)
            .bind(quote.id)
            .bind(cover.is_selected)
            .bind(cover.selected_limit)
            .bind(cover.selected_deductible)
            .bind(cover.basis_value)
            .bind(cover.calculated_premium)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Writes a calculated breakdown
    pub async fn update_breakdown(
        &self,
        conn: &mut PgConnection,
        breakdown: &BreakdownUpdate,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE quotes SET base_premium = $2, total_premium = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(breakdown.quote_id)
        .bind(breakdown.base_premium)
        .bind(breakdown.total_premium)
        .bind(breakdown.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Quote", breakdown.quote_id));
        }

        for (id, premium) in &breakdown.covers {
            sqlx::query("UPDATE quote_covers SET calculated_premium = $3 WHERE id = $1 AND quote_id = $2")
                .bind(id)
                .bind(breakdown.quote_id)
                .bind(premium)
                .execute(&mut *conn)
                .await?;
        }

        for (id, impact) in &breakdown.modifiers {
            sqlx::query("UPDATE quote_modifiers SET premium_impact = $3 WHERE id = $1 AND quote_id = $2")
                .bind(id)
                .bind(breakdown.quote_id)
                .bind(impact)
                .execute(&mut *conn)
                .await?;
        }

        Ok(())
    }

    /// Lists quote headers, newest first
    pub async fn list_quotes(
        &self,
        status: Option<QuoteStatus>,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<QuoteRow>, DatabaseError> {
        let sql = format!(
            "{QUOTE_HEADER} WHERE ($1::quote_status IS NULL OR q.status = $1) \
             ORDER BY q.created_at DESC, q.id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, QuoteRow>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

// ============================================================================
// Row types
// ============================================================================

/// Quote header as read from the database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuoteRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub broker_id: Option<Uuid>,
    pub broker_name: Option<String>,
    pub underwriter_id: Option<Uuid>,
    pub underwriter_name: Option<String>,
    pub insured_name: String,
    pub insured_email: Option<String>,
    pub insured_phone: Option<String>,
    pub status: QuoteStatus,
    pub currency: String,
    pub base_premium: Option<Decimal>,
    pub total_premium: Option<Decimal>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quote cover joined to its cover and active premium rule
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuoteCoverRow {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub cover_id: Uuid,
    /// `None` when the cover row is missing
    pub cover_name: Option<String>,
    pub is_selected: bool,
    pub selected_limit: Option<Decimal>,
    pub selected_deductible: Option<Decimal>,
    pub basis_value: Option<Decimal>,
    pub calculated_premium: Option<Decimal>,
    /// `None` when the cover has no active rule
    pub rule_id: Option<Uuid>,
    pub rule_premium_type: Option<PremiumType>,
    pub rule_base_rate: Option<Decimal>,
    pub rule_flat_amount: Option<Decimal>,
    pub rule_min_premium: Option<Decimal>,
    pub rule_created_at: Option<DateTime<Utc>>,
}

/// Quote modifier joined to its definition
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuoteModifierRow {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub modifier_id: Uuid,
    /// `None` when the modifier row is missing
    pub modifier_name: Option<String>,
    pub modifier_type: Option<ModifierType>,
    pub value_type: Option<ValueType>,
    pub applied_value: Decimal,
    pub premium_impact: Option<Decimal>,
}

/// Data for inserting a quote
#[derive(Debug, Clone)]
pub struct NewQuoteRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub broker_id: Option<Uuid>,
    pub underwriter_id: Option<Uuid>,
    pub insured_name: String,
    pub insured_email: Option<String>,
    pub insured_phone: Option<String>,
    pub currency: String,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub covers: Vec<NewQuoteCoverRow>,
    pub modifiers: Vec<NewQuoteModifierRow>,
}

/// Data for inserting a quote cover
#[derive(Debug, Clone)]
pub struct NewQuoteCoverRow {
    pub id: Uuid,
    pub cover_id: Uuid,
    pub is_selected: bool,
    pub selected_limit: Option<Decimal>,
    pub selected_deductible: Option<Decimal>,
    pub basis_value: Option<Decimal>,
}

/// Data for inserting a quote modifier
#[derive(Debug, Clone)]
pub struct NewQuoteModifierRow {
    pub id: Uuid,
    pub modifier_id: Uuid,
    pub applied_value: Decimal,
}

/// Header columns written by an edit or status change
#[derive(Debug, Clone)]
pub struct QuoteHeaderUpdate {
    pub id: Uuid,
    pub broker_id: Option<Uuid>,
    pub underwriter_id: Option<Uuid>,
    pub insured_name: String,
    pub insured_email: Option<String>,
    pub insured_phone: Option<String>,
    pub status: QuoteStatus,
    pub currency: String,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Cover input columns written by an edit
#[derive(Debug, Clone)]
pub struct QuoteCoverUpdate {
    pub id: Uuid,
    pub is_selected: bool,
    pub selected_limit: Option<Decimal>,
    pub selected_deductible: Option<Decimal>,
    pub basis_value: Option<Decimal>,
    pub calculated_premium: Option<Decimal>,
}

/// Premium columns written by a calculation
#[derive(Debug, Clone)]
pub struct BreakdownUpdate {
    pub quote_id: Uuid,
    pub base_premium: Option<Decimal>,
    pub total_premium: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
    /// Quote cover id and calculated premium
    pub covers: Vec<(Uuid, Option<Decimal>)>,
    /// Quote modifier id and premium impact
    pub modifiers: Vec<(Uuid, Option<Decimal>)>,
}

// ============================================================================
// Database enums
// ============================================================================

/// Quote status as stored in PostgreSQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "quote_status", rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Submitted,
    Bound,
}

/// Premium type as stored in PostgreSQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "premium_type", rename_all = "snake_case")]
pub enum PremiumType {
    Flat,
    RateBased,
    PerUnit,
}

/// Modifier type as stored in PostgreSQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "modifier_type", rename_all = "snake_case")]
pub enum ModifierType {
    Loading,
    Discount,
    Adjustment,
}

/// Modifier value type as stored in PostgreSQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "modifier_value_type", rename_all = "snake_case")]
pub enum ValueType {
    Percentage,
    Fixed,
}
