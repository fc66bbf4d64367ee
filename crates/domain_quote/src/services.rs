//! Quote lifecycle service
//!
//! This service orchestrates the operations exposed to callers: creating and
//! editing drafts, moving quotes through their lifecycle, and triggering the
//! premium calculation engine. Each operation runs in exactly one unit of
//! work, so an edit and the recalculation that follows it commit together.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use core_kernel::{QuoteId, UserId};

use crate::calculation::PremiumCalculationEngine;
use crate::error::QuoteError;
use crate::ports::{NewQuote, QuoteFilter, QuotePort, QuoteUnitOfWork, QuoteUpdate};
use crate::quote::Quote;
use crate::snapshot::{QuoteSnapshot, QuoteSummary};

/// Service for the quote lifecycle
#[derive(Clone)]
pub struct QuoteService {
    port: Arc<dyn QuotePort>,
    engine: PremiumCalculationEngine,
    /// Recalculate right after creation and after each edit
    auto_calculate: bool,
}

impl QuoteService {
    /// Creates a service that recalculates after creation and edits
    pub fn new(port: Arc<dyn QuotePort>) -> Self {
        Self {
            engine: PremiumCalculationEngine::new(port.clone()),
            port,
            auto_calculate: true,
        }
    }

    /// Turns automatic recalculation on or off
    pub fn with_auto_calculate(mut self, auto_calculate: bool) -> Self {
        self.auto_calculate = auto_calculate;
        self
    }

    /// Returns the storage port
    pub fn port(&self) -> &Arc<dyn QuotePort> {
        &self.port
    }

    /// Creates a draft quote
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::Validation` for a blank insured name, negative
    /// cover values, or references to unknown catalog entries.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn create_quote(
        &self,
        request: NewQuote,
        created_by: Option<UserId>,
    ) -> Result<QuoteSnapshot, QuoteError> {
        request.validate()?;

        let mut uow = self.port.begin().await?;
        let quote_id = uow.insert_quote(&request, created_by).await?;

        let quote = if self.auto_calculate {
            PremiumCalculationEngine::recalculate(uow.as_mut(), quote_id, Utc::now()).await?
        } else {
            load_required(uow.as_mut(), quote_id).await?
        };
        uow.commit().await?;

        info!(quote_id = %quote_id, covers = quote.covers.len(), "Quote created");
        Ok(QuoteSnapshot::from(&quote))
    }

    /// Returns a quote with its covers and modifiers
    pub async fn get_quote(&self, quote_id: QuoteId) -> Result<QuoteSnapshot, QuoteError> {
        let quote = self
            .port
            .get_quote(quote_id)
            .await?
            .ok_or(QuoteError::QuoteNotFound(quote_id))?;
        Ok(QuoteSnapshot::from(&quote))
    }

    /// Lists quote headers
    pub async fn list_quotes(&self, filter: QuoteFilter) -> Result<Vec<QuoteSummary>, QuoteError> {
        Ok(self.port.list_quotes(filter).await?)
    }

    /// Edits a draft quote
    ///
    /// # Errors
    ///
    /// - `QuoteError::QuoteNotFound` if the quote does not exist
    /// - `QuoteError::NotModifiable` if the quote is not a draft
    #[instrument(skip_all, fields(quote_id = %quote_id))]
    pub async fn update_quote(
        &self,
        quote_id: QuoteId,
        update: QuoteUpdate,
    ) -> Result<QuoteSnapshot, QuoteError> {
        update.validate()?;

        let now = Utc::now();
        let mut uow = self.port.begin().await?;
        let mut quote = load_required(uow.as_mut(), quote_id).await?;

        quote.apply_update(&update, now)?;
        uow.save_quote(&quote).await?;

        // Reload so names of a changed broker or underwriter are current
        let quote = if self.auto_calculate {
            PremiumCalculationEngine::recalculate(uow.as_mut(), quote_id, now).await?
        } else {
            load_required(uow.as_mut(), quote_id).await?
        };
        uow.commit().await?;

        info!(quote_id = %quote_id, "Quote updated");
        Ok(QuoteSnapshot::from(&quote))
    }

    /// Submits a draft quote
    pub async fn submit(&self, quote_id: QuoteId) -> Result<QuoteSnapshot, QuoteError> {
        self.transition(quote_id, "submit", Quote::submit).await
    }

    /// Binds a submitted quote
    pub async fn bind(&self, quote_id: QuoteId) -> Result<QuoteSnapshot, QuoteError> {
        self.transition(quote_id, "bind", Quote::bind).await
    }

    /// Returns a submitted quote to draft
    pub async fn revise(&self, quote_id: QuoteId) -> Result<QuoteSnapshot, QuoteError> {
        self.transition(quote_id, "revise", Quote::revise).await
    }

    /// Returns a bound quote to draft
    pub async fn revise_binding(&self, quote_id: QuoteId) -> Result<QuoteSnapshot, QuoteError> {
        self.transition(quote_id, "revise_binding", Quote::revise_binding).await
    }

    /// Recalculates the premium
    ///
    /// Calculation is allowed whatever the quote status.
    pub async fn calculate(&self, quote_id: QuoteId) -> Result<QuoteSnapshot, QuoteError> {
        self.engine.calculate(quote_id).await
    }

    #[instrument(skip_all, fields(quote_id = %quote_id, action = action))]
    async fn transition(
        &self,
        quote_id: QuoteId,
        action: &'static str,
        apply: fn(&mut Quote, DateTime<Utc>) -> Result<(), QuoteError>,
    ) -> Result<QuoteSnapshot, QuoteError> {
        let mut uow = self.port.begin().await?;
        let mut quote = load_required(uow.as_mut(), quote_id).await?;

        let from = quote.status;
        if let Err(err) = apply(&mut quote, Utc::now()) {
            warn!(quote_id = %quote_id, action, status = %from, "Rejected status transition");
            return Err(err);
        }

        uow.save_quote(&quote).await?;
        uow.commit().await?;

        info!(quote_id = %quote_id, from = %from, to = %quote.status, "Quote status changed");
        Ok(QuoteSnapshot::from(&quote))
    }
}

async fn load_required(uow: &mut dyn QuoteUnitOfWork, quote_id: QuoteId) -> Result<Quote, QuoteError> {
    uow.load_quote(quote_id)
        .await?
        .ok_or(QuoteError::QuoteNotFound(quote_id))
}
