//! Database Test Utilities
//!
//! Testcontainer management for PostgreSQL integration tests, plus helpers
//! that seed the rating catalog with raw SQL.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use uuid::Uuid;

use core_kernel::{BrokerId, CoverId, ModifierId, PremiumRuleId, ProductId, UnderwriterId};
use domain_quote::{ModifierDefinition, ModifierType, PremiumRule, PremiumType, ValueType};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Default PostgreSQL image for testing
const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "quotes_test";

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A wrapper around a PostgreSQL test container
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a new PostgreSQL container with the quote schema applied
    pub async fn new() -> Result<Self, BoxError> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr("database system is ready to accept connections"))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();

        let config = TestDatabaseConfig {
            host,
            port,
            ..TestDatabaseConfig::default()
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.connection_url())
            .await?;

        let test_db = Self {
            _container: container,
            config,
            pool,
        };

        test_db.init_schema().await?;

        Ok(test_db)
    }

    /// Initializes the database schema from the migrations file
    async fn init_schema(&self) -> Result<(), BoxError> {
        let schema = include_str!("../../../migrations/20260101_000001_quote_schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Clears all data from the database while preserving the schema
    pub async fn clear_data(&self) -> Result<(), BoxError> {
        let tables = [
            "quote_modifiers",
            "quote_covers",
            "quotes",
            "modifiers",
            "premiums",
            "covers",
            "products",
            "brokers",
            "underwriters",
        ];

        for table in tables {
            sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", table))
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Seeds the rating catalog through raw SQL
    pub fn seed(&self) -> CatalogSeeder<'_> {
        CatalogSeeder { pool: &self.pool }
    }
}

/// Inserts catalog rows for integration tests
pub struct CatalogSeeder<'a> {
    pool: &'a PgPool,
}

impl CatalogSeeder<'_> {
    pub async fn product(&self, name: &str) -> Result<ProductId, BoxError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO products (id, name, code) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(name)
            .bind(format!("P-{}", id.simple()))
            .execute(self.pool)
            .await?;
        Ok(ProductId::from_uuid(id))
    }

    pub async fn broker(&self, company_name: &str) -> Result<BrokerId, BoxError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO brokers (id, company_name) VALUES ($1, $2)")
            .bind(id)
            .bind(company_name)
            .execute(self.pool)
            .await?;
        Ok(BrokerId::from_uuid(id))
    }

    pub async fn underwriter(&self, full_name: &str) -> Result<UnderwriterId, BoxError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO underwriters (id, full_name) VALUES ($1, $2)")
            .bind(id)
            .bind(full_name)
            .execute(self.pool)
            .await?;
        Ok(UnderwriterId::from_uuid(id))
    }

    /// Inserts a cover and its premium rules
    pub async fn cover(
        &self,
        product_id: ProductId,
        name: &str,
        rules: &[PremiumRule],
    ) -> Result<CoverId, BoxError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO covers (id, product_id, name, code) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(*product_id.as_uuid())
            .bind(name)
            .bind(format!("C-{}", id.simple()))
            .execute(self.pool)
            .await?;

        let cover_id = CoverId::from_uuid(id);
        for rule in rules {
            self.premium_rule(cover_id, rule).await?;
        }
        Ok(cover_id)
    }

    pub async fn premium_rule(&self, cover_id: CoverId, rule: &PremiumRule) -> Result<PremiumRuleId, BoxError> {
        sqlx::query(
            r#"
            INSERT INTO premiums (id, cover_id, premium_type, base_rate, flat_amount, min_premium, is_active, created_at)
            VALUES ($1, $2, $3::premium_type, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*rule.id.as_uuid())
        .bind(*cover_id.as_uuid())
        .bind(premium_type_label(rule.premium_type))
        .bind(rule.base_rate)
        .bind(rule.flat_amount)
        .bind(rule.min_premium)
        .bind(rule.is_active)
        .bind(rule.created_at)
        .execute(self.pool)
        .await?;
        Ok(rule.id)
    }

    pub async fn modifier(
        &self,
        product_id: ProductId,
        definition: &ModifierDefinition,
    ) -> Result<ModifierId, BoxError> {
        sqlx::query(
            r#"
            INSERT INTO modifiers (id, product_id, name, code, modifier_type, value_type,
                                   min_value, max_value, default_value, is_active)
            VALUES ($1, $2, $3, $4, $5::modifier_type, $6::modifier_value_type, $7, $8, $9, $10)
            "#,
        )
        .bind(*definition.id.as_uuid())
        .bind(*product_id.as_uuid())
        .bind(&definition.name)
        .bind(&definition.code)
        .bind(modifier_type_label(definition.modifier_type))
        .bind(value_type_label(definition.value_type))
        .bind(definition.min_value)
        .bind(definition.max_value)
        .bind(definition.default_value)
        .bind(definition.is_active)
        .execute(self.pool)
        .await?;
        Ok(definition.id)
    }

    /// Retires every rule of a cover
    pub async fn deactivate_rules(&self, cover_id: CoverId) -> Result<u64, BoxError> {
        let result = sqlx::query("UPDATE premiums SET is_active = FALSE WHERE cover_id = $1")
            .bind(*cover_id.as_uuid())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Sets a rule's creation time, for rule ordering tests
    pub async fn backdate_rule(&self, rule_id: PremiumRuleId, at: DateTime<Utc>) -> Result<(), BoxError> {
        sqlx::query("UPDATE premiums SET created_at = $2 WHERE id = $1")
            .bind(*rule_id.as_uuid())
            .bind(at)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Sets a rule's minimum premium
    pub async fn set_min_premium(&self, rule_id: PremiumRuleId, floor: Option<Decimal>) -> Result<(), BoxError> {
        sqlx::query("UPDATE premiums SET min_premium = $2 WHERE id = $1")
            .bind(*rule_id.as_uuid())
            .bind(floor)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

fn premium_type_label(premium_type: PremiumType) -> &'static str {
    match premium_type {
        PremiumType::Flat => "flat",
        PremiumType::RateBased => "rate_based",
        PremiumType::PerUnit => "per_unit",
    }
}

fn modifier_type_label(modifier_type: ModifierType) -> &'static str {
    match modifier_type {
        ModifierType::Loading => "loading",
        ModifierType::Discount => "discount",
        ModifierType::Adjustment => "adjustment",
    }
}

fn value_type_label(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Percentage => "percentage",
        ValueType::Fixed => "fixed",
    }
}

/// Creates an isolated test database for a single test
pub async fn create_isolated_test_database() -> Result<TestDatabase, BoxError> {
    TestDatabase::new().await
}
