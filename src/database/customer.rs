use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use tracing::error;

use crate::{
    configuration::DatabaseSettings,
    error::StartupError,
    models::{normalize_email, Customer, CustomerId, CustomerUpdate, OAuthCredential},
    DirectoryError, Result,
};

/// How a single customer document is addressed
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerFilter {
    ById(CustomerId),
    ByEmail(String),
}

/// The four primitives the directory needs from a document store. Each one is
/// a single atomic call against the backend.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn insert_one(&self, customer: Customer) -> Result<Customer>;
    async fn find_one(&self, filter: CustomerFilter) -> Result<Option<Customer>>;
    async fn find_one_and_update(
        &self,
        filter: CustomerFilter,
        update: CustomerUpdate,
    ) -> Result<Option<Customer>>;
    /// `true` when a document was removed
    async fn delete_one(&self, filter: CustomerFilter) -> Result<bool>;
}

/// Postgres backed store. The configured collection maps onto a table.
#[derive(Debug, Clone)]
pub struct CustomerDatabase {
    pool: PgPool,
    collection: String,
}

#[derive(FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    email: String,
    cpf: Option<String>,
    image: String,
    created_at: DateTime<Utc>,
    o_auth: Json<OAuthCredential>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = DirectoryError;

    fn try_from(row: CustomerRow) -> Result<Self> {
        let id = row.id.parse().map_err(|e| {
            error!(err = ?e, id = %row.id, "stored customer has a malformed id");
            DirectoryError::StoreUnavailable
        })?;
        Ok(Self {
            id,
            name: row.name,
            email: row.email,
            cpf: row.cpf,
            image: row.image,
            created_at: row.created_at,
            o_auth: row.o_auth.0,
        })
    }
}

impl CustomerFilter {
    /// Matches `email` regardless of case or surrounding whitespace
    pub fn by_email(email: &str) -> Self {
        Self::ByEmail(normalize_email(email))
    }

    fn column(&self) -> &'static str {
        match self {
            Self::ById(_) => "id",
            Self::ByEmail(_) => "lower(email)",
        }
    }

    fn value(&self) -> String {
        match self {
            Self::ById(id) => id.to_string(),
            Self::ByEmail(email) => normalize_email(email),
        }
    }
}

impl CustomerDatabase {
    pub fn new(pool: PgPool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }

    /// Connects once, failing fast if the store can't be reached within the
    /// configured timeout, and makes sure the collection exists.
    #[tracing::instrument(name = "connect_customer_store", skip(config), fields(collection = %config.collection))]
    pub async fn connect(config: &DatabaseSettings) -> std::result::Result<Self, StartupError> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(config.connect_timeout())
            .connect_with(config.with_db()?)
            .await?;
        let database = Self::new(pool, config.collection.clone());
        database.ensure_collection().await?;
        Ok(database)
    }

    async fn ensure_collection(&self) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                cpf TEXT,
                image TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL,
                o_auth JSONB NOT NULL
            )
            "#,
            table = self.collection
        ))
        .execute(&self.pool)
        .await?;
        sqlx::query(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {table}_email_lower_key ON {table} (lower(email))",
            table = self.collection
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CustomerStore for CustomerDatabase {
    #[tracing::instrument(skip(self, customer), fields(repository = "customer", id = %customer.id))]
    async fn insert_one(&self, customer: Customer) -> Result<Customer> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            INSERT INTO {} (id, name, email, cpf, image, created_at, o_auth)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
            self.collection
        ))
        .bind(customer.id.to_string())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.cpf)
        .bind(&customer.image)
        .bind(customer.created_at)
        .bind(Json(&customer.o_auth))
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    #[tracing::instrument(skip(self), fields(repository = "customer"))]
    async fn find_one(&self, filter: CustomerFilter) -> Result<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT * FROM {} WHERE {} = $1",
            self.collection,
            filter.column()
        ))
        .bind(filter.value())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Customer::try_from).transpose()
    }

    #[tracing::instrument(skip(self, update), fields(repository = "customer"))]
    async fn find_one_and_update(
        &self,
        filter: CustomerFilter,
        update: CustomerUpdate,
    ) -> Result<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            UPDATE {} SET
                name = COALESCE($1, name),
                image = COALESCE($2, image),
                cpf = COALESCE($3, cpf),
                o_auth = COALESCE($4, o_auth)
            WHERE {} = $5
            RETURNING *
            "#,
            self.collection,
            filter.column()
        ))
        .bind(update.name)
        .bind(update.image)
        .bind(update.cpf)
        .bind(update.o_auth.map(Json))
        .bind(filter.value())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Customer::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(repository = "customer"))]
    async fn delete_one(&self, filter: CustomerFilter) -> Result<bool> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = $1",
            self.collection,
            filter.column()
        ))
        .bind(filter.value())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
