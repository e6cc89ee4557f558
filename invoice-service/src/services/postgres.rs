//! PostgreSQL invoice store.

use crate::messages;
use crate::models::{Invoice, InvoiceReconciliation, InvoiceStatus, NewInvoice};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{InvoiceStore, Reconciled};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "id, order_id, user_id, gateway_id, amount, payment_method, \
    payment_channel, payer_email, description, status, invoice_url, created_at, updated_at, deleted_at";

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    order_id: String,
    user_id: Uuid,
    gateway_id: String,
    amount: Decimal,
    payment_method: Option<String>,
    payment_channel: Option<String>,
    payer_email: String,
    description: String,
    status: String,
    invoice_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = AppError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        let status: InvoiceStatus = row.status.parse().map_err(AppError::database)?;
        Ok(Invoice {
            id: row.id,
            order_id: row.order_id,
            user_id: row.user_id,
            gateway_id: row.gateway_id,
            amount: row.amount,
            payment_method: row.payment_method,
            payment_channel: row.payment_channel,
            payer_email: row.payer_email,
            description: row.description,
            status,
            invoice_url: row.invoice_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::database(anyhow::anyhow!("{}: {}", context, e))
}

/// Invoice store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgInvoiceStore {
    pool: PgPool,
}

impl PgInvoiceStore {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoice-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(db_error("Failed to connect"))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::database(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for PgInvoiceStore {
    #[instrument(skip(self))]
    async fn find_active_by_order(&self, order_id: &str) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_active_by_order"])
            .start_timer();

        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE order_id = $1 AND status = 'PENDING' AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find active invoice"))?;

        timer.observe_duration();

        row.map(Invoice::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_by_id"])
            .start_timer();

        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1");
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get invoice"))?;

        timer.observe_duration();

        row.map(Invoice::try_from).transpose()
    }

    #[instrument(skip(self, invoice), fields(order_id = %invoice.order_id, gateway_id = %invoice.gateway_id))]
    async fn insert(&self, invoice: &NewInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let sql = format!(
            "INSERT INTO invoices (id, order_id, user_id, gateway_id, amount, payment_method, \
                payer_email, description, status, invoice_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {INVOICE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&invoice.order_id)
            .bind(invoice.user_id)
            .bind(&invoice.gateway_id)
            .bind(invoice.amount)
            .bind(&invoice.payment_method)
            .bind(&invoice.payer_email)
            .bind(&invoice.description)
            .bind(invoice.status.as_str())
            .bind(&invoice.invoice_url)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict(
                        messages::INVOICE_ALREADY_EXISTS,
                        anyhow::anyhow!(
                            "Active invoice already exists for order {}",
                            invoice.order_id
                        ),
                    )
                }
                _ => AppError::database(anyhow::anyhow!("Failed to insert invoice: {}", e)),
            })?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        timer.observe_duration();

        let invoice = Invoice::try_from(row)?;
        info!(invoice_id = %invoice.id, "Invoice persisted");
        Ok(invoice)
    }

    #[instrument(skip(self, update), fields(gateway_id = %update.gateway_id, status = %update.status))]
    async fn reconcile_pending(
        &self,
        order_id: &str,
        update: &InvoiceReconciliation,
    ) -> Result<Option<Reconciled>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["reconcile_pending"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let select = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE order_id = $1 AND gateway_id = $2 \
               AND status = 'PENDING' AND deleted_at IS NULL \
             FOR UPDATE"
        );
        let locked = sqlx::query_as::<_, InvoiceRow>(&select)
            .bind(order_id)
            .bind(&update.gateway_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to lock pending invoice"))?;

        let Some(locked) = locked else {
            tx.rollback().await.ok();
            timer.observe_duration();
            return Ok(None);
        };

        let update_sql = format!(
            "UPDATE invoices \
             SET status = $2, description = $3, payment_method = $4, payment_channel = $5, \
                 payer_email = $6, updated_at = NOW() \
             WHERE id = $1 AND status = 'PENDING' \
             RETURNING {INVOICE_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, InvoiceRow>(&update_sql)
            .bind(locked.id)
            .bind(update.status.as_str())
            .bind(&update.description)
            .bind(&update.payment_method)
            .bind(&update.payment_channel)
            .bind(&update.payer_email)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to reconcile invoice"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        timer.observe_duration();

        Ok(Some(Reconciled {
            before: Invoice::try_from(locked)?,
            after: Invoice::try_from(updated)?,
        }))
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_by_user"])
            .start_timer();

        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE user_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list invoices"))?;

        timer.observe_duration();

        rows.into_iter().map(Invoice::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn exists_for_user(&self, user_id: Uuid, gateway_id: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["exists_for_user"])
            .start_timer();

        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM invoices
                WHERE user_id = $1 AND gateway_id = $2 AND deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(gateway_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check invoice"))?;

        timer.observe_duration();

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn soft_delete(&self, user_id: Uuid, gateway_id: &str) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["soft_delete"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE user_id = $1 AND gateway_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(gateway_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to delete invoice"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        timer.observe_duration();

        let affected = result.rows_affected();
        if affected == 0 {
            warn!("Soft delete matched no invoice");
        }
        Ok(affected)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error("Health check failed"))?;
        Ok(())
    }
}
