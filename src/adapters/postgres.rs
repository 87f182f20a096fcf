use crate::domain::{
    hex_key, ExecutedOrder, ExecutedOrderRow, LimitOrder, LimitOrderRecord, OrderDigest, WatchPair,
};
use crate::error::{RelayerError, Result};
use crate::persistence::{retain_below_price, unix_now, BatchReport, SaveOutcome};
use chrono::{DateTime, Utc};
use ethers::types::{Address, H256, U256};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    // ==================== Limit orders ====================

    /// Insert a limit order; an existing digest is reported, not raised
    #[instrument(skip_all, fields(digest = %hex_key(&record.digest)))]
    pub async fn save_limit_order(&self, record: &LimitOrderRecord) -> Result<SaveOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO limit_orders
                (digest, pair_address, token_in, start_time, end_time, price, order_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (digest) DO NOTHING
            "#,
        )
        .bind(hex_key(&record.digest))
        .bind(hex_key(&record.pair_address))
        .bind(hex_key(&record.order.token_in))
        .bind(to_db_secs(record.order.start_time))
        .bind(to_db_secs(record.order.end_time))
        .bind(&record.price)
        .bind(Json(&record.order))
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                debug!("Ignored saving an existing order");
                Ok(SaveOutcome::AlreadyExists)
            }
            Ok(_) => {
                debug!("Limit order saved");
                Ok(SaveOutcome::Inserted)
            }
            Err(e) => {
                let err = RelayerError::from(e);
                if err.is_unique_violation() {
                    debug!("Ignored saving an existing order");
                    Ok(SaveOutcome::AlreadyExists)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Active orders for a pair and input token, priced below the threshold.
    ///
    /// Prices are text, so the SQL query returns the whole active set and the
    /// threshold is applied afterwards on decoded values.
    #[instrument(skip(self))]
    pub async fn get_limit_orders(
        &self,
        price_threshold: U256,
        pair_address: Address,
        token_in: Address,
    ) -> Result<Vec<LimitOrderRecord>> {
        let now = to_db_secs(unix_now());

        let rows = sqlx::query(
            r#"
            SELECT digest, pair_address, price, order_data
            FROM limit_orders
            WHERE pair_address = $1
              AND token_in = $2
              AND start_time < $3
              AND end_time > $3
            "#,
        )
        .bind(hex_key(&pair_address))
        .bind(hex_key(&token_in))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(limit_order_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(retain_below_price(records, price_threshold))
    }

    /// Update each order by digest; every order is its own statement
    pub async fn update_limit_orders(&self, records: &[LimitOrderRecord]) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        for record in records {
            let result = sqlx::query(
                r#"
                UPDATE limit_orders SET
                    pair_address = $2,
                    token_in = $3,
                    start_time = $4,
                    end_time = $5,
                    price = $6,
                    order_data = $7,
                    updated_at = NOW()
                WHERE digest = $1
                "#,
            )
            .bind(hex_key(&record.digest))
            .bind(hex_key(&record.pair_address))
            .bind(hex_key(&record.order.token_in))
            .bind(to_db_secs(record.order.start_time))
            .bind(to_db_secs(record.order.end_time))
            .bind(&record.price)
            .bind(Json(&record.order))
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 0 => {
                    report.record_err(record.digest, "not found")
                }
                Ok(_) => report.record_ok(record.digest),
                Err(e) => report.record_err(record.digest, e.to_string()),
            }
        }

        report.log_failures("update_limit_orders");
        Ok(report)
    }

    /// Delete each order by digest; every order is its own statement
    pub async fn delete_limit_orders(&self, records: &[LimitOrderRecord]) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        for record in records {
            let result = sqlx::query("DELETE FROM limit_orders WHERE digest = $1")
                .bind(hex_key(&record.digest))
                .execute(&self.pool)
                .await;

            match result {
                Ok(_) => report.record_ok(record.digest),
                Err(e) => report.record_err(record.digest, e.to_string()),
            }
        }

        report.log_failures("delete_limit_orders");
        Ok(report)
    }

    // ==================== Executed orders ====================

    /// Batch insert executed orders
    pub async fn save_executed_orders(&self, executed: &[ExecutedOrder]) -> Result<()> {
        if executed.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for item in executed {
            sqlx::query(
                r#"
                INSERT INTO executed_orders (digest, tx_hash, fill_amount, order_data)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(hex_key(&item.digest))
            .bind(item.tx_hash.as_ref().map(hex_key))
            .bind(item.fill_amount.to_string())
            .bind(Json(&item.order))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Recorded {} executed orders", executed.len());
        Ok(())
    }

    /// Most recent executed orders
    pub async fn recent_executed_orders(&self, limit: usize) -> Result<Vec<ExecutedOrderRow>> {
        let rows = sqlx::query(
            r#"
            SELECT digest, tx_hash, fill_amount, order_data, executed_at
            FROM executed_orders
            ORDER BY executed_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(executed_order_from_row).collect()
    }

    // ==================== Watch pairs ====================

    /// Replace the watched pair set in one transaction
    pub async fn replace_watch_pairs(&self, pairs: &[WatchPair]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM watch_pairs")
            .execute(&mut *tx)
            .await?;

        for pair in pairs {
            sqlx::query(
                r#"
                INSERT INTO watch_pairs (pair_address, token0, token1)
                VALUES ($1, $2, $3)
                ON CONFLICT (pair_address) DO NOTHING
                "#,
            )
            .bind(hex_key(&pair.pair_address))
            .bind(hex_key(&pair.token0))
            .bind(hex_key(&pair.token1))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Saved {} watch pairs", pairs.len());
        Ok(())
    }

    pub async fn watch_pairs(&self) -> Result<Vec<WatchPair>> {
        let rows = sqlx::query("SELECT pair_address, token0, token1 FROM watch_pairs")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<WatchPair> {
                Ok(WatchPair {
                    pair_address: parse_hex(row.try_get("pair_address")?)?,
                    token0: parse_hex(row.try_get("token0")?)?,
                    token1: parse_hex(row.try_get("token1")?)?,
                })
            })
            .collect()
    }
}

/// Unix seconds as BIGINT; far-future end times clamp to i64::MAX
fn to_db_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

fn parse_hex<T: FromStr>(raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    T::from_str(raw).map_err(|e| RelayerError::InvalidOrder(format!("bad hex value {raw}: {e}")))
}

fn limit_order_from_row(row: &PgRow) -> Result<LimitOrderRecord> {
    let order: Json<LimitOrder> = row.try_get("order_data")?;
    let digest: OrderDigest = parse_hex(row.try_get("digest")?)?;

    Ok(LimitOrderRecord {
        order: order.0,
        digest,
        pair_address: parse_hex(row.try_get("pair_address")?)?,
        price: row.try_get("price")?,
    })
}

fn executed_order_from_row(row: &PgRow) -> Result<ExecutedOrderRow> {
    let order: Json<LimitOrder> = row.try_get("order_data")?;
    let fill_amount: String = row.try_get("fill_amount")?;
    let tx_hash: Option<String> = row.try_get("tx_hash")?;
    let executed_at: DateTime<Utc> = row.try_get("executed_at")?;

    let fill_amount = U256::from_dec_str(&fill_amount).map_err(|e| {
        warn!(fill_amount = %fill_amount, "Stored fill amount is not a decimal integer");
        RelayerError::InvalidOrder(e.to_string())
    })?;

    Ok(ExecutedOrderRow {
        executed: ExecutedOrder {
            order: order.0,
            digest: parse_hex(row.try_get("digest")?)?,
            fill_amount,
            tx_hash: tx_hash.as_deref().map(parse_hex::<H256>).transpose()?,
        },
        executed_at,
    })
}
