use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use kura_core::common::Pair;
use kura_core::config::{DatabaseConfig, DedupKey};
use kura_core::market::entity::Trade;
use kura_core::store::error::StoreError;
use kura_core::store::port::TradeStore;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::path::Path;
use tracing::{debug, info};

/// TradeStore 的 SQLite 实现，采用 "一对一表" 策略。
///
/// # Summary
/// 所有交易对共用一个数据库文件，每个交易对对应一张 `trades_{pair}` 表。
///
/// # Invariants
/// * 表、时间索引与唯一约束在首次写入时幂等创建 (`IF NOT EXISTS`)。
/// * 已确认存在的表缓存在 `ready` 中，避免每批都执行 DDL。
/// * `Pair` 已保证只含 `[A-Za-z0-9_]`，可以安全拼接进表名。
pub struct SqliteTradeStore {
    pool: SqlitePool,
    dedup_key: DedupKey,
    ready: DashSet<Pair>,
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn table_name(pair: &Pair) -> String {
    format!("trades_{}", pair.as_str())
}

impl SqliteTradeStore {
    /// 按配置打开 `{data_dir}/{file_name}`，必要时创建目录。
    ///
    /// # Arguments
    /// * `config` - 数据库配置。
    /// * `dedup_key` - 新建表时使用的唯一键。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例或错误。
    pub async fn open(config: &DatabaseConfig, dedup_key: DedupKey) -> Result<Self, StoreError> {
        let dir = Path::new(&config.data_dir);
        std::fs::create_dir_all(dir).map_err(|e| StoreError::InitError(e.to_string()))?;
        Self::open_at(dir.join(&config.file_name), dedup_key).await
    }

    /// 打开指定路径的数据库文件，不存在则创建。
    pub async fn open_at(path: impl AsRef<Path>, dedup_key: DedupKey) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        info!(
            "Trade store opened at {} (dedup key: {:?})",
            path.as_ref().display(),
            dedup_key
        );
        Ok(Self {
            pool,
            dedup_key,
            ready: DashSet::new(),
        })
    }

    /// 确保交易对的表及索引存在，返回表名。
    ///
    /// # Logic
    /// 1. 命中缓存直接返回。
    /// 2. 建表 (id 为主键)，建时间索引。
    /// 3. 去重键为时间戳时，额外在 `trade_time` 上建唯一索引。
    async fn ensure_table(&self, pair: &Pair) -> Result<String, StoreError> {
        let table = table_name(pair);
        if self.ready.contains(pair) {
            return Ok(table);
        }

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{table}" (
                id INTEGER PRIMARY KEY NOT NULL,
                trade_time DATETIME NOT NULL,
                rate REAL NOT NULL
            );
            "#
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

        sqlx::query(&format!(
            r#"CREATE INDEX IF NOT EXISTS "{table}_trade_time" ON "{table}" (trade_time);"#
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

        if self.dedup_key == DedupKey::Timestamp {
            sqlx::query(&format!(
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "{table}_trade_time_unique" ON "{table}" (trade_time);"#
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;
        }

        debug!("Table {} ready", table);
        self.ready.insert(pair.clone());
        Ok(table)
    }

    /// 表是否已存在 (读路径不建表)。
    async fn table_exists(&self, pair: &Pair) -> Result<bool, StoreError> {
        if self.ready.contains(pair) {
            return Ok(true);
        }
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table_name(pair))
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(count > 0)
    }
}

#[async_trait]
impl TradeStore for SqliteTradeStore {
    /// # Summary
    /// 批量写入成交，冲突即忽略。
    ///
    /// # Logic
    /// 1. 确保表存在。
    /// 2. 在单个事务内逐条执行 `INSERT OR IGNORE`。
    /// 3. 累加 `rows_affected` 得到实际插入行数。
    ///
    /// # Arguments
    /// * `pair` - 目标交易对。
    /// * `trades` - 成交列表。
    ///
    /// # Returns
    /// * `Result<u64, StoreError>` - 新插入的行数。
    async fn save_trades(&self, pair: &Pair, trades: &[Trade]) -> Result<u64, StoreError> {
        if trades.is_empty() {
            return Ok(0);
        }
        let table = self.ensure_table(pair).await?;
        let sql = format!(r#"INSERT OR IGNORE INTO "{table}" (id, trade_time, rate) VALUES (?, ?, ?)"#);

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut inserted = 0;
        for trade in trades {
            let rate = trade
                .rate
                .to_f64()
                .ok_or_else(|| StoreError::Database(format!("rate out of range: {}", trade.rate)))?;
            inserted += sqlx::query(&sql)
                .bind(trade.id)
                .bind(trade.time)
                .bind(rate)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?
                .rows_affected();
        }
        tx.commit().await.map_err(db_err)?;

        Ok(inserted)
    }

    /// # Summary
    /// 按 id 升序读取交易对的全部成交。
    ///
    /// # Returns
    /// * `Result<Vec<Trade>, StoreError>` - 表不存在时为空列表。
    async fn load_trades(&self, pair: &Pair) -> Result<Vec<Trade>, StoreError> {
        if !self.table_exists(pair).await? {
            return Ok(Vec::new());
        }
        let table = table_name(pair);

        let records = sqlx::query_as::<_, (i64, DateTime<Utc>, f64)>(&format!(
            r#"SELECT id, trade_time, rate FROM "{table}" ORDER BY id ASC"#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        records
            .into_iter()
            .map(|(id, time, rate)| {
                let rate = Decimal::from_f64(rate)
                    .ok_or_else(|| StoreError::Corrupt(format!("trade {} rate {}", id, rate)))?;
                Ok(Trade { id, time, rate })
            })
            .collect()
    }

    async fn count_trades(&self, pair: &Pair) -> Result<u64, StoreError> {
        if !self.table_exists(pair).await? {
            return Ok(0);
        }
        let (count,): (i64,) = sqlx::query_as(&format!(r#"SELECT COUNT(*) FROM "{}""#, table_name(pair)))
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        u64::try_from(count).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}
