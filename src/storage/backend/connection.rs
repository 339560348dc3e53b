use std::str::FromStr;
use std::time::Duration;

use sea_orm::sqlx::SqlitePool;
use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, SqlxSqliteConnector};
use tracing::{debug, info};

use crate::errors::{Result, ShortenerError};
use migration::{Migrator, MigratorTrait};

/// 单条语句等待 SQLite 写锁的上限
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const POOL_CONNECT_TIMEOUT: Duration = Duration::from_secs(8);

/// 打开 urls 库的 SQLite 文件，不存在时创建
///
/// WAL 模式下删除 worker 的 UPDATE 不会阻塞跳转查询。
pub async fn connect_sqlite(database_url: &str) -> Result<DatabaseConnection> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| {
            ShortenerError::database_config(format!(
                "Cannot parse url store location '{}': {}",
                database_url, e
            ))
        })?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(SQLITE_BUSY_TIMEOUT);

    let pool = SqlitePool::connect_with(options).await.map_err(|e| {
        ShortenerError::database_connection(format!("Url store (sqlite) unreachable: {}", e))
    })?;

    debug!("Opened sqlite url store");
    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// 连接 PostgreSQL url 库，连接数固定为 `pool_size`
pub async fn connect_generic(
    database_url: &str,
    backend_name: &str,
    pool_size: u32,
) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(pool_size)
        .min_connections(1)
        .connect_timeout(POOL_CONNECT_TIMEOUT)
        .acquire_timeout(POOL_CONNECT_TIMEOUT)
        .sqlx_logging(false);

    let db = Database::connect(options).await.map_err(|e| {
        ShortenerError::database_connection(format!(
            "Url store ({}) unreachable: {}",
            backend_name, e
        ))
    })?;

    debug!("Opened {} url store with {} connection(s)", backend_name, pool_size);
    Ok(db)
}

/// 创建或升级 urls 表及其索引
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None).await.map_err(|e| {
        ShortenerError::database_operation(format!("Cannot prepare urls table: {}", e))
    })?;

    info!("Urls table is up to date");
    Ok(())
}
