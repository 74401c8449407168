use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理数据库连接、建表与读写失败。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 数据库操作失败
    #[error("Database error: {0}")]
    Database(String),
    /// 初始化存储失败 (目录、连接池或建表)
    #[error("Initialization error: {0}")]
    InitError(String),
    /// 已持久化的数据无法还原为实体
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}
