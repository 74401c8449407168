use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod time;

/// 交易对标识非法 (为空或包含非 `[A-Za-z0-9_]` 字符)。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid pair identifier: {0:?}")]
pub struct InvalidPair(pub String);

/// # Summary
/// 交易对实体，代表一个可交易的市场 (计价币种_基础币种，例如 `BTC_XMR`)。
///
/// # Invariants
/// - 非空，且只包含 ASCII 字母、数字和下划线。该标识会直接用作存储表名的一部分。
/// - 创建后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pair(String);

impl Pair {
    /// # Summary
    /// 校验并构造交易对。
    ///
    /// # Arguments
    /// * `id`: 交易对原始标识。
    ///
    /// # Returns
    /// 合法则返回 Pair，否则返回 `InvalidPair`。
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidPair> {
        let id = id.into();
        let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid { Ok(Self(id)) } else { Err(InvalidPair(id)) }
    }

    /// 由计价币种与基础币种拼出交易对，例如 (`BTC`, `XMR`) -> `BTC_XMR`。
    pub fn from_currencies(quote: &str, base: &str) -> Result<Self, InvalidPair> {
        Self::new(format!("{}_{}", quote, base))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Pair {
    type Error = InvalidPair;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Pair> for String {
    fn from(pair: Pair) -> Self {
        pair.0
    }
}
