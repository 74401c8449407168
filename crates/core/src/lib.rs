//! kura 的领域内核：实体、错误、端口 (Port) 与配置。
//!
//! 所有具体实现 (行情源、存储、摄取流程) 都只依赖本 crate 定义的 trait，
//! 由 `kura-app` 在启动时完成装配。

pub mod common;
pub mod config;

pub mod market {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod store {
    pub mod error;
    pub mod port;
}

#[cfg(feature = "test-utils")]
pub mod test_utils;
