//! 历史成交摄取引擎。
//!
//! 调用链：`driver` 逐个交易对调用 `ingestor`；`ingestor` 循环执行
//! `scheduler` (决定窗口) -> `fetcher` (带重试的查询) -> `writer` (去重落库)，
//! 直到窗口越过下载终点。

pub mod driver;
pub mod error;
pub mod fetcher;
pub mod ingestor;
pub mod retry;
pub mod scheduler;
pub mod writer;
