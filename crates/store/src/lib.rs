//! 持久化适配器。

pub mod trade;
