//! 外部行情源适配器。

pub mod fixed;
pub mod poloniex;
