use crate::error::ScheduleError;
use kura_core::config::IngestConfig;
use kura_core::market::entity::{BatchSummary, DownloadWindow};

/// # Summary
/// 交易所接口的隐含约束，注入调度器而不是硬编码。
///
/// # Invariants
/// - `record_cap >= 1`，`window_secs >= 1`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleLimits {
    // 单次返回记录数上限，达到即视为截断
    pub record_cap: usize,
    // 前进时使用的窗口跨度 (秒)，留有低于一年上限的余量
    pub window_secs: i64,
}

impl ScheduleLimits {
    /// # Summary
    /// 构造并校验调度参数。
    ///
    /// # Arguments
    /// * `record_cap`: 单次返回上限。
    /// * `max_window_secs`: 交易所允许的最大跨度。
    /// * `window_permille`: 实际使用跨度占最大跨度的千分比，必须在 (0, 1000] 之间。
    pub fn new(
        record_cap: usize,
        max_window_secs: i64,
        window_permille: u32,
    ) -> Result<Self, ScheduleError> {
        if record_cap == 0 {
            return Err(ScheduleError::ZeroCap);
        }
        if window_permille == 0 || window_permille > 1000 {
            return Err(ScheduleError::WindowPermille(window_permille));
        }
        let window_secs = max_window_secs.saturating_mul(i64::from(window_permille)) / 1000;
        if window_secs < 1 {
            return Err(ScheduleError::EmptyWindow(window_secs));
        }
        Ok(Self {
            record_cap,
            window_secs,
        })
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self, ScheduleError> {
        Self::new(
            config.record_cap,
            config.max_window_secs,
            config.window_permille,
        )
    }
}

/// 一次状态转移的种类，供日志使用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// 窗口完整，从当前窗口末尾继续前进
    Advanced,
    /// 结果被截断，收缩窗口末尾
    Backtracked,
    /// 回溯结束，从高水位之后继续前进
    Resumed,
    /// 结果被截断但窗口已无法再收缩 (整批成交都落在窗口起点那一秒)，强制前进
    ForcedResume,
}

/// `IngestionState::advance` 的结果。`next` 为空表示该交易对已下载完毕。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub transition: Transition,
    pub next: Option<IngestionState>,
}

impl Step {
    pub fn is_complete(&self) -> bool {
        self.next.is_none()
    }
}

/// # Summary
/// 单个交易对的窗口调度状态，不可变值，每次抓取后由 `advance` 产生下一个状态。
///
/// # Invariants
/// - `max_end_seen` 单调不减，且不小于任何一个产生过未截断结果的 `cur_end`。
/// - 回溯期间 `cur_start` 不变，`cur_end` 严格递减。
/// - `cur_end - cur_start <= window_secs`。
/// - `cur_start <= cur_end`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionState {
    cur_start: i64,
    cur_end: i64,
    end_timestamp: i64,
    max_end_seen: i64,
    backtracking: bool,
}

impl IngestionState {
    /// # Summary
    /// 创建交易对的初始状态。
    ///
    /// # Logic
    /// 1. 第一个窗口为 `[start, min(start + window_secs, end_timestamp)]`。
    /// 2. 高水位初始化为 `start - 1` (尚未覆盖任何时间)。
    ///
    /// # Arguments
    /// * `start`: 历史起点 (unix 秒)。
    /// * `end_timestamp`: 下载终点 (unix 秒)。
    /// * `limits`: 调度参数。
    ///
    /// # Returns
    /// `start >= end_timestamp` 时返回 `ScheduleError::EmptyRange`。
    pub fn new(
        start: i64,
        end_timestamp: i64,
        limits: &ScheduleLimits,
    ) -> Result<Self, ScheduleError> {
        if start >= end_timestamp {
            return Err(ScheduleError::EmptyRange {
                start,
                end: end_timestamp,
            });
        }
        Ok(Self {
            cur_start: start,
            cur_end: start.saturating_add(limits.window_secs).min(end_timestamp),
            end_timestamp,
            max_end_seen: start - 1,
            backtracking: false,
        })
    }

    /// 当前要查询的窗口。
    pub fn window(&self) -> DownloadWindow {
        DownloadWindow::new(self.cur_start, self.cur_end)
    }

    pub fn max_end_seen(&self) -> i64 {
        self.max_end_seen
    }

    pub fn is_backtracking(&self) -> bool {
        self.backtracking
    }

    /// # Summary
    /// 根据当前窗口的抓取结果计算下一个状态。
    ///
    /// # Logic
    /// 1. 高水位取 `max(max_end_seen, cur_end)`。
    /// 2. 结果数达到上限：说明窗口内还有更早的成交未返回，将 `cur_end` 收缩到
    ///    最早一笔成交的前一秒并进入回溯。收缩后若早于 `cur_start` 则无法继续收缩，转为强制前进。
    /// 3. 结果未截断：从高水位之后一秒继续 (非回溯时高水位即 `cur_end`)。
    /// 4. 已覆盖到 `end_timestamp` 则结束，否则下一个窗口为
    ///    `[cur_start, min(cur_start + window_secs, end_timestamp)]`。
    ///
    /// # Arguments
    /// * `limits`: 调度参数。
    /// * `batch`: 本次结果的笔数与最早成交时间。
    ///
    /// # Returns
    /// 本次转移的种类及下一个状态 (结束时为 None)。
    pub fn advance(&self, limits: &ScheduleLimits, batch: BatchSummary) -> Step {
        let max_end_seen = self.max_end_seen.max(self.cur_end);
        let capped = batch.count >= limits.record_cap;

        if capped {
            // 截断结果必然非空；收缩量至少 1 秒，防止异常数据让回溯原地打转
            let shrunk = batch
                .earliest
                .map_or(self.cur_end - 1, |earliest| earliest - 1)
                .min(self.cur_end - 1);
            if shrunk >= self.cur_start {
                return Step {
                    transition: Transition::Backtracked,
                    next: Some(Self {
                        cur_end: shrunk,
                        max_end_seen,
                        backtracking: true,
                        ..*self
                    }),
                };
            }
        }

        let transition = match (capped, self.backtracking) {
            (true, _) => Transition::ForcedResume,
            (false, true) => Transition::Resumed,
            (false, false) => Transition::Advanced,
        };

        let cur_start = max_end_seen + 1;
        if max_end_seen >= self.end_timestamp || cur_start >= self.end_timestamp {
            return Step {
                transition,
                next: None,
            };
        }

        Step {
            transition,
            next: Some(Self {
                cur_start,
                cur_end: cur_start.saturating_add(limits.window_secs).min(self.end_timestamp),
                end_timestamp: self.end_timestamp,
                max_end_seen,
                backtracking: false,
            }),
        }
    }
}
