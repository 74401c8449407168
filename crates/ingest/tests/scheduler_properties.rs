use kura_core::market::entity::BatchSummary;
use kura_ingest::scheduler::{IngestionState, ScheduleLimits};
use proptest::prelude::*;
use std::collections::BTreeSet;

const START: i64 = 0;
const END: i64 = 50_000;

/// 模拟交易所的截断规则：窗口内最新的 `cap` 笔，按 (时间, id) 倒序。
fn respond(history: &[(i64, usize)], start: i64, end: i64, cap: usize) -> Vec<(i64, usize)> {
    let mut hits: Vec<(i64, usize)> = history
        .iter()
        .filter(|(ts, _)| *ts >= start && *ts <= end)
        .copied()
        .collect();
    hits.sort_by(|a, b| b.cmp(a));
    hits.truncate(cap);
    hits
}

/// 从头到尾跑一遍调度器，检查每一步的不变量，返回抓到的全部成交。
fn drive(
    history: &[(i64, usize)],
    cap: usize,
    window_secs: i64,
) -> Result<BTreeSet<(i64, usize)>, TestCaseError> {
    let limits = ScheduleLimits::new(cap, window_secs, 1000).unwrap();
    let mut state = IngestionState::new(START, END, &limits).unwrap();
    let mut captured = BTreeSet::new();
    let bound = END / window_secs + 2 * i64::try_from(history.len()).unwrap() + 10;
    let mut steps = 0;

    loop {
        steps += 1;
        prop_assert!(steps <= bound, "no termination after {} steps", steps);

        let w = state.window();
        prop_assert!(w.start <= w.end);
        prop_assert!(w.span_secs() <= limits.window_secs);

        let hits = respond(history, w.start, w.end, cap);
        captured.extend(hits.iter().copied());
        let summary = BatchSummary {
            count: hits.len(),
            earliest: hits.last().map(|(ts, _)| *ts),
        };
        let step = state.advance(&limits, summary);
        let Some(next) = step.next else {
            break;
        };

        prop_assert!(next.max_end_seen() >= state.max_end_seen());
        if hits.len() >= cap && next.is_backtracking() {
            // 截断：起点不变，终点严格变小
            prop_assert_eq!(next.window().start, w.start);
            prop_assert!(next.window().end < w.end);
        } else {
            // 前进：紧接高水位，既不留缝也不重叠
            prop_assert!(!next.is_backtracking());
            prop_assert_eq!(next.window().start, next.max_end_seen() + 1);
            prop_assert!(next.window().start > w.start);
        }
        state = next;
    }
    Ok(captured)
}

proptest! {
    /// 每秒至多一笔成交时，所有成交都被恰好抓到。
    #[test]
    fn captures_every_trade_with_distinct_seconds(
        secs in prop::collection::btree_set(START..END, 0..300),
        cap in 1usize..25,
        window_secs in 1i64..20_000,
    ) {
        let history: Vec<(i64, usize)> = secs.iter().enumerate().map(|(i, ts)| (*ts, i)).collect();
        let captured = drive(&history, cap, window_secs)?;
        let expected: BTreeSet<(i64, usize)> = history.into_iter().collect();
        prop_assert_eq!(captured, expected);
    }

    /// 同一秒可能有多笔成交时，每个有成交的秒至少被抓到一笔。
    #[test]
    fn covers_every_second_with_shared_seconds(
        secs in prop::collection::vec(START..5_000i64, 0..300),
        cap in 1usize..25,
        window_secs in 1i64..2_000,
    ) {
        let history: Vec<(i64, usize)> = secs.iter().enumerate().map(|(i, ts)| (*ts, i)).collect();
        let captured = drive(&history, cap, window_secs)?;
        let seen: BTreeSet<i64> = captured.iter().map(|(ts, _)| *ts).collect();
        let expected: BTreeSet<i64> = secs.into_iter().collect();
        prop_assert_eq!(seen, expected);
    }

    /// 没有任何成交时，按窗口前进直至完成。
    #[test]
    fn terminates_on_empty_history(window_secs in 1i64..60_000) {
        let captured = drive(&[], 1, window_secs)?;
        prop_assert!(captured.is_empty());
    }
}
