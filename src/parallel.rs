use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;

use crate::bits::BitVector;
use crate::error::{Error, Result};
use crate::polynomial::Polynomial;
use crate::search::{CandidateEnumerator, SearchOptions, SearchStats};
use crate::tester::MaximalityTester;

/// セグメント数の log2 の上限
pub const MAX_SEGMENTS_LOG2: u32 = 24;

/// セグメント並列探索の結果
#[derive(Debug, Clone)]
pub struct SegmentedSearch<B: BitVector> {
    /// 見つかった最大長多項式（昇順）
    pub polynomials: Vec<Polynomial<B>>,
    /// 全セグメントの統計の合計
    pub stats: SearchStats,
    /// セグメント数
    pub segments: usize,
    /// キャンセルで途中終了したか
    pub cancelled: bool,
}

/// セグメント s の [開始, 終了] 多項式。
/// 先頭タップの直下 k ビットに s を置き、残りを 0 / 全 1 にする。
fn segment_bounds<B: BitVector>(
    order: usize,
    segments_log2: u32,
    segment: usize,
) -> (Polynomial<B>, Polynomial<B>) {
    let k = segments_log2 as usize;
    let base = order - 1 - k;
    let upper: Vec<usize> = (0..k)
        .filter(|&b| (segment >> b) & 1 == 1)
        .map(|b| base + b)
        .collect();
    let start = Polynomial::with_taps(order, upper.iter().copied());
    let end = Polynomial::with_taps(order, upper.iter().copied().chain(0..base));
    (start, end)
}

/// 先頭ビット固定の範囲を 2^segments_log2 個に等分し、
/// 各セグメントをペアモードの逐次探索で並列に処理する。
/// 結果は逐次探索と同じ集合になる。
pub fn search_segments<B: BitVector>(order: usize, segments_log2: u32) -> Result<SegmentedSearch<B>> {
    run_segments(order, segments_log2, None)
}

/// キャンセル可能なセグメント並列探索。cancel が true になると途中結果を返す。
pub fn search_segments_cancellable<B: BitVector>(
    order: usize,
    segments_log2: u32,
    cancel: &Arc<AtomicBool>,
) -> Result<SegmentedSearch<B>> {
    run_segments(order, segments_log2, Some(cancel))
}

fn run_segments<B: BitVector>(
    order: usize,
    segments_log2: u32,
    cancel: Option<&Arc<AtomicBool>>,
) -> Result<SegmentedSearch<B>> {
    let tester = MaximalityTester::<B>::new(order)?;
    if segments_log2 as usize > order - 1 || segments_log2 > MAX_SEGMENTS_LOG2 {
        return Err(Error::InvalidSegments { order, segments_log2 });
    }
    let segments = 1usize << segments_log2;
    debug!("order {}: {} segments on {} threads", order, segments, rayon::current_num_threads());

    let partial: Vec<(Vec<Polynomial<B>>, SearchStats)> = (0..segments)
        .into_par_iter()
        .map(|segment| {
            let (start, end) = segment_bounds::<B>(order, segments_log2, segment);
            let mut enumerator = CandidateEnumerator::with_tester(tester.clone());
            if let Some(flag) = cancel {
                enumerator.set_cancel_flag(Arc::clone(flag));
            }
            let options = SearchOptions {
                start: Some(start),
                end: Some(end),
                paired: true,
                ..Default::default()
            };
            let mut iter = enumerator.sequential(options)?;
            let found: Vec<Polynomial<B>> = iter.by_ref().collect();
            debug!("segment {}/{}: {} found", segment, segments, found.len());
            Ok((found, iter.into_stats()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut polynomials = Vec::new();
    let mut stats = SearchStats::default();
    for (found, segment_stats) in partial {
        polynomials.extend(found);
        stats.merge(&segment_stats);
    }
    polynomials.sort();

    let cancelled = cancel.is_some_and(|c| c.load(Ordering::Relaxed));
    info!(
        "order {}: {} maximal polynomials, {} tested, {} inconsistent{}",
        order,
        polynomials.len(),
        stats.tested,
        stats.inconsistent,
        if cancelled { " (cancelled)" } else { "" }
    );

    Ok(SegmentedSearch {
        polynomials,
        stats,
        segments,
        cancelled,
    })
}
