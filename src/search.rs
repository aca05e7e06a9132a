//! 候補列挙と探索モード。
//!
//! どのモードも「受理された多項式」を返す有限・遅延・再開不可（fused）の
//! イテレータで、判定器と統計は列挙器（[`CandidateEnumerator`]）が持つ。
//!
//!   sequential: 偶数重みの候補を昇順に（終端・件数・ペア・タップ数の条件付き）
//!   random    : 乱数から出発して最初の受理まで前進、を count 回
//!   windowed  : 連続する num_bits ビット窓の全組み合わせ
//!   two_tap   : 先頭タップ + 1 タップ
//!
//! キャンセルフラグが立てば、どのモードも次の候補の前で終了する。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::trace;
use rand::Rng;

use crate::bits::BitVector;
use crate::error::{Error, Result};
use crate::polynomial::{Polynomial, Symmetry};
use crate::tester::{MaximalityTester, Verdict};

/// 窓の最大ビット数（組み合わせカウンタは u64）
pub const MAX_WINDOW_BITS: usize = 63;

/// 逐次探索の設定
#[derive(Debug, Clone)]
pub struct SearchOptions<B: BitVector> {
    /// 開始候補（None なら先頭タップのみ）。開始候補は必ず判定する
    pub start: Option<Polynomial<B>>,
    /// これより大きい候補に達したら終了
    pub end: Option<Polynomial<B>>,
    /// 出力件数の上限。ペアモードではペアを分割しないため1件超えることがある
    pub max_results: Option<usize>,
    /// 非対称解をペアで出力する
    pub paired: bool,
    /// タップ数（先頭タップを含む）の上限
    pub max_taps: Option<usize>,
}

impl<B: BitVector> Default for SearchOptions<B> {
    fn default() -> Self {
        SearchOptions {
            start: None,
            end: None,
            max_results: None,
            paired: false,
            max_taps: None,
        }
    }
}

/// 探索統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// 判定した候補数
    pub tested: u64,
    pub accepted: u64,
    /// 周期が短い（-1）
    pub early: u64,
    /// 2^n 乗で戻らない（-2）
    pub inconsistent: u64,
    /// 素因数チェックで除外（-3）
    pub factor: u64,
    /// 受理されたがタップ数上限で出力しなかった数
    pub filtered: u64,
}

impl SearchStats {
    pub fn record(&mut self, verdict: Verdict) {
        self.tested += 1;
        match verdict {
            Verdict::Accepted => self.accepted += 1,
            Verdict::RejectedEarly => self.early += 1,
            Verdict::RejectedInconsistent => self.inconsistent += 1,
            Verdict::RejectedFactor => self.factor += 1,
        }
    }

    pub fn merge(&mut self, other: &SearchStats) {
        self.tested += other.tested;
        self.accepted += other.accepted;
        self.early += other.early;
        self.inconsistent += other.inconsistent;
        self.factor += other.factor;
        self.filtered += other.filtered;
    }

    pub fn rejected(&self) -> u64 {
        self.early + self.inconsistent + self.factor
    }
}

/// 次数固定の候補列挙器。判定器・統計・キャンセルフラグを持つ。
#[derive(Debug, Clone)]
pub struct CandidateEnumerator<B: BitVector> {
    tester: MaximalityTester<B>,
    stats: SearchStats,
    cancel: Option<Arc<AtomicBool>>,
}

impl<B: BitVector> CandidateEnumerator<B> {
    pub fn new(order: usize) -> Result<Self> {
        Ok(Self::with_tester(MaximalityTester::new(order)?))
    }

    /// 構築済みの判定器を使う（2^n-1 の分解を共有したいとき）
    pub fn with_tester(tester: MaximalityTester<B>) -> Self {
        CandidateEnumerator {
            tester,
            stats: SearchStats::default(),
            cancel: None,
        }
    }

    pub fn set_cancel_flag(&mut self, cancel: Arc<AtomicBool>) {
        self.cancel = Some(cancel);
    }

    pub fn order(&self) -> usize {
        self.tester.order()
    }

    pub fn tester(&self) -> &MaximalityTester<B> {
        &self.tester
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }

    fn evaluate(&mut self, poly: &Polynomial<B>) -> Verdict {
        let verdict = self.tester.classify(poly);
        trace!("candidate {:#x}: {:?}", poly, verdict);
        self.stats.record(verdict);
        verdict
    }

    fn check_order(&self, poly: &Polynomial<B>) -> Result<()> {
        if poly.order() != self.order() {
            return Err(Error::OrderMismatch {
                expected: self.order(),
                found: poly.order(),
            });
        }
        Ok(())
    }

    /// 逐次探索
    pub fn sequential(self, options: SearchOptions<B>) -> Result<Sequential<B>> {
        if let Some(start) = &options.start {
            self.check_order(start)?;
        }
        if let Some(end) = &options.end {
            self.check_order(end)?;
        }
        let cursor = match options.start {
            Some(start) => start,
            None => Polynomial::leading_only(self.order()),
        };
        Ok(Sequential {
            core: self,
            cursor,
            end: options.end,
            max_results: options.max_results,
            paired: options.paired,
            max_taps: options.max_taps,
            emitted: 0,
            advanced: false,
            pending: None,
            done: false,
        })
    }

    /// 乱数探索: count 個の受理多項式を返す
    pub fn random<R: Rng>(self, count: usize, rng: R) -> Random<B, R> {
        let order = self.order();
        Random {
            core: self,
            rng,
            cursor: Polynomial::leading_only(order),
            remaining: count,
        }
    }

    /// 窓探索: ビット shift_up .. shift_up+num_bits の非零な全組み合わせ
    pub fn windowed(self, shift_up: usize, num_bits: usize) -> Result<Windowed<B>> {
        let order = self.order();
        if num_bits == 0 || num_bits > MAX_WINDOW_BITS || shift_up + num_bits >= order {
            return Err(Error::InvalidWindow { shift_up, num_bits, order });
        }
        Ok(Windowed {
            core: self,
            shift_up,
            num_bits,
            combination: 1,
            last: (1u64 << num_bits) - 1,
        })
    }

    /// 2タップ探索: 先頭タップ + ビット k (k = 0..order-2)
    pub fn two_tap(self) -> TwoTap<B> {
        TwoTap { core: self, position: 0 }
    }
}

/// 逐次探索イテレータ
#[derive(Debug)]
pub struct Sequential<B: BitVector> {
    core: CandidateEnumerator<B>,
    cursor: Polynomial<B>,
    end: Option<Polynomial<B>>,
    max_results: Option<usize>,
    paired: bool,
    max_taps: Option<usize>,
    emitted: usize,
    /// カーソルを一度でも進めたか（開始候補自体を判定するため）
    advanced: bool,
    /// ペアモードで次に返す双対
    pending: Option<Polynomial<B>>,
    done: bool,
}

impl<B: BitVector> Sequential<B> {
    pub fn stats(&self) -> &SearchStats {
        self.core.stats()
    }

    pub fn into_stats(self) -> SearchStats {
        self.core.stats
    }
}

impl<B: BitVector> Iterator for Sequential<B> {
    type Item = Polynomial<B>;

    fn next(&mut self) -> Option<Polynomial<B>> {
        if let Some(dual) = self.pending.take() {
            self.emitted += 1;
            return Some(dual);
        }
        if self.done {
            return None;
        }
        loop {
            if self.core.cancelled() {
                self.done = true;
                return None;
            }
            if self.advanced {
                self.cursor.next_candidate();
                if self.cursor.is_end_candidate() {
                    self.done = true;
                    return None;
                }
            }
            self.advanced = true;

            if self.paired && self.cursor.is_asymmetric() == Symmetry::HighHeavy {
                continue;
            }
            if self.end.as_ref().is_some_and(|end| self.cursor > *end) {
                self.done = true;
                return None;
            }
            if self.max_results.is_some_and(|max| self.emitted >= max) {
                self.done = true;
                return None;
            }

            if !self.core.evaluate(&self.cursor).is_maximal() {
                continue;
            }
            if self.max_taps.is_some_and(|max| self.cursor.num_bits_set() > max) {
                self.core.stats.filtered += 1;
                continue;
            }
            if self.paired && self.cursor.is_asymmetric() == Symmetry::LowHeavy {
                self.pending = Some(self.cursor.symmetric_dual());
            }
            self.emitted += 1;
            return Some(self.cursor.clone());
        }
    }
}

impl<B: BitVector> std::iter::FusedIterator for Sequential<B> {}

/// 乱数探索イテレータ
#[derive(Debug)]
pub struct Random<B: BitVector, R> {
    core: CandidateEnumerator<B>,
    rng: R,
    cursor: Polynomial<B>,
    remaining: usize,
}

impl<B: BitVector, R> Random<B, R> {
    pub fn stats(&self) -> &SearchStats {
        self.core.stats()
    }
}

impl<B: BitVector, R: Rng> Iterator for Random<B, R> {
    type Item = Polynomial<B>;

    fn next(&mut self) -> Option<Polynomial<B>> {
        if self.remaining == 0 || self.core.cancelled() {
            self.remaining = 0;
            return None;
        }
        self.cursor.set_random(&mut self.rng);
        trace!("random start {:#x}", self.cursor);
        loop {
            if self.core.evaluate(&self.cursor).is_maximal() {
                self.remaining -= 1;
                return Some(self.cursor.clone());
            }
            if self.core.cancelled() {
                self.remaining = 0;
                return None;
            }
            self.cursor.next_candidate();
            if self.cursor.is_end_candidate() {
                self.cursor.set_random(&mut self.rng);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<B: BitVector, R: Rng> std::iter::FusedIterator for Random<B, R> {}

/// 窓探索イテレータ
#[derive(Debug)]
pub struct Windowed<B: BitVector> {
    core: CandidateEnumerator<B>,
    shift_up: usize,
    num_bits: usize,
    combination: u64,
    last: u64,
}

impl<B: BitVector> Windowed<B> {
    pub fn stats(&self) -> &SearchStats {
        self.core.stats()
    }
}

impl<B: BitVector> Iterator for Windowed<B> {
    type Item = Polynomial<B>;

    fn next(&mut self) -> Option<Polynomial<B>> {
        while self.combination <= self.last {
            if self.core.cancelled() {
                self.combination = self.last + 1;
                return None;
            }
            let comb = self.combination;
            self.combination += 1;
            let poly = Polynomial::with_taps(
                self.core.order(),
                (0..self.num_bits)
                    .filter(|&k| (comb >> k) & 1 == 1)
                    .map(|k| self.shift_up + k),
            );
            if self.core.evaluate(&poly).is_maximal() {
                return Some(poly);
            }
        }
        None
    }
}

impl<B: BitVector> std::iter::FusedIterator for Windowed<B> {}

/// 2タップ探索イテレータ
#[derive(Debug)]
pub struct TwoTap<B: BitVector> {
    core: CandidateEnumerator<B>,
    position: usize,
}

impl<B: BitVector> TwoTap<B> {
    pub fn stats(&self) -> &SearchStats {
        self.core.stats()
    }
}

impl<B: BitVector> Iterator for TwoTap<B> {
    type Item = Polynomial<B>;

    fn next(&mut self) -> Option<Polynomial<B>> {
        let order = self.core.order();
        while self.position + 1 < order {
            if self.core.cancelled() {
                self.position = order;
                return None;
            }
            let poly = Polynomial::with_taps(order, [self.position]);
            self.position += 1;
            if self.core.evaluate(&poly).is_maximal() {
                return Some(poly);
            }
        }
        None
    }
}

impl<B: BitVector> std::iter::FusedIterator for TwoTap<B> {}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn values(polys: impl IntoIterator<Item = Polynomial<u64>>) -> Vec<u64> {
        polys.into_iter().map(|p| *p.bits()).collect()
    }

    fn sequential(order: usize, options: SearchOptions<u64>) -> Vec<u64> {
        let e = CandidateEnumerator::<u64>::new(order).unwrap();
        values(e.sequential(options).unwrap())
    }

    fn poly(order: usize, bits: u64) -> Polynomial<u64> {
        Polynomial::from_bits(order, bits).unwrap()
    }

    #[test]
    fn test_sequential_small_orders() {
        assert_eq!(sequential(4, SearchOptions::default()), vec![0x9, 0xc]);
        assert_eq!(
            sequential(5, SearchOptions::default()),
            vec![0x12, 0x14, 0x17, 0x1b, 0x1d, 0x1e]
        );
        assert_eq!(
            sequential(6, SearchOptions::default()),
            vec![0x21, 0x2d, 0x30, 0x33, 0x36, 0x39]
        );
        assert_eq!(sequential(1, SearchOptions::default()), vec![0x1]);
        assert_eq!(sequential(2, SearchOptions::default()), vec![0x3]);
    }

    #[test]
    fn test_sequential_stats() {
        let e = CandidateEnumerator::<u64>::new(4).unwrap();
        let mut it = e.sequential(SearchOptions::default()).unwrap();
        let found: Vec<_> = it.by_ref().collect();
        assert_eq!(found.len(), 2);
        let stats = it.stats();
        // 開始候補 0x8 と偶数重みの 0x9, 0xa, 0xc, 0xf
        assert_eq!(stats.tested, 5);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected(), 3);
        assert_eq!(stats.factor, 1);
        assert_eq!(stats.early, 0);
        assert_eq!(stats.inconsistent, 2);
        // fused
        assert!(it.next().is_none());
    }

    #[test]
    fn test_sequential_max_results() {
        let options = SearchOptions { max_results: Some(3), ..Default::default() };
        assert_eq!(sequential(8, options), vec![0x8e, 0x95, 0x96]);
    }

    #[test]
    fn test_sequential_range() {
        let options = SearchOptions {
            start: Some(poly(8, 0xa0)),
            end: Some(poly(8, 0xc0)),
            ..Default::default()
        };
        assert_eq!(sequential(8, options), vec![0xa6, 0xaf, 0xb1, 0xb2, 0xb4, 0xb8]);
    }

    #[test]
    fn test_sequential_start_is_tested() {
        let options = SearchOptions { start: Some(poly(5, 0x1b)), ..Default::default() };
        assert_eq!(sequential(5, options), vec![0x1b, 0x1d, 0x1e]);
    }

    #[test]
    fn test_sequential_order_mismatch() {
        let e = CandidateEnumerator::<u64>::new(8).unwrap();
        let options = SearchOptions { start: Some(poly(7, 0x41)), ..Default::default() };
        assert_eq!(
            e.sequential(options).unwrap_err(),
            Error::OrderMismatch { expected: 8, found: 7 }
        );
    }

    #[test]
    fn test_sequential_max_taps() {
        let e = CandidateEnumerator::<u64>::new(8).unwrap();
        let options = SearchOptions { max_taps: Some(4), ..Default::default() };
        let mut it = e.sequential(options).unwrap();
        let found = values(it.by_ref());
        assert_eq!(
            found,
            vec![0x8e, 0x95, 0x96, 0xa6, 0xb1, 0xb2, 0xb4, 0xb8, 0xc3, 0xc6, 0xd4, 0xe1]
        );
        assert_eq!(it.stats().filtered, 4);
        assert_eq!(it.stats().accepted, 16);
    }

    #[test]
    fn test_paired() {
        let options = SearchOptions { paired: true, ..Default::default() };
        assert_eq!(sequential(4, options.clone()), vec![0x9, 0xc]);
        assert_eq!(
            sequential(5, options.clone()),
            vec![0x12, 0x14, 0x17, 0x1e, 0x1b, 0x1d]
        );
        assert_eq!(
            sequential(8, options),
            vec![
                0x8e, 0xb8, 0x95, 0xd4, 0x96, 0xb4, 0xa6, 0xb2, 0xaf, 0xfa, 0xb1, 0xc6, 0xc3,
                0xe1, 0xe7, 0xf3
            ]
        );
    }

    #[test]
    fn test_paired_matches_sequential_set() {
        for order in 3..=9 {
            let mut paired = sequential(order, SearchOptions { paired: true, ..Default::default() });
            paired.sort_unstable();
            assert_eq!(paired, sequential(order, SearchOptions::default()), "order={}", order);
        }
    }

    #[test]
    fn test_paired_never_splits_pair() {
        let options = SearchOptions { paired: true, max_results: Some(2), ..Default::default() };
        assert_eq!(sequential(8, options), vec![0x8e, 0xb8]);
        let options = SearchOptions { paired: true, max_results: Some(1), ..Default::default() };
        assert_eq!(sequential(8, options), vec![0x8e, 0xb8]);
        let options = SearchOptions { paired: true, max_results: Some(3), ..Default::default() };
        assert_eq!(sequential(8, options), vec![0x8e, 0xb8, 0x95, 0xd4]);
    }

    #[test]
    fn test_random_seeded() {
        let all = sequential(9, SearchOptions::default());
        let e = CandidateEnumerator::<u64>::new(9).unwrap();
        let found = values(e.random(10, StdRng::seed_from_u64(42)));
        assert_eq!(found.len(), 10);
        for v in &found {
            assert!(all.contains(v), "{:#x} is not maximal", v);
        }
        let again = values(
            CandidateEnumerator::<u64>::new(9)
                .unwrap()
                .random(10, StdRng::seed_from_u64(42)),
        );
        assert_eq!(found, again);
    }

    #[test]
    fn test_windowed() {
        let e = CandidateEnumerator::<u64>::new(7).unwrap();
        assert_eq!(values(e.windowed(0, 3).unwrap()), vec![0x41, 0x44, 0x47]);
        let e = CandidateEnumerator::<u64>::new(8).unwrap();
        assert_eq!(values(e.windowed(0, 4).unwrap()), vec![0x8e]);
        let e = CandidateEnumerator::<u64>::new(10).unwrap();
        assert_eq!(values(e.windowed(2, 5).unwrap()), vec![0x204, 0x240]);
    }

    #[test]
    fn test_windowed_covers_all_low_bits() {
        let e = CandidateEnumerator::<u64>::new(9).unwrap();
        let mut it = e.windowed(0, 8).unwrap();
        let found = values(it.by_ref());
        assert_eq!(found, sequential(9, SearchOptions::default()));
        assert_eq!(it.stats().tested, 255);
    }

    #[test]
    fn test_windowed_validation() {
        let e = CandidateEnumerator::<u64>::new(8).unwrap();
        assert!(matches!(e.clone().windowed(0, 0), Err(Error::InvalidWindow { .. })));
        assert!(matches!(e.clone().windowed(4, 4), Err(Error::InvalidWindow { .. })));
        assert!(e.windowed(3, 4).is_ok());
        let e = CandidateEnumerator::<u128>::new(100).unwrap();
        assert!(matches!(e.windowed(0, 64), Err(Error::InvalidWindow { .. })));
    }

    #[test]
    fn test_two_tap_positions() {
        let expected: &[(usize, &[usize])] = &[
            (2, &[0]),
            (3, &[0, 1]),
            (4, &[0, 2]),
            (5, &[1, 2]),
            (6, &[0, 4]),
            (7, &[0, 2, 3, 5]),
            (8, &[]),
            (9, &[3, 4]),
            (10, &[2, 6]),
            (11, &[1, 8]),
            (12, &[]),
        ];
        for &(order, positions) in expected {
            let e = CandidateEnumerator::<u64>::new(order).unwrap();
            let found: Vec<usize> = e.two_tap().map(|p| p.taps()[0] - 1).collect();
            assert_eq!(found, positions, "order={}", order);
        }
        let e = CandidateEnumerator::<u64>::new(1).unwrap();
        assert_eq!(e.two_tap().count(), 0);
    }

    #[test]
    fn test_cancel_flag_stops_every_mode() {
        let cancel = Arc::new(AtomicBool::new(true));
        let mut e = CandidateEnumerator::<u64>::new(8).unwrap();
        e.set_cancel_flag(cancel.clone());
        assert_eq!(e.clone().sequential(SearchOptions::default()).unwrap().count(), 0);
        assert_eq!(e.clone().random(5, StdRng::seed_from_u64(1)).count(), 0);
        assert_eq!(e.clone().windowed(0, 4).unwrap().count(), 0);
        assert_eq!(e.two_tap().count(), 0);
    }

    #[test]
    fn test_cancel_mid_search() {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut e = CandidateEnumerator::<u64>::new(8).unwrap();
        e.set_cancel_flag(cancel.clone());
        let mut it = e.sequential(SearchOptions::default()).unwrap();
        assert_eq!(it.next().map(|p| *p.bits()), Some(0x8e));
        cancel.store(true, Ordering::Relaxed);
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn test_big_backend_sequential() {
        let e = CandidateEnumerator::<BigUint>::new(6).unwrap();
        let found: Vec<BigUint> = e
            .sequential(SearchOptions::default())
            .unwrap()
            .map(|p| p.to_uint())
            .collect();
        let expected: Vec<BigUint> = [0x21u32, 0x2d, 0x30, 0x33, 0x36, 0x39]
            .iter()
            .map(|&v| BigUint::from(v))
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_stats_merge() {
        let mut a = SearchStats { tested: 3, accepted: 1, early: 1, factor: 1, ..Default::default() };
        let b = SearchStats { tested: 2, inconsistent: 2, filtered: 1, ..Default::default() };
        a.merge(&b);
        assert_eq!(a.tested, 5);
        assert_eq!(a.inconsistent, 2);
        assert_eq!(a.filtered, 1);
        assert_eq!(a.rejected(), 4);
    }
}
