//! 最大長判定。
//!
//! 次数 n の多項式の遷移行列 M について:
//!   1. M を n-1 回2乗する途中で行0が初期値に戻れば周期が短い（RejectedEarly）
//!   2. もう1回2乗して M^(2^n) の行0が初期値と一致しなければ不整合（RejectedInconsistent）
//!   3. 2^n-1 の各素因数 p について M^((2^n-1)/p) の行0が単位行なら
//!      周期が真の約数になる（RejectedFactor）
//!   4. いずれにも該当しなければ最大長（Accepted）
//! 2^n-1 の素因数分解は次数ごとに1回だけ行う。

use log::debug;
use num_integer::Integer;

use crate::bits::{BitVector, FactorInt};
use crate::error::{Error, Result};
use crate::factor::{factorize, Factorization};
use crate::matrix::TransitionMatrix;
use crate::polynomial::Polynomial;

/// 判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Accepted,
    RejectedEarly,
    RejectedInconsistent,
    RejectedFactor,
}

impl Verdict {
    /// 整数コード: 0 / -1 / -2 / -3
    pub fn code(self) -> i32 {
        match self {
            Verdict::Accepted => 0,
            Verdict::RejectedEarly => -1,
            Verdict::RejectedInconsistent => -2,
            Verdict::RejectedFactor => -3,
        }
    }

    pub fn is_maximal(self) -> bool {
        self == Verdict::Accepted
    }

    pub fn is_inconsistent(self) -> bool {
        self == Verdict::RejectedInconsistent
    }
}

/// 次数固定の最大長判定器。
///
/// 生成後は不変なので、並列探索では各セグメントが clone して使う。
#[derive(Debug, Clone)]
pub struct MaximalityTester<B: BitVector> {
    order: usize,
    factors: Factorization<B::Uint>,
    shifts: Vec<B>,
}

impl<B: BitVector> MaximalityTester<B> {
    pub fn new(order: usize) -> Result<Self> {
        if order == 0 {
            return Err(Error::InvalidOrder(order));
        }
        if !B::fits(order) {
            return Err(Error::OrderExceedsCapacity {
                order,
                capacity: B::CAPACITY.unwrap_or(usize::MAX),
            });
        }
        let mersenne = <B::Uint as FactorInt>::mersenne(order).ok_or(Error::OrderExceedsCapacity {
            order,
            capacity: B::CAPACITY.unwrap_or(usize::MAX),
        })?;
        let factors = factorize(mersenne.clone())?;
        let shifts = factors
            .primes()
            .map(|p| B::from_uint(&mersenne.div_floor(p), order))
            .collect();
        debug!(
            "tester order={} backend={} 2^n-1 = {} ({} distinct primes)",
            order,
            B::NAME,
            factors,
            factors.len()
        );
        Ok(MaximalityTester { order, factors, shifts })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// 2^order - 1 の素因数分解
    pub fn factorization(&self) -> &Factorization<B::Uint> {
        &self.factors
    }

    /// (2^order - 1) / p のビットパターン（素因数の昇順）
    pub fn shifts(&self) -> &[B] {
        &self.shifts
    }

    /// 多項式を判定する。次数が異なればエラー。
    pub fn test(&self, poly: &Polynomial<B>) -> Result<Verdict> {
        if poly.order() != self.order {
            return Err(Error::OrderMismatch {
                expected: self.order,
                found: poly.order(),
            });
        }
        Ok(self.classify(poly))
    }

    /// 次数検証済みの判定本体
    pub(crate) fn classify(&self, poly: &Polynomial<B>) -> Verdict {
        let n = self.order;
        let mut state = TransitionMatrix::single_shift(poly);
        let initial = state.leading_row().clone();

        for _ in 0..n - 1 {
            state = state.square();
            if *state.leading_row() == initial {
                return Verdict::RejectedEarly;
            }
        }
        state = state.square();
        if *state.leading_row() != initial {
            debug!("inconsistent verdict for {:#x} (order {})", poly, n);
            return Verdict::RejectedInconsistent;
        }

        if self.shifts.len() > 1 {
            let unit = TransitionMatrix::<B>::unit_row(n);
            for shift in &self.shifts {
                if *TransitionMatrix::shift_by(poly, shift).leading_row() == unit {
                    return Verdict::RejectedFactor;
                }
            }
        }
        Verdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    fn verdict(order: usize, bits: u64) -> Verdict {
        let tester = MaximalityTester::<u64>::new(order).unwrap();
        tester.test(&Polynomial::from_bits(order, bits).unwrap()).unwrap()
    }

    #[test]
    fn test_order4_verdicts() {
        assert_eq!(verdict(4, 0x9), Verdict::Accepted);
        assert_eq!(verdict(4, 0xC), Verdict::Accepted);
        assert_eq!(verdict(4, 0xB), Verdict::RejectedEarly);
        assert_eq!(verdict(4, 0xE), Verdict::RejectedEarly);
        assert_eq!(verdict(4, 0xF), Verdict::RejectedFactor);
        assert_eq!(verdict(4, 0x8), Verdict::RejectedInconsistent);
        assert_eq!(verdict(4, 0xA), Verdict::RejectedInconsistent);
        assert_eq!(verdict(4, 0xD), Verdict::RejectedInconsistent);
    }

    #[test]
    fn test_order6_rejections() {
        for bits in [0x24u64, 0x29, 0x2b, 0x32, 0x3a] {
            assert_eq!(verdict(6, bits), Verdict::RejectedFactor, "bits={:#x}", bits);
        }
        for bits in [0x23u64, 0x26, 0x27, 0x2c, 0x2e, 0x37] {
            assert_eq!(verdict(6, bits), Verdict::RejectedEarly, "bits={:#x}", bits);
        }
        for bits in [0x21u64, 0x2d, 0x30, 0x33, 0x36, 0x39] {
            assert_eq!(verdict(6, bits), Verdict::Accepted, "bits={:#x}", bits);
        }
    }

    #[test]
    fn test_verdict_codes() {
        assert_eq!(Verdict::Accepted.code(), 0);
        assert_eq!(Verdict::RejectedEarly.code(), -1);
        assert_eq!(Verdict::RejectedInconsistent.code(), -2);
        assert_eq!(Verdict::RejectedFactor.code(), -3);
        assert!(Verdict::Accepted.is_maximal());
        assert!(!Verdict::RejectedFactor.is_maximal());
        assert!(Verdict::RejectedInconsistent.is_inconsistent());
    }

    #[test]
    fn test_shifts_and_factorization() {
        let tester = MaximalityTester::<u64>::new(8).unwrap();
        assert_eq!(tester.order(), 8);
        assert_eq!(tester.factorization().to_string(), "3 * 5 * 17");
        assert_eq!(tester.shifts(), &[85u64, 51, 15]);

        // 2^5-1 = 31 は素数: 因数チェックは行わない
        let tester = MaximalityTester::<u64>::new(5).unwrap();
        assert_eq!(tester.shifts(), &[1u64]);
    }

    #[test]
    fn test_order_mismatch() {
        let tester = MaximalityTester::<u64>::new(5).unwrap();
        let p = Polynomial::<u64>::new(4).unwrap();
        assert_eq!(
            tester.test(&p),
            Err(Error::OrderMismatch { expected: 5, found: 4 })
        );
    }

    #[test]
    fn test_new_validation() {
        assert_eq!(MaximalityTester::<u64>::new(0).unwrap_err(), Error::InvalidOrder(0));
        assert_eq!(
            MaximalityTester::<u64>::new(65).unwrap_err(),
            Error::OrderExceedsCapacity { order: 65, capacity: 64 }
        );
    }

    #[test]
    fn test_order_one_and_two() {
        assert_eq!(verdict(1, 0x1), Verdict::Accepted);
        assert_eq!(verdict(2, 0x3), Verdict::Accepted);
        assert_ne!(verdict(2, 0x2), Verdict::Accepted);
    }

    #[test]
    fn test_deterministic_across_instances_and_backends() {
        let a = MaximalityTester::<u64>::new(8).unwrap();
        let b = MaximalityTester::<u64>::new(8).unwrap();
        let big = MaximalityTester::<BigUint>::new(8).unwrap();
        let wide = MaximalityTester::<u128>::new(8).unwrap();
        for low in 0u64..128 {
            let p = Polynomial::<u64>::from_bits(8, low).unwrap();
            let v = a.test(&p).unwrap();
            assert_eq!(v, a.test(&p).unwrap(), "low={:#x}", low);
            assert_eq!(v, b.test(&p).unwrap(), "low={:#x}", low);
            let pw = Polynomial::<u128>::from_bits(8, low as u128).unwrap();
            assert_eq!(v, wide.test(&pw).unwrap(), "low={:#x}", low);
            let pb = Polynomial::<BigUint>::from_bits(8, BigUint::from(low)).unwrap();
            assert_eq!(v, big.test(&pb).unwrap(), "low={:#x}", low);
        }
    }
}
