//! 2^n-1 の素因数分解（試し割り）。
//!
//! 2 を取り除いた後、3, 5 と 6k±1 の候補（7, 11, 13, 17, 19, 23, 25, ...）で
//! 割っていく。打ち切りは現在の余因数の整数平方根で、割れるたびに更新する。
//! 平方根は `Roots::sqrt` で厳密に求めるので浮動小数点の精度限界はない。

use std::fmt;

use log::trace;

use crate::bits::FactorInt;
use crate::error::{Error, Result};

/// 素因数とその重複度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeFactor<U> {
    pub prime: U,
    pub multiplicity: u32,
}

/// 素因数分解の結果。素因数は狭義単調増加。
///
/// 入力 0 は空、入力 1 は疑似因数 (1, 1) ひとつになる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factorization<U> {
    factors: Vec<PrimeFactor<U>>,
}

impl<U: FactorInt> Factorization<U> {
    fn empty() -> Self {
        Factorization { factors: Vec::new() }
    }

    /// 因数を追加する。直前と同じなら重複度を増やし、小さければ内部エラー。
    fn push(&mut self, prime: U) -> Result<()> {
        match self.factors.last_mut() {
            Some(last) if last.prime == prime => {
                last.multiplicity += 1;
            }
            Some(last) if last.prime > prime => {
                return Err(Error::FactorOrder {
                    previous: last.prime.to_string(),
                    next: prime.to_string(),
                });
            }
            _ => {
                trace!("factor {}", prime);
                self.factors.push(PrimeFactor { prime, multiplicity: 1 });
            }
        }
        Ok(())
    }

    pub fn factors(&self) -> &[PrimeFactor<U>] {
        &self.factors
    }

    /// 相異なる素因数（昇順）
    pub fn primes(&self) -> impl Iterator<Item = &U> + '_ {
        self.factors.iter().map(|f| &f.prime)
    }

    /// 相異なる素因数の個数
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// 元の入力を復元する（空なら 0）
    pub fn product(&self) -> U {
        if self.factors.is_empty() {
            return U::zero();
        }
        self.factors.iter().fold(U::one(), |acc, f| {
            acc * num_traits::pow(f.prime.clone(), f.multiplicity as usize)
        })
    }
}

/// "3 * 5**3 * 11" 形式
impl<U: FactorInt> fmt::Display for Factorization<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.factors.is_empty() {
            return write!(f, "0");
        }
        for (i, factor) in self.factors.iter().enumerate() {
            if i > 0 {
                write!(f, " * ")?;
            }
            write!(f, "{}", factor.prime)?;
            if factor.multiplicity > 1 {
                write!(f, "**{}", factor.multiplicity)?;
            }
        }
        Ok(())
    }
}

/// 試し割りの次の候補: 3 → 5 → 7 → 11 → 13 → 17 → ...
#[inline]
fn next_trial<U: FactorInt>(candidate: U, wide_step: &mut bool) -> U {
    if candidate < U::from(5u32) {
        return candidate + U::from(2u32);
    }
    let step = if *wide_step { 4u32 } else { 2u32 };
    *wide_step = !*wide_step;
    candidate + U::from(step)
}

/// n を素因数分解する。
///
/// 失敗するのは因数が減少した場合（内部整合性エラー）だけ。
pub fn factorize<U: FactorInt>(n: U) -> Result<Factorization<U>> {
    let mut result = Factorization::empty();
    if n.is_zero() {
        return Ok(result);
    }
    if n.is_one() {
        result.factors.push(PrimeFactor { prime: U::one(), multiplicity: 1 });
        return Ok(result);
    }

    let two = U::from(2u32);
    let mut n = n;
    while n.is_even() {
        result.push(two.clone())?;
        n = n.div_floor(&two);
    }
    if n.is_one() {
        return Ok(result);
    }

    let mut candidate = U::from(3u32);
    let mut limit = n.sqrt();
    let mut wide_step = false;
    while candidate <= limit {
        let (quotient, remainder) = n.div_rem(&candidate);
        if remainder.is_zero() {
            n = quotient;
            limit = n.sqrt();
            result.push(candidate.clone())?;
        } else {
            candidate = next_trial(candidate, &mut wide_step);
        }
    }

    // 残った余因数は素数
    if !n.is_one() {
        result.push(n)?;
    }
    Ok(result)
}
