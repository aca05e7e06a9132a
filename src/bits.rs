//! ビット幅戦略の抽象化。
//!
//! 探索エンジン（多項式・遷移行列・最大長判定）はここで定義する
//! [`BitVector`] にのみ依存し、具体的な格納型は呼び出し側が選ぶ:
//!
//!   u64 / u128: 固定幅ネイティブ整数（次数 64 / 128 まで、高速）
//!   BigUint   : 任意精度（次数の上限なし）
//!
//! 各バックエンドは対応する整数型 [`FactorInt`] を持ち、
//! 2^n-1 の素因数分解とシフト回数のビットパターン化に使う。

use std::fmt::{Debug, Display, LowerHex};

use num_bigint::BigUint;
use num_integer::{Integer, Roots};
use num_traits::{One, Zero};

/// 2^n-1 の素因数分解に使う符号なし整数。
pub trait FactorInt:
    Integer + Roots + Clone + Debug + Display + LowerHex + From<u32> + Send + Sync
{
    /// 2^order - 1。型に収まらなければ None。
    fn mersenne(order: usize) -> Option<Self>;
    /// ビット i（範囲外は false）
    fn bit_at(&self, i: usize) -> bool;
    /// 最上位の 1 ビットまでの長さ（0 なら 0）
    fn bit_len(&self) -> usize;
}

/// 多項式・行列の行を格納する固定幅ビットベクトル。
///
/// ビット 0 が LSB。幅は呼び出し側（多項式の次数）が管理し、
/// 実装は `width` 以上のビットを立てないことだけを保証すればよい。
pub trait BitVector: Clone + Eq + Debug + Send + Sync {
    /// 対応する整数型
    type Uint: FactorInt;
    /// 格納可能な最大ビット数。None は上限なし
    const CAPACITY: Option<usize>;
    /// 表示用のバックエンド名
    const NAME: &'static str;

    /// 全ビット 0 のベクトル
    fn zeroed(width: usize) -> Self;
    fn test_bit(&self, i: usize) -> bool;
    fn assign_bit(&mut self, i: usize, value: bool);
    /// self ^= other
    fn xor_in(&mut self, other: &Self);
    /// ハミング重み
    fn popcount(&self) -> usize;
    /// 最上位の 1 ビットまでの長さ（全 0 なら 0）
    fn significant_bits(&self) -> usize;
    /// 整数から下位 `width` ビットを取り出す
    fn from_uint(value: &Self::Uint, width: usize) -> Self;
    fn to_uint(&self) -> Self::Uint;

    fn is_zero(&self) -> bool {
        self.significant_bits() == 0
    }

    /// 次数 `order` を格納できるか
    fn fits(order: usize) -> bool {
        Self::CAPACITY.map_or(true, |cap| order <= cap)
    }
}

macro_rules! impl_native_backend {
    ($($t:ty),*) => {$(
        impl FactorInt for $t {
            fn mersenne(order: usize) -> Option<Self> {
                let bits = <$t>::BITS as usize;
                match order {
                    0 => Some(0),
                    o if o <= bits => Some(<$t>::MAX >> (bits - o)),
                    _ => None,
                }
            }

            #[inline]
            fn bit_at(&self, i: usize) -> bool {
                i < <$t>::BITS as usize && (*self >> i) & 1 == 1
            }

            #[inline]
            fn bit_len(&self) -> usize {
                (<$t>::BITS - self.leading_zeros()) as usize
            }
        }

        impl BitVector for $t {
            type Uint = $t;
            const CAPACITY: Option<usize> = Some(<$t>::BITS as usize);
            const NAME: &'static str = stringify!($t);

            #[inline]
            fn zeroed(_width: usize) -> Self {
                0
            }

            #[inline]
            fn test_bit(&self, i: usize) -> bool {
                (*self >> i) & 1 == 1
            }

            #[inline]
            fn assign_bit(&mut self, i: usize, value: bool) {
                let mask = (1 as $t) << i;
                if value {
                    *self |= mask;
                } else {
                    *self &= !mask;
                }
            }

            #[inline]
            fn xor_in(&mut self, other: &Self) {
                *self ^= *other;
            }

            #[inline]
            fn popcount(&self) -> usize {
                <$t>::count_ones(*self) as usize
            }

            #[inline]
            fn significant_bits(&self) -> usize {
                FactorInt::bit_len(self)
            }

            fn from_uint(value: &$t, width: usize) -> Self {
                if width >= <$t>::BITS as usize {
                    *value
                } else {
                    *value & (((1 as $t) << width) - 1)
                }
            }

            fn to_uint(&self) -> $t {
                *self
            }
        }
    )*};
}

impl_native_backend!(u64, u128);

impl FactorInt for BigUint {
    fn mersenne(order: usize) -> Option<Self> {
        Some((BigUint::one() << order) - BigUint::one())
    }

    fn bit_at(&self, i: usize) -> bool {
        self.bit(i as u64)
    }

    fn bit_len(&self) -> usize {
        self.bits() as usize
    }
}

impl BitVector for BigUint {
    type Uint = BigUint;
    const CAPACITY: Option<usize> = None;
    const NAME: &'static str = "BigUint";

    fn zeroed(_width: usize) -> Self {
        BigUint::zero()
    }

    fn test_bit(&self, i: usize) -> bool {
        self.bit(i as u64)
    }

    fn assign_bit(&mut self, i: usize, value: bool) {
        self.set_bit(i as u64, value);
    }

    fn xor_in(&mut self, other: &Self) {
        *self ^= other;
    }

    fn popcount(&self) -> usize {
        self.count_ones() as usize
    }

    fn significant_bits(&self) -> usize {
        self.bits() as usize
    }

    fn from_uint(value: &BigUint, width: usize) -> Self {
        if value.bits() as usize <= width {
            value.clone()
        } else {
            let mask = (BigUint::one() << width) - BigUint::one();
            value & &mask
        }
    }

    fn to_uint(&self) -> BigUint {
        self.clone()
    }
}
