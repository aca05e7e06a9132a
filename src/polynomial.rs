use std::cmp::Ordering;
use std::fmt;

use rand::Rng;

use crate::bits::{BitVector, FactorInt};
use crate::error::{Error, Result};

/// 中央に関する対称性の分類（[`Polynomial::is_asymmetric`] の戻り値）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum Symmetry {
    /// 最初の不一致で下位側のビットが立っている
    LowHeavy = -1,
    Symmetric = 0,
    /// 最初の不一致で上位側のビットが立っている
    HighHeavy = 1,
}

impl Symmetry {
    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

/// LFSR のタップ多項式。
///
/// ビット i が立っていればレジスタ段 i+1 にタップがある。
/// 最上位ビット (order-1) は常に 1（暗黙の先頭タップ）で、
/// すべての構築経路と `set` でこれを保証する。
#[derive(Debug, Clone, Eq)]
pub struct Polynomial<B: BitVector> {
    bits: B,
    order: usize,
}

impl<B: BitVector> PartialEq for Polynomial<B> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<B: BitVector> PartialOrd for Polynomial<B> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<B: BitVector> Ord for Polynomial<B> {
    fn cmp(&self, other: &Self) -> Ordering {
        // 1. 次数が小さい方が先
        match self.order.cmp(&other.order) {
            Ordering::Equal => {}
            ord => return ord,
        }
        // 2. 最上位ビットから順に、最初に異なるビットで決定
        for i in (0..self.order).rev() {
            let a = self.bits.test_bit(i);
            let b = other.bits.test_bit(i);
            if a != b {
                return if a { Ordering::Greater } else { Ordering::Less };
            }
        }
        Ordering::Equal
    }
}

impl<B: BitVector> Polynomial<B> {
    fn check_order(order: usize) -> Result<()> {
        if order == 0 {
            return Err(Error::InvalidOrder(order));
        }
        match B::CAPACITY {
            Some(capacity) if order > capacity => {
                Err(Error::OrderExceedsCapacity { order, capacity })
            }
            _ => Ok(()),
        }
    }

    /// 先頭タップのみの多項式（次数検証済みの呼び出し元用）
    pub(crate) fn leading_only(order: usize) -> Self {
        let mut bits = B::zeroed(order);
        bits.assign_bit(order - 1, true);
        Polynomial { bits, order }
    }

    /// 先頭タップ + 指定ビット（ビット位置は order-1 未満であること）
    pub(crate) fn with_taps(order: usize, taps: impl IntoIterator<Item = usize>) -> Self {
        let mut poly = Self::leading_only(order);
        for i in taps {
            debug_assert!(i < order);
            poly.bits.assign_bit(i, true);
        }
        poly
    }

    /// 次数 order の標準多項式（先頭タップのみ）
    pub fn new(order: usize) -> Result<Self> {
        Self::check_order(order)?;
        Ok(Self::leading_only(order))
    }

    /// 次数とビットパターンから構築。先頭タップは強制的に立てる。
    /// order 以上のビットが立っていればエラー（切り詰めはしない）。
    pub fn from_bits(order: usize, bits: B) -> Result<Self> {
        Self::check_order(order)?;
        let used = bits.significant_bits();
        if used > order {
            return Err(Error::ValueTooWide { order, bits: used });
        }
        let mut bits = bits;
        bits.assign_bit(order - 1, true);
        Ok(Polynomial { bits, order })
    }

    /// '0'/'1' のビット文字列（MSB first）から構築。次数は最上位の 1 から決まる。
    pub fn from_bit_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|c| c == b'0' || c == b'1') {
            return Err(Error::InvalidBitString(s.to_string()));
        }
        let len = s.len();
        if let Some(capacity) = B::CAPACITY {
            if len > capacity {
                return Err(Error::BitStringTooLong { len, capacity });
            }
        }
        let mut bits = B::zeroed(len);
        for (pos, c) in s.bytes().enumerate() {
            if c == b'1' {
                bits.assign_bit(len - 1 - pos, true);
            }
        }
        let order = bits.significant_bits();
        if order == 0 {
            return Err(Error::ZeroPolynomial);
        }
        Ok(Polynomial { bits, order })
    }

    /// 整数値から構築。次数は最上位の 1 ビットから決まる。
    pub fn from_uint(value: &B::Uint) -> Result<Self> {
        let order = value.bit_len();
        if order == 0 {
            return Err(Error::ZeroPolynomial);
        }
        Self::check_order(order)?;
        Ok(Polynomial {
            bits: B::from_uint(value, order),
            order,
        })
    }

    /// 乱数多項式（先頭タップ以外は一様ランダム）
    pub fn random<R: Rng + ?Sized>(order: usize, rng: &mut R) -> Result<Self> {
        let mut poly = Self::new(order)?;
        poly.set_random(rng);
        Ok(poly)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn bits(&self) -> &B {
        &self.bits
    }

    pub fn into_bits(self) -> B {
        self.bits
    }

    pub fn to_uint(&self) -> B::Uint {
        self.bits.to_uint()
    }

    pub fn get(&self, index: usize) -> Result<bool> {
        if index >= self.order {
            return Err(Error::BitIndexOutOfRange { index, order: self.order });
        }
        Ok(self.bits.test_bit(index))
    }

    /// ビット index を設定する。先頭タップを 0 にすることはできない。
    pub fn set(&mut self, index: usize, value: bool) -> Result<()> {
        if index >= self.order {
            return Err(Error::BitIndexOutOfRange { index, order: self.order });
        }
        if index == self.order - 1 && !value {
            return Err(Error::LeadingTapCleared(index));
        }
        self.bits.assign_bit(index, value);
        Ok(())
    }

    /// 立っているビット数（先頭タップを含む）
    pub fn num_bits_set(&self) -> usize {
        self.bits.popcount()
    }

    /// bit(i-1) と bit(order-i-1) を i=1..order/2 について比較する。
    /// 先頭ビット order-1 は比較対象にならない。
    pub fn is_asymmetric(&self) -> Symmetry {
        let n = self.order;
        for i in 1..=n / 2 {
            let lo = self.bits.test_bit(i - 1);
            let hi = self.bits.test_bit(n - i - 1);
            if lo != hi {
                return if lo { Symmetry::LowHeavy } else { Symmetry::HighHeavy };
            }
        }
        Symmetry::Symmetric
    }

    /// 対称双対（相反多項式）: bit(i-1) と bit(order-i-1) を入れ替える
    pub fn symmetric_dual(&self) -> Self {
        let n = self.order;
        let mut result = Self::leading_only(n);
        for i in 1..=n / 2 {
            result.bits.assign_bit(i - 1, self.bits.test_bit(n - i - 1));
            result.bits.assign_bit(n - i - 1, self.bits.test_bit(i - 1));
        }
        result
    }

    /// 先頭タップを立て、残りを rng で独立に決める
    pub fn set_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut bits = B::zeroed(self.order);
        bits.assign_bit(self.order - 1, true);
        for i in 0..self.order - 1 {
            if rng.gen::<bool>() {
                bits.assign_bit(i, true);
            }
        }
        self.bits = bits;
    }

    /// 全ビットを立てる（この次数で数値的に最大）
    pub fn set_max(&mut self) {
        for i in 0..self.order {
            self.bits.assign_bit(i, true);
        }
    }

    /// 次の候補へ進める。
    ///
    /// ビット 0..order-2 を2進カウンタとしてインクリメントし、
    /// 先頭タップを含む重みが偶数になる値で止まる。
    /// カウンタが桁あふれすると下位ビットは全て 0 になり、
    /// [`is_end_candidate`](Self::is_end_candidate) が true を返す。
    pub fn next_candidate(&mut self) -> &Self {
        let counter_bits = self.order - 1;
        loop {
            let mut i = 0;
            while i < counter_bits && self.bits.test_bit(i) {
                self.bits.assign_bit(i, false);
                i += 1;
            }
            if i == counter_bits {
                // 桁あふれ: 終端
                return self;
            }
            self.bits.assign_bit(i, true);
            if self.bits.popcount() % 2 == 0 {
                return self;
            }
        }
    }

    /// 先頭タップ以外が全て 0 なら true
    pub fn is_end_candidate(&self) -> bool {
        self.bits.popcount() == 1
    }

    /// タップ位置（1始まりのレジスタ段番号、昇順）
    pub fn taps(&self) -> Vec<usize> {
        (0..self.order)
            .filter(|&i| self.bits.test_bit(i))
            .map(|i| i + 1)
            .collect()
    }

    /// "0,1,4" 形式のタップ列（定数項 0 を先頭に付ける）
    pub fn tap_list(&self) -> String {
        let mut s = String::from("0");
        for t in self.taps() {
            s.push(',');
            s.push_str(&t.to_string());
        }
        s
    }
}

impl<B: BitVector> fmt::LowerHex for Polynomial<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.to_uint(), f)
    }
}

/// 16進表記（接頭辞なし）
impl<B: BitVector> fmt::Display for Polynomial<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.to_uint())
    }
}
