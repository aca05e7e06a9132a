//! GF(2) 上の遷移行列。
//!
//! order×order のビット行列を行ごとに [`BitVector`] で持つ。
//! 行 i の列 c はビット (order-1-c) に対応する。
//!
//! 1シフト行列（`single_shift`）は
//!   行 i (i < order-1) : 列 i+1 に 1（上副対角）
//!   行 order-1         : 列 0 に 1（先頭タップ）
//!   タップビット i     : 行 i の列 0 に 1
//! で、合成は GF(2) 上の行列積（加算は XOR、乗算は AND）。
//! N 回シフトは2乗と掛け算の反復（バイナリ法）で O(order³ log N)。

use crate::bits::BitVector;
use crate::polynomial::Polynomial;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionMatrix<B: BitVector> {
    rows: Vec<B>,
}

impl<B: BitVector> TransitionMatrix<B> {
    /// 多項式 1 ステップ分のシフト行列
    pub fn single_shift(poly: &Polynomial<B>) -> Self {
        let n = poly.order();
        let mut rows: Vec<B> = (0..n).map(|_| B::zeroed(n)).collect();
        for (i, row) in rows.iter_mut().enumerate().take(n - 1) {
            row.assign_bit(n - 2 - i, true);
        }
        rows[n - 1].assign_bit(n - 1, true);
        for (i, row) in rows.iter_mut().enumerate() {
            if poly.bits().test_bit(i) {
                row.assign_bit(n - 1, true);
            }
        }
        TransitionMatrix { rows }
    }

    /// 単位行列（0 回シフト）
    pub fn identity(order: usize) -> Self {
        let rows = (0..order)
            .map(|i| {
                let mut row = B::zeroed(order);
                row.assign_bit(order - 1 - i, true);
                row
            })
            .collect();
        TransitionMatrix { rows }
    }

    /// 単位行列の行 0（先頭ビットのみ）
    pub fn unit_row(order: usize) -> B {
        let mut row = B::zeroed(order);
        row.assign_bit(order - 1, true);
        row
    }

    pub fn order(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, i: usize) -> &B {
        &self.rows[i]
    }

    /// 行 0。最大長判定はこの行だけを比較する
    pub fn leading_row(&self) -> &B {
        &self.rows[0]
    }

    /// result[i] = ⊕ { self[j] | other[i] のビット (order-1-j) が 1 }
    pub fn compose(&self, other: &Self) -> Self {
        let n = self.order();
        debug_assert_eq!(n, other.order());
        let rows = other
            .rows
            .iter()
            .map(|selector| {
                let mut acc = B::zeroed(n);
                for (j, row) in self.rows.iter().enumerate() {
                    if selector.test_bit(n - 1 - j) {
                        acc.xor_in(row);
                    }
                }
                acc
            })
            .collect();
        TransitionMatrix { rows }
    }

    pub fn square(&self) -> Self {
        self.compose(self)
    }

    /// poly で shift 回シフトする行列。shift = 0 なら単位行列。
    ///
    /// shift の最上位ビットの1つ下から LSB へ向かって走査し、
    /// 毎回2乗、ビットが 1 なら1シフト行列を追加で合成する。
    pub fn shift_by(poly: &Polynomial<B>, shift: &B) -> Self {
        let top = shift.significant_bits();
        if top == 0 {
            return Self::identity(poly.order());
        }
        let single = Self::single_shift(poly);
        let mut acc = single.clone();
        for i in (0..top - 1).rev() {
            acc = acc.square();
            if shift.test_bit(i) {
                acc = acc.compose(&single);
            }
        }
        acc
    }
}
