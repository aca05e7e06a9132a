use thiserror::Error;

/// 探索エンジン全体のエラー型。
///
/// 入力検証エラーと内部整合性エラー（`FactorOrder`）を区別する。
/// 「最大長でない」という判定結果はエラーではなく [`crate::Verdict`] で返す。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid order {0}: order must be >= 1")]
    InvalidOrder(usize),
    #[error("order {order} exceeds backend capacity of {capacity} bits")]
    OrderExceedsCapacity { order: usize, capacity: usize },
    #[error("bit index {index} out of range for order {order}")]
    BitIndexOutOfRange { index: usize, order: usize },
    #[error("leading tap (bit {0}) cannot be cleared")]
    LeadingTapCleared(usize),
    #[error("bit pattern has {bits} significant bits, wider than order {order}")]
    ValueTooWide { order: usize, bits: usize },
    #[error("bit string of length {len} does not fit in {capacity} bits")]
    BitStringTooLong { len: usize, capacity: usize },
    #[error("invalid bit string: {0:?}")]
    InvalidBitString(String),
    #[error("polynomial value is zero")]
    ZeroPolynomial,
    #[error("cannot parse unsigned integer: {0:?}")]
    InvalidNumber(String),
    #[error("order mismatch: expected {expected}, found {found}")]
    OrderMismatch { expected: usize, found: usize },
    #[error("invalid brute-force window: shift_up={shift_up}, num_bits={num_bits}, order={order} (need 1 <= num_bits <= 63 and shift_up + num_bits < order)")]
    InvalidWindow { shift_up: usize, num_bits: usize, order: usize },
    #[error("cannot split order {order} into 2^{segments_log2} segments")]
    InvalidSegments { order: usize, segments_log2: u32 },
    #[error("internal error: prime factors decreased from {previous} to {next}")]
    FactorOrder { previous: String, next: String },
}

impl Error {
    /// 内部整合性エラー（アルゴリズムのバグ）なら true
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::FactorOrder { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
