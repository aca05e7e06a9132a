//! 最大長 LFSR 多項式の探索と判定
//!
//! 次数 n の多項式の遷移行列を GF(2) 上で2乗・合成し、
//! 周期がちょうど 2^n-1 になるもの（原始多項式）だけを受理する。
//! 2^n-1 の素因数分解は次数ごとに1回だけ行い、
//! 各素因数 p について (2^n-1)/p 回シフトで単位行列に戻らないことを確認する。
//!
//! 格納型は [`BitVector`] で抽象化しており、u64 / u128 / BigUint を選べる。

pub mod bits;
pub mod error;
pub mod factor;
pub mod matrix;
pub mod parallel;
pub mod parse;
pub mod polynomial;
pub mod search;
pub mod tester;

pub use bits::{BitVector, FactorInt};
pub use error::{Error, Result};
pub use factor::{factorize, Factorization, PrimeFactor};
pub use matrix::TransitionMatrix;
pub use parallel::{search_segments, search_segments_cancellable, SegmentedSearch};
pub use parse::{parse_polynomial, parse_uint};
pub use polynomial::{Polynomial, Symmetry};
pub use search::{CandidateEnumerator, Random, SearchOptions, SearchStats, Sequential, TwoTap, Windowed};
pub use tester::{MaximalityTester, Verdict};
