//! 数値文字列の解釈（0x → 16進、先頭 0 → 8進、それ以外は10進）。

use crate::bits::{BitVector, FactorInt};
use crate::error::{Error, Result};
use crate::polynomial::Polynomial;

/// 符号なし整数として解釈する。型の幅を超える値はエラー。
pub fn parse_uint<U: FactorInt>(s: &str) -> Result<U> {
    let text = s.trim();
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    // from_str_radix は先頭の '+' を受け付けるので明示的に弾く
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(Error::InvalidNumber(s.to_string()));
    }
    U::from_str_radix(digits, radix).map_err(|_| Error::InvalidNumber(s.to_string()))
}

/// 整数として解釈し、最上位ビットを次数とする多項式にする
pub fn parse_polynomial<B: BitVector>(s: &str) -> Result<Polynomial<B>> {
    let value = parse_uint::<B::Uint>(s)?;
    Polynomial::from_uint(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn test_radix_prefixes() {
        assert_eq!(parse_uint::<u64>("0x1f"), Ok(31));
        assert_eq!(parse_uint::<u64>("0XFF"), Ok(255));
        assert_eq!(parse_uint::<u64>("017"), Ok(15));
        assert_eq!(parse_uint::<u64>("17"), Ok(17));
        assert_eq!(parse_uint::<u64>("0"), Ok(0));
        assert_eq!(parse_uint::<u64>("  42 \n"), Ok(42));
    }

    #[test]
    fn test_invalid_numbers() {
        for bad in ["", "0x", "xyz", "09", "0x1g", "-1", "+5", "1 2"] {
            assert!(
                matches!(parse_uint::<u64>(bad), Err(Error::InvalidNumber(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_overflow_depends_on_backend() {
        let s = "0x1ffffffffffffffff";
        assert!(matches!(parse_uint::<u64>(s), Err(Error::InvalidNumber(_))));
        assert_eq!(parse_uint::<u128>(s), Ok((1u128 << 65) - 1));
        assert_eq!(parse_uint::<BigUint>(s).unwrap().bits(), 65);
    }

    #[test]
    fn test_parse_polynomial() {
        let p = parse_polynomial::<u64>("0x9").unwrap();
        assert_eq!(p.order(), 4);
        assert_eq!(*p.bits(), 0x9);
        let p = parse_polynomial::<u64>("0xd800000000000000").unwrap();
        assert_eq!(p.order(), 64);
        assert_eq!(parse_polynomial::<u64>("0"), Err(Error::ZeroPolynomial));
        let p = parse_polynomial::<BigUint>("0x8000000004000000000000000").unwrap();
        assert_eq!(p.order(), 100);
    }
}
