use tracing::trace;

use crate::error::{Error, Result};
use crate::key::OrderKey;
use crate::key::alphabet::{
    Digit, HIGH_DIGIT, HIGHEST, LOW_DIGIT, LOWEST, PRED, SUCC, digit_at, is_well_formed, symbol,
};

/// Generate a key strictly between `lower` and `upper`.
///
/// An empty slice means "no bound" on that side. Both bounds must be
/// well-formed and, when both are present, `lower < upper`; anything else
/// fails with [`Error::InvalidArgument`].
///
/// The result is well-formed, never empty, and depends only on the two
/// arguments.
pub fn midpoint(lower: &[u8], upper: &[u8]) -> Result<OrderKey> {
    if !is_well_formed(lower) || !is_well_formed(upper) {
        return Err(Error::invalid("invalid byte value(s) in bound"));
    }
    if !upper.is_empty() && lower >= upper {
        return Err(Error::invalid("lower bound is not less than upper bound"));
    }
    Ok(OrderKey::from_generated(generate(lower, upper)))
}

/// The generator proper. Callers have checked both bounds.
///
/// Works digit by digit over the base-26 fraction model. `p` and `n` are
/// the lower and upper digits at the current precision, or PRED/SUCC once
/// a bound runs out.
pub(crate) fn generate(lower: &[u8], upper: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(lower.len().max(upper.len()) + 2);

    // Shared prefix. Terminates because PRED != SUCC.
    let mut i = 0;
    let (mut p, mut n) = loop {
        let p = digit_at(lower, i, PRED);
        let n = digit_at(upper, i, SUCC);
        if p != n {
            break (p, n);
        }
        out.push(symbol(p));
        i += 1;
    };

    if p == PRED {
        // Lower is exhausted: `out` equals lower. Copy upper's run of
        // lowest symbols, since anything shorter would sort above upper.
        while n == LOW_DIGIT {
            out.push(LOWEST);
            i += 1;
            n = digit_at(upper, i, SUCC);
        }
        // Upper continues with the second-lowest symbol: the only digit
        // below it is the lowest, which may not end a key. Take it and
        // open a fresh digit below.
        if n == LOW_DIGIT + 1 {
            out.push(LOWEST);
            n = SUCC;
        }
    } else if p + 1 == n {
        // Adjacent digits leave no room at this precision. Keep lower's
        // digit and go one deeper, where upper no longer constrains.
        out.push(symbol(p));
        n = SUCC;
        loop {
            i += 1;
            p = digit_at(lower, i, PRED);
            if p != HIGH_DIGIT {
                break;
            }
            out.push(HIGHEST);
        }
    }

    out.push(symbol(final_digit(p, n)));
    trace!(
        lower = %String::from_utf8_lossy(lower),
        upper = %String::from_utf8_lossy(upper),
        key = %String::from_utf8_lossy(&out),
        "generated order key"
    );
    out
}

/// Digit nearest the middle of the open interval (p, n), biased upward.
#[inline]
fn final_digit(p: Digit, n: Digit) -> Digit {
    debug_assert!(n - p >= 2, "no gap between {p} and {n}");
    n - (n - p) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mid(lower: &str, upper: &str) -> String {
        midpoint(lower.as_bytes(), upper.as_bytes())
            .unwrap()
            .to_string()
    }

    #[test]
    fn unbounded() {
        assert_eq!(mid("", ""), "n");
    }

    #[test]
    fn open_below_and_above() {
        assert_eq!(mid("", "n"), "g");
        assert_eq!(mid("n", ""), "u");
    }

    #[test]
    fn general_gap() {
        assert_eq!(mid("b", "d"), "c");
        assert_eq!(mid("abcde", "abchi"), "abcf");
        assert_eq!(mid("abc", "abchi"), "abcd");
    }

    #[test]
    fn adjacent_digits() {
        assert_eq!(mid("b", "c"), "bn");
        assert_eq!(mid("abhs", "abit"), "abhw");
        assert_eq!(mid("abh", "abit"), "abhn");
    }

    #[test]
    fn adjacent_digits_copy_highest_run() {
        assert_eq!(mid("abhz", "abit"), "abhzn");
        assert_eq!(mid("abhzs", "abit"), "abhzw");
        assert_eq!(mid("abhzz", "abit"), "abhzzn");
    }

    #[test]
    fn lower_is_prefix_of_upper() {
        assert_eq!(mid("abc", "abcah"), "abcad");
        assert_eq!(mid("abc", "abcab"), "abcaan");
        assert_eq!(mid("abc", "abcaah"), "abcaad");
        assert_eq!(mid("abc", "abcb"), "abcan");
    }

    #[test]
    fn final_digit_never_lowest() {
        assert_eq!(final_digit(PRED, 2), 1);
        assert_eq!(final_digit(PRED, SUCC), 13);
        assert_eq!(final_digit(24, SUCC), 25);
        assert_eq!(final_digit(0, 2), 1);
    }

    #[test]
    fn rejects_malformed_and_unordered() {
        assert!(midpoint(b"c", b"b").unwrap_err().is_invalid_argument());
        assert!(midpoint(b"b", b"b").unwrap_err().is_invalid_argument());
        assert!(midpoint(b"ba", b"").unwrap_err().is_invalid_argument());
        assert!(midpoint(b"", b"B").unwrap_err().is_invalid_argument());
    }
}
