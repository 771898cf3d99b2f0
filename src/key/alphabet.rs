/// Lowest alphabet symbol. Denotes digit 0.
pub const LOWEST: u8 = b'a';

/// Highest alphabet symbol. Denotes digit `RADIX - 1`.
pub const HIGHEST: u8 = b'z';

/// Number of symbols in the alphabet.
pub const RADIX: i16 = (HIGHEST - LOWEST + 1) as i16;

/// A digit during midpoint generation.
///
/// One bit wider than the alphabet so the two virtual bounds never collide
/// with a real symbol:
///
/// ```text
///   PRED   0    1   ...   25   SUCC
///    -1   'a'  'b'  ...  'z'    26
/// ```
pub(crate) type Digit = i16;

/// Virtual digit one below the lowest symbol: "no lower constraint".
pub(crate) const PRED: Digit = -1;

/// Virtual digit one above the highest symbol: "no upper constraint".
pub(crate) const SUCC: Digit = RADIX;

pub(crate) const LOW_DIGIT: Digit = 0;
pub(crate) const HIGH_DIGIT: Digit = RADIX - 1;

/// Whether a single byte is an alphabet symbol.
#[inline]
pub fn is_symbol(byte: u8) -> bool {
    (LOWEST..=HIGHEST).contains(&byte)
}

/// Well-formedness predicate for order keys.
///
/// True iff every byte is an alphabet symbol and the sequence does not end
/// with the lowest symbol. A trailing lowest symbol adds nothing to the
/// fraction's value but sorts after its own prefix, which would break the
/// equivalence between byte order and numeric order.
///
/// The empty sequence is well-formed; it stands for an absent bound.
pub fn is_well_formed(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| is_symbol(b)) && bytes.last() != Some(&LOWEST)
}

/// Digit at `index`, or `fallback` past the end.
#[inline]
pub(crate) fn digit_at(bytes: &[u8], index: usize, fallback: Digit) -> Digit {
    bytes
        .get(index)
        .map_or(fallback, |&b| Digit::from(b - LOWEST))
}

/// Symbol for a real digit. Sentinels must never reach here.
#[inline]
pub(crate) fn symbol(digit: Digit) -> u8 {
    debug_assert!(
        (LOW_DIGIT..=HIGH_DIGIT).contains(&digit),
        "sentinel digit {digit} cannot be stored"
    );
    LOWEST + digit as u8
}
