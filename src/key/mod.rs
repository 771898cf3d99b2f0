pub mod alphabet;
pub mod midpoint;

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub use alphabet::{is_symbol, is_well_formed};
pub use midpoint::midpoint;

/// A position marker in a dense, totally ordered key space.
///
/// A key is a base-26 fraction written with the symbols `a`..`z`, most
/// significant digit first. Byte-wise comparison of two keys is the same
/// as numeric comparison of the fractions they denote, so the derived
/// `Ord` is the list order.
///
/// Keys are immutable. Every `OrderKey` is well-formed and non-empty: the
/// empty sequence is only meaningful as an absent bound, and the generator
/// never produces it.
///
/// ```text
///   "an" < "b" < "bn" < "c" < "n" < "u" < "zzn"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey(Vec<u8>);

impl OrderKey {
    /// Validate `bytes` as a stored key.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::invalid("empty order key"));
        }
        if !is_well_formed(&bytes) {
            return Err(Error::invalid(format!(
                "malformed order key: {:?}",
                String::from_utf8_lossy(&bytes)
            )));
        }
        Ok(OrderKey(bytes))
    }

    /// Wrap generator output, which is well-formed by construction.
    pub(crate) fn from_generated(bytes: Vec<u8>) -> Self {
        debug_assert!(!bytes.is_empty() && is_well_formed(&bytes));
        OrderKey(bytes)
    }

    /// Key for the first item of an empty collection.
    pub fn first() -> Self {
        Self::from_generated(midpoint::generate(&[], &[]))
    }

    /// A key strictly between two optional bounds. `None` leaves that side
    /// unconstrained. Fails if both are present and `lower >= upper`.
    pub fn between(lower: Option<&OrderKey>, upper: Option<&OrderKey>) -> Result<Self> {
        midpoint(
            lower.map_or(&[][..], OrderKey::as_bytes),
            upper.map_or(&[][..], OrderKey::as_bytes),
        )
    }

    /// A key sorting after `self` with no upper constraint.
    pub fn after(&self) -> Self {
        Self::from_generated(midpoint::generate(&self.0, &[]))
    }

    /// A key sorting before `self` with no lower constraint.
    pub fn before(&self) -> Self {
        Self::from_generated(midpoint::generate(&[], &self.0))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Alphabet symbols are ASCII.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Number of digits.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Keys are never empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OrderKey::new(s.as_bytes())
    }
}

impl TryFrom<&str> for OrderKey {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl TryFrom<Vec<u8>> for OrderKey {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        OrderKey::new(bytes)
    }
}

impl AsRef<[u8]> for OrderKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for OrderKey {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}
