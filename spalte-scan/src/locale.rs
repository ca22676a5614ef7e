//! Numeric punctuation.
use spalte::Char;

/// The punctuation used when reading numbers.
///
/// The classic locale uses `.` as decimal point and no thousands separator.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct NumPunct<C> {
    /// Separates the integer part from the fraction of floating point numbers.
    pub decimal_point: C,
    /// Groups digits of the integer part. Only accepted between two digits.
    pub thousands_sep: Option<C>,
}

impl<C: Char> NumPunct<C> {
    /// Creates punctuation from a decimal point and an optional thousands separator.
    pub fn new(decimal_point: C, thousands_sep: Option<C>) -> Self {
        Self {
            decimal_point,
            thousands_sep,
        }
    }

    /// The classic (C locale) punctuation.
    pub fn classic() -> Self {
        Self::new(C::from_ascii(b'.'), None)
    }

    /// Returns whether `chars[index]` is a thousands separator between two digits.
    pub(crate) fn is_separator_at(&self, chars: &[C], index: usize) -> bool {
        let is_digit = |c: Option<&C>| matches!(c.and_then(|c| c.to_ascii()), Some(b'0'..=b'9'));
        Some(chars[index]) == self.thousands_sep
            && index > 0
            && is_digit(chars.get(index - 1))
            && is_digit(chars.get(index + 1))
    }
}

impl<C: Char> Default for NumPunct<C> {
    fn default() -> Self {
        Self::classic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_only_between_digits() {
        let punct = NumPunct::new(b',', Some(b'.'));
        assert!(punct.is_separator_at(b"1.000", 1));
        assert!(!punct.is_separator_at(b".000", 0));
        assert!(!punct.is_separator_at(b"1..0", 1));
        assert!(!punct.is_separator_at(b"1.", 1));
        assert!(!NumPunct::<u8>::classic().is_separator_at(b"1,0", 1));
    }
}
