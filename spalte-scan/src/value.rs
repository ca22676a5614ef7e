//! Converting field contents to typed values.
use std::str::FromStr;

use num_traits::{Float, FromPrimitive};
use spalte::{render_chars, Char, Error, ErrorKind, Sign};
use thiserror::Error as ThisError;

use crate::NumPunct;

/// Why a field could not be converted.
#[derive(Copy, Clone, Eq, PartialEq, Debug, ThisError)]
pub enum Failure {
    /// The field is empty, or blank for numeric targets.
    #[error("empty field")]
    Empty,
    /// The field is not a valid representation of the target type.
    #[error("invalid format")]
    InvalidFormat,
    /// The value is larger than the target type can hold.
    #[error("above the maximum")]
    AboveMax,
    /// The value is smaller than the target type can hold.
    #[error("below the minimum")]
    BelowMin,
}

impl Failure {
    /// Converts the failure into an [`Error`] for the given field and target type name.
    #[cold]
    #[inline(never)]
    pub fn into_error<C: Char>(self, field: &[C], target: &'static str) -> Error {
        let value = || render_chars(field);
        Error::new(match self {
            Failure::Empty => ErrorKind::FieldEmpty { target },
            Failure::InvalidFormat => ErrorKind::FieldInvalidFormat {
                value: value(),
                target,
            },
            Failure::AboveMax => ErrorKind::FieldOutOfRange {
                value: value(),
                target,
                sign: Sign::Positive,
            },
            Failure::BelowMin => ErrorKind::FieldOutOfRange {
                value: value(),
                target,
                sign: Sign::Negative,
            },
        })
    }
}

/// A type that can be read from the contents of a single field.
pub trait FieldValue<C: Char>: Sized {
    /// Name of the type used in error messages.
    const TYPE_NAME: &'static str;

    /// Converts the contents of a field.
    fn from_field(field: &[C], punct: &NumPunct<C>) -> Result<Self, Failure>;

    /// The value to use for a column missing from a record, if the type has one.
    fn on_skipped() -> Option<Self> {
        None
    }
}

/// Removes leading and trailing ASCII whitespace.
pub fn trim<C: Char>(field: &[C]) -> &[C] {
    let start = field
        .iter()
        .position(|c| !c.is_ascii_whitespace())
        .unwrap_or(field.len());
    let end = field
        .iter()
        .rposition(|c| !c.is_ascii_whitespace())
        .map_or(start, |index| index + 1);
    &field[start..end]
}

/// Reads an optionally signed decimal integer, returning its sign and magnitude.
///
/// Magnitudes that don't fit into a `u128` are reported as out of range.
fn integer_parts<C: Char>(field: &[C], punct: &NumPunct<C>) -> Result<(bool, u128), Failure> {
    let field = trim(field);
    if field.is_empty() {
        return Err(Failure::Empty);
    }
    let (negative, digits_at) = match field[0].to_ascii() {
        Some(b'-') => (true, 1),
        Some(b'+') => (false, 1),
        _ => (false, 0),
    };

    let mut value = 0u128;
    let mut overflow = false;
    let mut digits = 0;
    for (index, &c) in field.iter().enumerate().skip(digits_at) {
        let digit = match c.to_ascii() {
            Some(digit @ b'0'..=b'9') => digit - b'0',
            _ if punct.is_separator_at(field, index) => continue,
            _ => return Err(Failure::InvalidFormat),
        };
        digits += 1;

        let (new_value, overflowed) = value.overflowing_mul(10);
        overflow |= overflowed;
        value = new_value;

        let (new_value, overflowed) = value.overflowing_add(u128::from(digit));
        overflow |= overflowed;
        value = new_value;
    }

    if digits == 0 {
        Err(Failure::InvalidFormat)
    } else if overflow {
        Err(if negative {
            Failure::BelowMin
        } else {
            Failure::AboveMax
        })
    } else {
        Ok((negative, value))
    }
}

/// Reads a decimal integer into any primitive integer type.
pub fn integer<T: FromPrimitive, C: Char>(field: &[C], punct: &NumPunct<C>) -> Result<T, Failure> {
    let (negative, magnitude) = integer_parts(field, punct)?;
    if negative {
        if magnitude > i128::MIN.unsigned_abs() {
            return Err(Failure::BelowMin);
        }
        // `i128::MIN` negates to itself, which is the intended value
        T::from_i128((magnitude as i128).wrapping_neg()).ok_or(Failure::BelowMin)
    } else {
        T::from_u128(magnitude).ok_or(Failure::AboveMax)
    }
}

/// Reads a floating point number.
///
/// The decimal point and thousands separator of `punct` are mapped to the classic notation before
/// parsing. Finite text that rounds to an infinite value is reported as out of range.
pub fn float<T: Float + FromStr, C: Char>(field: &[C], punct: &NumPunct<C>) -> Result<T, Failure> {
    let field = trim(field);
    if field.is_empty() {
        return Err(Failure::Empty);
    }
    let mut text = String::with_capacity(field.len());
    for (index, &c) in field.iter().enumerate() {
        if c == punct.decimal_point {
            text.push('.');
        } else if punct.is_separator_at(field, index) {
            continue;
        } else {
            match c.to_ascii() {
                Some(b'.') => return Err(Failure::InvalidFormat),
                Some(byte) => text.push(byte as char),
                None => return Err(Failure::InvalidFormat),
            }
        }
    }

    let value: T = text.parse().map_err(|_| Failure::InvalidFormat)?;
    if value.is_infinite() && !text.to_ascii_lowercase().contains("inf") {
        return Err(if value.is_sign_negative() {
            Failure::BelowMin
        } else {
            Failure::AboveMax
        });
    }
    Ok(value)
}

macro_rules! integer_field_value {
    ($($t:ty),*) => {
        $(
            impl<C: Char> FieldValue<C> for $t {
                const TYPE_NAME: &'static str = stringify!($t);

                #[inline]
                fn from_field(field: &[C], punct: &NumPunct<C>) -> Result<Self, Failure> {
                    integer(field, punct)
                }
            }
        )*
    };
}

integer_field_value!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl<C: Char> FieldValue<C> for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_field(field: &[C], punct: &NumPunct<C>) -> Result<Self, Failure> {
        float(field, punct)
    }
}

impl<C: Char> FieldValue<C> for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_field(field: &[C], punct: &NumPunct<C>) -> Result<Self, Failure> {
        float(field, punct)
    }
}

impl<C: Char> FieldValue<C> for String {
    const TYPE_NAME: &'static str = "string";

    fn from_field(field: &[C], _punct: &NumPunct<C>) -> Result<Self, Failure> {
        C::decode(field).ok_or(Failure::InvalidFormat)
    }
}

impl<C: Char> FieldValue<C> for Vec<C> {
    const TYPE_NAME: &'static str = "text";

    fn from_field(field: &[C], _punct: &NumPunct<C>) -> Result<Self, Failure> {
        Ok(field.to_vec())
    }
}

/// Empty fields and missing columns read as `None`.
///
/// For numeric targets a field of only whitespace counts as empty, text targets keep it.
impl<C: Char, T: FieldValue<C>> FieldValue<C> for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_field(field: &[C], punct: &NumPunct<C>) -> Result<Self, Failure> {
        if field.is_empty() {
            return Ok(None);
        }
        match T::from_field(field, punct) {
            Err(Failure::Empty) => Ok(None),
            result => result.map(Some),
        }
    }

    fn on_skipped() -> Option<Self> {
        Some(None)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn classic<T: FieldValue<u8>>(text: &str) -> Result<T, Failure> {
        T::from_field(text.as_bytes(), &NumPunct::classic())
    }

    #[test]
    fn narrow_integers() {
        assert_eq!(classic::<i8>("-120"), Ok(-120));
        assert_eq!(classic::<i8>(" 127 "), Ok(127));
        assert_eq!(classic::<i8>("-128"), Ok(-128));
        assert_eq!(classic::<i8>("128"), Err(Failure::AboveMax));
        assert_eq!(classic::<i8>("-129"), Err(Failure::BelowMin));
        assert_eq!(classic::<u8>("-1"), Err(Failure::BelowMin));
        assert_eq!(classic::<u8>("-0"), Ok(0));
        assert_eq!(classic::<u8>("+7"), Ok(7));
    }

    #[test]
    fn wide_integers() {
        assert_eq!(
            classic::<i128>("-170141183460469231731687303715884105728"),
            Ok(i128::MIN)
        );
        assert_eq!(
            classic::<u128>("340282366920938463463374607431768211455"),
            Ok(u128::MAX)
        );
        assert_eq!(
            classic::<u128>("340282366920938463463374607431768211456"),
            Err(Failure::AboveMax)
        );
        assert_eq!(
            classic::<i128>("-999999999999999999999999999999999999999999"),
            Err(Failure::BelowMin)
        );
    }

    #[test]
    fn integer_formats() {
        assert_eq!(classic::<u32>(""), Err(Failure::Empty));
        assert_eq!(classic::<u32>("  "), Err(Failure::Empty));
        assert_eq!(classic::<u32>("-"), Err(Failure::InvalidFormat));
        assert_eq!(classic::<u32>("1 2"), Err(Failure::InvalidFormat));
        assert_eq!(classic::<u32>("0x10"), Err(Failure::InvalidFormat));
        assert_eq!(classic::<u32>("1,000"), Err(Failure::InvalidFormat));

        let punct = NumPunct::new(b',', Some(b'.'));
        assert_eq!(u32::from_field(&b"1.000.000"[..], &punct), Ok(1_000_000));
        assert_eq!(u32::from_field(&b"1..000"[..], &punct), Err(Failure::InvalidFormat));
    }

    #[test]
    fn floats() {
        assert_eq!(classic::<f64>(" 1.5 "), Ok(1.5));
        assert_eq!(classic::<f64>("-2e3"), Ok(-2000.0));
        assert_eq!(classic::<f32>("1e39"), Err(Failure::AboveMax));
        assert_eq!(classic::<f64>("-1e400"), Err(Failure::BelowMin));
        assert_eq!(classic::<f64>("inf"), Ok(f64::INFINITY));
        assert_eq!(classic::<f64>("1.2.3"), Err(Failure::InvalidFormat));
        assert_eq!(classic::<f64>(""), Err(Failure::Empty));

        let punct = NumPunct::new(b',', Some(b' '));
        assert_eq!(f64::from_field(&b"1 234,5"[..], &punct), Ok(1234.5));
        assert_eq!(f64::from_field(&b"1.5"[..], &punct), Err(Failure::InvalidFormat));
    }

    #[test]
    fn strings_and_options() {
        assert_eq!(classic::<String>(" a b "), Ok(" a b ".to_owned()));
        assert_eq!(classic::<String>(""), Ok(String::new()));
        assert_eq!(
            String::from_field(&[0xffu8][..], &NumPunct::classic()),
            Err(Failure::InvalidFormat)
        );
        assert_eq!(classic::<Option<i32>>(""), Ok(None));
        assert_eq!(classic::<Option<i32>>("3"), Ok(Some(3)));
        assert_eq!(classic::<Option<i32>>("  "), Ok(None));
        assert_eq!(classic::<Option<f64>>(" \t"), Ok(None));
        assert_eq!(classic::<Option<String>>("  "), Ok(Some("  ".to_owned())));
        assert_eq!(classic::<Option<i32>>(" x "), Err(Failure::InvalidFormat));
        assert_eq!(<Option<i32> as FieldValue<u8>>::on_skipped(), Some(None));
        assert_eq!(<i32 as FieldValue<u8>>::on_skipped(), None);

        let wide = u16::encode_str("-42");
        assert_eq!(i16::from_field(&wide[..], &NumPunct::classic()), Ok(-42));
    }

    #[test]
    fn failure_errors() {
        let err = Failure::AboveMax.into_error(&b"128"[..], "i8");
        assert_matches!(
            err.kind(),
            ErrorKind::FieldOutOfRange { sign: Sign::Positive, target: "i8", .. }
        );
        assert_matches!(
            Failure::Empty.into_error(&b""[..], "u8").kind(),
            ErrorKind::FieldEmpty { target: "u8" }
        );
        assert_eq!(Failure::BelowMin.to_string(), "below the minimum");
    }
}
