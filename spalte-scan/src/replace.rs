//! Replacement of fields that can't be converted.
use crate::Failure;

/// What to do with a field that can't be converted.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub enum Replacement<T> {
    /// Report an error.
    #[default]
    Fail,
    /// Drop the field, collecting nothing.
    Ignore,
    /// Collect the given value instead.
    Substitute(T),
}

/// A [`Replacement`] for each way converting a field can fail.
///
/// Every kind of failure defaults to [`Replacement::Fail`].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct ReplaceIf<T> {
    /// Used for empty fields. Numeric targets also treat blank fields as empty.
    pub empty: Replacement<T>,
    /// Used for fields that don't represent a value of the target type.
    pub invalid_format: Replacement<T>,
    /// Used for values above the maximum of the target type.
    pub above_max: Replacement<T>,
    /// Used for values below the minimum of the target type.
    pub below_min: Replacement<T>,
    /// Used for columns missing from a record.
    pub skipped: Replacement<T>,
}

impl<T> Default for ReplaceIf<T> {
    fn default() -> Self {
        Self {
            empty: Replacement::Fail,
            invalid_format: Replacement::Fail,
            above_max: Replacement::Fail,
            below_min: Replacement::Fail,
            skipped: Replacement::Fail,
        }
    }
}

impl<T> ReplaceIf<T> {
    /// Creates a policy that fails for everything.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    /// Sets the [`empty`][Self#structfield.empty] field.
    pub fn empty(mut self, value: Replacement<T>) -> Self {
        self.empty = value;
        self
    }

    #[inline]
    /// Sets the [`invalid_format`][Self#structfield.invalid_format] field.
    pub fn invalid_format(mut self, value: Replacement<T>) -> Self {
        self.invalid_format = value;
        self
    }

    #[inline]
    /// Sets the [`above_max`][Self#structfield.above_max] field.
    pub fn above_max(mut self, value: Replacement<T>) -> Self {
        self.above_max = value;
        self
    }

    #[inline]
    /// Sets the [`below_min`][Self#structfield.below_min] field.
    pub fn below_min(mut self, value: Replacement<T>) -> Self {
        self.below_min = value;
        self
    }

    #[inline]
    /// Sets the [`skipped`][Self#structfield.skipped] field.
    pub fn skipped(mut self, value: Replacement<T>) -> Self {
        self.skipped = value;
        self
    }

    /// Returns the replacement for a conversion failure.
    pub fn for_failure(&self, failure: Failure) -> &Replacement<T> {
        match failure {
            Failure::Empty => &self.empty,
            Failure::InvalidFormat => &self.invalid_format,
            Failure::AboveMax => &self.above_max,
            Failure::BelowMin => &self.below_min,
        }
    }
}

impl<T: Clone> ReplaceIf<T> {
    /// Substitutes `value` for every kind of failure, including missing columns.
    pub fn all(value: T) -> Self {
        Self {
            empty: Replacement::Substitute(value.clone()),
            invalid_format: Replacement::Substitute(value.clone()),
            above_max: Replacement::Substitute(value.clone()),
            below_min: Replacement::Substitute(value.clone()),
            skipped: Replacement::Substitute(value),
        }
    }
}
