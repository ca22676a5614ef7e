//! Converting fields of a column and collecting the values.
use spalte::{Char, Column, Error, ErrorKind, Result};
use tracing::trace;

use crate::{Collect, FieldScanner, FieldValue, NumPunct, ReplaceIf, Replacement};

/// Converts every field of a column to `T` and stores the values in a collector.
///
/// Fields that can't be converted are handled according to a [`ReplaceIf`] policy, which by default
/// fails for everything. Types with a natural value for missing columns, like `Option<T>`, use that
/// value unless the policy says otherwise.
///
/// ```
/// # use spalte_scan::{ReplaceIf, Replacement, Translator, FieldScanner};
/// let mut values: Vec<i8> = vec![];
/// let mut translator = Translator::new(&mut values)
///     .with_replacement(ReplaceIf::new().above_max(Replacement::Substitute(42)));
/// translator.field_value(&b"-120"[..])?;
/// translator.field_value(&b"128"[..])?;
/// assert_eq!(values, [-120, 42]);
/// # Ok::<(), spalte::Error>(())
/// ```
pub struct Translator<C, T, K> {
    collector: K,
    punct: NumPunct<C>,
    replace: ReplaceIf<T>,
}

impl<C: Char, T, K: Collect<T>> Translator<C, T, K> {
    /// Creates a translator using the classic locale and failing on every conversion error.
    pub fn new(collector: K) -> Self {
        Self {
            collector,
            punct: NumPunct::classic(),
            replace: ReplaceIf::default(),
        }
    }

    /// Uses the given numeric punctuation.
    pub fn with_locale(mut self, punct: NumPunct<C>) -> Self {
        self.punct = punct;
        self
    }

    /// Uses the given replacement policy.
    pub fn with_replacement(mut self, replace: ReplaceIf<T>) -> Self {
        self.replace = replace;
        self
    }

    /// Returns a reference to the collector.
    pub fn get_ref(&self) -> &K {
        &self.collector
    }

    /// Returns the collector.
    pub fn into_inner(self) -> K {
        self.collector
    }
}

impl<C, T, K> FieldScanner<C> for Translator<C, T, K>
where
    C: Char,
    T: FieldValue<C> + Clone,
    K: Collect<T>,
{
    fn field_value(&mut self, field: &[C]) -> Result<()> {
        let failure = match T::from_field(field, &self.punct) {
            Ok(value) => return self.collector.put(value),
            Err(failure) => failure,
        };
        match self.replace.for_failure(failure) {
            Replacement::Fail => Err(failure.into_error(field, T::TYPE_NAME)),
            Replacement::Ignore => {
                trace!(%failure, target = T::TYPE_NAME, "ignored field");
                Ok(())
            }
            Replacement::Substitute(value) => {
                trace!(%failure, target = T::TYPE_NAME, "substituted field");
                self.collector.put(value.clone())
            }
        }
    }

    fn field_skipped(&mut self, index: usize) -> Result<()> {
        match &self.replace.skipped {
            Replacement::Substitute(value) => self.collector.put(value.clone()),
            Replacement::Ignore => Ok(()),
            Replacement::Fail => match T::on_skipped() {
                Some(value) => self.collector.put(value),
                None => Err(Error::new(ErrorKind::FieldNotFound {
                    column: Column::Index(index),
                })),
            },
        }
    }
}
