//! Typed scanning of delimited text.
//!
//! This crate builds on [`spalte`] to turn the fields of CSV and TSV input into typed values. A
//! [`TableScanner`] is a [`Handler`][spalte::Handler] that passes each field to the
//! [`FieldScanner`] bound to its column. Columns are bound by index or by recognizing header
//! records.
//!
//! The usual field scanner is a [`Translator`], which converts fields with [`FieldValue`] and puts
//! the results into a [`Collect`] implementation such as a `Vec`. Conversion failures are either
//! reported as errors carrying the position of the field, or replaced as configured with
//! [`ReplaceIf`].
#![warn(missing_docs)]
mod collect;
mod locale;
mod replace;
mod scanner;
mod translator;
mod value;

pub use collect::{from_fn, Collect, FnCollector, FrontInsert, Indexed};
pub use locale::NumPunct;
pub use replace::{ReplaceIf, Replacement};
pub use scanner::{scan_fn, Binder, FieldScanner, FnScanner, NameBinder, TableScanner};
pub use translator::Translator;
pub use value::{float, integer, trim, Failure, FieldValue};
