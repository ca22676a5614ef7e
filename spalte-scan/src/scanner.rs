//! Dispatching fields to per-column scanners.
use std::mem;

use spalte::{Char, Column, Error, ErrorKind, Flow, Handler, Result};
use tracing::debug;
use zwohash::HashMap;

/// Consumes the fields of one column.
pub trait FieldScanner<C: Char> {
    /// Called with the complete contents of the column's field in a data record.
    fn field_value(&mut self, field: &[C]) -> Result<()>;

    /// Called when a data record has no field for the column at `index`.
    fn field_skipped(&mut self, index: usize) -> Result<()> {
        Err(Error::new(ErrorKind::FieldNotFound {
            column: Column::Index(index),
        }))
    }
}

impl<C: Char, S: FieldScanner<C> + ?Sized> FieldScanner<C> for &mut S {
    fn field_value(&mut self, field: &[C]) -> Result<()> {
        (**self).field_value(field)
    }

    fn field_skipped(&mut self, index: usize) -> Result<()> {
        (**self).field_skipped(index)
    }
}

impl<C: Char, S: FieldScanner<C> + ?Sized> FieldScanner<C> for Box<S> {
    fn field_value(&mut self, field: &[C]) -> Result<()> {
        (**self).field_value(field)
    }

    fn field_skipped(&mut self, index: usize) -> Result<()> {
        (**self).field_skipped(index)
    }
}

/// A [`FieldScanner`] calling a closure, created by [`scan_fn`].
///
/// Missing columns are reported as errors.
pub struct FnScanner<F>(F);

/// Creates a scanner that passes every field to `f`.
pub fn scan_fn<C: Char, F: FnMut(&[C]) -> Result<()>>(f: F) -> FnScanner<F> {
    FnScanner(f)
}

impl<C: Char, F: FnMut(&[C]) -> Result<()>> FieldScanner<C> for FnScanner<F> {
    fn field_value(&mut self, field: &[C]) -> Result<()> {
        (self.0)(field)
    }
}

type BoxedScanner<'a, C> = Box<dyn FieldScanner<C> + 'a>;

type Recognizer<'a, C> = Box<dyn FnMut(&[C], &mut Binder<'_, 'a, C>) -> Result<bool> + 'a>;

/// Binds scanners to the column of the header field being recognized.
pub struct Binder<'b, 'a, C: Char> {
    scanners: &'b mut Vec<Option<BoxedScanner<'a, C>>>,
    column: usize,
}

impl<'a, C: Char> Binder<'_, 'a, C> {
    /// Returns the index of the current column.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Returns whether a scanner is bound to the current column.
    pub fn is_bound(&self) -> bool {
        matches!(self.scanners.get(self.column), Some(Some(_)))
    }

    /// Binds `scanner` to the current column, replacing any previous binding.
    pub fn bind(&mut self, scanner: impl FieldScanner<C> + 'a) {
        self.bind_boxed(Box::new(scanner))
    }

    fn bind_boxed(&mut self, scanner: BoxedScanner<'a, C>) {
        bind_at(self.scanners, self.column, scanner)
    }
}

fn bind_at<'a, C: Char>(
    scanners: &mut Vec<Option<BoxedScanner<'a, C>>>,
    column: usize,
    scanner: BoxedScanner<'a, C>,
) {
    if scanners.len() <= column {
        scanners.resize_with(column + 1, || None);
    }
    scanners[column] = Some(scanner);
}

/// Scanners to bind to the columns whose header field has a given name.
///
/// Used with [`TableScanner::with_names`]. Every name must appear in the first record; names
/// missing from it are reported as [`ErrorKind::FieldNotFound`].
pub struct NameBinder<'a, C: Char> {
    names: HashMap<Vec<C>, BoxedScanner<'a, C>>,
}

impl<'a, C: Char> Default for NameBinder<'a, C> {
    fn default() -> Self {
        Self {
            names: HashMap::default(),
        }
    }
}

impl<'a, C: Char> NameBinder<'a, C> {
    /// Creates an empty binder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `scanner` to the column named `name`.
    pub fn bind(mut self, name: &str, scanner: impl FieldScanner<C> + 'a) -> Self {
        self.names.insert(C::encode_str(name), Box::new(scanner));
        self
    }

    /// Returns the number of names not yet found.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` when all names were found.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

enum Header<'a, C: Char> {
    Recognizer {
        rows: usize,
        recognizer: Recognizer<'a, C>,
    },
    Names(NameBinder<'a, C>),
}

/// A [`Handler`] passing each field to the scanner bound to its column.
///
/// Columns are bound directly by index, or while reading header records. Fields of unbound columns
/// are skipped without being assembled. When a data record ends before a bound column, the
/// column's scanner is told via [`FieldScanner::field_skipped`].
///
/// ```
/// # use spalte::{parse_csv, Config, SliceInput};
/// # use spalte_scan::{NameBinder, TableScanner, Translator};
/// let mut ids: Vec<u32> = vec![];
/// let mut names: Vec<String> = vec![];
/// let mut scanner = TableScanner::new().with_names(
///     NameBinder::new()
///         .bind("id", Translator::new(&mut ids))
///         .bind("name", Translator::new(&mut names)),
/// );
/// parse_csv(SliceInput::from("name,id\nada,1\nbob,2\n"), &mut scanner, Config::default())?;
/// drop(scanner);
/// assert_eq!(ids, [1, 2]);
/// assert_eq!(names, ["ada", "bob"]);
/// # Ok::<(), spalte::Error>(())
/// ```
pub struct TableScanner<'a, C: Char> {
    scanners: Vec<Option<BoxedScanner<'a, C>>>,
    header: Option<Header<'a, C>>,
    record_end: Option<Box<dyn FnMut() -> Result<()> + 'a>>,
    field: Vec<C>,
    column: usize,
    header_row: bool,
    records: usize,
}

impl<'a, C: Char> Default for TableScanner<'a, C> {
    fn default() -> Self {
        Self {
            scanners: vec![],
            header: None,
            record_end: None,
            field: vec![],
            column: 0,
            header_row: false,
            records: 0,
        }
    }
}

impl<'a, C: Char> TableScanner<'a, C> {
    /// Creates a scanner without any bound columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `scanner` to the column at `index`.
    pub fn set_field_scanner(&mut self, index: usize, scanner: impl FieldScanner<C> + 'a) {
        bind_at(&mut self.scanners, index, Box::new(scanner));
    }

    /// Treats the first `rows` records as header.
    ///
    /// The recognizer is called for every header field and may bind a scanner to its column. When
    /// it returns `false`, the rest of the header is skipped and data records start after the
    /// current record.
    pub fn with_header(
        mut self,
        rows: usize,
        recognizer: impl FnMut(&[C], &mut Binder<'_, 'a, C>) -> Result<bool> + 'a,
    ) -> Self {
        self.header = (rows > 0).then(|| Header::Recognizer {
            rows,
            recognizer: Box::new(recognizer),
        });
        self
    }

    /// Treats the first record as header, binding columns by name.
    pub fn with_names(mut self, names: NameBinder<'a, C>) -> Self {
        self.header = Some(Header::Names(names));
        self
    }

    /// Calls `hook` after the fields of every data record were scanned.
    pub fn set_record_end_scanner(&mut self, hook: impl FnMut() -> Result<()> + 'a) {
        self.record_end = Some(Box::new(hook));
    }

    /// Returns the number of data records scanned.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Returns whether header records are still expected.
    pub fn in_header(&self) -> bool {
        self.header.is_some()
    }

    fn wants_field(&self) -> bool {
        if self.header_row {
            self.header.is_some()
        } else {
            matches!(self.scanners.get(self.column), Some(Some(_)))
        }
    }

    fn header_field(&mut self, field: &[C]) -> Result<()> {
        let column = self.column;
        match &mut self.header {
            Some(Header::Recognizer { recognizer, .. }) => {
                let mut binder = Binder {
                    scanners: &mut self.scanners,
                    column,
                };
                if !recognizer(field, &mut binder)? {
                    debug!(column, "header recognition finished early");
                    self.header = None;
                }
            }
            Some(Header::Names(names)) => {
                if let Some(scanner) = names.names.remove(field) {
                    bind_at(&mut self.scanners, column, scanner);
                }
            }
            None => {}
        }
        Ok(())
    }

    fn header_end(&mut self) -> Result<()> {
        match &mut self.header {
            Some(Header::Recognizer { rows, .. }) if *rows > 1 => {
                *rows -= 1;
                return Ok(());
            }
            Some(Header::Names(names)) => {
                if let Some(name) = names.names.keys().min() {
                    let name = C::decode(name).unwrap_or_else(|| C::render(name));
                    return Err(Error::new(ErrorKind::FieldNotFound {
                        column: Column::Name(name),
                    }));
                }
            }
            _ => {}
        }
        self.header = None;
        debug!(
            columns = self.scanners.iter().filter(|s| s.is_some()).count(),
            "header complete"
        );
        Ok(())
    }

    fn dispatch(&mut self, field: &[C]) -> Result<()> {
        if self.header_row {
            self.header_field(field)
        } else if let Some(Some(scanner)) = self.scanners.get_mut(self.column) {
            scanner.field_value(field)
        } else {
            Ok(())
        }
    }
}

impl<C: Char> Handler<C> for TableScanner<'_, C> {
    const ZERO_COPY: bool = true;

    fn start_record(&mut self) -> Result<Flow> {
        self.column = 0;
        self.header_row = self.header.is_some();
        Ok(Flow::Continue)
    }

    fn update(&mut self, fragment: &[C]) -> Result<Flow> {
        if self.wants_field() {
            self.field.extend_from_slice(fragment);
        }
        Ok(Flow::Continue)
    }

    fn finalize(&mut self, fragment: &[C]) -> Result<Flow> {
        if self.field.is_empty() {
            self.dispatch(fragment)?;
        } else if self.wants_field() {
            let mut field = mem::take(&mut self.field);
            field.extend_from_slice(fragment);
            let result = self.dispatch(&field);
            field.clear();
            self.field = field;
            result?;
        }
        self.column += 1;
        Ok(Flow::Continue)
    }

    fn end_record(&mut self) -> Result<Flow> {
        if self.header_row {
            if self.header.is_some() {
                self.header_end()?;
            }
            return Ok(Flow::Continue);
        }
        for (index, slot) in self.scanners.iter_mut().enumerate().skip(self.column) {
            if let Some(scanner) = slot {
                scanner.field_skipped(index)?;
            }
        }
        if let Some(hook) = &mut self.record_end {
            hook()?;
        }
        self.records += 1;
        Ok(Flow::Continue)
    }

    fn handle_error(&mut self, error: Error) -> Error {
        self.field.clear();
        error
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use assert_matches::assert_matches;
    use spalte::{parse_csv, parse_tsv, Config, LogicalPosition, PhysicalPosition, SliceInput};

    use super::*;
    use crate::{from_fn, ReplaceIf, Replacement, Translator};

    type Result<T> = std::result::Result<T, Error>;

    fn csv(text: &str, scanner: &mut TableScanner<u8>, buffer_size: usize) -> Result<()> {
        parse_csv(
            SliceInput::from(text),
            scanner,
            Config::default().buffer_size(buffer_size),
        )?;
        Ok(())
    }

    #[test]
    fn indexed_columns() -> Result<()> {
        for buffer_size in [1, 3, 64] {
            let mut small: Vec<i8> = vec![];
            let mut names: Vec<String> = vec![];
            let mut scanner = TableScanner::new();
            scanner.set_field_scanner(2, Translator::new(&mut small));
            scanner.set_field_scanner(0, Translator::new(&mut names));
            csv(
                "\"a,b\",x,-120\n\"c\"\"d\"\"\",y, 7 \n",
                &mut scanner,
                buffer_size,
            )?;
            assert_eq!(scanner.records(), 2);
            drop(scanner);
            assert_eq!(small, [-120, 7]);
            assert_eq!(names, ["a,b", "c\"d\""]);
        }
        Ok(())
    }

    #[test]
    fn substitute_above_max() -> Result<()> {
        let mut values: Vec<i8> = vec![];
        let mut scanner = TableScanner::new();
        scanner.set_field_scanner(
            0,
            Translator::new(&mut values)
                .with_replacement(ReplaceIf::new().above_max(Replacement::Substitute(42))),
        );
        csv("1\n128\n", &mut scanner, 8)?;
        drop(scanner);
        assert_eq!(values, [1, 42]);

        let mut values: Vec<i8> = vec![];
        let mut scanner = TableScanner::new();
        scanner.set_field_scanner(0, Translator::new(&mut values));
        let err = csv("1\n128\n", &mut scanner, 8).unwrap_err();
        assert_matches!(err.kind(), ErrorKind::FieldOutOfRange { .. });
        assert_eq!(err.logical_position(), Some(LogicalPosition::new(1, 0)));
        assert_eq!(err.physical_position(), Some(PhysicalPosition::new(1, 3)));
        Ok(())
    }

    #[test]
    fn missing_columns_are_skipped() -> Result<()> {
        let mut values: Vec<Option<u16>> = vec![];
        let mut scanner = TableScanner::new();
        scanner.set_field_scanner(1, Translator::new(&mut values));
        csv("a,1\nb\nc,\n", &mut scanner, 8)?;
        drop(scanner);
        assert_eq!(values, [Some(1), None, None]);

        let mut values: Vec<u16> = vec![];
        let mut scanner = TableScanner::new();
        scanner.set_field_scanner(1, Translator::new(&mut values));
        let err = csv("a,1\nb\n", &mut scanner, 8).unwrap_err();
        assert_matches!(
            err.kind(),
            ErrorKind::FieldNotFound { column: Column::Index(1) }
        );
        Ok(())
    }

    #[test]
    fn header_recognizer() -> Result<()> {
        let totals = Rc::new(RefCell::new(vec![]));
        let totals_in_header = totals.clone();
        let seen = Rc::new(RefCell::new(vec![]));
        let seen_in_header = seen.clone();
        let mut scanner = TableScanner::new().with_header(2, move |field: &[u8], binder| {
            seen_in_header.borrow_mut().push((binder.column(), field.to_vec()));
            if field == b"total" {
                let totals = totals_in_header.clone();
                binder.bind(Translator::<u8, f64, _>::new(from_fn(move |value| {
                    totals.borrow_mut().push(value);
                    Ok(())
                })));
            }
            Ok(field != b"stop")
        });
        let rows = Rc::new(RefCell::new(0));
        let rows_in_hook = rows.clone();
        scanner.set_record_end_scanner(move || {
            *rows_in_hook.borrow_mut() += 1;
            Ok(())
        });
        csv(
            "x,total\nstop,ignored\n1,2.5\n3,4\n",
            &mut scanner,
            8,
        )?;
        assert!(!scanner.in_header());
        assert_eq!(scanner.records(), 2);
        drop(scanner);
        assert_eq!(*totals.borrow(), [2.5, 4.0]);
        assert_eq!(*rows.borrow(), 2);
        assert_eq!(
            *seen.borrow(),
            [
                (0, b"x".to_vec()),
                (1, b"total".to_vec()),
                (0, b"stop".to_vec())
            ]
        );
        Ok(())
    }

    #[test]
    fn names_must_be_present() {
        let mut ids: Vec<u32> = vec![];
        let mut scanner = TableScanner::new().with_names(
            NameBinder::new()
                .bind("id", Translator::new(&mut ids))
                .bind("score", scan_fn(|_: &[u8]| Ok(()))),
        );
        let err = csv("id,name\n1,a\n", &mut scanner, 8).unwrap_err();
        assert_matches!(
            err.kind(),
            ErrorKind::FieldNotFound { column: Column::Name(name) } if name == "score"
        );
    }

    #[test]
    fn closures_and_tsv() -> Result<()> {
        let mut lengths = vec![];
        let mut scanner = TableScanner::new();
        scanner.set_field_scanner(
            1,
            scan_fn(|field: &[u8]| {
                lengths.push(field.len());
                Ok(())
            }),
        );
        parse_tsv(
            SliceInput::from("a\t\"q\"\nb\txyz\n"),
            &mut scanner,
            Config::default().buffer_size(2),
        )?;
        drop(scanner);
        assert_eq!(lengths, [3, 3]);
        Ok(())
    }
}
