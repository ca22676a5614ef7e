//! Building tables from parse events.
use std::mem;

use spalte::{render_chars, Char, Config, Error, Flow, Handler, Result};
use tracing::debug;

use crate::{StoredValue, Table};

/// A value kept inside the current parse buffer until the buffer is adopted by the store.
struct Pending {
    record: usize,
    field: usize,
    start: usize,
    len: usize,
}

/// A [`Handler`] that stores every record in a [`Table`].
///
/// The builder supplies the parse buffers itself. A field that arrives as a single fragment is
/// left where the parser put it, and when the parser releases the buffer, the buffer becomes part
/// of the table's store. Only fields spanning several fragments are copied.
pub struct TableBuilder<C: Char> {
    table: Table<C>,
    buffer_size: usize,
    spare: Vec<Box<[C]>>,
    lent: Option<(usize, usize)>,
    pending: Vec<Pending>,
    record: Vec<StoredValue>,
    scratch: Vec<C>,
    fragmented: bool,
    in_place: usize,
}

impl<C: Char> Default for TableBuilder<C> {
    fn default() -> Self {
        Self::with_table(Table::new())
    }
}

impl<C: Char> TableBuilder<C> {
    /// Creates a builder for a new table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder appending to an existing table.
    pub fn with_table(table: Table<C>) -> Self {
        Self {
            table,
            buffer_size: Config::DEFAULT_BUFFER_SIZE,
            spare: vec![],
            lent: None,
            pending: vec![],
            record: vec![],
            scratch: vec![],
            fragmented: false,
            in_place: 0,
        }
    }

    /// Sets the size of the buffers supplied to the parser.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "buffer size must be positive");
        self.buffer_size = buffer_size;
        self
    }

    /// Returns the table built so far.
    ///
    /// Values kept in the buffer of a parser that was stopped are only accessible after the parser
    /// released the buffer.
    pub fn table(&self) -> &Table<C> {
        &self.table
    }

    /// Returns the table.
    pub fn into_table(self) -> Table<C> {
        self.table
    }

    /// Returns the number of values that were stored without copying.
    pub fn values_in_place(&self) -> usize {
        self.in_place
    }

    /// Removes all records, keeping allocated buffers for the next parse.
    pub fn clear(&mut self) {
        self.table.clear();
        let reclaimed = self.table.store_mut().reclaim(self.buffer_size);
        self.spare.extend(reclaimed);
        self.in_place = 0;
    }

    /// Returns the offset of a fragment within the current parse buffer, if it lies there with room
    /// for a terminating NUL.
    ///
    /// An empty fragment points at the separator, quote or line break ending its field, which the
    /// NUL may replace.
    fn offset_in_buffer(&self, fragment: &[C]) -> Option<usize> {
        let (base, capacity) = self.lent?;
        let offset = (fragment.as_ptr() as usize).checked_sub(base)? / mem::size_of::<C>();
        (offset + fragment.len() < capacity).then_some(offset)
    }
}

impl<C: Char> Handler<C> for TableBuilder<C> {
    fn start_record(&mut self) -> Result<Flow> {
        self.record.clear();
        Ok(Flow::Continue)
    }

    fn update(&mut self, fragment: &[C]) -> Result<Flow> {
        self.scratch.extend_from_slice(fragment);
        self.fragmented = true;
        Ok(Flow::Continue)
    }

    fn finalize(&mut self, fragment: &[C]) -> Result<Flow> {
        let value = if mem::take(&mut self.fragmented) {
            self.scratch.extend_from_slice(fragment);
            let value = self.table.import(&self.scratch);
            self.scratch.clear();
            value
        } else if let Some(start) = self.offset_in_buffer(fragment) {
            self.pending.push(Pending {
                record: self.table.len(),
                field: self.record.len(),
                start,
                len: fragment.len(),
            });
            self.in_place += 1;
            StoredValue {
                buffer: usize::MAX,
                start,
                len: fragment.len(),
                capacity: fragment.len(),
            }
        } else {
            self.table.import(fragment)
        };
        self.record.push(value);
        Ok(Flow::Continue)
    }

    fn end_record(&mut self) -> Result<Flow> {
        let record = mem::take(&mut self.record);
        self.table.push_record(record);
        Ok(Flow::Continue)
    }

    fn get_buffer(&mut self) -> Option<Box<[C]>> {
        let size = self.buffer_size;
        let buffer = self
            .spare
            .pop()
            .unwrap_or_else(|| vec![C::NUL; size].into_boxed_slice());
        self.lent = Some((buffer.as_ptr() as usize, buffer.len()));
        Some(buffer)
    }

    fn release_buffer(&mut self, mut buffer: Box<[C]>) {
        self.lent = None;
        let pending = mem::take(&mut self.pending);
        if pending.is_empty() {
            self.spare.push(buffer);
            return;
        }

        let mut used = 0;
        for value in &pending {
            buffer[value.start + value.len] = C::NUL;
            used = used.max(value.start + value.len + 1);
        }
        let index = self.table.store_mut().adopt(buffer, used);
        debug!(index, values = pending.len(), used, "adopted parse buffer");

        let records = self.table.records_mut();
        for value in pending {
            let stored = match records.get_mut(value.record) {
                Some(record) => &mut record[value.field],
                None => &mut self.record[value.field],
            };
            stored.buffer = index;
        }
    }

    fn handle_error(&mut self, error: Error) -> Error {
        self.fragmented = false;
        if self.scratch.is_empty() {
            return error;
        }
        let partial = render_chars(&self.scratch);
        self.scratch.clear();
        Error::nested(format!("in field starting with {partial}"), error)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use spalte::{parse_csv, parse_tsv, ErrorKind, SliceInput};

    use super::*;

    type Result<T> = std::result::Result<T, Error>;

    fn build(text: &str, buffer_size: usize) -> Result<TableBuilder<u8>> {
        let mut builder = TableBuilder::new().with_buffer_size(buffer_size);
        parse_csv(SliceInput::from(text), &mut builder, Config::default())?;
        Ok(builder)
    }

    fn strings(table: &Table<u8>) -> Vec<Vec<String>> {
        table
            .records()
            .map(|record| record.iter().map(|value| value.to_string()).collect())
            .collect()
    }

    #[test]
    fn mixed_quoting() -> Result<()> {
        let text = ",\"col1\", col2 ,col3,\r\n\n cell10 ,,\"cell\r\n12\",\"cell\"\"13\"\"\",\"\"\n";
        for buffer_size in [1, 2, 5, 16, 4096] {
            let builder = build(text, buffer_size)?;
            let table = builder.table();
            assert_eq!(
                strings(table),
                [
                    vec!["", "col1", " col2 ", "col3", ""],
                    vec![" cell10 ", "", "cell\r\n12", "cell\"13\"", ""],
                ]
            );
            for value in table.records().flat_map(|record| record.iter().collect::<Vec<_>>()) {
                assert_eq!(value.with_nul().last(), Some(&0));
            }
        }
        Ok(())
    }

    #[test]
    fn single_fragments_stay_in_the_parse_buffer() -> Result<()> {
        let builder = build("a,bc\n\"d\"\"e\",f\n", 64)?;
        assert_eq!(builder.values_in_place(), 4);
        let table = builder.table();
        assert_eq!(table.store().buffers(), 1);
        assert_eq!(table.store().capacity(), 64);
        assert_eq!(strings(table), [vec!["a", "bc"], vec!["d\"e", "f"]]);
        Ok(())
    }

    #[test]
    fn empty_fields_stay_in_the_parse_buffer() -> Result<()> {
        let builder = build("a,,\"\"\n,b\n", 64)?;
        assert_eq!(builder.values_in_place(), 5);
        let table = builder.table();
        assert_eq!(table.store().buffers(), 1);
        assert_eq!(table.store().capacity(), 64);
        assert_eq!(strings(table), [vec!["a", "", ""], vec!["", "b"]]);
        assert!(table
            .records()
            .all(|record| record.iter().all(|value| value.with_nul().last() == Some(&0))));
        Ok(())
    }

    #[test]
    fn split_fields_are_copied() -> Result<()> {
        let builder = build("abcdef,g,h\n", 4)?;
        assert_eq!(strings(builder.table()), [vec!["abcdef", "g", "h"]]);
        assert_eq!(builder.values_in_place(), 1);
        Ok(())
    }

    #[test]
    fn clear_reuses_buffers() -> Result<()> {
        let text = "a,b\nc,d\n";
        let mut builder = build(text, 32)?;
        let first = builder.table().clone();
        builder.clear();
        assert!(builder.table().is_empty());
        parse_csv(SliceInput::from(text), &mut builder, Config::default())?;
        assert_eq!(builder.table(), &first);
        assert_eq!(builder.table().store().buffers(), 1);
        Ok(())
    }

    /// Stops after the first record.
    struct FirstRecord<'a>(&'a mut TableBuilder<u8>);

    impl Handler<u8> for FirstRecord<'_> {
        fn start_record(&mut self) -> spalte::Result<Flow> {
            self.0.start_record()
        }

        fn update(&mut self, fragment: &[u8]) -> spalte::Result<Flow> {
            self.0.update(fragment)
        }

        fn finalize(&mut self, fragment: &[u8]) -> spalte::Result<Flow> {
            self.0.finalize(fragment)
        }

        fn end_record(&mut self) -> spalte::Result<Flow> {
            self.0.end_record()?;
            Ok(Flow::Stop)
        }

        fn get_buffer(&mut self) -> Option<Box<[u8]>> {
            self.0.get_buffer()
        }

        fn release_buffer(&mut self, buffer: Box<[u8]>) {
            self.0.release_buffer(buffer)
        }
    }

    #[test]
    fn stopped_parse_keeps_values_accessible() -> Result<()> {
        let mut builder = TableBuilder::new().with_buffer_size(64);
        let result = parse_csv(
            SliceInput::from("a,b\nc,d\n"),
            FirstRecord(&mut builder),
            Config::default(),
        )?;
        assert!(!result.complete);
        assert_eq!(result.parse_point, 4);
        assert_eq!(builder.values_in_place(), 2);
        assert_eq!(strings(builder.table()), [vec!["a", "b"]]);
        assert_eq!(builder.table().store().buffers(), 1);
        Ok(())
    }

    #[test]
    fn errors_name_the_partial_field() {
        let err = build("x\n\"abc", 2).map(drop).unwrap_err();
        assert_matches!(err.kind(), ErrorKind::Nested { .. });
        assert_matches!(err.root_kind(), ErrorKind::Parse { .. });
        assert!(err.to_string().contains("\"abc\""), "{err}");
    }

    #[test]
    fn tsv_and_wide_text() -> Result<()> {
        let mut builder = TableBuilder::new().with_buffer_size(3);
        parse_tsv(SliceInput::from("AB\tD\tEF\t\n\r\n\tXYZ"), &mut builder, Config::default())?;
        assert_eq!(
            strings(builder.table()),
            [vec!["AB", "D", "EF", ""], vec!["", "XYZ"]]
        );

        let text = u16::encode_str("ä,ö\n");
        let mut builder = TableBuilder::new();
        parse_csv(SliceInput::new(&text[..]), &mut builder, Config::default())?;
        let table = builder.into_table();
        let value = table.record(0).and_then(|record| record.get(1));
        assert_eq!(value.map(|value| value.to_string()), Some("ö".to_string()));
        Ok(())
    }
}
