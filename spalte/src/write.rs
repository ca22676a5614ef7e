//! Writing delimited text.
use std::io::{self, Write};

use crate::Char;

/// The output dialect of a [`RecordWriter`].
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum Dialect {
    /// Comma separated, quoting fields as needed.
    #[default]
    Csv,
    /// Tab separated. Fields containing tabs or line breaks can't be written.
    Tsv,
}

/// Writes records of delimited text with deferred error checking.
///
/// Output is buffered and every write succeeds. IO errors, as well as TSV fields that can't be
/// represented, are reported by the next call to [`flush`][Self::flush] or
/// [`check_io_error`][Self::check_io_error]. Anything written after the first error, before it is
/// reported, is discarded.
///
/// CSV fields are quoted when they contain a separator, a quote or a line break, with quotes
/// doubled. A record consisting of a single empty field is written as `""` so that it doesn't read
/// back as an empty line. Records end with CRLF.
pub struct RecordWriter<'a> {
    write: Box<dyn Write + 'a>,
    buf: Vec<u8>,
    dialect: Dialect,
    fields_in_record: usize,
    empty_field_pending: bool,
    io_error: Option<io::Error>,
    panicked: bool,
}

impl<'a> RecordWriter<'a> {
    const CHUNK_SIZE: usize = 16 << 10;

    /// Creates a [`RecordWriter`] writing to a [`Write`] instance.
    pub fn from_write(write: impl Write + 'a, dialect: Dialect) -> Self {
        Self::from_boxed_dyn_write(Box::new(write), dialect)
    }

    /// Creates a [`RecordWriter`] writing to a boxed [`Write`] instance.
    #[inline(never)]
    pub fn from_boxed_dyn_write(write: Box<dyn Write + 'a>, dialect: Dialect) -> Self {
        Self {
            write,
            buf: Vec::with_capacity(Self::CHUNK_SIZE),
            dialect,
            fields_in_record: 0,
            empty_field_pending: false,
            io_error: None,
            panicked: false,
        }
    }

    /// Returns the dialect this writer produces.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Appends a field to the current record.
    pub fn write_field<C: Char>(&mut self, field: &[C]) {
        if self.fields_in_record > 0 {
            self.buf.push(match self.dialect {
                Dialect::Csv => b',',
                Dialect::Tsv => b'\t',
            });
        }
        self.fields_in_record += 1;
        self.empty_field_pending = field.is_empty() && self.fields_in_record == 1;

        match self.dialect {
            Dialect::Csv => {
                let needs_quotes = field
                    .iter()
                    .any(|&c| c == C::COMMA || c == C::QUOTE || c.is_line_break());
                if needs_quotes {
                    self.buf.push(b'"');
                    for run in field.split_inclusive(|&c| c == C::QUOTE) {
                        C::encode_utf8_lossy(run, &mut self.buf);
                        if run.last() == Some(&C::QUOTE) {
                            self.buf.push(b'"');
                        }
                    }
                    self.buf.push(b'"');
                } else {
                    C::encode_utf8_lossy(field, &mut self.buf);
                }
            }
            Dialect::Tsv => {
                if field.iter().any(|&c| c == C::TAB || c.is_line_break()) {
                    self.defer_error(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "TSV field contains a tab or line break",
                    ));
                }
                C::encode_utf8_lossy(field, &mut self.buf);
            }
        }
        if self.buf.len() >= Self::CHUNK_SIZE {
            self.flush_defer_err();
        }
    }

    /// Writes a whole record.
    pub fn write_record<C: Char, F: AsRef<[C]>>(&mut self, fields: impl IntoIterator<Item = F>) {
        for field in fields {
            self.write_field(field.as_ref());
        }
        self.end_record();
    }

    /// Ends the current record.
    pub fn end_record(&mut self) {
        if std::mem::take(&mut self.empty_field_pending) && self.fields_in_record == 1 {
            match self.dialect {
                Dialect::Csv => self.buf.extend_from_slice(b"\"\""),
                Dialect::Tsv => self.defer_error(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "TSV record consisting of one empty field",
                )),
            }
        }
        self.fields_in_record = 0;
        self.buf.extend_from_slice(b"\r\n");
    }

    /// Flushes the buffered data to the underlying [`Write`] instance, deferring IO errors.
    pub fn flush_defer_err(&mut self) {
        // Drop the data if an error is still waiting to be reported.
        if self.io_error.is_none() {
            self.panicked = true;
            if let Err(err) = self.write.write_all(&self.buf) {
                self.io_error = Some(err);
            }
            self.panicked = false;
        }
        self.buf.clear();
    }

    /// Flushes buffered data and reports any deferred error.
    pub fn flush(&mut self) -> io::Result<()> {
        self.flush_defer_err();
        self.check_io_error()?;
        self.write.flush()
    }

    /// Returns a deferred error as `Err(io_err)`, resetting it.
    #[inline]
    pub fn check_io_error(&mut self) -> io::Result<()> {
        match self.io_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn defer_error(&mut self, err: io::Error) {
        self.io_error.get_or_insert(err);
    }
}

impl Drop for RecordWriter<'_> {
    fn drop(&mut self) {
        if !self.panicked {
            self.flush_defer_err();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(records: &[&[&str]]) -> io::Result<String> {
        let mut out = vec![];
        {
            let mut writer = RecordWriter::from_write(&mut out, Dialect::Csv);
            for record in records {
                writer.write_record::<u8, _>(record.iter().map(|f| f.as_bytes()));
            }
            writer.flush()?;
        }
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn quotes_when_needed() -> io::Result<()> {
        assert_eq!(
            csv(&[&["a", "b c", "d,e"], &["say \"hi\"", "x\ny", ""]])?,
            "a,b c,\"d,e\"\r\n\"say \"\"hi\"\"\",\"x\ny\",\r\n"
        );
        Ok(())
    }

    #[test]
    fn single_empty_field() -> io::Result<()> {
        assert_eq!(csv(&[&[""], &[], &["", ""]])?, "\"\"\r\n\r\n,\r\n");
        Ok(())
    }

    #[test]
    fn tsv_rejects_tabs() {
        let mut out = vec![];
        let mut writer = RecordWriter::from_write(&mut out, Dialect::Tsv);
        writer.write_record::<u8, _>([&b"a\tb"[..]]);
        assert_eq!(
            writer.flush().unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }

    #[test]
    fn wide_fields_are_utf8() -> io::Result<()> {
        let mut out = vec![];
        {
            let mut writer = RecordWriter::from_write(&mut out, Dialect::Tsv);
            writer.write_record::<u16, _>([u16::encode_str("grün"), u16::encode_str("\"")]);
            writer.flush()?;
        }
        assert_eq!(out, "grün\t\"\r\n".as_bytes());
        Ok(())
    }
}
