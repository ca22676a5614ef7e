//! Copying selected records from delimited input to a writer.
use std::mem;

use spalte::{render_chars, Char, Error, ErrorKind, Flow, Handler, RecordWriter, Result};
use tracing::debug;

/// Configuration for a [`RecordExtractor`].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct ExtractConfig {
    /// Whether the header record is written to the output. (Default: `true`)
    pub include_header: bool,
    /// Stops the parser after this many records were extracted. (Default: `None`)
    pub max_records: Option<usize>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            include_header: true,
            max_records: None,
        }
    }
}

impl ExtractConfig {
    #[inline]
    /// Sets the [`include_header`][Self#structfield.include_header] field.
    pub fn include_header(mut self, value: bool) -> Self {
        self.include_header = value;
        self
    }

    #[inline]
    /// Sets the [`max_records`][Self#structfield.max_records] field.
    pub fn max_records(mut self, value: Option<usize>) -> Self {
        self.max_records = value;
        self
    }
}

/// A [`Handler`] writing the records whose key field satisfies a predicate.
///
/// The first record is the header. The key column is the first header field equal to the key.
pub struct RecordExtractor<'a, C> {
    writer: RecordWriter<'a>,
    key: Vec<C>,
    predicate: Box<dyn FnMut(&[C]) -> bool + 'a>,
    config: ExtractConfig,
    key_column: Option<usize>,
    fields: Vec<Vec<C>>,
    field: Vec<C>,
    extracted: usize,
}

impl<'a, C: Char> RecordExtractor<'a, C> {
    /// Creates an extractor for the column named `key`.
    pub fn new(
        writer: RecordWriter<'a>,
        key: &[C],
        predicate: impl FnMut(&[C]) -> bool + 'a,
        config: ExtractConfig,
    ) -> Self {
        Self {
            writer,
            key: key.to_vec(),
            predicate: Box::new(predicate),
            config,
            key_column: None,
            fields: vec![],
            field: vec![],
            extracted: 0,
        }
    }

    /// Returns the number of records written, not counting the header.
    pub fn extracted(&self) -> usize {
        self.extracted
    }

    /// Flushes the output, returning the number of records written.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.extracted)
    }

    fn limit_reached(&self) -> bool {
        self.config
            .max_records
            .map_or(false, |max| self.extracted >= max)
    }

    fn end_header(&mut self) -> Result<Flow> {
        let Some(column) = self.fields.iter().position(|field| *field == self.key) else {
            return Err(Error::new(ErrorKind::RecordExtraction {
                key: render_chars(&self.key),
            }));
        };
        debug!(column, "found extraction key");
        self.key_column = Some(column);
        if self.config.include_header {
            self.writer.write_record::<C, _>(&self.fields);
        }
        Ok((!self.limit_reached()).into())
    }
}

impl<C: Char> Handler<C> for RecordExtractor<'_, C> {
    const ZERO_COPY: bool = true;

    fn start_record(&mut self) -> Result<Flow> {
        self.fields.clear();
        Ok(Flow::Continue)
    }

    fn update(&mut self, fragment: &[C]) -> Result<Flow> {
        self.field.extend_from_slice(fragment);
        Ok(Flow::Continue)
    }

    fn finalize(&mut self, fragment: &[C]) -> Result<Flow> {
        self.field.extend_from_slice(fragment);
        let field = mem::take(&mut self.field);
        self.fields.push(field);
        Ok(Flow::Continue)
    }

    fn end_record(&mut self) -> Result<Flow> {
        let Some(column) = self.key_column else {
            return self.end_header();
        };
        let selected = match self.fields.get(column) {
            Some(key) => (self.predicate)(key),
            None => false,
        };
        if selected {
            self.writer.write_record::<C, _>(&self.fields);
            self.writer.check_io_error()?;
            self.extracted += 1;
        }
        Ok((!self.limit_reached()).into())
    }

    fn handle_error(&mut self, error: Error) -> Error {
        self.field.clear();
        error
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use spalte::{parse_csv, parse_tsv, Config, Dialect, SliceInput};

    use super::*;

    type Result<T> = std::result::Result<T, Error>;

    const CITIES: &str = "name,country,population\n\
                          Berlin,DE,3700000\n\
                          Paris,FR,2100000\n\
                          Hamburg,DE,1900000\n\
                          \"Munich, Bavaria\",DE,1500000\n";

    fn extract(text: &str, key: &str, value: &str, config: ExtractConfig) -> Result<(String, usize)> {
        let mut out = vec![];
        let writer = RecordWriter::from_write(&mut out, Dialect::Csv);
        let mut extractor =
            RecordExtractor::new(writer, key.as_bytes(), |field| field == value.as_bytes(), config);
        parse_csv(SliceInput::from(text), &mut extractor, Config::default().buffer_size(7))?;
        let count = extractor.finish()?;
        Ok((String::from_utf8_lossy(&out).into_owned(), count))
    }

    #[test]
    fn matching_records() -> Result<()> {
        let (out, count) = extract(CITIES, "country", "DE", ExtractConfig::default())?;
        assert_eq!(count, 3);
        assert_eq!(
            out,
            "name,country,population\r\n\
             Berlin,DE,3700000\r\n\
             Hamburg,DE,1900000\r\n\
             \"Munich, Bavaria\",DE,1500000\r\n"
        );
        Ok(())
    }

    #[test]
    fn without_header_and_limited() -> Result<()> {
        let config = ExtractConfig::default()
            .include_header(false)
            .max_records(Some(1));
        let (out, count) = extract(CITIES, "country", "DE", config)?;
        assert_eq!(count, 1);
        assert_eq!(out, "Berlin,DE,3700000\r\n");
        Ok(())
    }

    #[test]
    fn stops_at_the_limit() -> Result<()> {
        let mut out = vec![];
        let writer = RecordWriter::from_write(&mut out, Dialect::Tsv);
        let config = ExtractConfig::default().max_records(Some(1));
        let mut extractor = RecordExtractor::new(writer, &b"k"[..], |field| field == b"x", config);
        let text = "k\tv\nx\t1\ny\t2\nx\t3\n";
        let result = parse_tsv(SliceInput::from(text), &mut extractor, Config::default())?;
        assert!(!result.complete);
        assert_eq!(result.parse_point, 8);
        assert_eq!(extractor.extracted(), 1);
        drop(extractor);
        assert_eq!(out, b"k\tv\r\nx\t1\r\n");
        Ok(())
    }

    #[test]
    fn missing_key() {
        let err = extract(CITIES, "city", "Paris", ExtractConfig::default()).unwrap_err();
        assert_matches!(err.kind(), ErrorKind::RecordExtraction { key } if key == "\"city\"");
        assert_eq!(err.logical_position().map(|pos| pos.record), Some(0));
    }

    #[test]
    fn short_records_never_match() -> Result<()> {
        let (out, count) = extract("a,b\n1\n2,DE\n", "b", "DE", ExtractConfig::default())?;
        assert_eq!(count, 1);
        assert_eq!(out, "a,b\r\n2,DE\r\n");
        Ok(())
    }
}
