//! Cursor-style access to parse events.
use std::mem;

use crate::{
    machine::{Csv, Machine, Tsv},
    Char, Config, Error, Flow, Handler, Input, LogicalPosition, Parser, PhysicalPosition, Result,
};

/// The event a [`Pull`] cursor currently points at.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PullState {
    /// [`Pull::advance`] was not called yet.
    BeforeParse,
    /// A field was read; its contents are available via [`Pull::current`].
    Field,
    /// The current record ended.
    RecordEnd,
    /// The input is exhausted or the record limit was reached.
    Eof,
    /// Parsing failed.
    Error,
}

/// Configuration for a [`Pull`] cursor.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct PullConfig {
    /// Configuration of the underlying parser.
    pub parser: Config,
    /// Stop with [`PullState::Eof`] after this many records. (Default: no limit)
    pub max_records: Option<usize>,
}

impl PullConfig {
    #[inline]
    /// Sets the [`parser`][Self#structfield.parser] field.
    pub fn parser(mut self, value: Config) -> Self {
        self.parser = value;
        self
    }

    #[inline]
    /// Sets the [`max_records`][Self#structfield.max_records] field.
    pub fn max_records(mut self, value: Option<usize>) -> Self {
        self.max_records = value;
        self
    }
}

/// Holds the most recent event until the cursor picks it up.
struct Slot<C> {
    value: Vec<C>,
    field_done: bool,
    pending: Option<PullState>,
}

impl<C: Char> Slot<C> {
    #[inline]
    fn append(&mut self, fragment: &[C]) {
        if mem::take(&mut self.field_done) {
            self.value.clear();
        }
        self.value.extend_from_slice(fragment);
    }
}

impl<C: Char> Handler<C> for Slot<C> {
    const ZERO_COPY: bool = true;

    fn start_record(&mut self) -> Result<Flow> {
        Ok(Flow::Continue)
    }

    fn update(&mut self, fragment: &[C]) -> Result<Flow> {
        self.append(fragment);
        Ok(Flow::Continue)
    }

    fn finalize(&mut self, fragment: &[C]) -> Result<Flow> {
        self.append(fragment);
        self.field_done = true;
        self.pending = Some(PullState::Field);
        Ok(Flow::Stop)
    }

    fn end_record(&mut self) -> Result<Flow> {
        self.pending = Some(PullState::RecordEnd);
        Ok(Flow::Stop)
    }
}

/// A cursor over the fields and records of delimited text.
///
/// Each call to [`advance`][Self::advance] moves to the next field or record end.
///
/// ```
/// # use spalte::{Pull, PullConfig, PullState, SliceInput};
/// let mut pull = Pull::csv(SliceInput::from("a,b\nc\n"), PullConfig::default());
/// assert_eq!(pull.advance()?, PullState::Field);
/// assert_eq!(pull.current(), b"a");
/// assert_eq!(pull.skip_record(1)?, PullState::RecordEnd);
/// assert_eq!(pull.advance()?, PullState::Field);
/// assert_eq!(pull.current(), b"c");
/// # Ok::<(), spalte::Error>(())
/// ```
pub struct Pull<C: Char, I, M = Csv> {
    parser: Parser<C, I, Slot<C>, M>,
    state: PullState,
    max_records: Option<usize>,
    records: usize,
    fields: usize,
}

impl<C: Char, I: Input<C>> Pull<C, I, Csv> {
    /// Creates a cursor over CSV input.
    pub fn csv(input: I, config: PullConfig) -> Self {
        Self::new(input, config)
    }
}

impl<C: Char, I: Input<C>> Pull<C, I, Tsv> {
    /// Creates a cursor over TSV input.
    pub fn tsv(input: I, config: PullConfig) -> Self {
        Self::new(input, config)
    }
}

impl<C: Char, I: Input<C>, M: Machine> Pull<C, I, M> {
    /// Creates a cursor for the dialect `M`.
    pub fn new(input: I, config: PullConfig) -> Self {
        let slot = Slot {
            value: vec![],
            field_done: false,
            pending: None,
        };
        Self {
            parser: Parser::new(input, slot, config.parser),
            state: PullState::BeforeParse,
            max_records: config.max_records,
            records: 0,
            fields: 0,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> PullState {
        self.state
    }

    /// Moves to the next event.
    ///
    /// An error is returned once, after which the state is [`PullState::Error`] and further calls
    /// return `Ok(PullState::Error)`.
    pub fn advance(&mut self) -> Result<PullState> {
        match self.state {
            PullState::Eof | PullState::Error => return Ok(self.state),
            PullState::RecordEnd => {
                self.records += 1;
                self.fields = 0;
            }
            PullState::Field => self.fields += 1,
            PullState::BeforeParse => {}
        }
        if Some(self.records) == self.max_records && self.fields == 0 {
            self.state = PullState::Eof;
            return Ok(self.state);
        }
        match self.parser.run() {
            Ok(result) => {
                self.state = match self.parser.handler_mut().pending.take() {
                    Some(state) => state,
                    None => {
                        debug_assert!(result.complete);
                        PullState::Eof
                    }
                };
                Ok(self.state)
            }
            Err(err) => {
                self.state = PullState::Error;
                Err(err)
            }
        }
    }

    /// Returns the contents of the current field, or of the last field read.
    pub fn current(&self) -> &[C] {
        &self.parser.handler().value
    }

    /// Rewrites the contents of the current field.
    ///
    /// Returns `false` without calling `f` unless the cursor is at a field.
    pub fn rewrite(&mut self, f: impl FnOnce(&mut Vec<C>)) -> bool {
        if self.state != PullState::Field {
            return false;
        }
        f(&mut self.parser.handler_mut().value);
        true
    }

    /// Skips up to `n` fields of the current record.
    ///
    /// Stops early at the end of the record and returns the state reached.
    pub fn skip(&mut self, n: usize) -> Result<PullState> {
        for _ in 0..n {
            match self.advance()? {
                PullState::Field => {}
                state => return Ok(state),
            }
        }
        Ok(self.state)
    }

    /// Advances past `n` record ends.
    ///
    /// Stops early at the end of input and returns the state reached.
    pub fn skip_record(&mut self, n: usize) -> Result<PullState> {
        for _ in 0..n {
            loop {
                match self.advance()? {
                    PullState::Field => {}
                    PullState::RecordEnd => break,
                    state => return Ok(state),
                }
            }
        }
        Ok(self.state)
    }

    /// Reads the fields of the next record into `fields`.
    ///
    /// Returns `false` at the end of input.
    pub fn next_record(&mut self, fields: &mut Vec<Vec<C>>) -> Result<bool> {
        fields.clear();
        loop {
            match self.advance()? {
                PullState::Field => fields.push(self.current().to_vec()),
                PullState::RecordEnd => return Ok(true),
                _ => return Ok(false),
            }
        }
    }

    /// Returns the number of completed records and of completed fields in the current record.
    ///
    /// At a field, the field counts as completed.
    pub fn logical_position(&self) -> LogicalPosition {
        let fields = self.fields + (self.state == PullState::Field) as usize;
        LogicalPosition::new(self.records, fields)
    }

    /// Returns the position after the current event in the raw input.
    pub fn physical_position(&self) -> PhysicalPosition {
        self.parser.physical_position()
    }

    /// Returns the number of input characters consumed.
    pub fn parse_point(&self) -> usize {
        self.parser.parse_point()
    }
}

impl<C: Char, I: Input<C>, M: Machine> Iterator for Pull<C, I, M> {
    type Item = Result<Vec<Vec<C>>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut fields = vec![];
        match self.next_record(&mut fields) {
            Ok(true) => Some(Ok(fields)),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{ErrorKind, OwnedInput, SliceInput};

    type Result<T> = std::result::Result<T, Error>;

    #[test]
    fn walks_fields() -> Result<()> {
        let mut pull = Pull::csv(SliceInput::from("a,\"b\"\"\"\n\nc"), PullConfig::default());
        assert_eq!(pull.state(), PullState::BeforeParse);
        assert_eq!(pull.advance()?, PullState::Field);
        assert_eq!(pull.current(), b"a");
        assert_eq!(pull.advance()?, PullState::Field);
        assert_eq!(pull.current(), b"b\"");
        assert_eq!(pull.logical_position(), LogicalPosition::new(0, 2));
        assert_eq!(pull.advance()?, PullState::RecordEnd);
        assert_eq!(pull.logical_position(), LogicalPosition::new(0, 2));
        assert_eq!(pull.advance()?, PullState::Field);
        assert_eq!(pull.current(), b"c");
        assert_eq!(pull.logical_position(), LogicalPosition::new(1, 1));
        assert_eq!(pull.advance()?, PullState::RecordEnd);
        assert_eq!(pull.advance()?, PullState::Eof);
        assert_eq!(pull.advance()?, PullState::Eof);
        assert_eq!(pull.parse_point(), 10);
        Ok(())
    }

    #[test]
    fn empty_lines_as_records() -> Result<()> {
        let config = PullConfig::default().parser(Config::default().empty_line_aware(true));
        let mut pull = Pull::csv(SliceInput::from("a\n\nb\n"), config);
        let records = pull.by_ref().collect::<Result<Vec<_>>>()?;
        assert_eq!(records, [vec![b"a".to_vec()], vec![], vec![b"b".to_vec()]]);
        Ok(())
    }

    #[test]
    fn max_records() -> Result<()> {
        let config = PullConfig::default().max_records(Some(2));
        let mut pull = Pull::tsv(OwnedInput::from("a\tb\nc\nd\n".to_owned()), config);
        let mut fields = vec![];
        assert!(pull.next_record(&mut fields)?);
        assert!(pull.next_record(&mut fields)?);
        assert_eq!(fields, [b"c".to_vec()]);
        assert!(!pull.next_record(&mut fields)?);
        assert_eq!(pull.state(), PullState::Eof);
        assert_eq!(pull.parse_point(), 6);
        Ok(())
    }

    #[test]
    fn skipping() -> Result<()> {
        let mut pull = Pull::csv(SliceInput::from("a,b,c\nd,e\nf\n"), PullConfig::default());
        assert_eq!(Pull::skip(&mut pull, 2)?, PullState::Field);
        assert_eq!(pull.current(), b"b");
        assert_eq!(Pull::skip(&mut pull, 5)?, PullState::RecordEnd);
        assert_eq!(pull.skip_record(1)?, PullState::RecordEnd);
        assert_eq!(pull.advance()?, PullState::Field);
        assert_eq!(pull.current(), b"f");
        assert_eq!(pull.skip_record(3)?, PullState::Eof);
        Ok(())
    }

    #[test]
    fn rewrite_current_field() -> Result<()> {
        let mut pull = Pull::csv(SliceInput::from("abc,d"), PullConfig::default());
        assert!(!pull.rewrite(|_| unreachable!()));
        pull.advance()?;
        assert!(pull.rewrite(|value| value.reverse()));
        assert_eq!(pull.current(), b"cba");
        pull.advance()?;
        assert_eq!(pull.current(), b"d");
        Ok(())
    }

    #[test]
    fn error_is_reported_once() {
        let mut pull = Pull::csv(SliceInput::from("a\nb\"c"), PullConfig::default());
        assert_matches!(pull.skip_record(1), Ok(PullState::RecordEnd));
        let err = pull.advance().unwrap_err();
        assert_matches!(err.kind(), ErrorKind::Parse { .. });
        assert_eq!(err.physical_position(), Some(PhysicalPosition::new(1, 1)));
        assert_matches!(pull.advance(), Ok(PullState::Error));
        assert_eq!(pull.state(), PullState::Error);
    }

    #[test]
    fn wide_characters() -> Result<()> {
        let text = u16::encode_str("ä,\"ö\"\"\"\n");
        let mut pull = Pull::csv(SliceInput::new(&text[..]), PullConfig::default());
        let mut fields = vec![];
        assert!(pull.next_record(&mut fields)?);
        assert_eq!(fields, [u16::encode_str("ä"), u16::encode_str("ö\"")]);
        Ok(())
    }
}
