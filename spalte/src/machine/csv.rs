use super::{flush, ChunkData, Counters, Machine, Span};
use crate::{Char, Error, Flow, Handler, LogicalPosition, Result};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
enum State {
    #[default]
    RecordStart,
    FieldStart,
    InUnquoted,
    InQuoted,
    AfterQuote,
    AfterField,
    AfterCr,
}

/// Comma separated values as described by RFC 4180.
///
/// The reading is permissive in a few places: records may be terminated by CR, LF or CRLF, the
/// final record needs no terminator, whitespace around fields is preserved and quoted fields may
/// contain any line breaks. A quote inside an unquoted field, a character other than a separator
/// or line break after a closing quote and an unterminated quote at the end of input are errors.
#[derive(Clone, Debug, Default)]
pub struct Csv {
    state: State,
    pos: usize,
    span: Span,
    /// Position of the quote that moved us into `AfterQuote`.
    quote: usize,
    counters: Counters,
}

impl Csv {
    #[inline]
    fn finish_field<C: Char, H: Handler<C>>(
        &mut self,
        data: &mut ChunkData<'_, C>,
        run_end: usize,
        handler: &mut H,
    ) -> Result<Flow> {
        self.span.close_run(data, run_end);
        self.counters.finalize(handler, self.span.fragment(&data[..]))
    }

    #[cold]
    #[inline(never)]
    fn quote_in_unquoted_field() -> Error {
        Error::parse("quote in unquoted field")
    }

    #[cold]
    #[inline(never)]
    fn after_closing_quote<C: Char>(c: C) -> Error {
        Error::parse(format!(
            "unexpected {:?} after closing quote",
            c.to_char()
        ))
    }

    #[cold]
    #[inline(never)]
    fn unterminated_quote() -> Error {
        Error::parse("unterminated quoted field")
    }
}

impl Machine for Csv {
    #[inline]
    fn begin_chunk(&mut self) {
        self.pos = 0;
        self.quote = 0;
        self.span.open(0);
    }

    #[inline]
    fn pos(&self) -> usize {
        self.pos
    }

    fn feed<C: Char, H: Handler<C>>(
        &mut self,
        data: &mut ChunkData<'_, C>,
        handler: &mut H,
        empty_lines: bool,
    ) -> Result<Flow> {
        while self.pos < data.len() {
            let c = data[self.pos];
            let flow = match self.state {
                State::RecordStart => {
                    if c.is_line_break() {
                        self.pos += 1;
                        self.state = if c == C::CR {
                            State::AfterCr
                        } else {
                            State::RecordStart
                        };
                        if empty_lines {
                            handler.empty_physical_line()?
                        } else {
                            Flow::Continue
                        }
                    } else {
                        self.state = State::FieldStart;
                        handler.start_record()?
                    }
                }
                State::FieldStart => {
                    if c == C::COMMA {
                        let at = self.pos;
                        self.pos += 1;
                        self.counters.finalize(handler, &data[at..at])?
                    } else if c == C::QUOTE {
                        self.pos += 1;
                        self.span.open(self.pos);
                        self.state = State::InQuoted;
                        Flow::Continue
                    } else if c.is_line_break() {
                        self.state = State::AfterField;
                        self.counters.finalize(handler, &data[self.pos..self.pos])?
                    } else {
                        self.span.open(self.pos);
                        self.pos += 1;
                        self.state = State::InUnquoted;
                        Flow::Continue
                    }
                }
                State::InUnquoted => {
                    if c == C::COMMA {
                        let at = self.pos;
                        self.pos += 1;
                        self.state = State::FieldStart;
                        self.finish_field(data, at, handler)?
                    } else if c == C::QUOTE {
                        return Err(Self::quote_in_unquoted_field());
                    } else if c.is_line_break() {
                        self.state = State::AfterField;
                        self.finish_field(data, self.pos, handler)?
                    } else {
                        let rest = &data[self.pos + 1..];
                        self.pos += 1 + rest
                            .iter()
                            .position(|&c| c == C::COMMA || c == C::QUOTE || c.is_line_break())
                            .unwrap_or(rest.len());
                        continue;
                    }
                }
                State::InQuoted => {
                    if c == C::QUOTE {
                        self.quote = self.pos;
                        self.pos += 1;
                        self.state = State::AfterQuote;
                        Flow::Continue
                    } else {
                        let rest = &data[self.pos + 1..];
                        self.pos += 1 + rest
                            .iter()
                            .position(|&c| c == C::QUOTE)
                            .unwrap_or(rest.len());
                        continue;
                    }
                }
                State::AfterQuote => {
                    if c == C::QUOTE {
                        // The first quote of the pair is dropped, the second one starts the next
                        // run.
                        self.span.close_run(data, self.quote);
                        let flow = if data.is_writable() {
                            self.span.run = self.pos;
                            Flow::Continue
                        } else {
                            let flow = flush(&mut self.span, &data[..], handler)?;
                            self.span.open(self.pos);
                            flow
                        };
                        self.pos += 1;
                        self.state = State::InQuoted;
                        flow
                    } else if c == C::COMMA {
                        self.pos += 1;
                        self.state = State::FieldStart;
                        self.finish_field(data, self.quote, handler)?
                    } else if c.is_line_break() {
                        self.state = State::AfterField;
                        self.finish_field(data, self.quote, handler)?
                    } else {
                        return Err(Self::after_closing_quote(c));
                    }
                }
                State::AfterField => {
                    debug_assert!(c.is_line_break());
                    self.pos += 1;
                    self.state = if c == C::CR {
                        State::AfterCr
                    } else {
                        State::RecordStart
                    };
                    self.counters.end_record(handler)?
                }
                State::AfterCr => {
                    if c == C::LF {
                        self.pos += 1;
                    }
                    self.state = State::RecordStart;
                    Flow::Continue
                }
            };
            if flow.is_stop() {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    fn end_chunk<C: Char, H: Handler<C>>(
        &mut self,
        data: &mut ChunkData<'_, C>,
        handler: &mut H,
        eof: bool,
    ) -> Result<Flow> {
        let len = data.len();
        if !eof {
            let run_end = match self.state {
                State::InUnquoted | State::InQuoted => len,
                State::AfterQuote => self.quote,
                _ => return Ok(Flow::Continue),
            };
            self.span.close_run(data, run_end);
            return flush(&mut self.span, &data[..], handler);
        }

        loop {
            let flow = match self.state {
                State::InQuoted => return Err(Self::unterminated_quote()),
                State::InUnquoted => {
                    self.state = State::AfterField;
                    self.finish_field(data, len, handler)?
                }
                State::AfterQuote => {
                    self.state = State::AfterField;
                    self.finish_field(data, self.quote, handler)?
                }
                State::FieldStart => {
                    self.state = State::AfterField;
                    self.counters.finalize(handler, &data[len..len])?
                }
                State::AfterField => {
                    self.state = State::RecordStart;
                    self.counters.end_record(handler)?
                }
                State::RecordStart | State::AfterCr => return Ok(Flow::Continue),
            };
            if flow.is_stop() {
                return Ok(Flow::Stop);
            }
        }
    }

    fn logical(&self) -> LogicalPosition {
        self.counters.logical()
    }
}
