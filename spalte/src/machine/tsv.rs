use super::{flush, ChunkData, Counters, Machine, Span};
use crate::{Char, Flow, Handler, LogicalPosition, Result};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
enum State {
    #[default]
    RecordStart,
    InField,
    AfterField,
    AfterCr,
}

/// Tab separated values.
///
/// Fields are separated by tabs and records by CR, LF or CRLF. There is no quoting, every other
/// character is part of a field, so TSV input never fails to parse.
#[derive(Clone, Debug, Default)]
pub struct Tsv {
    state: State,
    pos: usize,
    span: Span,
    counters: Counters,
}

impl Tsv {
    #[inline]
    fn finish_field<C: Char, H: Handler<C>>(
        &mut self,
        data: &mut ChunkData<'_, C>,
        end: usize,
        handler: &mut H,
    ) -> Result<Flow> {
        self.span.close_run(data, end);
        self.counters.finalize(handler, self.span.fragment(&data[..]))
    }
}

impl Machine for Tsv {
    #[inline]
    fn begin_chunk(&mut self) {
        self.pos = 0;
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
                        self.state = State::InField;
                        self.span.open(self.pos);
                        handler.start_record()?
                    }
                }
                State::InField => {
                    if c == C::TAB {
                        let at = self.pos;
                        self.pos += 1;
                        let flow = self.finish_field(data, at, handler)?;
                        self.span.open(self.pos);
                        flow
                    } else if c.is_line_break() {
                        self.state = State::AfterField;
                        self.finish_field(data, self.pos, handler)?
                    } else {
                        let rest = &data[self.pos + 1..];
                        self.pos += 1 + rest
                            .iter()
                            .position(|&c| c == C::TAB || c.is_line_break())
                            .unwrap_or(rest.len());
                        continue;
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
            if self.state == State::InField {
                self.span.close_run(data, len);
                return flush(&mut self.span, &data[..], handler);
            }
            return Ok(Flow::Continue);
        }

        loop {
            let flow = match self.state {
                State::InField => {
                    self.state = State::AfterField;
                    self.finish_field(data, len, handler)?
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
