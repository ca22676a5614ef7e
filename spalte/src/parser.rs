//! The parser driver connecting input, state machine and handler.
use std::{io, mem, ops::Range};

use tracing::{debug, trace};

use crate::{
    machine::{ChunkData, Csv, Machine, Tsv},
    Char, ChunkPosition, Error, Flow, Handler, Input, LogicalPosition, PhysicalPosition, Result,
};

/// Configuration for the parser.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Config {
    /// Number of characters read per buffer refill. Must be positive. (Default: `8192`)
    ///
    /// This has no effect when the handler supplies its own buffers or when fragments are lent
    /// directly from the input, except for bounding the size of lent chunks.
    pub buffer_size: usize,
    /// When set, empty physical lines are reported to the handler. (Default: `false`)
    ///
    /// Handlers see them as [`Handler::empty_physical_line`] calls, which by default produce a
    /// record without fields.
    pub empty_line_aware: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
            empty_line_aware: false,
        }
    }
}

impl Config {
    /// The default for [`buffer_size`][Self#structfield.buffer_size].
    pub const DEFAULT_BUFFER_SIZE: usize = 8192;

    #[inline]
    /// Sets the [`buffer_size`][Self#structfield.buffer_size] field.
    pub fn buffer_size(mut self, value: usize) -> Self {
        assert!(value > 0, "buffer size must be positive");
        self.buffer_size = value;
        self
    }

    #[inline]
    /// Sets the [`empty_line_aware`][Self#structfield.empty_line_aware] field.
    pub fn empty_line_aware(mut self, value: bool) -> Self {
        self.empty_line_aware = value;
        self
    }
}

/// Outcome of [`Parser::run`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ParseResult {
    /// Whether the whole input was parsed. `false` when a handler stopped the parser.
    pub complete: bool,
    /// Number of input characters consumed.
    pub parse_point: usize,
}

enum Chunk<C> {
    Empty,
    Owned {
        buf: Box<[C]>,
        len: usize,
        from_handler: bool,
    },
    Lent(Range<usize>),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Phase {
    Refill,
    StartBuffer,
    Feed,
    EndChunk,
    EndBuffer,
    Release,
    Done,
    Failed,
}

/// Parses delimited text, passing events to a [`Handler`].
///
/// The dialect is selected by the machine type `M`, usually [`Csv`] or [`Tsv`]. A parser can be
/// suspended by its handler returning [`Flow::Stop`]; calling [`run`][Self::run] again continues
/// with the next event. A stopped parser keeps its current buffer until it is run to completion,
/// [`into_handler`][Self::into_handler] is called or the parser is dropped. In each case a buffer
/// obtained from [`Handler::get_buffer`] is passed back to [`Handler::release_buffer`].
pub struct Parser<C: Char, I, H: Handler<C>, M = Csv> {
    input: I,
    /// Only empty while [`into_handler`][Self::into_handler] moves it out.
    handler: Option<H>,
    machine: M,
    config: Config,
    spare: Option<Box<[C]>>,
    chunk: Chunk<C>,
    position: ChunkPosition,
    phase: Phase,
    eof: bool,
}

impl<C: Char, I: Input<C>, H: Handler<C>> Parser<C, I, H, Csv> {
    /// Creates a CSV parser.
    pub fn csv(input: I, handler: H, config: Config) -> Self {
        Self::new(input, handler, config)
    }
}

impl<C: Char, I: Input<C>, H: Handler<C>> Parser<C, I, H, Tsv> {
    /// Creates a TSV parser.
    pub fn tsv(input: I, handler: H, config: Config) -> Self {
        Self::new(input, handler, config)
    }
}

impl<C: Char, I: Input<C>, H: Handler<C>, M: Machine> Parser<C, I, H, M> {
    /// Creates a parser for the dialect `M`.
    pub fn new(input: I, handler: H, config: Config) -> Self {
        assert!(config.buffer_size > 0, "buffer size must be positive");
        Self {
            input,
            handler: Some(handler),
            machine: M::default(),
            config,
            spare: None,
            chunk: Chunk::Empty,
            position: ChunkPosition::default(),
            phase: Phase::Refill,
            eof: false,
        }
    }

    /// Returns a reference to the handler.
    pub fn handler(&self) -> &H {
        match &self.handler {
            Some(handler) => handler,
            None => unreachable!("handler already taken"),
        }
    }

    /// Returns a mutable reference to the handler.
    pub fn handler_mut(&mut self) -> &mut H {
        present(&mut self.handler)
    }

    /// Releases any retained buffer and returns the handler.
    pub fn into_handler(mut self) -> H {
        self.release();
        match self.handler.take() {
            Some(handler) => handler,
            None => unreachable!("handler already taken"),
        }
    }

    /// Returns `true` once the whole input was parsed.
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Returns the number of input characters consumed so far.
    pub fn parse_point(&self) -> usize {
        self.position.consumed()
    }

    /// Returns the position of the next input character.
    pub fn physical_position(&self) -> PhysicalPosition {
        self.position.physical()
    }

    /// Returns the number of completed records and completed fields of the current record.
    pub fn logical_position(&self) -> LogicalPosition {
        self.machine.logical()
    }

    /// Parses until the input is exhausted, a handler stops the parser or an error occurs.
    ///
    /// On error the buffer is released and the parser can't be resumed. Errors of the input are
    /// returned unchanged. All other errors are passed to [`Handler::handle_error`] once and carry
    /// the position at which they occurred.
    pub fn run(&mut self) -> Result<ParseResult> {
        loop {
            let step = match self.phase {
                Phase::Done => return Ok(self.result(true)),
                Phase::Failed => return Err(Error::parse("parser already failed")),
                Phase::Refill => {
                    if let Err(err) = self.refill() {
                        self.phase = Phase::Failed;
                        debug!(parse_point = self.parse_point(), error = %err, "input failed");
                        return Err(err.into());
                    }
                    self.phase = Phase::StartBuffer;
                    continue;
                }
                Phase::Release => {
                    let len = self.chunk_len();
                    self.sync(len);
                    self.release();
                    self.phase = if self.eof { Phase::Done } else { Phase::Refill };
                    continue;
                }
                _ => self.step(),
            };
            match step {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => {
                    self.sync(self.machine.pos());
                    debug!(parse_point = self.parse_point(), "parser stopped by handler");
                    return Ok(self.result(false));
                }
                Err(err) => return Err(self.fail(err)),
            }
        }
    }

    fn result(&self, complete: bool) -> ParseResult {
        ParseResult {
            complete,
            parse_point: self.parse_point(),
        }
    }

    fn step(&mut self) -> Result<Flow> {
        let empty_lines = self.config.empty_line_aware || H::EMPTY_LINE_AWARE;
        let mut data = match &mut self.chunk {
            Chunk::Owned { buf, len, .. } => ChunkData::Writable {
                chars: &mut buf[..*len],
                position: &mut self.position,
            },
            Chunk::Lent(range) => ChunkData::ReadOnly(&self.input.lent()[range.clone()]),
            Chunk::Empty => ChunkData::ReadOnly(&[]),
        };
        match self.phase {
            Phase::StartBuffer => {
                self.phase = Phase::Feed;
                present(&mut self.handler).start_buffer(&data[..])
            }
            Phase::Feed => {
                let flow = self
                    .machine
                    .feed(&mut data, present(&mut self.handler), empty_lines)?;
                if !flow.is_stop() {
                    self.phase = Phase::EndChunk;
                }
                Ok(flow)
            }
            Phase::EndChunk => {
                let flow = self
                    .machine
                    .end_chunk(&mut data, present(&mut self.handler), self.eof)?;
                if !flow.is_stop() {
                    self.phase = Phase::EndBuffer;
                }
                Ok(flow)
            }
            Phase::EndBuffer => {
                self.phase = Phase::Release;
                present(&mut self.handler).end_buffer(&data[..])
            }
            phase => unreachable!("no chunk to process in {phase:?}"),
        }
    }

    fn refill(&mut self) -> io::Result<()> {
        let size = self.config.buffer_size;
        if H::ZERO_COPY && I::CAN_LEND {
            let range = self.input.lend(size)?;
            self.eof = range.len() < size;
            self.chunk = Chunk::Lent(range);
        } else {
            let (mut buf, from_handler) = match present(&mut self.handler).get_buffer() {
                Some(buf) => (buf, true),
                None => (
                    self.spare
                        .take()
                        .unwrap_or_else(|| vec![C::NUL; size].into_boxed_slice()),
                    false,
                ),
            };
            assert!(!buf.is_empty(), "handler supplied an empty buffer");
            let read = self.input.read_into(&mut buf);
            let len = *read.as_ref().unwrap_or(&0);
            self.eof = len < buf.len();
            self.chunk = Chunk::Owned {
                buf,
                len,
                from_handler,
            };
            if let Err(err) = read {
                self.release();
                return Err(err);
            }
        }
        self.machine.begin_chunk();
        self.position.begin_chunk();
        trace!(len = self.chunk_len(), eof = self.eof, "refilled buffer");
        Ok(())
    }

    fn chunk_len(&self) -> usize {
        match &self.chunk {
            Chunk::Owned { len, .. } => *len,
            Chunk::Lent(range) => range.len(),
            Chunk::Empty => 0,
        }
    }

    fn sync(&mut self, upto: usize) {
        let chars: &[C] = match &self.chunk {
            Chunk::Owned { buf, len, .. } => &buf[..*len],
            Chunk::Lent(range) => &self.input.lent()[range.clone()],
            Chunk::Empty => &[],
        };
        self.position.scan_to(chars, upto);
    }

    #[cold]
    #[inline(never)]
    fn fail(&mut self, mut err: Error) -> Error {
        self.sync(self.machine.pos());
        let physical = self.position.physical();
        let logical = self.machine.logical();
        err.enrich(physical, logical);
        let mut err = present(&mut self.handler).handle_error(err);
        err.enrich(physical, logical);
        self.release();
        self.phase = Phase::Failed;
        debug!(%physical, error = %err, "parse failed");
        err
    }
}

impl<C: Char, I, H: Handler<C>, M> Parser<C, I, H, M> {
    fn release(&mut self) {
        match mem::replace(&mut self.chunk, Chunk::Empty) {
            Chunk::Owned {
                buf,
                from_handler: true,
                ..
            } => {
                if let Some(handler) = &mut self.handler {
                    handler.release_buffer(buf)
                }
            }
            Chunk::Owned { buf, .. } => self.spare = Some(buf),
            Chunk::Lent(_) | Chunk::Empty => {}
        }
    }
}

impl<C: Char, I, H: Handler<C>, M> Drop for Parser<C, I, H, M> {
    fn drop(&mut self) {
        self.release();
    }
}

#[inline]
fn present<H>(handler: &mut Option<H>) -> &mut H {
    match handler {
        Some(handler) => handler,
        None => unreachable!("handler already taken"),
    }
}

/// Parses CSV from `input`, passing all events to `handler`.
///
/// When the handler stops the parser, the parser is dropped, which passes a buffer supplied by the
/// handler back to it.
pub fn parse_csv<C: Char, I: Input<C>, H: Handler<C>>(
    input: I,
    handler: H,
    config: Config,
) -> Result<ParseResult> {
    Parser::csv(input, handler, config).run()
}

/// Parses TSV from `input`, passing all events to `handler`.
pub fn parse_tsv<C: Char, I: Input<C>, H: Handler<C>>(
    input: I,
    handler: H,
    config: Config,
) -> Result<ParseResult> {
    Parser::tsv(input, handler, config).run()
}
