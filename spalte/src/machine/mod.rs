//! State machines turning chunks of characters into handler events.
//!
//! A machine is fed one chunk at a time. It keeps all of its state between chunks and between
//! calls, so it can stop after any event and later continue exactly where it stopped. Each
//! transition emits at most one event; characters that produce several events are revisited in an
//! intermediate state instead of being consumed.
use std::ops::{Deref, Range};

use crate::{Char, ChunkPosition, Flow, Handler, LogicalPosition, Result};

mod csv;
mod tsv;

pub use csv::Csv;
pub use tsv::Tsv;

/// A chunk of characters handed to a [`Machine`].
pub enum ChunkData<'a, C> {
    /// A buffer the machine may rewrite in place.
    ///
    /// Characters are passed to `position` before they are overwritten.
    Writable {
        /// The characters of the chunk.
        chars: &'a mut [C],
        /// Position tracking for the chunk.
        position: &'a mut ChunkPosition,
    },
    /// Storage lent by the input that must not be modified.
    ReadOnly(&'a [C]),
}

impl<C> Deref for ChunkData<'_, C> {
    type Target = [C];

    #[inline]
    fn deref(&self) -> &[C] {
        match self {
            ChunkData::Writable { chars, .. } => chars,
            ChunkData::ReadOnly(chars) => chars,
        }
    }
}

impl<C: Char> ChunkData<'_, C> {
    /// Returns `true` for [`ChunkData::Writable`].
    #[inline]
    pub fn is_writable(&self) -> bool {
        matches!(self, ChunkData::Writable { .. })
    }

    /// Moves the characters of `src` to start at `dest`, which must not be after `src.start`.
    #[inline]
    fn compact(&mut self, src: Range<usize>, dest: usize) {
        debug_assert!(dest <= src.start);
        match self {
            ChunkData::Writable { chars, position } => {
                position.scan_to(chars, src.end);
                chars.copy_within(src, dest);
            }
            ChunkData::ReadOnly(_) => unreachable!("compacting lent storage"),
        }
    }
}

/// A resumable state machine for one delimited text dialect.
pub trait Machine: Default {
    /// Prepares for a new chunk.
    fn begin_chunk(&mut self);

    /// Returns the offset of the next character to process within the current chunk.
    fn pos(&self) -> usize;

    /// Processes characters of `data` until it is exhausted or a handler asks to stop.
    ///
    /// Returns [`Flow::Continue`] once every character of the chunk was processed.
    fn feed<C: Char, H: Handler<C>>(
        &mut self,
        data: &mut ChunkData<'_, C>,
        handler: &mut H,
        empty_lines: bool,
    ) -> Result<Flow>;

    /// Finishes the current chunk after [`feed`][Self::feed] returned `Continue`.
    ///
    /// Pending field contents are passed on as an update. If `eof` is set, open fields and records
    /// are closed instead. Returns [`Flow::Continue`] once there is nothing left to emit.
    fn end_chunk<C: Char, H: Handler<C>>(
        &mut self,
        data: &mut ChunkData<'_, C>,
        handler: &mut H,
        eof: bool,
    ) -> Result<Flow>;

    /// Returns the current record and field counts.
    fn logical(&self) -> LogicalPosition;
}

/// The characters of the current field within the current chunk.
///
/// The field is the committed fragment `start..end` followed by the open run beginning at `run`.
/// Runs are separated by escaped quotes. On writable chunks a run is moved down to `end` when it
/// is closed, so the whole field stays one contiguous slice. On read-only chunks the fragment is
/// passed on as soon as it would become discontiguous, which keeps `run == end`.
#[derive(Copy, Clone, Debug, Default)]
struct Span {
    start: usize,
    end: usize,
    run: usize,
}

impl Span {
    #[inline]
    fn open(&mut self, at: usize) {
        *self = Span {
            start: at,
            end: at,
            run: at,
        };
    }

    /// Appends the open run, which ends at `run_end`, to the committed fragment.
    #[inline]
    fn close_run<C: Char>(&mut self, data: &mut ChunkData<'_, C>, run_end: usize) {
        if self.run != self.end && run_end > self.run {
            data.compact(self.run..run_end, self.end);
        }
        self.end += run_end - self.run;
        self.run = run_end;
    }

    #[inline]
    fn fragment<'a, C>(&self, data: &'a [C]) -> &'a [C] {
        &data[self.start..self.end]
    }
}

/// Record and field counters shared by the machines.
#[derive(Copy, Clone, Debug, Default)]
struct Counters {
    record: usize,
    field: usize,
}

impl Counters {
    #[inline]
    fn finalize<C: Char, H: Handler<C>>(&mut self, handler: &mut H, fragment: &[C]) -> Result<Flow> {
        let flow = handler.finalize(fragment)?;
        self.field += 1;
        Ok(flow)
    }

    #[inline]
    fn end_record<C: Char, H: Handler<C>>(&mut self, handler: &mut H) -> Result<Flow> {
        let flow = handler.end_record()?;
        self.record += 1;
        self.field = 0;
        Ok(flow)
    }

    #[inline]
    fn logical(&self) -> LogicalPosition {
        LogicalPosition::new(self.record, self.field)
    }
}

/// Passes the committed fragment on as an update, skipping empty fragments.
#[inline]
fn flush<C: Char, H: Handler<C>>(span: &mut Span, data: &[C], handler: &mut H) -> Result<Flow> {
    let fragment = span.fragment(data);
    let flow = if fragment.is_empty() {
        Flow::Continue
    } else {
        handler.update(fragment)?
    };
    span.open(span.run);
    Ok(flow)
}
