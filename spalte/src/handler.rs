//! The event protocol between the parser and its consumers.
use crate::{Char, Error, Result};

/// Tells the parser whether to continue after an event.
#[must_use]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Flow {
    /// Continue parsing.
    Continue,
    /// Suspend parsing after the current event.
    Stop,
}

impl Flow {
    /// Returns `Stop` if either flow is `Stop`.
    #[inline]
    pub fn and(self, other: Flow) -> Flow {
        if self == Flow::Stop {
            Flow::Stop
        } else {
            other
        }
    }

    /// Returns `true` for [`Flow::Stop`].
    #[inline]
    pub fn is_stop(self) -> bool {
        self == Flow::Stop
    }
}

impl From<()> for Flow {
    #[inline]
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

impl From<bool> for Flow {
    /// `true` continues, `false` stops.
    #[inline]
    fn from(proceed: bool) -> Self {
        if proceed {
            Flow::Continue
        } else {
            Flow::Stop
        }
    }
}

/// Receives the events produced while parsing.
///
/// For each buffer refill the parser emits `start_buffer`, then any number of records, then
/// `end_buffer`. A record is `start_record`, followed by fields, followed by `end_record`. A field
/// is any number of `update` calls followed by exactly one `finalize`. The field's value is the
/// concatenation of all fragments passed to these calls.
///
/// Fragments borrow the working buffer and are only valid for the duration of the call that
/// receives them.
///
/// Returning [`Flow::Stop`] suspends the parser after the event; returning an error aborts it.
pub trait Handler<C: Char> {
    /// Report empty physical lines to this handler even when the parser configuration doesn't ask
    /// for it.
    const EMPTY_LINE_AWARE: bool = false;

    /// This handler only reads fragments and never needs a writable buffer.
    ///
    /// When the input can lend its storage, the parser then passes fragments pointing directly into
    /// the input.
    const ZERO_COPY: bool = false;

    /// Called after a buffer was filled, before any of its characters are parsed.
    fn start_buffer(&mut self, buffer: &[C]) -> Result<Flow> {
        let _ = buffer;
        Ok(Flow::Continue)
    }

    /// Called after all characters of a buffer were parsed.
    fn end_buffer(&mut self, buffer: &[C]) -> Result<Flow> {
        let _ = buffer;
        Ok(Flow::Continue)
    }

    /// Called at the start of each record.
    fn start_record(&mut self) -> Result<Flow>;

    /// Passes a non-final fragment of the current field.
    fn update(&mut self, fragment: &[C]) -> Result<Flow>;

    /// Passes the last fragment of the current field, which may be empty.
    fn finalize(&mut self, fragment: &[C]) -> Result<Flow>;

    /// Called at the end of each record.
    fn end_record(&mut self) -> Result<Flow>;

    /// Called for a physical line without any characters, if empty lines are reported.
    ///
    /// By default this reports a record without fields.
    fn empty_physical_line(&mut self) -> Result<Flow> {
        let flow = self.start_record()?;
        Ok(flow.and(self.end_record()?))
    }

    /// Supplies the buffer for the next refill.
    ///
    /// When this returns `None`, the parser uses a buffer of its own.
    fn get_buffer(&mut self) -> Option<Box<[C]>> {
        None
    }

    /// Returns a buffer obtained from [`get_buffer`][Self::get_buffer] after the parser is done
    /// with it.
    fn release_buffer(&mut self, buffer: Box<[C]>) {
        drop(buffer)
    }

    /// Called exactly once with an error that aborts parsing.
    ///
    /// Errors of the input are passed through unchanged without calling this. The returned error
    /// is reported to the caller, so handlers can add their own context here.
    fn handle_error(&mut self, error: Error) -> Error {
        error
    }
}

impl<C: Char, H: Handler<C>> Handler<C> for &mut H {
    const EMPTY_LINE_AWARE: bool = H::EMPTY_LINE_AWARE;
    const ZERO_COPY: bool = H::ZERO_COPY;

    #[inline]
    fn start_buffer(&mut self, buffer: &[C]) -> Result<Flow> {
        (**self).start_buffer(buffer)
    }

    #[inline]
    fn end_buffer(&mut self, buffer: &[C]) -> Result<Flow> {
        (**self).end_buffer(buffer)
    }

    #[inline]
    fn start_record(&mut self) -> Result<Flow> {
        (**self).start_record()
    }

    #[inline]
    fn update(&mut self, fragment: &[C]) -> Result<Flow> {
        (**self).update(fragment)
    }

    #[inline]
    fn finalize(&mut self, fragment: &[C]) -> Result<Flow> {
        (**self).finalize(fragment)
    }

    #[inline]
    fn end_record(&mut self) -> Result<Flow> {
        (**self).end_record()
    }

    #[inline]
    fn empty_physical_line(&mut self) -> Result<Flow> {
        (**self).empty_physical_line()
    }

    #[inline]
    fn get_buffer(&mut self) -> Option<Box<[C]>> {
        (**self).get_buffer()
    }

    #[inline]
    fn release_buffer(&mut self, buffer: Box<[C]>) {
        (**self).release_buffer(buffer)
    }

    #[inline]
    fn handle_error(&mut self, error: Error) -> Error {
        (**self).handle_error(error)
    }
}

impl<C: Char, H: Handler<C>> Handler<C> for Box<H> {
    const EMPTY_LINE_AWARE: bool = H::EMPTY_LINE_AWARE;
    const ZERO_COPY: bool = H::ZERO_COPY;

    #[inline]
    fn start_buffer(&mut self, buffer: &[C]) -> Result<Flow> {
        (**self).start_buffer(buffer)
    }

    #[inline]
    fn end_buffer(&mut self, buffer: &[C]) -> Result<Flow> {
        (**self).end_buffer(buffer)
    }

    #[inline]
    fn start_record(&mut self) -> Result<Flow> {
        (**self).start_record()
    }

    #[inline]
    fn update(&mut self, fragment: &[C]) -> Result<Flow> {
        (**self).update(fragment)
    }

    #[inline]
    fn finalize(&mut self, fragment: &[C]) -> Result<Flow> {
        (**self).finalize(fragment)
    }

    #[inline]
    fn end_record(&mut self) -> Result<Flow> {
        (**self).end_record()
    }

    #[inline]
    fn empty_physical_line(&mut self) -> Result<Flow> {
        (**self).empty_physical_line()
    }

    #[inline]
    fn get_buffer(&mut self) -> Option<Box<[C]>> {
        (**self).get_buffer()
    }

    #[inline]
    fn release_buffer(&mut self, buffer: Box<[C]>) {
        (**self).release_buffer(buffer)
    }

    #[inline]
    fn handle_error(&mut self, error: Error) -> Error {
        (**self).handle_error(error)
    }
}

/// Reports empty physical lines to the wrapped handler.
///
/// Handlers that don't override [`Handler::empty_physical_line`] see each empty line as a record
/// without fields.
#[derive(Clone, Debug, Default)]
pub struct EmptyLineAware<H> {
    inner: H,
}

impl<H> EmptyLineAware<H> {
    /// Wraps `inner`.
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    /// Returns a reference to the wrapped handler.
    pub fn get_ref(&self) -> &H {
        &self.inner
    }

    /// Returns a mutable reference to the wrapped handler.
    pub fn get_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    /// Returns the wrapped handler.
    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<C: Char, H: Handler<C>> Handler<C> for EmptyLineAware<H> {
    const EMPTY_LINE_AWARE: bool = true;
    const ZERO_COPY: bool = H::ZERO_COPY;

    fn start_buffer(&mut self, buffer: &[C]) -> Result<Flow> {
        self.inner.start_buffer(buffer)
    }

    fn end_buffer(&mut self, buffer: &[C]) -> Result<Flow> {
        self.inner.end_buffer(buffer)
    }

    fn start_record(&mut self) -> Result<Flow> {
        self.inner.start_record()
    }

    fn update(&mut self, fragment: &[C]) -> Result<Flow> {
        self.inner.update(fragment)
    }

    fn finalize(&mut self, fragment: &[C]) -> Result<Flow> {
        self.inner.finalize(fragment)
    }

    fn end_record(&mut self) -> Result<Flow> {
        self.inner.end_record()
    }

    fn empty_physical_line(&mut self) -> Result<Flow> {
        self.inner.empty_physical_line()
    }

    fn get_buffer(&mut self) -> Option<Box<[C]>> {
        self.inner.get_buffer()
    }

    fn release_buffer(&mut self, buffer: Box<[C]>) {
        self.inner.release_buffer(buffer)
    }

    fn handle_error(&mut self, error: Error) -> Error {
        self.inner.handle_error(error)
    }
}

/// Supplies a writable buffer whenever the wrapped handler doesn't.
///
/// This also disables zero-copy lending, so the wrapped handler always sees fragments from a
/// buffer it could own. The fallback buffer is allocated once and reused.
#[derive(Debug)]
pub struct WithBuffer<C, H> {
    inner: H,
    size: usize,
    spare: Option<Box<[C]>>,
    spare_lent: bool,
}

impl<C: Char, H: Handler<C>> WithBuffer<C, H> {
    /// Wraps `inner`, allocating fallback buffers of `size` characters.
    pub fn new(inner: H, size: usize) -> Self {
        assert!(size > 0, "buffer size must be positive");
        Self {
            inner,
            size,
            spare: None,
            spare_lent: false,
        }
    }

    /// Returns a reference to the wrapped handler.
    pub fn get_ref(&self) -> &H {
        &self.inner
    }

    /// Returns the wrapped handler.
    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<C: Char, H: Handler<C>> Handler<C> for WithBuffer<C, H> {
    const EMPTY_LINE_AWARE: bool = H::EMPTY_LINE_AWARE;
    const ZERO_COPY: bool = false;

    fn start_buffer(&mut self, buffer: &[C]) -> Result<Flow> {
        self.inner.start_buffer(buffer)
    }

    fn end_buffer(&mut self, buffer: &[C]) -> Result<Flow> {
        self.inner.end_buffer(buffer)
    }

    fn start_record(&mut self) -> Result<Flow> {
        self.inner.start_record()
    }

    fn update(&mut self, fragment: &[C]) -> Result<Flow> {
        self.inner.update(fragment)
    }

    fn finalize(&mut self, fragment: &[C]) -> Result<Flow> {
        self.inner.finalize(fragment)
    }

    fn end_record(&mut self) -> Result<Flow> {
        self.inner.end_record()
    }

    fn empty_physical_line(&mut self) -> Result<Flow> {
        self.inner.empty_physical_line()
    }

    fn get_buffer(&mut self) -> Option<Box<[C]>> {
        if let Some(buffer) = self.inner.get_buffer() {
            return Some(buffer);
        }
        self.spare_lent = true;
        let size = self.size;
        Some(
            self.spare
                .take()
                .unwrap_or_else(|| vec![C::NUL; size].into_boxed_slice()),
        )
    }

    fn release_buffer(&mut self, buffer: Box<[C]>) {
        if std::mem::take(&mut self.spare_lent) {
            self.spare = Some(buffer);
        } else {
            self.inner.release_buffer(buffer)
        }
    }

    fn handle_error(&mut self, error: Error) -> Error {
        self.inner.handle_error(error)
    }
}
