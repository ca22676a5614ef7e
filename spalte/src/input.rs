//! Input adapters feeding characters into the parser.
use std::{
    io::{self, BufReader, Cursor, Read},
    ops::Range,
};

use crate::Char;

/// A source of characters.
///
/// The parser requests characters in chunks. An adapter either copies characters into a buffer
/// supplied by the parser ([`read_into`][Self::read_into]) or, when it already owns all of its
/// text, lends a range of its own storage ([`lend`][Self::lend]) so that a zero-copy handler can
/// read fragments directly from it.
pub trait Input<C: Char> {
    /// Whether [`lend`][Self::lend] is supported.
    const CAN_LEND: bool = false;

    /// Copies the next characters into `buf`, returning how many were written.
    ///
    /// A count smaller than `buf.len()` signals that the end of input was reached during this call.
    fn read_into(&mut self, buf: &mut [C]) -> io::Result<usize>;

    /// Lends up to `max` characters of the adapter's own storage and advances past them.
    ///
    /// The returned range indexes into [`lent`][Self::lent]. As with
    /// [`read_into`][Self::read_into], a range shorter than `max` signals the end of input.
    fn lend(&mut self, max: usize) -> io::Result<Range<usize>> {
        let _ = max;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "input cannot lend its storage",
        ))
    }

    /// Returns the storage that ranges returned by [`lend`][Self::lend] index into.
    fn lent(&self) -> &[C] {
        &[]
    }
}

impl<C: Char, I: Input<C>> Input<C> for &mut I {
    const CAN_LEND: bool = I::CAN_LEND;

    #[inline]
    fn read_into(&mut self, buf: &mut [C]) -> io::Result<usize> {
        (**self).read_into(buf)
    }

    #[inline]
    fn lend(&mut self, max: usize) -> io::Result<Range<usize>> {
        (**self).lend(max)
    }

    #[inline]
    fn lent(&self) -> &[C] {
        (**self).lent()
    }
}

/// Input borrowing a slice of characters.
#[derive(Copy, Clone, Debug)]
pub struct SliceInput<'a, C> {
    text: &'a [C],
    pos: usize,
}

impl<'a, C: Char> SliceInput<'a, C> {
    /// Creates an input reading the characters of `text`.
    pub fn new(text: &'a [C]) -> Self {
        Self { text, pos: 0 }
    }

    /// Returns the characters that were not yet consumed.
    pub fn remaining(&self) -> &'a [C] {
        &self.text[self.pos..]
    }
}

impl<'a> From<&'a str> for SliceInput<'a, u8> {
    fn from(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<'a, C: Char> From<&'a [C]> for SliceInput<'a, C> {
    fn from(text: &'a [C]) -> Self {
        Self::new(text)
    }
}

impl<C: Char> Input<C> for SliceInput<'_, C> {
    const CAN_LEND: bool = true;

    fn read_into(&mut self, buf: &mut [C]) -> io::Result<usize> {
        let range = self.lend(buf.len())?;
        buf[..range.len()].copy_from_slice(&self.text[range.clone()]);
        Ok(range.len())
    }

    #[inline]
    fn lend(&mut self, max: usize) -> io::Result<Range<usize>> {
        let start = self.pos;
        self.pos += max.min(self.text.len() - start);
        Ok(start..self.pos)
    }

    #[inline]
    fn lent(&self) -> &[C] {
        self.text
    }
}

/// Input owning its characters.
#[derive(Clone, Debug, Default)]
pub struct OwnedInput<C> {
    text: Vec<C>,
    pos: usize,
}

impl<C: Char> OwnedInput<C> {
    /// Creates an input that takes ownership of `text`.
    pub fn new(text: Vec<C>) -> Self {
        Self { text, pos: 0 }
    }

    /// Returns the owned characters, including those already consumed.
    pub fn into_inner(self) -> Vec<C> {
        self.text
    }
}

impl From<String> for OwnedInput<u8> {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

impl<C: Char> From<Vec<C>> for OwnedInput<C> {
    fn from(text: Vec<C>) -> Self {
        Self::new(text)
    }
}

impl<C: Char> Input<C> for OwnedInput<C> {
    const CAN_LEND: bool = true;

    fn read_into(&mut self, buf: &mut [C]) -> io::Result<usize> {
        let range = self.lend(buf.len())?;
        buf[..range.len()].copy_from_slice(&self.text[range.clone()]);
        Ok(range.len())
    }

    #[inline]
    fn lend(&mut self, max: usize) -> io::Result<Range<usize>> {
        let start = self.pos;
        self.pos += max.min(self.text.len() - start);
        Ok(start..self.pos)
    }

    #[inline]
    fn lent(&self) -> &[C] {
        &self.text
    }
}

/// Byte input reading from a [`Read`] instance.
///
/// Reads are repeated until the requested buffer is full or the reader reports the end of its data,
/// so short reads from line buffered or interactive sources do not look like the end of input.
pub struct ReaderInput<'a> {
    read: Box<dyn Read + 'a>,
    complete: bool,
}

impl<'a> ReaderInput<'a> {
    /// Creates a [`ReaderInput`] for the data of a [`BufReader`].
    pub fn from_buf_reader(buf_reader: BufReader<impl Read + 'a>) -> Self {
        // Keep anything the BufReader already holds, but don't buffer twice.
        let buffered = buf_reader.buffer().to_vec();
        if buffered.is_empty() {
            Self::from_read(buf_reader.into_inner())
        } else {
            Self::from_read(Cursor::new(buffered).chain(buf_reader.into_inner()))
        }
    }

    /// Creates a [`ReaderInput`] for the data of a [`Read`] instance.
    ///
    /// If the [`Read`] instance is a [`BufReader`], it is better to use
    /// [`from_buf_reader`][Self::from_buf_reader] to avoid unnecessary double buffering of the
    /// data.
    pub fn from_read(read: impl Read + 'a) -> Self {
        Self::from_boxed_dyn_read(Box::new(read))
    }

    /// Creates a [`ReaderInput`] for the data of a boxed [`Read`] instance.
    #[inline(never)]
    pub fn from_boxed_dyn_read(read: Box<dyn Read + 'a>) -> Self {
        Self {
            read,
            complete: false,
        }
    }

    /// Returns `true` when the underlying reader reported the end of its data.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl Input<u8> for ReaderInput<'_> {
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() && !self.complete {
            match self.read.read(&mut buf[filled..]) {
                Ok(0) => self.complete = true,
                Ok(n) => {
                    assert!(
                        n <= buf.len() - filled,
                        "invariant of std::io::Read trait violated"
                    );
                    filled += n;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns at most three bytes per read and is interrupted every other call.
    struct Trickle<'a> {
        data: &'a [u8],
        interrupt: bool,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::ErrorKind::Interrupted.into());
            }
            let n = buf.len().min(3).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn reader_fills_whole_buffer() -> io::Result<()> {
        let mut input = ReaderInput::from_read(Trickle {
            data: b"0123456789",
            interrupt: false,
        });
        let mut buf = [0; 8];
        assert_eq!(input.read_into(&mut buf)?, 8);
        assert_eq!(&buf, b"01234567");
        assert_eq!(input.read_into(&mut buf)?, 2);
        assert_eq!(&buf[..2], b"89");
        assert!(input.is_complete());
        assert_eq!(input.read_into(&mut buf)?, 0);
        Ok(())
    }

    #[test]
    fn reader_keeps_buffered_data() -> io::Result<()> {
        let mut buf_reader = BufReader::with_capacity(4, &b"abcdef"[..]);
        io::BufRead::fill_buf(&mut buf_reader)?;
        let mut input = ReaderInput::from_buf_reader(buf_reader);
        let mut buf = [0; 16];
        assert_eq!(input.read_into(&mut buf)?, 6);
        assert_eq!(&buf[..6], b"abcdef");
        Ok(())
    }

    #[test]
    fn slice_lends_ranges() -> io::Result<()> {
        let mut input = SliceInput::from("hello");
        assert_eq!(input.lend(2)?, 0..2);
        assert_eq!(input.lend(2)?, 2..4);
        assert_eq!(input.lend(2)?, 4..5);
        assert_eq!(input.lend(2)?, 5..5);
        assert_eq!(&input.lent()[2..4], b"ll");
        Ok(())
    }

    #[test]
    fn owned_reads_wide() -> io::Result<()> {
        let mut input = OwnedInput::new(u16::encode_str("ab"));
        let mut buf = [0u16; 4];
        assert_eq!(input.read_into(&mut buf)?, 2);
        assert_eq!(&buf[..2], &[b'a' as u16, b'b' as u16]);
        assert_eq!(input.read_into(&mut buf)?, 0);
        Ok(())
    }
}
