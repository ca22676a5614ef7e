//! Character alphabets the parser operates on.
use std::{fmt, hash::Hash};

mod sealed {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for char {}
}

/// A code unit that delimited text is made of.
///
/// Implemented for `u8` (narrow text, usually UTF-8), `u16` (UTF-16 code units) and `char`. The
/// parser never converts between alphabets; every component of a parse session uses the same
/// character type.
pub trait Char:
    sealed::Sealed + Copy + Eq + Ord + Hash + Default + fmt::Debug + Send + Sync + 'static
{
    /// The NUL character, used as sentinel after stored values.
    const NUL: Self;
    /// The CSV field separator `,`.
    const COMMA: Self;
    /// The CSV quote character `"`.
    const QUOTE: Self;
    /// The TSV field separator.
    const TAB: Self;
    /// Carriage return.
    const CR: Self;
    /// Line feed.
    const LF: Self;

    /// Converts an ASCII byte into this alphabet.
    fn from_ascii(byte: u8) -> Self;

    /// Returns the ASCII byte this character encodes, if any.
    fn to_ascii(self) -> Option<u8>;

    /// Converts into a `char`, replacing units that are not a scalar value on their own.
    fn to_char(self) -> char;

    /// Encodes a string slice in this alphabet.
    fn encode_str(text: &str) -> Vec<Self>;

    /// Decodes a character sequence into a `String`, returning `None` for invalid sequences.
    fn decode(chars: &[Self]) -> Option<String>;

    /// Appends the UTF-8 encoding of `chars` to `out`, replacing invalid sequences.
    fn encode_utf8_lossy(chars: &[Self], out: &mut Vec<u8>);

    /// Renders `chars` as a quoted and escaped string.
    fn render(chars: &[Self]) -> String {
        format!("{:?}", chars.iter().map(|&c| c.to_char()).collect::<String>())
    }

    /// Displays `chars` as text, replacing invalid sequences.
    fn display(chars: &[Self], f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &c in chars {
            fmt::Write::write_char(f, c.to_char())?;
        }
        Ok(())
    }

    /// Returns whether this is CR or LF.
    #[inline]
    fn is_line_break(self) -> bool {
        self == Self::CR || self == Self::LF
    }

    /// Returns whether this is an ASCII whitespace character.
    #[inline]
    fn is_ascii_whitespace(self) -> bool {
        matches!(self.to_ascii(), Some(b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c))
    }

    /// Returns the index of the first CR or LF in `chars`.
    #[inline]
    fn find_line_break(chars: &[Self]) -> Option<usize> {
        chars.iter().position(|c| c.is_line_break())
    }
}

impl Char for u8 {
    const NUL: Self = 0;
    const COMMA: Self = b',';
    const QUOTE: Self = b'"';
    const TAB: Self = b'\t';
    const CR: Self = b'\r';
    const LF: Self = b'\n';

    #[inline]
    fn from_ascii(byte: u8) -> Self {
        byte
    }

    #[inline]
    fn to_ascii(self) -> Option<u8> {
        self.is_ascii().then_some(self)
    }

    #[inline]
    fn to_char(self) -> char {
        if self.is_ascii() {
            self as char
        } else {
            char::REPLACEMENT_CHARACTER
        }
    }

    fn encode_str(text: &str) -> Vec<Self> {
        text.as_bytes().to_vec()
    }

    fn decode(chars: &[Self]) -> Option<String> {
        std::str::from_utf8(chars).ok().map(str::to_owned)
    }

    fn encode_utf8_lossy(chars: &[Self], out: &mut Vec<u8>) {
        out.extend_from_slice(chars);
    }

    fn render(chars: &[Self]) -> String {
        format!("{:?}", bstr::BStr::new(chars))
    }

    fn display(chars: &[Self], f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(bstr::BStr::new(chars), f)
    }

    #[inline]
    fn find_line_break(chars: &[Self]) -> Option<usize> {
        memchr::memchr2(b'\r', b'\n', chars)
    }
}

impl Char for u16 {
    const NUL: Self = 0;
    const COMMA: Self = b',' as u16;
    const QUOTE: Self = b'"' as u16;
    const TAB: Self = b'\t' as u16;
    const CR: Self = b'\r' as u16;
    const LF: Self = b'\n' as u16;

    #[inline]
    fn from_ascii(byte: u8) -> Self {
        byte as u16
    }

    #[inline]
    fn to_ascii(self) -> Option<u8> {
        (self < 0x80).then_some(self as u8)
    }

    #[inline]
    fn to_char(self) -> char {
        char::from_u32(self as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn encode_str(text: &str) -> Vec<Self> {
        text.encode_utf16().collect()
    }

    fn decode(chars: &[Self]) -> Option<String> {
        String::from_utf16(chars).ok()
    }

    fn encode_utf8_lossy(chars: &[Self], out: &mut Vec<u8>) {
        let mut tmp = [0; 4];
        for c in char::decode_utf16(chars.iter().copied()) {
            let c = c.unwrap_or(char::REPLACEMENT_CHARACTER);
            out.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
        }
    }

    fn render(chars: &[Self]) -> String {
        format!("{:?}", String::from_utf16_lossy(chars))
    }

    fn display(chars: &[Self], f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in char::decode_utf16(chars.iter().copied()) {
            fmt::Write::write_char(f, c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl Char for char {
    const NUL: Self = '\0';
    const COMMA: Self = ',';
    const QUOTE: Self = '"';
    const TAB: Self = '\t';
    const CR: Self = '\r';
    const LF: Self = '\n';

    #[inline]
    fn from_ascii(byte: u8) -> Self {
        byte as char
    }

    #[inline]
    fn to_ascii(self) -> Option<u8> {
        self.is_ascii().then_some(self as u8)
    }

    #[inline]
    fn to_char(self) -> char {
        self
    }

    fn encode_str(text: &str) -> Vec<Self> {
        text.chars().collect()
    }

    fn decode(chars: &[Self]) -> Option<String> {
        Some(chars.iter().collect())
    }

    fn encode_utf8_lossy(chars: &[Self], out: &mut Vec<u8>) {
        let mut tmp = [0; 4];
        for c in chars {
            out.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
        }
    }
}

/// Renders characters for diagnostics, truncating long sequences.
///
/// At most [`RENDER_LIMIT`] characters are shown; longer input is cut off and marked with `...`.
pub fn render_chars<C: Char>(chars: &[C]) -> String {
    if chars.len() > RENDER_LIMIT {
        let mut rendered = C::render(&chars[..RENDER_LIMIT]);
        rendered.push_str("...");
        rendered
    } else {
        C::render(chars)
    }
}

/// Number of characters [`render_chars`] shows before truncating.
pub const RENDER_LIMIT: usize = 60;
